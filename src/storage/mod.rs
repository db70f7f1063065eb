//! Flat file storage
//!
//! Uploaded files live directly under one storage root, identified only by
//! their name. Nothing is ever deleted and nothing tracks metadata beyond
//! what the filesystem already knows.

mod path;

pub use path::clean_rooted;

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Storage root shared by the upload and download handlers
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path served for a download request
    ///
    /// The name is cleaned as if rooted at `/` before being joined, so the
    /// result is always the root itself or a descendant of it.
    pub fn download_path(&self, name: &str) -> PathBuf {
        self.root.join(clean_rooted(name))
    }

    /// Path written for an upload
    ///
    /// SECURITY: the uploader's filename is used verbatim. Unlike
    /// `download_path` there is no cleaning here, so a name containing `..`
    /// can write outside the root. Only authenticated callers reach this, and
    /// cleaning would change how names containing `/` behave.
    pub fn upload_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create the storage root and any missing parents
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Create or truncate the file for an upload
    pub async fn create(&self, name: &str) -> io::Result<fs::File> {
        fs::File::create(self.upload_path(name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_path_stays_under_root() {
        let store = FileStore::new("/srv/uploads");
        for name in ["../../etc/passwd", "/etc/passwd", "a/../../../b", "..", ""] {
            let path = store.download_path(name);
            assert!(path.starts_with("/srv/uploads"), "{name} -> {}", path.display());
        }
        assert_eq!(
            store.download_path("../../etc/passwd"),
            Path::new("/srv/uploads/etc/passwd")
        );
    }

    #[test]
    fn test_upload_path_is_verbatim() {
        let store = FileStore::new("uploads");
        assert_eq!(store.upload_path("report.pdf"), Path::new("uploads/report.pdf"));
        assert_eq!(store.upload_path("a/../b"), Path::new("uploads/a/../b"));
    }

    #[tokio::test]
    async fn test_ensure_root_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/deeper/uploads"));
        store.ensure_root().await.unwrap();
        assert!(store.root().is_dir());
        // second call is a no-op
        store.ensure_root().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_truncates_existing() {
        use tokio::io::AsyncWriteExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut f = store.create("x.txt").await.unwrap();
        f.write_all(b"first version, longer").await.unwrap();
        f.flush().await.unwrap();
        drop(f);

        let mut f = store.create("x.txt").await.unwrap();
        f.write_all(b"second").await.unwrap();
        f.flush().await.unwrap();
        drop(f);

        let content = std::fs::read(dir.path().join("x.txt")).unwrap();
        assert_eq!(content, b"second");
    }
}
