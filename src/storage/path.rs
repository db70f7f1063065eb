//! Lexical path cleaning for download lookups
//!
//! The requested name is treated as if it were rooted at `/`: empty and `.`
//! segments vanish and every `..` pops one segment, stopping at the root.
//! Whatever survives is a plain relative path that cannot climb out of the
//! directory it is later joined onto.

use std::path::PathBuf;

/// Clean a client-supplied name into a root-relative path
///
/// Only `/` separates segments, so names behave identically on every
/// platform. An input that collapses to the root yields an empty path.
pub fn clean_rooted(name: &str) -> PathBuf {
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.iter().collect()
}
