//! Upload handler
//!
//! Accepts one multipart file part named `file` and writes it into the
//! storage root under the uploader's filename. Only ever reached through
//! the Basic auth guard.

use crate::error::AppError;
use crate::http::{self, BoxError, ResponseBody};
use crate::logger;
use crate::storage::FileStore;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderMap};
use hyper::{Method, Request, Response};
use multer::{Constraints, Multipart, SizeLimit};
use std::future::Future;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Multipart part carrying the upload
const FILE_FIELD: &str = "file";

pub const MISSING_FILE_FIELD: &str = "missing file field `file` in multipart form";
pub const NOT_MULTIPART: &str = "request Content-Type isn't multipart/form-data";

pub struct UploadHandler {
    store: FileStore,
    base_url: String,
    max_upload_size: u64,
    read_timeout: Duration,
}

impl UploadHandler {
    pub fn new(
        store: FileStore,
        base_url: impl Into<String>,
        max_upload_size: u64,
        read_timeout: Duration,
    ) -> Self {
        Self {
            store,
            base_url: base_url.into(),
            max_upload_size,
            read_timeout,
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<ResponseBody>, AppError>
    where
        B: Body<Data = Bytes> + Send + Unpin + 'static,
        B::Error: Into<BoxError>,
    {
        if req.method() != Method::POST {
            return Err(AppError::MethodNotAllowed { allow: "POST" });
        }

        // Reject early when the client announces an oversized body
        if content_length(req.headers()).is_some_and(|len| len > self.max_upload_size) {
            return Err(AppError::too_large(self.max_upload_size));
        }

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::BadRequest(NOT_MULTIPART.to_string()))?;
        let boundary =
            multer::parse_boundary(content_type).map_err(|e| AppError::BadRequest(e.to_string()))?;

        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(self.max_upload_size));
        let mut multipart =
            Multipart::with_constraints(req.into_body().into_data_stream(), boundary, constraints);

        let (mut field, name) = loop {
            let next = self
                .read(multipart.next_field())
                .await?
                .map_err(|e| self.parse_error(e))?;
            let Some(field) = next else {
                return Err(AppError::BadRequest(MISSING_FILE_FIELD.to_string()));
            };
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            if let Some(name) = field.file_name().filter(|n| !n.is_empty()) {
                let name = name.to_string();
                break (field, name);
            }
        };

        self.store.ensure_root().await.map_err(|e| {
            AppError::Internal(format!(
                "failed to create storage directory {}: {e}",
                self.store.root().display()
            ))
        })?;
        let mut file = self
            .store
            .create(&name)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create {name}: {e}")))?;

        // A failure past this point leaves the partial file behind
        let mut written: u64 = 0;
        while let Some(chunk) = self.read(field.chunk()).await?.map_err(|e| self.copy_error(e))? {
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("failed to write {name}: {e}")))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("failed to write {name}: {e}")))?;

        logger::log_info(&format!("Stored upload '{name}' ({written} bytes)"));
        Ok(http::build_text_response(format!("{}/dl?f={name}", self.base_url)))
    }

    /// Bound one read from the request body by the read timeout
    async fn read<T>(&self, fut: impl Future<Output = T>) -> Result<T, AppError> {
        tokio::time::timeout(self.read_timeout, fut)
            .await
            .map_err(|_| AppError::RequestTimeout)
    }

    fn parse_error(&self, err: multer::Error) -> AppError {
        match err {
            multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
                AppError::too_large(self.max_upload_size)
            }
            other => AppError::BadRequest(other.to_string()),
        }
    }

    fn copy_error(&self, err: multer::Error) -> AppError {
        match err {
            multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
                AppError::too_large(self.max_upload_size)
            }
            other => AppError::Internal(format!("failed to read upload: {other}")),
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
