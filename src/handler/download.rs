//! Download handler
//!
//! Serves a stored file by name as an attachment. No authentication: the
//! links handed out by the upload handler are meant to be shared.

use crate::error::AppError;
use crate::http::{self, body, cache, ResponseBody, RangeParseResult};
use crate::storage::FileStore;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::fmt::Write as _;
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub const MISSING_FILE_PARAM: &str = "Missing query parameter e.g. `?f=examplefile.txt`";

pub struct DownloadHandler {
    store: FileStore,
}

impl DownloadHandler {
    pub const fn new(store: FileStore) -> Self {
        Self { store }
    }

    pub async fn handle<B>(&self, req: &Request<B>) -> Result<Response<ResponseBody>, AppError> {
        let is_head = match *req.method() {
            Method::GET => false,
            Method::HEAD => true,
            _ => return Err(AppError::MethodNotAllowed { allow: "GET, HEAD" }),
        };

        let name = http::query_param(req.uri(), "f")
            .filter(|f| !f.is_empty())
            .ok_or_else(|| AppError::BadRequest(MISSING_FILE_PARAM.to_string()))?;

        let path = self.store.download_path(&name);
        let mut file = File::open(&path)
            .await
            .map_err(|e| AppError::from_read_error(&e))?;
        let meta = file
            .metadata()
            .await
            .map_err(|e| AppError::from_read_error(&e))?;

        // Never list directories, including the storage root itself
        if meta.is_dir() {
            return Err(AppError::NotFound);
        }

        let size = meta.len();
        let mtime = meta.modified().ok();
        let last_modified = mtime.and_then(cache::last_modified);

        if let Some(mtime) = mtime {
            if cache::not_modified_since(header_str(req, &header::IF_MODIFIED_SINCE), mtime) {
                return Ok(http::build_304_response(last_modified.as_deref().unwrap_or_default()));
            }
        }

        let disposition = HeaderValue::from_bytes(content_disposition(&name).as_bytes())
            .map_err(|e| AppError::Internal(format!("invalid Content-Disposition: {e}")))?;

        let mut builder = Response::builder()
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_DISPOSITION, disposition)
            .header(header::ACCEPT_RANGES, "bytes");
        if let Some(ref value) = last_modified {
            builder = builder.header(header::LAST_MODIFIED, value);
        }

        let range_header = header_str(req, &header::RANGE);
        let (builder, payload) = match http::parse_range_header(range_header, size) {
            RangeParseResult::Valid(range) => {
                file.seek(SeekFrom::Start(range.start))
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                let builder = builder
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_RANGE, range.content_range(size))
                    .header(header::CONTENT_LENGTH, range.length());
                let payload = if is_head {
                    body::empty()
                } else {
                    body::stream(file.take(range.length()))
                };
                (builder, payload)
            }
            RangeParseResult::NotSatisfiable => {
                return Err(AppError::RangeNotSatisfiable { size });
            }
            RangeParseResult::None => {
                let builder = builder
                    .status(StatusCode::OK)
                    .header(header::CONTENT_LENGTH, size);
                let payload = if is_head { body::empty() } else { body::stream(file) };
                (builder, payload)
            }
        };

        builder
            .body(payload)
            .map_err(|e| AppError::Internal(format!("failed to build download response: {e}")))
    }
}

fn header_str<'a, B>(req: &'a Request<B>, name: &header::HeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// `attachment; filename="<name>"` with the name quoted and escaped
fn content_disposition(name: &str) -> String {
    format!("attachment; filename={}", quote(name))
}

/// Quote a string so it is safe inside a header value
///
/// Escapes backslash, double quote and every control character, so the
/// result can never terminate the header line or the quoted string early.
/// Printable non-ASCII characters are kept as-is.
///
/// Browsers only unescape `\\` and `\"` inside a quoted filename. Other
/// escapes such as `\n` or `\x01` reach the saved file name literally.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            c if c.is_control() && c.is_ascii() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
