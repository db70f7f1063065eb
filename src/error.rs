//! Request error taxonomy
//!
//! Every handler failure is one of these variants and is converted to a
//! plain-text HTTP response at the handler boundary. Nothing is retried.

use crate::http::{self, ResponseBody};
use hyper::header;
use hyper::{Response, StatusCode};
use std::io;
use thiserror::Error;

/// Challenge sent with every 401
pub const WWW_AUTHENTICATE_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

/// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials; never says which check failed
    #[error("Unauthorized")]
    Unauthorized,

    /// File exists but cannot be read
    #[error("403 Forbidden")]
    Forbidden,

    /// Unknown path or absent file
    #[error("404 Not Found")]
    NotFound,

    /// Wrong HTTP verb for the endpoint
    #[error("Method not allowed")]
    MethodNotAllowed {
        /// Value of the `Allow` header
        allow: &'static str,
    },

    /// Range request outside the file
    #[error("Range Not Satisfiable")]
    RangeNotSatisfiable {
        /// Size of the file, reported in `Content-Range`
        size: u64,
    },

    /// Client stalled while sending the request body
    #[error("Request body read timed out")]
    RequestTimeout,

    /// Server-side failure outside the caller's control
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Error for bodies over the upload cap
    pub fn too_large(limit: u64) -> Self {
        Self::BadRequest(format!("File too large. Must be smaller than {limit} bytes"))
    }

    /// Map a failure to open or read a stored file
    pub fn from_read_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidInput => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::Internal(err.to_string()),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert into the plain-text response sent to the client
    pub fn into_response(self) -> Response<ResponseBody> {
        let status = self.status();
        let message = self.to_string();
        match self {
            Self::Unauthorized => http::build_error_response(
                status,
                &message,
                &[(header::WWW_AUTHENTICATE, WWW_AUTHENTICATE_CHALLENGE)],
            ),
            Self::MethodNotAllowed { allow } => {
                http::build_error_response(status, &message, &[(header::ALLOW, allow)])
            }
            Self::RangeNotSatisfiable { size } => {
                let mut resp = http::build_error_response(status, &message, &[]);
                if let Ok(value) = header::HeaderValue::from_str(&format!("bytes */{size}")) {
                    resp.headers_mut().insert(header::CONTENT_RANGE, value);
                }
                resp
            }
            _ => http::build_error_response(status, &message, &[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_carries_challenge() {
        let resp = AppError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()[header::WWW_AUTHENTICATE],
            r#"Basic realm="restricted", charset="UTF-8""#
        );
    }

    #[test]
    fn test_range_not_satisfiable_reports_size() {
        let resp = AppError::RangeNotSatisfiable { size: 42 }.into_response();
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes */42");
    }

    #[test]
    fn test_too_large_names_limit() {
        let err = AppError::too_large(1_073_741_824);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "File too large. Must be smaller than 1073741824 bytes"
        );
    }

    #[test]
    fn test_read_error_mapping() {
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let other = io::Error::other("disk on fire");
        assert!(matches!(AppError::from_read_error(&not_found), AppError::NotFound));
        let not_dir = io::Error::from(io::ErrorKind::NotADirectory);
        assert!(matches!(AppError::from_read_error(&not_dir), AppError::NotFound));
        assert!(matches!(AppError::from_read_error(&denied), AppError::Forbidden));
        assert!(matches!(AppError::from_read_error(&other), AppError::Internal(_)));
    }
}
