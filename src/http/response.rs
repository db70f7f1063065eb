//! HTTP response building module
//!
//! Builders for the status codes the service answers with, decoupled from handler logic.

use super::body::{self, ResponseBody};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Build 200 plain-text response
pub fn build_text_response(content: String) -> Response<ResponseBody> {
    let content_length = content.len();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PLAIN_TEXT)
        .header(header::CONTENT_LENGTH, content_length)
        .body(body::full(content))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(body::empty())
        })
}

/// Build plain-text error response
///
/// The body is the message followed by a newline, with sniffing disabled so
/// browsers never render it as anything but text.
pub fn build_error_response(
    status: StatusCode,
    message: &str,
    extra_headers: &[(header::HeaderName, &'static str)],
) -> Response<ResponseBody> {
    let content = format!("{message}\n");
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, PLAIN_TEXT)
        .header(header::CONTENT_LENGTH, content.len())
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");

    for (name, value) in extra_headers {
        builder = builder.header(name, HeaderValue::from_static(value));
    }

    builder.body(body::full(content)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        let mut resp = Response::new(body::empty());
        *resp.status_mut() = status;
        resp
    })
}

/// Build 304 Not Modified response
pub fn build_304_response(last_modified: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::LAST_MODIFIED, last_modified)
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            let mut resp = Response::new(body::empty());
            *resp.status_mut() = StatusCode::NOT_MODIFIED;
            resp
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_response_shape() {
        let resp = build_error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
            &[(header::ALLOW, "POST")],
        );
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[header::ALLOW], "POST");
        assert_eq!(resp.headers()[header::CONTENT_TYPE], PLAIN_TEXT);
        assert_eq!(resp.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Method not allowed\n");
    }

    #[test]
    fn test_text_response_length() {
        let resp = build_text_response("abc".to_string());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "3");
    }
}
