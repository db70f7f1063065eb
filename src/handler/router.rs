//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: matches the exact path, runs the
//! handler, and turns any `AppError` into its plain-text response.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::handler::auth::BasicAuth;
use crate::handler::download::DownloadHandler;
use crate::handler::home::HomeHandler;
use crate::handler::upload::UploadHandler;
use crate::http::{BoxError, ResponseBody};
use crate::logger;
use crate::storage::FileStore;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use std::future::Future;
use std::time::Duration;

/// Routes known to the server; anything else is a 404
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Home,
    Download,
    Upload,
    Unknown,
}

impl Route {
    fn from_path(path: &str) -> Self {
        match path {
            "/" => Self::Home,
            "/dl" => Self::Download,
            "/upload" => Self::Upload,
            _ => Self::Unknown,
        }
    }
}

/// Handlers wired together from the application configuration
pub struct Router {
    home: HomeHandler,
    download: DownloadHandler,
    upload: UploadHandler,
    auth: BasicAuth,
    write_timeout: Duration,
}

impl Router {
    pub fn new(config: &AppConfig) -> Self {
        let store = FileStore::new(&config.storage_dir);
        Self {
            home: HomeHandler::new(&config.base_url),
            download: DownloadHandler::new(store.clone()),
            upload: UploadHandler::new(
                store,
                config.base_url.clone(),
                config.max_upload_size,
                config.timeouts.read,
            ),
            auth: BasicAuth::new(&config.credentials),
            write_timeout: config.timeouts.write,
        }
    }

    /// Main entry point for HTTP request handling
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body<Data = Bytes> + Send + Unpin + 'static,
        B::Error: Into<BoxError>,
    {
        let result = match Route::from_path(req.uri().path()) {
            Route::Home => Ok(self.home.handle()),
            Route::Download => self.with_deadline(self.download.handle(&req)).await,
            // Credentials are checked before the method, so an anonymous GET gets 401
            Route::Upload => self.auth.guard(req, |req| self.upload.handle(req)).await,
            Route::Unknown => Err(AppError::NotFound),
        };

        result.unwrap_or_else(|err| {
            if err.status().is_server_error() {
                logger::log_error(&format!("Request failed: {err}"));
            }
            err.into_response()
        })
    }

    /// Bound the time taken to produce a response head
    async fn with_deadline<F>(&self, fut: F) -> Result<Response<ResponseBody>, AppError>
    where
        F: Future<Output = Result<Response<ResponseBody>, AppError>>,
    {
        tokio::time::timeout(self.write_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(AppError::Internal(format!(
                    "no response within {}s",
                    self.write_timeout.as_secs()
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use http_body_util::{BodyExt, Full};
    use hyper::header;
    use hyper::{Method, StatusCode};

    const BOUNDARY: &str = "router-boundary";

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn authorized(mut req: Request<Full<Bytes>>, user: &str, pass: &str) -> Request<Full<Bytes>> {
        let value = format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")));
        req.headers_mut()
            .insert(header::AUTHORIZATION, value.parse().unwrap());
        req
    }

    fn upload_request(filename: &str, content: &str) -> Request<Full<Bytes>> {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        );
        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Full::new(Bytes::from(body)))
            .unwrap();
        authorized(req, "alice", "s3cret")
    }

    async fn text(resp: Response<ResponseBody>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_route_matching_is_exact() {
        assert_eq!(Route::from_path("/"), Route::Home);
        assert_eq!(Route::from_path("/dl"), Route::Download);
        assert_eq!(Route::from_path("/upload"), Route::Upload);
        assert_eq!(Route::from_path("/dl/"), Route::Unknown);
        assert_eq!(Route::from_path("/upload/x"), Route::Unknown);
        assert_eq!(Route::from_path("/favicon.ico"), Route::Unknown);
    }

    #[tokio::test]
    async fn test_home_page() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(&test_config(dir.path()));
        let resp = router.handle(request(Method::GET, "/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(text(resp).await.contains("/upload"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(&test_config(dir.path()));
        let resp = router.handle(request(Method::GET, "/nope")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_requires_auth() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(&test_config(dir.path()));

        let resp = router.handle(request(Method::POST, "/upload")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()[header::WWW_AUTHENTICATE],
            r#"Basic realm="restricted", charset="UTF-8""#
        );
        assert_eq!(text(resp).await, "Unauthorized\n");

        let wrong = authorized(request(Method::POST, "/upload"), "alice", "wrong");
        let resp = router.handle(wrong).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_upload_checks_auth_before_method() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(&test_config(dir.path()));

        let resp = router.handle(request(Method::GET, "/upload")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = authorized(request(Method::GET, "/upload"), "alice", "s3cret");
        let resp = router.handle(req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[header::ALLOW], "POST");
        assert_eq!(text(resp).await, "Method not allowed\n");
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(&test_config(dir.path()));

        let resp = router.handle(upload_request("greeting.txt", "hi there")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let link = text(resp).await;
        assert!(link.ends_with("/dl?f=greeting.txt"), "{link}");

        let resp = router
            .handle(request(Method::GET, "/dl?f=greeting.txt"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"greeting.txt\""
        );
        assert_eq!(text(resp).await, "hi there");
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(&test_config(dir.path()));

        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
        );
        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Full::new(Bytes::from(body)))
            .unwrap();
        let resp = router.handle(authorized(req, "alice", "s3cret")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(text(resp).await.contains("file"));
    }

    #[tokio::test]
    async fn test_download_without_param() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(&test_config(dir.path()));
        let resp = router.handle(request(Method::GET, "/dl")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            text(resp).await,
            "Missing query parameter e.g. `?f=examplefile.txt`\n"
        );
    }
}
