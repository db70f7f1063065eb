//! Response body types
//!
//! All handlers answer with the same boxed body so small text replies and
//! streamed file downloads can flow through one response type.

use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Boxed response body shared by every handler
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Error type accepted from request bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body holding the whole payload in memory
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Body with no content (HEAD responses, 304)
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Body streamed from an async reader without buffering it whole
pub fn stream<R>(reader: R) -> ResponseBody
where
    R: AsyncRead + Send + 'static,
{
    StreamBody::new(ReaderStream::new(reader).map_ok(Frame::data)).boxed_unsync()
}
