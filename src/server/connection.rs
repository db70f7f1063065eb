// Connection handling module
// Serves one TCP connection: HTTP/1.1 with keep-alive, header read timeout,
// idle and stalled-write watchdog, access logging and graceful shutdown

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::pin::{pin, Pin};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper::body::{Body, Bytes, Frame, Incoming, SizeHint};
use hyper::header;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Version};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::time::Instant;

use super::signal::ShutdownReceiver;
use super::ServerState;
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry};

/// Request activity on one connection, read by the watchdog
struct Activity {
    opened: Instant,
    /// Requests whose handler or response body is still running
    in_flight: AtomicUsize,
    /// Response bodies handed to hyper and not yet finished
    sending: AtomicUsize,
    /// Milliseconds after `opened` when the last request finished
    last_active_ms: AtomicU64,
    /// Milliseconds after `opened` when hyper last pulled a body frame
    last_progress_ms: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            in_flight: AtomicUsize::new(0),
            sending: AtomicUsize::new(0),
            last_active_ms: AtomicU64::new(0),
            last_progress_ms: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn at(&self, ms: &AtomicU64) -> Instant {
        self.opened + Duration::from_millis(ms.load(Ordering::SeqCst))
    }

    fn begin(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {
        self.last_active_ms.store(self.now_ms(), Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn start_sending(&self) {
        self.progress();
        self.sending.fetch_add(1, Ordering::SeqCst);
    }

    fn progress(&self) {
        self.last_progress_ms.store(self.now_ms(), Ordering::SeqCst);
    }

    fn finish_sending(&self) {
        self.sending.fetch_sub(1, Ordering::SeqCst);
        self.end();
    }

    fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst) > 0
    }

    /// A response body has not been pulled for `write`
    fn is_stalled(&self, write: Duration) -> bool {
        self.is_sending() && self.at(&self.last_progress_ms).elapsed() >= write
    }

    fn is_idle_for(&self, idle: Duration) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0
            && self.at(&self.last_active_ms).elapsed() >= idle
    }

    /// Next instant at which the watchdog has something to decide
    fn next_check(&self, idle: Duration, write: Duration) -> Instant {
        if self.is_sending() {
            self.at(&self.last_progress_ms) + write
        } else if self.in_flight.load(Ordering::SeqCst) > 0 {
            Instant::now() + write.min(idle)
        } else {
            self.at(&self.last_active_ms) + idle
        }
    }
}

/// Response body that reports each pulled frame to the connection's `Activity`
///
/// The request counts as finished when hyper drops the body, whether it was
/// sent completely or the connection went away.
struct TrackedBody {
    inner: ResponseBody,
    activity: Arc<Activity>,
}

impl TrackedBody {
    fn new(inner: ResponseBody, activity: Arc<Activity>) -> Self {
        activity.start_sending();
        Self { inner, activity }
    }
}

impl Body for TrackedBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if polled.is_ready() {
            this.activity.progress();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.activity.finish_sending();
    }
}

/// Spawn a task serving `stream`, counted in `active` until it closes
pub fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<ServerState>,
    active: Arc<AtomicUsize>,
    shutdown: ShutdownReceiver,
) {
    active.fetch_add(1, Ordering::SeqCst);
    tokio::spawn(async move {
        serve(stream, peer_addr, state, shutdown).await;
        active.fetch_sub(1, Ordering::SeqCst);
    });
}

async fn serve(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<ServerState>,
    mut shutdown: ShutdownReceiver,
) {
    let activity = Arc::new(Activity::new());
    let timeouts = state.timeouts;

    let service = {
        let activity = Arc::clone(&activity);
        service_fn(move |req| {
            let state = Arc::clone(&state);
            let activity = Arc::clone(&activity);
            async move { Ok::<_, Infallible>(respond(req, peer_addr, &state, activity).await) }
        })
    };

    let mut builder = http1::Builder::new();
    builder
        .keep_alive(true)
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read);

    let mut conn = pin!(builder.serve_connection(TokioIo::new(stream), service));
    // Set once graceful shutdown has been requested on this connection
    let mut closing_since: Option<Instant> = None;

    loop {
        let deadline = match closing_since {
            Some(since) if !activity.is_sending() => since + timeouts.write,
            _ => activity.next_check(timeouts.idle, timeouts.write),
        };

        tokio::select! {
            result = conn.as_mut() => {
                if let Err(err) = result {
                    logger::log_connection_error(&err);
                }
                break;
            }
            () = tokio::time::sleep_until(deadline) => {
                // Dropping the connection closes the socket and releases the body
                if activity.is_stalled(timeouts.write) {
                    logger::log_warning(&format!(
                        "Closing connection from {peer_addr}: response not read for {}s",
                        timeouts.write.as_secs()
                    ));
                    break;
                }
                match closing_since {
                    Some(since) if !activity.is_sending() && since.elapsed() >= timeouts.write => {
                        logger::log_warning(&format!(
                            "Closing connection from {peer_addr}: still open {}s after close",
                            timeouts.write.as_secs()
                        ));
                        break;
                    }
                    None if activity.is_idle_for(timeouts.idle) => {
                        conn.as_mut().graceful_shutdown();
                        closing_since = Some(Instant::now());
                    }
                    _ => {}
                }
            }
            _ = shutdown.changed(), if closing_since.is_none() => {
                conn.as_mut().graceful_shutdown();
                closing_since = Some(Instant::now());
            }
        }
    }
}

async fn respond(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: &ServerState,
    activity: Arc<Activity>,
) -> Response<TrackedBody> {
    activity.begin();
    let started = Instant::now();
    let entry = state
        .access_log_format
        .is_some()
        .then(|| access_entry(&req, peer_addr));

    let resp = state.router.handle(req).await;

    if let (Some(mut entry), Some(format)) = (entry, state.access_log_format.as_deref()) {
        entry.status = resp.status().as_u16();
        entry.body_bytes = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, format);
    }
    resp.map(|body| TrackedBody::new(body, activity))
}

/// Access log fields taken from the request; `Authorization` is never read
fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header_value = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header_value(header::REFERER);
    entry.user_agent = header_value(header::USER_AGENT);
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
