//! HTTP conditional request module
//!
//! `Last-Modified` generation and `If-Modified-Since` evaluation for downloads.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Format a modification time as an HTTP date
///
/// Returns `None` for times before the Unix epoch, which HTTP dates cannot express.
pub fn last_modified(mtime: SystemTime) -> Option<String> {
    mtime
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|_| httpdate::fmt_http_date(mtime))
}

/// Check whether the client's cached copy is still current
///
/// HTTP dates have one-second resolution, so the file time is truncated
/// before comparing. Unparseable headers never match.
pub fn not_modified_since(if_modified_since: Option<&str>, mtime: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(|v| httpdate::parse_http_date(v).ok()) else {
        return false;
    };
    let Ok(elapsed) = mtime.duration_since(UNIX_EPOCH) else {
        return false;
    };
    let truncated = UNIX_EPOCH + Duration::from_secs(elapsed.as_secs());
    truncated <= since
}
