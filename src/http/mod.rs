//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from specific handlers.

pub mod body;
pub mod cache;
pub mod query;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::{BoxError, ResponseBody};
pub use query::query_param;
pub use range::{parse_range_header, RangeParseResult};
pub use response::{build_304_response, build_error_response, build_text_response};
