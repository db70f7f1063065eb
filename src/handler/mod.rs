//! Request handler module
//!
//! Responsible for request routing dispatch and the three endpoints: the
//! usage page, anonymous downloads, and authenticated uploads.

pub mod auth;
pub mod download;
pub mod home;
pub mod router;
pub mod upload;

// Re-export main entry point
pub use router::Router;
