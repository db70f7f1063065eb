//! HTTP Basic authentication guard
//!
//! Both sides of each comparison are SHA-256 digests, so the constant-time
//! comparison always runs over 32-byte buffers no matter how long the
//! supplied or configured strings are. Username and password results are
//! combined without short-circuiting, and every failure produces the same
//! 401 response.

use crate::config::Credentials;
use crate::error::AppError;
use crate::http::ResponseBody;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hyper::header::{self, HeaderMap};
use hyper::{Request, Response};
use sha2::{Digest, Sha256};
use std::future::Future;
use subtle::ConstantTimeEq;

type Sha256Digest = [u8; 32];

fn digest(input: &[u8]) -> Sha256Digest {
    Sha256::digest(input).into()
}

/// Credentials presented by a client; only ever held for one request
struct BasicCredentials {
    username: Vec<u8>,
    password: Vec<u8>,
}

impl BasicCredentials {
    /// Extract from an `Authorization: Basic <base64(user:pass)>` header
    ///
    /// The scheme is matched case-insensitively and the password may itself
    /// contain `:`.
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.as_bytes();
        let (scheme, encoded) = (value.get(..6)?, value.get(6..)?);
        if !scheme.eq_ignore_ascii_case(b"basic ") {
            return None;
        }
        let decoded = STANDARD.decode(encoded).ok()?;
        let colon = decoded.iter().position(|&b| b == b':')?;
        Some(Self {
            username: decoded[..colon].to_vec(),
            password: decoded[colon + 1..].to_vec(),
        })
    }
}

/// Guard placed in front of the upload handler
pub struct BasicAuth {
    expected_username: Sha256Digest,
    expected_password: Sha256Digest,
}

impl BasicAuth {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            expected_username: digest(credentials.username.as_bytes()),
            expected_password: digest(credentials.password.as_bytes()),
        }
    }

    /// Check the request's credentials
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let Some(creds) = BasicCredentials::from_headers(headers) else {
            return Err(AppError::Unauthorized);
        };

        let username_match = digest(&creds.username)
            .as_slice()
            .ct_eq(self.expected_username.as_slice());
        let password_match = digest(&creds.password)
            .as_slice()
            .ct_eq(self.expected_password.as_slice());

        if bool::from(username_match & password_match) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }

    /// Run `next` only for authorized requests
    pub async fn guard<B, F, Fut>(
        &self,
        req: Request<B>,
        next: F,
    ) -> Result<Response<ResponseBody>, AppError>
    where
        F: FnOnce(Request<B>) -> Fut,
        Fut: Future<Output = Result<Response<ResponseBody>, AppError>>,
    {
        self.authorize(req.headers())?;
        next(req).await
    }
}
