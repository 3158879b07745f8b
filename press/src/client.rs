//! The unit of work the engine drives: one request against a target.
//!
//! A single client instance is shared by every worker for the whole run, so `attempt` must be
//! safe to call concurrently. [`HttpClient`] keeps no per-request state; [`ScriptClient`] builds a
//! fresh interpreter for every call.
use press_core::{AttemptError, Timings};
use std::time::Duration;
use thiserror::Error;

mod http;
mod script;

pub use http::HttpClient;
pub use script::{ScriptClient, ScriptError};

/// What a client observed for a successful attempt.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub status_code: i32,
    /// Payload size; `0` when the target did not report one.
    pub content_length: i64,
    pub timings: Timings,
}

impl Response {
    pub fn new(status_code: i32, content_length: i64) -> Self {
        Self {
            status_code,
            content_length,
            timings: Timings::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid target url: {0}")]
    Url(#[from] url::ParseError),

    #[error("script handler failed: {0}")]
    Script(#[from] ScriptError),
}

impl ClientError {
    /// Fatal errors end the worker that hit them instead of being recorded as an outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Script(_))
    }

    pub(crate) fn to_attempt_error(&self) -> AttemptError {
        match self {
            Self::Timeout(timeout) => AttemptError::Timeout(*timeout),
            other => AttemptError::Transport(other.to_string()),
        }
    }
}

/// A pluggable request target.
///
/// Implement the `Send` variant, [`Client`]; the engine requires `Client + Sync + 'static`.
///
/// # Example
/// ```
/// use press::{Client, ClientError, Response};
///
/// struct Noop;
///
/// impl Client for Noop {
///     async fn attempt(&self) -> Result<Response, ClientError> {
///         Ok(Response::new(200, 0))
///     }
///
///     async fn close(&self) -> Result<(), ClientError> {
///         Ok(())
///     }
/// }
/// ```
#[trait_variant::make(Client: Send)]
pub trait LocalClient {
    /// Perform one request.
    async fn attempt(&self) -> Result<Response, ClientError>;

    /// Release whatever the client holds. Called once, after every worker has finished.
    async fn close(&self) -> Result<(), ClientError>;
}
