use crate::NO_STATUS;
use std::time::Duration;
use thiserror::Error;

/// Why an attempt produced no usable response.
#[derive(Debug, Error, Clone, PartialEq, Eq, Hash)]
pub enum AttemptError {
    #[error("{0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Per-phase timings of an attempt. No client fills these in yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub dns: Option<Duration>,
    pub connect: Option<Duration>,
    pub request_write: Option<Duration>,
    pub response_delay: Option<Duration>,
    pub response_read: Option<Duration>,
}

/// The record of a single completed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub error: Option<AttemptError>,
    pub status_code: i32,
    pub content_length: i64,
    /// Time since the run started when the attempt began.
    pub offset: Duration,
    pub duration: Duration,
    pub timings: Timings,
}

impl Outcome {
    pub fn success(
        status_code: i32,
        content_length: i64,
        offset: Duration,
        duration: Duration,
    ) -> Self {
        Self {
            error: None,
            status_code,
            content_length,
            offset,
            duration,
            timings: Timings::default(),
        }
    }

    pub fn failure(error: AttemptError, offset: Duration, duration: Duration) -> Self {
        Self {
            error: Some(error),
            status_code: NO_STATUS,
            content_length: 0,
            offset,
            duration,
            timings: Timings::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
