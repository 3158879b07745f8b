use crate::{
    DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, DEFAULT_TOTAL_REQUESTS, MAX_RESULT_BUFFER,
    RESULTS_PER_WORKER, UNBOUNDED_REQUESTS,
};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("concurrency cannot be smaller than 1")]
    ZeroConcurrency,

    #[error("total requests cannot be smaller than 1")]
    ZeroRequests,

    #[error("total requests ({total}) cannot be less than concurrency ({concurrency})")]
    TooFewRequests { total: usize, concurrency: usize },

    #[error("rate limit must be a finite, non-negative number of queries per second, got {0}")]
    InvalidQps(f64),

    #[error("unknown output format `{0}`, expected `csv` or `json`")]
    UnknownOutput(String),
}

/// How a configured QPS is applied across the worker pool.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateMode {
    /// Every worker owns a private ticker at the configured QPS, so the pool as a whole issues up
    /// to `concurrency * qps` requests per second.
    #[default]
    PerWorker,
    /// One token bucket at the configured QPS shared by the whole pool.
    Shared,
}

/// Report rendering selected by the user. The engine hands this to the collector untouched.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Summary,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "summary" => Ok(Self::Summary),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownOutput(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Summary => "summary",
            Self::Csv => "csv",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Immutable run configuration.
///
/// # Example
/// ```
/// use press_core::{RateMode, WorkConfig};
///
/// let config = WorkConfig::new(1_000, 10)
///     .qps(50.)
///     .rate_mode(RateMode::Shared);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.per_worker_share(), 100);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WorkConfig {
    pub total_requests: usize,
    pub concurrency: usize,
    pub qps: f64,
    pub rate_mode: RateMode,
    pub timeout: Option<Duration>,
    pub duration: Option<Duration>,
    pub output: OutputFormat,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_REQUESTS, DEFAULT_CONCURRENCY)
    }
}

impl WorkConfig {
    pub fn new(total_requests: usize, concurrency: usize) -> Self {
        Self {
            total_requests,
            concurrency,
            qps: 0.,
            rate_mode: RateMode::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            duration: None,
            output: OutputFormat::default(),
        }
    }

    pub fn qps(mut self, qps: f64) -> Self {
        self.qps = qps;
        self
    }

    pub fn rate_mode(mut self, rate_mode: RateMode) -> Self {
        self.rate_mode = rate_mode;
        self
    }

    /// Per-attempt deadline. `None` or a zero duration disables it.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Switch to duration mode. The request count becomes effectively unbounded and the run only
    /// ends when something calls stop on the engine.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        if !self.qps.is_finite() || self.qps < 0. {
            return Err(ConfigError::InvalidQps(self.qps));
        }

        if self.duration.is_none() {
            if self.total_requests == 0 {
                return Err(ConfigError::ZeroRequests);
            }

            if self.total_requests < self.concurrency {
                return Err(ConfigError::TooFewRequests {
                    total: self.total_requests,
                    concurrency: self.concurrency,
                });
            }
        }

        Ok(())
    }

    pub fn effective_total(&self) -> usize {
        if self.duration.is_some() {
            UNBOUNDED_REQUESTS
        } else {
            self.total_requests
        }
    }

    /// Attempts assigned to each worker. The remainder of the division is never issued.
    pub fn per_worker_share(&self) -> usize {
        self.effective_total()
            .checked_div(self.concurrency)
            .unwrap_or(0)
    }

    pub fn result_buffer_size(&self) -> usize {
        self.concurrency
            .saturating_mul(RESULTS_PER_WORKER)
            .min(MAX_RESULT_BUFFER)
    }

    /// Interval between requests for a single limiter, `None` when unlimited.
    pub fn rate_period(&self) -> Option<Duration> {
        if self.qps > 0. {
            Some(Duration::from_micros(((1e6 / self.qps) as u64).max(1)))
        } else {
            None
        }
    }
}

impl fmt::Display for WorkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration {
            Some(duration) => write!(f, "duration={}", humantime::format_duration(duration))?,
            None => write!(f, "requests={}", self.total_requests)?,
        }
        write!(f, ", concurrency={}", self.concurrency)?;
        if self.qps > 0. {
            write!(f, ", qps={} ({:?})", self.qps, self.rate_mode)?;
        }
        if let Some(timeout) = self.timeout {
            write!(f, ", timeout={}", humantime::format_duration(timeout))?;
        }
        Ok(())
    }
}
