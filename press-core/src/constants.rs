use std::time::Duration;

/// Upper bound on the result channel capacity and on the records a report keeps around.
pub const MAX_RESULT_BUFFER: usize = 1_000_000;

/// Result channel slots allotted per worker before hitting [`MAX_RESULT_BUFFER`].
pub const RESULTS_PER_WORKER: usize = 1_000;

/// Request count used in duration mode, where an external timer ends the run.
pub const UNBOUNDED_REQUESTS: usize = i32::MAX as usize;

/// Status code recorded when no status could be obtained.
pub const NO_STATUS: i32 = -1;

pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Idle connections kept per host by the network client.
pub const MAX_IDLE_CONNECTIONS: usize = 500;

pub const DEFAULT_TOTAL_REQUESTS: usize = 400;
pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
