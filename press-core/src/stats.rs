use std::fmt;
use std::time::Duration;

/// What the engine itself observed about a run.
///
/// Latency and status breakdowns belong to the collector; this only answers whether every worker
/// finished cleanly and how much work went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    pub concurrency: usize,
    /// Attempts whose outcome made it onto the result channel, summed over workers that returned.
    ///
    /// A worker stopped by a fatal client error still counts the attempts it issued before the
    /// error. A panicked worker counts nothing here, although the outcomes it sent before the
    /// panic still reach the collector.
    pub issued: usize,
    /// Workers that stopped on a fatal client error plus workers that panicked.
    pub failed_workers: usize,
    pub elapsed: Duration,
}

impl RunStatistics {
    pub fn all_workers_completed(&self) -> bool {
        self.failed_workers == 0
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "issued={} concurrency={} failed_workers={} elapsed={}",
            self.issued,
            self.concurrency,
            self.failed_workers,
            humantime::format_duration(self.elapsed),
        )
    }
}
