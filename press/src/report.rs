//! The default collector: aggregates outcomes and writes a summary, CSV or JSON report.
use crate::collector::{Collector, Receiver};
use pdatastructs::tdigest::{TDigest, K1};
use press_core::{OutputFormat, Outcome, MAX_RESULT_BUFFER, UNBOUNDED_REQUESTS};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

mod render;

const TDIGEST_BACKLOG_SIZE: usize = 100;
const HISTOGRAM_BUCKETS: usize = 10;
const PERCENTILES: [u8; 7] = [10, 25, 50, 75, 90, 95, 99];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unable to write report: {0}")]
    Io(#[from] io::Error),

    #[error("unable to encode report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to write csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Aggregates every outcome of a run and writes the report to `sink` on finalize.
///
/// Latency statistics only cover successful attempts; failed attempts are tallied by error
/// message. At most [`MAX_RESULT_BUFFER`] successful records are retained for the histogram and
/// the CSV dump.
pub struct Report {
    sink: Box<dyn Write + Send>,
    format: OutputFormat,
    expected: usize,
    latency: TDigest<K1>,
    records: Vec<Outcome>,
    status_codes: BTreeMap<i32, usize>,
    errors: BTreeMap<String, usize>,
    successes: usize,
    fastest: Option<Duration>,
    slowest: Option<Duration>,
    latency_sum: Duration,
    size_sum: i64,
}

impl Report {
    pub fn new(sink: Box<dyn Write + Send>, format: OutputFormat, expected: usize) -> Self {
        Self {
            sink,
            format,
            expected,
            latency: default_tdigest(),
            records: Vec::new(),
            status_codes: BTreeMap::new(),
            errors: BTreeMap::new(),
            successes: 0,
            fastest: None,
            slowest: None,
            latency_sum: Duration::ZERO,
            size_sum: 0,
        }
    }

    fn record(&mut self, outcome: Outcome) {
        if let Some(err) = &outcome.error {
            *self.errors.entry(err.to_string()).or_default() += 1;
            return;
        }

        self.successes += 1;
        *self.status_codes.entry(outcome.status_code).or_default() += 1;
        self.latency.insert(outcome.duration.as_secs_f64());
        self.latency_sum += outcome.duration;
        if outcome.content_length > 0 {
            self.size_sum = self.size_sum.saturating_add(outcome.content_length);
        }
        self.fastest = Some(self.fastest.map_or(outcome.duration, |d| d.min(outcome.duration)));
        self.slowest = Some(self.slowest.map_or(outcome.duration, |d| d.max(outcome.duration)));

        if self.records.len() < MAX_RESULT_BUFFER {
            self.records.push(outcome);
        }
    }

    fn failures(&self) -> usize {
        self.errors.values().sum()
    }

    /// Snapshot of the aggregated statistics for a run that took `total`.
    pub fn summary(&self, total: Duration) -> Summary {
        let (fastest, slowest) = match (self.fastest, self.slowest) {
            (Some(fastest), Some(slowest)) => (fastest, slowest),
            _ => (Duration::ZERO, Duration::ZERO),
        };
        let average = match self.successes {
            0 => 0.,
            n => self.latency_sum.as_secs_f64() / n as f64,
        };
        let requests_per_sec = match total.as_secs_f64() {
            secs if secs > 0. => self.successes as f64 / secs,
            _ => 0.,
        };
        let size_per_request = match self.successes {
            0 => 0,
            n => self.size_sum / n as i64,
        };

        Summary {
            total: total.as_secs_f64(),
            slowest: slowest.as_secs_f64(),
            fastest: fastest.as_secs_f64(),
            average,
            requests_per_sec,
            total_data: self.size_sum,
            size_per_request,
            successes: self.successes,
            failures: self.failures(),
            histogram: self.histogram(fastest, slowest),
            latency_distribution: self.percentiles(),
            status_codes: self.status_codes.clone(),
            errors: self.errors.clone(),
            received: self.successes + self.failures(),
            expected: (self.expected != UNBOUNDED_REQUESTS).then_some(self.expected),
        }
    }

    fn histogram(&self, fastest: Duration, slowest: Duration) -> Vec<Bucket> {
        if self.records.is_empty() {
            return Vec::new();
        }

        let fastest = fastest.as_secs_f64();
        let slowest = slowest.as_secs_f64();
        let width = (slowest - fastest) / HISTOGRAM_BUCKETS as f64;
        let mut buckets: Vec<Bucket> = (0..=HISTOGRAM_BUCKETS)
            .map(|i| Bucket {
                mark: fastest + width * i as f64,
                count: 0,
            })
            .collect();
        if let Some(last) = buckets.last_mut() {
            last.mark = slowest;
        }

        for record in &self.records {
            let latency = record.duration.as_secs_f64();
            let idx = buckets
                .iter()
                .position(|bucket| latency <= bucket.mark)
                .unwrap_or(HISTOGRAM_BUCKETS);
            buckets[idx].count += 1;
        }
        buckets
    }

    fn percentiles(&self) -> Vec<Percentile> {
        if self.successes == 0 {
            return Vec::new();
        }

        PERCENTILES
            .iter()
            .filter_map(|&percentile| {
                let latency = self.latency.quantile(f64::from(percentile) / 100.);
                // NOTE: TDigest yields NaN when it has no data to interpolate from
                (!latency.is_nan()).then_some(Percentile {
                    percentile,
                    latency: latency.max(0.),
                })
            })
            .collect()
    }

    fn write(&mut self, total: Duration) -> Result<(), ReportError> {
        match self.format {
            OutputFormat::Summary => {
                let summary = self.summary(total);
                render::summary(&mut self.sink, &summary)?;
            }
            OutputFormat::Csv => render::csv(&mut self.sink, &self.records)?,
            OutputFormat::Json => {
                let summary = self.summary(total);
                serde_json::to_writer_pretty(&mut self.sink, &summary)?;
                writeln!(self.sink)?;
            }
        }
        self.sink.flush()?;
        Ok(())
    }
}

impl Collector for Report {
    async fn consume(&mut self, results: Receiver<Outcome>) {
        while let Ok(outcome) = results.recv().await {
            trace!("Recording outcome at {:?}", outcome.offset);
            self.record(outcome);
        }
    }

    fn finalize(&mut self, total: Duration) -> Result<(), ReportError> {
        let received = self.successes + self.failures();
        if self.expected != UNBOUNDED_REQUESTS && received < self.expected {
            debug!("Received {received} of {} expected outcomes.", self.expected);
        }
        self.write(total)
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}

/// Aggregated statistics of a run. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: f64,
    pub slowest: f64,
    pub fastest: f64,
    pub average: f64,
    pub requests_per_sec: f64,
    pub total_data: i64,
    pub size_per_request: i64,
    pub successes: usize,
    pub failures: usize,
    pub histogram: Vec<Bucket>,
    pub latency_distribution: Vec<Percentile>,
    pub status_codes: BTreeMap<i32, usize>,
    pub errors: BTreeMap<String, usize>,
    /// Outcomes that reached the report.
    pub received: usize,
    /// Requests the run was configured for; `None` in duration mode.
    pub expected: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub mark: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentile {
    pub percentile: u8,
    pub latency: f64,
}
