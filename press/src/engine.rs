//! Run orchestration: channel setup, worker spawning and shutdown sequencing.
use crate::client::Client;
use crate::collector::Collector;
use crate::error::EngineError;
use crate::limiter::Limiter;
use crate::worker::{run_workers, WorkerContext};
use async_channel::{bounded, Receiver, Sender};
use press_core::{Outcome, RunStatistics, WorkConfig};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Drives one load test run.
///
/// # Example
/// ```no_run
/// use press::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), EngineError> {
///     let config = WorkConfig::new(1_000, 10).qps(100.);
///     let client = HttpClient::new("127.0.0.1", 8080, "health").expect("valid target");
///     let report = Report::new(Box::new(std::io::stdout()), config.output, config.effective_total());
///
///     let mut engine = Engine::new(config, client, report);
///     let stats = engine.run().await?;
///     println!("{stats}");
///     Ok(())
/// }
/// ```
pub struct Engine<C, R> {
    config: WorkConfig,
    client: Arc<C>,
    collector: Option<R>,
    channels: OnceLock<Channels>,
    start: Option<Instant>,
}

struct Channels {
    results: (Sender<Outcome>, Receiver<Outcome>),
    stop: (Sender<()>, Receiver<()>),
}

impl Channels {
    fn new(config: &WorkConfig) -> Self {
        Self {
            results: bounded(config.result_buffer_size()),
            stop: bounded(config.concurrency),
        }
    }
}

/// Cooperative cancellation for a running [`Engine`].
///
/// Each call queues one stop token per worker. A worker checks for a token before every attempt,
/// so it makes at most one more attempt after `stop`; attempts already in flight are never
/// interrupted.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tokens: Sender<()>,
    slots: usize,
}

impl StopHandle {
    pub fn stop(&self) {
        for _ in 0..self.slots {
            // A full queue already holds a token for every worker.
            if self.tokens.try_send(()).is_err() {
                break;
            }
        }
    }
}

impl<C, R> Engine<C, R>
where
    C: Client + Sync + 'static,
    R: Collector + 'static,
{
    pub fn new(config: WorkConfig, client: C, collector: R) -> Self {
        Self {
            config,
            client: Arc::new(client),
            collector: Some(collector),
            channels: OnceLock::new(),
            start: None,
        }
    }

    pub fn config(&self) -> &WorkConfig {
        &self.config
    }

    /// Validate the configuration and allocate the result and stop channels.
    ///
    /// Safe to call any number of times; the channels are only created once.
    pub fn init(&self) -> Result<(), EngineError> {
        self.channels().map(|_| ())
    }

    fn channels(&self) -> Result<&Channels, EngineError> {
        self.config.validate()?;
        Ok(self.channels.get_or_init(|| Channels::new(&self.config)))
    }

    pub fn stop_handle(&self) -> Result<StopHandle, EngineError> {
        let channels = self.channels()?;
        Ok(StopHandle {
            tokens: channels.stop.0.clone(),
            slots: self.config.concurrency,
        })
    }

    pub fn stop(&self) -> Result<(), EngineError> {
        self.stop_handle()?.stop();
        Ok(())
    }

    /// Run every worker to completion, then shut down and finalize the collector.
    #[instrument(name = "run", skip_all, fields(
        total = self.config.effective_total(),
        concurrency = self.config.concurrency,
    ))]
    pub async fn run(&mut self) -> Result<RunStatistics, EngineError> {
        let (results_tx, results_rx, stop_rx) = {
            let channels = self.channels()?;
            (
                channels.results.0.clone(),
                channels.results.1.clone(),
                channels.stop.1.clone(),
            )
        };
        let mut collector = self.collector.take().ok_or(EngineError::AlreadyRun)?;

        info!("Running with {}", self.config);

        let start = Instant::now();
        self.start = Some(start);

        let consumer = tokio::spawn(
            async move {
                collector.consume(results_rx).await;
                collector
            }
            .in_current_span(),
        );

        let ctx = WorkerContext {
            client: self.client.clone(),
            results: results_tx,
            stop: stop_rx,
            start,
            timeout: self.config.timeout,
        };
        let limiter = Limiter::new(&self.config);
        let pool = run_workers(
            ctx,
            &limiter,
            self.config.concurrency,
            self.config.per_worker_share(),
        )
        .await;

        let elapsed = self.finish(consumer).await?;

        let stats = RunStatistics {
            concurrency: self.config.concurrency,
            issued: pool.issued,
            failed_workers: pool.failed,
            elapsed,
        };
        if stats.all_workers_completed() {
            info!("Run complete: {stats}");
        } else {
            warn!("Run complete with failed workers: {stats}");
        }
        Ok(stats)
    }

    async fn finish(&mut self, consumer: JoinHandle<R>) -> Result<Duration, EngineError> {
        if let Some(channels) = self.channels.get() {
            channels.results.0.close();
        }

        if let Err(err) = self.client.close().await {
            warn!("Unable to close client: {err}");
        }

        let total = self.start.map(|start| start.elapsed()).unwrap_or_default();

        let mut collector = consumer.await?;
        collector.finalize(total)?;
        debug!("Collector finalized.");

        Ok(total)
    }
}
