use crate::client::{Client, ClientError};
use crate::limiter::{Limiter, Throttle};
use async_channel::{Receiver, Sender};
use press_core::Outcome;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, instrument, trace, warn, Instrument};

/// Everything a worker shares with the rest of the pool.
pub(crate) struct WorkerContext<C> {
    pub client: Arc<C>,
    pub results: Sender<Outcome>,
    pub stop: Receiver<()>,
    pub start: Instant,
    pub timeout: Option<Duration>,
}

impl<C> Clone for WorkerContext<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            results: self.results.clone(),
            stop: self.stop.clone(),
            start: self.start,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PoolReport {
    pub issued: usize,
    pub failed: usize,
}

struct WorkerFailure {
    issued: usize,
    error: ClientError,
}

/// Run `concurrency` workers with `share` attempts each and wait for all of them.
#[instrument(name = "pool", skip(ctx, limiter))]
pub(crate) async fn run_workers<C>(
    ctx: WorkerContext<C>,
    limiter: &Limiter,
    concurrency: usize,
    share: usize,
) -> PoolReport
where
    C: Client + Sync + 'static,
{
    let handles: Vec<_> = (0..concurrency)
        .map(|id| {
            let worker = run_worker(id, ctx.clone(), limiter.throttle(), share);
            tokio::spawn(worker.in_current_span())
        })
        .collect();
    drop(ctx);

    let mut report = PoolReport::default();
    for (id, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(issued)) => report.issued += issued,
            Ok(Err(WorkerFailure { issued, error })) => {
                error!("Worker {id} stopped after {issued} attempts: {error}");
                report.issued += issued;
                report.failed += 1;
            }
            Err(err) => {
                error!("Worker {id} did not complete: {err}");
                report.failed += 1;
            }
        }
    }

    report
}

#[instrument(name = "worker", skip(ctx, throttle, share))]
async fn run_worker<C>(
    id: usize,
    ctx: WorkerContext<C>,
    mut throttle: Throttle,
    share: usize,
) -> Result<usize, WorkerFailure>
where
    C: Client + Sync + 'static,
{
    let mut issued = 0;
    for _ in 0..share {
        if ctx.stop.try_recv().is_ok() {
            debug!("Stop requested after {issued} attempts.");
            return Ok(issued);
        }

        throttle.wait().await;

        let outcome = attempt(&ctx)
            .await
            .map_err(|error| WorkerFailure { issued, error })?;

        if ctx.results.send(outcome).await.is_err() {
            warn!("Result channel closed; dropping remaining attempts.");
            break;
        }
        issued += 1;
    }

    debug!("Finished {issued} attempts.");
    Ok(issued)
}

/// Make one attempt and turn it into an outcome. Only fatal client errors come back as `Err`.
async fn attempt<C>(ctx: &WorkerContext<C>) -> Result<Outcome, ClientError>
where
    C: Client + Sync + 'static,
{
    let started = Instant::now();
    let offset = started.duration_since(ctx.start);

    let res = match ctx.timeout {
        Some(timeout) => tokio::time::timeout(timeout, ctx.client.attempt())
            .await
            .unwrap_or(Err(ClientError::Timeout(timeout))),
        None => ctx.client.attempt().await,
    };
    let duration = started.elapsed();

    let outcome = match res {
        Ok(response) => Outcome::success(
            response.status_code,
            response.content_length,
            offset,
            duration,
        )
        .with_timings(response.timings),
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            trace!("Attempt failed: {err}");
            Outcome::failure(err.to_attempt_error(), offset, duration)
        }
    };

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("press_attempts").increment(1);
        if outcome.is_error() {
            metrics::counter!("press_errors").increment(1);
        }
        metrics::histogram!("press_latency").record(duration.as_secs_f64());
    }

    Ok(outcome)
}
