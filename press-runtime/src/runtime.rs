//! Command line runtime for `press`.
//!
//! Parses the CLI, picks the network or scripted client, runs the engine and, in duration mode,
//! stops it from an external timer.
use crate::error::RuntimeError;
use crate::target::Target;
use clap::Parser;
use press::prelude::*;
use press_core::{OutputFormat, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, DEFAULT_TOTAL_REQUESTS};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "press=warn,press_runtime=warn";

#[derive(Parser, Debug, Clone)]
#[command(name = "press", version, about = "Send load to a network or scripted target.")]
pub struct Cli {
    /// Number of requests to run. Ignored with -z.
    #[arg(short = 'n', default_value_t = DEFAULT_TOTAL_REQUESTS)]
    pub requests: usize,

    /// Number of workers to run concurrently. Total number of requests cannot be smaller than
    /// the concurrency level.
    #[arg(short = 'c', default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Rate limit in queries per second, per worker unless --shared-rate is set. 0 is unlimited.
    #[arg(short = 'q', default_value_t = 0.)]
    pub qps: f64,

    /// Timeout for each request in seconds. 0 is infinite.
    #[arg(short = 't', default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Send requests for this long, then stop. Examples: -z 10s, -z 3m.
    #[arg(short = 'z', value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Output type: summary, csv or json.
    #[arg(short = 'o', default_value_t = OutputFormat::Summary)]
    pub output: OutputFormat,

    /// Number of runtime worker threads. Defaults to the available parallelism.
    #[arg(long)]
    pub cpus: Option<usize>,

    /// Lua script defining `request(host, port, args)`.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Hold the whole pool to -q instead of each worker.
    #[arg(long)]
    pub shared_rate: bool,

    /// Target as host[:port].
    pub target: Target,

    /// Request path for the network client, or the argument passed to the script.
    pub arg: Option<String>,
}

impl Cli {
    pub fn config(&self) -> WorkConfig {
        let rate_mode = if self.shared_rate {
            RateMode::Shared
        } else {
            RateMode::PerWorker
        };

        let config = WorkConfig::new(self.requests, self.concurrency)
            .qps(self.qps)
            .rate_mode(rate_mode)
            .timeout(Some(Duration::from_secs(self.timeout)))
            .output(self.output);

        match self.duration.filter(|d| !d.is_zero()) {
            Some(duration) => config.duration(duration),
            None => config,
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the load test described by `cli`, writing the report to stdout.
#[instrument(name = "press", skip_all, fields(target = ?cli.target))]
pub async fn run(cli: Cli) -> Result<RunStatistics, RuntimeError> {
    let config = cli.config();
    config.validate()?;

    let report = Report::new(
        Box::new(std::io::stdout()),
        config.output,
        config.effective_total(),
    );
    let arg = cli.arg.unwrap_or_default();

    match cli.script {
        Some(script) => {
            info!("Running script {}", script.display());
            let client = ScriptClient::new(script, &cli.target.host, &cli.target.port, arg);
            execute(config, client, report).await
        }
        None => {
            let client = HttpClient::new(&cli.target.host, cli.target.port_number()?, &arg)?;
            info!("Running against {}", client.url());
            execute(config, client, report).await
        }
    }
}

async fn execute<C, R>(config: WorkConfig, client: C, collector: R) -> Result<RunStatistics, RuntimeError>
where
    C: Client + Sync + 'static,
    R: Collector + 'static,
{
    let duration = config.duration;
    let mut engine = Engine::new(config, client, collector);
    engine.init()?;

    let timer = match duration {
        Some(duration) => Some(stop_after(engine.stop_handle()?, duration)),
        None => None,
    };

    let res = engine.run().await;
    if let Some(timer) = timer {
        timer.abort();
    }

    let stats = res?;
    if !stats.all_workers_completed() {
        error!(
            "{} of {} workers stopped on a client error.",
            stats.failed_workers, stats.concurrency
        );
    }
    Ok(stats)
}

/// Stop the engine behind `handle` once `duration` has passed.
pub fn stop_after(handle: StopHandle, duration: Duration) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            tokio::time::sleep(duration).await;
            info!(
                "Duration of {} reached, stopping.",
                humantime::format_duration(duration)
            );
            handle.stop();
        }
        .in_current_span(),
    )
}
