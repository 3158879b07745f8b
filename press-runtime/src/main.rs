use clap::Parser;
use press_runtime::{runtime::init_logging, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(cpus) = cli.cpus.filter(|&cpus| cpus > 0) {
        builder.worker_threads(cpus);
    }
    let runtime = builder.build()?;

    let stats = runtime.block_on(press_runtime::run(cli))?;
    tracing::info!("{stats}");
    Ok(())
}
