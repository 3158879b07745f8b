mod utils;
use utils::*;

use mock_service::MockService;
use ntest::timeout;
use press::prelude::*;
use std::time::Duration;

async fn run_at(total: usize, rate_mode: RateMode) -> anyhow::Result<(f64, Duration)> {
    init();
    let service = MockService::start().await?;
    let client = HttpClient::new("127.0.0.1", service.addr().port(), "hello")?;
    let (collector, collected) = Collect::new();
    let config = WorkConfig::new(total, 5).qps(50.).rate_mode(rate_mode);

    let stats = Engine::new(config, client, collector).run().await?;

    anyhow::ensure!(collected.outcomes().len() == total, "missing outcomes");
    let rate = stats.issued as f64 / stats.elapsed.as_secs_f64();
    Ok((rate, stats.elapsed))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[timeout(10_000)]
async fn per_worker_rate_scales_with_concurrency() -> anyhow::Result<()> {
    let (rate, elapsed) = run_at(100, RateMode::PerWorker).await?;

    // Five workers each ticking every 20ms.
    assert!(elapsed >= Duration::from_millis(380), "{elapsed:?}");
    assert!(rate > 150. && rate <= 265., "rate was {rate}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[timeout(10_000)]
async fn shared_rate_caps_the_pool() -> anyhow::Result<()> {
    let (rate, elapsed) = run_at(25, RateMode::Shared).await?;

    assert!(elapsed >= Duration::from_millis(450), "{elapsed:?}");
    assert!(rate <= 56., "rate was {rate}");
    Ok(())
}
