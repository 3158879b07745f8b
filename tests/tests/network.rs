mod utils;
use utils::*;

use mock_service::MockService;
use ntest::timeout;
use press::prelude::*;
use press_core::{AttemptError, NO_STATUS};
use std::time::{Duration, Instant};

async fn hello(total: usize, concurrency: usize) -> (MockService, Vec<press_core::Outcome>, RunStatistics) {
    init();
    let service = MockService::start().await.unwrap();
    let client = HttpClient::new("127.0.0.1", service.addr().port(), "hello").unwrap();
    let (collector, collected) = Collect::new();

    let stats = Engine::new(WorkConfig::new(total, concurrency), client, collector)
        .run()
        .await
        .unwrap();
    (service, collected.outcomes(), stats)
}

#[tokio::test]
#[timeout(10_000)]
async fn every_request_is_recorded() {
    let (service, outcomes, stats) = hello(100, 10).await;

    assert_eq!(stats.issued, 100);
    assert_eq!(outcomes.len(), 100);
    assert_eq!(service.hits(), 100);
    assert!(outcomes.iter().all(|o| o.error.is_none() && o.status_code == 200));
}

#[tokio::test]
#[timeout(10_000)]
async fn remainder_requests_are_dropped() {
    let (service, outcomes, stats) = hello(10, 4).await;

    assert_eq!(stats.issued, 8);
    assert_eq!(outcomes.len(), 8);
    assert_eq!(service.hits(), 8);
}

#[tokio::test]
#[timeout(10_000)]
async fn single_request() {
    let (_service, outcomes, _) = hello(1, 1).await;

    let [outcome] = outcomes.as_slice() else {
        panic!("expected one outcome, got {}", outcomes.len());
    };
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.status_code, 200);
    assert_eq!(outcome.content_length, 13);
}

#[tokio::test]
#[timeout(10_000)]
async fn error_statuses_are_not_failures() {
    init();
    let service = MockService::start().await.unwrap();
    let client = HttpClient::new("127.0.0.1", service.addr().port(), "status/503").unwrap();
    let (collector, collected) = Collect::new();

    Engine::new(WorkConfig::new(4, 2), client, collector)
        .run()
        .await
        .unwrap();

    let outcomes = collected.outcomes();
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| o.error.is_none() && o.status_code == 503));
}

#[tokio::test]
#[timeout(10_000)]
async fn unreachable_target() {
    init();
    // Nothing listens on port 1 of the loopback address.
    let client = HttpClient::new("127.0.0.1", 1, "").unwrap();
    let (collector, collected) = Collect::new();

    let stats = Engine::new(WorkConfig::new(3, 3), client, collector)
        .run()
        .await
        .unwrap();

    assert!(stats.all_workers_completed());
    let outcomes = collected.outcomes();
    assert_eq!(outcomes.len(), 3);
    for outcome in outcomes {
        assert!(matches!(outcome.error, Some(AttemptError::Transport(_))));
        assert_eq!(outcome.status_code, NO_STATUS);
        assert_eq!(outcome.content_length, 0);
    }
}

#[tokio::test]
#[timeout(10_000)]
async fn slow_target_times_out() {
    init();
    let service = MockService::start().await.unwrap();
    let client = HttpClient::new("127.0.0.1", service.addr().port(), "delay/ms/2000").unwrap();
    let (collector, collected) = Collect::new();
    let config = WorkConfig::new(2, 2).timeout(Some(Duration::from_millis(100)));

    Engine::new(config, client, collector).run().await.unwrap();

    for outcome in collected.outcomes() {
        assert_eq!(
            outcome.error,
            Some(AttemptError::Timeout(Duration::from_millis(100)))
        );
        assert_eq!(outcome.status_code, NO_STATUS);
    }
}

#[tokio::test]
#[timeout(15_000)]
async fn duration_mode_stops_on_timer() {
    init();
    let service = MockService::start().await.unwrap();
    let client = HttpClient::new("127.0.0.1", service.addr().port(), "delay/ms/10").unwrap();
    let (collector, collected) = Collect::new();
    let config = WorkConfig::new(0, 20).duration(Duration::from_secs(2));

    let mut engine = Engine::new(config, client, collector);
    let timer = press_runtime::stop_after(engine.stop_handle().unwrap(), Duration::from_secs(2));

    let start = Instant::now();
    let stats = engine.run().await.unwrap();
    let elapsed = start.elapsed();
    timer.await.unwrap();

    assert!(elapsed >= Duration::from_millis(1_900), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2_500), "{elapsed:?}");

    let total = collected.total().unwrap();
    assert!(total >= Duration::from_millis(1_900), "{total:?}");
    assert!(total <= elapsed);
    assert_eq!(stats.issued, collected.outcomes().len());
    assert!(stats.issued > 20);
}

#[tokio::test]
#[timeout(10_000)]
async fn json_report_end_to_end() {
    init();
    let service = MockService::start().await.unwrap();
    let client = HttpClient::new("127.0.0.1", service.addr().port(), "hello").unwrap();
    let buf = SharedBuf::default();
    let config = WorkConfig::new(50, 5).output(OutputFormat::Json);
    let report = Report::new(Box::new(buf.clone()), config.output, config.effective_total());

    Engine::new(config, client, report).run().await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&buf.contents()).unwrap();
    assert_eq!(json["successes"], 50);
    assert_eq!(json["failures"], 0);
    assert_eq!(json["total_data"], 650);
    assert_eq!(json["size_per_request"], 13);
    assert_eq!(json["status_codes"]["200"], 50);
}
