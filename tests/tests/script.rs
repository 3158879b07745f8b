mod utils;
use utils::*;

use mock_service::MockService;
use clap::Parser;
use ntest::timeout;
use press::prelude::*;

const HTTP_SCRIPT: &str = r#"
function request(host, port, args)
    local conn = socket.tcp()
    conn:settimeout(5)
    local ok, err = conn:connect(host, tonumber(port))
    if not ok then
        return -1, 0
    end
    conn:send("GET /" .. args .. " HTTP/1.0\r\nHost: " .. host .. "\r\n\r\n")

    local status = conn:receive("*l")
    repeat
        local line = conn:receive("*l")
    until line == nil or line == ""
    local body = conn:receive("*a") or ""
    conn:close()

    return tonumber(status:match("HTTP/%d%.%d (%d+)")), #body
end
"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[timeout(10_000)]
async fn script_speaks_http_through_socket_module() {
    init();
    let service = MockService::start().await.unwrap();
    let file = script(HTTP_SCRIPT);
    let port = service.addr().port().to_string();
    let client = ScriptClient::new(file.path(), "127.0.0.1", port, "hello");
    let (collector, collected) = Collect::new();

    let stats = Engine::new(WorkConfig::new(12, 3), client, collector)
        .run()
        .await
        .unwrap();

    assert!(stats.all_workers_completed());
    assert_eq!(service.hits(), 12);
    let outcomes = collected.outcomes();
    assert_eq!(outcomes.len(), 12);
    for outcome in outcomes {
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.content_length, 13);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[timeout(10_000)]
async fn concurrent_invocations_are_isolated() {
    init();
    let file = script(
        r#"
        function request(host, port, args)
            calls = (calls or 0) + 1
            socket.sleep(0.005)
            return 200, calls
        end
        "#,
    );
    let client = ScriptClient::new(file.path(), "localhost", "0", "");
    let (collector, collected) = Collect::new();

    Engine::new(WorkConfig::new(40, 8), client, collector)
        .run()
        .await
        .unwrap();

    let outcomes = collected.outcomes();
    assert_eq!(outcomes.len(), 40);
    assert!(outcomes.iter().all(|o| o.content_length == 1));
}

#[tokio::test]
#[timeout(10_000)]
async fn broken_script_fails_workers_not_the_run() {
    init();
    let file = script("function request(host, port, args) error('boom') end");
    let client = ScriptClient::new(file.path(), "localhost", "80", "");
    let (collector, collected) = Collect::new();

    let stats = Engine::new(WorkConfig::new(10, 2), client, collector)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.failed_workers, 2);
    assert_eq!(stats.issued, 0);
    assert!(collected.outcomes().is_empty());
    assert!(collected.total().is_some());
}

#[tokio::test]
#[timeout(10_000)]
async fn missing_script_fails_workers() {
    let client = ScriptClient::new("/nonexistent/press.lua", "localhost", "80", "");
    let (collector, collected) = Collect::new();

    let stats = Engine::new(WorkConfig::new(3, 3), client, collector)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.failed_workers, 3);
    assert!(collected.outcomes().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[timeout(10_000)]
async fn cli_runs_scripts() {
    init();
    let service = MockService::start().await.unwrap();
    let file = script(HTTP_SCRIPT);
    let path = file.path().to_string_lossy().into_owned();
    let target = format!("127.0.0.1:{}", service.addr().port());

    let cli = press_runtime::Cli::try_parse_from([
        "press", "-n", "6", "-c", "2", "-o", "csv", "--script", &path, &target, "hello",
    ])
    .unwrap();
    let stats = press_runtime::run(cli).await.unwrap();

    assert_eq!(stats.issued, 6);
    assert!(stats.all_workers_completed());
    assert_eq!(service.hits(), 6);
}
