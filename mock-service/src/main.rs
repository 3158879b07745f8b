use mock_service::MockService;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=debug,tower_http=info")),
        )
        .init();

    let port = match std::env::args().nth(1) {
        Some(port) => port.parse()?,
        None => DEFAULT_PORT,
    };
    let service = MockService::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    println!("Listening on {}", service.addr());

    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let hits = service.hits();
        println!("{} TPS", hits - last);
        last = hits;
    }
}
