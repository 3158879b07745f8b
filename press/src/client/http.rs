use crate::client::{Client, ClientError, Response};
use press_core::{DEFAULT_HTTP_PORT, MAX_IDLE_CONNECTIONS};
use tracing::trace;
use url::Url;

const USER_AGENT: &str = concat!("press/", env!("CARGO_PKG_VERSION"));

/// Issues a single `GET http://host:port/path` per attempt.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    url: Url,
}

impl HttpClient {
    /// A `port` of `0` means the default HTTP port.
    pub fn new(host: &str, port: u16, path: &str) -> Result<Self, ClientError> {
        if host.is_empty() {
            return Err(ClientError::InvalidTarget("host is empty".to_string()));
        }

        let port = if port == 0 { DEFAULT_HTTP_PORT } else { port };
        let url = Url::parse(&format!(
            "http://{host}:{port}/{}",
            path.trim_start_matches('/')
        ))?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Client for HttpClient {
    async fn attempt(&self) -> Result<Response, ClientError> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status_code = i32::from(response.status().as_u16());
        let content_length = response
            .content_length()
            .and_then(|len| i64::try_from(len).ok())
            .unwrap_or(0);

        // Read the body so the connection goes back to the pool.
        response.bytes().await?;

        trace!(status_code, content_length, "GET {}", self.url);
        Ok(Response::new(status_code, content_length))
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}
