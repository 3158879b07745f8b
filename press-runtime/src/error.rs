use press::{ClientError, EngineError};
use press_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("invalid address {0:?}, expected host[:port]")]
    InvalidAddress(String),

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("unable to set up client: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
