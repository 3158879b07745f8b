use crate::report::ReportError;
use press_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("engine has already run")]
    AlreadyRun,

    #[error("collector task did not complete: {0}")]
    Collector(#[from] tokio::task::JoinError),

    #[error("unable to write report: {0}")]
    Report(#[from] ReportError),
}
