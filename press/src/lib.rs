#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod client;
pub mod collector;
pub mod engine;
pub mod error;
pub mod report;

pub(crate) mod limiter;
pub(crate) mod worker;


pub use client::{Client, ClientError, HttpClient, Response, ScriptClient, ScriptError};
pub use collector::Collector;
pub use engine::{Engine, StopHandle};
pub use error::EngineError;
pub use report::{Report, ReportError, Summary};

pub mod prelude {
    pub use crate::client::{Client, HttpClient, ScriptClient};
    pub use crate::collector::Collector;
    pub use crate::engine::{Engine, StopHandle};
    pub use crate::error::EngineError;
    pub use crate::report::Report;

    pub use press_core::{OutputFormat, RateMode, RunStatistics, WorkConfig};
}
