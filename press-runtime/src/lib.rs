pub mod runtime;

mod error;
mod target;

pub use crate::error::RuntimeError;
pub use crate::runtime::{run, stop_after, Cli};
pub use crate::target::Target;
