//! The consumer side of the result channel.
use crate::report::ReportError;
pub use async_channel::Receiver;
use press_core::Outcome;
use std::time::Duration;

/// Aggregates the outcome stream of a run.
///
/// The engine spawns `consume` as its own task as soon as the run starts and waits for it to
/// return once the result channel has been closed; that return is the completion signal. Only
/// then is `finalize` called, with the total wall-clock time of the run.
///
/// A collector must tolerate fewer outcomes than the configured total: workers can be stopped
/// early or end on a fatal client error.
#[trait_variant::make(Collector: Send)]
pub trait LocalCollector {
    /// Drain `results` until the channel is closed and empty.
    async fn consume(&mut self, results: Receiver<Outcome>);

    fn finalize(&mut self, total: Duration) -> Result<(), ReportError>;
}
