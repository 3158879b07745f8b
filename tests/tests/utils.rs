use press::collector::{Collector, Receiver};
use press::ReportError;
use press_core::Outcome;
use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("press=debug,mock_service=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Write `source` to a temporary Lua file that lives as long as the returned handle.
#[allow(unused)]
pub fn script(source: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".lua")
        .tempfile()
        .unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file
}

/// Outcomes and the finalize duration seen by a [`Collect`].
#[derive(Clone, Default)]
pub struct Collected {
    pub outcomes: Arc<Mutex<Vec<Outcome>>>,
    pub total: Arc<Mutex<Option<Duration>>>,
}

#[allow(unused)]
impl Collected {
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn total(&self) -> Option<Duration> {
        *self.total.lock().unwrap()
    }
}

pub struct Collect(Collected);

#[allow(unused)]
impl Collect {
    pub fn new() -> (Self, Collected) {
        let collected = Collected::default();
        (Self(collected.clone()), collected)
    }
}

impl Collector for Collect {
    async fn consume(&mut self, results: Receiver<Outcome>) {
        while let Ok(outcome) = results.recv().await {
            self.0.outcomes.lock().unwrap().push(outcome);
        }
    }

    fn finalize(&mut self, total: Duration) -> Result<(), ReportError> {
        *self.0.total.lock().unwrap() = Some(total);
        Ok(())
    }
}

/// A report sink that can be read back after the run.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

#[allow(unused)]
impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
