//! Injected log sink.
//!
//! Components never read the process-wide subscriber. Each one is handed a
//! [`Logger`] and emits its events and spans through it, so tests can run
//! components side by side with different sinks.

use std::fmt;

use tracing::{dispatcher, Dispatch};

/// Cloneable handle to the subscriber a component logs into.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Drops everything.
    pub fn discard() -> Self {
        Self::new(Dispatch::none())
    }

    /// Run `f` with this logger as the active subscriber. Events and spans
    /// created inside `f` go to this logger only.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::discard()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::Logger;

    /// In-memory log sink for assertions on emitted events.
    #[derive(Clone, Default)]
    pub(crate) struct LogBuffer {
        bytes: Arc<Mutex<Vec<u8>>>,
    }

    impl LogBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
        }

        /// Lines emitted at `level` (e.g. "ERROR").
        pub(crate) fn lines_at(&self, level: &str) -> Vec<String> {
            self.contents()
                .lines()
                .filter(|line| line.contains(level))
                .map(str::to_owned)
                .collect()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn capturing() -> (Logger, LogBuffer) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        (Logger::new(tracing::Dispatch::new(subscriber)), buffer)
    }
}
