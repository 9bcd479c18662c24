//! Output sink collaborator.
//!
//! The bridge never returns errors across its `init`/`start`/`stop`
//! boundary; every outcome is reported through a [`BridgeSink`] supplied by
//! the host. The default sink renders through `tracing`.

use std::sync::Mutex;

use tracing::{error, info, warn};

/// Host-facing message sink.
pub trait BridgeSink: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn severe(&self, message: &str);
}

/// Default sink mapping messages onto the tracing macros.
pub struct TracingSink;

impl BridgeSink for TracingSink {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warning(&self, message: &str) {
        warn!("{message}");
    }

    fn severe(&self, message: &str) {
        error!("{message}");
    }
}

/// Message severity as recorded by [`MemorySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    Info,
    Warning,
    Severe,
}

/// Sink that buffers messages in memory, for hosts that render output
/// themselves and for assertions in tests.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(SinkLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded messages in emission order.
    pub fn messages(&self) -> Vec<(SinkLevel, String)> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True when any recorded message at `level` contains `needle`.
    pub fn contains(&self, level: SinkLevel, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    fn push(&self, level: SinkLevel, message: &str) {
        let mut guard = match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((level, message.to_string()));
    }
}

impl BridgeSink for MemorySink {
    fn info(&self, message: &str) {
        self.push(SinkLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(SinkLevel::Warning, message);
    }

    fn severe(&self, message: &str) {
        self.push(SinkLevel::Severe, message);
    }
}
