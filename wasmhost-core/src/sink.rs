//! Output sinks for guest diagnostics.
//!
//! Host logging imports never write to a global console directly. They
//! emit into an [`OutputSink`] handed to the import table, so embedders
//! pick where output goes and tests can capture it exactly.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// A single value emitted by a guest through a logging import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Emission {
    /// An integer passed to the integer logger (widened to 64 bits).
    Integer(i64),
    /// A string decoded from guest memory by the string logger.
    Text(String),
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Destination for guest emissions.
///
/// `emit` is called synchronously from inside a host function, once per
/// guest call, before control returns to the guest.
pub trait OutputSink: Send + Sync {
    /// Record one emission.
    fn emit(&self, emission: Emission);
}

impl<S: OutputSink + ?Sized> OutputSink for Arc<S> {
    fn emit(&self, emission: Emission) {
        (**self).emit(emission)
    }
}

/// Sink that prints each emission on its own line to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl StdoutSink {
    /// Create a new stdout sink.
    pub fn new() -> Self {
        Self
    }
}

impl OutputSink for StdoutSink {
    fn emit(&self, emission: Emission) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = writeln!(lock, "{}", emission) {
            tracing::warn!(error = %e, "Failed to write guest output to stdout");
        }
    }
}

/// Sink that forwards emissions to `tracing` at info level.
#[derive(Debug, Clone)]
pub struct TracingSink {
    label: String,
}

impl TracingSink {
    /// Create a tracing sink tagging events with `module`.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            label: module.into(),
        }
    }
}

impl OutputSink for TracingSink {
    fn emit(&self, emission: Emission) {
        match &emission {
            Emission::Integer(v) => {
                tracing::info!(module = %self.label, value = *v, "[WASM] {}", v)
            }
            Emission::Text(s) => tracing::info!(module = %self.label, "[WASM] {}", s),
        }
    }
}

/// Sink that stores every emission in memory.
///
/// Cloning a `RecordingSink` shares the underlying buffer, so a test can
/// hand one clone to the import table and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Emission>>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of all recorded emissions, oldest first.
    pub fn emissions(&self) -> Vec<Emission> {
        self.events.lock().clone()
    }

    /// Get the recorded text emissions, oldest first.
    pub fn texts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Emission::Text(s) => Some(s.clone()),
                Emission::Integer(_) => None,
            })
            .collect()
    }

    /// Get the recorded integer emissions, oldest first.
    pub fn integers(&self) -> Vec<i64> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Emission::Integer(v) => Some(*v),
                Emission::Text(_) => None,
            })
            .collect()
    }

    /// Get the number of recorded emissions.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take all recorded emissions, leaving the sink empty.
    pub fn drain(&self) -> Vec<Emission> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl OutputSink for RecordingSink {
    fn emit(&self, emission: Emission) {
        self.events.lock().push(emission);
    }
}

/// Shared, type-erased sink handle.
pub type SharedSink = Arc<dyn OutputSink>;
