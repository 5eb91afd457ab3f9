//! Record sinks and the service registry used for parser injection.

use crate::error::SinkError;
use crate::handler::Record;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Destination for records extracted by a parser.
pub trait RecordSink: Send + Sync {
    /// Name parsers refer to in `sink "..."` declarations.
    fn name(&self) -> &str;
    /// Accept one record produced by the parser type `parser`.
    fn accept(&self, parser: &str, record: &Record) -> Result<(), SinkError>;
}

/// Writes every record as a log line.
#[derive(Debug, Clone)]
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("log")
    }
}

impl RecordSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&self, parser: &str, record: &Record) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        tracing::info!("[{parser}] {line}");
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    name: String,
    records: Mutex<Vec<(String, Record)>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the collected `(parser, record)` pairs.
    pub fn records(&self) -> Vec<(String, Record)> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&self, parser: &str, record: &Record) -> Result<(), SinkError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| SinkError::Closed(format!("memory sink '{}' poisoned", self.name)))?;
        guard.push((parser.to_string(), record.clone()));
        Ok(())
    }
}

/// Named services available to dependency-injected parser construction.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    sinks: BTreeMap<String, Arc<dyn RecordSink>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink under its own name, replacing any previous one.
    pub fn register_sink(&mut self, sink: Arc<dyn RecordSink>) -> &mut Self {
        self.sinks.insert(sink.name().to_string(), sink);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.register_sink(sink);
        self
    }

    pub fn sink(&self, name: &str) -> Option<Arc<dyn RecordSink>> {
        self.sinks.get(name).cloned()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("sinks", &self.sink_names())
            .finish()
    }
}
