//! Outcome events.
//!
//! Fire-and-forget: the engine appends to whatever sink it was given and
//! never waits for, or learns about, delivery. Off-chain indexers consume
//! the log; nothing in the core reads it back.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single emitted event: a name plus flat key/value fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub name: &'static str,
    pub fields: Vec<(&'static str, String)>,
    /// Wall-clock emission stamp, for indexer ordering diagnostics only —
    /// consensus ordering comes from the surrounding ledger.
    pub emitted_at: DateTime<Utc>,
}

impl Event {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            emitted_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// The value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Best-effort append-only sink.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// Emits events as structured `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: Event) {
        tracing::info!(name = event.name, fields = ?event.fields, "event");
    }
}

/// Buffers events in memory so tests can assert on them.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<Event>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events with the given name, in emission order.
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.name == name).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_builder_and_lookup() {
        let event = Event::new("order_executed")
            .field("key", "req:0101")
            .field("output", 42u64);
        assert_eq!(event.get("key"), Some("req:0101"));
        assert_eq!(event.get("output"), Some("42"));
        assert_eq!(event.get("missing"), None);
    }

    #[test]
    fn recording_sink_buffers_in_order() {
        let mut sink = RecordingSink::new();
        sink.emit(Event::new("a"));
        sink.emit(Event::new("b"));
        sink.emit(Event::new("a"));
        assert_eq!(sink.events.len(), 3);
        assert_eq!(sink.named("a").len(), 2);
        assert_eq!(sink.named("b").len(), 1);
    }

    #[test]
    fn serializes_to_json() {
        let event = Event::new("deposit_created").field("market", "0xab");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("deposit_created"));
        assert!(json.contains("0xab"));
    }
}
