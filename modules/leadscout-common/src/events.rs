use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::Lead;

/// Tagged union of everything the core streams to a job's subscriber. Each
/// variant carries a monotonically non-decreasing `at` timestamp; the sink
/// decides how to frame these for its transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Status { at: DateTime<Utc>, message: String },
    Thought { at: DateTime<Utc>, message: String },
    WorkerStart { at: DateTime<Utc>, source: String },
    WorkerUpdate { at: DateTime<Utc>, source: String, message: String },
    WorkerComplete {
        at: DateTime<Utc>,
        source: String,
        lead_count: usize,
        success: bool,
    },
    LeadBatch {
        at: DateTime<Utc>,
        source: String,
        leads: Vec<Lead>,
    },
    Completed { at: DateTime<Utc>, summary: String },
    Cancelled { at: DateTime<Utc> },
    Error { at: DateTime<Utc>, message: String },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Status { .. } => "status",
            Event::Thought { .. } => "thought",
            Event::WorkerStart { .. } => "worker_start",
            Event::WorkerUpdate { .. } => "worker_update",
            Event::WorkerComplete { .. } => "worker_complete",
            Event::LeadBatch { .. } => "lead_batch",
            Event::Completed { .. } => "completed",
            Event::Cancelled { .. } => "cancelled",
            Event::Error { .. } => "error",
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::Status { at, .. }
            | Event::Thought { at, .. }
            | Event::WorkerStart { at, .. }
            | Event::WorkerUpdate { at, .. }
            | Event::WorkerComplete { at, .. }
            | Event::LeadBatch { at, .. }
            | Event::Completed { at, .. }
            | Event::Cancelled { at }
            | Event::Error { at, .. } => *at,
        }
    }

    /// The event as a structured payload, stripped of its tag, for hosts
    /// that frame `type` and payload separately (e.g. SSE event-name +
    /// data).
    pub fn to_payload(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).expect("Event always serializes");
        if let serde_json::Value::Object(map) = &mut value {
            map.remove("type");
        }
        value
    }
}

/// Something that accepts [`Event`]s as the core emits them, in order. A
/// host adapts this to whatever transport it exposes (SSE, websocket, log
/// file, in-memory `Vec` for tests).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Collects every emitted event in memory, for tests and small embeddings.
#[derive(Default)]
pub struct VecSink(std::sync::Mutex<Vec<Event>>);

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<Event> {
        self.0.into_inner().unwrap_or_default()
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for VecSink {
    fn emit(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }
}
