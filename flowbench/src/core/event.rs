//! Events and the messages that carry them between stages.

use serde::{Deserialize, Serialize};

use crate::utils::{generate_event_id, now_utc, sentinel_id, Timestamp};

/// Opaque key-value map used for event payloads and metadata.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Schema version assigned to events unless specified otherwise.
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

/// An immutable unit of data flowing through a pipeline.
///
/// Stages that change data build a new event with [`Event::with_payload`],
/// which keeps the identity, timestamp, schema version and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: String,
    ts: Timestamp,
    schema_version: u32,
    payload: Payload,
    #[serde(default)]
    meta: Payload,
}

impl Event {
    /// Creates an event with a fresh identity and the current timestamp.
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            id: generate_event_id(),
            ts: now_utc(),
            schema_version: DEFAULT_SCHEMA_VERSION,
            payload,
            meta: Payload::new(),
        }
    }

    /// Creates an event from all of its parts.
    #[must_use]
    pub fn from_parts(
        id: impl Into<String>,
        ts: Timestamp,
        schema_version: u32,
        payload: Payload,
        meta: Payload,
    ) -> Self {
        Self {
            id: id.into(),
            ts,
            schema_version,
            payload,
            meta,
        }
    }

    /// Sets the schema version on a freshly created event.
    #[must_use]
    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    /// Sets the metadata on a freshly created event.
    #[must_use]
    pub fn with_meta(mut self, meta: Payload) -> Self {
        self.meta = meta;
        self
    }

    /// Returns a new event with the same identity and a replaced payload.
    #[must_use]
    pub fn with_payload(&self, payload: Payload) -> Self {
        Self {
            id: self.id.clone(),
            ts: self.ts,
            schema_version: self.schema_version,
            payload,
            meta: self.meta.clone(),
        }
    }

    /// The globally unique event identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the event was created.
    #[must_use]
    pub fn ts(&self) -> Timestamp {
        self.ts
    }

    /// The schema version tag.
    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// The business data.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Out-of-band annotations.
    #[must_use]
    pub fn meta(&self) -> &Payload {
        &self.meta
    }
}

/// The stop token for one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sentinel {
    id: String,
}

impl Sentinel {
    /// Creates the sentinel scoped to `run_id`.
    #[must_use]
    pub fn for_run(run_id: &str) -> Self {
        Self {
            id: sentinel_id(run_id),
        }
    }

    /// The sentinel identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Element type of every pipeline queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A data event.
    Data(Event),
    /// End of stream for the run named by the sentinel.
    Stop(Sentinel),
}

impl Message {
    /// Returns true for a stop message.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop(_))
    }

    /// Returns the event carried by a data message.
    #[must_use]
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Data(event) => Some(event),
            Self::Stop(_) => None,
        }
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Self::Data(event)
    }
}
