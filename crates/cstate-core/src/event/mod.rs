//! Host-emitted changeset events and their chronological history.
//!
//! Events are immutable facts observed after a snapshot was taken. The sync
//! layer stores them as
//!
//! ```text
//! {"kind": "<host>:<verb>", "data": {...host payload...}}
//! ```
//!
//! and the kind decides how `data` is deserialized.
//!
//! A [`History`] is the ordered, host-checked view the rest of the engine
//! folds over: timestamp ascending, ties kept in input order.

pub mod kind;
pub mod payload;

pub use kind::{EventKind, UnknownEventKind};
pub use payload::{EventPayload, PayloadParseError, Timestamped};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReconstructError;
use crate::model::HostKind;

/// A single host-emitted fact about a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetEvent {
    pub payload: EventPayload,
}

impl ChangesetEvent {
    #[must_use]
    pub const fn new(payload: EventPayload) -> Self {
        Self { payload }
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    #[must_use]
    pub const fn host(&self) -> HostKind {
        self.kind().host()
    }

    /// When the host says the event happened (not when it was stored).
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.payload.timestamp()
    }
}

impl From<EventPayload> for ChangesetEvent {
    fn from(payload: EventPayload) -> Self {
        Self::new(payload)
    }
}

impl Serialize for ChangesetEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct EventRef<'a> {
            kind: EventKind,
            data: &'a EventPayload,
        }

        EventRef {
            kind: self.kind(),
            data: &self.payload,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChangesetEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        /// Helper struct for two-pass deserialization: first get the kind,
        /// then use it to deserialize the data payload.
        #[derive(Deserialize)]
        struct EventRaw {
            kind: EventKind,
            data: serde_json::Value,
        }

        let raw = EventRaw::deserialize(deserializer)?;
        let payload =
            EventPayload::deserialize_for(raw.kind, raw.data).map_err(serde::de::Error::custom)?;
        Ok(Self { payload })
    }
}

/// Events of one changeset in replay order.
///
/// Borrowed from the caller's slice; the input is never reordered or
/// mutated.
#[derive(Debug, Clone, Default)]
pub struct History<'a> {
    events: Vec<&'a ChangesetEvent>,
}

impl<'a> History<'a> {
    /// Order `events` for replay after checking they all come from `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::HostKindMismatch`] for the first event that
    /// was emitted by a different host.
    pub fn for_host(host: HostKind, events: &'a [ChangesetEvent]) -> Result<Self, ReconstructError> {
        if let Some(stray) = events.iter().find(|event| event.host() != host) {
            return Err(ReconstructError::HostKindMismatch {
                expected: host,
                found: stray.host(),
                kind: stray.kind(),
            });
        }
        Ok(Self::ordered(events))
    }

    /// Order `events` for replay without a host check.
    #[must_use]
    pub fn ordered(events: &'a [ChangesetEvent]) -> Self {
        let mut events: Vec<&ChangesetEvent> = events.iter().collect();
        // Stable: equal timestamps keep their input order.
        events.sort_by_key(|event| event.timestamp());
        Self { events }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'a ChangesetEvent> + '_ {
        self.events.iter().copied()
    }

    /// Events strictly newer than `boundary`, oldest first.
    ///
    /// Events at or before the boundary are already reflected in the
    /// snapshot taken at that time.
    pub fn since(&self, boundary: DateTime<Utc>) -> impl Iterator<Item = &'a ChangesetEvent> + '_ {
        self.iter().filter(move |event| event.timestamp() > boundary)
    }
}
