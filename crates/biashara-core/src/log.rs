//! # Event Log
//!
//! The append-only, ordered, in-memory sequence of business events for one
//! tenant. Single source of truth for every projection.
//!
//! ## Append Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  drafts ──► validate every payload ──► stamp ids ──► push               │
//! │                   │                                                     │
//! │                   └── any failure: nothing appended                     │
//! │                                                                         │
//! │  ids:   1, 2, 3, ...  (no gaps, insertion order = replay order)         │
//! │  API:   append / append_all / read_all / get                            │
//! │         (there is no update and no delete)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence happens outside this crate. The tenant service calls
//! [`EventLog::stamp`] to build the events, stores them, then commits them
//! with [`EventLog::extend`].

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::event::{Event, EventDraft, EventId};

/// Append-only event sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        EventLog { events: Vec::new() }
    }

    /// Rebuilds a log from persisted events.
    ///
    /// Ids must run 1, 2, 3, ... without gaps and every payload must pass
    /// its structural checks; anything else is a corrupt log.
    pub fn from_events(events: Vec<Event>) -> CoreResult<Self> {
        let mut log = EventLog::new();
        log.extend(events)?;
        Ok(log)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Id of the most recent event, if any.
    pub fn last_id(&self) -> Option<EventId> {
        self.events.last().map(|e| e.id)
    }

    /// Id the next appended event will receive.
    pub fn next_id(&self) -> EventId {
        self.last_id()
            .map(|id| id.next())
            .unwrap_or_else(|| EventId::new(1))
    }

    /// Looks up an event by id.
    pub fn get(&self, id: EventId) -> Option<&Event> {
        let index = usize::try_from(id.value()).ok()?.checked_sub(1)?;
        self.events.get(index)
    }

    /// Iterates events in insertion order. Call again to restart.
    pub fn read_all(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Events appended after `id` (all events for `None`).
    pub fn events_after(&self, id: Option<EventId>) -> &[Event] {
        let start = id
            .and_then(|id| usize::try_from(id.value()).ok())
            .unwrap_or(0)
            .min(self.events.len());
        &self.events[start..]
    }

    /// Appends a single event.
    pub fn append(&mut self, draft: EventDraft) -> Result<EventId, ValidationError> {
        let mut ids = self.append_all(vec![draft])?;
        Ok(ids.remove(0))
    }

    /// Appends several events atomically: all are validated before any is
    /// appended.
    pub fn append_all(&mut self, drafts: Vec<EventDraft>) -> Result<Vec<EventId>, ValidationError> {
        let events = self.stamp(drafts, Utc::now())?;
        let ids = events.iter().map(|e| e.id).collect();
        self.events.extend(events);
        Ok(ids)
    }

    /// Validates drafts and assigns the ids they would receive, without
    /// appending them.
    pub fn stamp(
        &self,
        drafts: Vec<EventDraft>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Vec<Event>, ValidationError> {
        for draft in &drafts {
            draft.kind.validate()?;
        }

        let mut id = self.next_id();
        let mut events = Vec::with_capacity(drafts.len());
        for draft in drafts {
            events.push(draft.into_event(id, recorded_at));
            id = id.next();
        }
        Ok(events)
    }

    /// Commits already-stamped events (e.g. after they were persisted).
    ///
    /// Rejects the whole batch if ids do not continue the sequence or a
    /// payload is invalid.
    pub fn extend(&mut self, events: Vec<Event>) -> CoreResult<()> {
        let mut expected = self.next_id();
        for event in &events {
            if event.id != expected {
                return Err(CoreError::CorruptLog(format!(
                    "expected event {} but found event {}",
                    expected, event.id
                )));
            }
            event.kind.validate().map_err(|e| {
                CoreError::CorruptLog(format!("event {} has an invalid payload: {}", event.id, e))
            })?;
            expected = expected.next();
        }
        self.events.extend(events);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.read_all()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
