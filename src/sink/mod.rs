//! Calendar sink contract.
//!
//! The reconciler mutates the sink only through [`SinkGateway`], so a
//! fake in-memory sink can stand in for the real calendar in tests.

pub mod google;

use crate::normalize::{Event, MANAGED_MARKER};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Opaque identifier the sink assigns to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryId(pub String);

/// An entry as the sink reports it. Plenty of entries are created by
/// hand and have no description at all; that is ordinary, not an error.
#[derive(Debug, Clone)]
pub struct SinkEntry {
    pub id: EntryId,
    pub description: Option<String>,
    pub start: NaiveDateTime,
}

impl SinkEntry {
    /// Whether this engine owns the entry. Only entries whose
    /// description opens with the managed marker may ever be deleted.
    pub fn is_managed(&self) -> bool {
        self.description.as_deref().is_some_and(|d| d.starts_with(MANAGED_MARKER))
    }
}

/// Classification drives the retry policy: only transient failures are
/// ever retried, and exactly once.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SinkError {
    #[error("transient sink error: {0}")]
    Transient(String),
    #[error("permanent sink error: {0}")]
    Permanent(String),
}

impl SinkError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transient(_))
    }
}

/// The three operations the reconciler needs from a calendar. A gateway
/// instance is bound to one calendar; that binding is what keeps
/// concurrently running profiles isolated from each other.
#[async_trait]
pub trait SinkGateway: Send + Sync {
    /// Entries starting at `since` or later, ordered by start time.
    async fn list_future_entries(&self, since: NaiveDateTime) -> Result<Vec<SinkEntry>, SinkError>;

    async fn insert(&self, event: &Event) -> Result<EntryId, SinkError>;

    async fn delete(&self, id: &EntryId) -> Result<(), SinkError>;
}
