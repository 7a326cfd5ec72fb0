//! Shared test doubles: an in-memory sink gateway with failure
//! injection, and a canned source adapter.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sheetcal::{Event, EntryId, Profile, SinkEntry, SinkError, SinkGateway, SourceAdapter, SourceRow};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone)]
pub struct StoredEntry {
    pub id: EntryId,
    pub title: String,
    pub description: Option<String>,
    pub start: NaiveDateTime,
}

impl StoredEntry {
    fn as_sink_entry(&self) -> SinkEntry {
        SinkEntry { id: self.id.clone(), description: self.description.clone(), start: self.start }
    }
}

/// In-memory stand-in for the calendar. Thread-safe so the reconciler's
/// concurrent phases can share it.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<StoredEntry>>,
    next_id: AtomicUsize,
    /// title -> number of insert attempts that should fail transiently
    insert_failures: Mutex<HashMap<String, usize>>,
    /// number of upcoming delete calls that should fail transiently
    delete_failures: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an entry as if someone (or a previous run) had
    /// created it.
    pub fn seed(&self, title: &str, description: Option<&str>, start: NaiveDateTime) -> EntryId {
        let id = EntryId(format!("seeded-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.entries.lock().unwrap().push(StoredEntry {
            id: id.clone(),
            title: title.to_string(),
            description: description.map(str::to_string),
            start,
        });
        id
    }

    /// The next `attempts` inserts of an event with this title fail
    /// with a transient error.
    pub fn fail_inserts(&self, title: &str, attempts: usize) {
        self.insert_failures.lock().unwrap().insert(title.to_string(), attempts);
    }

    /// The next `attempts` delete calls fail with a transient error.
    pub fn fail_deletes(&self, attempts: usize) {
        self.delete_failures.store(attempts, Ordering::SeqCst);
    }

    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> =
            self.entries.lock().unwrap().iter().map(|e| e.title.clone()).collect();
        titles.sort();
        titles
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.lock().unwrap().iter().any(|e| &e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl SinkGateway for MemorySink {
    async fn list_future_entries(&self, since: NaiveDateTime) -> Result<Vec<SinkEntry>, SinkError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut entries: Vec<SinkEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.start >= since)
            .map(StoredEntry::as_sink_entry)
            .collect();
        entries.sort_by_key(|e| e.start);
        Ok(entries)
    }

    async fn insert(&self, event: &Event) -> Result<EntryId, SinkError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        let mut failures = self.insert_failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&event.title) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SinkError::Transient("injected insert failure".to_string()));
            }
        }
        drop(failures);

        let id = EntryId(format!("entry-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.entries.lock().unwrap().push(StoredEntry {
            id: id.clone(),
            title: event.title.clone(),
            description: Some(event.description.clone()),
            start: event.start,
        });
        Ok(id)
    }

    async fn delete(&self, id: &EntryId) -> Result<(), SinkError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.delete_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.delete_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SinkError::Transient("injected delete failure".to_string()));
        }

        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| &e.id != id);
        if entries.len() == before {
            return Err(SinkError::Permanent("no such entry".to_string()));
        }
        Ok(())
    }
}

/// Source adapter serving canned rows.
pub struct SheetStub {
    rows: Vec<SourceRow>,
}

impl SheetStub {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }
}

#[async_trait]
impl SourceAdapter for SheetStub {
    async fn rows(&self) -> anyhow::Result<Vec<SourceRow>> {
        Ok(self.rows.clone())
    }
}

/// A sheet row that normalizes into a clean future event.
pub fn scheduled_row(title: &str, date: &str, assignment: &str) -> SourceRow {
    SourceRow {
        date: date.to_string(),
        title: title.to_string(),
        call: "8:00".to_string(),
        start: "9:00".to_string(),
        end: "11:00PM".to_string(),
        location: "Chapel".to_string(),
        department: "Music".to_string(),
        record: "Yes".to_string(),
        coordinator: "Jane".to_string(),
        assignment: assignment.to_string(),
        extras: Vec::new(),
    }
}

pub fn test_profile(initials: &str) -> Profile {
    Profile {
        name: "test".to_string(),
        initials: initials.to_string(),
        sheet: "/tmp/unused.csv".to_string(),
        assignment_column: "SOUND".to_string(),
        date_format: "%A-%b-%d-%y".to_string(),
        calendar_id: "test@example.com".to_string(),
        color: sheetcal::EventColor::Tomato,
        token_env: "SHEETCAL_TOKEN".to_string(),
    }
}
