//! Watches the sheet's reference row and raises a notification when it
//! moves.
//!
//! The sheet maintainers keep a marker row indicating where "now" is.
//! This watcher is deliberately separate from the reconciler: it only
//! compares the current reference date against the one persisted by the
//! previous run and hands changes to a [`Notifier`].

use crate::source::SourceRow;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceChange {
    pub previous: NaiveDate,
    pub current: NaiveDate,
    pub detected_at: NaiveDateTime,
}

/// Delivery of change notifications is an external concern (mail, chat,
/// whatever the deployment wires in); the watcher only calls this.
pub trait Notifier {
    fn notify(&self, change: &ReferenceChange) -> Result<()>;
}

/// Fallback notifier: just put the change in the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, change: &ReferenceChange) -> Result<()> {
        info!(
            "Reference row moved from {} to {} (detected {})",
            change.previous, change.current, change.detected_at
        );
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WatchState {
    reference_date: NaiveDate,
}

/// The date of the sheet's current reference row: the first row whose
/// date cell parses and is not yet past. The CSV export does not carry
/// the cell color the maintainers use as the marker, so the first
/// not-yet-past row is the stand-in.
pub fn current_reference_date(
    rows: &[SourceRow],
    date_format: &str,
    today: NaiveDate,
) -> Option<NaiveDate> {
    rows.iter()
        .filter_map(|row| NaiveDate::parse_from_str(&row.date, date_format).ok())
        .find(|date| *date >= today)
}

/// Compare `current` to the persisted previous value. On a change the
/// new value is persisted and the notifier invoked; the first run only
/// seeds the state file and reports nothing.
pub fn check_reference(
    state_path: &Path,
    current: NaiveDate,
    now: NaiveDateTime,
    notifier: &dyn Notifier,
) -> Result<Option<ReferenceChange>> {
    let previous = load_state(state_path)?;

    let Some(previous) = previous else {
        save_state(state_path, current)?;
        debug!("Seeded reference state with {}", current);
        return Ok(None);
    };

    if previous == current {
        debug!("Reference row unchanged at {}", current);
        return Ok(None);
    }

    save_state(state_path, current)?;
    let change = ReferenceChange { previous, current, detected_at: now };
    notifier.notify(&change)?;
    Ok(Some(change))
}

fn load_state(path: &Path) -> Result<Option<NaiveDate>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read watch state at {}", path.display()))?;
    let state: WatchState = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse watch state at {}", path.display()))?;
    Ok(Some(state.reference_date))
}

fn save_state(path: &Path, reference_date: NaiveDate) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(&WatchState { reference_date })?;
    fs::write(path, contents)
        .with_context(|| format!("Failed to write watch state at {}", path.display()))?;
    Ok(())
}
