//! The reconciliation engine: make one profile's calendar converge to
//! the current contents of its sheet.
//!
//! A run deletes every managed future entry, then re-inserts the events
//! the sheet currently calls for. The delete loop repeats until a pass
//! deletes nothing, because the sink's listing may be paginated or
//! eventually consistent and a single pass is not guaranteed to observe
//! everything. Fetching and normalizing the sheet runs concurrently
//! with the deleting; inserting starts only once deleting has
//! quiesced, so a half-cleaned calendar never receives new entries.

use crate::config::Profile;
use crate::normalize::{normalize, Event};
use crate::select::select_rows;
use crate::sink::{SinkError, SinkGateway};
use crate::source::SourceAdapter;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::{debug, info};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// An event whose insert failed even after its retry. The run carries
/// on; the entry is simply reported.
#[derive(Debug)]
pub struct UnresolvedEntry {
    pub title: String,
    pub error: SinkError,
}

/// What one reconcile run did.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub deleted: usize,
    pub inserted: usize,
    /// Rows selected but skipped by the normalizer.
    pub skipped: usize,
    pub unresolved: Vec<UnresolvedEntry>,
}

impl ReconcileReport {
    pub fn clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

pub struct Reconciler<'a, S: SinkGateway + ?Sized> {
    sink: &'a S,
    retry_delay: Duration,
}

impl<'a, S: SinkGateway + ?Sized> Reconciler<'a, S> {
    pub fn new(sink: &'a S, retry_delay: Duration) -> Self {
        Self { sink, retry_delay }
    }

    /// Run the full delete-then-insert cycle for one profile.
    ///
    /// Safe to run repeatedly: a second run against an unchanged sheet
    /// leaves the calendar with the same single set of managed entries.
    /// Entries without the managed marker are never touched.
    pub async fn run(
        &self,
        source: &dyn SourceAdapter,
        profile: &Profile,
        now: NaiveDateTime,
    ) -> Result<ReconcileReport> {
        info!("Reconciling profile '{}'", profile.name);

        let (deleted, fetched) =
            tokio::join!(self.delete_stale(now), fetch_and_normalize(source, profile, now));

        // A listing that fails even after its retry aborts this profile:
        // inserting without a quiesced delete phase could duplicate
        // entries. Same for an unreadable sheet.
        let deleted = deleted
            .with_context(|| format!("Delete phase failed for profile '{}'", profile.name))?;
        let (events, skipped) = fetched?;

        let mut report =
            ReconcileReport { deleted, inserted: 0, skipped, unresolved: Vec::new() };

        for event in &events {
            match self.with_retry(|| self.sink.insert(event)).await {
                Ok(_) => {
                    debug!("Inserted {:?}", event.title);
                    report.inserted += 1;
                }
                Err(error) => {
                    debug!("Could not insert {:?}: {}", event.title, error);
                    report.unresolved.push(UnresolvedEntry { title: event.title.clone(), error });
                }
            }
        }

        info!(
            "Profile '{}': {} deleted, {} inserted, {} skipped, {} unresolved",
            profile.name,
            report.deleted,
            report.inserted,
            report.skipped,
            report.unresolved.len()
        );
        Ok(report)
    }

    /// Delete managed future entries until a pass deletes nothing.
    ///
    /// Only entries carrying the managed marker and starting after
    /// `now` are candidates; an entry whose delete fails even after its
    /// retry is left in place for the next run.
    async fn delete_stale(&self, now: NaiveDateTime) -> Result<usize, SinkError> {
        let mut total = 0;
        loop {
            let entries = self.with_retry(|| self.sink.list_future_entries(now)).await?;

            let candidates =
                entries.into_iter().filter(|e| e.is_managed() && e.start > now).map(|e| e.id);

            let mut pass_deleted = 0;
            for id in candidates {
                match self.with_retry(|| self.sink.delete(&id)).await {
                    Ok(()) => pass_deleted += 1,
                    Err(error) => debug!("Leaving entry {} in place: {}", id.0, error),
                }
            }

            total += pass_deleted;
            if pass_deleted == 0 {
                break;
            }
            debug!("Deleted {} entries, listing again", pass_deleted);
        }
        Ok(total)
    }

    /// One retry after a fixed delay, and only for transient failures.
    /// Every sink call in the engine goes through here.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, SinkError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SinkError>>,
    {
        match op().await {
            Err(error) if error.is_transient() => {
                debug!("Retrying after transient failure: {}", error);
                sleep(self.retry_delay).await;
                op().await
            }
            other => other,
        }
    }
}

/// Read the sheet, pick the profile's rows and normalize them. Returns
/// the insertable events plus how many selected rows were skipped.
pub async fn fetch_and_normalize(
    source: &dyn SourceAdapter,
    profile: &Profile,
    now: NaiveDateTime,
) -> Result<(Vec<Event>, usize)> {
    let rows = source.rows().await.context("Failed to fetch sheet rows")?;
    let selected = select_rows(&rows, &profile.initials);
    debug!("{} of {} rows selected for '{}'", selected.len(), rows.len(), profile.initials);

    let events: Vec<Event> =
        selected.iter().filter_map(|&i| normalize(&rows[i], profile, now)).collect();
    let skipped = selected.len() - events.len();
    Ok((events, skipped))
}
