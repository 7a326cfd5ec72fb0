//! Google Calendar v3 implementation of the sink gateway.
//!
//! The gateway is handed a ready bearer token; obtaining and refreshing
//! credentials is the deployment's problem, not this crate's.

use super::{EntryId, SinkEntry, SinkError, SinkGateway};
use crate::normalize::Event;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

const API_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars";

pub struct GoogleCalendarSink {
    client: reqwest::Client,
    calendar_id: String,
    token: String,
    timezone: Tz,
}

impl GoogleCalendarSink {
    pub fn new(
        client: reqwest::Client,
        calendar_id: impl Into<String>,
        token: impl Into<String>,
        timezone: Tz,
    ) -> Self {
        Self { client, calendar_id: calendar_id.into(), token: token.into(), timezone }
    }

    fn events_url(&self) -> String {
        format!("{}/{}/events", API_BASE, self.calendar_id)
    }

    /// Render a naive sheet timestamp as RFC 3339 in the deployment
    /// time zone, as the `timeMin` parameter requires.
    fn to_rfc3339(&self, at: NaiveDateTime) -> Result<String, SinkError> {
        self.timezone
            .from_local_datetime(&at)
            .single()
            .map(|dt| dt.to_rfc3339())
            .ok_or_else(|| SinkError::Permanent(format!("ambiguous local time {}", at)))
    }
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    description: Option<String>,
    start: Option<ApiEventTime>,
}

#[derive(Debug, Deserialize)]
struct ApiEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Inserted {
    id: String,
}

/// Map an HTTP status onto the retry classification: rate limits,
/// request timeouts and server trouble are worth one more attempt,
/// anything else is a bad request and stays failed.
fn classify_status(status: StatusCode) -> SinkError {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        SinkError::Transient(format!("calendar API returned {}", status))
    } else {
        SinkError::Permanent(format!("calendar API returned {}", status))
    }
}

/// Transport-level failures (DNS, timeouts, resets) are transient.
fn classify_transport(err: reqwest::Error) -> SinkError {
    SinkError::Transient(err.to_string())
}

impl ApiEvent {
    fn into_entry(self) -> Option<SinkEntry> {
        // All-day entries carry `date` instead of `dateTime`; this
        // engine never creates those, so they cannot be managed.
        let raw = self.start.and_then(|s| s.date_time)?;
        let start = DateTime::parse_from_rfc3339(&raw).ok()?.naive_local();
        Some(SinkEntry { id: EntryId(self.id), description: self.description, start })
    }
}

#[async_trait]
impl SinkGateway for GoogleCalendarSink {
    async fn list_future_entries(&self, since: NaiveDateTime) -> Result<Vec<SinkEntry>, SinkError> {
        let response = self
            .client
            .get(self.events_url())
            .bearer_auth(&self.token)
            .query(&[
                ("timeMin", self.to_rfc3339(since)?),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let list: EventList = response.json().await.map_err(classify_transport)?;
        let entries: Vec<SinkEntry> =
            list.items.into_iter().filter_map(ApiEvent::into_entry).collect();
        debug!("Listed {} future entries on {}", entries.len(), self.calendar_id);
        Ok(entries)
    }

    async fn insert(&self, event: &Event) -> Result<EntryId, SinkError> {
        let body = json!({
            "summary": event.title,
            "location": event.location,
            "colorId": event.color.id().to_string(),
            "description": event.description,
            "start": {
                "dateTime": event.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "timeZone": self.timezone.name(),
            },
            "end": {
                "dateTime": event.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "timeZone": self.timezone.name(),
            },
            "reminders": { "useDefault": true },
        });

        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!("Insert of {:?} rejected with {}", event.title, status);
            return Err(classify_status(status));
        }

        let inserted: Inserted = response.json().await.map_err(classify_transport)?;
        Ok(EntryId(inserted.id))
    }

    async fn delete(&self, id: &EntryId) -> Result<(), SinkError> {
        let response = self
            .client
            .delete(format!("{}/{}", self.events_url(), id.0))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }
        Ok(())
    }
}
