//! Turns a selected sheet row into a canonical calendar event.
//!
//! Rows are heterogeneous and often incomplete; anything that cannot be
//! interpreted is skipped silently rather than reported. Events are
//! recomputed on every run and never persisted.

use crate::config::{EventColor, Profile};
use crate::source::SourceRow;
use crate::time_field::{self, has_digits};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

/// First line of every description this engine writes, and the only
/// signal used to recognize entries it owns in the sink.
pub const MANAGED_MARKER: &str = "Automatic creation";

/// Canonical event, ready for insertion. Start and end are naive and on
/// the same calendar day; the deployment time zone is applied at the
/// sink boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub title: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub color: EventColor,
    pub description: String,
}

/// Normalize one row, or `None` to skip it.
///
/// Skips cover the expected mess of a hand-maintained sheet: blank or
/// unparseable dates, malformed time cells, rows whose end has already
/// passed, and rows with a digitless end cell (nothing scheduled yet).
pub fn normalize(row: &SourceRow, profile: &Profile, now: NaiveDateTime) -> Option<Event> {
    let date = match NaiveDate::parse_from_str(&row.date, &profile.date_format) {
        Ok(date) => date,
        Err(_) => {
            debug!("Skipping row with unparseable date cell {:?}", row.date);
            return None;
        }
    };

    let start_of = |cell: &str| -> Option<NaiveDateTime> {
        let (hour, minute) = match time_field::parse(cell) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!("Skipping row {:?}: {}", row.title, err);
                return None;
            }
        };
        date.and_hms_opt(hour, minute, 0)
    };

    let mut start = start_of(&row.call)?;
    let end = start_of(&row.end)?;

    // Call times are sometimes mis-keyed or entered past a midnight
    // rollover; the dedicated start column is the fallback of record.
    // Applied at most once and not re-validated afterwards.
    if start > end {
        start = start_of(&row.start)?;
    }

    if !has_digits(&row.end) || now >= end {
        return None;
    }

    Some(Event {
        title: row.title.clone(),
        location: row.location.clone(),
        start,
        end,
        color: profile.color,
        description: build_description(row, now),
    })
}

/// Assemble the managed description: marker line, then one line per
/// metadata field. Absent fields render empty rather than being omitted
/// so the block keeps a stable shape per profile.
fn build_description(row: &SourceRow, now: NaiveDateTime) -> String {
    let record = if row.record == "Yes" { "Yes" } else { "No" };

    let mut lines = vec![
        MANAGED_MARKER.to_string(),
        format!("Event Start Time: {}", row.start),
        format!("Event Coordinator: {}", row.coordinator),
        format!("Department: {}", row.department),
        format!("Record: {}", record),
    ];
    for (name, value) in &row.extras {
        lines.push(format!("{}: {}", name, value));
    }
    lines.push(format!("Runtime: {}", now));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_profile() -> Profile {
        Profile {
            name: "test".to_string(),
            initials: "ADH".to_string(),
            sheet: "/tmp/schedule.csv".to_string(),
            assignment_column: "SOUND".to_string(),
            date_format: "%A-%b-%d-%y".to_string(),
            calendar_id: "test@example.com".to_string(),
            color: EventColor::Peacock,
            token_env: "SHEETCAL_TOKEN".to_string(),
        }
    }

    fn test_row() -> SourceRow {
        SourceRow {
            date: "Friday-Jun-05-20".to_string(),
            title: "Commencement".to_string(),
            call: "8:00".to_string(),
            start: "9:00".to_string(),
            end: "11:00AM".to_string(),
            location: "Chapel".to_string(),
            department: "Music".to_string(),
            record: "Yes".to_string(),
            coordinator: "Jane".to_string(),
            assignment: "ADH".to_string(),
            extras: vec![("Lights".to_string(), "BJ".to_string())],
        }
    }

    fn long_ago() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn produces_event_from_well_formed_row() {
        let event = normalize(&test_row(), &test_profile(), long_ago()).unwrap();
        assert_eq!(event.title, "Commencement");
        assert_eq!(event.location, "Chapel");
        assert_eq!(event.color, EventColor::Peacock);
        assert_eq!(
            event.start,
            NaiveDate::from_ymd_opt(2020, 6, 5).unwrap().and_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            event.end,
            NaiveDate::from_ymd_opt(2020, 6, 5).unwrap().and_hms_opt(11, 0, 0).unwrap()
        );
    }

    #[test]
    fn description_starts_with_the_managed_marker() {
        let event = normalize(&test_row(), &test_profile(), long_ago()).unwrap();
        assert_eq!(event.description.lines().next().unwrap(), MANAGED_MARKER);
    }

    #[test]
    fn description_keeps_a_stable_line_shape() {
        let mut row = test_row();
        row.coordinator.clear();
        row.department.clear();
        let event = normalize(&row, &test_profile(), long_ago()).unwrap();
        let lines: Vec<&str> = event.description.lines().collect();
        assert_eq!(lines[2], "Event Coordinator: ");
        assert_eq!(lines[3], "Department: ");
        assert_eq!(lines[5], "Lights: BJ");
        assert!(lines.last().unwrap().starts_with("Runtime: "));
    }

    #[test]
    fn call_after_end_falls_back_to_start_column() {
        let mut row = test_row();
        row.call = "18:00".to_string();
        row.start = "08:00".to_string();
        row.end = "9:00".to_string();
        let event = normalize(&row, &test_profile(), long_ago()).unwrap();
        assert_eq!(event.start.time(), chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn correction_is_not_revalidated() {
        // Even the fallback start is after the end; the inverted pair is
        // used as-is and the event stays eligible.
        let mut row = test_row();
        row.call = "18:00".to_string();
        row.start = "17:00".to_string();
        row.end = "9:00".to_string();
        let event = normalize(&row, &test_profile(), long_ago()).unwrap();
        assert_eq!(event.start.time(), chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(event.end.time(), chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn unparseable_date_is_skipped() {
        let mut row = test_row();
        row.date = "sometime in June".to_string();
        assert_eq!(normalize(&row, &test_profile(), long_ago()), None);
    }

    #[test]
    fn blank_date_is_skipped() {
        let mut row = test_row();
        row.date.clear();
        assert_eq!(normalize(&row, &test_profile(), long_ago()), None);
    }

    #[test]
    fn malformed_time_cell_is_skipped() {
        let mut row = test_row();
        row.call = "800".to_string();
        assert_eq!(normalize(&row, &test_profile(), long_ago()), None);
    }

    #[test]
    fn digitless_end_cell_is_never_inserted() {
        let mut row = test_row();
        row.end = "TBD".to_string();
        assert_eq!(normalize(&row, &test_profile(), long_ago()), None);
    }

    #[test]
    fn elapsed_event_is_never_inserted() {
        let after = NaiveDate::from_ymd_opt(2020, 6, 5).unwrap().and_hms_opt(11, 0, 0).unwrap();
        assert_eq!(normalize(&test_row(), &test_profile(), after), None);
    }

    #[test]
    fn record_flag_normalizes_to_yes_or_no() {
        let mut row = test_row();
        row.record = "maybe?".to_string();
        let event = normalize(&row, &test_profile(), long_ago()).unwrap();
        assert!(event.description.contains("Record: No"));
    }
}
