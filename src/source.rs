//! Schedule-sheet rows and the adapters that produce them.
//!
//! The sheet is consumed as exported CSV, either from a local file or
//! downloaded from a share URL. The adapters are read-only: rows are
//! owned by the sheet and the engine never writes back.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;

/// Fixed columns every profile's sheet carries. Header spelling follows
/// the production sheet, including the embedded space in the record
/// column.
const COL_DATE: &str = "DATE";
const COL_TITLE: &str = "EVENT";
const COL_CALL: &str = "CALL";
const COL_START: &str = "START";
const COL_END: &str = "END";
const COL_LOCATION: &str = "LOCATION";
const COL_DEPARTMENT: &str = "Department";
const COL_RECORD: &str = "Record/ Livestream";
const COL_COORDINATOR: &str = "Event Coordinator";

/// One data row of the schedule sheet. Everything is kept as the raw
/// cell text; interpretation happens in the normalizer.
#[derive(Debug, Clone, Default)]
pub struct SourceRow {
    pub date: String,
    pub title: String,
    pub call: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub department: String,
    pub record: String,
    pub coordinator: String,
    /// Crew assignment cell the row selector matches against.
    pub assignment: String,
    /// Remaining columns, folded verbatim into the event description.
    pub extras: Vec<(String, String)>,
}

impl SourceRow {
    /// Cells that can carry the whole-cell `ALL` wildcard meaning
    /// "everyone works this event".
    pub fn wildcard_cells(&self) -> [&str; 2] {
        [self.assignment.as_str(), self.department.as_str()]
    }
}

/// Read access to one profile's sheet. Implementations are assumed
/// already authenticated; credential handling lives outside this crate.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn rows(&self) -> Result<Vec<SourceRow>>;
}

/// Sheet exported to a CSV file on disk.
pub struct CsvFile {
    path: PathBuf,
    assignment_column: String,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>, assignment_column: impl Into<String>) -> Self {
        Self { path: path.into(), assignment_column: assignment_column.into() }
    }
}

#[async_trait]
impl SourceAdapter for CsvFile {
    async fn rows(&self) -> Result<Vec<SourceRow>> {
        let raw = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read sheet at {}", self.path.display()))?;
        parse_sheet(&raw, &self.assignment_column)
    }
}

/// Sheet fetched from a CSV export URL (e.g. a published Google Sheet).
pub struct CsvUrl {
    client: reqwest::Client,
    url: String,
    assignment_column: String,
}

impl CsvUrl {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        assignment_column: impl Into<String>,
    ) -> Self {
        Self { client, url: url.into(), assignment_column: assignment_column.into() }
    }
}

#[async_trait]
impl SourceAdapter for CsvUrl {
    async fn rows(&self) -> Result<Vec<SourceRow>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to download sheet from {}", self.url))?
            .error_for_status()
            .context("Sheet download rejected")?;
        let raw = response.bytes().await.context("Failed to read sheet body")?;
        parse_sheet(&raw, &self.assignment_column)
    }
}

/// Parse exported CSV into rows, binding columns by header name. The
/// header row itself is not a data row; row 0 is the first data row.
pub fn parse_sheet(raw: &[u8], assignment_column: &str) -> Result<Vec<SourceRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(raw);

    let headers: Vec<String> =
        reader.headers().context("Sheet has no header row")?.iter().map(str::to_string).collect();

    let index_of = |name: &str| headers.iter().position(|h| h.trim() == name);
    let assignment_idx = index_of(assignment_column)
        .ok_or_else(|| anyhow!("Sheet has no '{}' column", assignment_column))?;

    let fixed = [
        COL_DATE,
        COL_TITLE,
        COL_CALL,
        COL_START,
        COL_END,
        COL_LOCATION,
        COL_DEPARTMENT,
        COL_RECORD,
        COL_COORDINATOR,
    ];

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to parse sheet row")?;
        let cell = |name: &str| -> String {
            index_of(name).and_then(|i| record.get(i)).unwrap_or("").trim().to_string()
        };

        let mut row = SourceRow {
            date: cell(COL_DATE),
            title: cell(COL_TITLE),
            call: cell(COL_CALL),
            start: cell(COL_START),
            end: cell(COL_END),
            location: cell(COL_LOCATION),
            department: cell(COL_DEPARTMENT),
            record: cell(COL_RECORD),
            coordinator: cell(COL_COORDINATOR),
            assignment: record.get(assignment_idx).unwrap_or("").trim().to_string(),
            extras: Vec::new(),
        };

        for (i, header) in headers.iter().enumerate() {
            let header = header.trim();
            if i == assignment_idx || fixed.contains(&header) || header.is_empty() {
                continue;
            }
            let value = record.get(i).unwrap_or("").trim().to_string();
            row.extras.push((header.to_string(), value));
        }

        rows.push(row);
    }

    debug!("Parsed {} sheet rows", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHEET: &str = "\
DATE,EVENT,CALL,START,END,LOCATION,Department,SOUND,Record/ Livestream,Event Coordinator,Lights
Friday-Jun-05-20,Commencement,8:00,9:00,11:00AM,Chapel,Music,ADH,Yes,Jane,BJ
Saturday-Jun-06-20,Recital,,6:30PM,9:00PM,Hall,,ALL,No,,
";

    #[test]
    fn binds_columns_by_header_name() {
        let rows = parse_sheet(SHEET.as_bytes(), "SOUND").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Commencement");
        assert_eq!(rows[0].assignment, "ADH");
        assert_eq!(rows[0].record, "Yes");
        assert_eq!(rows[1].assignment, "ALL");
        assert_eq!(rows[1].call, "");
    }

    #[test]
    fn unknown_columns_land_in_extras() {
        let rows = parse_sheet(SHEET.as_bytes(), "SOUND").unwrap();
        assert_eq!(rows[0].extras, vec![("Lights".to_string(), "BJ".to_string())]);
    }

    #[test]
    fn missing_assignment_column_is_an_error() {
        let err = parse_sheet(SHEET.as_bytes(), "VIDEO").unwrap_err();
        assert!(err.to_string().contains("VIDEO"));
    }
}
