//! Picks which sheet rows belong to a profile.

use crate::source::SourceRow;
use std::collections::BTreeSet;

/// Token that matches every row regardless of assignment.
pub const MATCH_EVERYTHING: &str = "ANY";

/// Whole-cell wildcard meaning the row applies to everyone.
const EVERYONE: &str = "ALL";

/// Return the indices of the rows assigned to `token`, ascending and
/// deduplicated. Row 0 is the first data row; the header never reaches
/// this function.
///
/// A row matches when its assignment cell contains `token` as a
/// substring, or when one of its wildcard cells is exactly `ALL`
/// (case-insensitive). `ANY` as the token selects everything.
pub fn select_rows(rows: &[SourceRow], token: &str) -> Vec<usize> {
    if token == MATCH_EVERYTHING {
        return (0..rows.len()).collect();
    }

    let mut picked = BTreeSet::new();
    for (index, row) in rows.iter().enumerate() {
        if row.assignment.contains(token) {
            picked.insert(index);
        }
        if row.wildcard_cells().iter().any(|cell| cell.trim().eq_ignore_ascii_case(EVERYONE)) {
            picked.insert(index);
        }
    }
    picked.into_iter().collect()
}
