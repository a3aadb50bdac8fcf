//! AlignedTable: fundamentals rows joined against their nearest market rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::point::Cell;

/// One aligned row: the primary date, the secondary date it matched (if any)
/// and the reconciled cells of both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    /// Date of the matched secondary row. `None` only when a tolerance policy
    /// rejected the nearest candidate.
    pub matched_date: Option<NaiveDate>,
    pub values: BTreeMap<String, Cell>,
}

impl AlignedRow {
    pub fn number(&self, field: &str) -> Option<f64> {
        self.values.get(field).and_then(Cell::number)
    }
}

/// Time-ordered result of the aligner.
///
/// Row count always equals the primary series' row count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignedTable {
    rows: Vec<AlignedRow>,
}

impl AlignedTable {
    pub fn new(rows: Vec<AlignedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Normalized numeric column for `field`, one entry per row.
    pub fn column(&self, field: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.number(field)).collect()
    }

    /// Number of rows where `field` has a usable numeric value.
    pub fn count_present(&self, field: &str) -> usize {
        self.rows.iter().filter(|r| r.number(field).is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, roic: &str) -> AlignedRow {
        let mut values = BTreeMap::new();
        values.insert("ROIC (%)".to_string(), Cell::from(roic));
        AlignedRow {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            matched_date: None,
            values,
        }
    }

    #[test]
    fn column_normalizes_each_row() {
        let table = AlignedTable::new(vec![
            row("2024-03-31", "12.5%"),
            row("2024-06-30", "n/a"),
            row("2024-09-30", "14"),
        ]);
        assert_eq!(table.column("ROIC (%)"), vec![Some(12.5), None, Some(14.0)]);
        assert_eq!(table.count_present("ROIC (%)"), 2);
        assert_eq!(
            table.last_date(),
            NaiveDate::from_ymd_opt(2024, 9, 30)
        );
    }
}
