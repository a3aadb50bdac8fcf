//! Schema reconciliation between the two origin tables.
//!
//! When a field name exists on both sides of an alignment, exactly one side's
//! cell survives. The winner is declared per field, with a default for fields
//! not listed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::Cell;

/// Side of an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The primary (fundamentals) table.
    Primary,
    /// The secondary (market) lookup table.
    Secondary,
}

/// Per-field conflict policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaReconciliation {
    #[serde(default = "default_winner")]
    pub default_winner: Side,
    #[serde(default)]
    pub overrides: BTreeMap<String, Side>,
}

fn default_winner() -> Side {
    Side::Primary
}

impl Default for SchemaReconciliation {
    fn default() -> Self {
        Self {
            default_winner: default_winner(),
            overrides: BTreeMap::new(),
        }
    }
}

impl SchemaReconciliation {
    /// Declare `side` as the winner for `field`.
    pub fn prefer(mut self, field: impl Into<String>, side: Side) -> Self {
        self.overrides.insert(field.into(), side);
        self
    }

    pub fn winner(&self, field: &str) -> Side {
        self.overrides
            .get(field)
            .copied()
            .unwrap_or(self.default_winner)
    }

    /// Merge one primary row with its matched secondary row.
    pub fn merge(
        &self,
        primary: &BTreeMap<String, Cell>,
        secondary: Option<&BTreeMap<String, Cell>>,
    ) -> BTreeMap<String, Cell> {
        let mut merged = primary.clone();
        let Some(secondary) = secondary else {
            return merged;
        };
        for (field, cell) in secondary {
            let keep_secondary =
                !merged.contains_key(field) || self.winner(field) == Side::Secondary;
            if keep_secondary {
                merged.insert(field.clone(), cell.clone());
            }
        }
        merged
    }

    /// Field names present on both sides.
    pub fn conflicts<'a>(
        primary_fields: impl IntoIterator<Item = &'a String>,
        secondary_fields: impl IntoIterator<Item = &'a String>,
    ) -> Vec<String> {
        let primary: BTreeSet<&String> = primary_fields.into_iter().collect();
        secondary_fields
            .into_iter()
            .filter(|f| primary.contains(f))
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }
}
