/// Sales-channel homologation
///
/// Distributors report channels as free text ("MODERNO", "Autoservicio",
/// "e-comm"); reporting needs the fixed canonical vocabulary from
/// `AppConfig::sales_channels`. The homologation table is a plain 1:1
/// substitution built from one form submission — no fuzzy matching. A raw
/// value left unassigned commits with a NULL channel rather than failing.

use std::collections::{BTreeSet, HashMap};

use crate::middleware::error_handling::{AppError, Result};

/// Distinct non-empty raw channel values, sorted for stable display.
pub fn distinct_channels(column: &[String]) -> Vec<String> {
    column
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct HomologationTable {
    table: HashMap<String, Option<String>>,
}

impl HomologationTable {
    /// Build the table from user assignments, checking every chosen
    /// canonical name against the configured vocabulary. `None` assignments
    /// are kept: they record an explicit "leave unassigned".
    pub fn from_assignments(
        assignments: HashMap<String, Option<String>>,
        canonical_channels: &[String],
    ) -> Result<Self> {
        for canonical in assignments.values().flatten() {
            if !canonical_channels.iter().any(|c| c == canonical) {
                return Err(AppError::BadRequest(format!(
                    "Unknown sales channel '{}'. Valid channels: {}",
                    canonical,
                    canonical_channels.join(", ")
                )));
            }
        }

        Ok(Self { table: assignments })
    }

    /// Rehydrate a table whose canonical names were already validated (the
    /// wizard session stores assignments post-validation).
    pub fn from_table(table: HashMap<String, Option<String>>) -> Self {
        Self { table }
    }

    /// Canonical channel for a raw value; unknown or unassigned raw values
    /// map to `None`.
    pub fn apply(&self, raw: &str) -> Option<String> {
        self.table.get(raw.trim()).cloned().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
