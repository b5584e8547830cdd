/// SKU reconciliation against the reference catalog
///
/// The uploaded file's distinct SKUs are diffed against the product
/// catalog; anything the catalog does not know is surfaced for correction.
/// Corrections substitute over the whole SKU column at commit time. An
/// invalid SKU the user leaves uncorrected passes through unchanged — the
/// catalog check reports, it does not gate.

use std::collections::{BTreeSet, HashMap, HashSet};

/// Distinct non-empty SKU strings from the mapped SKU column.
pub fn distinct_skus(column: &[String]) -> BTreeSet<String> {
    column
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// File SKUs absent from the catalog, sorted for deterministic display.
pub fn find_invalid(file_skus: &BTreeSet<String>, catalog_skus: &HashSet<String>) -> Vec<String> {
    file_skus
        .iter()
        .filter(|sku| !catalog_skus.contains(*sku))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    corrections: HashMap<String, String>,
}

impl CorrectionTable {
    pub fn new(corrections: HashMap<String, String>) -> Self {
        // blank replacements mean "accept as-is"
        let corrections = corrections
            .into_iter()
            .filter(|(_, replacement)| !replacement.trim().is_empty())
            .map(|(sku, replacement)| (sku, replacement.trim().to_string()))
            .collect();
        Self { corrections }
    }

    /// Corrected SKU, or the original when no correction exists.
    pub fn apply<'a>(&'a self, sku: &'a str) -> &'a str {
        self.corrections.get(sku).map(String::as_str).unwrap_or(sku)
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(skus: &[&str]) -> HashSet<String> {
        skus.iter().map(|s| s.to_string()).collect()
    }

    fn file(skus: &[&str]) -> BTreeSet<String> {
        skus.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_difference_sorted() {
        let invalid = find_invalid(&file(&["C", "A", "B"]), &catalog(&["A", "B"]));
        assert_eq!(invalid, vec!["C"]);

        let invalid = find_invalid(&file(&["Z9", "X1", "A1"]), &catalog(&["A1"]));
        assert_eq!(invalid, vec!["X1", "Z9"]);
    }

    #[test]
    fn test_all_valid_yields_empty() {
        let invalid = find_invalid(&file(&["A", "B"]), &catalog(&["A", "B", "C"]));
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_corrections_substitute_with_identity_fallback() {
        let mut map = HashMap::new();
        map.insert("X99".to_string(), "X100".to_string());
        let table = CorrectionTable::new(map);

        assert_eq!(table.apply("X99"), "X100");
        // uncorrected SKUs soft-pass
        assert_eq!(table.apply("B7"), "B7");
    }

    #[test]
    fn test_blank_correction_means_accept() {
        let mut map = HashMap::new();
        map.insert("X99".to_string(), "  ".to_string());
        let table = CorrectionTable::new(map);
        assert_eq!(table.apply("X99"), "X99");
        assert!(table.is_empty());
    }

    #[test]
    fn test_distinct_skus_ignores_blanks() {
        let column: Vec<String> = ["A1", "", "A1", " B2 "].iter().map(|s| s.to_string()).collect();
        let skus = distinct_skus(&column);
        assert_eq!(skus.into_iter().collect::<Vec<_>>(), vec!["A1", "B2"]);
    }
}
