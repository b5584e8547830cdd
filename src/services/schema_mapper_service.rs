/// Column mapping onto the internal sales schema
///
/// The mapping itself is user input collected by the wizard; this service
/// validates it against the uploaded file and compiles it into a
/// `RecordBuilder` — the header-to-index plan is resolved once per import
/// and reused for every row of the full dataset pass. Source columns that
/// were not mapped are simply never read.

use std::collections::HashMap;

use crate::middleware::error_handling::{AppError, Result};
use crate::models::import::{ColumnMapping, InternalField};

/// Compiled column-selection plan: internal field -> column index.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    indices: HashMap<InternalField, usize>,
}

impl RecordBuilder {
    /// Resolve a mapping against the file's actual header row.
    ///
    /// Fails when a required field has no header assigned, or when an
    /// assigned header does not exist in the file (a stale mapping after the
    /// distributor changed their layout).
    pub fn new(headers: &[String], mapping: &ColumnMapping) -> Result<Self> {
        let missing = mapping.missing_required();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.label()).collect();
            return Err(AppError::BadRequest(format!(
                "Missing required field mapping(s): {}",
                names.join(", ")
            )));
        }

        let mut indices = HashMap::new();
        let mut unknown = Vec::new();

        for field in InternalField::ALL {
            let Some(header) = mapping.header_for(field) else {
                continue;
            };
            match headers.iter().position(|h| h == header) {
                Some(idx) => {
                    indices.insert(field, idx);
                }
                None => unknown.push(header.to_string()),
            }
        }

        if !unknown.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Mapped column(s) not present in file: {}",
                unknown.join(", ")
            )));
        }

        Ok(Self { indices })
    }

    pub fn is_mapped(&self, field: InternalField) -> bool {
        self.indices.contains_key(&field)
    }

    /// Cell value for one field of one row. Empty cells and rows shorter
    /// than the header come back as `None`.
    pub fn value<'a>(&self, row: &'a [String], field: InternalField) -> Option<&'a str> {
        self.indices
            .get(&field)
            .and_then(|idx| row.get(*idx))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        ["Codigo SBD", "Venta Costo", "Fecha", "Cliente", "Canal"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn valid_mapping() -> ColumnMapping {
        ColumnMapping {
            sku: Some("Codigo SBD".to_string()),
            cost_total: Some("Venta Costo".to_string()),
            sale_date: Some("Fecha".to_string()),
            client_code: Some("Cliente".to_string()),
            channel: Some("Canal".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_missing_required_field() {
        let mut mapping = valid_mapping();
        mapping.client_code = None;

        let err = RecordBuilder::new(&headers(), &mapping).unwrap_err();
        assert!(err.to_string().contains("Client Code"));
    }

    #[test]
    fn test_accepts_required_without_optionals() {
        let mut mapping = valid_mapping();
        mapping.channel = None;

        let builder = RecordBuilder::new(&headers(), &mapping).unwrap();
        assert!(builder.is_mapped(InternalField::Sku));
        assert!(!builder.is_mapped(InternalField::Channel));
        assert!(!builder.is_mapped(InternalField::Quantity));
    }

    #[test]
    fn test_rejects_header_absent_from_file() {
        let mut mapping = valid_mapping();
        mapping.sku = Some("No Such Column".to_string());

        let err = RecordBuilder::new(&headers(), &mapping).unwrap_err();
        assert!(err.to_string().contains("No Such Column"));
    }

    #[test]
    fn test_value_selects_and_renames() {
        let builder = RecordBuilder::new(&headers(), &valid_mapping()).unwrap();
        let row: Vec<String> = ["A100", "1.234,56", "2025-01-02", "501", "Moderno"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(builder.value(&row, InternalField::Sku), Some("A100"));
        assert_eq!(builder.value(&row, InternalField::ClientCode), Some("501"));
        // unmapped optional field reads as absent
        assert_eq!(builder.value(&row, InternalField::Quantity), None);
    }

    #[test]
    fn test_short_row_reads_as_absent() {
        let builder = RecordBuilder::new(&headers(), &valid_mapping()).unwrap();
        let row: Vec<String> = ["A100", "10"].iter().map(|s| s.to_string()).collect();
        assert_eq!(builder.value(&row, InternalField::SaleDate), None);
    }
}
