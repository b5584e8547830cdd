/// Models for the distributor sell-out import wizard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Internal schema
// ============================================================================

/// The fixed internal sales schema every uploaded report is mapped onto.
/// Four fields are required; the rest are imported when the distributor
/// provides them and left NULL otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalField {
    Sku,
    CostTotal,
    SaleDate,
    ClientCode,
    Quantity,
    GrossTotal,
    Channel,
    Salesperson,
    ClientTaxId,
}

impl InternalField {
    pub const ALL: [InternalField; 9] = [
        InternalField::Sku,
        InternalField::CostTotal,
        InternalField::SaleDate,
        InternalField::ClientCode,
        InternalField::Quantity,
        InternalField::GrossTotal,
        InternalField::Channel,
        InternalField::Salesperson,
        InternalField::ClientTaxId,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            InternalField::Sku => "sku",
            InternalField::CostTotal => "cost_total",
            InternalField::SaleDate => "sale_date",
            InternalField::ClientCode => "client_code",
            InternalField::Quantity => "quantity",
            InternalField::GrossTotal => "gross_total",
            InternalField::Channel => "channel",
            InternalField::Salesperson => "salesperson",
            InternalField::ClientTaxId => "client_tax_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InternalField::Sku => "SKU",
            InternalField::CostTotal => "Total Sale at Cost",
            InternalField::SaleDate => "Sale Date",
            InternalField::ClientCode => "Client Code",
            InternalField::Quantity => "Quantity Sold",
            InternalField::GrossTotal => "Total Sale",
            InternalField::Channel => "Sales Channel",
            InternalField::Salesperson => "Distributor Salesperson",
            InternalField::ClientTaxId => "Client Tax ID",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            InternalField::Sku => "Internal product code for the sold item.",
            InternalField::CostTotal => "Sale total reported by the distributor at cost basis.",
            InternalField::SaleDate => "Date of the sale as reported by the distributor.",
            InternalField::ClientCode => "Internal ERP code of the client.",
            InternalField::Quantity => "Units sold as reported by the distributor.",
            InternalField::GrossTotal => "Sale total before cost discount.",
            InternalField::Channel => "Sales channel (Retail, Ecommerce, Traditional, ...).",
            InternalField::Salesperson => "Name of the distributor salesperson tied to the sale.",
            InternalField::ClientTaxId => "Tax id of the distributor's own client.",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            InternalField::Sku
                | InternalField::CostTotal
                | InternalField::SaleDate
                | InternalField::ClientCode
        )
    }
}

impl std::fmt::Display for InternalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// User-chosen correspondence from internal fields to uploaded headers.
/// `None` means the field was left unmapped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ColumnMapping {
    #[validate(length(min = 1, max = 255))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub cost_total: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub sale_date: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub client_code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub quantity: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub gross_total: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub channel: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub salesperson: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub client_tax_id: Option<String>,
}

impl ColumnMapping {
    pub fn header_for(&self, field: InternalField) -> Option<&str> {
        let header = match field {
            InternalField::Sku => &self.sku,
            InternalField::CostTotal => &self.cost_total,
            InternalField::SaleDate => &self.sale_date,
            InternalField::ClientCode => &self.client_code,
            InternalField::Quantity => &self.quantity,
            InternalField::GrossTotal => &self.gross_total,
            InternalField::Channel => &self.channel,
            InternalField::Salesperson => &self.salesperson,
            InternalField::ClientTaxId => &self.client_tax_id,
        };
        header.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    /// Required fields still lacking a header assignment.
    pub fn missing_required(&self) -> Vec<InternalField> {
        InternalField::ALL
            .into_iter()
            .filter(|f| f.is_required() && self.header_for(*f).is_none())
            .collect()
    }
}

// ============================================================================
// Wizard state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    Uploaded,
    HeadersExtracted,
    Mapped,
    ChannelsExtracted,
    Homologated,
    SkusChecked,
    CorrectionsCollected,
    Committed,
    Cancelled,
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WizardState::Uploaded => "uploaded",
            WizardState::HeadersExtracted => "headers_extracted",
            WizardState::Mapped => "mapped",
            WizardState::ChannelsExtracted => "channels_extracted",
            WizardState::Homologated => "homologated",
            WizardState::SkusChecked => "skus_checked",
            WizardState::CorrectionsCollected => "corrections_collected",
            WizardState::Committed => "committed",
            WizardState::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// In-flight import, one per acting user. Lives only in process memory; a
/// restart abandons the import (the stale temp file is reclaimed by the
/// store's expiry sweep when the same user uploads again).
#[derive(Debug, Clone)]
pub struct WizardSession {
    pub id: Uuid,
    pub user: String,
    pub file_path: String,
    pub original_filename: String,
    pub sheet: Option<String>,
    pub headers: Vec<String>,
    pub state: WizardState,
    pub mapping: Option<ColumnMapping>,
    /// Raw channel value -> canonical channel (None = left unassigned).
    pub channel_table: HashMap<String, Option<String>>,
    /// Invalid SKU -> user-supplied replacement.
    pub sku_corrections: HashMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub touched_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new(user: &str, file_path: String, original_filename: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            file_path,
            original_filename,
            sheet: None,
            headers: Vec::new(),
            state: WizardState::Uploaded,
            mapping: None,
            channel_table: HashMap::new(),
            sku_corrections: HashMap::new(),
            started_at: now,
            touched_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.touched_at = Utc::now();
    }
}

// ============================================================================
// API Request/Response Models
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FieldDescriptor {
    pub field: InternalField,
    pub label: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl From<InternalField> for FieldDescriptor {
    fn from(field: InternalField) -> Self {
        Self {
            field,
            label: field.label(),
            description: field.description(),
            required: field.is_required(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub state: WizardState,
    /// Present when the workbook has several sheets and one must be chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets: Option<Vec<String>>,
    /// Present once a concrete sheet (or CSV) could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SheetRequest {
    #[validate(length(min = 1, max = 255))]
    pub sheet: String,
}

#[derive(Debug, Serialize)]
pub struct MappingResponse {
    pub state: WizardState,
    /// Distinct raw channel values awaiting homologation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    /// SKUs from the file that are not in the reference catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_skus: Option<Vec<String>>,
    pub ready_to_commit: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChannelAssignmentsRequest {
    /// Raw channel value -> canonical channel name (null = leave unassigned).
    pub assignments: HashMap<String, Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CorrectionsRequest {
    /// Invalid SKU -> corrected SKU. Omitted SKUs pass through unchanged.
    pub corrections: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub state: WizardState,
    pub original_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub headers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<ColumnMapping>,
    pub started_at: DateTime<Utc>,
}

impl From<&WizardSession> for SessionResponse {
    fn from(session: &WizardSession) -> Self {
        Self {
            session_id: session.id,
            state: session.state,
            original_filename: session.original_filename.clone(),
            sheet: session.sheet.clone(),
            headers: session.headers.clone(),
            mapping: session.mapping.clone(),
            started_at: session.started_at,
        }
    }
}

/// The commit result reported to the caller. Mirrors the shape consumers of
/// the import endpoint already expect: `{status, count}` on success,
/// `{status, message}` on failure.
#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommitResponse {
    pub fn success(count: usize) -> Self {
        Self {
            status: "success",
            count: Some(count),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            status: "error",
            count: None,
            message: Some(message),
        }
    }
}
