/// Persisted sales models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One reconciled sell-out row, as appended to the `sales` table by the
/// commit stage. `sku`, `client_code` and `cost_total` are always present;
/// `sale_date` is NULL when the reported date could not be parsed.
#[derive(Debug, Clone, Serialize)]
pub struct NewSalesRecord {
    pub sku: String,
    pub client_code: i64,
    pub sale_date: Option<NaiveDate>,
    pub cost_total: Decimal,
    pub gross_total: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub channel: Option<String>,
    pub salesperson: Option<String>,
    pub client_tax_id: Option<String>,
    pub imported_by: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSalesQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub client_code: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteSalesResponse {
    pub deleted: u64,
}
