/// Commit stage: the full-dataset pass
///
/// Everything before this point worked on previews (headers, one column,
/// distinct values). Commit re-reads the entire source dataset and applies
/// the session's accumulated decisions in order: column selection+rename,
/// channel homologation, SKU correction, numeric/date/code normalization,
/// and the acting-user stamp. The transformed batch is appended inside a
/// single transaction; any transform failure aborts before a row is written.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::middleware::error_handling::{AppError, Result};
use crate::models::import::{InternalField, WizardSession};
use crate::models::sales::NewSalesRecord;
use crate::repositories::SalesRepository;
use crate::services::channel_homologation_service::HomologationTable;
use crate::services::file_parser_service::{Dataset, SpreadsheetReader};
use crate::services::import_wizard_service;
use crate::services::normalizer_service::{normalize_amount, parse_client_code, parse_sale_date};
use crate::services::schema_mapper_service::RecordBuilder;
use crate::services::sku_reconciler_service::CorrectionTable;
use crate::utils::FileStorage;

pub struct CommitService {
    sales_repo: SalesRepository,
}

#[derive(Debug, Default, Clone)]
pub struct CommitReport {
    pub rows_committed: usize,
    pub coerced_amounts: usize,
    pub coerced_dates: usize,
    pub coerced_client_codes: usize,
}

impl CommitService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            sales_repo: SalesRepository::new(pool),
        }
    }

    /// Run the commit for a fully populated session. On success the source
    /// file is deleted; a deletion failure after the durable append is
    /// logged and swallowed (the import itself succeeded). The caller drops
    /// the wizard session.
    pub async fn commit(&self, session: &WizardSession, storage: &FileStorage) -> Result<CommitReport> {
        let mapping = session
            .mapping
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Column mapping not submitted yet".to_string()))?;

        let path = storage.full_path(&session.file_path);
        let dataset = SpreadsheetReader::read_all(&path, session.sheet.as_deref())?;

        let channels = import_wizard_service::homologation_table(session);
        let corrections = import_wizard_service::correction_table(session);

        let builder = RecordBuilder::new(&dataset.headers, mapping)?;
        let (records, report) =
            transform_dataset(&dataset, &builder, &channels, &corrections, &session.user);

        let count = self.sales_repo.append_batch(&records).await?;

        tracing::info!(
            "Committed {} sales rows for user {} ({} coerced amounts, {} coerced dates, {} coerced client codes)",
            count,
            session.user,
            report.coerced_amounts,
            report.coerced_dates,
            report.coerced_client_codes
        );

        // Teardown after the rows are durable. A failed delete leaves an
        // orphan the stale-file sweep reclaims later.
        if let Err(e) = storage.delete_file(&session.file_path) {
            tracing::warn!(
                "Import committed but source file {} could not be deleted: {}",
                session.file_path,
                e
            );
        }

        Ok(CommitReport {
            rows_committed: count,
            ..report
        })
    }
}

/// Pure transform from the raw dataset to the insertable batch. Separated
/// from the append so the pipeline is testable without a database.
pub fn transform_dataset(
    dataset: &Dataset,
    builder: &RecordBuilder,
    channels: &HomologationTable,
    corrections: &CorrectionTable,
    imported_by: &str,
) -> (Vec<NewSalesRecord>, CommitReport) {
    let mut report = CommitReport::default();
    let mut records = Vec::with_capacity(dataset.rows.len());

    for row in &dataset.rows {
        let raw_sku = builder.value(row, InternalField::Sku).unwrap_or("");
        let sku = corrections.apply(raw_sku).to_string();

        let client_code = track(
            parse_client_code(builder.value(row, InternalField::ClientCode).unwrap_or("")),
            &mut report.coerced_client_codes,
        );

        let sale_date = track(
            parse_sale_date(builder.value(row, InternalField::SaleDate).unwrap_or("")),
            &mut report.coerced_dates,
        );

        let cost_total = to_decimal(track(
            normalize_amount(builder.value(row, InternalField::CostTotal).unwrap_or("")),
            &mut report.coerced_amounts,
        ));

        let gross_total = builder.is_mapped(InternalField::GrossTotal).then(|| {
            to_decimal(track(
                normalize_amount(builder.value(row, InternalField::GrossTotal).unwrap_or("")),
                &mut report.coerced_amounts,
            ))
        });

        let quantity = builder.is_mapped(InternalField::Quantity).then(|| {
            to_decimal(track(
                normalize_amount(builder.value(row, InternalField::Quantity).unwrap_or("")),
                &mut report.coerced_amounts,
            ))
        });

        let channel = builder
            .value(row, InternalField::Channel)
            .and_then(|raw| channels.apply(raw));

        let salesperson = builder
            .value(row, InternalField::Salesperson)
            .map(str::to_string);
        let client_tax_id = builder
            .value(row, InternalField::ClientTaxId)
            .map(str::to_string);

        records.push(NewSalesRecord {
            sku,
            client_code,
            sale_date,
            cost_total,
            gross_total,
            quantity,
            channel,
            salesperson,
            client_tax_id,
            imported_by: imported_by.to_string(),
        });
    }

    (records, report)
}

fn track<T>(outcome: crate::services::normalizer_service::ParseOutcome<T>, counter: &mut usize) -> T {
    if outcome.was_coerced {
        *counter += 1;
    }
    outcome.value
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}
