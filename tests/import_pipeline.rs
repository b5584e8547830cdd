//! End-to-end wizard flow over real temp files, driven at the service layer.
//! The storage append itself needs a live Postgres and is exercised in
//! staging; everything up to the insertable batch runs here.

use std::collections::{HashMap, HashSet};

use rust_decimal_macros::dec;
use sellout_hub::models::import::{ColumnMapping, WizardSession, WizardState};
use sellout_hub::services::channel_homologation_service::{distinct_channels, HomologationTable};
use sellout_hub::services::commit_service::transform_dataset;
use sellout_hub::services::file_parser_service::SpreadsheetReader;
use sellout_hub::services::import_wizard_service::{self, WizardStore};
use sellout_hub::services::schema_mapper_service::RecordBuilder;
use sellout_hub::services::sku_reconciler_service::{distinct_skus, find_invalid, CorrectionTable};
use sellout_hub::utils::FileStorage;
use uuid::Uuid;

fn temp_storage() -> FileStorage {
    let dir = std::env::temp_dir().join(format!("sellout-e2e-{}", Uuid::new_v4()));
    FileStorage::new(dir).unwrap()
}

fn catalog(skus: &[&str]) -> HashSet<String> {
    skus.iter().map(|s| s.to_string()).collect()
}

fn start_session(storage: &FileStorage, store: &WizardStore, user: &str, csv: &str) -> WizardSession {
    let mut session = WizardSession::new(user, String::new(), "ventas.csv".to_string());
    let (path, _) = storage.save_file(session.id, "ventas.csv", csv.as_bytes()).unwrap();
    session.file_path = path;

    let full = storage.full_path(&session.file_path);
    let headers = SpreadsheetReader::read_headers(&full, None).unwrap();
    import_wizard_service::set_headers(&mut session, headers);

    store.begin(session.clone(), storage);
    session
}

#[test]
fn three_row_csv_without_channel_commits_three_null_channel_rows() {
    let storage = temp_storage();
    let store = WizardStore::new(60);

    let csv = "Codigo,Fecha,Venta Costo,Cliente\n\
               A1,2025-01-02,\"1.234,56\",501\n\
               A2,2025-01-03,\"1,234.56\",502\n\
               A3,2025-01-04,99,503\n";
    let mut session = start_session(&storage, &store, "alice", csv);

    // mapping step: required four mapped, channel left unmapped
    let mapping = ColumnMapping {
        sku: Some("Codigo".to_string()),
        sale_date: Some("Fecha".to_string()),
        cost_total: Some("Venta Costo".to_string()),
        client_code: Some("Cliente".to_string()),
        ..Default::default()
    };
    let full = storage.full_path(&session.file_path);
    RecordBuilder::new(&session.headers, &mapping).unwrap();
    import_wizard_service::set_mapping(&mut session, mapping);

    // channel unmapped: homologation is skipped, straight to reconciliation
    let sku_column = SpreadsheetReader::read_column(&full, None, "Codigo").unwrap();
    let invalid = find_invalid(&distinct_skus(&sku_column), &catalog(&["A1", "A2", "A3"]));
    assert!(invalid.is_empty());
    import_wizard_service::skus_checked(&mut session);
    assert_eq!(session.state, WizardState::SkusChecked);

    // commit-stage transform over the full dataset
    let dataset = SpreadsheetReader::read_all(&full, None).unwrap();
    let builder = RecordBuilder::new(&dataset.headers, session.mapping.as_ref().unwrap()).unwrap();
    let (records, report) = transform_dataset(
        &dataset,
        &builder,
        &import_wizard_service::homologation_table(&session),
        &import_wizard_service::correction_table(&session),
        &session.user,
    );

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.channel.is_none()));
    assert!(records.iter().all(|r| r.imported_by == "alice"));
    // both separator conventions normalize to the same amount
    assert_eq!(records[0].cost_total, dec!(1234.56));
    assert_eq!(records[1].cost_total, dec!(1234.56));
    assert_eq!(records[2].cost_total, dec!(99));
    assert_eq!(report.coerced_amounts, 0);

    // success teardown: file released, session dropped
    storage.delete_file(&session.file_path).unwrap();
    store.remove("alice");
    assert!(!storage.full_path(&session.file_path).exists());
    assert!(store.get("alice").is_err());
}

#[test]
fn invalid_sku_corrected_before_commit() {
    let storage = temp_storage();
    let store = WizardStore::new(60);

    let csv = "Codigo,Fecha,Venta Costo,Cliente\n\
               X99,2025-02-01,10,1\n\
               A1,2025-02-01,20,2\n";
    let mut session = start_session(&storage, &store, "bob", csv);

    let mapping = ColumnMapping {
        sku: Some("Codigo".to_string()),
        sale_date: Some("Fecha".to_string()),
        cost_total: Some("Venta Costo".to_string()),
        client_code: Some("Cliente".to_string()),
        ..Default::default()
    };
    import_wizard_service::set_mapping(&mut session, mapping);

    let full = storage.full_path(&session.file_path);
    let sku_column = SpreadsheetReader::read_column(&full, None, "Codigo").unwrap();
    let invalid = find_invalid(&distinct_skus(&sku_column), &catalog(&["A1", "X100"]));
    assert_eq!(invalid, vec!["X99"]);
    import_wizard_service::skus_checked(&mut session);

    let mut corrections = HashMap::new();
    corrections.insert("X99".to_string(), "X100".to_string());
    import_wizard_service::set_corrections(&mut session, corrections);
    assert_eq!(session.state, WizardState::CorrectionsCollected);

    let dataset = SpreadsheetReader::read_all(&full, None).unwrap();
    let builder = RecordBuilder::new(&dataset.headers, session.mapping.as_ref().unwrap()).unwrap();
    let (records, _) = transform_dataset(
        &dataset,
        &builder,
        &import_wizard_service::homologation_table(&session),
        &import_wizard_service::correction_table(&session),
        &session.user,
    );

    let skus: Vec<&str> = records.iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(skus, vec!["X100", "A1"]);
}

#[test]
fn homologated_and_unassigned_channels_flow_through() {
    let storage = temp_storage();
    let store = WizardStore::new(60);

    let csv = "Codigo,Fecha,Venta Costo,Cliente,Canal\n\
               A1,2025-03-01,10,1,MODERNO\n\
               A2,2025-03-01,20,2,feria\n\
               A3,2025-03-02,30,3,\n";
    let mut session = start_session(&storage, &store, "carol", csv);

    let mapping = ColumnMapping {
        sku: Some("Codigo".to_string()),
        sale_date: Some("Fecha".to_string()),
        cost_total: Some("Venta Costo".to_string()),
        client_code: Some("Cliente".to_string()),
        channel: Some("Canal".to_string()),
        ..Default::default()
    };
    import_wizard_service::set_mapping(&mut session, mapping);

    // channel preview reads only the mapped column
    let full = storage.full_path(&session.file_path);
    let column = SpreadsheetReader::read_column(&full, None, "Canal").unwrap();
    assert_eq!(distinct_channels(&column), vec!["MODERNO", "feria"]);
    import_wizard_service::channels_extracted(&mut session);

    // the user homologates one value and leaves "feria" unassigned
    let canonical = vec!["Retail".to_string(), "Ecommerce".to_string()];
    let mut assignments = HashMap::new();
    assignments.insert("MODERNO".to_string(), Some("Retail".to_string()));
    assignments.insert("feria".to_string(), None);
    HomologationTable::from_assignments(assignments.clone(), &canonical).unwrap();
    import_wizard_service::set_channel_table(&mut session, assignments);
    assert_eq!(session.state, WizardState::Homologated);

    let dataset = SpreadsheetReader::read_all(&full, None).unwrap();
    let builder = RecordBuilder::new(&dataset.headers, session.mapping.as_ref().unwrap()).unwrap();
    let (records, _) = transform_dataset(
        &dataset,
        &builder,
        &import_wizard_service::homologation_table(&session),
        &CorrectionTable::default(),
        &session.user,
    );

    assert_eq!(records[0].channel.as_deref(), Some("Retail"));
    // unassigned raw value commits with a NULL channel, not a failure
    assert_eq!(records[1].channel, None);
    // empty channel cell is simply absent
    assert_eq!(records[2].channel, None);
}

#[test]
fn required_mapping_gap_blocks_before_any_work() {
    let storage = temp_storage();
    let store = WizardStore::new(60);

    let csv = "Codigo,Fecha,Venta Costo\nA1,2025-01-01,10\n";
    let session = start_session(&storage, &store, "dave", csv);

    let mapping = ColumnMapping {
        sku: Some("Codigo".to_string()),
        sale_date: Some("Fecha".to_string()),
        cost_total: Some("Venta Costo".to_string()),
        ..Default::default()
    };

    let err = RecordBuilder::new(&session.headers, &mapping).unwrap_err();
    assert!(err.to_string().contains("Client Code"));
}

#[test]
fn lenient_cells_never_fail_the_import() {
    let storage = temp_storage();
    let store = WizardStore::new(60);

    let csv = "Codigo,Fecha,Venta Costo,Cliente\n\
               A1,not-a-date,garbage,n/a\n";
    let mut session = start_session(&storage, &store, "erin", csv);

    let mapping = ColumnMapping {
        sku: Some("Codigo".to_string()),
        sale_date: Some("Fecha".to_string()),
        cost_total: Some("Venta Costo".to_string()),
        client_code: Some("Cliente".to_string()),
        ..Default::default()
    };
    import_wizard_service::set_mapping(&mut session, mapping);

    let full = storage.full_path(&session.file_path);
    let dataset = SpreadsheetReader::read_all(&full, None).unwrap();
    let builder = RecordBuilder::new(&dataset.headers, session.mapping.as_ref().unwrap()).unwrap();
    let (records, report) = transform_dataset(
        &dataset,
        &builder,
        &import_wizard_service::homologation_table(&session),
        &import_wizard_service::correction_table(&session),
        &session.user,
    );

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sale_date, None);
    assert_eq!(records[0].cost_total, dec!(0));
    assert_eq!(records[0].client_code, 0);
    assert_eq!(report.coerced_dates, 1);
    assert_eq!(report.coerced_amounts, 1);
    assert_eq!(report.coerced_client_codes, 1);
}
