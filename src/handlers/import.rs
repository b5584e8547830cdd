/// REST handlers for the import wizard
///
/// Each handler is one wizard transition. Session state lives in the
/// process-local `WizardStore` keyed by the acting user; every step loads
/// the session, advances it, and writes it back.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use validator::Validate;

use crate::{
    config::AppConfig,
    middleware::{
        error_handling::{AppError, Result},
        record_commit, UserIdentity,
    },
    models::import::{
        ChannelAssignmentsRequest, ColumnMapping, CommitResponse, CorrectionsRequest,
        FieldDescriptor, InternalField, MappingResponse, SessionResponse, SheetRequest,
        UploadResponse, WizardSession,
    },
    repositories::CatalogRepository,
    services::{
        channel_homologation_service::{distinct_channels, HomologationTable},
        import_wizard_service,
        sku_reconciler_service::{distinct_skus, find_invalid},
        CommitService, SpreadsheetReader, WizardStore,
    },
    utils::FileStorage,
};

use crate::MAX_UPLOAD_BYTES;

/// GET /api/import/fields
/// The internal schema the mapping step maps onto.
pub async fn get_fields() -> Json<Vec<FieldDescriptor>> {
    Json(InternalField::ALL.into_iter().map(FieldDescriptor::from).collect())
}

/// POST /api/import/upload
/// Save the uploaded report and extract headers (or the sheet list when the
/// workbook has several sheets).
pub async fn upload(
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
    Extension(storage): Extension<Arc<FileStorage>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    tracing::info!("Import upload requested by user: {}", identity.username);

    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart data: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    let filename =
        filename.ok_or_else(|| AppError::InvalidInput("No filename provided".to_string()))?;

    if file_data.is_empty() {
        return Err(AppError::InvalidInput("Uploaded file is empty".to_string()));
    }
    if file_data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::InvalidInput(format!(
            "File too large. Maximum size is {}MB",
            MAX_UPLOAD_BYTES / 1024 / 1024
        )));
    }

    let mut session = WizardSession::new(&identity.username, String::new(), filename.clone());
    let (file_path, file_hash) = storage.save_file(session.id, &filename, &file_data)?;
    session.file_path = file_path;

    tracing::info!(
        "Stored upload for session {} ({} bytes, sha256 {})",
        session.id,
        file_data.len(),
        file_hash
    );

    let path = storage.full_path(&session.file_path);
    let sheets = SpreadsheetReader::sheet_names(&path)?;

    let response = if sheets.len() > 1 {
        // sheet must be chosen before headers can be read
        UploadResponse {
            session_id: session.id,
            state: session.state,
            sheets: Some(sheets),
            headers: None,
        }
    } else {
        let sheet = sheets.into_iter().next();
        let headers = SpreadsheetReader::read_headers(&path, sheet.as_deref())?;
        session.sheet = sheet;
        import_wizard_service::set_headers(&mut session, headers.clone());

        UploadResponse {
            session_id: session.id,
            state: session.state,
            sheets: None,
            headers: Some(headers),
        }
    };

    store.begin(session, &storage);

    Ok(Json(response))
}

/// POST /api/import/sheet
/// Choose a sheet of a multi-sheet workbook; returns its headers.
pub async fn select_sheet(
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
    Extension(storage): Extension<Arc<FileStorage>>,
    Json(request): Json<SheetRequest>,
) -> Result<Json<UploadResponse>> {
    request.validate()?;

    let mut session = store.get(&identity.username)?;
    let path = storage.full_path(&session.file_path);

    let sheets = SpreadsheetReader::sheet_names(&path)?;
    if !sheets.iter().any(|s| s == &request.sheet) {
        return Err(AppError::BadRequest(format!(
            "Sheet '{}' not found in workbook",
            request.sheet
        )));
    }

    let headers = SpreadsheetReader::read_headers(&path, Some(&request.sheet))?;
    import_wizard_service::select_sheet(&mut session, request.sheet, headers.clone());

    let response = UploadResponse {
        session_id: session.id,
        state: session.state,
        sheets: None,
        headers: Some(headers),
    };
    store.update(session);

    Ok(Json(response))
}

/// POST /api/import/mapping
/// Submit the column mapping. Required fields are validated here, before
/// any further work. When a channel column is mapped the response carries
/// the distinct raw channel values for homologation; otherwise the wizard
/// skips straight to SKU reconciliation.
pub async fn submit_mapping(
    State(config): State<AppConfig>,
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
    Extension(storage): Extension<Arc<FileStorage>>,
    Json(mapping): Json<ColumnMapping>,
) -> Result<Json<MappingResponse>> {
    mapping.validate()?;

    let mut session = store.get(&identity.username)?;
    if session.headers.is_empty() {
        return Err(AppError::BadRequest(
            "No headers extracted yet; choose a sheet first".to_string(),
        ));
    }

    // fails on missing required fields or headers absent from the file
    crate::services::RecordBuilder::new(&session.headers, &mapping)?;

    let channel_header = mapping.header_for(InternalField::Channel).map(str::to_string);
    import_wizard_service::set_mapping(&mut session, mapping);

    let response = match channel_header {
        Some(header) => {
            let path = storage.full_path(&session.file_path);
            let column = SpreadsheetReader::read_column(&path, session.sheet.as_deref(), &header)?;
            let channels = distinct_channels(&column);

            tracing::info!(
                "Session {}: {} distinct raw channels awaiting homologation",
                session.id,
                channels.len()
            );

            import_wizard_service::channels_extracted(&mut session);
            MappingResponse {
                state: session.state,
                channels: Some(channels),
                invalid_skus: None,
                ready_to_commit: false,
            }
        }
        None => {
            // channel not mapped: homologation is skipped entirely
            let invalid = run_sku_check(&config, &storage, &mut session).await?;
            MappingResponse {
                state: session.state,
                ready_to_commit: invalid.is_empty(),
                channels: None,
                invalid_skus: Some(invalid),
            }
        }
    };

    store.update(session);

    Ok(Json(response))
}

/// POST /api/import/channels
/// Submit the channel homologation table, then run SKU reconciliation.
pub async fn submit_channels(
    State(config): State<AppConfig>,
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
    Extension(storage): Extension<Arc<FileStorage>>,
    Json(request): Json<ChannelAssignmentsRequest>,
) -> Result<Json<MappingResponse>> {
    let mut session = store.get(&identity.username)?;

    let mapping = session
        .mapping
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Column mapping not submitted yet".to_string()))?;
    if mapping.header_for(InternalField::Channel).is_none() {
        return Err(AppError::BadRequest(
            "No channel column was mapped; homologation does not apply".to_string(),
        ));
    }

    // canonical names must come from the configured vocabulary
    HomologationTable::from_assignments(request.assignments.clone(), &config.sales_channels)?;
    import_wizard_service::set_channel_table(&mut session, request.assignments);

    let invalid = run_sku_check(&config, &storage, &mut session).await?;
    let response = MappingResponse {
        state: session.state,
        ready_to_commit: invalid.is_empty(),
        channels: None,
        invalid_skus: Some(invalid),
    };
    store.update(session);

    Ok(Json(response))
}

/// POST /api/import/corrections
/// Submit SKU corrections for the invalid SKUs. Leaving an invalid SKU out
/// accepts it as-is.
pub async fn submit_corrections(
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
    Json(request): Json<CorrectionsRequest>,
) -> Result<Json<MappingResponse>> {
    let mut session = store.get(&identity.username)?;

    if session.mapping.is_none() {
        return Err(AppError::BadRequest("Column mapping not submitted yet".to_string()));
    }

    import_wizard_service::set_corrections(&mut session, request.corrections);

    let response = MappingResponse {
        state: session.state,
        channels: None,
        invalid_skus: None,
        ready_to_commit: true,
    };
    store.update(session);

    Ok(Json(response))
}

/// POST /api/import/commit
/// Run the commit stage. Reports `{status: "success", count}` or
/// `{status: "error", message}` — consumers parse this shape, so commit
/// failures do not use the generic error body.
pub async fn commit(
    State(config): State<AppConfig>,
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
    Extension(storage): Extension<Arc<FileStorage>>,
) -> Result<Response> {
    let session = store.get(&identity.username)?;
    let commit_service = CommitService::new(config.database_pool.clone());

    match commit_service.commit(&session, &storage).await {
        Ok(report) => {
            store.remove(&identity.username);
            record_commit("success", report.rows_committed);
            Ok(Json(CommitResponse::success(report.rows_committed)).into_response())
        }
        Err(e) => {
            // session and file stay put: the user can retry or cancel
            tracing::error!("Commit failed for session {}: {}", session.id, e);
            record_commit("error", 0);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CommitResponse::error(e.to_string())),
            )
                .into_response())
        }
    }
}

/// GET /api/import/session
pub async fn get_session(
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
) -> Result<Json<SessionResponse>> {
    let session = store.get(&identity.username)?;
    Ok(Json(SessionResponse::from(&session)))
}

/// DELETE /api/import/session
/// Explicit cancel: drop the in-flight import and release its file.
pub async fn cancel_session(
    Extension(identity): Extension<UserIdentity>,
    Extension(store): Extension<Arc<WizardStore>>,
    Extension(storage): Extension<Arc<FileStorage>>,
) -> Result<Json<SessionResponse>> {
    let session = store.cancel(&identity.username, &storage)?;
    Ok(Json(SessionResponse::from(&session)))
}

/// Diff the file's distinct SKUs against the reference catalog and advance
/// the session. Shared by the mapping and homologation steps, whichever one
/// reaches reconciliation first.
async fn run_sku_check(
    config: &AppConfig,
    storage: &FileStorage,
    session: &mut WizardSession,
) -> Result<Vec<String>> {
    let sku_header = session
        .mapping
        .as_ref()
        .and_then(|m| m.header_for(InternalField::Sku))
        .ok_or_else(|| AppError::BadRequest("No SKU column mapped".to_string()))?
        .to_string();

    let path = storage.full_path(&session.file_path);
    let column = SpreadsheetReader::read_column(&path, session.sheet.as_deref(), &sku_header)?;
    let file_skus = distinct_skus(&column);

    let catalog = CatalogRepository::new(config.database_pool.clone())
        .distinct_skus()
        .await?;
    let invalid = find_invalid(&file_skus, &catalog);

    tracing::info!(
        "Session {}: {} distinct SKUs in file, {} not in catalog",
        session.id,
        file_skus.len(),
        invalid.len()
    );

    import_wizard_service::skus_checked(session);

    Ok(invalid)
}
