/// Data-management handlers for the committed sales table

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::{
    config::AppConfig,
    middleware::{error_handling::Result, UserIdentity},
    models::sales::{DeleteSalesQuery, DeleteSalesResponse},
    repositories::SalesRepository,
};

/// DELETE /api/sales?from=&to=[&client_code=]
/// Remove committed rows in a date range, optionally for one client. Used
/// to back out a bad import before re-running it.
pub async fn delete_sales(
    State(config): State<AppConfig>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<DeleteSalesQuery>,
) -> Result<Json<DeleteSalesResponse>> {
    let repo = SalesRepository::new(config.database_pool.clone());
    let deleted = repo.delete_range(query.from, query.to, query.client_code).await?;

    tracing::info!(
        "User {} deleted {} sales rows ({} to {}, client: {:?})",
        identity.username,
        deleted,
        query.from,
        query.to,
        query.client_code
    );

    Ok(Json(DeleteSalesResponse { deleted }))
}
