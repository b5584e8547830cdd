use std::collections::HashSet;

use sqlx::{PgPool, Row};

use crate::middleware::error_handling::Result;

/// Read-only access to the product catalog this service reconciles SKUs
/// against. The catalog is owned and maintained elsewhere.
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn distinct_skus(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT DISTINCT sku FROM product_catalog")
            .fetch_all(&self.pool)
            .await?;

        let mut skus = HashSet::with_capacity(rows.len());
        for row in rows {
            skus.insert(row.try_get("sku")?);
        }

        Ok(skus)
    }
}
