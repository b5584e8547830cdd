use sqlx::{PgPool, QueryBuilder};

use crate::middleware::error_handling::Result;
use crate::models::sales::NewSalesRecord;

/// Postgres keeps bind parameters under u16::MAX; 10 columns per row makes
/// 1000 rows a comfortable chunk.
const INSERT_CHUNK_SIZE: usize = 1000;

pub struct SalesRepository {
    pool: PgPool,
}

impl SalesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a reconciled batch to the sales table. All chunks run inside
    /// one transaction: either the whole batch lands or none of it does.
    pub async fn append_batch(&self, records: &[NewSalesRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO sales (sku, client_code, sale_date, cost_total, gross_total, \
                 quantity, channel, salesperson, client_tax_id, imported_by) ",
            );

            builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.sku)
                    .push_bind(record.client_code)
                    .push_bind(record.sale_date)
                    .push_bind(record.cost_total)
                    .push_bind(record.gross_total)
                    .push_bind(record.quantity)
                    .push_bind(&record.channel)
                    .push_bind(&record.salesperson)
                    .push_bind(&record.client_tax_id)
                    .push_bind(&record.imported_by);
            });

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(records.len())
    }

    /// Delete committed rows in a date range, optionally narrowed to one
    /// client. Returns the number of rows removed.
    pub async fn delete_range(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
        client_code: Option<i64>,
    ) -> Result<u64> {
        let result = match client_code {
            Some(code) => {
                sqlx::query(
                    "DELETE FROM sales WHERE sale_date BETWEEN $1 AND $2 AND client_code = $3",
                )
                .bind(from)
                .bind(to)
                .bind(code)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query("DELETE FROM sales WHERE sale_date BETWEEN $1 AND $2")
                    .bind(from)
                    .bind(to)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }
}
