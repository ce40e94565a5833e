//! MySQL implementation of [`ProductStore`] over a sqlx connection pool

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::ProductRow;
use crate::store::{FallbackPage, FallbackSuggestion, ProductStore, RankedRow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use std::time::Duration;
use tracing::debug;

const PRODUCT_COLUMNS: &str = r#"
    CAST(p.product_id AS SIGNED) AS product_id,
    COALESCE(p.external_id, '') AS external_id,
    COALESCE(p.sku, '') AS sku,
    COALESCE(p.name, '') AS name,
    COALESCE(p.description, '') AS description,
    CAST(COALESCE(p.brand_id, 0) AS SIGNED) AS brand_id,
    COALESCE(b.name, '') AS brand_name,
    CAST(COALESCE(p.series_id, 0) AS SIGNED) AS series_id,
    COALESCE(s.name, '') AS series_name,
    COALESCE(p.unit, '') AS unit,
    COALESCE(p.dimensions, '') AS dimensions,
    CAST(COALESCE(p.min_sale, 1) AS SIGNED) AS min_sale,
    CAST(COALESCE(p.weight, 0) AS DOUBLE) AS weight,
    p.created_at,
    p.updated_at
"#;

const PRODUCT_JOINS: &str = r#"
    FROM products p
    LEFT JOIN brands b ON b.brand_id = p.brand_id
    LEFT JOIN series s ON s.series_id = p.series_id
"#;

/// The CASE ladder mirroring the primary relevance model in reduced form
const FALLBACK_RELEVANCE: &str = r#"
    CASE
        WHEN p.external_id = ? THEN 1000
        WHEN p.sku = ? THEN 900
        WHEN p.external_id LIKE CONCAT(?, '%') THEN 100
        WHEN p.sku LIKE CONCAT(?, '%') THEN 90
        WHEN p.name = ? THEN 80
        WHEN p.name LIKE CONCAT(?, '%') THEN 50
        WHEN p.name LIKE CONCAT('%', ?, '%') THEN 30
        WHEN COALESCE(b.name, '') LIKE CONCAT('%', ?, '%') THEN 20
        WHEN p.description LIKE CONCAT('%', ?, '%') THEN 10
        ELSE 1
    END
"#;

const FALLBACK_MATCH: &str = r#"
    (
        p.external_id LIKE CONCAT('%', ?, '%')
        OR p.sku LIKE CONCAT('%', ?, '%')
        OR p.name LIKE CONCAT('%', ?, '%')
        OR COALESCE(b.name, '') LIKE CONCAT('%', ?, '%')
        OR p.description LIKE CONCAT('%', ?, '%')
    )
"#;

/// Relational store backed by a MySQL connection pool
#[derive(Clone)]
pub struct MySqlProductStore {
    pool: MySqlPool,
}

impl MySqlProductStore {
    /// Connect a pool using the database configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests with their own fixtures)
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_from(&self, row: &MySqlRow) -> sqlx::Result<ProductRow> {
        Ok(ProductRow {
            product_id: row.try_get("product_id")?,
            external_id: row.try_get("external_id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            brand_id: row.try_get("brand_id")?,
            brand_name: row.try_get("brand_name")?,
            series_id: row.try_get("series_id")?,
            series_name: row.try_get("series_name")?,
            unit: row.try_get("unit")?,
            dimensions: row.try_get("dimensions")?,
            min_sale: row.try_get("min_sale")?,
            weight: row.try_get("weight")?,
            created_at: row.try_get::<Option<NaiveDateTime>, _>("created_at")?,
            updated_at: row.try_get::<Option<NaiveDateTime>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl ProductStore for MySqlProductStore {
    async fn total_products(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE product_id > 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_page(&self, after_id: i64, limit: u32) -> Result<Vec<ProductRow>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_JOINS} \
             WHERE p.product_id > ? ORDER BY p.product_id ASC LIMIT ?"
        );

        let rows = sqlx::query(&sql)
            .bind(after_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut page = Vec::with_capacity(rows.len());
        for row in &rows {
            page.push(self.row_from(row)?);
        }

        debug!(after_id, rows = page.len(), "Fetched extraction page");
        Ok(page)
    }

    async fn fallback_search(&self, q: &str, page: u32, limit: u32) -> Result<FallbackPage> {
        let page = page.max(1);
        let offset = (page - 1) * limit;

        // An empty query lists the catalogue; the CASE ladder degenerates
        // to the constant floor score.
        if q.is_empty() {
            let sql = format!(
                "SELECT {PRODUCT_COLUMNS}, 1 AS relevance_score {PRODUCT_JOINS} \
                 WHERE p.product_id > 0 ORDER BY p.name ASC LIMIT ? OFFSET ?"
            );
            let rows = sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

            let mut ranked = Vec::with_capacity(rows.len());
            for row in &rows {
                ranked.push(RankedRow {
                    row: self.row_from(row)?,
                    relevance: 1,
                });
            }

            let total = self.total_products().await?;
            return Ok(FallbackPage {
                rows: ranked,
                total,
                page,
                limit,
            });
        }

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, CAST({FALLBACK_RELEVANCE} AS SIGNED) AS relevance_score \
             {PRODUCT_JOINS} \
             WHERE p.product_id > 0 AND {FALLBACK_MATCH} \
             ORDER BY relevance_score DESC, p.name ASC \
             LIMIT ? OFFSET ?"
        );

        let mut query = sqlx::query(&sql);
        // 9 binds for the CASE ladder, then 5 for the match filter
        for _ in 0..9 {
            query = query.bind(q);
        }
        for _ in 0..5 {
            query = query.bind(q);
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        let mut ranked = Vec::with_capacity(rows.len());
        for row in &rows {
            ranked.push(RankedRow {
                row: self.row_from(row)?,
                relevance: row.try_get("relevance_score")?,
            });
        }

        let count_sql = format!(
            "SELECT COUNT(*) {PRODUCT_JOINS} WHERE p.product_id > 0 AND {FALLBACK_MATCH}"
        );
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for _ in 0..5 {
            count_query = count_query.bind(q);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        debug!(q = q, page, rows = ranked.len(), total, "Fallback search");

        Ok(FallbackPage {
            rows: ranked,
            total: total.max(0) as u64,
            page,
            limit,
        })
    }

    async fn fallback_autocomplete(
        &self,
        q: &str,
        limit: u32,
    ) -> Result<Vec<FallbackSuggestion>> {
        if q.is_empty() {
            return Ok(Vec::new());
        }

        let sql = "SELECT \
                COALESCE(p.name, '') AS name, \
                COALESCE(p.external_id, '') AS external_id, \
                CAST(CASE \
                    WHEN p.name LIKE CONCAT(?, '%') THEN 100 \
                    WHEN p.external_id LIKE CONCAT(?, '%') THEN 90 \
                    WHEN p.name LIKE CONCAT('%', ?, '%') THEN 50 \
                    WHEN SOUNDEX(p.name) = SOUNDEX(?) THEN 20 \
                    ELSE 1 \
                END AS SIGNED) AS score \
             FROM products p \
             WHERE p.product_id > 0 AND ( \
                p.name LIKE CONCAT(?, '%') \
                OR p.external_id LIKE CONCAT(?, '%') \
                OR p.name LIKE CONCAT('%', ?, '%') \
                OR SOUNDEX(p.name) = SOUNDEX(?) \
             ) \
             ORDER BY score DESC, p.name ASC \
             LIMIT ?";

        let mut query = sqlx::query(sql);
        for _ in 0..8 {
            query = query.bind(q);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                Ok(FallbackSuggestion {
                    text: row.try_get("name")?,
                    external_id: row.try_get("external_id")?,
                    score: row.try_get("score")?,
                })
            })
            .collect::<sqlx::Result<Vec<_>>>()?)
    }
}
