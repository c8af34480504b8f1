use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::error::ApiError;

/// Catalog statistics: well-rated, listed products grouped by quality.
pub async fn product_stats(pool: &PgPool) -> Result<Vec<Value>, ApiError> {
    let sql = "SELECT row_to_json(t) AS row FROM ( \
               SELECT quality, \
                      COUNT(*) AS number_of_products, \
                      array_agg(name) AS product_names, \
                      MIN(price) AS min_price, \
                      MAX(price) AS max_price, \
                      AVG(price) AS avg_price \
               FROM products \
               WHERE secret IS DISTINCT FROM TRUE AND best_rating >= 4 \
               GROUP BY quality) t";

    collect_rows(pool, sqlx::query(sql)).await
}

/// Business plan: one year's listed products grouped by gender, busiest
/// group first.
pub async fn monthly_plan(pool: &PgPool, year: i32) -> Result<Vec<Value>, ApiError> {
    let sql = "SELECT row_to_json(t) AS row FROM ( \
               SELECT gender, \
                      COUNT(*) AS number_of_products, \
                      array_agg(name) AS product_names, \
                      MIN(price) AS min_price, \
                      MAX(price) AS max_price, \
                      AVG(price) AS avg_price \
               FROM products \
               WHERE secret IS DISTINCT FROM TRUE \
                 AND created_at >= make_timestamptz($1, 1, 1, 0, 0, 0, 'UTC') \
                 AND created_at < make_timestamptz($1 + 1, 1, 1, 0, 0, 0, 'UTC') \
               GROUP BY gender \
               ORDER BY number_of_products DESC) t";

    collect_rows(pool, sqlx::query(sql).bind(year)).await
}

async fn collect_rows(
    pool: &PgPool,
    query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
) -> Result<Vec<Value>, ApiError> {
    let rows = query.fetch_all(pool).await.map_err(ApiError::from)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(row.try_get::<Value, _>("row").map_err(ApiError::from)?);
    }
    Ok(out)
}
