use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

/// Seller aggregates reset to this baseline when no reviews remain
const DEFAULT_SELLER_RATING: f64 = 4.5;

/// Recompute review-derived aggregates for one product and its
/// seller-of-record. This is a read-modify-write with no cross-request
/// serialization: concurrent review mutations race and the last recompute
/// wins, which keeps the aggregates consistent with some recent state.
pub async fn recompute_review_aggregates(
    pool: &PgPool,
    product_id: Uuid,
) -> Result<(), ApiError> {
    let (count, avg, max) = sqlx::query_as::<_, (i64, Option<f64>, Option<f64>)>(
        "SELECT COUNT(*), AVG(rating), MAX(rating) FROM reviews WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await
    .map_err(ApiError::from)?;

    // Product carries the maximum rating and the review count
    sqlx::query("UPDATE products SET best_rating = $1, ratings_quantity = $2 WHERE id = $3")
        .bind(max)
        .bind(count as i32)
        .bind(product_id)
        .execute(pool)
        .await
        .map_err(ApiError::from)?;

    // Seller-of-record carries the average, rounded to one decimal
    let seller_id: Option<Uuid> =
        sqlx::query_scalar("SELECT (seller_ids->>0)::uuid FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(pool)
            .await
            .map_err(ApiError::from)?
            .flatten();

    if let Some(seller_id) = seller_id {
        let (rating, quantity) = match avg {
            Some(avg) if count > 0 => (round_one_decimal(avg), count as i32),
            _ => (DEFAULT_SELLER_RATING, 0),
        };
        sqlx::query("UPDATE users SET rating = $1, ratings_quantity = $2 WHERE id = $3")
            .bind(rating)
            .bind(quantity)
            .bind(seller_id)
            .execute(pool)
            .await
            .map_err(ApiError::from)?;
    }

    Ok(())
}

/// Product id carried on a fetched review record
pub fn product_id_of(review: &Value) -> Option<Uuid> {
    review
        .get("product_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
