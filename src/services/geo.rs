use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::error::ApiError;

const KM_PER_MILE: f64 = 1.609344;

/// Great-circle distance in kilometers between the bound point ($1 = lat,
/// $2 = lng) and each product's stored location (haversine formula).
const DISTANCE_KM_SQL: &str = "2 * 6371.0 * asin(sqrt( \
    power(sin(radians(((location->>'lat')::float8 - $1) / 2)), 2) + \
    cos(radians($1)) * cos(radians((location->>'lat')::float8)) * \
    power(sin(radians(((location->>'lng')::float8 - $2) / 2)), 2)))";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn parse(unit: &str) -> Self {
        if unit == "mi" {
            DistanceUnit::Miles
        } else {
            DistanceUnit::Kilometers
        }
    }

    fn to_km(&self, distance: f64) -> f64 {
        match self {
            DistanceUnit::Miles => distance * KM_PER_MILE,
            DistanceUnit::Kilometers => distance,
        }
    }

    fn from_km_multiplier(&self) -> f64 {
        match self {
            DistanceUnit::Miles => 1.0 / KM_PER_MILE,
            DistanceUnit::Kilometers => 1.0,
        }
    }
}

/// Listed products within `distance` of the center point.
pub async fn products_within(
    pool: &PgPool,
    distance: f64,
    lat: f64,
    lng: f64,
    unit: DistanceUnit,
) -> Result<Vec<Value>, ApiError> {
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM ( \
         SELECT * FROM products \
         WHERE secret IS DISTINCT FROM TRUE \
           AND location IS NOT NULL \
           AND {} <= $3) t",
        DISTANCE_KM_SQL
    );

    let rows = sqlx::query(&sql)
        .bind(lat)
        .bind(lng)
        .bind(unit.to_km(distance))
        .fetch_all(pool)
        .await
        .map_err(ApiError::from)?;

    rows_to_json(rows)
}

/// Each listed product's distance from the point, nearest first.
pub async fn products_near(
    pool: &PgPool,
    lat: f64,
    lng: f64,
    unit: DistanceUnit,
) -> Result<Vec<Value>, ApiError> {
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM ( \
         SELECT id, name, {} * $3 AS distance FROM products \
         WHERE secret IS DISTINCT FROM TRUE \
           AND location IS NOT NULL \
         ORDER BY distance) t",
        DISTANCE_KM_SQL
    );

    let rows = sqlx::query(&sql)
        .bind(lat)
        .bind(lng)
        .bind(unit.from_km_multiplier())
        .fetch_all(pool)
        .await
        .map_err(ApiError::from)?;

    rows_to_json(rows)
}

/// Parse a `lat,lng` path segment
pub fn parse_latlng(latlng: &str) -> Result<(f64, f64), ApiError> {
    let mut parts = latlng.split(',');
    let lat = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
    let lng = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
    match (lat, lng, parts.next()) {
        (Some(lat), Some(lng), None) => Ok((lat, lng)),
        _ => Err(ApiError::bad_request(
            "Please specify the latitude and longitude of the center point",
        )),
    }
}

fn rows_to_json(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<Value>, ApiError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(row.try_get::<Value, _>("row").map_err(ApiError::from)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_latlng_pairs() {
        assert_eq!(parse_latlng("34.1,-118.1").unwrap(), (34.1, -118.1));
        assert!(parse_latlng("34.1").is_err());
        assert!(parse_latlng("34.1,abc").is_err());
        assert!(parse_latlng("1,2,3").is_err());
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(DistanceUnit::parse("mi"), DistanceUnit::Miles);
        assert_eq!(DistanceUnit::parse("km"), DistanceUnit::Kilometers);
        assert!((DistanceUnit::Miles.to_km(1.0) - 1.609344).abs() < 1e-9);
        assert!((DistanceUnit::Kilometers.from_km_multiplier() - 1.0).abs() < 1e-9);
    }
}
