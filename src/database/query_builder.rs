use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::{self, postgres::PgArguments, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::filter::is_valid_identifier;
use crate::filter::types::SqlResult;

/// Dynamic SQL for JSON-shaped rows. Every statement funnels the row through
/// `row_to_json` so callers work with plain JSON objects regardless of the
/// table's column set.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Run a compiled filter query, one JSON object per row.
    pub async fn select_json(pool: &PgPool, sql: SqlResult) -> Result<Vec<Value>, DatabaseError> {
        let wrapped = format!("SELECT row_to_json(t) AS row FROM ({}) t", sql.query);
        let mut q = sqlx::query(&wrapped);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.try_get::<Value, _>("row")?);
        }
        Ok(out)
    }

    pub async fn select_json_by_id(
        pool: &PgPool,
        table: &str,
        id: Uuid,
    ) -> Result<Option<Value>, DatabaseError> {
        validate_table(table)?;
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" WHERE id = $1) t",
            table
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
        row.map(|r| r.try_get::<Value, _>("row"))
            .transpose()
            .map_err(Into::into)
    }

    pub async fn insert_json(
        pool: &PgPool,
        table: &str,
        fields: &Map<String, Value>,
    ) -> Result<Value, DatabaseError> {
        validate_table(table)?;
        let columns = validate_columns(fields)?;

        let column_sql = columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" AS t ({}) VALUES ({}) RETURNING row_to_json(t) AS row",
            table, column_sql, placeholders
        );

        let mut q = sqlx::query(&sql);
        for column in &columns {
            q = bind_param(q, &fields[*column]);
        }
        let row = q.fetch_one(pool).await?;
        Ok(row.try_get::<Value, _>("row")?)
    }

    pub async fn update_json_by_id(
        pool: &PgPool,
        table: &str,
        id: Uuid,
        fields: &Map<String, Value>,
    ) -> Result<Option<Value>, DatabaseError> {
        if fields.is_empty() {
            return Self::select_json_by_id(pool, table, id).await;
        }
        validate_table(table)?;
        let columns = validate_columns(fields)?;

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ${}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE \"{}\" AS t SET {} WHERE id = ${} RETURNING row_to_json(t) AS row",
            table,
            assignments,
            columns.len() + 1
        );

        let mut q = sqlx::query(&sql);
        for column in &columns {
            q = bind_param(q, &fields[*column]);
        }
        let row = q.bind(id).fetch_optional(pool).await?;
        row.map(|r| r.try_get::<Value, _>("row"))
            .transpose()
            .map_err(Into::into)
    }

    pub async fn delete_json_by_id(
        pool: &PgPool,
        table: &str,
        id: Uuid,
    ) -> Result<Option<Value>, DatabaseError> {
        validate_table(table)?;
        let sql = format!(
            "DELETE FROM \"{}\" AS t WHERE id = $1 RETURNING row_to_json(t) AS row",
            table
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
        row.map(|r| r.try_get::<Value, _>("row"))
            .transpose()
            .map_err(Into::into)
    }
}

fn validate_table(table: &str) -> Result<(), DatabaseError> {
    if !is_valid_identifier(table) {
        return Err(DatabaseError::QueryError(format!(
            "Invalid table name: {}",
            table
        )));
    }
    Ok(())
}

fn validate_columns(fields: &Map<String, Value>) -> Result<Vec<&String>, DatabaseError> {
    let mut columns = Vec::with_capacity(fields.len());
    for column in fields.keys() {
        if !is_valid_identifier(column) {
            return Err(DatabaseError::QueryError(format!(
                "Invalid column name: {}",
                column
            )));
        }
        columns.push(column);
    }
    Ok(columns)
}

/// Bind a JSON value with its closest Postgres type. Strings that parse as
/// UUIDs or timestamps are bound natively so uuid/timestamptz columns accept
/// them; arrays and objects go in as JSONB.
fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => {
            if let Ok(uuid) = Uuid::parse_str(s) {
                q.bind(uuid)
            } else if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                q.bind(ts.with_timezone(&Utc))
            } else if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                match date.and_hms_opt(0, 0, 0) {
                    Some(dt) => q.bind(dt.and_utc()),
                    None => q.bind(s),
                }
            } else {
                q.bind(s)
            }
        }
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
