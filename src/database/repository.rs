use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::Filter;

/// Per-table storage handle used by the generic resource operations.
/// Rows travel as JSON objects; the capability set is find-by-id, find-many,
/// create, update-by-id, and delete-by-id.
pub struct Repository {
    table_name: String,
    pool: PgPool,
}

impl Repository {
    pub fn new(table_name: impl Into<String>, pool: PgPool) -> Self {
        Self {
            table_name: table_name.into(),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn select_any(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let sql = filter
            .to_sql()
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        QueryBuilder::select_json(&self.pool, sql).await
    }

    pub async fn select_by_id(&self, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        QueryBuilder::select_json_by_id(&self.pool, &self.table_name, id).await
    }

    pub async fn insert(&self, fields: &Map<String, Value>) -> Result<Value, DatabaseError> {
        QueryBuilder::insert_json(&self.pool, &self.table_name, fields).await
    }

    pub async fn update_by_id(
        &self,
        id: Uuid,
        fields: &Map<String, Value>,
    ) -> Result<Option<Value>, DatabaseError> {
        QueryBuilder::update_json_by_id(&self.pool, &self.table_name, id, fields).await
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        QueryBuilder::delete_json_by_id(&self.pool, &self.table_name, id).await
    }
}
