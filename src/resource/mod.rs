pub mod factory;
pub mod ownership;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::CurrentUser;

/// Resource-type descriptor consumed by the generic handler operations.
///
/// Cross-cutting concerns stay out: authentication, role checks, and
/// ownership run before any operation; the descriptor only fixes storage
/// naming, payload types, and the explicit pipeline stages around the
/// storage call.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Storage table backing the resource
    const TABLE: &'static str;
    /// JSON key for a single entity ("product") and for lists ("products")
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
    /// Column linking to the ancestor in nested routes (reviews -> product)
    const PARENT_COLUMN: Option<&'static str> = None;

    type Create: DeserializeOwned + Validate + Send;
    type Update: DeserializeOwned + Validate + Send;

    /// Columns stripped from every response
    fn hidden_fields() -> &'static [&'static str] {
        &[]
    }

    /// Unconditional list-path predicate (e.g. unlisted products never list)
    fn scope(_filter: &mut Filter) {}

    /// Pre-persist stage for creation: derive fields, attach the acting
    /// identity as owner, attach the ancestor id
    fn prepare_create(
        input: Self::Create,
        actor: &CurrentUser,
        parent_id: Option<Uuid>,
    ) -> Result<Map<String, Value>, ApiError>;

    /// Pre-persist stage for partial updates
    fn prepare_update(input: Self::Update) -> Result<Map<String, Value>, ApiError>;

    /// Post-persist stage after create/update (aggregate recomputation)
    async fn after_change(_pool: &PgPool, _record: &Value) -> Result<(), ApiError> {
        Ok(())
    }

    /// Post-persist stage after delete
    async fn after_delete(_pool: &PgPool, _record: &Value) -> Result<(), ApiError> {
        Ok(())
    }

    /// Related-resource expansion applied by the single-read operation
    async fn expand(_pool: &PgPool, _record: &mut Value) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Serialize a payload struct into a column map, dropping absent fields so
/// they fall back to database defaults (create) or stay untouched (update).
pub fn field_map(payload: impl Serialize) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        Ok(_) => Err(ApiError::internal("payload did not serialize to an object")),
        Err(e) => Err(ApiError::internal(format!("payload serialization failed: {}", e))),
    }
}
