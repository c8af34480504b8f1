use serde_json::Value;
use uuid::Uuid;

use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Owner-or-admin check applied before update/delete on owner-scoped
/// resources. The acting identity passes when it appears among the owners or
/// holds the admin role.
pub fn assert_owner(
    actor: &CurrentUser,
    owner_ids: &[Uuid],
    resource_name: &str,
) -> Result<(), ApiError> {
    if actor.role == Role::Admin || owner_ids.contains(&actor.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "You do not have authorization to make any changes to this {}!",
            resource_name
        )))
    }
}

/// Pull owner ids out of a fetched record: either a JSONB id array
/// (products.seller_ids) or a single id column (reviews.author_id)
pub fn owner_ids_from(record: &Value, column: &str) -> Vec<Uuid> {
    match record.get(column) {
        Some(Value::Array(ids)) => ids
            .iter()
            .filter_map(|v| v.as_str())
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect(),
        Some(Value::String(id)) => Uuid::parse_str(id).ok().into_iter().collect(),
        _ => vec![],
    }
}
