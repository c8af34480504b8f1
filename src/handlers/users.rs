use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::api::response;
use crate::auth::password;
use crate::database::models::user::{
    AdminUpdateUser, DeleteMyAccountBody, Role, UpdateMyAccountBody, User,
};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::auth::{parse_body, to_json};
use crate::middleware::{restrict_to, CurrentUser};
use crate::resource::{factory, field_map, Resource};

/// Identity resource consumed by the generic admin CRUD operations
pub struct Users;

#[async_trait::async_trait]
impl Resource for Users {
    const TABLE: &'static str = "users";
    const SINGULAR: &'static str = "user";
    const PLURAL: &'static str = "users";

    type Create = AdminUpdateUser;
    type Update = AdminUpdateUser;

    fn hidden_fields() -> &'static [&'static str] {
        &[
            "password_hash",
            "password_reset_token",
            "password_reset_expires_at",
            "active",
        ]
    }

    fn scope(filter: &mut Filter) {
        // Soft-deleted accounts never list
        filter.scope_raw("\"active\"");
    }

    fn prepare_create(
        _input: Self::Create,
        _actor: &CurrentUser,
        _parent_id: Option<Uuid>,
    ) -> Result<Map<String, Value>, ApiError> {
        Err(ApiError::bad_request("Use '/signup' to create new users!"))
    }

    fn prepare_update(input: Self::Update) -> Result<Map<String, Value>, ApiError> {
        field_map(input)
    }
}

/// GET /api/v1/users/my-account (protected)
pub async fn my_account(Extension(actor): Extension<CurrentUser>) -> Result<Response, ApiError> {
    factory::get_one::<Users>(&actor.id.to_string()).await
}

/// PATCH /api/v1/users/update-my-account (protected)
pub async fn update_my_account(
    Extension(actor): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let input: UpdateMyAccountBody = parse_body(body)?;
    let user = verify_current_password(&actor, input.current_password.as_deref()).await?;
    input.validate()?;

    // Only name and email may change through this route
    let pool = DatabaseManager::pool().await?;
    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET name = COALESCE($1, name), email = COALESCE($2, email) \
         WHERE id = $3 RETURNING *",
    )
    .bind(&input.name)
    .bind(input.email.as_ref().map(|e| e.to_lowercase()))
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .map_err(ApiError::from)?;

    response::send_token(to_json(&updated)?, StatusCode::OK)
}

/// DELETE /api/v1/users/delete-my-account (protected): soft delete only
pub async fn delete_my_account(
    Extension(actor): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let input: DeleteMyAccountBody = parse_body(body)?;
    let user = verify_current_password(&actor, input.current_password.as_deref()).await?;

    let pool = DatabaseManager::pool().await?;
    sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .map_err(ApiError::from)?;

    Ok(response::no_content())
}

/// GET /api/v1/users (admin)
pub async fn get_all_users(
    Extension(actor): Extension<CurrentUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Admin])?;
    factory::get_all::<Users>(None, params).await
}

/// POST /api/v1/users (admin): accounts are only created through signup
pub async fn create_user(
    Extension(actor): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Admin])?;
    Ok(response::ok_message("Use '/signup' to create new users!"))
}

/// GET /api/v1/users/:id (admin)
pub async fn get_user(
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Admin])?;
    factory::get_one::<Users>(&id).await
}

/// PATCH /api/v1/users/:id (admin)
pub async fn update_user(
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Admin])?;
    factory::update_one::<Users>(&id, body).await
}

/// DELETE /api/v1/users/:id (admin)
pub async fn delete_user(
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Admin])?;
    factory::delete_one::<Users>(&id).await
}

/// Self-service mutations re-prove the current credential first
async fn verify_current_password(
    actor: &CurrentUser,
    current_password: Option<&str>,
) -> Result<User, ApiError> {
    let Some(current) = current_password else {
        return Err(ApiError::bad_request("Current password is required!"));
    };

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND active")
        .bind(actor.id)
        .fetch_one(&pool)
        .await
        .map_err(ApiError::from)?;

    if !password::verify_password(current, &user.password_hash)? {
        return Err(ApiError::not_found("Incorrect password! Try again."));
    }

    Ok(user)
}
