use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::response::Response;
use axum::{Extension, Json};
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::review::{CreateReview, UpdateReview};
use crate::database::models::user::Role;
use crate::error::{parse_id, ApiError};
use crate::handlers::products::Products;
use crate::middleware::{restrict_to, CurrentUser};
use crate::resource::{factory, field_map, ownership, Resource};
use crate::services::ratings;

/// Review resource; nests under products and recomputes the rating
/// aggregates after every mutation.
pub struct Reviews;

#[async_trait::async_trait]
impl Resource for Reviews {
    const TABLE: &'static str = "reviews";
    const SINGULAR: &'static str = "review";
    const PLURAL: &'static str = "reviews";
    const PARENT_COLUMN: Option<&'static str> = Some("product_id");

    type Create = CreateReview;
    type Update = UpdateReview;

    fn prepare_create(
        input: Self::Create,
        actor: &CurrentUser,
        parent_id: Option<Uuid>,
    ) -> Result<Map<String, Value>, ApiError> {
        let Some(product_id) = parent_id else {
            return Err(ApiError::bad_request("Each review must belong to a product"));
        };

        let mut fields = field_map(&input)?;
        fields.insert("product_id".to_string(), json!(product_id));
        // The acting identity is always the author
        fields.insert("author_id".to_string(), json!(actor.id));
        Ok(fields)
    }

    fn prepare_update(input: Self::Update) -> Result<Map<String, Value>, ApiError> {
        field_map(&input)
    }

    async fn after_change(pool: &PgPool, record: &Value) -> Result<(), ApiError> {
        if let Some(product_id) = ratings::product_id_of(record) {
            ratings::recompute_review_aggregates(pool, product_id).await?;
        }
        Ok(())
    }

    async fn after_delete(pool: &PgPool, record: &Value) -> Result<(), ApiError> {
        if let Some(product_id) = ratings::product_id_of(record) {
            ratings::recompute_review_aggregates(pool, product_id).await?;
        }
        Ok(())
    }
}

/// GET /api/v1/products/:product_id/reviews (protected)
pub async fn get_product_reviews(
    Path(product_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let product_id = parse_id(&product_id)?;
    factory::get_all::<Reviews>(Some(product_id), params).await
}

/// POST /api/v1/products/:product_id/reviews (protected, user role)
pub async fn create_review(
    Extension(actor): Extension<CurrentUser>,
    Path(product_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::User])?;
    // The reviewed product must exist before the uniqueness constraint runs
    factory::fetch_record::<Products>(&product_id).await?;
    let product_id = parse_id(&product_id)?;
    factory::create_one::<Reviews>(&actor, Some(product_id), body).await
}

/// GET /api/v1/reviews/:id (protected)
pub async fn get_review(Path(id): Path<String>) -> Result<Response, ApiError> {
    factory::get_one::<Reviews>(&id).await
}

/// PATCH /api/v1/reviews/:id (protected, user/admin, author-scoped)
pub async fn update_review(
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::User, Role::Admin])?;
    verify_review_author(&actor, &id).await?;
    factory::update_one::<Reviews>(&id, body).await
}

/// DELETE /api/v1/reviews/:id (protected, user/admin, author-scoped)
pub async fn delete_review(
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::User, Role::Admin])?;
    verify_review_author(&actor, &id).await?;
    factory::delete_one::<Reviews>(&id).await
}

/// Ownership gate applied before review mutations
async fn verify_review_author(actor: &CurrentUser, id: &str) -> Result<(), ApiError> {
    let record = factory::fetch_record::<Reviews>(id).await?;
    let authors = ownership::owner_ids_from(&record, "author_id");
    ownership::assert_owner(actor, &authors, "review")
}
