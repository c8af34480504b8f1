use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::response::Response;
use axum::{Extension, Json};
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::response;
use crate::database::models::product::{slugify, CreateProduct, Quality, UpdateProduct};
use crate::database::models::user::Role;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{restrict_to, CurrentUser};
use crate::resource::{factory, field_map, ownership, Resource};
use crate::services::geo::{parse_latlng, DistanceUnit};
use crate::services::{geo, stats};

/// Catalog product resource
pub struct Products;

#[async_trait::async_trait]
impl Resource for Products {
    const TABLE: &'static str = "products";
    const SINGULAR: &'static str = "product";
    const PLURAL: &'static str = "products";

    type Create = CreateProduct;
    type Update = UpdateProduct;

    fn scope(filter: &mut Filter) {
        // Unlisted items are excluded from every list and aggregate path
        filter.scope_raw("\"secret\" IS DISTINCT FROM TRUE");
    }

    fn prepare_create(
        input: Self::Create,
        actor: &CurrentUser,
        _parent_id: Option<Uuid>,
    ) -> Result<Map<String, Value>, ApiError> {
        check_discount(input.price_discount, Some(input.price))?;

        let mut fields = field_map(&input)?;
        fields.insert("slug".to_string(), json!(slugify(&input.name)));
        // Items in new condition are withheld from public listings
        fields.insert("secret".to_string(), json!(input.quality == Quality::New));
        // The acting identity becomes the seller-of-record
        fields.insert("seller_ids".to_string(), json!([actor.id]));
        Ok(fields)
    }

    fn prepare_update(input: Self::Update) -> Result<Map<String, Value>, ApiError> {
        check_discount(input.price_discount, input.price)?;

        let mut fields = field_map(&input)?;
        if let Some(name) = &input.name {
            fields.insert("slug".to_string(), json!(slugify(name)));
        }
        if let Some(quality) = input.quality {
            fields.insert("secret".to_string(), json!(quality == Quality::New));
        }
        Ok(fields)
    }

    async fn expand(pool: &PgPool, record: &mut Value) -> Result<(), ApiError> {
        // Populate the product's reviews on single reads
        let Some(id) = record
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
        else {
            return Ok(());
        };

        let rows = sqlx::query_as::<_, (Value,)>(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM reviews WHERE product_id = $1) t",
        )
        .bind(id)
        .fetch_all(pool)
        .await
        .map_err(ApiError::from)?;

        if let Some(map) = record.as_object_mut() {
            map.insert(
                "reviews".to_string(),
                Value::Array(rows.into_iter().map(|(v,)| v).collect()),
            );
        }
        Ok(())
    }
}

fn check_discount(discount: Option<f64>, price: Option<f64>) -> Result<(), ApiError> {
    if let (Some(discount), Some(price)) = (discount, price) {
        if discount >= price {
            return Err(ApiError::Validation(vec![
                "Discount price cannot be more than regular price!".to_string(),
            ]));
        }
    }
    Ok(())
}

/// GET /api/v1/products
pub async fn get_all_products(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    factory::get_all::<Products>(None, params).await
}

/// GET /api/v1/products/:id
pub async fn get_product(Path(id): Path<String>) -> Result<Response, ApiError> {
    factory::get_one::<Products>(&id).await
}

/// POST /api/v1/products (protected, seller/admin)
pub async fn create_product(
    Extension(actor): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Seller, Role::Admin])?;
    factory::create_one::<Products>(&actor, None, body).await
}

/// PATCH /api/v1/products/:id (protected, seller/admin, owner-scoped)
pub async fn update_product(
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Seller, Role::Admin])?;
    verify_product_owner(&actor, &id).await?;
    factory::update_one::<Products>(&id, body).await
}

/// DELETE /api/v1/products/:id (protected, seller/admin, owner-scoped)
pub async fn delete_product(
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Seller, Role::Admin])?;
    verify_product_owner(&actor, &id).await?;
    factory::delete_one::<Products>(&id).await
}

/// GET /api/v1/products/product-stats
pub async fn product_stats() -> Result<Response, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let stats = stats::product_stats(&pool).await?;
    Ok(response::ok_list("stats", stats))
}

/// GET /api/v1/products/monthly-plan/:year (protected, seller/admin)
pub async fn monthly_plan(
    Extension(actor): Extension<CurrentUser>,
    Path(year): Path<i32>,
) -> Result<Response, ApiError> {
    restrict_to(&actor, &[Role::Seller, Role::Admin])?;
    let pool = DatabaseManager::pool().await?;
    let plan = stats::monthly_plan(&pool, year).await?;
    Ok(response::ok_list("plan", plan))
}

/// GET /api/v1/products/products-within/:distance/center/:latlng/unit/:unit
pub async fn products_within(
    Path((distance, latlng, unit)): Path<(f64, String, String)>,
) -> Result<Response, ApiError> {
    let (lat, lng) = parse_latlng(&latlng)?;
    let pool = DatabaseManager::pool().await?;
    let products =
        geo::products_within(&pool, distance, lat, lng, DistanceUnit::parse(&unit)).await?;
    Ok(response::ok_list("products", products))
}

/// GET /api/v1/products/products-near/:latlng/unit/:unit
pub async fn products_near(
    Path((latlng, unit)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (lat, lng) = parse_latlng(&latlng)?;
    let pool = DatabaseManager::pool().await?;
    let products = geo::products_near(&pool, lat, lng, DistanceUnit::parse(&unit)).await?;
    Ok(response::ok_list("products", products))
}

/// Ownership gate applied before product mutations
async fn verify_product_owner(actor: &CurrentUser, id: &str) -> Result<(), ApiError> {
    let record = factory::fetch_record::<Products>(id).await?;
    let owners = ownership::owner_ids_from(&record, "seller_ids");
    ownership::assert_owner(actor, &owners, "product")
}
