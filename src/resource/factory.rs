//! Generic CRUD operations over any [`Resource`] descriptor. Route handlers
//! compose authentication, role, and ownership checks first, then delegate
//! here; these operations never re-check identity validity.

use std::collections::HashMap;

use axum::response::Response;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::api::response;
use crate::database::{DatabaseManager, Repository};
use crate::error::{parse_id, ApiError};
use crate::filter::{Filter, QueryFeatures};
use crate::middleware::CurrentUser;
use crate::resource::Resource;

pub async fn create_one<R: Resource>(
    actor: &CurrentUser,
    parent_id: Option<Uuid>,
    body: Value,
) -> Result<Response, ApiError> {
    let input: R::Create = parse_body(body)?;
    input.validate()?;

    let mut fields = R::prepare_create(input, actor, parent_id)?;
    fields.insert("id".to_string(), json!(Uuid::new_v4()));

    let repo = repository::<R>().await?;
    let record = repo.insert(&fields).await.map_err(ApiError::from)?;
    R::after_change(repo.pool(), &record).await?;

    Ok(response::created(R::SINGULAR, strip_hidden::<R>(record)))
}

pub async fn get_one<R: Resource>(raw_id: &str) -> Result<Response, ApiError> {
    let id = parse_id(raw_id)?;
    let repo = repository::<R>().await?;

    let mut record = repo
        .select_by_id(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(not_found)?;
    R::expand(repo.pool(), &mut record).await?;

    Ok(response::ok_one(R::SINGULAR, strip_hidden::<R>(record)))
}

pub async fn get_all<R: Resource>(
    parent_id: Option<Uuid>,
    params: HashMap<String, String>,
) -> Result<Response, ApiError> {
    let mut filter = Filter::new(R::TABLE)?;
    R::scope(&mut filter);
    if let (Some(parent), Some(column)) = (parent_id, R::PARENT_COLUMN) {
        filter.scope_eq(column, json!(parent))?;
    }
    QueryFeatures::new(params).apply(&mut filter)?;

    let repo = repository::<R>().await?;
    let records = repo.select_any(&filter).await.map_err(ApiError::from)?;
    let records: Vec<Value> = records.into_iter().map(strip_hidden::<R>).collect();

    Ok(response::ok_list(R::PLURAL, records))
}

pub async fn update_one<R: Resource>(raw_id: &str, body: Value) -> Result<Response, ApiError> {
    let id = parse_id(raw_id)?;
    let input: R::Update = parse_body(body)?;
    input.validate()?;
    let fields = R::prepare_update(input)?;

    let repo = repository::<R>().await?;
    let record = repo
        .update_by_id(id, &fields)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(not_found)?;
    R::after_change(repo.pool(), &record).await?;

    Ok(response::ok_one(R::SINGULAR, strip_hidden::<R>(record)))
}

pub async fn delete_one<R: Resource>(raw_id: &str) -> Result<Response, ApiError> {
    let id = parse_id(raw_id)?;
    let repo = repository::<R>().await?;

    let record = repo
        .delete_by_id(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(not_found)?;
    R::after_delete(repo.pool(), &record).await?;

    Ok(response::no_content())
}

/// Fetch a record without responding; used by ownership guards
pub async fn fetch_record<R: Resource>(raw_id: &str) -> Result<Value, ApiError> {
    let id = parse_id(raw_id)?;
    let repo = repository::<R>().await?;
    repo.select_by_id(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(not_found)
}

async fn repository<R: Resource>() -> Result<Repository, ApiError> {
    let pool = DatabaseManager::pool().await?;
    Ok(Repository::new(R::TABLE, pool))
}

fn not_found() -> ApiError {
    ApiError::not_found("No document found with that ID")
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Validation(vec![e.to_string()]))
}

fn strip_hidden<R: Resource>(mut record: Value) -> Value {
    if let Value::Object(map) = &mut record {
        for field in R::hidden_fields() {
            map.remove(*field);
        }
    }
    record
}
