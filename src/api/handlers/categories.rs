//! Admin category management and finalist selection.

use crate::{
    api::{AppState, Params, Payload},
    core::{
        categories::{self, CategoryChanges, CategoryOverview, NewCategory},
        finalists::{self, CategoryFinalists},
    },
    entities::CategoryModel,
    errors::Result,
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    short_description: String,
    order: Option<i32>,
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    id: i32,
    name: Option<String>,
    short_description: Option<String>,
    order: Option<i32>,
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub(crate) id: i32,
}

#[derive(Debug, Deserialize)]
pub struct SelectFinalistsRequest {
    category_id: i32,
    candidate_ids: Vec<i32>,
    max_candidates: Option<usize>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CategoryOverview>>> {
    categories::list_category_overviews(state.db.as_ref()).await.map(Json)
}

pub async fn create(
    State(state): State<AppState>,
    Payload(request): Payload<CreateCategoryRequest>,
) -> Result<Json<CategoryModel>> {
    let new = NewCategory {
        name: request.name,
        short_description: request.short_description,
        order: request.order,
        is_active: request.is_active,
    };
    categories::create_category(state.db.as_ref(), new).await.map(Json)
}

pub async fn update(
    State(state): State<AppState>,
    Payload(request): Payload<UpdateCategoryRequest>,
) -> Result<Json<CategoryModel>> {
    let changes = CategoryChanges {
        name: request.name,
        short_description: request.short_description,
        order: request.order,
        is_active: request.is_active,
    };
    categories::update_category(state.db.as_ref(), request.id, changes)
        .await
        .map(Json)
}

pub async fn delete(
    State(state): State<AppState>,
    Params(query): Params<IdQuery>,
) -> Result<Json<Value>> {
    categories::delete_category(state.db.as_ref(), query.id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn selected_candidates(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryFinalists>>> {
    finalists::list_selected_candidates(state.db.as_ref()).await.map(Json)
}

/// The cap defaults to the configured maximum; a request may name its own.
pub async fn select_candidates(
    State(state): State<AppState>,
    Payload(request): Payload<SelectFinalistsRequest>,
) -> Result<Json<Value>> {
    let max = request
        .max_candidates
        .unwrap_or(state.config.max_finalists);
    let selected = finalists::select_finalists(
        state.db.as_ref(),
        request.category_id,
        &request.candidate_ids,
        max,
    )
    .await?;
    Ok(Json(json!({ "success": true, "selected": selected })))
}
