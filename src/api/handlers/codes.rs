//! Admin member code import and listings.

use crate::{
    api::{AppState, Payload},
    core::codes::{self, CensoredCode, CodeStats},
    errors::Result,
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct ImportCodesRequest {
    #[serde(default)]
    codes: Vec<String>,
}

pub async fn import(
    State(state): State<AppState>,
    Payload(request): Payload<ImportCodesRequest>,
) -> Result<Json<Value>> {
    let outcome = codes::import_codes(state.db.as_ref(), &request.codes).await?;
    Ok(Json(json!({
        "success": true,
        "imported": outcome.imported,
        "total": outcome.total,
    })))
}

/// Codes are never returned in clear text.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CensoredCode>>> {
    codes::list_censored_codes(state.db.as_ref()).await.map(Json)
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<CodeStats>> {
    codes::code_stats(state.db.as_ref()).await.map(Json)
}
