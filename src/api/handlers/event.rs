//! Admin login check and event stage management.

use crate::{
    api::{AppState, Payload},
    core::event,
    entities::{EventStage, EventStateModel},
    errors::{Error, Result},
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct EventStateRequest {
    state: String,
    winners_visible: Option<bool>,
}

/// Reached only with valid credentials, so it just confirms them.
pub async fn login() -> Json<Value> {
    Json(json!({ "success": true }))
}

pub async fn get_event_state(State(state): State<AppState>) -> Result<Json<EventStateModel>> {
    event::get_event_state(state.db.as_ref()).await.map(Json)
}

pub async fn set_event_state(
    State(state): State<AppState>,
    Payload(request): Payload<EventStateRequest>,
) -> Result<Json<EventStateModel>> {
    let stage: EventStage = request.state.parse().map_err(|_| {
        Error::validation(format!(
            "Invalid state {:?}; expected SETUP, NOMINATIONS, VOTING or CLOSED",
            request.state
        ))
    })?;

    event::set_event_state(state.db.as_ref(), stage, request.winners_visible)
        .await
        .map(Json)
}
