//! Member-facing endpoints: event state, code validation, ballots and published winners.

use crate::{
    api::{AppState, Params, Payload},
    core::{
        candidates::{self, PublicCandidate},
        categories::{self, CategoryListing},
        codes::{self, CodeValidation},
        event,
        submission::{self, Ballot, BallotEntry},
        winners::{self, AnnouncedWinner},
    },
    entities::EventStage,
    errors::{Error, Result},
};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Stage information members need to pick the right form.
#[derive(Debug, Serialize)]
pub struct PublicEventState {
    state: EventStage,
    winners_visible: bool,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    code: String,
}

/// Either `nominations: [...]` or a single `category_id` / `candidate_id` pair.
#[derive(Debug, Deserialize)]
pub struct NominateRequest {
    #[serde(default)]
    code: String,
    nominations: Option<Vec<BallotEntry>>,
    category_id: Option<i32>,
    candidate_id: Option<i32>,
}

impl NominateRequest {
    fn ballot(&self) -> Result<Ballot> {
        match (&self.nominations, self.category_id, self.candidate_id) {
            (Some(entries), _, _) => Ok(Ballot::Full(entries.clone())),
            (None, Some(category_id), Some(candidate_id)) => Ok(Ballot::Single(BallotEntry {
                category_id,
                candidate_id,
            })),
            _ => Err(Error::validation(
                "Send either a nominations list or a category_id and candidate_id",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    code: String,
    #[serde(default)]
    votes: Vec<BallotEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    with_candidates: bool,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn event_state(State(state): State<AppState>) -> Result<Json<PublicEventState>> {
    let current = event::get_event_state(state.db.as_ref()).await?;
    Ok(Json(PublicEventState {
        state: current.state,
        winners_visible: current.winners_visible,
    }))
}

/// Rejections are reported as `{"valid": false, "error": ...}` with status 200; only a
/// missing code is a request error.
pub async fn validate_code(
    State(state): State<AppState>,
    Payload(request): Payload<CodeRequest>,
) -> Result<Json<Value>> {
    let body = match codes::validate_code(state.db.as_ref(), &request.code).await? {
        CodeValidation::Valid { stage } => json!({ "valid": true, "state": stage }),
        CodeValidation::Rejected(reason) => {
            json!({ "valid": false, "error": reason.to_string() })
        }
    };
    Ok(Json(body))
}

pub async fn nominate(
    State(state): State<AppState>,
    Payload(request): Payload<NominateRequest>,
) -> Result<Json<Value>> {
    let ballot = request.ballot()?;
    let recorded = submission::submit_nominations(state.db.as_ref(), &request.code, ballot).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Nominations recorded",
        "recorded": recorded,
    })))
}

pub async fn vote(
    State(state): State<AppState>,
    Payload(request): Payload<VoteRequest>,
) -> Result<Json<Value>> {
    let recorded = submission::submit_votes(state.db.as_ref(), &request.code, &request.votes).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Votes recorded",
        "recorded": recorded,
    })))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Params(query): Params<CategoryQuery>,
) -> Result<Json<Vec<CategoryListing>>> {
    categories::list_public_categories(state.db.as_ref(), query.active, query.with_candidates)
        .await
        .map(Json)
}

pub async fn list_candidates(State(state): State<AppState>) -> Result<Json<Vec<PublicCandidate>>> {
    candidates::list_active_candidates(state.db.as_ref()).await.map(Json)
}

pub async fn list_winners(State(state): State<AppState>) -> Result<Json<Vec<AnnouncedWinner>>> {
    winners::announced_winners(state.db.as_ref()).await.map(Json)
}
