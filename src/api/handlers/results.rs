//! Admin tallies, results, winner publication and presentation data.

use crate::{
    api::{AppState, Params, Payload},
    core::{
        results::{self, CategoryResult, NominationTally, VoteTally},
        winners::{self, PresentationCategory, WinnerChange},
    },
    entities::CategoryModel,
    errors::Result,
};
use axum::{Json, extract::State};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct NominationQuery {
    category_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    category_id: Option<i32>,
    #[serde(default)]
    only_selected: bool,
}

/// `candidate_id` distinguishes absent (keep) from `null` (clear).
#[derive(Debug, Deserialize)]
pub struct PublishWinnerRequest {
    category_id: i32,
    #[serde(default, deserialize_with = "double_option")]
    candidate_id: Option<Option<i32>>,
    announce: Option<bool>,
}

fn double_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

pub async fn nominations(
    State(state): State<AppState>,
    Params(query): Params<NominationQuery>,
) -> Result<Json<Vec<NominationTally>>> {
    results::nomination_tallies(state.db.as_ref(), query.category_id)
        .await
        .map(Json)
}

pub async fn votes(
    State(state): State<AppState>,
    Params(query): Params<VoteQuery>,
) -> Result<Json<Vec<VoteTally>>> {
    results::vote_tallies(state.db.as_ref(), query.category_id, query.only_selected)
        .await
        .map(Json)
}

pub async fn category_results(State(state): State<AppState>) -> Result<Json<Vec<CategoryResult>>> {
    results::category_results(state.db.as_ref()).await.map(Json)
}

pub async fn publish_winner(
    State(state): State<AppState>,
    Payload(request): Payload<PublishWinnerRequest>,
) -> Result<Json<CategoryModel>> {
    let change = WinnerChange {
        category_id: request.category_id,
        candidate_id: request.candidate_id,
        announce: request.announce,
    };
    winners::publish_winner(state.db.as_ref(), change).await.map(Json)
}

pub async fn presentation(
    State(state): State<AppState>,
) -> Result<Json<Vec<PresentationCategory>>> {
    winners::presentation_data(state.db.as_ref()).await.map(Json)
}
