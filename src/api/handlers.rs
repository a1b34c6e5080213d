//! Request handlers for the public matchmaking API

use crate::api::error::{ApiError, NO_MATCH_MESSAGE};
use crate::api::validation::{parse_join_id, parse_match_id, validate_join_request};
use crate::api::ApiState;
use crate::error::MatchmakingError;
use crate::types::{JoinLobbyRequest, JoinLobbyResponse, LeaderboardRecord, MatchOutcome, MatchResponse};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Query string of `GET /match`
#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub join_id: Option<String>,
}

/// Query string of `GET /leaderboard`
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub match_id: Option<String>,
}

fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, ApiError> {
    match value.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::BadRequest(format!("{} is required", name))),
    }
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// `POST /lobby`: validate the request and seat the player
pub async fn join_lobby(
    State(state): State<ApiState>,
    payload: Result<Json<JoinLobbyRequest>, JsonRejection>,
) -> Result<Json<JoinLobbyResponse>, ApiError> {
    let Json(request) = payload?;
    let player = validate_join_request(request)?;
    let join_id = player.join_id;

    info!(
        "Join request - player_id: '{}', level: {}, country: {}, join_id: {}",
        player.player_id, player.level, player.country, join_id
    );
    state.lobby.add_player(player)?;

    Ok(Json(JoinLobbyResponse { join_id }))
}

/// `GET /match`: long-poll until the join id resolves or the match making
/// time runs out
pub async fn join_match(
    State(state): State<ApiState>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<MatchResponse>, ApiError> {
    let join_id = parse_join_id(required("join_id", &query.join_id)?)?;

    let deadline = state.lobby.get_match_making_time();
    let outcome = state.lobby.wait_for_match(&join_id, deadline).await?;
    debug!("Join id {} resolved to {}", join_id, outcome);

    match outcome {
        MatchOutcome::Matched(match_id) => Ok(Json(MatchResponse { match_id })),
        MatchOutcome::Unmatched | MatchOutcome::Pending => {
            Err(ApiError::NotFound(NO_MATCH_MESSAGE.to_string()))
        }
    }
}

/// `GET /leaderboard`: roster snapshot of a started match
pub async fn get_leaderboard(
    State(state): State<ApiState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardRecord>, ApiError> {
    let match_id = parse_match_id(required("match_id", &query.match_id)?)?;

    let record = state
        .leaderboards
        .get_leaderboard(&match_id)?
        .ok_or_else(|| MatchmakingError::LeaderboardNotFound {
            match_id: match_id.to_string(),
        })?;

    Ok(Json(record))
}
