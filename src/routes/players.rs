use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::player::{
        GrantXpRequest, LeaderboardEntry, LeaderboardQuery, PlayerResponse, UpsertPlayerRequest,
        XpGrantResponse,
    },
    error::AppError,
    routes::extract::{ApiJson, ApiPath, ApiQuery},
    services::player_service,
    state::SharedState,
};

/// Public player routes: roster, upsert, XP grants and leaderboard.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players", get(list_players))
        .route("/players/{name}", get(get_player).put(upsert_player))
        .route("/players/{name}/xp", post(grant_xp))
        .route("/leaderboard", get(leaderboard))
}

#[utoipa::path(
    get,
    path = "/players",
    tag = "players",
    responses((status = 200, description = "All players sorted by name", body = [PlayerResponse]))
)]
/// List every player.
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerResponse>>, AppError> {
    Ok(Json(player_service::list_players(&state).await?))
}

#[utoipa::path(
    get,
    path = "/players/{name}",
    tag = "players",
    params(("name" = String, Path, description = "Player name")),
    responses(
        (status = 200, description = "Player", body = PlayerResponse),
        (status = 404, description = "Unknown player", body = crate::error::ErrorBody)
    )
)]
/// Fetch a player by name.
pub async fn get_player(
    State(state): State<SharedState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(player_service::get_player(&state, name).await?))
}

#[utoipa::path(
    put,
    path = "/players/{name}",
    tag = "players",
    params(("name" = String, Path, description = "Player name")),
    request_body = UpsertPlayerRequest,
    responses(
        (status = 200, description = "Player updated", body = PlayerResponse),
        (status = 201, description = "Player created", body = PlayerResponse),
        (status = 400, description = "Invalid name or decreasing experience", body = crate::error::ErrorBody)
    )
)]
/// Create a player or merge the given fields into it.
pub async fn upsert_player(
    State(state): State<SharedState>,
    ApiPath(name): ApiPath<String>,
    ApiJson(payload): ApiJson<UpsertPlayerRequest>,
) -> Result<(StatusCode, Json<PlayerResponse>), AppError> {
    let (player, created) = player_service::upsert_player(&state, name, payload).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(player)))
}

#[utoipa::path(
    post,
    path = "/players/{name}/xp",
    tag = "players",
    params(("name" = String, Path, description = "Player name")),
    request_body = GrantXpRequest,
    responses(
        (status = 200, description = "Experience granted", body = XpGrantResponse),
        (status = 404, description = "Unknown player", body = crate::error::ErrorBody)
    )
)]
/// Grant experience to a player.
pub async fn grant_xp(
    State(state): State<SharedState>,
    ApiPath(name): ApiPath<String>,
    ApiJson(payload): ApiJson<GrantXpRequest>,
) -> Result<Json<XpGrantResponse>, AppError> {
    Ok(Json(player_service::grant_xp(&state, name, payload).await?))
}

#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "players",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Top players", body = [LeaderboardEntry]),
        (status = 400, description = "Invalid limit", body = crate::error::ErrorBody)
    )
)]
/// Players ranked by level, then experience.
pub async fn leaderboard(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    Ok(Json(player_service::leaderboard(&state, query.limit).await?))
}
