use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        enemy::{EnemyResponse, UpsertEnemyRequest},
        global::{GlobalProgressResponse, SetProgressRequest},
        quest::{CreateQuestRequest, QuestResponse},
    },
    error::AppError,
    routes::extract::{ApiJson, ApiPath},
    services::{enemy_service, player_service, progress_service, quest_service},
    state::SharedState,
};

const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Mutations reserved to operators holding the shared admin secret.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/global", put(set_progress))
        .route("/players/{name}", delete(delete_player))
        .route("/quests", post(create_quest))
        .route("/quests/{id}", delete(delete_quest))
        .route("/enemies/{id}", put(upsert_enemy).delete(delete_enemy))
        .route_layer(middleware::from_fn_with_state(state, require_admin_secret))
}

/// Overwrite the shared progress counter.
#[utoipa::path(
    put,
    path = "/global",
    tag = "admin",
    params(("X-Admin-Secret" = String, Header, description = "Shared admin secret")),
    request_body = SetProgressRequest,
    responses(
        (status = 200, description = "Progress overwritten", body = GlobalProgressResponse),
        (status = 403, description = "Missing or invalid admin secret", body = crate::error::ErrorBody)
    )
)]
pub async fn set_progress(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<SetProgressRequest>,
) -> Result<Json<GlobalProgressResponse>, AppError> {
    Ok(Json(progress_service::set_progress(&state, payload).await?))
}

/// Remove a player from the roster.
#[utoipa::path(
    delete,
    path = "/players/{name}",
    tag = "admin",
    params(("X-Admin-Secret" = String, Header, description = "Shared admin secret"),
    ("name" = String, Path, description = "Player name")),
    responses(
        (status = 204, description = "Player deleted"),
        (status = 404, description = "Unknown player", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    ApiPath(name): ApiPath<String>,
) -> Result<StatusCode, AppError> {
    player_service::delete_player(&state, name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Post a new quest on the board.
#[utoipa::path(
    post,
    path = "/quests",
    tag = "admin",
    params(("X-Admin-Secret" = String, Header, description = "Shared admin secret")),
    request_body = CreateQuestRequest,
    responses(
        (status = 201, description = "Quest created", body = QuestResponse),
        (status = 400, description = "Invalid quest", body = crate::error::ErrorBody)
    )
)]
pub async fn create_quest(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateQuestRequest>,
) -> Result<(StatusCode, Json<QuestResponse>), AppError> {
    let quest = quest_service::create_quest(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(quest)))
}

/// Take a quest off the board.
#[utoipa::path(
    delete,
    path = "/quests/{id}",
    tag = "admin",
    params(("X-Admin-Secret" = String, Header, description = "Shared admin secret"),
    ("id" = Uuid, Path, description = "Quest identifier")),
    responses(
        (status = 204, description = "Quest deleted"),
        (status = 404, description = "Unknown quest", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_quest(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    quest_service::delete_quest(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create or replace an enemy definition.
#[utoipa::path(
    put,
    path = "/enemies/{id}",
    tag = "admin",
    params(("X-Admin-Secret" = String, Header, description = "Shared admin secret"),
    ("id" = String, Path, description = "Enemy slug")),
    request_body = UpsertEnemyRequest,
    responses(
        (status = 200, description = "Enemy saved", body = EnemyResponse),
        (status = 400, description = "Invalid enemy", body = crate::error::ErrorBody)
    )
)]
pub async fn upsert_enemy(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpsertEnemyRequest>,
) -> Result<Json<EnemyResponse>, AppError> {
    Ok(Json(enemy_service::upsert_enemy(&state, id, payload).await?))
}

/// Remove an enemy from the catalog.
#[utoipa::path(
    delete,
    path = "/enemies/{id}",
    tag = "admin",
    params(("X-Admin-Secret" = String, Header, description = "Shared admin secret"),
    ("id" = String, Path, description = "Enemy slug")),
    responses(
        (status = 204, description = "Enemy deleted"),
        (status = 404, description = "Unknown enemy", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_enemy(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<String>,
) -> Result<StatusCode, AppError> {
    enemy_service::delete_enemy(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject requests whose `X-Admin-Secret` header does not match the configured secret.
async fn require_admin_secret(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.admin_secret() else {
        return Err(AppError::Forbidden(
            "admin operations are disabled (no ADMIN_SECRET configured)".into(),
        ));
    };

    let provided = req
        .headers()
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Forbidden("missing admin secret header `X-Admin-Secret`".into())
        })?;

    if provided == expected {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Forbidden("invalid admin secret".into()))
    }
}
