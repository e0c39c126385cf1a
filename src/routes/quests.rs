use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;

use crate::{
    dto::quest::{QuestResponse, UpdateQuestRequest},
    error::AppError,
    routes::extract::{ApiJson, ApiPath},
    services::quest_service,
    state::SharedState,
};

/// Public quest board routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quests", get(list_quests))
        .route("/quests/{id}", get(get_quest).patch(update_quest))
}

#[utoipa::path(
    get,
    path = "/quests",
    tag = "quests",
    responses((status = 200, description = "Quests, newest first", body = [QuestResponse]))
)]
/// List the quest board.
pub async fn list_quests(
    State(state): State<SharedState>,
) -> Result<Json<Vec<QuestResponse>>, AppError> {
    Ok(Json(quest_service::list_quests(&state).await?))
}

#[utoipa::path(
    get,
    path = "/quests/{id}",
    tag = "quests",
    params(("id" = Uuid, Path, description = "Quest identifier")),
    responses(
        (status = 200, description = "Quest", body = QuestResponse),
        (status = 404, description = "Unknown quest", body = crate::error::ErrorBody)
    )
)]
/// Fetch a quest by id.
pub async fn get_quest(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<QuestResponse>, AppError> {
    Ok(Json(quest_service::get_quest(&state, id).await?))
}

#[utoipa::path(
    patch,
    path = "/quests/{id}",
    tag = "quests",
    params(("id" = Uuid, Path, description = "Quest identifier")),
    request_body = UpdateQuestRequest,
    responses(
        (status = 200, description = "Quest updated", body = QuestResponse),
        (status = 404, description = "Unknown quest", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal status transition", body = crate::error::ErrorBody)
    )
)]
/// Move a quest through its lifecycle or edit its text.
pub async fn update_quest(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateQuestRequest>,
) -> Result<Json<QuestResponse>, AppError> {
    Ok(Json(quest_service::update_quest(&state, id, payload).await?))
}
