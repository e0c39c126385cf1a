use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::combat::{AttackRequest, AttackResponse},
    error::AppError,
    routes::extract::ApiJson,
    services::combat_service,
    state::SharedState,
};

/// Combat routes.
pub fn router() -> Router<SharedState> {
    Router::new().route("/combat/attack", post(attack))
}

#[utoipa::path(
    post,
    path = "/combat/attack",
    tag = "combat",
    request_body = AttackRequest,
    responses(
        (status = 200, description = "Fight resolved", body = AttackResponse),
        (status = 404, description = "Unknown player or enemy", body = crate::error::ErrorBody)
    )
)]
/// Fight an enemy; victories grant experience, loot and global progress.
pub async fn attack(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<AttackRequest>,
) -> Result<Json<AttackResponse>, AppError> {
    Ok(Json(combat_service::attack(&state, payload).await?))
}
