use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::global::{ContributeRequest, ContributeResponse, GlobalProgressResponse},
    error::AppError,
    routes::extract::ApiJson,
    services::progress_service,
    state::SharedState,
};

/// Public routes for the shared progress counter.
pub fn router() -> Router<SharedState> {
    Router::new().route("/global", get(get_progress).patch(contribute))
}

#[utoipa::path(
    get,
    path = "/global",
    tag = "global",
    responses(
        (status = 200, description = "Current global progress", body = GlobalProgressResponse),
        (status = 503, description = "Storage unavailable", body = crate::error::ErrorBody)
    )
)]
/// Return the shared progress counter.
pub async fn get_progress(
    State(state): State<SharedState>,
) -> Result<Json<GlobalProgressResponse>, AppError> {
    Ok(Json(progress_service::get_progress(&state).await?))
}

#[utoipa::path(
    patch,
    path = "/global",
    tag = "global",
    request_body = ContributeRequest,
    responses(
        (status = 200, description = "Contribution applied", body = ContributeResponse),
        (status = 400, description = "Amount out of range", body = crate::error::ErrorBody)
    )
)]
/// Add a contribution to the shared counter, rolling over completed stages.
pub async fn contribute(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<ContributeRequest>,
) -> Result<Json<ContributeResponse>, AppError> {
    Ok(Json(progress_service::contribute(&state, payload).await?))
}
