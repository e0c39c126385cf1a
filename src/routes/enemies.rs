use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::enemy::EnemyResponse, error::AppError, routes::extract::ApiPath,
    services::enemy_service, state::SharedState,
};

/// Public enemy catalog routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/enemies", get(list_enemies))
        .route("/enemies/{id}", get(get_enemy))
}

/// List the catalog, weakest first.
#[utoipa::path(
    get,
    path = "/enemies",
    tag = "enemies",
    responses((status = 200, description = "Enemies sorted by power", body = [EnemyResponse]))
)]
pub async fn list_enemies(
    State(state): State<SharedState>,
) -> Result<Json<Vec<EnemyResponse>>, AppError> {
    Ok(Json(enemy_service::list_enemies(&state).await?))
}

/// Fetch one enemy.
#[utoipa::path(
    get,
    path = "/enemies/{id}",
    tag = "enemies",
    params(("id" = String, Path, description = "Enemy slug")),
    responses(
        (status = 200, description = "Enemy", body = EnemyResponse),
        (status = 404, description = "Unknown enemy", body = crate::error::ErrorBody)
    )
)]
pub async fn get_enemy(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<EnemyResponse>, AppError> {
    Ok(Json(enemy_service::get_enemy(&state, id).await?))
}
