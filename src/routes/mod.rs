use axum::Router;

use crate::state::SharedState;

/// Admin-only mutations.
pub mod admin;
/// `POST /combat/attack`.
pub mod combat;
/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Public enemy catalog.
pub mod enemies;
pub mod extract;
/// Shared progress counter.
pub mod global;
/// Liveness endpoint.
pub mod health;
/// Player roster, XP and leaderboard.
pub mod players;
/// Quest board.
pub mod quests;
/// Server-sent events.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(global::router())
        .merge(players::router())
        .merge(quests::router())
        .merge(enemies::router())
        .merge(combat::router())
        .merge(admin::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
