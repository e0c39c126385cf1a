/// Fight resolution and loot rolls.
pub mod combat_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Enemy catalog management and seeding.
pub mod enemy_service;
/// Health check service.
pub mod health_service;
/// Player roster, XP grants and leaderboard.
pub mod player_service;
/// Shared global progress counter.
pub mod progress_service;
/// Leveling and stage rollover formulas.
pub mod progression;
/// Quest board management.
pub mod quest_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
