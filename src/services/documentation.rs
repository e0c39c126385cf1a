use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Idle Quest Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::global::get_progress,
        crate::routes::global::contribute,
        crate::routes::players::list_players,
        crate::routes::players::get_player,
        crate::routes::players::upsert_player,
        crate::routes::players::grant_xp,
        crate::routes::players::leaderboard,
        crate::routes::quests::list_quests,
        crate::routes::quests::get_quest,
        crate::routes::quests::update_quest,
        crate::routes::enemies::list_enemies,
        crate::routes::enemies::get_enemy,
        crate::routes::combat::attack,
        crate::routes::admin::set_progress,
        crate::routes::admin::delete_player,
        crate::routes::admin::create_quest,
        crate::routes::admin::delete_quest,
        crate::routes::admin::upsert_enemy,
        crate::routes::admin::delete_enemy,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::global::GlobalProgressResponse,
            crate::dto::global::ContributeRequest,
            crate::dto::global::ContributeResponse,
            crate::dto::global::SetProgressRequest,
            crate::dto::player::PlayerResponse,
            crate::dto::player::UpsertPlayerRequest,
            crate::dto::player::GrantXpRequest,
            crate::dto::player::XpGrantResponse,
            crate::dto::player::LeaderboardEntry,
            crate::dto::quest::QuestStatusDto,
            crate::dto::quest::QuestResponse,
            crate::dto::quest::CreateQuestRequest,
            crate::dto::quest::UpdateQuestRequest,
            crate::dto::enemy::LootEntryDto,
            crate::dto::enemy::EnemyResponse,
            crate::dto::enemy::UpsertEnemyRequest,
            crate::dto::combat::AttackRequest,
            crate::dto::combat::AttackResponse,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::ProgressUpdatedEvent,
            crate::dto::sse::PlayerLeveledUpEvent,
            crate::dto::sse::PlayerDeletedEvent,
            crate::dto::sse::QuestDeletedEvent,
            crate::dto::sse::EnemyDeletedEvent,
            crate::dto::sse::CombatResolvedEvent,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "global", description = "Shared progress counter"),
        (name = "players", description = "Player roster, experience and leaderboard"),
        (name = "quests", description = "Quest board"),
        (name = "enemies", description = "Enemy catalog"),
        (name = "combat", description = "Fight resolution"),
        (name = "admin", description = "Mutations guarded by the X-Admin-Secret header"),
    )
)]
/// Aggregated OpenAPI document served at `/api-doc/openapi.json`.
pub struct ApiDoc;
