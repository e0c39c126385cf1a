//! DTOs for the player roster, XP grants and the leaderboard.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    config::GameRules,
    dao::models::PlayerEntity,
    dto::format_system_time,
    services::progression::{effective_power, xp_to_next_level},
};

/// Player as exposed to clients, with derived figures resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerResponse {
    /// Unique player name.
    pub name: String,
    /// Level derived from experience.
    pub level: u32,
    /// Accumulated experience.
    pub xp: u64,
    /// Experience still missing before the next level.
    pub xp_to_next_level: u64,
    /// Power used in combat (override or level-derived, plus equipment).
    pub power: u32,
    /// Explicit power override stored on the player, if any.
    pub power_override: Option<u32>,
    /// Equipped items; each adds a flat power bonus.
    pub equipment: Vec<String>,
    /// Loot collected in combat.
    pub inventory: Vec<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last change.
    pub updated_at: String,
}

impl PlayerResponse {
    /// Resolve derived figures of `entity` under `rules`.
    pub fn from_entity(entity: PlayerEntity, rules: &GameRules) -> Self {
        Self {
            xp_to_next_level: xp_to_next_level(entity.xp, rules),
            power: effective_power(&entity, rules),
            name: entity.name,
            level: entity.level,
            xp: entity.xp,
            power_override: entity.power,
            equipment: entity.equipment,
            inventory: entity.inventory,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}

/// Create-or-merge payload for `PUT /players/{name}`. Omitted fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpsertPlayerRequest {
    /// New experience total. Must not be lower than the current one.
    #[serde(default)]
    #[validate(range(max = 9_223_372_036_854_775_807_u64))]
    pub xp: Option<u64>,
    /// Power override used instead of the level-derived value.
    #[serde(default)]
    pub power: Option<u32>,
    /// Replacement equipment list.
    #[serde(default)]
    #[validate(length(max = 16))]
    pub equipment: Option<Vec<String>>,
}

/// Experience granted to a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GrantXpRequest {
    /// Experience to add.
    #[validate(range(min = 1, max = 100_000))]
    pub amount: u64,
}

/// Player after an XP grant, with level-up details.
#[derive(Debug, Serialize, ToSchema)]
pub struct XpGrantResponse {
    /// Player after the grant.
    pub player: PlayerResponse,
    /// Level before the grant.
    pub previous_level: u32,
    /// Whether the grant crossed a level boundary.
    pub leveled_up: bool,
}

/// Query string accepted by `GET /leaderboard`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Number of entries to return.
    pub limit: Option<usize>,
}

/// Single ranked row of the leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: usize,
    /// Player name.
    pub name: String,
    /// Player level.
    pub level: u32,
    /// Player experience.
    pub xp: u64,
}
