use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::{global::GlobalProgressResponse, player::PlayerResponse};

/// A player attacking an enemy from the catalog.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AttackRequest {
    /// Attacking player.
    pub player: String,
    /// Catalog id of the enemy.
    pub enemy_id: String,
}

/// Outcome of a single fight.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttackResponse {
    /// Whether the player won.
    pub won: bool,
    /// Probability of victory that was rolled against.
    pub win_chance: f64,
    /// Effective power of the player.
    pub player_power: u32,
    /// Power of the enemy.
    pub enemy_power: u32,
    /// Experience granted, zero on defeat.
    pub xp_gained: u64,
    /// Level before the fight.
    pub previous_level: u32,
    /// Whether the fight crossed a level boundary.
    pub leveled_up: bool,
    /// Items dropped by the enemy and added to the inventory.
    pub loot: Vec<String>,
    /// Player after the fight.
    pub player: PlayerResponse,
    /// Global progress after the victory was credited; absent on defeat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalProgressResponse>,
}
