use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::{EnemyEntity, LootEntryEntity};

/// Loot table row, used both in responses and in admin upserts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct LootEntryDto {
    /// Item added to the inventory when the roll succeeds.
    #[validate(length(min = 1, max = 64))]
    pub item: String,
    /// Independent drop probability in `[0, 1]`.
    #[validate(range(min = 0.0, max = 1.0))]
    pub chance: f64,
}

impl From<LootEntryEntity> for LootEntryDto {
    fn from(value: LootEntryEntity) -> Self {
        Self {
            item: value.item,
            chance: value.chance,
        }
    }
}

impl From<LootEntryDto> for LootEntryEntity {
    fn from(value: LootEntryDto) -> Self {
        Self {
            item: value.item,
            chance: value.chance,
        }
    }
}

/// Catalog entry as exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnemyResponse {
    /// Slug identifying the enemy.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Power compared against the attacker's.
    pub power: u32,
    /// Hit points, informational.
    pub hp: u32,
    /// Experience granted on victory.
    pub xp_reward: u64,
    /// Loot table rolled on victory.
    pub loot: Vec<LootEntryDto>,
}

impl From<EnemyEntity> for EnemyResponse {
    fn from(value: EnemyEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            power: value.power,
            hp: value.hp,
            xp_reward: value.xp_reward,
            loot: value.loot.into_iter().map(Into::into).collect(),
        }
    }
}

/// Admin payload for `PUT /enemies/{id}`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpsertEnemyRequest {
    /// Display name.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Combat power.
    pub power: u32,
    /// Hit points.
    pub hp: u32,
    /// Experience granted on victory.
    #[validate(range(max = 9_223_372_036_854_775_807_u64))]
    pub xp_reward: u64,
    /// Loot table rolled on victory.
    #[serde(default)]
    #[validate(length(max = 32), nested)]
    pub loot: Vec<LootEntryDto>,
}
