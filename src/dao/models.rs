use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Identifier of the single global progress document.
pub const GLOBAL_PROGRESS_ID: &str = "global";

/// Shared progress counter every player contributes to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalProgressEntity {
    /// Progress accumulated toward the current goal.
    pub current: u64,
    /// Amount required to complete the current stage.
    pub goal: u64,
    /// Stage currently being worked on (starts at 1).
    pub stage: u32,
    /// Last time the counter changed.
    pub updated_at: SystemTime,
}

/// Player record keyed by its display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Unique player name, also used as the document key.
    pub name: String,
    /// Level derived from the accumulated experience.
    pub level: u32,
    /// Accumulated experience points.
    pub xp: u64,
    /// Explicit power override; derived from the level when absent.
    #[serde(default)]
    pub power: Option<u32>,
    /// Items currently equipped.
    #[serde(default)]
    pub equipment: Vec<String>,
    /// Loot collected from combat.
    #[serde(default)]
    pub inventory: Vec<String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the player changed.
    pub updated_at: SystemTime,
}

/// Lifecycle of a quest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Posted, nobody working on it.
    Open,
    /// Being worked on.
    InProgress,
    /// Finished. Terminal.
    Completed,
    /// Given up. Terminal.
    Abandoned,
}

impl QuestStatus {
    /// Whether the quest can no longer change status.
    pub fn is_terminal(self) -> bool {
        matches!(self, QuestStatus::Completed | QuestStatus::Abandoned)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: QuestStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            QuestStatus::Open => matches!(
                next,
                QuestStatus::InProgress | QuestStatus::Completed | QuestStatus::Abandoned
            ),
            QuestStatus::InProgress => matches!(
                next,
                QuestStatus::Open | QuestStatus::Completed | QuestStatus::Abandoned
            ),
            QuestStatus::Completed | QuestStatus::Abandoned => false,
        }
    }
}

/// Quest tracked on the shared quest board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestEntity {
    /// Primary key of the quest.
    pub id: Uuid,
    /// Short title shown on the board.
    pub title: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Player the quest is assigned to, if any.
    #[serde(default)]
    pub player: Option<String>,
    /// Current status.
    pub status: QuestStatus,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the quest changed.
    pub updated_at: SystemTime,
    /// When the quest was completed.
    #[serde(default)]
    pub completed_at: Option<SystemTime>,
}

/// Single entry of an enemy loot table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LootEntryEntity {
    /// Item name added to the player's inventory.
    pub item: String,
    /// Independent drop probability in `[0, 1]`.
    pub chance: f64,
}

/// Enemy definition from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnemyEntity {
    /// Slug identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Combat strength compared against the player's power.
    pub power: u32,
    /// Hit points.
    pub hp: u32,
    /// Experience granted on victory.
    pub xp_reward: u64,
    /// Items that may drop on victory.
    #[serde(default)]
    pub loot: Vec<LootEntryEntity>,
}
