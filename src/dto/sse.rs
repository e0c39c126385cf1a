use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{global::GlobalProgressResponse, player::PlayerResponse};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` name, if any.
    pub event: Option<String>,
    /// Serialised `data:` payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether the store is currently unreachable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a contribution or a victory moved the shared counter.
pub struct ProgressUpdatedEvent {
    /// Counter after the change.
    pub progress: GlobalProgressResponse,
    /// Stages rolled over by the change.
    pub stages_completed: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player gained one or more levels.
pub struct PlayerLeveledUpEvent {
    /// Player name.
    pub name: String,
    /// Level before the gain.
    pub previous_level: u32,
    /// Level after the gain.
    pub level: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an admin removed a player.
pub struct PlayerDeletedEvent {
    /// Removed player.
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an admin removed a quest.
pub struct QuestDeletedEvent {
    /// Removed quest.
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an admin removed an enemy.
pub struct EnemyDeletedEvent {
    /// Removed enemy.
    pub id: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after every fight, won or lost.
pub struct CombatResolvedEvent {
    /// Player after the fight.
    pub player: PlayerResponse,
    /// Enemy fought.
    pub enemy_id: String,
    /// Whether the player won.
    pub won: bool,
    /// Items dropped.
    pub loot: Vec<String>,
}
