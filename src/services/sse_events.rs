use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        enemy::EnemyResponse,
        global::GlobalProgressResponse,
        player::PlayerResponse,
        quest::QuestResponse,
        sse::{
            CombatResolvedEvent, EnemyDeletedEvent, PlayerDeletedEvent, PlayerLeveledUpEvent,
            ProgressUpdatedEvent, QuestDeletedEvent, ServerEvent, SystemStatus,
        },
    },
    state::SharedState,
};

const EVENT_PROGRESS_UPDATED: &str = "progress.updated";
const EVENT_PLAYER_UPDATED: &str = "player.updated";
const EVENT_PLAYER_LEVELED_UP: &str = "player.leveled_up";
const EVENT_PLAYER_DELETED: &str = "player.deleted";
const EVENT_QUEST_CREATED: &str = "quest.created";
const EVENT_QUEST_UPDATED: &str = "quest.updated";
const EVENT_QUEST_DELETED: &str = "quest.deleted";
const EVENT_ENEMY_UPDATED: &str = "enemy.updated";
const EVENT_ENEMY_DELETED: &str = "enemy.deleted";
const EVENT_COMBAT_RESOLVED: &str = "combat.resolved";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the shared counter after it moved.
pub fn broadcast_progress_updated(
    state: &SharedState,
    progress: GlobalProgressResponse,
    stages_completed: u32,
) {
    let payload = ProgressUpdatedEvent {
        progress,
        stages_completed,
    };
    send_public_event(state, EVENT_PROGRESS_UPDATED, &payload);
}

/// Broadcast a created or changed player.
pub fn broadcast_player_updated(state: &SharedState, player: &PlayerResponse) {
    send_public_event(state, EVENT_PLAYER_UPDATED, player);
}

/// Broadcast that a player reached a higher level.
pub fn broadcast_player_leveled_up(state: &SharedState, name: &str, previous_level: u32, level: u32) {
    let payload = PlayerLeveledUpEvent {
        name: name.to_owned(),
        previous_level,
        level,
    };
    send_public_event(state, EVENT_PLAYER_LEVELED_UP, &payload);
}

/// Broadcast a removed player.
pub fn broadcast_player_deleted(state: &SharedState, name: &str) {
    let payload = PlayerDeletedEvent {
        name: name.to_owned(),
    };
    send_public_event(state, EVENT_PLAYER_DELETED, &payload);
}

/// Broadcast a new quest.
pub fn broadcast_quest_created(state: &SharedState, quest: &QuestResponse) {
    send_public_event(state, EVENT_QUEST_CREATED, quest);
}

/// Broadcast a changed quest.
pub fn broadcast_quest_updated(state: &SharedState, quest: &QuestResponse) {
    send_public_event(state, EVENT_QUEST_UPDATED, quest);
}

/// Broadcast a removed quest.
pub fn broadcast_quest_deleted(state: &SharedState, id: Uuid) {
    send_public_event(state, EVENT_QUEST_DELETED, &QuestDeletedEvent { id });
}

/// Broadcast a created or replaced enemy.
pub fn broadcast_enemy_updated(state: &SharedState, enemy: &EnemyResponse) {
    send_public_event(state, EVENT_ENEMY_UPDATED, enemy);
}

/// Broadcast a removed enemy.
pub fn broadcast_enemy_deleted(state: &SharedState, id: &str) {
    let payload = EnemyDeletedEvent { id: id.to_owned() };
    send_public_event(state, EVENT_ENEMY_DELETED, &payload);
}

/// Broadcast the outcome of a fight.
pub fn broadcast_combat_resolved(
    state: &SharedState,
    player: PlayerResponse,
    enemy_id: &str,
    won: bool,
    loot: Vec<String>,
) {
    let payload = CombatResolvedEvent {
        player,
        enemy_id: enemy_id.to_owned(),
        won,
        loot,
    };
    send_public_event(state, EVENT_COMBAT_RESOLVED, &payload);
}

/// Broadcast a degraded mode transition.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
