use std::{sync::Arc, time::SystemTime};

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{QuestEntity, QuestStatus},
    dto::quest::{CreateQuestRequest, QuestResponse, UpdateQuestRequest},
    error::ServiceError,
    services::{player_service::check_name, sse_events},
    state::SharedState,
};

/// All quests, newest first.
pub async fn list_quests(state: &SharedState) -> Result<Vec<QuestResponse>, ServiceError> {
    let store = state.require_game_store().await?;
    let mut quests = store.list_quests().await?;
    quests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(quests.into_iter().map(Into::into).collect())
}

/// Fetch a single quest.
pub async fn get_quest(state: &SharedState, id: Uuid) -> Result<QuestResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let quest = store
        .find_quest(id)
        .await?
        .ok_or_else(|| quest_not_found(id))?;
    Ok(quest.into())
}

/// Create an open quest, optionally assigned to a player.
pub async fn create_quest(
    state: &SharedState,
    payload: CreateQuestRequest,
) -> Result<QuestResponse, ServiceError> {
    payload.validate()?;
    if let Some(player) = &payload.player {
        check_name(player)?;
    }
    let store = state.require_game_store().await?;

    let now = SystemTime::now();
    let quest = QuestEntity {
        id: Uuid::new_v4(),
        title: payload.title,
        description: payload.description,
        player: payload.player,
        status: QuestStatus::Open,
        created_at: now,
        updated_at: now,
        completed_at: None,
    };
    store.insert_quest(quest.clone()).await?;

    info!(quest = %quest.id, title = %quest.title, "quest created");
    let response: QuestResponse = quest.into();
    sse_events::broadcast_quest_created(state, &response);
    Ok(response)
}

/// Change a quest's status and/or text fields.
///
/// The transition check runs inside the store's atomic update, so it always
/// sees the status it replaces.
pub async fn update_quest(
    state: &SharedState,
    id: Uuid,
    payload: UpdateQuestRequest,
) -> Result<QuestResponse, ServiceError> {
    payload.validate()?;
    let store = state.require_game_store().await?;
    let updated = store
        .update_quest(
            id,
            Arc::new(move |current: QuestEntity| {
                apply_update(current, payload.clone(), SystemTime::now())
            }),
        )
        .await?
        .ok_or_else(|| quest_not_found(id))?;

    let response: QuestResponse = updated.into();
    sse_events::broadcast_quest_updated(state, &response);
    Ok(response)
}

/// Remove a quest.
pub async fn delete_quest(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    if !store.delete_quest(id).await? {
        return Err(quest_not_found(id));
    }
    info!(quest = %id, "quest deleted");
    sse_events::broadcast_quest_deleted(state, id);
    Ok(())
}

/// Apply a partial update, enforcing the status transition rules.
///
/// `Err` carries the reason reported to the client as a conflict.
fn apply_update(
    mut quest: QuestEntity,
    payload: UpdateQuestRequest,
    now: SystemTime,
) -> Result<QuestEntity, String> {
    if let Some(next) = payload.status.map(QuestStatus::from) {
        if !quest.status.can_transition_to(next) {
            return Err(format!(
                "quest cannot move from {:?} to {:?}",
                quest.status, next
            ));
        }
        if next == QuestStatus::Completed && quest.status != QuestStatus::Completed {
            quest.completed_at = Some(now);
        }
        quest.status = next;
    }

    let edits_text = payload.title.is_some() || payload.description.is_some();
    if edits_text && quest.status.is_terminal() {
        return Err("finished quests cannot be edited".into());
    }
    if let Some(title) = payload.title {
        quest.title = title;
    }
    if let Some(description) = payload.description {
        quest.description = Some(description);
    }

    quest.updated_at = now;
    Ok(quest)
}

fn quest_not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("quest `{id}` not found"))
}
