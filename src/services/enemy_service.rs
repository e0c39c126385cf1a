use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::{
    dao::{game_store::GameStore, models::EnemyEntity, storage::StorageResult},
    dto::{
        enemy::{EnemyResponse, UpsertEnemyRequest},
        validation::validate_enemy_id,
    },
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Enemy catalog ordered from weakest to strongest.
pub async fn list_enemies(state: &SharedState) -> Result<Vec<EnemyResponse>, ServiceError> {
    let store = state.require_game_store().await?;
    let mut enemies = store.list_enemies().await?;
    enemies.sort_by(|a, b| a.power.cmp(&b.power).then_with(|| a.id.cmp(&b.id)));
    Ok(enemies.into_iter().map(Into::into).collect())
}

/// Fetch one enemy by slug.
pub async fn get_enemy(state: &SharedState, id: String) -> Result<EnemyResponse, ServiceError> {
    check_id(&id)?;
    let store = state.require_game_store().await?;
    let enemy = store
        .find_enemy(id.clone())
        .await?
        .ok_or_else(|| enemy_not_found(&id))?;
    Ok(enemy.into())
}

/// Create or replace an enemy definition.
pub async fn upsert_enemy(
    state: &SharedState,
    id: String,
    payload: UpsertEnemyRequest,
) -> Result<EnemyResponse, ServiceError> {
    check_id(&id)?;
    payload.validate()?;
    let store = state.require_game_store().await?;

    let enemy = EnemyEntity {
        id,
        name: payload.name,
        power: payload.power,
        hp: payload.hp,
        xp_reward: payload.xp_reward,
        loot: payload.loot.into_iter().map(Into::into).collect(),
    };
    store.save_enemy(enemy.clone()).await?;

    info!(enemy = %enemy.id, power = enemy.power, "enemy saved");
    let response: EnemyResponse = enemy.into();
    sse_events::broadcast_enemy_updated(state, &response);
    Ok(response)
}

/// Remove an enemy from the catalog.
pub async fn delete_enemy(state: &SharedState, id: String) -> Result<(), ServiceError> {
    check_id(&id)?;
    let store = state.require_game_store().await?;
    if !store.delete_enemy(id.clone()).await? {
        return Err(enemy_not_found(&id));
    }
    info!(enemy = %id, "enemy deleted");
    sse_events::broadcast_enemy_deleted(state, &id);
    Ok(())
}

/// Write the configured catalog when the store has no enemy yet.
///
/// Returns the number of inserted enemies.
pub async fn seed_catalog(
    store: &Arc<dyn GameStore>,
    enemies: &[EnemyEntity],
) -> StorageResult<usize> {
    if enemies.is_empty() || !store.list_enemies().await?.is_empty() {
        return Ok(0);
    }
    store.insert_enemies(enemies.to_vec()).await?;
    info!(count = enemies.len(), "seeded enemy catalog");
    Ok(enemies.len())
}

pub(crate) fn check_id(id: &str) -> Result<(), ServiceError> {
    validate_enemy_id(id).map_err(|err| ServiceError::InvalidInput(err.to_string()))
}

pub(crate) fn enemy_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("enemy `{id}` not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dao::game_store::memory::MemoryGameStore};

    #[tokio::test]
    async fn seeding_only_fills_an_empty_catalog() {
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        let enemies = AppConfig::default().enemies;

        assert_eq!(seed_catalog(&store, &enemies).await.unwrap(), enemies.len());
        assert_eq!(seed_catalog(&store, &enemies).await.unwrap(), 0);
        assert_eq!(store.list_enemies().await.unwrap().len(), enemies.len());
    }
}
