//! In-process store used for local runs and tests. Nothing survives a restart.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    game_store::{GameStore, PlayerUpdate, ProgressUpdate, QuestUpdate, sort_for_leaderboard},
    models::{EnemyEntity, GlobalProgressEntity, PlayerEntity, QuestEntity},
    storage::{StorageError, StorageResult},
};

/// [`GameStore`] kept entirely in memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    progress: Mutex<Option<GlobalProgressEntity>>,
    players: DashMap<String, PlayerEntity>,
    quests: DashMap<Uuid, QuestEntity>,
    enemies: DashMap<String, EnemyEntity>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn load_progress(&self) -> BoxFuture<'static, StorageResult<Option<GlobalProgressEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.progress.lock().await.clone()) })
    }

    fn save_progress(&self, progress: GlobalProgressEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.progress.lock().await.replace(progress);
            Ok(())
        })
    }

    fn update_progress(
        &self,
        seed: GlobalProgressEntity,
        update: ProgressUpdate,
    ) -> BoxFuture<'static, StorageResult<GlobalProgressEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.progress.lock().await;
            let current = guard.take().unwrap_or(seed);
            let next = update(current);
            guard.replace(next.clone());
            Ok(next)
        })
    }

    fn find_player(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.players.get(&name).map(|entry| entry.value().clone())) })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut players: Vec<PlayerEntity> =
                inner.players.iter().map(|entry| entry.value().clone()).collect();
            players.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(players)
        })
    }

    fn leaderboard(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut players: Vec<PlayerEntity> =
                inner.players.iter().map(|entry| entry.value().clone()).collect();
            sort_for_leaderboard(&mut players);
            players.truncate(limit);
            Ok(players)
        })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.players.entry(player.name.clone()) {
                Entry::Occupied(_) => Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(player);
                    Ok(true)
                }
            }
        })
    }

    fn update_player(
        &self,
        name: String,
        update: PlayerUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            // The shard write lock held by `get_mut` makes the update atomic.
            let Some(mut entry) = inner.players.get_mut(&name) else {
                return Ok(None);
            };
            let next = update(entry.value().clone());
            *entry = next.clone();
            Ok(Some(next))
        })
    }

    fn delete_player(&self, name: String) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.players.remove(&name).is_some()) })
    }

    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.quests.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_quests(&self) -> BoxFuture<'static, StorageResult<Vec<QuestEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.quests.iter().map(|entry| entry.value().clone()).collect()) })
    }

    fn insert_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.quests.insert(quest.id, quest);
            Ok(())
        })
    }

    fn update_quest(
        &self,
        id: Uuid,
        update: QuestUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some(mut entry) = inner.quests.get_mut(&id) else {
                return Ok(None);
            };
            let next = update(entry.value().clone()).map_err(|reason| StorageError::Rejected {
                id: id.to_string(),
                reason,
            })?;
            *entry = next.clone();
            Ok(Some(next))
        })
    }

    fn delete_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.quests.remove(&id).is_some()) })
    }

    fn find_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<Option<EnemyEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.enemies.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_enemies(&self) -> BoxFuture<'static, StorageResult<Vec<EnemyEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.enemies.iter().map(|entry| entry.value().clone()).collect()) })
    }

    fn save_enemy(&self, enemy: EnemyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.enemies.insert(enemy.id.clone(), enemy);
            Ok(())
        })
    }

    fn insert_enemies(&self, enemies: Vec<EnemyEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            for enemy in enemies {
                inner.enemies.insert(enemy.id.clone(), enemy);
            }
            Ok(())
        })
    }

    fn delete_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.enemies.remove(&id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn player(name: &str, level: u32, xp: u64) -> PlayerEntity {
        PlayerEntity {
            name: name.into(),
            level,
            xp,
            power: None,
            equipment: Vec::new(),
            inventory: Vec::new(),
            created_at: SystemTime::UNIX_EPOCH,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn update_player_returns_none_for_unknown_player() {
        let store = MemoryGameStore::new();
        let result = store
            .update_player("ghost".into(), Arc::new(|p: PlayerEntity| p))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_player_persists_the_new_value() {
        let store = MemoryGameStore::new();
        store.insert_player(player("ayla", 1, 10)).await.unwrap();

        let updated = store
            .update_player(
                "ayla".into(),
                Arc::new(|mut p: PlayerEntity| {
                    p.xp += 5;
                    p
                }),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.xp, 15);
        let stored = store.find_player("ayla".into()).await.unwrap().unwrap();
        assert_eq!(stored.xp, 15);
    }

    #[tokio::test]
    async fn insert_player_keeps_the_first_writer() {
        let store = MemoryGameStore::new();
        assert!(store.insert_player(player("ayla", 5, 500)).await.unwrap());
        assert!(!store.insert_player(player("ayla", 1, 0)).await.unwrap());

        let stored = store.find_player("ayla".into()).await.unwrap().unwrap();
        assert_eq!(stored.xp, 500);
    }

    #[tokio::test]
    async fn rejected_quest_update_leaves_the_quest_untouched() {
        use crate::dao::models::QuestStatus;

        let store = MemoryGameStore::new();
        let quest = QuestEntity {
            id: Uuid::new_v4(),
            title: "Slay".into(),
            description: None,
            player: None,
            status: QuestStatus::Open,
            created_at: SystemTime::UNIX_EPOCH,
            updated_at: SystemTime::UNIX_EPOCH,
            completed_at: None,
        };
        store.insert_quest(quest.clone()).await.unwrap();

        let err = store
            .update_quest(
                quest.id,
                Arc::new(|_: QuestEntity| Err("quest is finished".to_string())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));
        assert_eq!(store.find_quest(quest.id).await.unwrap(), Some(quest));

        let missing = store
            .update_quest(Uuid::new_v4(), Arc::new(|q: QuestEntity| Ok(q)))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn leaderboard_orders_by_level_then_xp() {
        let store = MemoryGameStore::new();
        store.insert_player(player("low", 1, 50)).await.unwrap();
        store.insert_player(player("high", 3, 210)).await.unwrap();
        store.insert_player(player("mid", 3, 200)).await.unwrap();

        let board = store.leaderboard(2).await.unwrap();
        let names: Vec<_> = board.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["high", "mid"]);
    }

    #[tokio::test]
    async fn update_progress_starts_from_seed() {
        let store = MemoryGameStore::new();
        let seed = GlobalProgressEntity {
            current: 0,
            goal: 10,
            stage: 1,
            updated_at: SystemTime::UNIX_EPOCH,
        };

        let next = store
            .update_progress(
                seed,
                Arc::new(|mut p: GlobalProgressEntity| {
                    p.current += 3;
                    p
                }),
            )
            .await
            .unwrap();

        assert_eq!(next.current, 3);
        assert_eq!(store.load_progress().await.unwrap(), Some(next));
    }
}
