/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::sync::Arc;

use crate::dao::models::{EnemyEntity, GlobalProgressEntity, PlayerEntity, QuestEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Attempts made by optimistic backends before giving up on a read-modify-write.
pub const MAX_UPDATE_ATTEMPTS: u32 = 8;

/// Pure transformation applied to the global progress document inside a read-modify-write.
pub type ProgressUpdate = Arc<dyn Fn(GlobalProgressEntity) -> GlobalProgressEntity + Send + Sync>;

/// Pure transformation applied to a player document inside a read-modify-write.
pub type PlayerUpdate = Arc<dyn Fn(PlayerEntity) -> PlayerEntity + Send + Sync>;

/// Guarded transformation of a quest; `Err(reason)` aborts the write with
/// [`StorageError::Rejected`](crate::dao::storage::StorageError::Rejected).
pub type QuestUpdate = Arc<dyn Fn(QuestEntity) -> Result<QuestEntity, String> + Send + Sync>;

/// Abstraction over the document database backing the game.
///
/// Every method returns a `'static` future so handles can be cloned out of
/// the shared state and awaited without holding any lock.
pub trait GameStore: Send + Sync {
    /// Stored progress document, `None` before the first write.
    fn load_progress(&self) -> BoxFuture<'static, StorageResult<Option<GlobalProgressEntity>>>;
    /// Replace the progress document.
    fn save_progress(&self, progress: GlobalProgressEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Atomically apply `update` to the progress document, starting from `seed` when absent.
    fn update_progress(
        &self,
        seed: GlobalProgressEntity,
        update: ProgressUpdate,
    ) -> BoxFuture<'static, StorageResult<GlobalProgressEntity>>;

    /// Player keyed by `name`.
    fn find_player(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Every player, in no particular order.
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Players ordered by level, then experience, both descending.
    fn leaderboard(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Create a player unless one with the same name exists; `false` when it already does.
    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Atomically apply `update` to an existing player; `None` when the player is unknown.
    fn update_player(
        &self,
        name: String,
        update: PlayerUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Remove a player; `false` when it did not exist.
    fn delete_player(&self, name: String) -> BoxFuture<'static, StorageResult<bool>>;

    /// Quest keyed by `id`.
    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>>;
    /// Every quest, in no particular order.
    fn list_quests(&self) -> BoxFuture<'static, StorageResult<Vec<QuestEntity>>>;
    /// Store a freshly created quest.
    fn insert_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Atomically apply `update` to an existing quest; `None` when the quest is unknown.
    fn update_quest(
        &self,
        id: Uuid,
        update: QuestUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>>;
    /// Remove a quest; `false` when it did not exist.
    fn delete_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    /// Enemy keyed by its slug.
    fn find_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<Option<EnemyEntity>>>;
    /// The whole catalog, in no particular order.
    fn list_enemies(&self) -> BoxFuture<'static, StorageResult<Vec<EnemyEntity>>>;
    /// Create or replace an enemy definition.
    fn save_enemy(&self, enemy: EnemyEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Insert a batch of enemies in a single write. Used to seed an empty catalog.
    fn insert_enemies(&self, enemies: Vec<EnemyEntity>) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove an enemy; `false` when it did not exist.
    fn delete_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;

    /// Cheap round-trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Sort players the way the leaderboard presents them.
pub fn sort_for_leaderboard(players: &mut [PlayerEntity]) {
    players.sort_by(|a, b| {
        b.level
            .cmp(&a.level)
            .then_with(|| b.xp.cmp(&a.xp))
            .then_with(|| a.name.cmp(&b.name))
    });
}
