use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoEnemyDocument, MongoPlayerDocument, MongoProgressDocument, MongoQuestDocument,
        Revisioned, doc_id, doc_id_at_revision,
    },
};
use crate::dao::{
    game_store::{GameStore, MAX_UPDATE_ATTEMPTS, PlayerUpdate, ProgressUpdate, QuestUpdate},
    models::{EnemyEntity, GLOBAL_PROGRESS_ID, GlobalProgressEntity, PlayerEntity, QuestEntity},
    storage::StorageResult,
};

const PROGRESS_COLLECTION_NAME: &str = "progress";
const PLAYER_COLLECTION_NAME: &str = "players";
const QUEST_COLLECTION_NAME: &str = "quests";
const ENEMY_COLLECTION_NAME: &str = "enemies";

/// Server error code reported when an insert collides with an existing `_id`.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// [`GameStore`] backed by a MongoDB database. Clones share the connection.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let players = database.collection::<mongodb::bson::Document>(PLAYER_COLLECTION_NAME);
        let leaderboard_index = mongodb::IndexModel::builder()
            .keys(doc! {"level": -1, "xp": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_leaderboard_idx".to_owned()))
                    .build(),
            )
            .build();

        players
            .create_index(leaderboard_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "level,xp",
                source,
            })?;

        let quests = database.collection::<mongodb::bson::Document>(QUEST_COLLECTION_NAME);
        let status_index = mongodb::IndexModel::builder()
            .keys(doc! {"status": 1, "created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("quest_status_idx".to_owned()))
                    .build(),
            )
            .build();

        quests
            .create_index(status_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUEST_COLLECTION_NAME,
                index: "status,created_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn progress_collection(&self) -> Collection<MongoProgressDocument> {
        self.database()
            .await
            .collection::<MongoProgressDocument>(PROGRESS_COLLECTION_NAME)
    }

    async fn player_collection(&self) -> Collection<MongoPlayerDocument> {
        self.database()
            .await
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
    }

    async fn quest_collection(&self) -> Collection<MongoQuestDocument> {
        self.database()
            .await
            .collection::<MongoQuestDocument>(QUEST_COLLECTION_NAME)
    }

    async fn enemy_collection(&self) -> Collection<MongoEnemyDocument> {
        self.database()
            .await
            .collection::<MongoEnemyDocument>(ENEMY_COLLECTION_NAME)
    }

    async fn load_progress(&self) -> MongoResult<Option<GlobalProgressEntity>> {
        let collection = self.progress_collection().await;
        let document = collection
            .find_one(doc_id(GLOBAL_PROGRESS_ID))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: PROGRESS_COLLECTION_NAME,
                id: GLOBAL_PROGRESS_ID.to_owned(),
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn update_progress<F>(
        &self,
        seed: GlobalProgressEntity,
        update: F,
    ) -> MongoResult<GlobalProgressEntity>
    where
        F: Fn(GlobalProgressEntity) -> GlobalProgressEntity,
    {
        let collection = self.progress_collection().await;
        let updated = read_modify_write(
            &collection,
            PROGRESS_COLLECTION_NAME,
            GLOBAL_PROGRESS_ID,
            Some(seed),
            |current| Ok(update(current)),
            MongoProgressDocument::new,
        )
        .await?;

        updated.ok_or_else(|| MongoDaoError::CorruptDocument {
            collection: PROGRESS_COLLECTION_NAME,
            id: GLOBAL_PROGRESS_ID.to_owned(),
        })
    }

    async fn find_player(&self, name: &str) -> MongoResult<Option<PlayerEntity>> {
        let collection = self.player_collection().await;
        let document =
            collection
                .find_one(doc_id(name))
                .await
                .map_err(|source| MongoDaoError::Load {
                    collection: PLAYER_COLLECTION_NAME,
                    id: name.to_owned(),
                    source,
                })?;
        Ok(document.map(Into::into))
    }

    async fn list_players(&self) -> MongoResult<Vec<PlayerEntity>> {
        let collection = self.player_collection().await;
        let documents: Vec<MongoPlayerDocument> = collection
            .find(doc! {})
            .sort(doc! {"_id": 1})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: PLAYER_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: PLAYER_COLLECTION_NAME,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn leaderboard(&self, limit: usize) -> MongoResult<Vec<PlayerEntity>> {
        let collection = self.player_collection().await;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let documents: Vec<MongoPlayerDocument> = collection
            .find(doc! {})
            .sort(doc! {"level": -1, "xp": -1, "_id": 1})
            .limit(limit)
            .await
            .map_err(|source| MongoDaoError::List {
                collection: PLAYER_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: PLAYER_COLLECTION_NAME,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn update_player<F>(&self, name: &str, update: F) -> MongoResult<Option<PlayerEntity>>
    where
        F: Fn(PlayerEntity) -> PlayerEntity,
    {
        let collection = self.player_collection().await;
        read_modify_write(
            &collection,
            PLAYER_COLLECTION_NAME,
            name,
            None,
            |current| Ok(update(current)),
            MongoPlayerDocument::new,
        )
        .await
    }

    async fn insert_player(&self, player: PlayerEntity) -> MongoResult<bool> {
        let collection = self.player_collection().await;
        let name = player.name.clone();
        match collection
            .insert_one(MongoPlayerDocument::new(player, 1))
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::Save {
                collection: PLAYER_COLLECTION_NAME,
                id: name,
                source,
            }),
        }
    }

    async fn delete_player(&self, name: &str) -> MongoResult<bool> {
        let collection = self.player_collection().await;
        let result = collection
            .delete_one(doc_id(name))
            .await
            .map_err(|source| MongoDaoError::Delete {
                collection: PLAYER_COLLECTION_NAME,
                id: name.to_owned(),
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn find_quest(&self, id: Uuid) -> MongoResult<Option<QuestEntity>> {
        let collection = self.quest_collection().await;
        let key = id.to_string();
        let document = collection
            .find_one(doc_id(&key))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: QUEST_COLLECTION_NAME,
                id: key.clone(),
                source,
            })?;

        document
            .map(|document| {
                document
                    .try_into()
                    .map_err(|_| MongoDaoError::CorruptDocument {
                        collection: QUEST_COLLECTION_NAME,
                        id: key.clone(),
                    })
            })
            .transpose()
    }

    async fn list_quests(&self) -> MongoResult<Vec<QuestEntity>> {
        let collection = self.quest_collection().await;
        let documents: Vec<MongoQuestDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: QUEST_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: QUEST_COLLECTION_NAME,
                source,
            })?;

        Ok(documents
            .into_iter()
            .filter_map(|document| match QuestEntity::try_from(document) {
                Ok(quest) => Some(quest),
                Err(err) => {
                    warn!(error = %err, "skipping quest document with malformed id");
                    None
                }
            })
            .collect())
    }

    async fn insert_quest(&self, quest: QuestEntity) -> MongoResult<()> {
        let collection = self.quest_collection().await;
        let key = quest.id.to_string();
        collection
            .insert_one(MongoQuestDocument::new(quest, 1))
            .await
            .map_err(|source| MongoDaoError::Save {
                collection: QUEST_COLLECTION_NAME,
                id: key,
                source,
            })?;
        Ok(())
    }

    async fn update_quest<F>(&self, id: Uuid, update: F) -> MongoResult<Option<QuestEntity>>
    where
        F: Fn(QuestEntity) -> Result<QuestEntity, String>,
    {
        let collection = self.quest_collection().await;
        read_modify_write(
            &collection,
            QUEST_COLLECTION_NAME,
            &id.to_string(),
            None,
            update,
            MongoQuestDocument::new,
        )
        .await
    }

    async fn delete_quest(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.quest_collection().await;
        let key = id.to_string();
        let result = collection
            .delete_one(doc_id(&key))
            .await
            .map_err(|source| MongoDaoError::Delete {
                collection: QUEST_COLLECTION_NAME,
                id: key,
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn find_enemy(&self, id: &str) -> MongoResult<Option<EnemyEntity>> {
        let collection = self.enemy_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: ENEMY_COLLECTION_NAME,
                id: id.to_owned(),
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_enemies(&self) -> MongoResult<Vec<EnemyEntity>> {
        let collection = self.enemy_collection().await;
        let documents: Vec<MongoEnemyDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: ENEMY_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: ENEMY_COLLECTION_NAME,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_enemy(&self, enemy: EnemyEntity) -> MongoResult<()> {
        let collection = self.enemy_collection().await;
        let id = enemy.id.clone();
        let document: MongoEnemyDocument = enemy.into();
        collection
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection: ENEMY_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn insert_enemies(&self, enemies: Vec<EnemyEntity>) -> MongoResult<()> {
        if enemies.is_empty() {
            return Ok(());
        }

        let collection = self.enemy_collection().await;
        let documents: Vec<MongoEnemyDocument> = enemies.into_iter().map(Into::into).collect();
        collection
            .insert_many(&documents)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection: ENEMY_COLLECTION_NAME,
                id: format!("{} enemies", documents.len()),
                source,
            })?;
        Ok(())
    }

    async fn delete_enemy(&self, id: &str) -> MongoResult<bool> {
        let collection = self.enemy_collection().await;
        let result = collection
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Delete {
                collection: ENEMY_COLLECTION_NAME,
                id: id.to_owned(),
                source,
            })?;
        Ok(result.deleted_count > 0)
    }
}

/// Optimistic read-modify-write on a single revisioned document.
///
/// The document is re-read and the update re-applied whenever another writer
/// bumped the revision in between. Returns `None` when the document does not
/// exist and no `seed` was provided. An `Err` from `update` aborts without
/// writing.
async fn read_modify_write<D, E, F>(
    collection: &Collection<D>,
    collection_name: &'static str,
    id: &str,
    seed: Option<E>,
    update: F,
    build: fn(E, i64) -> D,
) -> MongoResult<Option<E>>
where
    D: Serialize + DeserializeOwned + Revisioned + TryInto<E> + Send + Sync,
    E: Clone,
    F: Fn(E) -> Result<E, String>,
{
    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let existing = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: collection_name,
                id: id.to_owned(),
                source,
            })?;

        let (expected, current) = match existing {
            Some(document) => {
                let revision = document.revision();
                let current = <D as TryInto<E>>::try_into(document).map_err(|_| {
                    MongoDaoError::CorruptDocument {
                        collection: collection_name,
                        id: id.to_owned(),
                    }
                })?;
                (Some(revision), current)
            }
            None => match &seed {
                Some(seed) => (None, seed.clone()),
                None => return Ok(None),
            },
        };

        let next = update(current).map_err(|reason| MongoDaoError::Rejected {
            collection: collection_name,
            id: id.to_owned(),
            reason,
        })?;
        let document = build(next.clone(), expected.unwrap_or(0) + 1);

        let written = match expected {
            None => match collection.insert_one(&document).await {
                Ok(_) => true,
                Err(err) if is_duplicate_key(&err) => false,
                Err(source) => {
                    return Err(MongoDaoError::Save {
                        collection: collection_name,
                        id: id.to_owned(),
                        source,
                    });
                }
            },
            Some(revision) => {
                collection
                    .replace_one(doc_id_at_revision(id, revision), &document)
                    .await
                    .map_err(|source| MongoDaoError::Save {
                        collection: collection_name,
                        id: id.to_owned(),
                        source,
                    })?
                    .matched_count
                    == 1
            }
        };

        if written {
            return Ok(Some(next));
        }

        debug!(
            collection = collection_name,
            id, attempt, "concurrent write detected; retrying"
        );
    }

    Err(MongoDaoError::Contention {
        collection: collection_name,
        id: id.to_owned(),
        attempts: MAX_UPDATE_ATTEMPTS,
    })
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

impl GameStore for MongoGameStore {
    fn load_progress(&self) -> BoxFuture<'static, StorageResult<Option<GlobalProgressEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_progress().await.map_err(Into::into) })
    }

    fn save_progress(&self, progress: GlobalProgressEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_progress(progress.clone(), |_| progress.clone())
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
    }

    fn update_progress(
        &self,
        seed: GlobalProgressEntity,
        update: ProgressUpdate,
    ) -> BoxFuture<'static, StorageResult<GlobalProgressEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_progress(seed, |current| update(current))
                .await
                .map_err(Into::into)
        })
    }

    fn find_player(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(&name).await.map_err(Into::into) })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_players().await.map_err(Into::into) })
    }

    fn leaderboard(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.leaderboard(limit).await.map_err(Into::into) })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_player(player).await.map_err(Into::into) })
    }

    fn update_player(
        &self,
        name: String,
        update: PlayerUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_player(&name, |current| update(current))
                .await
                .map_err(Into::into)
        })
    }

    fn delete_player(&self, name: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_player(&name).await.map_err(Into::into) })
    }

    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_quest(id).await.map_err(Into::into) })
    }

    fn list_quests(&self) -> BoxFuture<'static, StorageResult<Vec<QuestEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_quests().await.map_err(Into::into) })
    }

    fn insert_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_quest(quest).await.map_err(Into::into) })
    }

    fn update_quest(
        &self,
        id: Uuid,
        update: QuestUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_quest(id, |current| update(current))
                .await
                .map_err(Into::into)
        })
    }

    fn delete_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_quest(id).await.map_err(Into::into) })
    }

    fn find_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<Option<EnemyEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_enemy(&id).await.map_err(Into::into) })
    }

    fn list_enemies(&self) -> BoxFuture<'static, StorageResult<Vec<EnemyEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_enemies().await.map_err(Into::into) })
    }

    fn save_enemy(&self, enemy: EnemyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_enemy(enemy).await.map_err(Into::into) })
    }

    fn insert_enemies(&self, enemies: Vec<EnemyEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_enemies(enemies).await.map_err(Into::into) })
    }

    fn delete_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_enemy(&id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
