use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    game_store::{
        GameStore, MAX_UPDATE_ATTEMPTS, PlayerUpdate, ProgressUpdate, QuestUpdate,
        sort_for_leaderboard,
    },
    models::{EnemyEntity, GlobalProgressEntity, PlayerEntity, QuestEntity},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, BulkDocsRequest, CouchDocument, END_SUFFIX, ENEMY_PREFIX, PLAYER_PREFIX,
        QUEST_PREFIX, RevisionOnly, enemy_doc_id, player_doc_id, progress_doc_id, quest_doc_id,
    },
};

/// [`GameStore`] speaking the CouchDB HTTP API.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it in the meantime.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Write a document, returning `false` when CouchDB reports a revision conflict.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<bool>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let Some(current) = self.get_document::<RevisionOnly>(doc_id).await? else {
                return Ok(false);
            };

            let response = self
                .request(Method::DELETE, doc_id)
                .query(&[("rev", current.rev)])
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: doc_id.to_string(),
                    source,
                })?;

            match response.status() {
                StatusCode::NOT_FOUND => return Ok(false),
                StatusCode::CONFLICT => continue,
                status if status.is_success() => return Ok(true),
                other => {
                    return Err(CouchDaoError::RequestStatus {
                        path: doc_id.to_string(),
                        status: other,
                    });
                }
            }
        }

        Err(CouchDaoError::Contention {
            doc_id: doc_id.to_string(),
            attempts: MAX_UPDATE_ATTEMPTS,
        })
    }

    /// Optimistic read-modify-write relying on CouchDB `_rev` conflicts.
    ///
    /// Returns `None` when the document is absent and no `seed` was given.
    /// An `Err` from `update` aborts without writing.
    async fn read_modify_write<T, F>(
        &self,
        doc_id: &str,
        seed: Option<T>,
        update: F,
    ) -> CouchResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: Fn(T) -> Result<T, String>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let existing = self.get_document::<CouchDocument<T>>(doc_id).await?;
            let (rev, current) = match existing {
                Some(document) => (document.rev, document.body),
                None => match &seed {
                    Some(seed) => (None, seed.clone()),
                    None => return Ok(None),
                },
            };

            let next = update(current).map_err(|reason| CouchDaoError::Rejected {
                doc_id: doc_id.to_string(),
                reason,
            })?;
            let document = CouchDocument::new(doc_id, rev, next.clone());
            if self.put_document(doc_id, &document).await? {
                return Ok(Some(next));
            }

            debug!(doc_id, attempt, "CouchDB revision conflict; retrying");
        }

        Err(CouchDaoError::Contention {
            doc_id: doc_id.to_string(),
            attempts: MAX_UPDATE_ATTEMPTS,
        })
    }

    /// Overwrite a document regardless of its current revision.
    async fn upsert<T>(&self, doc_id: &str, value: T) -> CouchResult<()>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        self.read_modify_write(doc_id, Some(value.clone()), |_| Ok(value.clone()))
            .await
            .map(|_| ())
    }

    /// Create a document; `false` when one with the same id already exists.
    async fn insert<T>(&self, doc_id: &str, value: T) -> CouchResult<bool>
    where
        T: Serialize,
    {
        self.put_document(doc_id, &CouchDocument::new(doc_id, None, value))
            .await
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed = from_value::<CouchDocument<T>>(doc).map_err(|source| {
                    CouchDaoError::DeserializeValue {
                        path: ALL_DOCS.to_string(),
                        source,
                    }
                })?;
                documents.push(parsed.body);
            }
        }

        Ok(documents)
    }

    async fn bulk_insert<T>(&self, documents: Vec<CouchDocument<T>>) -> CouchResult<()>
    where
        T: Serialize,
    {
        const BULK_DOCS: &str = "_bulk_docs";
        let response = self
            .request(Method::POST, BULK_DOCS)
            .json(&BulkDocsRequest { docs: documents })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: BULK_DOCS.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: BULK_DOCS.to_string(),
                status: response.status(),
            })
        }
    }
}

impl GameStore for CouchGameStore {
    fn load_progress(&self) -> BoxFuture<'static, StorageResult<Option<GlobalProgressEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .get_document::<CouchDocument<GlobalProgressEntity>>(&progress_doc_id())
                .await?;
            Ok(document.map(|doc| doc.body))
        })
    }

    fn save_progress(&self, progress: GlobalProgressEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(&progress_doc_id(), progress)
                .await
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
            let doc_id = progress_doc_id();
            let updated = store
                .read_modify_write(&doc_id, Some(seed.clone()), |current| Ok(update(current)))
                .await?;
            // A seed is always provided, so the update cannot come back empty.
            Ok(updated.unwrap_or(seed))
        })
    }

    fn find_player(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .get_document::<CouchDocument<PlayerEntity>>(&player_doc_id(&name))
                .await?;
            Ok(document.map(|doc| doc.body))
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut players = store.list_documents::<PlayerEntity>(PLAYER_PREFIX).await?;
            players.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(players)
        })
    }

    fn leaderboard(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut players = store.list_documents::<PlayerEntity>(PLAYER_PREFIX).await?;
            sort_for_leaderboard(&mut players);
            players.truncate(limit);
            Ok(players)
        })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = player_doc_id(&player.name);
            store.insert(&doc_id, player).await.map_err(Into::into)
        })
    }

    fn update_player(
        &self,
        name: String,
        update: PlayerUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read_modify_write(&player_doc_id(&name), None, |current| Ok(update(current)))
                .await
                .map_err(Into::into)
        })
    }

    fn delete_player(&self, name: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&player_doc_id(&name))
                .await
                .map_err(Into::into)
        })
    }

    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .get_document::<CouchDocument<QuestEntity>>(&quest_doc_id(id))
                .await?;
            Ok(document.map(|doc| doc.body))
        })
    }

    fn list_quests(&self) -> BoxFuture<'static, StorageResult<Vec<QuestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_documents::<QuestEntity>(QUEST_PREFIX)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = quest_doc_id(quest.id);
            if store.insert(&doc_id, quest).await? {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: doc_id,
                    status: StatusCode::CONFLICT,
                }
                .into())
            }
        })
    }

    fn update_quest(
        &self,
        id: Uuid,
        update: QuestUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read_modify_write(&quest_doc_id(id), None, |current| update(current))
                .await
                .map_err(Into::into)
        })
    }

    fn delete_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&quest_doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn find_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<Option<EnemyEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .get_document::<CouchDocument<EnemyEntity>>(&enemy_doc_id(&id))
                .await?;
            Ok(document.map(|doc| doc.body))
        })
    }

    fn list_enemies(&self) -> BoxFuture<'static, StorageResult<Vec<EnemyEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_documents::<EnemyEntity>(ENEMY_PREFIX)
                .await
                .map_err(Into::into)
        })
    }

    fn save_enemy(&self, enemy: EnemyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = enemy_doc_id(&enemy.id);
            store.upsert(&doc_id, enemy).await.map_err(Into::into)
        })
    }

    fn insert_enemies(&self, enemies: Vec<EnemyEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if enemies.is_empty() {
                return Ok(());
            }
            let documents = enemies
                .into_iter()
                .map(|enemy| CouchDocument::new(enemy_doc_id(&enemy.id), None, enemy))
                .collect();
            store.bulk_insert(documents).await.map_err(Into::into)
        })
    }

    fn delete_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&enemy_doc_id(&id))
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
