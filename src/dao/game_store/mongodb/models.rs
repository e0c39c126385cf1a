use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    EnemyEntity, GLOBAL_PROGRESS_ID, GlobalProgressEntity, LootEntryEntity, PlayerEntity,
    QuestEntity, QuestStatus,
};

/// Documents guarded by an optimistic `revision` counter.
pub trait Revisioned {
    fn revision(&self) -> i64;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProgressDocument {
    #[serde(rename = "_id")]
    id: String,
    revision: i64,
    current: u64,
    goal: u64,
    stage: u32,
    updated_at: DateTime,
}

impl MongoProgressDocument {
    pub fn new(value: GlobalProgressEntity, revision: i64) -> Self {
        Self {
            id: GLOBAL_PROGRESS_ID.to_owned(),
            revision,
            current: value.current,
            goal: value.goal,
            stage: value.stage,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl Revisioned for MongoProgressDocument {
    fn revision(&self) -> i64 {
        self.revision
    }
}

impl From<MongoProgressDocument> for GlobalProgressEntity {
    fn from(value: MongoProgressDocument) -> Self {
        Self {
            current: value.current,
            goal: value.goal,
            stage: value.stage,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    name: String,
    revision: i64,
    level: u32,
    xp: u64,
    #[serde(default)]
    power: Option<u32>,
    #[serde(default)]
    equipment: Vec<String>,
    #[serde(default)]
    inventory: Vec<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl MongoPlayerDocument {
    pub fn new(value: PlayerEntity, revision: i64) -> Self {
        Self {
            name: value.name,
            revision,
            level: value.level,
            xp: value.xp,
            power: value.power,
            equipment: value.equipment,
            inventory: value.inventory,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl Revisioned for MongoPlayerDocument {
    fn revision(&self) -> i64 {
        self.revision
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            name: value.name,
            level: value.level,
            xp: value.xp,
            power: value.power,
            equipment: value.equipment,
            inventory: value.inventory,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestDocument {
    /// Hyphenated UUID string so filters stay independent of the UUID binary representation.
    #[serde(rename = "_id")]
    id: String,
    revision: i64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    player: Option<String>,
    status: QuestStatus,
    created_at: DateTime,
    updated_at: DateTime,
    #[serde(default)]
    completed_at: Option<DateTime>,
}

impl MongoQuestDocument {
    pub fn new(value: QuestEntity, revision: i64) -> Self {
        Self {
            id: value.id.to_string(),
            revision,
            title: value.title,
            description: value.description,
            player: value.player,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            completed_at: value.completed_at.map(DateTime::from_system_time),
        }
    }
}

impl Revisioned for MongoQuestDocument {
    fn revision(&self) -> i64 {
        self.revision
    }
}

impl TryFrom<MongoQuestDocument> for QuestEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoQuestDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&value.id)?,
            title: value.title,
            description: value.description,
            player: value.player,
            status: value.status,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            completed_at: value.completed_at.map(|at| at.to_system_time()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEnemyDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    power: u32,
    hp: u32,
    xp_reward: u64,
    #[serde(default)]
    loot: Vec<LootEntryEntity>,
}

impl From<EnemyEntity> for MongoEnemyDocument {
    fn from(value: EnemyEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            power: value.power,
            hp: value.hp,
            xp_reward: value.xp_reward,
            loot: value.loot,
        }
    }
}

impl From<MongoEnemyDocument> for EnemyEntity {
    fn from(value: MongoEnemyDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            power: value.power,
            hp: value.hp,
            xp_reward: value.xp_reward,
            loot: value.loot,
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

/// Filter matching a document only while it still carries `revision`.
pub fn doc_id_at_revision(id: &str, revision: i64) -> Document {
    doc! {"_id": id, "revision": revision}
}
