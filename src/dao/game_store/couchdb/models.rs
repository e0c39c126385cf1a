use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::GLOBAL_PROGRESS_ID;

pub const PROGRESS_PREFIX: &str = "progress::";
pub const PLAYER_PREFIX: &str = "player::";
pub const QUEST_PREFIX: &str = "quest::";
pub const ENEMY_PREFIX: &str = "enemy::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[allow(dead_code)]
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Entity body wrapped with the CouchDB bookkeeping fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> CouchDocument<T> {
    pub fn new(id: impl Into<String>, rev: Option<String>, body: T) -> Self {
        Self {
            id: id.into(),
            rev,
            body,
        }
    }
}

/// Request body for `_bulk_docs`.
#[derive(Debug, Serialize)]
pub struct BulkDocsRequest<T> {
    pub docs: Vec<CouchDocument<T>>,
}

/// Minimal projection used to learn a document revision before deleting it.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

pub fn progress_doc_id() -> String {
    format!("{PROGRESS_PREFIX}{GLOBAL_PROGRESS_ID}")
}

pub fn player_doc_id(name: &str) -> String {
    format!("{PLAYER_PREFIX}{name}")
}

pub fn quest_doc_id(id: Uuid) -> String {
    format!("{QUEST_PREFIX}{id}")
}

pub fn enemy_doc_id(id: &str) -> String {
    format!("{ENEMY_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::GlobalProgressEntity;

    #[test]
    fn document_flattens_body_next_to_bookkeeping_fields() {
        let document = CouchDocument::new(
            progress_doc_id(),
            None,
            GlobalProgressEntity {
                current: 4,
                goal: 10,
                stage: 2,
                updated_at: SystemTime::UNIX_EPOCH,
            },
        );

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["_id"], "progress::global");
        assert!(value.get("_rev").is_none());
        assert_eq!(value["current"], 4);
        assert_eq!(value["stage"], 2);
    }

    #[test]
    fn document_reads_revision_back() {
        let raw = serde_json::json!({
            "_id": "progress::global",
            "_rev": "3-abc",
            "current": 1,
            "goal": 5,
            "stage": 1,
            "updated_at": {"secs_since_epoch": 0, "nanos_since_epoch": 0}
        });

        let document: CouchDocument<GlobalProgressEntity> = serde_json::from_value(raw).unwrap();
        assert_eq!(document.rev.as_deref(), Some("3-abc"));
        assert_eq!(document.body.goal, 5);
    }
}
