use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{QuestEntity, QuestStatus},
    dto::format_system_time,
};

/// Quest lifecycle as exposed over the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatusDto {
    /// Not started.
    Open,
    /// Being worked on.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Given up.
    Abandoned,
}

impl From<QuestStatus> for QuestStatusDto {
    fn from(value: QuestStatus) -> Self {
        match value {
            QuestStatus::Open => QuestStatusDto::Open,
            QuestStatus::InProgress => QuestStatusDto::InProgress,
            QuestStatus::Completed => QuestStatusDto::Completed,
            QuestStatus::Abandoned => QuestStatusDto::Abandoned,
        }
    }
}

impl From<QuestStatusDto> for QuestStatus {
    fn from(value: QuestStatusDto) -> Self {
        match value {
            QuestStatusDto::Open => QuestStatus::Open,
            QuestStatusDto::InProgress => QuestStatus::InProgress,
            QuestStatusDto::Completed => QuestStatus::Completed,
            QuestStatusDto::Abandoned => QuestStatus::Abandoned,
        }
    }
}

/// Quest as exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestResponse {
    /// Quest identifier.
    pub id: Uuid,
    /// Short title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Assigned player, if any.
    pub player: Option<String>,
    /// Current status.
    pub status: QuestStatusDto,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last change.
    pub updated_at: String,
    /// RFC 3339 completion timestamp, set once the quest is completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<QuestEntity> for QuestResponse {
    fn from(value: QuestEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            player: value.player,
            status: value.status.into(),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
            completed_at: value.completed_at.map(format_system_time),
        }
    }
}

/// Payload for `POST /quests`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateQuestRequest {
    /// Short title.
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    /// Optional longer description.
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Name of the player the quest is assigned to.
    #[serde(default)]
    pub player: Option<String>,
}

/// Payload for `PATCH /quests/{id}`; omitted fields are left untouched.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdateQuestRequest {
    /// Target status; must be a legal transition.
    #[serde(default)]
    pub status: Option<QuestStatusDto>,
    /// Replacement title.
    #[serde(default)]
    #[validate(length(min = 1, max = 120))]
    pub title: Option<String>,
    /// Replacement description.
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}
