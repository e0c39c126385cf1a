use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dao::models::GlobalProgressEntity, dto::format_system_time};

/// Public view of the shared progress counter.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GlobalProgressResponse {
    /// Progress accumulated toward the current goal.
    pub current: u64,
    /// Amount that completes the current stage.
    pub goal: u64,
    /// Stage number, starting at 1.
    pub stage: u32,
    /// Completion of the current stage, between 0 and 100.
    pub percent: f64,
    /// RFC 3339 timestamp of the last change.
    pub updated_at: String,
}

impl From<GlobalProgressEntity> for GlobalProgressResponse {
    fn from(value: GlobalProgressEntity) -> Self {
        let percent = if value.goal == 0 {
            0.0
        } else {
            (value.current as f64 / value.goal as f64 * 100.0).min(100.0)
        };
        Self {
            current: value.current,
            goal: value.goal,
            stage: value.stage,
            percent,
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Increment applied to the shared counter, at most one million per request.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ContributeRequest {
    /// Amount added to the counter.
    #[validate(range(min = 1, max = 1_000_000))]
    pub amount: u64,
}

/// Result of a contribution, including how many stages it completed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContributeResponse {
    /// Counter after the contribution.
    pub progress: GlobalProgressResponse,
    /// Stages rolled over by this contribution.
    pub stages_completed: u32,
}

/// Admin overwrite of the shared counter. Counters are capped at `i64::MAX`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetProgressRequest {
    /// New progress value; a value reaching `goal` rolls stages over.
    #[validate(range(max = 9_223_372_036_854_775_807_u64))]
    pub current: u64,
    /// New goal for the stage.
    #[validate(range(min = 1, max = 9_223_372_036_854_775_807_u64))]
    pub goal: u64,
    /// New stage number.
    #[validate(range(min = 1))]
    pub stage: u32,
}
