use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::SystemTime,
};

use tracing::info;
use validator::Validate;

use crate::{
    dao::{game_store::GameStore, models::GlobalProgressEntity},
    dto::global::{ContributeRequest, ContributeResponse, GlobalProgressResponse, SetProgressRequest},
    error::ServiceError,
    services::{progression, sse_events},
    state::SharedState,
};

/// Current shared progress, or the configured starting point when nothing was stored yet.
pub async fn get_progress(state: &SharedState) -> Result<GlobalProgressResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let progress = store
        .load_progress()
        .await?
        .unwrap_or_else(|| progression::initial_progress(state.rules(), SystemTime::now()));
    Ok(progress.into())
}

/// Add a contribution to the shared counter.
pub async fn contribute(
    state: &SharedState,
    payload: ContributeRequest,
) -> Result<ContributeResponse, ServiceError> {
    payload.validate()?;
    let store = state.require_game_store().await?;
    let (progress, stages_completed) = add_progress(state, &store, payload.amount).await?;

    if stages_completed > 0 {
        info!(
            stage = progress.stage,
            stages_completed, "global progress reached a new stage"
        );
    }

    let progress: GlobalProgressResponse = progress.into();
    sse_events::broadcast_progress_updated(state, progress.clone(), stages_completed);
    Ok(ContributeResponse {
        progress,
        stages_completed,
    })
}

/// Overwrite the shared counter.
pub async fn set_progress(
    state: &SharedState,
    payload: SetProgressRequest,
) -> Result<GlobalProgressResponse, ServiceError> {
    payload.validate()?;
    let store = state.require_game_store().await?;

    let progress = GlobalProgressEntity {
        current: payload.current,
        goal: payload.goal,
        stage: payload.stage,
        updated_at: SystemTime::now(),
    };
    // Normalise an overwrite that already exceeds its goal.
    let (progress, stages_completed) =
        progression::advance_progress(progress, 0, state.rules(), SystemTime::now());
    store.save_progress(progress.clone()).await?;

    info!(
        current = progress.current,
        goal = progress.goal,
        stage = progress.stage,
        "global progress overwritten"
    );
    let progress: GlobalProgressResponse = progress.into();
    sse_events::broadcast_progress_updated(state, progress.clone(), stages_completed);
    Ok(progress)
}

/// Atomically add `amount` to the stored counter.
///
/// Shared with combat so victories go through the same read-modify-write.
pub(crate) async fn add_progress(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    amount: u64,
) -> Result<(GlobalProgressEntity, u32), ServiceError> {
    let rules = state.rules().clone();
    let seed = progression::initial_progress(&rules, SystemTime::now());
    // The update may run several times under contention; the last run is the committed one.
    let completed = Arc::new(AtomicU32::new(0));

    let recorded = completed.clone();
    let progress = store
        .update_progress(
            seed,
            Arc::new(move |current: GlobalProgressEntity| {
                let (next, stages) =
                    progression::advance_progress(current, amount, &rules, SystemTime::now());
                recorded.store(stages, Ordering::Relaxed);
                next
            }),
        )
        .await?;

    Ok((progress, completed.load(Ordering::Relaxed)))
}
