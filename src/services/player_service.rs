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
    dao::{
        game_store::{MAX_UPDATE_ATTEMPTS, PlayerUpdate},
        models::PlayerEntity,
        storage::StorageError,
    },
    dto::{
        player::{
            GrantXpRequest, LeaderboardEntry, PlayerResponse, UpsertPlayerRequest, XpGrantResponse,
        },
        validation::validate_player_name,
    },
    error::ServiceError,
    services::{progression, sse_events},
    state::SharedState,
};

/// All players, sorted by name.
pub async fn list_players(state: &SharedState) -> Result<Vec<PlayerResponse>, ServiceError> {
    let store = state.require_game_store().await?;
    let mut players = store.list_players().await?;
    players.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(players
        .into_iter()
        .map(|player| PlayerResponse::from_entity(player, state.rules()))
        .collect())
}

/// Fetch a single player by name.
pub async fn get_player(state: &SharedState, name: String) -> Result<PlayerResponse, ServiceError> {
    check_name(&name)?;
    let store = state.require_game_store().await?;
    let player = store
        .find_player(name.clone())
        .await?
        .ok_or_else(|| player_not_found(&name))?;
    Ok(PlayerResponse::from_entity(player, state.rules()))
}

/// Create the player or merge the provided fields into the stored one.
///
/// Returns the player and whether it was created by this call.
pub async fn upsert_player(
    state: &SharedState,
    name: String,
    payload: UpsertPlayerRequest,
) -> Result<(PlayerResponse, bool), ServiceError> {
    check_name(&name)?;
    payload.validate()?;
    let store = state.require_game_store().await?;
    let rules = state.rules().clone();

    let existing = store.find_player(name.clone()).await?;
    if let (Some(current), Some(xp)) = (&existing, payload.xp) {
        if xp < current.xp {
            return Err(ServiceError::InvalidInput(format!(
                "experience cannot decrease (current {}, requested {xp})",
                current.xp
            )));
        }
    }

    let UpsertPlayerRequest {
        xp,
        power,
        equipment,
    } = payload;

    let merge_rules = rules.clone();
    let merge_equipment = equipment.clone();
    let merge: PlayerUpdate = Arc::new(move |mut player: PlayerEntity| {
        if let Some(xp) = xp {
            player.xp = player.xp.max(xp);
        }
        if power.is_some() {
            player.power = power;
        }
        if let Some(equipment) = &merge_equipment {
            player.equipment = equipment.clone();
        }
        player.level = progression::level_for_xp(player.xp, &merge_rules).max(player.level);
        player.updated_at = SystemTime::now();
        player
    });

    // A create that loses against a concurrent create falls back to merging
    // into the winner, and a merge that finds the player deleted retries the create.
    let mut try_insert = existing.is_none();
    let mut outcome = None;
    for _ in 0..MAX_UPDATE_ATTEMPTS {
        if try_insert {
            let now = SystemTime::now();
            let xp = xp.unwrap_or(0);
            let player = PlayerEntity {
                name: name.clone(),
                level: progression::level_for_xp(xp, &rules),
                xp,
                power,
                equipment: equipment.clone().unwrap_or_default(),
                inventory: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            if store.insert_player(player.clone()).await? {
                info!(player = %name, "player created");
                outcome = Some((player, true));
                break;
            }
        } else if let Some(player) = store.update_player(name.clone(), merge.clone()).await? {
            outcome = Some((player, false));
            break;
        }
        try_insert = !try_insert;
    }

    let Some((player, created)) = outcome else {
        return Err(StorageError::Contention {
            id: name,
            attempts: MAX_UPDATE_ATTEMPTS,
        }
        .into());
    };

    let response = PlayerResponse::from_entity(player, &rules);
    sse_events::broadcast_player_updated(state, &response);
    Ok((response, created))
}

/// Atomically add experience to an existing player.
pub async fn grant_xp(
    state: &SharedState,
    name: String,
    payload: GrantXpRequest,
) -> Result<XpGrantResponse, ServiceError> {
    check_name(&name)?;
    payload.validate()?;
    let store = state.require_game_store().await?;
    let rules = state.rules().clone();
    let amount = payload.amount;

    let previous = Arc::new(AtomicU32::new(0));
    let recorded = previous.clone();
    let update_rules = rules.clone();
    let player = store
        .update_player(
            name.clone(),
            Arc::new(move |player: PlayerEntity| {
                let grant = progression::grant_xp(player, amount, &update_rules, SystemTime::now());
                recorded.store(grant.previous_level, Ordering::Relaxed);
                grant.player
            }),
        )
        .await?
        .ok_or_else(|| player_not_found(&name))?;

    let previous_level = previous.load(Ordering::Relaxed);
    let leveled_up = player.level > previous_level;
    let level = player.level;
    let response = PlayerResponse::from_entity(player, &rules);

    sse_events::broadcast_player_updated(state, &response);
    if leveled_up {
        info!(player = %name, previous_level, level, "player leveled up");
        sse_events::broadcast_player_leveled_up(state, &name, previous_level, level);
    }

    Ok(XpGrantResponse {
        player: response,
        previous_level,
        leveled_up,
    })
}

/// Top players by level then experience.
pub async fn leaderboard(
    state: &SharedState,
    limit: Option<usize>,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let rules = state.rules();
    let limit = match limit {
        Some(0) => {
            return Err(ServiceError::InvalidInput(
                "limit must be at least 1".into(),
            ));
        }
        Some(limit) => limit.min(rules.max_leaderboard_limit),
        None => rules.leaderboard_limit,
    };

    let store = state.require_game_store().await?;
    let players = store.leaderboard(limit).await?;
    Ok(players
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, player)| LeaderboardEntry {
            rank: index + 1,
            name: player.name,
            level: player.level,
            xp: player.xp,
        })
        .collect())
}

/// Remove a player.
pub async fn delete_player(state: &SharedState, name: String) -> Result<(), ServiceError> {
    check_name(&name)?;
    let store = state.require_game_store().await?;
    if !store.delete_player(name.clone()).await? {
        return Err(player_not_found(&name));
    }
    info!(player = %name, "player deleted");
    sse_events::broadcast_player_deleted(state, &name);
    Ok(())
}

/// Reject names that cannot be used as player keys.
pub(crate) fn check_name(name: &str) -> Result<(), ServiceError> {
    validate_player_name(name).map_err(|err| ServiceError::InvalidInput(err.to_string()))
}

pub(crate) fn player_not_found(name: &str) -> ServiceError {
    ServiceError::NotFound(format!("player `{name}` not found"))
}
