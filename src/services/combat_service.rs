//! Fight resolution: win probability, loot rolls and the rewards of a victory.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::SystemTime,
};

use rand::Rng;
use tracing::info;

use crate::{
    config::GameRules,
    dao::models::{LootEntryEntity, PlayerEntity},
    dto::{
        combat::{AttackRequest, AttackResponse},
        global::GlobalProgressResponse,
        player::PlayerResponse,
    },
    error::ServiceError,
    services::{
        enemy_service, player_service, progress_service,
        progression::{self, effective_power},
        sse_events,
    },
    state::SharedState,
};

/// Probability that `player_power` beats `enemy_power`, clamped to the configured bounds.
pub fn win_chance(player_power: u32, enemy_power: u32, rules: &GameRules) -> f64 {
    let total = f64::from(player_power) + f64::from(enemy_power);
    let raw = if total == 0.0 {
        0.5
    } else {
        f64::from(player_power) / total
    };
    raw.clamp(rules.min_win_chance, rules.max_win_chance)
}

/// Roll a fight: victory when a uniform draw falls under `chance`.
pub fn roll_victory<R: Rng + ?Sized>(chance: f64, rng: &mut R) -> bool {
    rng.random::<f64>() < chance
}

/// Roll every loot entry independently and return the dropped items.
pub fn roll_loot<R: Rng + ?Sized>(loot: &[LootEntryEntity], rng: &mut R) -> Vec<String> {
    loot.iter()
        .filter(|entry| rng.random::<f64>() < entry.chance)
        .map(|entry| entry.item.clone())
        .collect()
}

/// Resolve a fight between a player and an enemy from the catalog.
pub async fn attack(
    state: &SharedState,
    payload: AttackRequest,
) -> Result<AttackResponse, ServiceError> {
    player_service::check_name(&payload.player)?;
    enemy_service::check_id(&payload.enemy_id)?;
    let store = state.require_game_store().await?;
    let rules = state.rules().clone();

    let player = store
        .find_player(payload.player.clone())
        .await?
        .ok_or_else(|| player_service::player_not_found(&payload.player))?;
    let enemy = store
        .find_enemy(payload.enemy_id.clone())
        .await?
        .ok_or_else(|| enemy_service::enemy_not_found(&payload.enemy_id))?;

    let player_power = effective_power(&player, &rules);
    let chance = win_chance(player_power, enemy.power, &rules);
    let (won, loot) = {
        let mut rng = rand::rng();
        if roll_victory(chance, &mut rng) {
            (true, roll_loot(&enemy.loot, &mut rng))
        } else {
            (false, Vec::new())
        }
    };

    let mut previous_level = player.level;
    let mut global = None;
    let player = if won {
        let xp_reward = enemy.xp_reward;
        let drops = loot.clone();
        let previous = Arc::new(AtomicU32::new(player.level));
        let recorded = previous.clone();
        let update_rules = rules.clone();
        let updated = store
            .update_player(
                player.name.clone(),
                Arc::new(move |player: PlayerEntity| {
                    let grant =
                        progression::grant_xp(player, xp_reward, &update_rules, SystemTime::now());
                    recorded.store(grant.previous_level, Ordering::Relaxed);
                    let mut player = grant.player;
                    player.inventory.extend(drops.iter().cloned());
                    player
                }),
            )
            .await?
            .ok_or_else(|| player_service::player_not_found(&payload.player))?;
        previous_level = previous.load(Ordering::Relaxed);

        if rules.victory_progress > 0 {
            let (progress, stages_completed) =
                progress_service::add_progress(state, &store, rules.victory_progress).await?;
            let progress: GlobalProgressResponse = progress.into();
            sse_events::broadcast_progress_updated(state, progress.clone(), stages_completed);
            global = Some(progress);
        }
        updated
    } else {
        player
    };

    let leveled_up = player.level > previous_level;
    let xp_gained = if won { enemy.xp_reward } else { 0 };
    info!(
        player = %player.name,
        enemy = %enemy.id,
        won,
        win_chance = chance,
        drops = loot.len(),
        "combat resolved"
    );

    let level = player.level;
    let response = PlayerResponse::from_entity(player, &rules);
    sse_events::broadcast_combat_resolved(state, response.clone(), &enemy.id, won, loot.clone());
    if won {
        sse_events::broadcast_player_updated(state, &response);
    }
    if leveled_up {
        sse_events::broadcast_player_leveled_up(state, &response.name, previous_level, level);
    }

    Ok(AttackResponse {
        won,
        win_chance: chance,
        player_power,
        enemy_power: enemy.power,
        xp_gained,
        previous_level,
        leveled_up,
        loot,
        player: response,
        global,
    })
}
