//! Pure leveling and global progress arithmetic shared by the services.

use std::time::SystemTime;

use crate::{
    config::GameRules,
    dao::models::{GlobalProgressEntity, PlayerEntity},
};

/// Largest counter value any backend can persist (BSON integers are signed 64-bit).
pub const MAX_COUNTER: u64 = i64::MAX as u64;

/// Level reached with `xp` accumulated experience.
pub fn level_for_xp(xp: u64, rules: &GameRules) -> u32 {
    let per_level = rules.xp_per_level.max(1);
    let level = 1u64.saturating_add(xp / per_level);
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Experience still needed before the next level.
pub fn xp_to_next_level(xp: u64, rules: &GameRules) -> u64 {
    let per_level = rules.xp_per_level.max(1);
    per_level - xp % per_level
}

/// Power used in combat: the override or the level-derived value, plus equipment.
pub fn effective_power(player: &PlayerEntity, rules: &GameRules) -> u32 {
    let base = player.power.unwrap_or_else(|| {
        rules
            .base_power
            .saturating_add(player.level.saturating_mul(rules.power_per_level))
    });
    let equipment = u32::try_from(player.equipment.len())
        .unwrap_or(u32::MAX)
        .saturating_mul(rules.equipment_power_bonus);
    base.saturating_add(equipment)
}

/// Result of [`grant_xp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpGrant {
    /// Player with the experience applied.
    pub player: PlayerEntity,
    /// Level held before the grant.
    pub previous_level: u32,
}

impl XpGrant {
    /// Whether the grant crossed at least one level boundary.
    pub fn leveled_up(&self) -> bool {
        self.player.level > self.previous_level
    }
}

/// Add experience to `player` and recompute its level. Experience saturates at [`MAX_COUNTER`].
pub fn grant_xp(mut player: PlayerEntity, amount: u64, rules: &GameRules, now: SystemTime) -> XpGrant {
    let previous_level = player.level;
    player.xp = player.xp.saturating_add(amount).min(MAX_COUNTER);
    player.level = level_for_xp(player.xp, rules).max(previous_level);
    player.updated_at = now;
    XpGrant {
        player,
        previous_level,
    }
}

/// Progress document used when the store holds none yet.
pub fn initial_progress(rules: &GameRules, now: SystemTime) -> GlobalProgressEntity {
    GlobalProgressEntity {
        current: 0,
        goal: rules.initial_goal.clamp(1, MAX_COUNTER),
        stage: 1,
        updated_at: now,
    }
}

/// Add `amount` to the counter, rolling over completed stages.
///
/// Returns the new document and how many stages were completed. The counter
/// and the goal saturate at [`MAX_COUNTER`].
pub fn advance_progress(
    mut progress: GlobalProgressEntity,
    amount: u64,
    rules: &GameRules,
    now: SystemTime,
) -> (GlobalProgressEntity, u32) {
    let mut completed = 0u32;
    progress.goal = progress.goal.clamp(1, MAX_COUNTER);
    progress.current = progress.current.saturating_add(amount).min(MAX_COUNTER);

    while progress.current >= progress.goal {
        let run = linear_run(progress.goal, rules.goal_growth);
        if run > 1 {
            // Goals only grow by one here, so whole runs of stages are skipped at once.
            let stages = linear_stages(progress.current, progress.goal, run);
            progress.current -= consumed_by(stages, progress.goal);
            progress.goal += stages;
            let stages = u32::try_from(stages).unwrap_or(u32::MAX);
            progress.stage = progress.stage.saturating_add(stages);
            completed = completed.saturating_add(stages);
            continue;
        }

        progress.current -= progress.goal;
        progress.stage = progress.stage.saturating_add(1);
        progress.goal = next_goal(progress.goal, rules.goal_growth);
        completed = completed.saturating_add(1);
    }

    progress.updated_at = now;
    (progress, completed)
}

fn next_goal(goal: u64, growth: f64) -> u64 {
    let scaled = (goal as f64 * growth).ceil();
    let scaled = if scaled.is_finite() && scaled < MAX_COUNTER as f64 {
        scaled as u64
    } else {
        MAX_COUNTER
    };
    scaled.max(goal.saturating_add(1)).min(MAX_COUNTER)
}

/// How many consecutive goals, starting with `goal`, are followed by `goal + 1`.
fn linear_run(goal: u64, growth: f64) -> u64 {
    if goal >= MAX_COUNTER || next_goal(goal, growth) != goal + 1 {
        return 0;
    }

    // ceil(g * growth) <= g + 1 holds exactly while g * (growth - 1) <= 1.
    let excess = growth - 1.0;
    let estimate = if excess <= 0.0 {
        MAX_COUNTER
    } else {
        let limit = (1.0 / excess).floor();
        if limit >= MAX_COUNTER as f64 {
            MAX_COUNTER
        } else {
            limit as u64
        }
    };

    let mut last = estimate.clamp(goal, MAX_COUNTER - 1);
    // Float rounding can overshoot by a few goals.
    while last > goal && next_goal(last, growth) != last + 1 {
        last -= 1;
    }
    last - goal + 1
}

/// Counter consumed by `stages` goals of `goal`, `goal + 1`, ...
fn consumed_by(stages: u64, goal: u64) -> u64 {
    let stages = u128::from(stages);
    let total = stages * u128::from(goal) + stages * stages.saturating_sub(1) / 2;
    u64::try_from(total).unwrap_or(u64::MAX)
}

/// Largest number of stages, at most `run`, that `current` can pay for.
fn linear_stages(current: u64, goal: u64, run: u64) -> u64 {
    let (mut low, mut high) = (0u64, run.min(current / goal));
    while low < high {
        let mid = low + (high - low).div_ceil(2);
        if consumed_by(mid, goal) <= current {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(level: u32, xp: u64) -> PlayerEntity {
        PlayerEntity {
            name: "ayla".into(),
            level,
            xp,
            power: None,
            equipment: Vec::new(),
            inventory: Vec::new(),
            created_at: SystemTime::UNIX_EPOCH,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn level_is_one_plus_integer_division() {
        let rules = GameRules::default();
        assert_eq!(level_for_xp(0, &rules), 1);
        assert_eq!(level_for_xp(99, &rules), 1);
        assert_eq!(level_for_xp(100, &rules), 2);
        assert_eq!(level_for_xp(1_050, &rules), 11);
        assert_eq!(level_for_xp(u64::MAX, &rules), u32::MAX);
    }

    #[test]
    fn level_never_decreases_as_xp_grows() {
        let rules = GameRules::default();
        let mut last = 0;
        for xp in (0..5_000).step_by(7) {
            let level = level_for_xp(xp, &rules);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn xp_to_next_level_counts_down() {
        let rules = GameRules::default();
        assert_eq!(xp_to_next_level(0, &rules), 100);
        assert_eq!(xp_to_next_level(99, &rules), 1);
        assert_eq!(xp_to_next_level(100, &rules), 100);
    }

    #[test]
    fn grant_reports_level_up() {
        let rules = GameRules::default();
        let grant = grant_xp(player(1, 90), 25, &rules, SystemTime::now());
        assert_eq!(grant.player.xp, 115);
        assert_eq!(grant.player.level, 2);
        assert_eq!(grant.previous_level, 1);
        assert!(grant.leveled_up());

        let grant = grant_xp(grant.player, 1, &rules, SystemTime::now());
        assert!(!grant.leveled_up());
    }

    #[test]
    fn power_prefers_override_and_adds_equipment() {
        let rules = GameRules::default();
        let mut hero = player(3, 250);
        assert_eq!(effective_power(&hero, &rules), 10 + 3 * 5);

        hero.equipment = vec!["sword".into(), "shield".into()];
        assert_eq!(effective_power(&hero, &rules), 25 + 2 * 3);

        hero.power = Some(100);
        assert_eq!(effective_power(&hero, &rules), 106);
    }

    #[test]
    fn progress_rolls_over_stages() {
        let rules = GameRules::default();
        let start = initial_progress(&rules, SystemTime::UNIX_EPOCH);

        let (progress, completed) = advance_progress(start.clone(), 999, &rules, SystemTime::now());
        assert_eq!(completed, 0);
        assert_eq!(progress.current, 999);
        assert_eq!(progress.stage, 1);

        let (progress, completed) = advance_progress(start, 2_600, &rules, SystemTime::now());
        // 1000 then 1500 consumed, 100 left toward 2250.
        assert_eq!(completed, 2);
        assert_eq!(progress.stage, 3);
        assert_eq!(progress.goal, 2_250);
        assert_eq!(progress.current, 100);
        assert!(progress.current < progress.goal);
    }

    #[test]
    fn goal_grows_even_without_growth_factor() {
        let rules = GameRules {
            goal_growth: 1.0,
            ..GameRules::default()
        };
        let progress = GlobalProgressEntity {
            current: 0,
            goal: 1,
            stage: 1,
            updated_at: SystemTime::UNIX_EPOCH,
        };
        let (progress, completed) = advance_progress(progress, 3, &rules, SystemTime::now());
        // goals 1 and 2 are consumed, 0 left toward 3.
        assert_eq!(completed, 2);
        assert_eq!(progress.goal, 3);
        assert_eq!(progress.current, 0);
    }

    fn stepwise(mut progress: GlobalProgressEntity, amount: u64, growth: f64) -> (GlobalProgressEntity, u32) {
        let mut completed = 0;
        progress.current += amount;
        while progress.current >= progress.goal {
            progress.current -= progress.goal;
            progress.stage += 1;
            progress.goal = next_goal(progress.goal, growth);
            completed += 1;
        }
        (progress, completed)
    }

    #[test]
    fn skipping_linear_runs_matches_stage_by_stage_rollover() {
        for growth in [1.0, 1.01, 1.1, 1.5, 2.0] {
            let rules = GameRules {
                goal_growth: growth,
                ..GameRules::default()
            };
            for goal in [1, 2, 7, 50, 99, 100, 101, 400] {
                for amount in [0, 1, 5, 99, 1_000, 12_345, 250_000] {
                    let start = GlobalProgressEntity {
                        current: 0,
                        goal,
                        stage: 1,
                        updated_at: SystemTime::UNIX_EPOCH,
                    };
                    let (fast, fast_completed) =
                        advance_progress(start.clone(), amount, &rules, SystemTime::UNIX_EPOCH);
                    let (slow, slow_completed) = stepwise(start, amount, growth);
                    assert_eq!(
                        (fast.current, fast.goal, fast.stage, fast_completed),
                        (slow.current, slow.goal, slow.stage, slow_completed),
                        "growth {growth}, goal {goal}, amount {amount}"
                    );
                }
            }
        }
    }

    #[test]
    fn huge_amounts_without_growth_finish_quickly() {
        let rules = GameRules {
            goal_growth: 1.0,
            ..GameRules::default()
        };
        let start = GlobalProgressEntity {
            current: 0,
            goal: 1,
            stage: 1,
            updated_at: SystemTime::UNIX_EPOCH,
        };
        let (progress, completed) =
            advance_progress(start, u64::MAX, &rules, SystemTime::UNIX_EPOCH);

        assert!(progress.current < progress.goal);
        assert!(progress.current <= MAX_COUNTER);
        // k(k+1)/2 <= i64::MAX gives k = 4294967295.
        assert_eq!(progress.goal, 4_294_967_296);
        assert_eq!(completed, u32::MAX);
        assert_eq!(progress.stage, u32::MAX);
    }

    #[test]
    fn counters_saturate_at_the_storable_maximum() {
        let rules = GameRules::default();
        let grant = grant_xp(player(1, MAX_COUNTER - 5), 100, &rules, SystemTime::UNIX_EPOCH);
        assert_eq!(grant.player.xp, MAX_COUNTER);

        let start = GlobalProgressEntity {
            current: 0,
            goal: MAX_COUNTER,
            stage: 1,
            updated_at: SystemTime::UNIX_EPOCH,
        };
        let (progress, completed) =
            advance_progress(start, u64::MAX, &rules, SystemTime::UNIX_EPOCH);
        assert_eq!(completed, 1);
        assert_eq!(progress.current, 0);
        assert_eq!(progress.goal, MAX_COUNTER);
    }
}
