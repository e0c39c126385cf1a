//! Application-level configuration loading: game balance rules and the starter enemy catalog.

use std::{collections::HashSet, env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    dao::models::{EnemyEntity, LootEntryEntity},
    dto::validation::validate_enemy_id,
    services::progression::MAX_COUNTER,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "IDLE_QUEST_CONFIG_PATH";
/// Same bound as the admin API applies to enemy names and loot items.
const MAX_LABEL_LEN: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Balance constants used by leveling, combat and global progress.
    pub rules: GameRules,
    /// Enemies written to the store when its catalog is empty.
    pub enemies: Vec<EnemyEntity>,
}

/// Tunable constants for the game formulas.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameRules {
    /// Experience needed per level (`level = 1 + xp / xp_per_level`).
    pub xp_per_level: u64,
    /// Power of a level-0 player without an explicit override.
    pub base_power: u32,
    /// Power gained per level.
    pub power_per_level: u32,
    /// Power added by each equipped item.
    pub equipment_power_bonus: u32,
    /// Lower clamp applied to the win probability.
    pub min_win_chance: f64,
    /// Upper clamp applied to the win probability.
    pub max_win_chance: f64,
    /// Global progress added by each victory.
    pub victory_progress: u64,
    /// Goal of the first stage of the global progress counter.
    pub initial_goal: u64,
    /// Factor applied to the goal whenever a stage completes.
    pub goal_growth: f64,
    /// Default number of leaderboard entries.
    pub leaderboard_limit: usize,
    /// Upper bound accepted for the leaderboard `limit` parameter.
    pub max_leaderboard_limit: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            xp_per_level: 100,
            base_power: 10,
            power_per_level: 5,
            equipment_power_bonus: 3,
            min_win_chance: 0.05,
            max_win_chance: 0.95,
            victory_progress: 1,
            initial_goal: 1_000,
            goal_growth: 1.5,
            leaderboard_limit: 10,
            max_leaderboard_limit: 100,
        }
    }
}

impl GameRules {
    /// Clamp nonsensical values coming from a hand-edited config file.
    fn sanitized(mut self) -> Self {
        self.xp_per_level = self.xp_per_level.max(1);
        self.initial_goal = self.initial_goal.clamp(1, MAX_COUNTER);
        self.min_win_chance = self.min_win_chance.clamp(0.0, 1.0);
        self.max_win_chance = self.max_win_chance.clamp(self.min_win_chance, 1.0);
        if !self.goal_growth.is_finite() || self.goal_growth < 1.0 {
            self.goal_growth = 1.0;
        }
        self.max_leaderboard_limit = self.max_leaderboard_limit.max(1);
        self.leaderboard_limit = self.leaderboard_limit.clamp(1, self.max_leaderboard_limit);
        self
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        enemies = app_config.enemies.len(),
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document. Omitted sections keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            enemies: default_enemies(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    rules: GameRules,
    #[serde(default)]
    enemies: Option<Vec<RawEnemy>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let enemies = match value.enemies {
            Some(raw) => {
                let mut seen = HashSet::new();
                raw.into_iter()
                    .filter_map(|enemy| match EnemyEntity::try_from(enemy) {
                        Ok(enemy) if seen.insert(enemy.id.clone()) => Some(enemy),
                        Ok(enemy) => {
                            warn!(enemy = %enemy.id, "duplicate enemy id in config; keeping the first");
                            None
                        }
                        Err(reason) => {
                            warn!(%reason, "skipping invalid enemy from config");
                            None
                        }
                    })
                    .collect()
            }
            None => default_enemies(),
        };
        Self {
            rules: value.rules.sanitized(),
            enemies,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single enemy inside the configuration file.
struct RawEnemy {
    id: String,
    name: String,
    power: u32,
    hp: u32,
    xp_reward: u64,
    #[serde(default)]
    loot: Vec<RawLoot>,
}

#[derive(Debug, Deserialize)]
struct RawLoot {
    item: String,
    chance: f64,
}

impl TryFrom<RawEnemy> for EnemyEntity {
    type Error = String;

    /// Rejects enemies the admin API would refuse; bad loot rows are dropped on their own.
    fn try_from(value: RawEnemy) -> Result<Self, Self::Error> {
        validate_enemy_id(&value.id).map_err(|err| format!("enemy `{}`: {err}", value.id))?;
        if !label_fits(&value.name) {
            return Err(format!(
                "enemy `{}`: name must be 1 to {MAX_LABEL_LEN} characters",
                value.id
            ));
        }

        let id = value.id;
        let loot = value
            .loot
            .into_iter()
            .filter(|entry| {
                let keep = label_fits(&entry.item);
                if !keep {
                    warn!(enemy = %id, item = %entry.item, "skipping loot entry with invalid item name");
                }
                keep
            })
            .map(|entry| LootEntryEntity {
                item: entry.item,
                chance: entry.chance.clamp(0.0, 1.0),
            })
            .collect();

        Ok(Self {
            id,
            name: value.name,
            power: value.power,
            hp: value.hp,
            xp_reward: value.xp_reward.min(MAX_COUNTER),
            loot,
        })
    }
}

fn label_fits(label: &str) -> bool {
    (1..=MAX_LABEL_LEN).contains(&label.chars().count())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn loot(item: &str, chance: f64) -> LootEntryEntity {
    LootEntryEntity {
        item: item.to_owned(),
        chance,
    }
}

/// Built-in enemy catalog shipped with the binary.
fn default_enemies() -> Vec<EnemyEntity> {
    vec![
        EnemyEntity {
            id: "slime".into(),
            name: "Slime".into(),
            power: 5,
            hp: 20,
            xp_reward: 10,
            loot: vec![loot("slime gel", 0.5)],
        },
        EnemyEntity {
            id: "goblin".into(),
            name: "Goblin".into(),
            power: 15,
            hp: 45,
            xp_reward: 25,
            loot: vec![loot("rusty dagger", 0.2), loot("copper coin", 0.6)],
        },
        EnemyEntity {
            id: "wolf".into(),
            name: "Dire Wolf".into(),
            power: 30,
            hp: 80,
            xp_reward: 50,
            loot: vec![loot("wolf pelt", 0.4), loot("fang", 0.25)],
        },
        EnemyEntity {
            id: "orc".into(),
            name: "Orc Warrior".into(),
            power: 60,
            hp: 150,
            xp_reward: 120,
            loot: vec![loot("iron axe", 0.15), loot("orc tusk", 0.35)],
        },
        EnemyEntity {
            id: "dragon".into(),
            name: "Elder Dragon".into(),
            power: 250,
            hp: 1_200,
            xp_reward: 1_000,
            loot: vec![loot("dragon scale", 0.3), loot("dragon heart", 0.05)],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.rules, GameRules::default());
        assert_eq!(config.enemies.len(), default_enemies().len());
    }

    #[test]
    fn partial_rules_override_only_given_fields() {
        let config = AppConfig::from_json(r#"{"rules": {"xp_per_level": 250}}"#).unwrap();
        assert_eq!(config.rules.xp_per_level, 250);
        assert_eq!(config.rules.base_power, GameRules::default().base_power);
    }

    #[test]
    fn invalid_values_are_sanitized() {
        let config = AppConfig::from_json(
            r#"{"rules": {"xp_per_level": 0, "goal_growth": 0.5, "min_win_chance": 0.9, "max_win_chance": 0.2},
                "enemies": [{"id": "bat", "name": "Bat", "power": 1, "hp": 3, "xp_reward": 2,
                             "loot": [{"item": "wing", "chance": 4.0}]}]}"#,
        )
        .unwrap();

        assert_eq!(config.rules.xp_per_level, 1);
        assert_eq!(config.rules.goal_growth, 1.0);
        assert!(config.rules.max_win_chance >= config.rules.min_win_chance);
        assert_eq!(config.enemies.len(), 1);
        assert_eq!(config.enemies[0].loot[0].chance, 1.0);
    }

    #[test]
    fn invalid_enemies_are_dropped() {
        let long_name = "x".repeat(65);
        let json = format!(
            r#"{{"enemies": [
                {{"id": "Bad Id", "name": "Shouty", "power": 1, "hp": 1, "xp_reward": 1}},
                {{"id": "nameless", "name": "", "power": 1, "hp": 1, "xp_reward": 1}},
                {{"id": "verbose", "name": "{long_name}", "power": 1, "hp": 1, "xp_reward": 1}},
                {{"id": "rat", "name": "Rat", "power": 2, "hp": 4, "xp_reward": 18446744073709551615,
                  "loot": [{{"item": "", "chance": 0.5}}, {{"item": "tail", "chance": 0.5}}]}},
                {{"id": "rat", "name": "Second Rat", "power": 9, "hp": 9, "xp_reward": 9}}
            ]}}"#
        );
        let config = AppConfig::from_json(&json).unwrap();

        assert_eq!(config.enemies.len(), 1);
        let rat = &config.enemies[0];
        assert_eq!(rat.id, "rat");
        assert_eq!(rat.name, "Rat");
        assert_eq!(rat.xp_reward, MAX_COUNTER);
        assert_eq!(rat.loot.len(), 1);
        assert_eq!(rat.loot[0].item, "tail");
    }
}
