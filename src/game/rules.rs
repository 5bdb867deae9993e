//! Immutable game tuning shared by every room

use std::time::Duration;

use tracing::{info, warn};

use crate::config::{Config, ConfigError};

use super::catalog::{TypeCatalog, DEFAULT_TYPE_ID};
use super::wave::WavePlan;

/// Arena geometry and timing constants
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
    /// Distance of the player lane from the bottom edge
    pub lane_offset: f32,
    /// Horizontal padding for players and rendered enemy positions
    pub lane_margin: f32,
    /// Horizontal padding for enemy anchors (spawn and blink)
    pub spawn_margin: f32,
    /// Distance from the bottom edge that counts as a breach
    pub bottom_threshold_offset: f32,
    /// Pixels moved per unit of `dx` in a move message
    pub player_step: f32,
    /// How long defeated/breached enemies stay in snapshots
    pub death_grace_ms: u64,
}

impl ArenaConfig {
    pub fn lane_y(&self) -> f32 {
        self.height - self.lane_offset
    }

    pub fn bottom_threshold(&self) -> f32 {
        self.height - self.bottom_threshold_offset
    }

    pub fn clamp_lane_x(&self, x: f32) -> f32 {
        x.clamp(self.lane_margin, self.width - self.lane_margin)
    }

    pub fn clamp_anchor_x(&self, x: f32) -> f32 {
        x.clamp(self.spawn_margin, self.width - self.spawn_margin)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 880.0,
            height: 500.0,
            lane_offset: 40.0,
            lane_margin: 20.0,
            spawn_margin: 30.0,
            bottom_threshold_offset: 70.0,
            player_step: 14.0,
            death_grace_ms: 2000,
        }
    }
}

/// Everything a room needs to simulate, built once at startup
#[derive(Debug, Clone)]
pub struct GameRules {
    pub arena: ArenaConfig,
    pub catalog: TypeCatalog,
    pub waves: WavePlan,
    /// Global enemy speed multiplier
    pub speed_scale: f32,
    /// Fixed tick period
    pub tick: Duration,
}

impl GameRules {
    /// Build the rules from configuration, loading the catalog file if one is set
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let catalog = match &config.enemy_catalog_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogFile {
                    path: path.clone(),
                    source,
                })?;
                let catalog = TypeCatalog::from_json(&raw)?;
                info!(path = %path.display(), types = catalog.len(), "Loaded enemy catalog");
                catalog
            }
            None => TypeCatalog::builtin(),
        };

        let rules = Self {
            arena: ArenaConfig::default(),
            catalog,
            waves: WavePlan::builtin(),
            speed_scale: config.enemy_speed_scale,
            tick: config.tick,
        };
        rules.validate()?;
        Ok(rules)
    }

    /// Reject configurations the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waves.is_empty() {
            return Err(ConfigError::Rules("wave plan is empty".to_string()));
        }
        if let Some(idx) = self.waves.waves().iter().position(|w| w.types.is_empty() || w.count == 0) {
            return Err(ConfigError::Rules(format!("wave {} has no types or no enemies", idx + 1)));
        }
        if !self.catalog.contains(DEFAULT_TYPE_ID) {
            return Err(ConfigError::Rules(format!(
                "catalog is missing default type {}",
                DEFAULT_TYPE_ID
            )));
        }

        for wave in self.waves.waves() {
            for type_id in &wave.types {
                if !self.catalog.contains(type_id) {
                    warn!(type_id = %type_id, "Wave references unknown enemy type, default type will spawn instead");
                }
            }
        }

        Ok(())
    }

    /// Tick period in seconds, used as the simulation step
    pub fn tick_secs(&self) -> f32 {
        self.tick.as_secs_f32()
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            catalog: TypeCatalog::builtin(),
            waves: WavePlan::builtin(),
            speed_scale: 0.6,
            tick: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::EnemyType;
    use crate::game::wave::WaveDef;

    #[test]
    fn default_rules_are_valid() {
        let rules = GameRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.arena.bottom_threshold(), 430.0);
        assert_eq!(rules.arena.lane_y(), 460.0);
    }

    #[test]
    fn empty_wave_plan_is_rejected() {
        let rules = GameRules {
            waves: WavePlan::new(Vec::new()),
            ..GameRules::default()
        };
        assert!(matches!(rules.validate(), Err(ConfigError::Rules(_))));
    }

    #[test]
    fn wave_without_types_is_rejected() {
        let rules = GameRules {
            waves: WavePlan::new(vec![WaveDef::new(&[], 5)]),
            ..GameRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn catalog_without_default_type_is_rejected() {
        let lonely = EnemyType {
            id: "MEETING_STORM".to_string(),
            tier: 1,
            max_hp: 1,
            base_speed: 70.0,
            speed_variance: 0.0,
            movement_pattern: Default::default(),
            score_value: 10,
            on_reach_bottom_effect: None,
        };
        let rules = GameRules {
            catalog: TypeCatalog::from_types([lonely]),
            ..GameRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn clamps_respect_margins() {
        let arena = ArenaConfig::default();
        assert_eq!(arena.clamp_lane_x(-100.0), 20.0);
        assert_eq!(arena.clamp_lane_x(2000.0), 860.0);
        assert_eq!(arena.clamp_anchor_x(0.0), 30.0);
        assert_eq!(arena.clamp_anchor_x(900.0), 850.0);
    }
}
