//! Enemy type catalog - static per-type attributes keyed by type id

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Type id every lookup falls back to when a type is missing
pub const DEFAULT_TYPE_ID: &str = "STRESS_CLOUD";

/// Score awarded when neither the enemy nor its type carry one
pub const FALLBACK_SCORE: u32 = 10;

/// Horizontal movement pattern of an enemy (fixed at spawn)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    /// Straight descent, no horizontal offset
    #[default]
    Straight,
    /// Smooth sinusoidal sway around the anchor
    Sine,
    /// Square-wave lane shift
    Zigzag,
    /// Faster descent with a short square-wave shift
    Dash,
    /// Periodic teleport of the anchor itself
    Blink,
}

/// Static attributes of one enemy type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyType {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default = "default_max_hp")]
    pub max_hp: u32,
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    #[serde(default)]
    pub speed_variance: f32,
    #[serde(default)]
    pub movement_pattern: MovementPattern,
    #[serde(default = "default_score")]
    pub score_value: u32,
    /// Client-side effect name played when this type breaches
    #[serde(default)]
    pub on_reach_bottom_effect: Option<String>,
}

fn default_tier() -> u8 {
    1
}

fn default_max_hp() -> u32 {
    1
}

fn default_base_speed() -> f32 {
    70.0
}

fn default_score() -> u32 {
    FALLBACK_SCORE
}

impl EnemyType {
    #[allow(clippy::too_many_arguments)]
    fn builtin(
        id: &str,
        tier: u8,
        max_hp: u32,
        base_speed: f32,
        speed_variance: f32,
        movement_pattern: MovementPattern,
        score_value: u32,
        effect: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            tier,
            max_hp,
            base_speed,
            speed_variance,
            movement_pattern,
            score_value,
            on_reach_bottom_effect: Some(effect.to_string()),
        }
    }

    /// Bring file-provided values into the ranges the simulation relies on
    fn normalize(&mut self) {
        self.tier = self.tier.clamp(1, 3);
        self.max_hp = self.max_hp.max(1);
        if !self.base_speed.is_finite() || self.base_speed <= 0.0 {
            self.base_speed = default_base_speed();
        }
        if !self.speed_variance.is_finite() {
            self.speed_variance = 0.0;
        }
        self.speed_variance = self.speed_variance.clamp(0.0, 1.0);
    }
}

impl Default for EnemyType {
    fn default() -> Self {
        Self {
            id: DEFAULT_TYPE_ID.to_string(),
            tier: default_tier(),
            max_hp: default_max_hp(),
            base_speed: default_base_speed(),
            speed_variance: 0.0,
            movement_pattern: MovementPattern::Straight,
            score_value: default_score(),
            on_reach_bottom_effect: None,
        }
    }
}

/// Immutable lookup table of enemy types
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    types: HashMap<String, EnemyType>,
}

impl TypeCatalog {
    /// The built-in Good Vibes Defenders roster
    pub fn builtin() -> Self {
        use MovementPattern::*;

        let types = vec![
            EnemyType::builtin("STRESS_CLOUD", 1, 2, 90.0, 0.2, Sine, 50, "teamStress"),
            EnemyType::builtin("DEADLINE_METEOR", 2, 4, 90.0, 0.1, Dash, 120, "bigStressSpike"),
            EnemyType::builtin("BURNOUT_SHADOW", 3, 6, 60.0, 0.1, Straight, 200, "majorTeamHpLoss"),
            EnemyType::builtin("RUMOR_BUBBLE", 1, 1, 70.0, 0.25, Zigzag, 80, "teamMiscommunication"),
            EnemyType::builtin("LEGACY_RFC_MONSTER", 3, 8, 50.0, 0.1, Straight, 300, "systemSlowdown"),
            EnemyType::builtin("IDOC_GHOST", 2, 3, 80.0, 0.2, Blink, 150, "dataConfusion"),
            EnemyType::builtin("TRANSPORT_FREEZE_BLOB", 2, 4, 70.0, 0.15, Sine, 130, "transportBlock"),
            EnemyType::builtin("PERFORMANCE_DUMP_CLOUD", 2, 5, 75.0, 0.15, Straight, 180, "perfPenalty"),
            EnemyType::builtin("TASK_OVERLOAD_SWARM", 1, 3, 100.0, 0.1, Zigzag, 90, "teamOverload"),
        ];

        Self::from_types(types)
    }

    pub fn from_types(types: impl IntoIterator<Item = EnemyType>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Parse a catalog from a JSON object keyed by type id
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let parsed: HashMap<String, EnemyType> = serde_json::from_str(raw)?;
        if parsed.is_empty() {
            return Err(CatalogError::Empty);
        }

        let types = parsed.into_iter().map(|(id, mut ty)| {
            ty.id = id;
            ty.normalize();
            ty
        });

        Ok(Self::from_types(types))
    }

    pub fn get(&self, type_id: &str) -> Option<&EnemyType> {
        self.types.get(type_id)
    }

    /// Look up a type, falling back to the default type
    pub fn resolve(&self, type_id: &str) -> Option<&EnemyType> {
        self.get(type_id).or_else(|| self.get(DEFAULT_TYPE_ID))
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Catalog loading errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Malformed enemy catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Enemy catalog contains no types")]
    Empty,
}
