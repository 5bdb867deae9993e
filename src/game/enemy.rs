//! Enemy records and their construction at spawn time

use rand::Rng;
use std::f32::consts::TAU;

use super::catalog::{EnemyType, MovementPattern};
use super::rules::GameRules;

/// Floor for any enemy speed, in px/s
pub const MIN_ENEMY_SPEED: f32 = 40.0;

/// Per-wave speed growth
const WAVE_SPEED_STEP: f32 = 0.08;

/// One hostile entity inside a room (authoritative)
#[derive(Debug, Clone)]
pub struct Enemy {
    /// Room-scoped id, never reused (`e-<n>`)
    pub id: String,
    pub type_id: String,

    // Position
    /// Broadcast position after pattern offset
    pub x: f32,
    /// Horizontal anchor of the path
    pub base_x: f32,
    pub y: f32,

    // Combat
    pub hp: u32,
    pub max_hp: u32,
    pub alive: bool,
    pub breached: bool,

    // Copied from the type at spawn and never re-read
    pub speed: f32,
    pub movement_pattern: MovementPattern,
    pub score_value: u32,
    pub tier: u8,
    pub breach_effect: Option<String>,

    // Timing
    pub spawned_at: u64,
    /// Random phase for periodic patterns
    pub phase: f32,
    pub last_blink_at: Option<u64>,
    pub died_at: Option<u64>,
}

impl Enemy {
    /// Build a fresh enemy of the given type entering from above the arena.
    ///
    /// `start_x` pins the anchor instead of drawing it at random.
    pub fn spawn<R: Rng + ?Sized>(
        id: String,
        ty: &EnemyType,
        wave: u32,
        rules: &GameRules,
        now: u64,
        start_x: Option<f32>,
        rng: &mut R,
    ) -> Self {
        let arena = &rules.arena;
        let base_x = arena.clamp_anchor_x(start_x.unwrap_or_else(|| {
            arena.spawn_margin + rng.gen::<f32>() * (arena.width - 2.0 * arena.spawn_margin)
        }));
        let y = -20.0 - rng.gen::<f32>() * 50.0;
        let speed = enemy_speed(ty, wave, rules.speed_scale, rng);

        Self {
            id,
            type_id: ty.id.clone(),
            x: base_x,
            base_x,
            y,
            hp: ty.max_hp.max(1),
            max_hp: ty.max_hp.max(1),
            alive: true,
            breached: false,
            speed,
            movement_pattern: ty.movement_pattern,
            score_value: ty.score_value,
            tier: ty.tier,
            breach_effect: ty.on_reach_bottom_effect.clone(),
            spawned_at: now,
            phase: rng.gen_range(0.0..TAU),
            last_blink_at: None,
            died_at: None,
        }
    }

    /// Seconds since spawn
    pub fn age_secs(&self, now: u64) -> f32 {
        now.saturating_sub(self.spawned_at) as f32 / 1000.0
    }

    /// Whether a dead enemy has outlived the grace window
    pub fn is_expired(&self, now: u64, grace_ms: u64) -> bool {
        if self.alive {
            return false;
        }
        self.died_at
            .map(|died| now.saturating_sub(died) >= grace_ms)
            .unwrap_or(true)
    }
}

/// Speed fixed for the enemy's lifetime:
/// `max(40, base * variance * wave * scale)`
pub fn enemy_speed<R: Rng + ?Sized>(ty: &EnemyType, wave: u32, scale: f32, rng: &mut R) -> f32 {
    let variance_factor = if ty.speed_variance > 0.0 {
        1.0 + rng.gen_range(-1.0f32..=1.0) * ty.speed_variance
    } else {
        1.0
    };
    let wave_factor = 1.0 + wave.saturating_sub(1) as f32 * WAVE_SPEED_STEP;
    (ty.base_speed * variance_factor * wave_factor * scale).max(MIN_ENEMY_SPEED)
}
