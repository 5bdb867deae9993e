//! Enemy movement patterns and per-tick advancement

use rand::Rng;

use super::catalog::MovementPattern;
use super::enemy::Enemy;
use super::rules::ArenaConfig;

/// Sine sway: angular speed and amplitude
const SINE_RATE: f32 = 2.4;
const SINE_AMPLITUDE: f32 = 36.0;
/// Zigzag: half-period in seconds and lane shift
const ZIGZAG_HALF_PERIOD: f32 = 0.65;
const ZIGZAG_SHIFT: f32 = 28.0;
/// Dash: extra descent fraction, half-period and lane shift
const DASH_BOOST: f32 = 0.18;
const DASH_HALF_PERIOD: f32 = 0.5;
const DASH_SHIFT: f32 = 22.0;
/// Blink: minimum time between jumps and jump distance
pub const BLINK_COOLDOWN_MS: u64 = 700;
const BLINK_DISTANCE: f32 = 60.0;

/// Movement system for advancing enemies along their patterns
pub struct MovementSystem;

impl MovementSystem {
    /// Horizontal offset from the anchor at `t` seconds after spawn.
    /// Blink has no continuous offset; it moves the anchor instead.
    pub fn pattern_offset(pattern: MovementPattern, t: f32, phase: f32) -> f32 {
        match pattern {
            MovementPattern::Straight | MovementPattern::Blink => 0.0,
            MovementPattern::Sine => (t * SINE_RATE + phase).sin() * SINE_AMPLITUDE,
            MovementPattern::Zigzag => square_wave(t, ZIGZAG_HALF_PERIOD) * ZIGZAG_SHIFT,
            MovementPattern::Dash => square_wave(t, DASH_HALF_PERIOD) * DASH_SHIFT,
        }
    }

    /// Vertical distance covered in one step
    pub fn descent(pattern: MovementPattern, speed: f32, dt: f32) -> f32 {
        match pattern {
            MovementPattern::Dash => speed * dt * (1.0 + DASH_BOOST),
            _ => speed * dt,
        }
    }

    /// Advance one alive enemy by `dt` seconds at time `now`
    pub fn advance<R: Rng + ?Sized>(
        enemy: &mut Enemy,
        now: u64,
        dt: f32,
        arena: &ArenaConfig,
        rng: &mut R,
    ) {
        if !enemy.alive {
            return;
        }

        enemy.y += Self::descent(enemy.movement_pattern, enemy.speed, dt);

        if enemy.movement_pattern == MovementPattern::Blink {
            let ready = enemy
                .last_blink_at
                .map(|last| now.saturating_sub(last) >= BLINK_COOLDOWN_MS)
                .unwrap_or(true);
            if ready {
                let jump = if rng.gen_bool(0.5) { BLINK_DISTANCE } else { -BLINK_DISTANCE };
                enemy.base_x = arena.clamp_anchor_x(enemy.base_x + jump);
                enemy.last_blink_at = Some(now);
            }
        }

        let offset = Self::pattern_offset(enemy.movement_pattern, enemy.age_secs(now), enemy.phase);
        enemy.x = arena.clamp_lane_x(enemy.base_x + offset);
    }
}

/// +1 on even half-periods, -1 on odd ones
fn square_wave(t: f32, half_period: f32) -> f32 {
    if (t / half_period).floor().rem_euclid(2.0) == 0.0 {
        1.0
    } else {
        -1.0
    }
}
