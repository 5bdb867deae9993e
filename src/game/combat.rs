//! Combat system - hit resolution, kills and breaches

use super::catalog::{TypeCatalog, FALLBACK_SCORE};
use super::enemy::Enemy;

/// Upper bound of the shared mood gauge
pub const MAX_MOOD: u32 = 100;

/// Result of applying a client-reported hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitOutcome {
    /// Unknown enemy, dead enemy, or unknown player
    Ignored,
    /// Enemy took damage and survived
    Damaged { hp: u32 },
    /// Enemy was defeated and the reporting player scored
    Killed { score_awarded: u32 },
}

/// An enemy crossing the bottom threshold during a tick
#[derive(Debug, Clone)]
pub struct BreachEvent {
    pub enemy_id: String,
    pub tier: u8,
    pub mood_penalty: u32,
    pub effect: Option<String>,
}

/// Combat system for damage, score and mood bookkeeping
pub struct CombatSystem;

impl CombatSystem {
    /// Reported damage as whole hit points, at least 1
    pub fn normalize_damage(reported: Option<f64>) -> u32 {
        match reported {
            Some(d) if d.is_finite() && d >= 1.0 => d.min(u32::MAX as f64) as u32,
            _ => 1,
        }
    }

    /// Apply damage to health, returns (new_hp, is_dead)
    pub fn apply_damage(current_hp: u32, damage: u32) -> (u32, bool) {
        let new_hp = current_hp.saturating_sub(damage);
        (new_hp, new_hp == 0)
    }

    /// Resolve a hit against one enemy. Dead enemies are left untouched.
    pub fn resolve_hit(enemy: &mut Enemy, damage: u32, now: u64, catalog: &TypeCatalog) -> HitOutcome {
        if !enemy.alive {
            return HitOutcome::Ignored;
        }

        let (hp, killed) = Self::apply_damage(enemy.hp, damage);
        enemy.hp = hp;
        if !killed {
            return HitOutcome::Damaged { hp };
        }

        enemy.alive = false;
        enemy.died_at = Some(now);
        HitOutcome::Killed {
            score_awarded: Self::kill_score(enemy, catalog),
        }
    }

    /// Score for a defeated enemy: its own value, else its type's, else the fallback
    pub fn kill_score(enemy: &Enemy, catalog: &TypeCatalog) -> u32 {
        if enemy.score_value > 0 {
            return enemy.score_value;
        }
        catalog
            .get(&enemy.type_id)
            .map(|ty| ty.score_value)
            .filter(|score| *score > 0)
            .unwrap_or(FALLBACK_SCORE)
    }

    /// Mood lost when an enemy of `tier` breaches
    pub fn breach_penalty(tier: u8) -> u32 {
        6 + tier as u32 * 2
    }

    /// Mark an alive enemy past the threshold as breached.
    /// Returns the event the first time only.
    pub fn check_breach(enemy: &mut Enemy, threshold: f32, now: u64) -> Option<BreachEvent> {
        if !enemy.alive || enemy.y < threshold {
            return None;
        }

        enemy.alive = false;
        enemy.breached = true;
        enemy.died_at = Some(now);

        Some(BreachEvent {
            enemy_id: enemy.id.clone(),
            tier: enemy.tier,
            mood_penalty: Self::breach_penalty(enemy.tier),
            effect: enemy.breach_effect.clone(),
        })
    }

    /// Lower the mood gauge, clamped to [0, MAX_MOOD]
    pub fn apply_mood_penalty(mood: u32, penalty: u32) -> u32 {
        mood.saturating_sub(penalty).min(MAX_MOOD)
    }
}
