//! Wave planning - which enemy types spawn in a wave and how many

use rand::seq::SliceRandom;
use rand::Rng;

use super::catalog::DEFAULT_TYPE_ID;

/// One entry of the wave table
#[derive(Debug, Clone)]
pub struct WaveDef {
    /// Type ids eligible to spawn in this wave
    pub types: Vec<String>,
    /// Base enemy count
    pub count: u32,
}

impl WaveDef {
    pub fn new(types: &[&str], count: u32) -> Self {
        Self {
            types: types.iter().map(|t| t.to_string()).collect(),
            count,
        }
    }
}

/// Resolved plan for a concrete wave number
#[derive(Debug, Clone, Copy)]
pub struct WaveSpec<'a> {
    pub allowed_types: &'a [String],
    /// Enemy count including the past-the-table bonus
    pub count: u32,
}

impl<'a> WaveSpec<'a> {
    /// Uniform draw from the allowed types
    pub fn pick_type<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a str {
        let types: &'a [String] = self.allowed_types;
        types
            .choose(rng)
            .map(String::as_str)
            .unwrap_or(DEFAULT_TYPE_ID)
    }
}

/// Ordered wave table; wave numbers past the end wrap around
#[derive(Debug, Clone)]
pub struct WavePlan {
    waves: Vec<WaveDef>,
}

impl WavePlan {
    pub fn new(waves: Vec<WaveDef>) -> Self {
        Self { waves }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            WaveDef::new(&["STRESS_CLOUD", "RUMOR_BUBBLE"], 10),
            WaveDef::new(
                &["STRESS_CLOUD", "RUMOR_BUBBLE", "DEADLINE_METEOR", "TASK_OVERLOAD_SWARM"],
                12,
            ),
            WaveDef::new(
                &["DEADLINE_METEOR", "TASK_OVERLOAD_SWARM", "PERFORMANCE_DUMP_CLOUD", "IDOC_GHOST"],
                14,
            ),
            WaveDef::new(
                &[
                    "BURNOUT_SHADOW",
                    "LEGACY_RFC_MONSTER",
                    "PERFORMANCE_DUMP_CLOUD",
                    "TRANSPORT_FREEZE_BLOB",
                ],
                10,
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn waves(&self) -> &[WaveDef] {
        &self.waves
    }

    /// Plan for a 1-based wave number.
    ///
    /// Waves past the table wrap to `(wave - 1) % len` and gain
    /// `wave - len` extra enemies. An empty table is rejected at startup by
    /// `GameRules::validate`; here it degrades to a single default enemy.
    pub fn plan_for(&self, wave: u32) -> WaveSpec<'_> {
        let wave = wave.max(1);
        let len = self.waves.len() as u32;
        if len == 0 {
            return WaveSpec {
                allowed_types: &[],
                count: 1,
            };
        }

        let def = &self.waves[((wave - 1) % len) as usize];
        let bonus = wave.saturating_sub(len);
        WaveSpec {
            allowed_types: &def.types,
            count: def.count.saturating_add(bonus),
        }
    }
}

impl Default for WavePlan {
    fn default() -> Self {
        Self::builtin()
    }
}
