//! Spawn pacing within a wave

/// Interval floor, in milliseconds
pub const MIN_SPAWN_INTERVAL_MS: u64 = 350;
/// Interval at wave 0, shrinking by `SPAWN_INTERVAL_STEP_MS` per wave
const BASE_SPAWN_INTERVAL_MS: u64 = 900;
const SPAWN_INTERVAL_STEP_MS: u64 = 60;

/// `max(350, 900 - wave * 60)`
pub fn spawn_interval_ms(wave: u32) -> u64 {
    BASE_SPAWN_INTERVAL_MS
        .saturating_sub(wave as u64 * SPAWN_INTERVAL_STEP_MS)
        .max(MIN_SPAWN_INTERVAL_MS)
}

/// Per-room spawn state for the current wave
#[derive(Debug, Clone, Default)]
pub struct SpawnScheduler {
    pub pending_spawns: u32,
    /// None until the first spawn of the wave
    pub last_spawn_at: Option<u64>,
    pub spawn_interval_ms: u64,
}

impl SpawnScheduler {
    /// Reset for a freshly seeded wave
    pub fn seed(&mut self, wave: u32, count: u32) {
        self.pending_spawns = count;
        self.last_spawn_at = None;
        self.spawn_interval_ms = spawn_interval_ms(wave);
    }

    /// Whether one enemy may spawn at `now`
    pub fn is_due(&self, now: u64) -> bool {
        if self.pending_spawns == 0 {
            return false;
        }
        match self.last_spawn_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.spawn_interval_ms,
        }
    }

    /// Record one spawn at `now`
    pub fn record_spawn(&mut self, now: u64) {
        self.pending_spawns = self.pending_spawns.saturating_sub(1);
        self.last_spawn_at = Some(now);
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending_spawns == 0
    }
}
