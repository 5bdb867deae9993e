//! Room state and authoritative tick loop

use dashmap::DashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::catalog::EnemyType;
use super::combat::{BreachEvent, CombatSystem, HitOutcome, MAX_MOOD};
use super::enemy::Enemy;
use super::movement::MovementSystem;
use super::rules::{ArenaConfig, GameRules};
use super::snapshot::SnapshotBuilder;
use super::spawn::SpawnScheduler;
use super::PlayerInput;

/// Lives and hp every player starts with (reserved for penalties)
const STARTING_LIVES: u32 = 3;

/// Player state in a room (authoritative)
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub score: u64,
    pub lives: u32,
    pub hp: u32,
    /// Last movement direction
    pub dir: f32,
}

impl PlayerState {
    pub fn new(id: Uuid, arena: &ArenaConfig) -> Self {
        let simple = id.simple().to_string();
        Self {
            id,
            name: format!("Player-{}", &simple[simple.len() - 3..]),
            x: arena.width / 2.0,
            y: arena.lane_y(),
            score: 0,
            lives: STARTING_LIVES,
            hp: STARTING_LIVES,
            dir: 0.0,
        }
    }
}

/// What happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub spawned: Option<String>,
    pub breaches: Vec<BreachEvent>,
    pub purged: usize,
    /// New wave number when the wave advanced this tick
    pub wave_advanced: Option<u32>,
}

/// Room summary published for HTTP queries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub players: usize,
    pub wave: u32,
    pub team_mood: u32,
    pub live_enemies: usize,
    pub pending_spawns: u32,
}

/// Room state (owned by the room task)
pub struct RoomState {
    pub id: String,
    pub rules: Arc<GameRules>,
    pub tick: u64,
    pub players: HashMap<Uuid, PlayerState>,
    /// Alive and recently dead enemies, in spawn order
    pub enemies: Vec<Enemy>,
    /// Current wave, starting at 1
    pub wave: u32,
    /// Shared team mood in [0, 100]
    pub mood: u32,
    pub enemy_counter: u64,
    pub spawner: SpawnScheduler,
    pub rng: ChaCha8Rng,
}

impl RoomState {
    pub fn new(id: String, rules: Arc<GameRules>, seed: u64) -> Self {
        let mut state = Self {
            id,
            rules,
            tick: 0,
            players: HashMap::new(),
            enemies: Vec::new(),
            wave: 1,
            mood: MAX_MOOD,
            enemy_counter: 0,
            spawner: SpawnScheduler::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        state.seed_wave();
        state
    }

    /// Reset spawn state for the current wave number
    pub fn seed_wave(&mut self) {
        let count = self.rules.waves.plan_for(self.wave).count;
        self.spawner.seed(self.wave, count);
        self.enemies.clear();
    }

    pub fn add_player(&mut self, player_id: Uuid) -> &PlayerState {
        let arena = &self.rules.arena;
        self.players
            .entry(player_id)
            .or_insert_with(|| PlayerState::new(player_id, arena))
    }

    pub fn remove_player(&mut self, player_id: &Uuid) -> Option<PlayerState> {
        self.players.remove(player_id)
    }

    /// Store an already sanitized display name
    pub fn set_name(&mut self, player_id: &Uuid, name: String) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.name = name;
        }
    }

    /// Step a player along the lane by `dx` (clamped to [-1, 1])
    pub fn apply_move(&mut self, player_id: &Uuid, dx: f64) {
        if !dx.is_finite() {
            return;
        }
        let arena = &self.rules.arena;
        if let Some(player) = self.players.get_mut(player_id) {
            let dx = dx.clamp(-1.0, 1.0) as f32;
            player.x = arena.clamp_lane_x(player.x + arena.player_step * dx);
            player.y = arena.lane_y();
            player.dir = dx;
        }
    }

    /// Apply a client-reported hit. Lookups are scoped to this room.
    pub fn apply_hit(
        &mut self,
        player_id: &Uuid,
        enemy_id: &str,
        damage: Option<f64>,
        now: u64,
    ) -> HitOutcome {
        let Some(player) = self.players.get_mut(player_id) else {
            return HitOutcome::Ignored;
        };
        let Some(enemy) = self.enemies.iter_mut().find(|e| e.id == enemy_id) else {
            return HitOutcome::Ignored;
        };

        let damage = CombatSystem::normalize_damage(damage);
        let outcome = CombatSystem::resolve_hit(enemy, damage, now, &self.rules.catalog);
        if let HitOutcome::Killed { score_awarded } = outcome {
            player.score = player.score.saturating_add(score_awarded as u64);
        }
        outcome
    }

    /// Create one enemy of `type_id` (default type if unknown) and return its id
    pub fn spawn_enemy(&mut self, type_id: &str, start_x: Option<f32>, now: u64) -> String {
        let rules = Arc::clone(&self.rules);
        let fallback;
        let ty = match rules.catalog.resolve(type_id) {
            Some(ty) => ty,
            None => {
                fallback = EnemyType::default();
                &fallback
            }
        };

        let id = format!("e-{}", self.enemy_counter);
        self.enemy_counter += 1;

        let enemy = Enemy::spawn(id.clone(), ty, self.wave, &rules, now, start_x, &mut self.rng);
        self.enemies.push(enemy);
        id
    }

    /// Run one simulation step at `now` (unix millis)
    pub fn tick(&mut self, now: u64) -> TickReport {
        let mut report = TickReport::default();
        self.tick += 1;

        // Spawn at most one enemy
        if self.spawner.is_due(now) {
            let type_id = self
                .rules
                .waves
                .plan_for(self.wave)
                .pick_type(&mut self.rng)
                .to_string();
            report.spawned = Some(self.spawn_enemy(&type_id, None, now));
            self.spawner.record_spawn(now);
        }

        // Move and check breaches
        let dt = self.rules.tick_secs();
        let threshold = self.rules.arena.bottom_threshold();
        for enemy in self.enemies.iter_mut() {
            if !enemy.alive {
                continue;
            }
            MovementSystem::advance(enemy, now, dt, &self.rules.arena, &mut self.rng);
            if let Some(breach) = CombatSystem::check_breach(enemy, threshold, now) {
                self.mood = CombatSystem::apply_mood_penalty(self.mood, breach.mood_penalty);
                report.breaches.push(breach);
            }
        }

        // Purge enemies past the death grace window
        let grace = self.rules.arena.death_grace_ms;
        let before = self.enemies.len();
        self.enemies.retain(|e| !e.is_expired(now, grace));
        report.purged = before - self.enemies.len();

        // Advance when nothing is pending and nothing is alive
        if self.spawner.is_exhausted() && self.alive_enemies() == 0 {
            self.wave += 1;
            self.seed_wave();
            report.wave_advanced = Some(self.wave);
        }

        report
    }

    pub fn alive_enemies(&self) -> usize {
        self.enemies.iter().filter(|e| e.alive).count()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            players: self.players.len(),
            wave: self.wave,
            team_mood: self.mood,
            live_enemies: self.alive_enemies(),
            pending_spawns: self.spawner.pending_spawns,
        }
    }
}

/// Reply to a join: the connection's first frame and its broadcast feed
pub struct JoinAck {
    pub welcome: ServerMsg,
    pub snapshots: broadcast::Receiver<ServerMsg>,
}

/// Commands processed by the room task, in arrival order
pub enum RoomCommand {
    Join {
        player_id: Uuid,
        reply: oneshot::Sender<JoinAck>,
    },
    Input(PlayerInput),
    Leave {
        player_id: Uuid,
    },
}

/// Handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub id: String,
    pub command_tx: mpsc::Sender<RoomCommand>,
    pub player_count: Arc<AtomicUsize>,
    summary_rx: watch::Receiver<RoomSummary>,
}

impl RoomHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    /// Summary as of the last completed tick
    pub fn summary(&self) -> RoomSummary {
        self.summary_rx.borrow().clone()
    }

    /// Whether the room task has exited
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }
}

/// Room lookup failures
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} is unavailable")]
    Unavailable(String),
}

/// How many times a join is retried against a freshly created room
const JOIN_ATTEMPTS: usize = 3;

/// Registry of all live rooms
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    rules: Arc<GameRules>,
    idle_timeout: Option<Duration>,
}

impl RoomRegistry {
    pub fn new(rules: Arc<GameRules>, idle_timeout: Option<Duration>) -> Self {
        Self {
            rooms: DashMap::new(),
            rules,
            idle_timeout,
        }
    }

    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms
            .get(room_id)
            .map(|r| r.value().clone())
            .filter(|h| !h.is_closed())
    }

    /// Return the live room for `room_id`, starting one if needed
    pub fn get_or_create(self: &Arc<Self>, room_id: &str) -> RoomHandle {
        let mut entry = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| self.spawn_room(room_id));
        if entry.is_closed() {
            *entry = self.spawn_room(room_id);
        }
        entry.value().clone()
    }

    /// Join `player_id` into `room_id`, retrying if the room shut down mid-join
    pub async fn join(
        self: &Arc<Self>,
        room_id: &str,
        player_id: Uuid,
    ) -> Result<(RoomHandle, JoinAck), RoomError> {
        for _ in 0..JOIN_ATTEMPTS {
            let handle = self.get_or_create(room_id);
            let (reply, reply_rx) = oneshot::channel();

            if handle
                .command_tx
                .send(RoomCommand::Join { player_id, reply })
                .await
                .is_err()
            {
                continue;
            }
            if let Ok(ack) = reply_rx.await {
                return Ok((handle, ack));
            }
        }

        Err(RoomError::Unavailable(room_id.to_string()))
    }

    fn spawn_room(self: &Arc<Self>, room_id: &str) -> RoomHandle {
        let seed = rand::random::<u64>();
        let (room, handle) = GameRoom::new(room_id.to_string(), self.rules.clone(), seed, self.idle_timeout);

        info!(room_id = %room_id, "Created room");

        let registry = Arc::clone(self);
        let finished = handle.command_tx.clone();
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            room.run().await;
            registry.remove_if_same(&room_id, &finished);
            info!(room_id = %room_id, "Room removed from registry");
        });

        handle
    }

    /// Drop the entry only if it still points at the finished room
    fn remove_if_same(&self, room_id: &str, finished: &mpsc::Sender<RoomCommand>) {
        self.rooms
            .remove_if(room_id, |_, handle| handle.command_tx.same_channel(finished));
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().player_count()).sum()
    }
}

/// The authoritative room task
pub struct GameRoom {
    state: RoomState,
    command_rx: mpsc::Receiver<RoomCommand>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    summary_tx: watch::Sender<RoomSummary>,
    player_count: Arc<AtomicUsize>,
    idle_timeout: Option<Duration>,
    empty_since: Option<Instant>,
}

impl GameRoom {
    pub fn new(
        id: String,
        rules: Arc<GameRules>,
        seed: u64,
        idle_timeout: Option<Duration>,
    ) -> (Self, RoomHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(AtomicUsize::new(0));

        let state = RoomState::new(id.clone(), rules, seed);
        let (summary_tx, summary_rx) = watch::channel(state.summary());

        let handle = RoomHandle {
            id,
            command_tx,
            player_count: player_count.clone(),
            summary_rx,
        };

        let room = Self {
            state,
            command_rx,
            snapshot_tx,
            summary_tx,
            player_count,
            idle_timeout,
            empty_since: Some(Instant::now()),
        };

        (room, handle)
    }

    /// Run the tick loop, handling commands as they arrive between ticks
    pub async fn run(mut self) {
        info!(room_id = %self.state.id, wave = self.state.wave, "Room started");

        let mut tick_interval = interval(self.state.rules.tick);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    self.run_tick(unix_millis());

                    if self.idle_expired() {
                        info!(room_id = %self.state.id, "Room idle, shutting down");
                        break;
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                }
            }
        }
    }

    fn run_tick(&mut self, now: u64) {
        let report = self.state.tick(now);
        let tick = self.state.tick;

        if let Some(enemy_id) = &report.spawned {
            trace!(
                room_id = %self.state.id,
                tick,
                enemy_id = %enemy_id,
                pending = self.state.spawner.pending_spawns,
                "Enemy spawned"
            );
        }
        if report.purged > 0 {
            trace!(room_id = %self.state.id, tick, purged = report.purged, "Purged dead enemies");
        }

        for breach in &report.breaches {
            debug!(
                room_id = %self.state.id,
                enemy_id = %breach.enemy_id,
                tier = breach.tier,
                effect = breach.effect.as_deref().unwrap_or("none"),
                mood = self.state.mood,
                "Enemy breached"
            );
        }
        if let Some(wave) = report.wave_advanced {
            info!(
                room_id = %self.state.id,
                tick,
                wave,
                pending = self.state.spawner.pending_spawns,
                mood = self.state.mood,
                "Wave started"
            );
        }

        // Fire-and-forget: slow or closed connections never hold up the tick
        if self.snapshot_tx.receiver_count() > 0 {
            let _ = self.snapshot_tx.send(SnapshotBuilder::build(&self.state));
        }
        self.summary_tx.send_replace(self.state.summary());
    }

    fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { player_id, reply } => self.handle_join(player_id, reply),
            RoomCommand::Input(input) => self.handle_input(input),
            RoomCommand::Leave { player_id } => self.handle_leave(player_id),
        }
    }

    fn handle_join(&mut self, player_id: Uuid, reply: oneshot::Sender<JoinAck>) {
        self.state.add_player(player_id);
        let ack = JoinAck {
            welcome: SnapshotBuilder::build_welcome(&self.state, player_id),
            snapshots: self.snapshot_tx.subscribe(),
        };

        if reply.send(ack).is_err() {
            warn!(room_id = %self.state.id, player_id = %player_id, "Connection gone before join completed");
            self.state.remove_player(&player_id);
        } else {
            info!(
                room_id = %self.state.id,
                player_id = %player_id,
                player_count = self.state.players.len(),
                "Player joined room"
            );
        }

        self.sync_player_count();
    }

    fn handle_input(&mut self, input: PlayerInput) {
        let player_id = input.player_id;
        match input.msg {
            ClientMsg::SetName { name } => self.state.set_name(&player_id, name),
            ClientMsg::Move { dx, dir } => {
                self.state.apply_move(&player_id, dx.or(dir).unwrap_or(0.0))
            }
            ClientMsg::HitEnemy { enemy_id, damage } => {
                let outcome = self
                    .state
                    .apply_hit(&player_id, &enemy_id, damage, input.received_at);
                if let HitOutcome::Killed { score_awarded } = outcome {
                    debug!(
                        room_id = %self.state.id,
                        player_id = %player_id,
                        enemy_id = %enemy_id,
                        score_awarded,
                        "Enemy defeated"
                    );
                }
            }
        }
    }

    fn handle_leave(&mut self, player_id: Uuid) {
        if self.state.remove_player(&player_id).is_some() {
            info!(
                room_id = %self.state.id,
                player_id = %player_id,
                player_count = self.state.players.len(),
                "Player left room"
            );
            self.sync_player_count();
        }
    }

    fn sync_player_count(&mut self) {
        let count = self.state.players.len();
        self.player_count.store(count, Ordering::Relaxed);
        self.empty_since = match (count, self.empty_since) {
            (0, None) => Some(Instant::now()),
            (0, since) => since,
            _ => None,
        };
    }

    fn idle_expired(&self) -> bool {
        match (self.idle_timeout, self.empty_since) {
            (Some(timeout), Some(since)) => since.elapsed() >= timeout,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn room() -> RoomState {
        RoomState::new("default-room".to_string(), Arc::new(GameRules::default()), 42)
    }

    #[test]
    fn new_room_seeds_first_wave() {
        let room = room();
        assert_eq!(room.wave, 1);
        assert_eq!(room.mood, 100);
        assert_eq!(room.spawner.pending_spawns, 10);
        assert_eq!(room.spawner.spawn_interval_ms, 840);
        assert!(room.enemies.is_empty());
    }

    #[test]
    fn players_start_centered_on_the_lane() {
        let mut room = room();
        let id = Uuid::new_v4();
        let player = room.add_player(id).clone();
        assert_eq!(player.x, 440.0);
        assert_eq!(player.y, 460.0);
        assert_eq!(player.score, 0);
        assert_eq!(player.lives, 3);
        assert!(player.name.starts_with("Player-"));
        assert_eq!(player.name.len(), "Player-".len() + 3);
    }

    #[test]
    fn two_hits_defeat_stress_cloud_and_award_score() {
        let mut room = room();
        let shooter = Uuid::new_v4();
        room.add_player(shooter);
        let enemy_id = room.spawn_enemy("STRESS_CLOUD", Some(300.0), 0);

        let first = room.apply_hit(&shooter, &enemy_id, None, 10);
        assert_eq!(first, HitOutcome::Damaged { hp: 1 });
        assert!(room.enemies[0].alive);

        let second = room.apply_hit(&shooter, &enemy_id, None, 20);
        assert_eq!(second, HitOutcome::Killed { score_awarded: 50 });
        assert!(!room.enemies[0].alive);
        assert_eq!(room.enemies[0].hp, 0);
        assert_eq!(room.players[&shooter].score, 50);

        // Late duplicate changes nothing
        let third = room.apply_hit(&shooter, &enemy_id, Some(5.0), 30);
        assert_eq!(third, HitOutcome::Ignored);
        assert_eq!(room.players[&shooter].score, 50);
        assert_eq!(room.enemies[0].died_at, Some(20));
    }

    #[test]
    fn hits_from_unknown_players_or_on_unknown_enemies_are_ignored() {
        let mut room = room();
        let shooter = Uuid::new_v4();
        room.add_player(shooter);
        let enemy_id = room.spawn_enemy("BURNOUT_SHADOW", None, 0);

        assert_eq!(room.apply_hit(&Uuid::new_v4(), &enemy_id, None, 0), HitOutcome::Ignored);
        assert_eq!(room.apply_hit(&shooter, "e-999", None, 0), HitOutcome::Ignored);
        assert_eq!(room.enemies[0].hp, 6);
    }

    #[test]
    fn unknown_type_spawns_default_type() {
        let mut room = room();
        room.spawn_enemy("NOT_IN_CATALOG", None, 0);
        assert_eq!(room.enemies[0].type_id, "STRESS_CLOUD");
    }

    #[test]
    fn moves_stay_inside_the_lane() {
        let mut room = room();
        let id = Uuid::new_v4();
        room.add_player(id);

        room.apply_move(&id, 1.0);
        assert_eq!(room.players[&id].x, 454.0);
        assert_eq!(room.players[&id].dir, 1.0);

        for _ in 0..100 {
            room.apply_move(&id, 5.0);
        }
        assert_eq!(room.players[&id].x, 860.0);

        for _ in 0..100 {
            room.apply_move(&id, -1.0);
        }
        assert_eq!(room.players[&id].x, 20.0);

        room.apply_move(&id, f64::NAN);
        assert_eq!(room.players[&id].x, 20.0);
    }

    #[test]
    fn high_tier_breach_clamps_mood_at_zero() {
        let mut room = room();
        room.mood = 10;
        let enemy_id = room.spawn_enemy("BURNOUT_SHADOW", Some(400.0), 0);
        room.enemies[0].y = 429.5;

        let report = room.tick(1_000);

        assert_eq!(report.breaches.len(), 1);
        assert_eq!(report.breaches[0].enemy_id, enemy_id);
        assert_eq!(report.breaches[0].mood_penalty, 12);
        assert_eq!(room.mood, 0);
        let enemy = room.enemies.iter().find(|e| e.id == enemy_id).unwrap();
        assert!(enemy.breached);
        assert!(!enemy.alive);
        assert_eq!(enemy.died_at, Some(1_000));
    }

    #[test]
    fn breached_enemy_penalizes_only_once() {
        let mut room = room();
        let enemy_id = room.spawn_enemy("STRESS_CLOUD", Some(400.0), 0);
        room.enemies[0].y = 500.0;

        room.tick(100);
        assert_eq!(room.mood, 100 - 8);
        room.tick(150);
        room.tick(200);
        assert_eq!(room.mood, 100 - 8);
        assert!(room.enemies.iter().any(|e| e.id == enemy_id));
    }

    #[test]
    fn dead_enemies_linger_for_the_grace_window() {
        let mut room = room();
        let shooter = Uuid::new_v4();
        room.add_player(shooter);
        let enemy_id = room.spawn_enemy("RUMOR_BUBBLE", Some(400.0), 0);
        room.apply_hit(&shooter, &enemy_id, None, 1_000);

        room.tick(2_900);
        assert!(room.enemies.iter().any(|e| e.id == enemy_id));

        let report = room.tick(3_000);
        assert!(room.enemies.iter().all(|e| e.id != enemy_id));
        assert_eq!(report.purged, 1);
    }

    #[test]
    fn cleared_wave_advances_on_next_tick() {
        let mut room = room();
        let shooter = Uuid::new_v4();
        room.add_player(shooter);
        room.spawner.pending_spawns = 0;
        let enemy_id = room.spawn_enemy("RUMOR_BUBBLE", Some(400.0), 0);
        room.apply_hit(&shooter, &enemy_id, None, 0);

        let report = room.tick(100);

        assert_eq!(report.wave_advanced, Some(2));
        assert_eq!(room.wave, 2);
        assert_eq!(room.spawner.pending_spawns, 12);
        assert_eq!(room.spawner.last_spawn_at, None);
        assert!(room.enemies.is_empty());
    }

    #[test]
    fn waves_past_the_plan_get_bonus_enemies() {
        let mut room = room();
        room.wave = 4;
        room.spawner.pending_spawns = 0;

        room.tick(0);

        assert_eq!(room.wave, 5);
        assert_eq!(room.spawner.pending_spawns, 11);
    }

    #[test]
    fn wave_does_not_advance_while_enemies_live() {
        let mut room = room();
        room.spawner.pending_spawns = 0;
        room.spawn_enemy("BURNOUT_SHADOW", Some(400.0), 0);

        let report = room.tick(50);
        assert!(report.wave_advanced.is_none());
        assert_eq!(room.wave, 1);
    }

    #[test]
    fn spawns_are_paced_by_the_wave_interval() {
        let mut room = room();
        room.wave = 3;
        room.seed_wave();
        assert_eq!(room.spawner.spawn_interval_ms, 720);
        assert_eq!(room.spawner.pending_spawns, 14);

        let mut spawned_at = Vec::new();
        let mut now = 10_000;
        while now <= 10_000 + 13 * 720 {
            if room.tick(now).spawned.is_some() {
                spawned_at.push(now);
            }
            now += 40;
        }

        assert_eq!(spawned_at.len(), 14);
        assert_eq!(room.spawner.pending_spawns, 0);
        for pair in spawned_at.windows(2) {
            assert!(pair[1] - pair[0] >= 720);
        }
    }

    #[test]
    fn enemy_ids_are_never_reused() {
        let mut room = room();
        let first = room.spawn_enemy("STRESS_CLOUD", None, 0);
        room.spawner.pending_spawns = 0;
        room.enemies[0].alive = false;
        room.tick(100);
        assert_eq!(room.wave, 2);

        let second = room.spawn_enemy("STRESS_CLOUD", None, 100);
        assert_eq!(first, "e-0");
        assert_eq!(second, "e-1");
    }

    #[test]
    fn invariants_hold_under_random_play() {
        let mut room = room();
        let players: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &players {
            room.add_player(*id);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut now = 0;
        let mut last_hp: HashMap<String, u32> = HashMap::new();
        let mut last_score: HashMap<Uuid, u64> = HashMap::new();

        for _ in 0..4_000 {
            let player = players[rng.gen_range(0..players.len())];
            match rng.gen_range(0..4) {
                0 => room.apply_move(&player, rng.gen_range(-3.0..3.0)),
                1 => {
                    let target = format!("e-{}", rng.gen_range(0..=room.enemy_counter));
                    room.apply_hit(&player, &target, Some(rng.gen_range(0.0..3.0)), now);
                }
                _ => {
                    now += 50;
                    room.tick(now);
                }
            }

            assert!(room.mood <= 100);
            for p in room.players.values() {
                assert!(p.x >= 20.0 && p.x <= 860.0);
                let prev = last_score.insert(p.id, p.score).unwrap_or(0);
                assert!(p.score >= prev);
            }
            for e in &room.enemies {
                let prev = last_hp.insert(e.id.clone(), e.hp).unwrap_or(e.max_hp);
                assert!(e.hp <= prev);
                assert!(!(e.alive && e.breached));
            }
        }
    }

    #[test]
    fn browser_move_payload_steps_the_player() {
        let (mut game, _handle) =
            GameRoom::new("default-room".to_string(), Arc::new(GameRules::default()), 7, None);
        let id = Uuid::new_v4();
        game.state.add_player(id);

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"move","dx":1,"dy":0,"dir":1}"#).unwrap();
        game.handle_input(PlayerInput {
            player_id: id,
            msg,
            received_at: 0,
        });

        let player = &game.state.players[&id];
        assert_eq!(player.x, 454.0);
        assert_eq!(player.dir, 1.0);
    }

    #[test]
    fn tick_counter_advances_once_per_step() {
        let mut room = room();
        for now in [0, 50, 100] {
            room.tick(now);
        }
        assert_eq!(room.tick, 3);
    }

    #[tokio::test]
    async fn join_sends_welcome_then_periodic_frames() {
        let rules = Arc::new(GameRules::default());
        let registry = Arc::new(RoomRegistry::new(rules, None));
        let player_id = Uuid::new_v4();

        let (handle, mut ack) = tokio_test::assert_ok!(registry.join("default-room", player_id).await);

        let ServerMsg::State(welcome) = ack.welcome else {
            panic!("expected state frame");
        };
        assert_eq!(welcome.player_id, Some(player_id));
        assert_eq!(welcome.room_id.as_deref(), Some("default-room"));
        assert_eq!(welcome.players.len(), 1);

        let frame = tokio::time::timeout(Duration::from_secs(2), ack.snapshots.recv())
            .await
            .unwrap()
            .unwrap();
        let ServerMsg::State(frame) = frame else {
            panic!("expected state frame");
        };
        assert!(frame.player_id.is_none());
        assert!(frame.players.iter().any(|p| p.id == player_id));

        assert_eq!(registry.active_rooms(), 1);
        assert_eq!(registry.total_players(), 1);

        handle
            .command_tx
            .send(RoomCommand::Leave { player_id })
            .await
            .unwrap();
        for _ in 0..50 {
            if registry.total_players() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.total_players(), 0);
    }

    #[tokio::test]
    async fn idle_rooms_are_evicted_and_recreated() {
        let rules = Arc::new(GameRules::default());
        let registry = Arc::new(RoomRegistry::new(rules, Some(Duration::from_millis(100))));

        let first = registry.get_or_create("default-room");
        for _ in 0..100 {
            if registry.get("default-room").is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(first.is_closed());
        assert!(registry.get("default-room").is_none());

        let (handle, ack) = registry.join("default-room", Uuid::new_v4()).await.unwrap();
        assert!(!handle.is_closed());
        let ServerMsg::State(welcome) = ack.welcome else {
            panic!("expected state frame");
        };
        assert_eq!(welcome.wave, 1);
    }
}
