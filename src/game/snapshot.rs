//! Snapshot building for network transmission

use uuid::Uuid;

use crate::ws::protocol::{EnemySnapshot, PlayerSnapshot, ServerMsg, StateSnapshot};

use super::room::RoomState;

/// Builds state frames from authoritative room state
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Periodic frame broadcast after every tick
    pub fn build(state: &RoomState) -> ServerMsg {
        ServerMsg::State(Self::snapshot(state))
    }

    /// First frame of a connection, carrying its player and room ids
    pub fn build_welcome(state: &RoomState, player_id: Uuid) -> ServerMsg {
        let mut snapshot = Self::snapshot(state);
        snapshot.player_id = Some(player_id);
        snapshot.room_id = Some(state.id.clone());
        ServerMsg::State(snapshot)
    }

    fn snapshot(state: &RoomState) -> StateSnapshot {
        let players = state
            .players
            .values()
            .map(|p| PlayerSnapshot {
                id: p.id,
                x: p.x,
                y: p.y,
                score: p.score,
                lives: p.lives,
                hp: p.hp,
                dir: p.dir,
                name: p.name.clone(),
            })
            .collect();

        let enemies = state
            .enemies
            .iter()
            .map(|e| EnemySnapshot {
                id: e.id.clone(),
                type_id: e.type_id.clone(),
                x: e.x,
                y: e.y,
                hp: e.hp,
                max_hp: e.max_hp,
                alive: e.alive,
                breached: e.breached,
                tier: e.tier,
                movement_pattern: e.movement_pattern,
            })
            .collect();

        StateSnapshot {
            player_id: None,
            room_id: None,
            players,
            enemies,
            wave: state.wave,
            team_mood: state.mood,
        }
    }
}
