//! Game simulation modules

pub mod catalog;
pub mod combat;
pub mod enemy;
pub mod movement;
pub mod room;
pub mod rules;
pub mod snapshot;
pub mod spawn;
pub mod wave;

pub use room::{RoomCommand, RoomHandle, RoomRegistry, RoomSummary};
pub use rules::GameRules;

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub player_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}
