//! WebSocket transport for the game protocol

pub mod handler;
pub mod protocol;
