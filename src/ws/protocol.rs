//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::catalog::MovementPattern;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Change the display name
    SetName { name: String },

    /// Step along the lane (-1.0 = full left, 1.0 = full right).
    /// Clients may send `dir` next to or instead of `dx`; `dx` wins.
    Move {
        #[serde(default)]
        dx: Option<f64>,
        #[serde(default)]
        dir: Option<f64>,
    },

    /// Report a hit on an enemy
    HitEnemy {
        #[serde(rename = "enemyId")]
        enemy_id: String,
        /// Defaults to 1 when absent
        #[serde(default)]
        damage: Option<f64>,
    },
}

impl ClientMsg {
    /// Lane step requested by a `move`, preferring `dx` over `dir`
    pub fn move_step(&self) -> Option<f64> {
        match self {
            ClientMsg::Move { dx, dir } => Some(dx.or(*dir).unwrap_or(0.0)),
            _ => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Full room state, sent after every tick
    State(StateSnapshot),

    /// Connection-level failure sent right before closing
    Error { code: String, message: String },
}

/// Room state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Only set on the first frame of a connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub players: Vec<PlayerSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
    pub wave: u32,
    pub team_mood: u32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub score: u64,
    pub lives: u32,
    pub hp: u32,
    /// Last movement direction
    pub dir: f32,
    pub name: String,
}

/// Enemy state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemySnapshot {
    pub id: String,
    pub type_id: String,
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub max_hp: u32,
    pub alive: bool,
    pub breached: bool,
    pub tier: u8,
    pub movement_pattern: MovementPattern,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_messages() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"setName","name":"Ada"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::SetName { name } if name == "Ada"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"move","dx":-1}"#).unwrap();
        assert_eq!(msg.move_step(), Some(-1.0));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"move","dir":0.5}"#).unwrap();
        assert_eq!(msg.move_step(), Some(0.5));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"move"}"#).unwrap();
        assert_eq!(msg.move_step(), Some(0.0));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"hitEnemy","enemyId":"e-3"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::HitEnemy { ref enemy_id, damage: None } if enemy_id == "e-3"));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"hitEnemy","enemyId":"e-3","damage":2}"#).unwrap();
        assert!(matches!(msg, ClientMsg::HitEnemy { damage: Some(d), .. } if d == 2.0));
    }

    #[test]
    fn move_with_both_dx_and_dir_parses() {
        // Browser client sends every key at once
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"move","dx":1,"dy":0,"dir":1}"#).unwrap();
        assert_eq!(msg.move_step(), Some(1.0));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"move","dx":-0.25,"dy":0,"dir":1}"#).unwrap();
        assert_eq!(msg.move_step(), Some(-0.25));
    }

    #[test]
    fn rejects_unknown_and_malformed_messages() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport","x":4}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"hitEnemy"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
    }

    #[test]
    fn state_frame_uses_camel_case_and_omits_welcome_fields() {
        let snapshot = StateSnapshot {
            player_id: None,
            room_id: None,
            players: Vec::new(),
            enemies: vec![EnemySnapshot {
                id: "e-0".to_string(),
                type_id: "STRESS_CLOUD".to_string(),
                x: 100.0,
                y: -20.0,
                hp: 2,
                max_hp: 2,
                alive: true,
                breached: false,
                tier: 1,
                movement_pattern: MovementPattern::Sine,
            }],
            wave: 2,
            team_mood: 88,
        };

        let json = serde_json::to_value(ServerMsg::State(snapshot)).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["teamMood"], 88);
        assert_eq!(json["wave"], 2);
        assert_eq!(json["enemies"][0]["typeId"], "STRESS_CLOUD");
        assert_eq!(json["enemies"][0]["movementPattern"], "sine");
        assert!(json.get("playerId").is_none());
        assert!(json.get("roomId").is_none());
    }
}
