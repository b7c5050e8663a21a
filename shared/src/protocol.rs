use serde::{Deserialize, Serialize};
use ts_rs::TS;

// === Payloads ===

/// Device orientation sample streamed by the controller (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
pub struct GyroData {
    pub beta: f64,
    pub gamma: f64,
}

/// Acknowledgment for `create-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub room_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

impl CreateRoomAck {
    pub fn ok(room_code: impl Into<String>) -> Self {
        Self {
            success: true,
            room_code: Some(room_code.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            room_code: None,
            error: Some(error.into()),
        }
    }
}

/// Acknowledgment for `join-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
pub struct JoinRoomAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

impl JoinRoomAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "create-room-result")]
    CreateRoomResult(CreateRoomAck),
    #[serde(rename = "join-room-result")]
    JoinRoomResult(JoinRoomAck),
    /// Orientation relayed to the game.
    #[serde(rename = "gyro-update")]
    GyroUpdate(GyroData),
    #[serde(rename = "player-shoot")]
    PlayerShoot,
    #[serde(rename = "controller-connected")]
    ControllerConnected,
    /// The room stays open and can accept another controller.
    #[serde(rename = "controller-disconnected")]
    ControllerDisconnected,
    /// The game left or its room expired; the controller is unpaired.
    #[serde(rename = "game-disconnected")]
    GameDisconnected,
    /// Sent to the game when the sweep deletes its room.
    #[serde(rename = "room-expired")]
    RoomExpired,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "create-room")]
    CreateRoom,
    #[serde(rename = "join-room")]
    JoinRoom {
        #[serde(rename = "roomCode")]
        room_code: String,
    },
    #[serde(rename = "gyro-data")]
    GyroData(GyroData),
    #[serde(rename = "shoot")]
    Shoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_result_omits_absent_fields() {
        let json = serde_json::to_string(&ServerMsg::CreateRoomResult(CreateRoomAck::ok("4821")))
            .unwrap();
        assert_eq!(
            json,
            r#"{"type":"create-room-result","success":true,"roomCode":"4821"}"#
        );

        let json = serde_json::to_string(&ServerMsg::CreateRoomResult(CreateRoomAck::err(
            "No hay salas disponibles",
        )))
        .unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("\"error\":\"No hay salas disponibles\""));
        assert!(!json.contains("roomCode"));
    }

    #[test]
    fn join_room_result_carries_error_text() {
        let json = serde_json::to_string(&ServerMsg::JoinRoomResult(JoinRoomAck::err(
            "Sala no encontrada",
        )))
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"join-room-result","success":false,"error":"Sala no encontrada"}"#
        );
    }

    #[test]
    fn gyro_update_is_flat() {
        let json = serde_json::to_string(&ServerMsg::GyroUpdate(GyroData {
            beta: 10.0,
            gamma: -5.0,
        }))
        .unwrap();
        assert_eq!(json, r#"{"type":"gyro-update","beta":10.0,"gamma":-5.0}"#);
    }

    #[test]
    fn lifecycle_notifications_have_no_payload() {
        for (msg, tag) in [
            (ServerMsg::PlayerShoot, "player-shoot"),
            (ServerMsg::ControllerConnected, "controller-connected"),
            (ServerMsg::ControllerDisconnected, "controller-disconnected"),
            (ServerMsg::GameDisconnected, "game-disconnected"),
            (ServerMsg::RoomExpired, "room-expired"),
        ] {
            let json = serde_json::to_string(&msg).unwrap();
            assert_eq!(json, format!(r#"{{"type":"{}"}}"#, tag));
        }
    }

    #[test]
    fn parses_controller_messages() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"join-room","roomCode":"4821"}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMsg::JoinRoom {
                room_code: "4821".to_string()
            }
        );

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"gyro-data","beta":12.5,"gamma":-3}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::GyroData(GyroData {
                beta: 12.5,
                gamma: -3.0
            })
        );

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"shoot"}"#).unwrap();
        assert_eq!(msg, ClientMsg::Shoot);
    }

    #[test]
    fn gyro_data_ignores_extra_fields() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"gyro-data","beta":1.0,"gamma":2.0,"alpha":90.0}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMsg::GyroData(GyroData {
                beta: 1.0,
                gamma: 2.0
            })
        );
    }

    #[test]
    fn parses_create_room() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"create-room"}"#).unwrap();
        assert_eq!(msg, ClientMsg::CreateRoom);
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"fire"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"gyro-data","beta":1}"#).is_err());
    }
}
