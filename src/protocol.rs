//! Logical message set exchanged between clients and the match server.

use serde::{Deserialize, Serialize};

use crate::board::BoardView;
use crate::common::Coord;
use crate::config::Difficulty;
use crate::scoreboard::ScoreEntry;
use crate::ship::ShipPlacement;

/// Version carried by `join`; a client speaking another version is turned away.
pub const PROTOCOL_VERSION: u32 = 1;

/// Requests sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    Join {
        version: u32,
        name: String,
        difficulty: Difficulty,
    },
    SubmitPlacement {
        ships: Vec<ShipPlacement>,
    },
    Shoot {
        coord: Coord,
    },
    RequestRestart,
    AcceptRestart,
    DeclineRestart,
    Disconnect,
}

/// Events pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    WaitingForOpponent,
    StartPlacement {
        board_size: u8,
        ship_lengths: Vec<u8>,
        difficulty: Difficulty,
        opponent_name: String,
    },
    GameStart {
        your_turn: bool,
        your_board: BoardView,
    },
    TurnUpdate {
        your_turn: bool,
    },
    ShotResult {
        coord: Coord,
        hit: bool,
        sunk: bool,
        your_turn_continues: bool,
    },
    OpponentShot {
        coord: Coord,
        hit: bool,
        sunk: bool,
        your_board: BoardView,
    },
    GameOver {
        winner_name: String,
        scoreboard: Vec<ScoreEntry>,
    },
    RestartRequest {
        from_name: String,
    },
    RestartDeclined {
        from_name: String,
    },
    OpponentDisconnected {
        forfeit_win: bool,
    },
    ServerFull,
    Error {
        code: ErrorCode,
        message: String,
    },
}

/// Reason code carried by `ServerMessage::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    ProtocolViolation,
    VersionMismatch,
    InvalidName,
    NotYourTurn,
    InvalidPlacement,
    ShotOutOfBounds,
    AlreadyShot,
}

impl ServerMessage {
    /// Short tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::WaitingForOpponent => "waiting_for_opponent",
            ServerMessage::StartPlacement { .. } => "start_placement",
            ServerMessage::GameStart { .. } => "game_start",
            ServerMessage::TurnUpdate { .. } => "turn_update",
            ServerMessage::ShotResult { .. } => "shot_result",
            ServerMessage::OpponentShot { .. } => "opponent_shot",
            ServerMessage::GameOver { .. } => "game_over",
            ServerMessage::RestartRequest { .. } => "restart_request",
            ServerMessage::RestartDeclined { .. } => "restart_declined",
            ServerMessage::OpponentDisconnected { .. } => "opponent_disconnected",
            ServerMessage::ServerFull => "server_full",
            ServerMessage::Error { .. } => "error",
        }
    }
}
