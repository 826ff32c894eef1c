use battleship_server::{
    Board, ClientMessage, Coord, Difficulty, ErrorCode, Orientation, PlacementError, Profile,
    ProtocolError, Rejection, ScoreEntry, ServerMessage, ShipPlacement, ShotError,
    PROTOCOL_VERSION,
};

fn roundtrip<T>(msg: &T) -> T
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let bytes = bincode::serialize(msg).unwrap();
    bincode::deserialize(&bytes).unwrap()
}

#[test]
fn test_client_messages_survive_encoding() {
    let messages = vec![
        ClientMessage::Join {
            version: PROTOCOL_VERSION,
            name: "Zoë".to_string(),
            difficulty: Difficulty::Hard,
        },
        ClientMessage::SubmitPlacement {
            ships: vec![
                ShipPlacement::new(5, Orientation::Horizontal, Coord::new(0, 0)),
                ShipPlacement::new(2, Orientation::Vertical, Coord::new(14, 255)),
            ],
        },
        ClientMessage::Shoot {
            coord: Coord::new(255, 0),
        },
        ClientMessage::RequestRestart,
        ClientMessage::AcceptRestart,
        ClientMessage::DeclineRestart,
        ClientMessage::Disconnect,
    ];
    for msg in &messages {
        assert_eq!(&roundtrip(msg), msg);
    }
}

#[test]
fn test_server_messages_survive_encoding() {
    let profile = Profile::custom(Difficulty::Easy, 10, &[3, 2]);
    let mut board = Board::validate_and_place(
        &profile,
        &[
            ShipPlacement::new(3, Orientation::Horizontal, Coord::new(0, 0)),
            ShipPlacement::new(2, Orientation::Vertical, Coord::new(5, 5)),
        ],
    )
    .unwrap();
    board.apply_shot(Coord::new(0, 1)).unwrap();
    board.apply_shot(Coord::new(9, 9)).unwrap();

    let messages = vec![
        ServerMessage::WaitingForOpponent,
        ServerMessage::StartPlacement {
            board_size: 10,
            ship_lengths: vec![3, 2],
            difficulty: Difficulty::Medium,
            opponent_name: "bob".to_string(),
        },
        ServerMessage::GameStart {
            your_turn: true,
            your_board: board.view(),
        },
        ServerMessage::OpponentShot {
            coord: Coord::new(9, 9),
            hit: false,
            sunk: false,
            your_board: board.view(),
        },
        ServerMessage::GameOver {
            winner_name: "alice".to_string(),
            scoreboard: vec![ScoreEntry::now("alice", "bob", Difficulty::Easy)],
        },
        ServerMessage::OpponentDisconnected { forfeit_win: true },
        ServerMessage::ServerFull,
        ServerMessage::Error {
            code: ErrorCode::AlreadyShot,
            message: "Cell (0, 1) was already shot".to_string(),
        },
    ];
    for msg in &messages {
        assert_eq!(&roundtrip(msg), msg);
    }
}

#[test]
fn test_rejection_codes() {
    let cases = [
        (
            Rejection::from(ProtocolError::VersionMismatch {
                expected: 1,
                got: 2,
            }),
            ErrorCode::VersionMismatch,
        ),
        (ProtocolError::InvalidName.into(), ErrorCode::InvalidName),
        (ProtocolError::NotYourTurn.into(), ErrorCode::NotYourTurn),
        (ProtocolError::AlreadyReady.into(), ErrorCode::ProtocolViolation),
        (
            PlacementError::UnableToPlace.into(),
            ErrorCode::InvalidPlacement,
        ),
        (
            ShotError::OutOfBounds(Coord::new(20, 0)).into(),
            ErrorCode::ShotOutOfBounds,
        ),
        (
            ShotError::AlreadyShot(Coord::new(1, 1)).into(),
            ErrorCode::AlreadyShot,
        ),
    ];
    for (rejection, code) in cases {
        assert_eq!(rejection.code(), code, "{}", rejection);
    }
}

#[test]
fn test_message_kinds() {
    assert_eq!(ServerMessage::ServerFull.kind(), "server_full");
    assert_eq!(
        ServerMessage::TurnUpdate { your_turn: false }.kind(),
        "turn_update"
    );
}
