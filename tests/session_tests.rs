use std::sync::Arc;

use battleship_server::transport::in_memory::{pair, ChannelReader, ChannelWriter};
use battleship_server::transport::{Inbound, Outbound};
use battleship_server::{
    run_session, ClientMessage, Coord, Difficulty, MatchConfig, MatchRegistry, Orientation,
    Profile, Scoreboard, ServerMessage, SessionConfig, ShipPlacement, PROTOCOL_VERSION,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

struct TestClient {
    reader: ChannelReader<ServerMessage>,
    writer: ChannelWriter<ClientMessage>,
    session: JoinHandle<()>,
}

impl TestClient {
    fn connect(registry: &Arc<MatchRegistry>, config: SessionConfig) -> Self {
        let ((server_reader, server_writer), (reader, writer)) =
            pair::<ClientMessage, ServerMessage>();
        let session = tokio::spawn(run_session(
            Arc::clone(registry),
            server_reader,
            server_writer,
            config,
        ));
        Self {
            reader,
            writer,
            session,
        }
    }

    async fn send(&mut self, msg: ClientMessage) {
        self.writer.send(msg).await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        timeout(Duration::from_secs(5), self.reader.recv())
            .await
            .expect("timed out waiting for the server")
            .unwrap()
    }

    async fn join(&mut self, name: &str) {
        self.send(ClientMessage::Join {
            version: PROTOCOL_VERSION,
            name: name.to_string(),
            difficulty: Difficulty::Easy,
        })
        .await;
    }
}

fn registry() -> Arc<MatchRegistry> {
    Arc::new(MatchRegistry::new(
        MatchConfig {
            seed: Some(3),
            fixed_profile: Some(Profile::custom(Difficulty::Easy, 6, &[2, 1])),
            ..MatchConfig::default()
        },
        Arc::new(Scoreboard::in_memory()),
    ))
}

fn fleet() -> Vec<ShipPlacement> {
    vec![
        ShipPlacement::new(2, Orientation::Horizontal, Coord::new(0, 0)),
        ShipPlacement::new(1, Orientation::Horizontal, Coord::new(5, 5)),
    ]
}

async fn wait_for_no_match(registry: &MatchRegistry) {
    for _ in 0..100 {
        if registry.active_match().await.is_none() {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("match was never destroyed");
}

/// Two joined clients, both past `start_placement`.
async fn two_players(registry: &Arc<MatchRegistry>) -> (TestClient, TestClient) {
    let mut alice = TestClient::connect(registry, SessionConfig::default());
    alice.join("alice").await;
    assert_eq!(alice.recv().await, ServerMessage::WaitingForOpponent);

    let mut bob = TestClient::connect(registry, SessionConfig::default());
    bob.join("bob").await;
    assert!(matches!(alice.recv().await, ServerMessage::StartPlacement { .. }));
    assert!(matches!(bob.recv().await, ServerMessage::StartPlacement { .. }));
    (alice, bob)
}

#[tokio::test]
async fn test_third_client_is_turned_away() {
    let registry = registry();
    let (_alice, _bob) = two_players(&registry).await;

    let mut carol = TestClient::connect(&registry, SessionConfig::default());
    assert_eq!(carol.recv().await, ServerMessage::ServerFull);
    assert!(carol.reader.recv().await.is_err());
    timeout(Duration::from_secs(5), carol.session)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_closed_client_forfeits() {
    let registry = registry();
    let (mut alice, mut bob) = two_players(&registry).await;
    alice.send(ClientMessage::SubmitPlacement { ships: fleet() }).await;
    assert_eq!(alice.recv().await, ServerMessage::WaitingForOpponent);
    bob.send(ClientMessage::SubmitPlacement { ships: fleet() }).await;
    assert!(matches!(alice.recv().await, ServerMessage::GameStart { .. }));
    assert!(matches!(bob.recv().await, ServerMessage::GameStart { .. }));

    alice.writer.close().await.unwrap();
    assert_eq!(
        bob.recv().await,
        ServerMessage::OpponentDisconnected { forfeit_win: true }
    );
    timeout(Duration::from_secs(5), alice.session)
        .await
        .unwrap()
        .unwrap();

    // The remaining player keeps the match; a newcomer takes the free seat.
    let mut carol = TestClient::connect(&registry, SessionConfig::default());
    carol.join("carol").await;
    assert!(matches!(
        bob.recv().await,
        ServerMessage::StartPlacement { opponent_name, .. } if opponent_name == "carol"
    ));
    assert!(matches!(carol.recv().await, ServerMessage::StartPlacement { .. }));
}

#[tokio::test]
async fn test_disconnect_message_notifies_once() {
    let registry = registry();
    let (mut alice, mut bob) = two_players(&registry).await;

    alice.send(ClientMessage::Disconnect).await;
    assert_eq!(
        bob.recv().await,
        ServerMessage::OpponentDisconnected { forfeit_win: false }
    );
    assert!(alice.reader.recv().await.is_err());

    bob.send(ClientMessage::RequestRestart).await;
    assert!(matches!(bob.recv().await, ServerMessage::Error { .. }));
}

#[tokio::test]
async fn test_failed_send_tears_down_session() {
    let registry = registry();
    let mut alice = TestClient::connect(&registry, SessionConfig::default());
    alice.join("alice").await;
    assert_eq!(alice.recv().await, ServerMessage::WaitingForOpponent);

    // Alice stops listening; the next event for her cannot be delivered.
    let TestClient {
        reader,
        writer: _alice_writer,
        session: alice_session,
    } = alice;
    drop(reader);

    let mut bob = TestClient::connect(&registry, SessionConfig::default());
    bob.join("bob").await;
    assert!(matches!(bob.recv().await, ServerMessage::StartPlacement { .. }));
    assert_eq!(
        bob.recv().await,
        ServerMessage::OpponentDisconnected { forfeit_win: false }
    );
    timeout(Duration::from_secs(5), alice_session)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_idle_client_is_dropped() {
    let registry = registry();
    let config = SessionConfig {
        idle_timeout: Some(Duration::from_millis(100)),
        ..SessionConfig::default()
    };
    let mut idle = TestClient::connect(&registry, config);
    assert!(timeout(Duration::from_secs(5), idle.reader.recv())
        .await
        .unwrap()
        .is_err());
    wait_for_no_match(&registry).await;
}

#[tokio::test]
async fn test_empty_match_is_replaced() {
    let registry = registry();
    let (alice, bob) = two_players(&registry).await;
    let first = registry.active_match().await.unwrap();

    for mut client in [alice, bob] {
        client.send(ClientMessage::Disconnect).await;
        timeout(Duration::from_secs(5), client.session)
            .await
            .unwrap()
            .unwrap();
    }
    wait_for_no_match(&registry).await;

    let mut carol = TestClient::connect(&registry, SessionConfig::default());
    carol.join("carol").await;
    assert_eq!(carol.recv().await, ServerMessage::WaitingForOpponent);
    let second = registry.active_match().await.unwrap();
    assert_ne!(first, second);
}
