//! Match registry: owns the active match and hands seats to new connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

use crate::config::MatchConfig;
use crate::game::{ConnectionId, Envelope, Match, Seat};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::scoreboard::Scoreboard;

/// Queue feeding one connection's writer task.
pub type Outbox = UnboundedSender<ServerMessage>;

/// Result of asking the registry for a seat.
pub enum Admission {
    Seated { room: Arc<Room>, seat: Seat },
    Full,
}

/// A match together with the outboxes of its seated connections.
///
/// One lock covers both, so every request is applied and its events queued
/// before the next request from either player is looked at.
pub struct Room {
    id: u64,
    inner: Mutex<RoomState>,
}

struct RoomState {
    game: Match,
    peers: HashMap<ConnectionId, Outbox>,
}

impl RoomState {
    fn dispatch(&self, events: Vec<Envelope>) {
        for Envelope { to, message } in events {
            let kind = message.kind();
            match self.peers.get(&to) {
                Some(outbox) => {
                    if outbox.send(message).is_err() {
                        debug!("Connection {}: outbox closed, dropped {}", to, kind);
                    }
                }
                None => debug!("Connection {}: no outbox for {}", to, kind),
            }
        }
    }
}

impl Room {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Apply one request and queue the resulting events.
    pub async fn handle(&self, conn: ConnectionId, request: ClientMessage) {
        let mut state = self.inner.lock().await;
        let events = state.game.handle(conn, request);
        state.dispatch(events);
    }

    /// Remove `conn` from the match. Returns `true` when nobody is left.
    pub async fn leave(&self, conn: ConnectionId) -> bool {
        let mut state = self.inner.lock().await;
        let events = state.game.leave(conn);
        state.peers.remove(&conn);
        state.dispatch(events);
        state.game.is_abandoned()
    }
}

struct RegistryState {
    active: Option<Arc<Room>>,
    next_match_id: u64,
}

/// Process-wide owner of the match lifecycle.
pub struct MatchRegistry {
    config: MatchConfig,
    scoreboard: Arc<Scoreboard>,
    state: Mutex<RegistryState>,
    next_connection: AtomicU64,
}

impl MatchRegistry {
    pub fn new(config: MatchConfig, scoreboard: Arc<Scoreboard>) -> Self {
        Self {
            config,
            scoreboard,
            state: Mutex::new(RegistryState {
                active: None,
                next_match_id: 1,
            }),
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn scoreboard(&self) -> &Arc<Scoreboard> {
        &self.scoreboard
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    /// Seat `conn` in the active match, creating one if none is live.
    pub async fn admit(&self, conn: ConnectionId, outbox: Outbox) -> Admission {
        let mut registry = self.state.lock().await;

        if let Some(room) = registry.active.clone() {
            let mut state = room.inner.lock().await;
            if !state.game.is_abandoned() {
                return match state.game.connect(conn) {
                    Some(seat) => {
                        state.peers.insert(conn, outbox);
                        drop(state);
                        Admission::Seated { room, seat }
                    }
                    None => {
                        info!("Connection {}: match {} is full", conn, room.id);
                        Admission::Full
                    }
                };
            }
        }

        let id = registry.next_match_id;
        registry.next_match_id += 1;
        let mut game = Match::new(id, self.config.clone(), Arc::clone(&self.scoreboard));
        let Some(seat) = game.connect(conn) else {
            return Admission::Full;
        };
        info!("Match {} created", id);
        let mut peers = HashMap::new();
        peers.insert(conn, outbox);
        let room = Arc::new(Room {
            id,
            inner: Mutex::new(RoomState { game, peers }),
        });
        registry.active = Some(Arc::clone(&room));
        Admission::Seated { room, seat }
    }

    /// Destroy `room` if it is still the active match and nobody is seated.
    pub async fn release(&self, room: &Arc<Room>) {
        let mut registry = self.state.lock().await;
        let Some(active) = registry.active.as_ref() else {
            return;
        };
        if active.id != room.id {
            return;
        }
        if room.inner.lock().await.game.is_abandoned() {
            info!("Match {} destroyed", room.id);
            registry.active = None;
        }
    }

    /// Id of the active match, if any.
    pub async fn active_match(&self) -> Option<u64> {
        self.state.lock().await.active.as_ref().map(|r| r.id)
    }
}
