//! Match state machine: one two-player session from lobby to rematch.
//!
//! `Match` is plain data driven by `handle`/`leave`. Every call either mutates
//! the match and returns the events it produced, or rejects the request with a
//! single `error` event addressed to the caller and leaves the match untouched.
//! Callers are expected to serialise calls; the registry wraps each match in
//! one lock for that purpose.

use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::Board;
use crate::common::{Coord, ProtocolError, Rejection};
use crate::config::{Difficulty, MatchConfig, Profile, MAX_NAME_LEN};
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::scoreboard::{ScoreEntry, Scoreboard};
use crate::ship::ShipPlacement;

/// Identity of one accepted connection. Never reused within a process.
pub type ConnectionId = u64;

/// Lifecycle phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Lobby,
    Placement,
    InPlay,
    GameOver,
    RematchLobby,
}

/// One of the two player slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

/// An event addressed to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

#[derive(Debug, Clone)]
struct PlayerInfo {
    name: String,
    difficulty: Difficulty,
    /// Join order, used to find the first player.
    joined: u64,
}

#[derive(Debug)]
struct Occupant {
    conn: ConnectionId,
    info: Option<PlayerInfo>,
    board: Option<Board>,
    restart: bool,
}

impl Occupant {
    fn name(&self) -> &str {
        self.info.as_ref().map(|i| i.name.as_str()).unwrap_or("unknown")
    }
}

pub struct Match {
    id: u64,
    phase: Phase,
    profile: Option<Profile>,
    seats: [Option<Occupant>; 2],
    turn: Option<Seat>,
    winner: Option<Seat>,
    config: MatchConfig,
    scoreboard: Arc<Scoreboard>,
    rng: SmallRng,
    joins: u64,
    had_players: bool,
}

impl Match {
    pub fn new(id: u64, config: MatchConfig, scoreboard: Arc<Scoreboard>) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id)),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Match {
            id,
            phase: Phase::Lobby,
            profile: None,
            seats: [None, None],
            turn: None,
            winner: None,
            config,
            scoreboard,
            rng,
            joins: 0,
            had_players: false,
        }
    }

    /// Give `conn` a free seat. Returns `None` when both seats are taken or the
    /// match has already been abandoned.
    pub fn connect(&mut self, conn: ConnectionId) -> Option<Seat> {
        if self.is_abandoned() || self.phase != Phase::Lobby {
            return None;
        }
        let seat = Seat::ALL
            .into_iter()
            .find(|s| self.seats[s.index()].is_none())?;
        self.seats[seat.index()] = Some(Occupant {
            conn,
            info: None,
            board: None,
            restart: false,
        });
        self.had_players = true;
        info!("Match {}: connection {} seated as {:?}", self.id, conn, seat);
        Some(seat)
    }

    /// Apply one client request. Rejections come back as a single `error`
    /// event for `conn`.
    pub fn handle(&mut self, conn: ConnectionId, request: ClientMessage) -> Vec<Envelope> {
        let Some(seat) = self.seat_of(conn) else {
            warn!("Match {}: request from unseated connection {}", self.id, conn);
            return Vec::new();
        };

        let mut out = Vec::new();
        let result = match request {
            ClientMessage::Join {
                version,
                name,
                difficulty,
            } => self.join(seat, version, &name, difficulty, &mut out),
            ClientMessage::SubmitPlacement { ships } => {
                self.submit_placement(seat, &ships, &mut out)
            }
            ClientMessage::Shoot { coord } => self.shoot(seat, coord, &mut out),
            ClientMessage::RequestRestart | ClientMessage::AcceptRestart => {
                self.request_restart(seat, &mut out)
            }
            ClientMessage::DeclineRestart => self.decline_restart(seat, &mut out),
            ClientMessage::Disconnect => return self.leave(conn),
        };

        match result {
            Ok(()) => out,
            Err(rejection) => {
                debug!(
                    "Match {}: rejected request from connection {}: {}",
                    self.id, conn, rejection
                );
                vec![Envelope {
                    to: conn,
                    message: ServerMessage::Error {
                        code: rejection.code(),
                        message: rejection.to_string(),
                    },
                }]
            }
        }
    }

    /// Remove `conn` from the match. Calling it again for the same connection
    /// is a no-op.
    pub fn leave(&mut self, conn: ConnectionId) -> Vec<Envelope> {
        let Some(seat) = self.seat_of(conn) else {
            return Vec::new();
        };
        let left = self.seats[seat.index()].take();
        let previous = self.phase;
        let mut out = Vec::new();

        if let Some(remaining) = self.seats[seat.other().index()].as_ref() {
            let forfeit_win = matches!(
                previous,
                Phase::InPlay | Phase::GameOver | Phase::RematchLobby
            );
            if previous != Phase::Lobby {
                out.push(Envelope {
                    to: remaining.conn,
                    message: ServerMessage::OpponentDisconnected { forfeit_win },
                });
            }
            if previous == Phase::InPlay {
                info!(
                    "Match {}: {} wins by forfeit",
                    self.id,
                    remaining.name()
                );
                if self.config.record_forfeits {
                    let loser = left.as_ref().map(|o| o.name()).unwrap_or("unknown");
                    let difficulty = self
                        .profile
                        .as_ref()
                        .map(|p| p.difficulty)
                        .unwrap_or(Difficulty::Easy);
                    let entry = ScoreEntry::now(remaining.name(), loser, difficulty);
                    if let Err(e) = self.scoreboard.record(entry) {
                        warn!("Match {}: failed to save scoreboard: {:#}", self.id, e);
                    }
                }
            }
        }

        info!(
            "Match {}: connection {} left during {:?}",
            self.id, conn, previous
        );
        self.return_to_lobby();
        out
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of occupied seats.
    pub fn occupants(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    /// Every player that ever sat here has left.
    pub fn is_abandoned(&self) -> bool {
        self.had_players && self.occupants() == 0
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn seat_of(&self, conn: ConnectionId) -> Option<Seat> {
        Seat::ALL.into_iter().find(|s| {
            self.seats[s.index()]
                .as_ref()
                .is_some_and(|o| o.conn == conn)
        })
    }

    /// Connection allowed to shoot next.
    pub fn turn_owner(&self) -> Option<ConnectionId> {
        self.turn.and_then(|s| self.conn_at(s))
    }

    pub fn winner(&self) -> Option<ConnectionId> {
        self.winner.and_then(|s| self.conn_at(s))
    }

    pub fn board_of(&self, conn: ConnectionId) -> Option<&Board> {
        let seat = self.seat_of(conn)?;
        self.seats[seat.index()].as_ref()?.board.as_ref()
    }

    pub fn player_name(&self, conn: ConnectionId) -> Option<&str> {
        let seat = self.seat_of(conn)?;
        let info = self.seats[seat.index()].as_ref()?.info.as_ref()?;
        Some(info.name.as_str())
    }

    pub fn is_ready(&self, conn: ConnectionId) -> bool {
        self.board_of(conn).is_some()
    }

    pub fn restart_requested(&self, conn: ConnectionId) -> bool {
        self.seat_of(conn)
            .and_then(|s| self.seats[s.index()].as_ref())
            .is_some_and(|o| o.restart)
    }

    fn conn_at(&self, seat: Seat) -> Option<ConnectionId> {
        self.seats[seat.index()].as_ref().map(|o| o.conn)
    }

    fn occupant(&self, seat: Seat) -> Result<&Occupant, Rejection> {
        self.seats[seat.index()]
            .as_ref()
            .ok_or(Rejection::Protocol(ProtocolError::WrongPhase(self.phase)))
    }

    fn occupant_mut(&mut self, seat: Seat) -> Result<&mut Occupant, Rejection> {
        let phase = self.phase;
        self.seats[seat.index()]
            .as_mut()
            .ok_or(Rejection::Protocol(ProtocolError::WrongPhase(phase)))
    }

    fn send(&self, out: &mut Vec<Envelope>, seat: Seat, message: ServerMessage) {
        if let Some(conn) = self.conn_at(seat) {
            out.push(Envelope { to: conn, message });
        }
    }

    fn join(
        &mut self,
        seat: Seat,
        version: u32,
        name: &str,
        difficulty: Difficulty,
        out: &mut Vec<Envelope>,
    ) -> Result<(), Rejection> {
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                got: version,
            }
            .into());
        }
        if self.occupant(seat)?.info.is_some() {
            return Err(ProtocolError::AlreadyJoined.into());
        }
        if self.phase != Phase::Lobby {
            return Err(ProtocolError::WrongPhase(self.phase).into());
        }
        let name = name.trim();
        let len = name.chars().count();
        if len == 0 || len > MAX_NAME_LEN {
            return Err(ProtocolError::InvalidName.into());
        }

        self.joins += 1;
        let joined = self.joins;
        self.occupant_mut(seat)?.info = Some(PlayerInfo {
            name: name.to_string(),
            difficulty,
            joined,
        });
        info!(
            "Match {}: {:?} joined as {:?} ({:?})",
            self.id, seat, name, difficulty
        );

        let both_joined = self
            .seats
            .iter()
            .all(|s| s.as_ref().is_some_and(|o| o.info.is_some()));
        if both_joined {
            self.begin_placement(out);
        } else {
            self.send(out, seat, ServerMessage::WaitingForOpponent);
        }
        Ok(())
    }

    /// Resolve the profile from both players' choices and open placement.
    fn begin_placement(&mut self, out: &mut Vec<Envelope>) {
        let mut infos: Vec<&PlayerInfo> = self
            .seats
            .iter()
            .filter_map(|s| s.as_ref().and_then(|o| o.info.as_ref()))
            .collect();
        infos.sort_by_key(|i| i.joined);
        let [first, second] = infos.as_slice() else {
            return;
        };
        let profile = self.config.profile_for(first.difficulty, second.difficulty);
        info!(
            "Match {}: placement on {}x{} with ships {:?}",
            self.id, profile.board_size, profile.board_size, profile.ship_lengths
        );
        self.profile = Some(profile);
        self.open_placement(out);
    }

    /// Clear boards and flags, then send `start_placement` to both players
    /// using the current profile.
    fn open_placement(&mut self, out: &mut Vec<Envelope>) {
        for occupant in self.seats.iter_mut().flatten() {
            occupant.board = None;
            occupant.restart = false;
        }
        self.turn = None;
        self.winner = None;
        self.phase = Phase::Placement;

        let Some(profile) = self.profile.clone() else {
            return;
        };
        for seat in Seat::ALL {
            let opponent_name = self.seats[seat.other().index()]
                .as_ref()
                .map(|o| o.name().to_string())
                .unwrap_or_default();
            self.send(
                out,
                seat,
                ServerMessage::StartPlacement {
                    board_size: profile.board_size,
                    ship_lengths: profile.ship_lengths.clone(),
                    difficulty: profile.difficulty,
                    opponent_name,
                },
            );
        }
    }

    fn submit_placement(
        &mut self,
        seat: Seat,
        ships: &[ShipPlacement],
        out: &mut Vec<Envelope>,
    ) -> Result<(), Rejection> {
        let occupant = self.occupant(seat)?;
        if occupant.info.is_none() {
            return Err(ProtocolError::NotJoined.into());
        }
        if self.phase != Phase::Placement {
            return Err(ProtocolError::WrongPhase(self.phase).into());
        }
        if occupant.board.is_some() {
            return Err(ProtocolError::AlreadyReady.into());
        }
        let profile = self
            .profile
            .as_ref()
            .ok_or(ProtocolError::WrongPhase(self.phase))?;
        let board = Board::validate_and_place(profile, ships)?;

        self.occupant_mut(seat)?.board = Some(board);
        info!("Match {}: {:?} placed their fleet", self.id, seat);

        let both_ready = self
            .seats
            .iter()
            .all(|s| s.as_ref().is_some_and(|o| o.board.is_some()));
        if both_ready {
            self.start_game(out);
        } else {
            self.send(out, seat, ServerMessage::WaitingForOpponent);
        }
        Ok(())
    }

    fn start_game(&mut self, out: &mut Vec<Envelope>) {
        let first = if self.rng.random_bool(0.5) {
            Seat::First
        } else {
            Seat::Second
        };
        self.turn = Some(first);
        self.phase = Phase::InPlay;
        info!("Match {}: game started, {:?} shoots first", self.id, first);

        for seat in Seat::ALL {
            let Some(view) = self.seats[seat.index()]
                .as_ref()
                .and_then(|o| o.board.as_ref())
                .map(|b| b.view())
            else {
                continue;
            };
            self.send(
                out,
                seat,
                ServerMessage::GameStart {
                    your_turn: seat == first,
                    your_board: view,
                },
            );
        }
    }

    fn shoot(&mut self, seat: Seat, coord: Coord, out: &mut Vec<Envelope>) -> Result<(), Rejection> {
        if self.phase != Phase::InPlay {
            return Err(ProtocolError::WrongPhase(self.phase).into());
        }
        if self.turn != Some(seat) {
            return Err(ProtocolError::NotYourTurn.into());
        }
        let defender = seat.other();
        let board = self
            .occupant_mut(defender)?
            .board
            .as_mut()
            .ok_or(ProtocolError::WrongPhase(Phase::InPlay))?;
        let outcome = board.apply_shot(coord)?;
        let defender_view = board.view();

        debug!(
            "Match {}: {:?} fired at {} -> hit={} sunk={}",
            self.id, seat, coord, outcome.hit, outcome.sunk
        );

        if outcome.fleet_defeated {
            self.finish_game(seat, out);
            return Ok(());
        }

        let next = if outcome.hit { seat } else { defender };
        self.turn = Some(next);

        self.send(
            out,
            seat,
            ServerMessage::ShotResult {
                coord,
                hit: outcome.hit,
                sunk: outcome.sunk,
                your_turn_continues: outcome.hit,
            },
        );
        self.send(
            out,
            defender,
            ServerMessage::OpponentShot {
                coord,
                hit: outcome.hit,
                sunk: outcome.sunk,
                your_board: defender_view,
            },
        );
        for s in Seat::ALL {
            self.send(out, s, ServerMessage::TurnUpdate { your_turn: s == next });
        }
        Ok(())
    }

    fn finish_game(&mut self, winner: Seat, out: &mut Vec<Envelope>) {
        self.phase = Phase::GameOver;
        self.winner = Some(winner);
        self.turn = None;

        let winner_name = self.seats[winner.index()]
            .as_ref()
            .map(|o| o.name().to_string())
            .unwrap_or_default();
        let loser_name = self.seats[winner.other().index()]
            .as_ref()
            .map(|o| o.name().to_string())
            .unwrap_or_default();
        let difficulty = self
            .profile
            .as_ref()
            .map(|p| p.difficulty)
            .unwrap_or(Difficulty::Easy);
        info!(
            "Match {}: {} sank every ship of {}",
            self.id, winner_name, loser_name
        );

        let scoreboard = match self
            .scoreboard
            .record(ScoreEntry::now(&winner_name, &loser_name, difficulty))
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Match {}: failed to save scoreboard: {:#}", self.id, e);
                self.scoreboard.entries()
            }
        };

        for seat in Seat::ALL {
            self.send(
                out,
                seat,
                ServerMessage::GameOver {
                    winner_name: winner_name.clone(),
                    scoreboard: scoreboard.clone(),
                },
            );
        }
    }

    fn request_restart(&mut self, seat: Seat, out: &mut Vec<Envelope>) -> Result<(), Rejection> {
        if !matches!(self.phase, Phase::GameOver | Phase::RematchLobby) {
            return Err(ProtocolError::WrongPhase(self.phase).into());
        }
        if self.occupant(seat)?.restart {
            return Err(ProtocolError::RestartAlreadyRequested.into());
        }
        self.occupant_mut(seat)?.restart = true;

        let other_agreed = self.seats[seat.other().index()]
            .as_ref()
            .is_some_and(|o| o.restart);
        if other_agreed {
            info!("Match {}: rematch agreed", self.id);
            self.open_placement(out);
        } else {
            self.phase = Phase::RematchLobby;
            let from_name = self.occupant(seat)?.name().to_string();
            self.send(out, seat.other(), ServerMessage::RestartRequest { from_name });
        }
        Ok(())
    }

    fn decline_restart(&mut self, seat: Seat, out: &mut Vec<Envelope>) -> Result<(), Rejection> {
        if !matches!(self.phase, Phase::GameOver | Phase::RematchLobby) {
            return Err(ProtocolError::WrongPhase(self.phase).into());
        }
        let pending = self.seats[seat.other().index()]
            .as_ref()
            .is_some_and(|o| o.restart);
        if !pending {
            return Err(ProtocolError::NoRestartPending.into());
        }
        for occupant in self.seats.iter_mut().flatten() {
            occupant.restart = false;
        }
        self.phase = Phase::GameOver;
        let from_name = self.occupant(seat)?.name().to_string();
        self.send(out, seat.other(), ServerMessage::RestartDeclined { from_name });
        Ok(())
    }

    fn return_to_lobby(&mut self) {
        for occupant in self.seats.iter_mut().flatten() {
            occupant.board = None;
            occupant.restart = false;
        }
        self.phase = Phase::Lobby;
        self.profile = None;
        self.turn = None;
        self.winner = None;
    }
}
