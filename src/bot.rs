//! Random-play client.

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::Board;
use crate::common::Coord;
use crate::config::{Difficulty, Profile};
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::transport::tcp::TcpClient;

/// How a bot's session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotOutcome {
    Won,
    Lost,
    OpponentLeft,
    ServerFull,
}

/// Joins a match, places a random legal fleet and fires at random untried cells.
pub struct RandomBot {
    name: String,
    difficulty: Difficulty,
    rng: SmallRng,
    targets: Vec<Coord>,
    shots_fired: usize,
}

impl RandomBot {
    pub fn new(name: impl Into<String>, difficulty: Difficulty, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self {
            name: name.into(),
            difficulty,
            rng,
            targets: Vec::new(),
            shots_fired: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shots_fired(&self) -> usize {
        self.shots_fired
    }

    /// Play one game over `client`, then disconnect.
    pub async fn play(&mut self, mut client: TcpClient) -> anyhow::Result<BotOutcome> {
        client
            .send(ClientMessage::Join {
                version: PROTOCOL_VERSION,
                name: self.name.clone(),
                difficulty: self.difficulty,
            })
            .await?;

        let outcome = loop {
            match client.recv().await? {
                ServerMessage::WaitingForOpponent => debug!("{}: waiting", self.name),
                ServerMessage::StartPlacement {
                    board_size,
                    ship_lengths,
                    difficulty,
                    opponent_name,
                } => {
                    info!(
                        "{}: playing {} on {:?} ({}x{})",
                        self.name, opponent_name, difficulty, board_size, board_size
                    );
                    let profile = Profile::custom(difficulty, board_size, &ship_lengths);
                    let ships = Board::random_fleet(&mut self.rng, &profile)
                        .map_err(|e| anyhow::anyhow!(e))?;
                    self.reset_targets(board_size);
                    client.send(ClientMessage::SubmitPlacement { ships }).await?;
                }
                ServerMessage::GameStart { your_turn, .. }
                | ServerMessage::TurnUpdate { your_turn } => {
                    if your_turn {
                        self.fire(&mut client).await?;
                    }
                }
                ServerMessage::ShotResult { coord, hit, sunk, .. } => {
                    debug!("{}: shot {} hit={} sunk={}", self.name, coord, hit, sunk);
                }
                ServerMessage::OpponentShot { coord, hit, .. } => {
                    debug!("{}: took fire at {} hit={}", self.name, coord, hit);
                }
                ServerMessage::GameOver { winner_name, .. } => {
                    break if winner_name == self.name {
                        BotOutcome::Won
                    } else {
                        BotOutcome::Lost
                    };
                }
                ServerMessage::OpponentDisconnected { .. } => break BotOutcome::OpponentLeft,
                ServerMessage::ServerFull => break BotOutcome::ServerFull,
                ServerMessage::RestartRequest { .. } | ServerMessage::RestartDeclined { .. } => {}
                ServerMessage::Error { code, message } => {
                    return Err(anyhow::anyhow!("server rejected request: {:?} {}", code, message));
                }
            }
        };

        info!(
            "{}: finished with {:?} after {} shots",
            self.name, outcome, self.shots_fired
        );
        if outcome != BotOutcome::ServerFull {
            client.send(ClientMessage::Disconnect).await?;
        }
        if let Err(e) = client.close().await {
            debug!("{}: close failed: {:#}", self.name, e);
        }
        Ok(outcome)
    }

    fn reset_targets(&mut self, board_size: u8) {
        self.targets = (0..board_size)
            .flat_map(|r| (0..board_size).map(move |c| Coord::new(r, c)))
            .collect();
    }

    async fn fire(&mut self, client: &mut TcpClient) -> anyhow::Result<()> {
        if self.targets.is_empty() {
            return Err(anyhow::anyhow!("no untried cells left"));
        }
        let i = self.rng.random_range(0..self.targets.len());
        let coord = self.targets.swap_remove(i);
        self.shots_fired += 1;
        client.send(ClientMessage::Shoot { coord }).await
    }
}
