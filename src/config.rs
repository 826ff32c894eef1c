//! Difficulty presets, match profiles and server settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default listening address.
pub const DEFAULT_BIND: &str = "0.0.0.0:12345";

/// Default scoreboard file.
pub const DEFAULT_SCORES_FILE: &str = "scores.json";

/// Maximum frame size accepted from a client (1 MiB).
pub const MAX_FRAME_SIZE: u32 = 1 << 20;

/// Default bound on a single outbound write.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted player name, in characters.
pub const MAX_NAME_LEN: usize = 24;

/// Named preset chosen by a player when joining.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn board_size(&self) -> u8 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 12,
            Difficulty::Hard => 15,
        }
    }

    pub fn ship_lengths(&self) -> &'static [u8] {
        match self {
            Difficulty::Easy => &[4, 3, 3, 2, 2, 2, 1, 1, 1, 1],
            Difficulty::Medium => &[5, 4, 4, 3, 3, 2, 2, 1, 1],
            Difficulty::Hard => &[6, 5, 4, 3, 3, 2, 2, 1, 1],
        }
    }
}

/// Resolved board size and ship list governing one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub difficulty: Difficulty,
    pub board_size: u8,
    /// Required ship lengths, longest first.
    pub ship_lengths: Vec<u8>,
}

impl Profile {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Profile {
            difficulty,
            board_size: difficulty.board_size(),
            ship_lengths: difficulty.ship_lengths().to_vec(),
        }
    }

    /// Build a custom profile. Lengths are stored longest first.
    pub fn custom(difficulty: Difficulty, board_size: u8, ship_lengths: &[u8]) -> Self {
        let mut ship_lengths = ship_lengths.to_vec();
        ship_lengths.sort_unstable_by(|a, b| b.cmp(a));
        Profile {
            difficulty,
            board_size,
            ship_lengths,
        }
    }

    /// Total number of ship cells in a fleet.
    pub fn fleet_cells(&self) -> usize {
        self.ship_lengths.iter().map(|&l| l as usize).sum()
    }
}

/// How the shared profile is derived when the two players picked different difficulties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProfilePolicy {
    /// The first player to join fixes the difficulty; the second is coerced.
    #[default]
    FirstJoined,
    /// Larger board, and for every ship length the larger of the two counts.
    Union,
}

impl ProfilePolicy {
    pub fn resolve(&self, first: Difficulty, second: Difficulty) -> Profile {
        match self {
            ProfilePolicy::FirstJoined => Profile::for_difficulty(first),
            ProfilePolicy::Union => {
                let board_size = first.board_size().max(second.board_size());
                let a = first.ship_lengths();
                let b = second.ship_lengths();
                let mut lengths: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
                lengths.sort_unstable();
                lengths.dedup();
                let mut ship_lengths = Vec::new();
                for len in lengths {
                    let count_a = a.iter().filter(|&&l| l == len).count();
                    let count_b = b.iter().filter(|&&l| l == len).count();
                    ship_lengths.extend(std::iter::repeat(len).take(count_a.max(count_b)));
                }
                Profile::custom(first.max(second), board_size, &ship_lengths)
            }
        }
    }
}

/// Rules applied to every match the registry creates.
#[derive(Debug, Clone, Default)]
pub struct MatchConfig {
    pub profile_policy: ProfilePolicy,
    /// Write a scoreboard entry when a player wins because the opponent left mid-game.
    pub record_forfeits: bool,
    /// Fixed seed for the turn-order RNG.
    pub seed: Option<u64>,
    /// Play every match on this profile regardless of the players' choices.
    pub fixed_profile: Option<Profile>,
}

impl MatchConfig {
    /// Profile for a match whose players joined in this order.
    pub fn profile_for(&self, first: Difficulty, second: Difficulty) -> Profile {
        match &self.fixed_profile {
            Some(profile) => profile.clone(),
            None => self.profile_policy.resolve(first, second),
        }
    }
}

/// Per-connection transport settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub send_timeout: Duration,
    /// Drop a client that sends nothing for this long.
    pub idle_timeout: Option<Duration>,
    pub max_frame_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            idle_timeout: None,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

/// Everything `Server::bind` needs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Scoreboard file; `None` keeps scores in memory only.
    pub scores_path: Option<PathBuf>,
    pub matches: MatchConfig,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: DEFAULT_BIND.to_string(),
            scores_path: Some(PathBuf::from(DEFAULT_SCORES_FILE)),
            matches: MatchConfig::default(),
            session: SessionConfig::default(),
        }
    }
}
