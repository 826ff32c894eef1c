mod board;
pub mod bot;
mod common;
mod config;
mod game;
mod logging;
pub mod protocol;
pub mod registry;
mod scoreboard;
pub mod server;
pub mod session;
mod ship;
pub mod transport;

pub use board::*;
pub use bot::{BotOutcome, RandomBot};
pub use common::*;
pub use config::*;
pub use game::*;
pub use logging::init_logging;
pub use protocol::*;
pub use registry::{Admission, MatchRegistry, Room};
pub use scoreboard::*;
pub use server::Server;
pub use session::run_session;
pub use ship::*;
pub use transport::tcp::{TcpClient, TcpTransport};
