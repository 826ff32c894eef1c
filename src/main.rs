use std::path::PathBuf;

use battleship_server::{
    init_logging, Difficulty, MatchConfig, Profile, ProfilePolicy, RandomBot, Scoreboard, Server,
    ServerConfig, SessionConfig, TcpClient, DEFAULT_BIND, DEFAULT_SCORES_FILE, MAX_FRAME_SIZE,
};
use clap::Parser;
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Host matches and wait for players.
    Serve {
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,
        #[arg(long, default_value = DEFAULT_SCORES_FILE)]
        scores: PathBuf,
        #[arg(long, help = "Keep the scoreboard in memory only")]
        no_scores: bool,
        #[arg(long, value_enum, default_value_t = ProfilePolicy::FirstJoined)]
        profile_policy: ProfilePolicy,
        #[arg(long, help = "Record a win when the opponent leaves mid-game")]
        record_forfeits: bool,
        #[arg(long, requires = "ships", help = "Play every match on this board size")]
        board_size: Option<u8>,
        #[arg(long, value_delimiter = ',', requires = "board_size", help = "Ship lengths, e.g. 5,4,3,3,2")]
        ships: Option<Vec<u8>>,
        #[arg(long, help = "Drop clients silent for this many seconds")]
        idle_timeout_secs: Option<u64>,
        #[arg(long, default_value_t = 10)]
        send_timeout_secs: u64,
        #[arg(long, default_value_t = MAX_FRAME_SIZE)]
        max_frame_size: u32,
        #[arg(long, help = "Fix RNG seed for reproducible turn order (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Connect a random-play bot to a server.
    Bot {
        #[arg(long, default_value = "127.0.0.1:12345")]
        connect: String,
        #[arg(long, default_value = "bot")]
        name: String,
        #[arg(long, value_enum, default_value_t = Difficulty::Easy)]
        difficulty: Difficulty,
        #[arg(long, help = "Fix RNG seed for reproducible play (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Print standings from a scoreboard file.
    Scores {
        #[arg(long, default_value = DEFAULT_SCORES_FILE)]
        scores: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            scores,
            no_scores,
            profile_policy,
            record_forfeits,
            board_size,
            ships,
            idle_timeout_secs,
            send_timeout_secs,
            max_frame_size,
            seed,
        } => {
            let fixed_profile = match (board_size, ships) {
                (Some(size), Some(lengths)) => {
                    if size == 0 || lengths.iter().any(|&l| l == 0 || l > size) {
                        anyhow::bail!("every ship must fit on a {}x{} board", size, size);
                    }
                    Some(Profile::custom(Difficulty::Easy, size, &lengths))
                }
                _ => None,
            };
            let config = ServerConfig {
                bind,
                scores_path: (!no_scores).then_some(scores),
                matches: MatchConfig {
                    profile_policy,
                    record_forfeits,
                    seed,
                    fixed_profile,
                },
                session: SessionConfig {
                    send_timeout: Duration::from_secs(send_timeout_secs),
                    idle_timeout: idle_timeout_secs.map(Duration::from_secs),
                    max_frame_size,
                },
            };
            if let Some(s) = seed {
                println!("Using fixed seed: {} (turn order will be reproducible)", s);
            }
            let server = Server::bind(config).await?;
            println!("Battleship server listening on {}", server.local_addr()?);
            server
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
        }
        Commands::Bot {
            connect,
            name,
            difficulty,
            seed,
        } => {
            let client = TcpClient::connect(&connect).await?;
            let mut bot = RandomBot::new(name, difficulty, seed);
            let outcome = bot.play(client).await?;
            println!(
                "{} finished: {:?} after {} shots",
                bot.name(),
                outcome,
                bot.shots_fired()
            );
        }
        Commands::Scores { scores } => {
            let board = Scoreboard::load(&scores)?;
            if board.is_empty() {
                println!("No games recorded in {}", scores.display());
                return Ok(());
            }
            println!("{:<24} {:>5} {:>6}", "Player", "Wins", "Losses");
            for s in board.standings() {
                println!("{:<24} {:>5} {:>6}", s.name, s.wins, s.losses);
            }
            println!("{} games recorded", board.len());
        }
    }

    Ok(())
}
