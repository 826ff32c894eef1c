//! Accept loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{info, warn};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::registry::MatchRegistry;
use crate::scoreboard::Scoreboard;
use crate::session::run_session;
use crate::transport::tcp::TcpTransport;

pub struct Server {
    listener: TcpListener,
    registry: Arc<MatchRegistry>,
    config: ServerConfig,
}

impl Server {
    /// Load the scoreboard and bind the listening socket.
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let scoreboard = match &config.scores_path {
            Some(path) => Scoreboard::load(path)?,
            None => Scoreboard::in_memory(),
        };
        let listener = TcpListener::bind(&config.bind).await?;
        info!("Listening on {}", listener.local_addr()?);
        let registry = Arc::new(MatchRegistry::new(
            config.matches.clone(),
            Arc::new(scoreboard),
        ));
        Ok(Self {
            listener,
            registry,
            config,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> &Arc<MatchRegistry> {
        &self.registry
    }

    /// Accept connections forever.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Accept connections until `shutdown` resolves. Sessions already running
    /// are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                            continue;
                        }
                    };
                    info!("Accepted connection from {}", addr);
                    let (reader, writer) = TcpTransport::split(stream, &self.config.session);
                    let registry = Arc::clone(&self.registry);
                    let session = self.config.session.clone();
                    tokio::spawn(async move {
                        run_session(registry, reader, writer, session).await;
                        info!("Connection from {} finished", addr);
                    });
                }
            }
        }
    }
}
