//! Connection session: drives one client from admission to teardown.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{mpsc, Notify};
use tokio::time::{timeout, Duration};

use crate::config::SessionConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{Admission, MatchRegistry};
use crate::transport::{Inbound, Outbound};

/// Serve one connection until it closes.
///
/// Requests are read here and applied under the room lock. Outbound events
/// are written by a separate task, so a stalled client never holds the lock.
/// Whatever ends the session (clean close, decode error, `disconnect`, a
/// failed send or the idle timeout) the player leaves the match exactly once.
pub async fn run_session<R, W>(
    registry: Arc<MatchRegistry>,
    mut reader: R,
    mut writer: W,
    config: SessionConfig,
) where
    R: Inbound<ClientMessage>,
    W: Outbound<ServerMessage> + 'static,
{
    let conn = registry.next_connection_id();
    let (outbox, mut queue) = mpsc::unbounded_channel::<ServerMessage>();

    let room = match registry.admit(conn, outbox).await {
        Admission::Seated { room, seat } => {
            info!("Connection {}: seated as {:?} in match {}", conn, seat, room.id());
            room
        }
        Admission::Full => {
            info!("Connection {}: rejected, server full", conn);
            if let Err(e) = writer.send(ServerMessage::ServerFull).await {
                debug!("Connection {}: failed to send server_full: {:#}", conn, e);
            }
            if let Err(e) = writer.close().await {
                debug!("Connection {}: close failed: {:#}", conn, e);
            }
            return;
        }
    };

    let send_failed = Arc::new(Notify::new());
    let writer_task = tokio::spawn({
        let send_failed = Arc::clone(&send_failed);
        async move {
            while let Some(message) = queue.recv().await {
                let kind = message.kind();
                if let Err(e) = writer.send(message).await {
                    warn!("Connection {}: failed to send {}: {:#}", conn, kind, e);
                    send_failed.notify_one();
                    return;
                }
            }
            if let Err(e) = writer.close().await {
                debug!("Connection {}: close failed: {:#}", conn, e);
            }
        }
    });

    loop {
        let next = tokio::select! {
            _ = send_failed.notified() => break,
            next = next_request(&mut reader, config.idle_timeout) => next,
        };
        match next {
            Ok(ClientMessage::Disconnect) => {
                info!("Connection {}: disconnect requested", conn);
                break;
            }
            Ok(request) => room.handle(conn, request).await,
            Err(e) => {
                info!("Connection {}: closed ({:#})", conn, e);
                break;
            }
        }
    }

    if room.leave(conn).await {
        registry.release(&room).await;
    }
    if let Err(e) = writer_task.await {
        warn!("Connection {}: writer task failed: {}", conn, e);
    }
}

async fn next_request<R: Inbound<ClientMessage>>(
    reader: &mut R,
    idle: Option<Duration>,
) -> anyhow::Result<ClientMessage> {
    match idle {
        Some(limit) => timeout(limit, reader.recv())
            .await
            .map_err(|_| anyhow::anyhow!("idle for {:?}", limit))?,
        None => reader.recv().await,
    }
}
