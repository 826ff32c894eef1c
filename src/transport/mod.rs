//! Message transports between a client and the server.
//!
//! A connection is split into an inbound and an outbound half so the session
//! can read and write from separate tasks.

#[async_trait::async_trait]
pub trait Inbound<M>: Send {
    /// Next whole message. Any error ends the connection.
    async fn recv(&mut self) -> anyhow::Result<M>;
}

#[async_trait::async_trait]
pub trait Outbound<M>: Send {
    async fn send(&mut self, msg: M) -> anyhow::Result<()>;

    /// Flush and close the outbound half.
    async fn close(&mut self) -> anyhow::Result<()>;
}

pub mod in_memory;
pub mod tcp;
