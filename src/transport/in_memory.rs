use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::transport::{Inbound, Outbound};

pub struct ChannelReader<M> {
    rx: UnboundedReceiver<M>,
}

pub struct ChannelWriter<M> {
    tx: Option<UnboundedSender<M>>,
}

/// One direction of an in-process connection.
pub fn channel<M>() -> (ChannelWriter<M>, ChannelReader<M>) {
    let (tx, rx) = unbounded_channel();
    (ChannelWriter { tx: Some(tx) }, ChannelReader { rx })
}

/// Both ends of an in-process connection: the first pair reads `A` and writes
/// `B`, the second the reverse.
#[allow(clippy::type_complexity)]
pub fn pair<A, B>() -> (
    (ChannelReader<A>, ChannelWriter<B>),
    (ChannelReader<B>, ChannelWriter<A>),
) {
    let (a_tx, a_rx) = channel();
    let (b_tx, b_rx) = channel();
    ((a_rx, b_tx), (b_rx, a_tx))
}

#[async_trait::async_trait]
impl<M: Send + 'static> Inbound<M> for ChannelReader<M> {
    async fn recv(&mut self) -> anyhow::Result<M> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Channel closed"))
    }
}

#[async_trait::async_trait]
impl<M: Send + 'static> Outbound<M> for ChannelWriter<M> {
    async fn send(&mut self, msg: M) -> anyhow::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Channel closed"))?;
        tx.send(msg).map_err(|_| anyhow::anyhow!("Channel closed"))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.tx = None;
        Ok(())
    }
}
