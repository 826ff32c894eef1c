use std::io::ErrorKind;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::config::{SessionConfig, DEFAULT_SEND_TIMEOUT, MAX_FRAME_SIZE};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::{Inbound, Outbound};

fn read_error(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        ErrorKind::UnexpectedEof => anyhow::anyhow!("Connection closed by peer"),
        ErrorKind::ConnectionReset => anyhow::anyhow!("Connection reset by peer"),
        _ => anyhow::anyhow!("Read error: {}", e),
    }
}

fn write_error(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
            anyhow::anyhow!("Connection closed by peer")
        }
        _ => anyhow::anyhow!("Write error: {}", e),
    }
}

/// Reads 4-byte big-endian length prefixed bincode frames.
pub struct FrameReader<R> {
    inner: R,
    max_frame_size: u32,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    pub fn new(inner: R, max_frame_size: u32) -> Self {
        Self {
            inner,
            max_frame_size,
        }
    }

    pub async fn read_frame<M: DeserializeOwned>(&mut self) -> anyhow::Result<M> {
        let mut len_buf = [0u8; 4];
        self.inner.read_exact(&mut len_buf).await.map_err(read_error)?;

        let len = u32::from_be_bytes(len_buf);
        if len == 0 {
            return Err(anyhow::anyhow!("Invalid message length: 0"));
        }
        if len > self.max_frame_size {
            return Err(anyhow::anyhow!(
                "Message too large: {} bytes (max: {})",
                len,
                self.max_frame_size
            ));
        }

        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf).await.map_err(read_error)?;
        bincode::deserialize(&buf).map_err(|e| anyhow::anyhow!("Deserialization error: {}", e))
    }
}

#[async_trait::async_trait]
impl<R, M> Inbound<M> for FrameReader<R>
where
    R: AsyncRead + Unpin + Send,
    M: DeserializeOwned + Send + 'static,
{
    async fn recv(&mut self) -> anyhow::Result<M> {
        self.read_frame().await
    }
}

/// Writes length prefixed bincode frames, each bounded by a send timeout.
pub struct FrameWriter<W> {
    inner: W,
    send_timeout: Duration,
    max_frame_size: u32,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    pub fn new(inner: W, send_timeout: Duration, max_frame_size: u32) -> Self {
        Self {
            inner,
            send_timeout,
            max_frame_size,
        }
    }

    pub async fn write_frame<M: Serialize + Sync>(&mut self, msg: &M) -> anyhow::Result<()> {
        let data =
            bincode::serialize(msg).map_err(|e| anyhow::anyhow!("Serialization error: {}", e))?;
        if data.len() > self.max_frame_size as usize {
            return Err(anyhow::anyhow!(
                "Message too large: {} bytes (max: {})",
                data.len(),
                self.max_frame_size
            ));
        }

        let len = (data.len() as u32).to_be_bytes();
        let inner = &mut self.inner;
        let write = async move {
            inner.write_all(&len).await.map_err(write_error)?;
            inner.write_all(&data).await.map_err(write_error)?;
            inner.flush().await.map_err(write_error)?;
            anyhow::Ok(())
        };
        timeout(self.send_timeout, write)
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", self.send_timeout))?
    }
}

#[async_trait::async_trait]
impl<W, M> Outbound<M> for FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
    M: Serialize + Send + Sync + 'static,
{
    async fn send(&mut self, msg: M) -> anyhow::Result<()> {
        self.write_frame(&msg).await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.inner.shutdown().await.map_err(write_error)
    }
}

pub struct TcpTransport;

impl TcpTransport {
    /// Split an accepted stream into framed halves.
    pub fn split(
        stream: TcpStream,
        config: &SessionConfig,
    ) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("Failed to set TCP_NODELAY: {}", e);
        }
        let (read, write) = stream.into_split();
        (
            FrameReader::new(read, config.max_frame_size),
            FrameWriter::new(write, config.send_timeout, config.max_frame_size),
        )
    }
}

/// Client side of a server connection.
pub struct TcpClient {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl TcpClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let config = SessionConfig {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            idle_timeout: None,
            max_frame_size: MAX_FRAME_SIZE,
        };
        let (reader, writer) = TcpTransport::split(stream, &config);
        Ok(Self { reader, writer })
    }

    pub async fn send(&mut self, msg: ClientMessage) -> anyhow::Result<()> {
        self.writer.write_frame(&msg).await
    }

    pub async fn recv(&mut self) -> anyhow::Result<ServerMessage> {
        self.reader.read_frame().await
    }

    pub async fn close(&mut self) -> anyhow::Result<()> {
        Outbound::<ClientMessage>::close(&mut self.writer).await
    }
}
