//! TCP 实时推送服务器
//!
//! 负责处理实时推送客户端连接，包括：
//! - 监听连接
//! - join/leave 主题成员管理
//! - 订单快照帧转发
//!
//! 帧格式：4 字节小端长度前缀 + JSON（[`shared::feed`] 中的帧类型）。

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use shared::feed::{ClientFrame, ServerFrame};

use super::hub::{ChannelSubscriber, FanoutHub, Subscriber};
use crate::utils::AppError;

/// 单帧上限：订单快照远小于此值，超限视为协议错误
const MAX_FRAME_LEN: usize = 256 * 1024;

/// Per-subscriber outbound buffer (frames)
const SUBSCRIBER_BUFFER: usize = 64;

/// Realtime feed server
///
/// One persistent connection per client; customers join `order:<id>` topics,
/// staff dashboards join `admin`.
pub struct FeedServer {
    hub: Arc<FanoutHub>,
    listen_addr: String,
}

impl FeedServer {
    pub fn new(hub: Arc<FanoutHub>, listen_addr: impl Into<String>) -> Self {
        Self {
            hub,
            listen_addr: listen_addr.into(),
        }
    }

    /// Run the accept loop until the token is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind feed listener: {}", e)))?;

        tracing::info!("Realtime feed listening on {}", self.listen_addr);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Realtime feed shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Feed client connected: {}", addr);
                            let hub = self.hub.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) =
                                    handle_connection(stream, addr, hub, shutdown).await
                                {
                                    tracing::debug!("Feed client {} finished: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept feed connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Handle one feed connection: reader drives membership, a writer task
/// drains the subscriber channel into the socket.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<FanoutHub>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let (mut reader, writer) = stream.into_split();

    let (subscriber, rx) = ChannelSubscriber::new(SUBSCRIBER_BUFFER);
    let subscriber_id = subscriber.id();
    let subscriber: Arc<dyn Subscriber> = Arc::new(subscriber);

    let writer_done = CancellationToken::new();
    let writer_task = tokio::spawn(write_loop(writer, rx, writer_done.clone()));

    let result = read_loop(
        &mut reader,
        addr,
        &hub,
        &subscriber,
        subscriber_id,
        &shutdown,
    )
    .await;

    // Connection gone: leave every topic before tearing the writer down
    hub.drop_subscriber(subscriber_id);
    writer_done.cancel();
    let _ = writer_task.await;

    result
}

async fn read_loop(
    reader: &mut OwnedReadHalf,
    addr: SocketAddr,
    hub: &Arc<FanoutHub>,
    subscriber: &Arc<dyn Subscriber>,
    subscriber_id: u64,
    shutdown: &CancellationToken,
) -> Result<(), AppError> {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            frame = read_frame(reader) => frame?,
        };

        match frame {
            ClientFrame::Join { topic } => {
                hub.subscribe(&topic, subscriber.clone());
                // Best effort ack; the join itself already took effect
                if let Err(e) = subscriber.deliver(ServerFrame::Joined { topic }).await {
                    tracing::debug!("Feed ack to {} failed: {}", addr, e);
                }
            }
            ClientFrame::Leave { topic } => {
                hub.unsubscribe(&topic, subscriber_id);
                if let Err(e) = subscriber.deliver(ServerFrame::Left { topic }).await {
                    tracing::debug!("Feed ack to {} failed: {}", addr, e);
                }
            }
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<ServerFrame>,
    done: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = done.cancelled() => break,
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = write_frame(&mut writer, &frame).await {
                    tracing::debug!("Feed write failed: {}", e);
                    break;
                }
            }
        }
    }
    let _ = writer.shutdown().await;
}

// ========== 帧编解码 ==========

/// 从异步流中读取一帧
pub(crate) async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<ClientFrame, AppError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(AppError::internal("feed client disconnected"));
        }
        Err(e) => {
            return Err(AppError::internal(format!("Read frame length failed: {}", e)));
        }
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(AppError::invalid(format!("Invalid frame length: {len}")));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| AppError::internal(format!("Read frame payload failed: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| AppError::invalid(format!("Malformed client frame: {}", e)))
}

/// 向异步流写入一帧
pub(crate) async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    frame: &ServerFrame,
) -> Result<(), AppError> {
    let payload = serde_json::to_vec(frame)
        .map_err(|e| AppError::internal(format!("Serialize frame failed: {}", e)))?;

    let mut data = Vec::with_capacity(4 + payload.len());
    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&payload);

    writer
        .write_all(&data)
        .await
        .map_err(|e| AppError::internal(format!("Write frame failed: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| AppError::internal(format!("Flush frame failed: {}", e)))?;
    Ok(())
}
