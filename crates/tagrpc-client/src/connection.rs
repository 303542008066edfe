//! Connection engine: one socket, many concurrent calls.
//!
//! A [`Connection`] owns the write half of the socket behind an async lock and
//! hands the read half to a background receive task. Calls register a pending
//! slot keyed by their correlation tag, write one frame, and park until the
//! receive task delivers the matching response or the connection tears down.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tagrpc_frame::{Frame, FrameError, TagCodec};
use tagrpc_transport::RpcStream;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, trace, warn, Instrument};

use crate::config::ConnectionConfig;
use crate::error::{CallError, ConnectError, Result};
use crate::gate::TagGate;
use crate::pending::{PendingSlot, PendingTable};
use crate::response::{CallStatus, Response};

type FrameSink = FramedWrite<OwnedWriteHalf, TagCodec>;
type FrameSource = FramedRead<OwnedReadHalf, TagCodec>;

/// Upper bound on shutting down the write half during teardown.
const WRITER_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// State shared between call handles and the receive task.
struct Core {
    pending: PendingTable,
    writer: AsyncMutex<Option<FrameSink>>,
    /// Cancelled once teardown starts; no new calls after this.
    shutdown: CancellationToken,
    /// Cancelled once the receive task has exited and released the read half.
    terminated: CancellationToken,
}

impl Core {
    /// Stop the receive task and fail every outstanding call.
    ///
    /// Safe to call from any thread, any number of times.
    fn teardown(&self) {
        self.shutdown.cancel();
        let failed = self.pending.drain_all(|| CallError::ConnectionClosed);
        if failed > 0 {
            debug!(failed, "failed outstanding calls on teardown");
        }
    }

    fn deliver(&self, frame: Frame) {
        let Frame { tag, payload } = frame;
        let size = payload.len();
        if self.pending.resolve(tag, payload) {
            trace!(tag, size, "delivered response");
        } else {
            debug!(tag, size, "discarding frame with no pending call");
        }
    }

    /// Take the write half out of service and shut it down.
    ///
    /// Bytes still buffered in the codec are discarded: the peer may have
    /// stopped reading. The lock is held until the shutdown is done, so a
    /// second caller returns only once the write half is gone.
    async fn release_writer(&self) {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.take() else {
            return;
        };
        let mut half = sink.into_inner();
        match tokio::time::timeout(WRITER_SHUTDOWN_GRACE, half.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = %err, "write half shutdown failed"),
            Err(_) => debug!("write half shutdown timed out"),
        }
    }
}

struct Inner {
    core: Arc<Core>,
    gate: TagGate,
    config: ConnectionConfig,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Last handle gone without close(): the receive task finishes the job.
        self.core.teardown();
    }
}

/// A live, multiplexed connection to one remote endpoint.
///
/// Cheap to clone; all clones share the socket, the pending-call table and
/// the filter chains. Dropping the last clone tears the connection down.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Wrap an already connected stream and start its receive task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_stream(
        stream: RpcStream,
        config: ConnectionConfig,
    ) -> std::result::Result<Self, ConnectError> {
        config.validate()?;
        stream.set_nodelay(config.nodelay)?;
        let peer_addr = stream.peer_addr();
        let local_addr = stream.local_addr()?;

        let codec = TagCodec::with_config(config.frame_config());
        let (read_half, write_half) = stream.into_split();

        let core = Arc::new(Core {
            pending: PendingTable::new(),
            writer: AsyncMutex::new(Some(FramedWrite::new(write_half, codec.clone()))),
            shutdown: CancellationToken::new(),
            terminated: CancellationToken::new(),
        });

        let frames = FramedRead::new(read_half, codec);
        tokio::spawn(
            receive_loop(frames, Arc::clone(&core))
                .instrument(debug_span!("receive_loop", peer = %peer_addr)),
        );

        Ok(Self {
            inner: Arc::new(Inner {
                core,
                gate: TagGate::new(),
                config,
                peer_addr,
                local_addr,
            }),
        })
    }

    /// Issue one call and wait for its response.
    ///
    /// The payload runs through the outbound filters, goes out as a single
    /// frame tagged `tag`, and the response payload runs through the inbound
    /// filters before it is returned. Calls on distinct tags proceed
    /// concurrently; calls on the same tag take turns.
    ///
    /// A configured call timeout covers waiting for the tag, writing the
    /// frame and waiting for the response. A call that times out (or is
    /// dropped) after its frame went out keeps the tag until the late
    /// response arrives and is discarded, so it never reaches a later call.
    pub async fn call(&self, payload: impl Into<Bytes>, tag: u32) -> Result<Response> {
        let inner = &*self.inner;
        if inner.core.shutdown.is_cancelled() {
            return Err(CallError::ConnectionClosed);
        }

        let payload = inner.config.outbound_filters.encode(payload.into())?;
        let max = inner.config.max_payload_size;
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            }
            .into());
        }

        let exchange = inner.exchange(tag, payload);
        let (raw, submitted_at) = match inner.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| {
                    debug!(tag, timeout = ?limit, "call timed out");
                    CallError::Timeout(limit)
                })??,
            None => exchange.await?,
        };

        let payload = inner.config.inbound_filters.decode(raw)?;
        Ok(Response {
            payload,
            status: CallStatus::OK,
            tag,
            elapsed: submitted_at.elapsed(),
        })
    }

    /// Close the connection.
    ///
    /// Outstanding calls fail with [`CallError::ConnectionClosed`], new calls
    /// are refused and the write half is shut down. Idempotent.
    pub async fn close(&self) {
        let core = &self.inner.core;
        if !core.shutdown.is_cancelled() {
            debug!(
                peer = %self.inner.peer_addr,
                pending = core.pending.len(),
                "closing connection"
            );
        }
        core.teardown();
        core.release_writer().await;
    }

    /// Wait until the receive task has exited and released the socket.
    ///
    /// Returns immediately if that already happened.
    pub async fn wait_closed(&self) {
        self.inner.core.terminated.cancelled().await;
    }

    /// Whether teardown has started.
    pub fn is_closed(&self) -> bool {
        self.inner.core.shutdown.is_cancelled()
    }

    /// Number of calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.inner.core.pending.len()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }
}

impl Inner {
    async fn exchange(&self, tag: u32, payload: Bytes) -> Result<(Bytes, Instant)> {
        let turn = self.gate.acquire(tag).await;
        let mut slot = self.core.pending.register(tag)?;
        slot.hold_turn(turn);
        let submitted_at = slot.submitted_at();

        self.write_frame(Frame::new(tag, payload), &mut slot).await?;
        Ok((slot.wait().await?, submitted_at))
    }

    /// Write one frame under the write lock.
    ///
    /// An I/O failure is fatal to the connection.
    async fn write_frame(&self, frame: Frame, slot: &mut PendingSlot) -> Result<()> {
        let tag = frame.tag;
        let size = frame.payload.len();

        let mut writer = self.core.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(CallError::ConnectionClosed);
        };

        let sent = tokio::select! {
            biased;
            _ = self.core.shutdown.cancelled() => return Err(CallError::ConnectionClosed),
            sent = async {
                match sink.feed(frame).await {
                    Ok(()) => {
                        // Buffered whole: this flush or a later one delivers it.
                        slot.mark_written();
                        sink.flush().await
                    }
                    Err(err) => Err(err),
                }
            } => sent,
        };

        match sent {
            Ok(()) => {
                debug!(tag, size, "frame written");
                Ok(())
            }
            // Rejected by the encoder before any byte hit the socket.
            Err(err @ FrameError::PayloadTooLarge { .. }) => Err(err.into()),
            Err(err) => {
                warn!(tag, error = %err, "frame write failed, closing connection");
                *writer = None;
                drop(writer);
                self.core.teardown();
                Err(CallError::ConnectionClosed)
            }
        }
    }
}

async fn receive_loop(mut frames: FrameSource, core: Arc<Core>) {
    loop {
        let next = tokio::select! {
            biased;
            _ = core.shutdown.cancelled() => break,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => core.deliver(frame),
            Some(Err(err)) => {
                warn!(
                    error = %err,
                    pending = core.pending.len(),
                    "receive failed, closing connection"
                );
                break;
            }
            None => {
                warn!(pending = core.pending.len(), "peer closed connection");
                break;
            }
        }
    }

    core.teardown();
    drop(frames);
    core.release_writer().await;
    core.terminated.cancel();
    debug!("receive loop exited");
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.inner.peer_addr)
            .field("local", &self.inner.local_addr)
            .field("closed", &self.is_closed())
            .field("pending", &self.pending_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tagrpc_transport::TcpEndpoint;

    use super::*;

    async fn pair(config: ConnectionConfig) -> (Connection, RpcStream) {
        let endpoint = TcpEndpoint::bind("127.0.0.1:0").await.unwrap();
        let addr = endpoint.local_addr().to_string();
        let (client, server) = tokio::join!(TcpEndpoint::connect(&addr), endpoint.accept());
        let conn = Connection::from_stream(client.unwrap(), config).unwrap();
        (conn, server.unwrap())
    }

    #[tokio::test]
    async fn call_after_close_refused() {
        let (conn, _server) = pair(ConnectionConfig::default()).await;
        conn.close().await;

        assert!(conn.is_closed());
        assert!(matches!(
            conn.call(&b"late"[..], 1).await,
            Err(CallError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn oversized_request_is_local_failure() {
        let config = ConnectionConfig::default().with_max_payload_size(4);
        let (conn, _server) = pair(config).await;

        let err = conn.call(&b"too large"[..], 1).await.unwrap_err();
        assert!(matches!(
            err,
            CallError::Frame(FrameError::PayloadTooLarge { size: 9, max: 4 })
        ));
        assert!(!conn.is_closed());
        assert_eq!(conn.pending_calls(), 0);
    }

    #[tokio::test]
    async fn dropping_last_handle_terminates_receive_task() {
        let (conn, _server) = pair(ConnectionConfig::default()).await;
        let core = Arc::clone(&conn.inner.core);
        drop(conn);

        tokio::time::timeout(Duration::from_secs(2), core.terminated.cancelled())
            .await
            .expect("receive task should exit once the connection is dropped");
        assert!(core.pending.is_closed());
    }

    #[tokio::test]
    async fn debug_reports_state() {
        let (conn, _server) = pair(ConnectionConfig::default()).await;
        let text = format!("{conn:?}");
        assert!(text.contains("closed: false"));
        assert!(text.contains("pending: 0"));
    }
}
