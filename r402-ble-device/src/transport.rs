//! Line-oriented TCP transport.
//!
//! Each accepted connection plays the role of one BLE central: every
//! newline-terminated line it writes is one characteristic write, and every
//! reply is sent back as one line. A connection owns a [`Session`]; the
//! verification worker reaches it later through a [`ConnectionNotifier`].
//!
//! Lines are capped at [`Transport::max_line_len`] bytes. A longer line is
//! answered with `PAYMENT:ERROR PAYLOAD_TOO_LARGE` and the connection is
//! closed.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use r402_ble::request::START_TAG;
use r402_ble::{DeviceProfile, PaymentFailure, Reply, ReplyTarget, Session, WorkQueue};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Replies buffered per connection before further ones are dropped.
pub const REPLY_BUFFER: usize = 32;

/// How long a connection may keep flushing replies after shutdown fires.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Notify handle for one connection.
///
/// Replies are queued to the connection's writer task. Once the peer is
/// gone, or while its reply buffer is full, notifications are dropped
/// without error.
#[derive(Debug, Clone)]
pub struct ConnectionNotifier {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ConnectionNotifier {
    /// Creates a notifier buffering up to `capacity` replies and the receiver
    /// its writer task drains.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ReplyTarget for ConnectionNotifier {
    fn notify(&self, bytes: &[u8]) {
        match self.tx.try_send(bytes.to_vec()) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Peer is not reading replies, dropping notification");
            }
        }
    }
}

/// Shared per-device state handed to every connection.
#[derive(Debug, Clone)]
pub struct Transport {
    profile: Arc<DeviceProfile>,
    queue: WorkQueue,
    max_payload: usize,
    shutdown_grace: Duration,
}

impl Transport {
    /// Creates a transport feeding `queue`.
    #[must_use]
    pub const fn new(profile: Arc<DeviceProfile>, queue: WorkQueue, max_payload: usize) -> Self {
        Self {
            profile,
            queue,
            max_payload,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Bounds how long a connection keeps delivering replies once shutdown
    /// has been requested.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Longest accepted line, excluding the `\n`: a start tag carrying a
    /// full payload plus an optional `\r`.
    #[must_use]
    pub const fn max_line_len(&self) -> usize {
        self.max_payload.saturating_add(START_TAG.len() + 1)
    }

    /// Accepts connections until `shutdown` fires, then waits for every
    /// connection to finish delivering its pending replies.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] only if the listener itself fails; errors on
    /// individual connections are logged and do not stop the loop.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> io::Result<()> {
        let connections = TaskTracker::new();
        loop {
            let accepted = tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(err) if is_transient(&err) => {
                    tracing::warn!(error = %err, "Failed to accept connection");
                    continue;
                }
                Err(err) => return Err(err),
            };
            tracing::info!(%peer, "Peer connected");
            let transport = self.clone();
            let shutdown = shutdown.clone();
            connections.spawn(async move {
                if let Err(err) = transport.handle(stream, shutdown).await {
                    tracing::warn!(%peer, error = %err, "Connection closed with error");
                }
                tracing::info!(%peer, "Peer disconnected");
            });
        }

        connections.close();
        connections.wait().await;
        Ok(())
    }

    /// Runs one connection until the peer hangs up or `shutdown` fires.
    ///
    /// Replies still owed by the verification worker are delivered before
    /// this returns, as long as the peer keeps reading. After `shutdown`
    /// fires the connection gets at most the shutdown grace period to flush.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if reading from or writing to the peer fails.
    pub async fn handle<S>(&self, stream: S, shutdown: CancellationToken) -> io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Send,
    {
        let max_line = self.max_line_len();
        let grace = self.shutdown_grace;
        let (read, mut write) = tokio::io::split(stream);
        let (notifier, mut replies) = ConnectionNotifier::channel(REPLY_BUFFER);
        let mut session = Session::new(
            Arc::clone(&self.profile),
            self.queue.clone(),
            Arc::new(notifier.clone()),
        )
        .with_max_payload(self.max_payload);

        let reader_shutdown = shutdown.clone();
        let reader = async move {
            let codec =
                AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), max_line);
            let mut lines = FramedRead::new(read, codec);
            let result = loop {
                let line = tokio::select! {
                    () = reader_shutdown.cancelled() => break Ok(()),
                    line = lines.next() => line,
                };
                match line {
                    None => break Ok(()),
                    Some(Ok(line)) => {
                        session.handle_write(line.strip_suffix(b"\r").unwrap_or(&line[..]));
                    }
                    Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                        tracing::warn!(limit = max_line, "Line too long, closing connection");
                        let reply = Reply::from(PaymentFailure::PayloadTooLarge);
                        notifier.notify(reply.to_string().as_bytes());
                        break Ok(());
                    }
                    Some(Err(AnyDelimiterCodecError::Io(err))) => break Err(err),
                }
            };
            // Dropping the session releases this side of the reply channel;
            // queued jobs keep the writer alive until they have answered.
            drop(session);
            drop(notifier);
            result
        };

        let writer = async move {
            let drain = async {
                while let Some(mut reply) = replies.recv().await {
                    reply.push(b'\n');
                    write.write_all(&reply).await?;
                }
                write.shutdown().await
            };
            let deadline = async {
                shutdown.cancelled().await;
                tokio::time::sleep(grace).await;
            };
            tokio::select! {
                result = drain => result,
                () = deadline => {
                    tracing::warn!("Peer did not take its replies before shutdown, dropping them");
                    Ok(())
                }
            }
        };

        let (read_result, write_result) = tokio::join!(reader, writer);
        read_result.and(write_result)
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
