//! Guarded duplex connection.
//!
//! [`ConnectionGuard`] wraps one WebSocket channel with two independent
//! locks so a writer can send while the read loop is blocked on the peer.
//!
//! # Locking
//!
//! | Operation | Locks |
//! |-----------|-------|
//! | [`ConnectionGuard::send`] | writer |
//! | [`ConnectionGuard::receive_loop`] | reader for its whole duration, writer briefly |
//! | [`ConnectionGuard::close`] | writer, then reader if free |
//! | [`ConnectionGuard::attach`] | reader, then writer |
//!
//! Reader is always taken before writer, never the reverse.
//!
//! # State
//!
//! The write half doubles as the connectedness flag: present means
//! connected. `close` takes it out and it is never reused; only a fresh
//! `attach` makes the guard connected again.
//!
//! Each attached channel carries its own close signal. `close` fires it so
//! a running read loop drops the read half, which releases the stream
//! even when the peer never answers the close notice.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::FrameKind;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on each step of the graceful close notice.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Byte stream a channel can run over.
///
/// Blanket-implemented for plain TCP, TLS streams and in-memory pipes.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Write half of a split channel.
type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;

/// Read half of a split channel.
type WsSource<S> = SplitStream<WebSocketStream<S>>;

/// Write half plus the signal that stops its reader.
struct WriteHalf<S> {
    sink: WsSink<S>,
    closed: Arc<Notify>,
}

/// Read half plus the signal that stops it.
struct ReadHalf<S> {
    source: WsSource<S>,
    closed: Arc<Notify>,
}

/// Splits a channel into halves sharing one close signal.
fn split<S>(stream: WebSocketStream<S>) -> (WriteHalf<S>, ReadHalf<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, source) = stream.split();
    let closed = Arc::new(Notify::new());
    (
        WriteHalf {
            sink,
            closed: Arc::clone(&closed),
        },
        ReadHalf { source, closed },
    )
}

// ============================================================================
// ConnectionGuard
// ============================================================================

/// One duplex channel with single-writer / single-reader discipline.
///
/// At most one [`send`](Self::send) and at most one
/// [`receive_loop`](Self::receive_loop) are in flight at any time; the two
/// run concurrently with each other.
///
/// # Example
///
/// ```ignore
/// let guard = Arc::new(ConnectionGuard::from_stream(ws_stream));
///
/// let reader = Arc::clone(&guard);
/// tokio::spawn(async move {
///     reader.receive_loop(|payload| println!("{} bytes", payload.len())).await
/// });
///
/// guard.send(b"hello".to_vec()).await?;
/// guard.close().await;
/// ```
pub struct ConnectionGuard<S> {
    /// Write half. `None` when disconnected.
    writer: Mutex<Option<WriteHalf<S>>>,
    /// Read half. Cleared together with the writer when possible.
    reader: Mutex<Option<ReadHalf<S>>>,
}

impl<S> Default for ConnectionGuard<S> {
    fn default() -> Self {
        Self {
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }
}

impl<S> ConnectionGuard<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Creates a disconnected guard.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a guard that owns an established channel.
    #[must_use]
    pub fn from_stream(stream: WebSocketStream<S>) -> Self {
        let (writer, reader) = split(stream);
        Self {
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Returns `true` while a channel is held.
    pub async fn is_connected(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    /// Stores a freshly established channel.
    ///
    /// Waits for a read loop still draining a previous channel to finish.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyConnected`] if a channel is already held.
    pub async fn attach(&self, stream: WebSocketStream<S>) -> Result<()> {
        if self.is_connected().await {
            return Err(Error::AlreadyConnected);
        }

        let mut reader = self.reader.lock().await;
        let mut writer = self.writer.lock().await;
        if writer.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let (write_half, read_half) = split(stream);
        *writer = Some(write_half);
        *reader = Some(read_half);
        Ok(())
    }

    /// Writes one binary frame.
    ///
    /// Safe under any number of concurrent callers; they are served one
    /// at a time and each frame is written whole.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no channel is held
    /// - [`Error::WebSocket`] if the transport write fails
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let half = writer.as_mut().ok_or(Error::NotConnected)?;
        half.sink.send(Message::Binary(payload.into())).await?;
        Ok(())
    }

    /// Reads frames until the channel ends, handing binary payloads to
    /// `on_message` in arrival order.
    ///
    /// The callback runs inline, so a slow callback delays the next read.
    /// A second concurrent call waits for the first to return.
    ///
    /// # Termination
    ///
    /// - Peer clean close: the guard is closed and `Ok(())` is returned.
    /// - Local [`close`](Self::close): `Ok(())` is returned without waiting
    ///   for the peer.
    /// - Transport error: returned as-is, the guard stays connected.
    /// - Text or raw frame: [`Error::UnexpectedFrameType`], the guard stays
    ///   connected.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] immediately if no channel is held.
    pub async fn receive_loop<F>(&self, mut on_message: F) -> Result<()>
    where
        F: FnMut(Bytes) + Send,
    {
        let mut reader = self.reader.lock().await;
        if !self.is_connected().await {
            // Stale read half left behind by a close that raced a running loop
            reader.take();
            return Err(Error::NotConnected);
        }
        let half = reader.as_mut().ok_or(Error::NotConnected)?;

        if let Err(e) = Self::pump(&mut half.source, &half.closed, &mut on_message).await {
            if !self.is_connected().await {
                // Closed while the error surfaced; release the stream now
                reader.take();
            }
            return Err(e);
        }

        debug!("Channel closed");
        reader.take();
        drop(reader);
        self.close().await;
        Ok(())
    }

    /// Closes the channel.
    ///
    /// No-op when disconnected. Otherwise sends a normal-closure notice,
    /// ignoring its outcome, then releases the channel. A running read loop
    /// is stopped and returns `Ok(())`.
    pub async fn close(&self) {
        let Some(WriteHalf { mut sink, closed }) = self.writer.lock().await.take() else {
            trace!("Close on disconnected guard");
            return;
        };

        let notice = Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        }));
        match timeout(CLOSE_TIMEOUT, sink.send(notice)).await {
            Ok(Ok(())) => trace!("Close frame sent"),
            Ok(Err(e)) => debug!(error = %e, "Close frame not sent"),
            Err(_) => debug!("Close frame timed out"),
        }
        if let Ok(Err(e)) = timeout(CLOSE_TIMEOUT, sink.close()).await {
            trace!(error = %e, "Channel close reported an error");
        }
        drop(sink);

        // Stores a permit if the loop is between reads
        closed.notify_one();

        // A running read loop holds the reader; it clears it on exit
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }

    /// Drives the read half until a clean close, a local close or a
    /// terminating error.
    async fn pump<F>(source: &mut WsSource<S>, closed: &Notify, on_message: &mut F) -> Result<()>
    where
        F: FnMut(Bytes) + Send,
    {
        loop {
            let next = tokio::select! {
                next = source.next() => next,
                () = closed.notified() => {
                    trace!("Read loop stopped by local close");
                    return Ok(());
                }
            };
            let Some(message) = next else {
                return Ok(());
            };

            let message = match message {
                Ok(message) => message,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            match message {
                Message::Binary(payload) => {
                    trace!(len = payload.len(), "Binary frame received");
                    on_message(payload);
                }
                Message::Close(frame) => {
                    trace!(?frame, "Close frame received");
                    return Ok(());
                }
                other => {
                    let kind = FrameKind::of(&other);
                    if !kind.is_control() {
                        return Err(Error::unexpected_frame(kind));
                    }
                    trace!(%kind, "Control frame skipped");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
