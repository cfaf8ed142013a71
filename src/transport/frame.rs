//! Classification of inbound WebSocket messages.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// FrameKind
// ============================================================================

/// Kind of a message read from the channel.
///
/// Only [`FrameKind::Binary`] carries application payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Binary payload.
    Binary,
    /// UTF-8 text payload.
    Text,
    /// Close notice from the peer.
    Close,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
    /// Raw frame surfaced by the lower layer.
    Raw,
}

impl FrameKind {
    /// Classifies a message.
    #[inline]
    #[must_use]
    pub fn of(message: &Message) -> Self {
        match message {
            Message::Binary(_) => Self::Binary,
            Message::Text(_) => Self::Text,
            Message::Close(_) => Self::Close,
            Message::Ping(_) => Self::Ping,
            Message::Pong(_) => Self::Pong,
            Message::Frame(_) => Self::Raw,
        }
    }

    /// Returns `true` for ping and pong, which the lower layer answers itself.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Ping | Self::Pong)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Text => "text",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Raw => "raw frame",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_messages() {
        assert_eq!(FrameKind::of(&Message::binary(vec![1, 2])), FrameKind::Binary);
        assert_eq!(FrameKind::of(&Message::text("hi")), FrameKind::Text);
        assert_eq!(FrameKind::of(&Message::Close(None)), FrameKind::Close);
        assert_eq!(FrameKind::of(&Message::Ping(Default::default())), FrameKind::Ping);
    }

    #[test]
    fn test_only_ping_pong_are_control() {
        assert!(FrameKind::Ping.is_control());
        assert!(FrameKind::Pong.is_control());
        assert!(!FrameKind::Text.is_control());
        assert!(!FrameKind::Close.is_control());
    }
}
