//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding frames and payloads.
///
/// Every variant is local to the frame that produced it. Only
/// [`ProtocolError::InvalidFrameLength`] is fatal for a stream, because once a
/// length prefix is corrupt the reader can no longer find the next frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown message type tag {0}")]
    UnknownMessageType(i32),

    #[error("unexpected end of frame data")]
    UnexpectedEof,

    #[error("invalid string length {0}")]
    InvalidStringLength(i32),

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid {kind} value {value}")]
    InvalidEnumValue { kind: &'static str, value: u8 },

    #[error("{0} unread bytes after payload")]
    TrailingBytes(usize),

    #[error("invalid frame length {0}")]
    InvalidFrameLength(i32),
}

impl ProtocolError {
    /// Whether the stream can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProtocolError::InvalidFrameLength(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_frame_length_is_fatal() {
        assert!(ProtocolError::UnknownMessageType(42).is_recoverable());
        assert!(ProtocolError::UnexpectedEof.is_recoverable());
        assert!(ProtocolError::InvalidUtf8.is_recoverable());
        assert!(!ProtocolError::InvalidFrameLength(-1).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::InvalidEnumValue {
            kind: "direction",
            value: 9,
        };
        assert_eq!(err.to_string(), "invalid direction value 9");
        assert_eq!(
            ProtocolError::UnknownMessageType(12).to_string(),
            "unknown message type tag 12"
        );
    }
}
