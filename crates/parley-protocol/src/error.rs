//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire events.
///
/// A `ProtocolError` always means the bytes were wrong, never that the
/// request they carried was unauthorized or invalid — those are judged
/// after decoding, by the layers above.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed. Common causes: malformed JSON, missing
    /// required fields, an unknown `event` tag, or truncated frames.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates protocol rules — e.g. a
    /// non-handshake event arriving before authentication.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
