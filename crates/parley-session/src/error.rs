//! Error types for connection authentication.

/// Why a connection attempt was rejected.
///
/// Every variant terminates the connection attempt — no session is ever
/// registered for a caller that failed authentication. The display
/// strings are sent to the client verbatim as the final `error` event
/// before the connection closes, so their wording is part of the wire
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The handshake carried no token at all.
    #[error("Authentication error: Token missing")]
    MissingToken,

    /// The token failed verification — malformed, wrong signature,
    /// or revoked.
    #[error("Authentication error: Invalid token")]
    InvalidToken,

    /// The token was valid once but has expired.
    #[error("Authentication error: Token expired")]
    ExpiredToken,

    /// The token verified but names a user the directory doesn't know.
    #[error("Authentication error: User not found")]
    UserNotFound,
}
