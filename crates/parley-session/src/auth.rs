//! Authentication hook for resolving a connection to a user identity.
//!
//! Parley doesn't issue or validate credentials itself — the token
//! mechanism (JWT, opaque API token, whatever the surrounding system
//! uses) lives with the HTTP API, and the same verification rule must
//! apply at both entry points: the HTTP middleware and the live
//! connection handshake.
//!
//! This crate therefore defines only the seam: a [`TokenVerifier`] trait
//! with a single async method from token to [`UserId`]. The surrounding
//! application implements it once and hands it to both layers.

use parley_protocol::UserId;

use crate::AuthError;

/// Validates a bearer token presented at connection time and resolves it
/// to the user it was issued for.
///
/// # Trait bounds
///
/// - `Send + Sync` → verification runs concurrently from every
///   connection task.
/// - `'static` → the verifier lives as long as the server; it may not
///   borrow temporary data.
///
/// # Example
///
/// ```rust
/// use parley_session::{TokenVerifier, AuthError};
/// use parley_protocol::UserId;
///
/// /// Treats the token itself as the user id. Development only —
/// /// anyone can claim to be anyone.
/// struct TrustingVerifier;
///
/// impl TokenVerifier for TrustingVerifier {
///     async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
///         if token.is_empty() {
///             return Err(AuthError::MissingToken);
///         }
///         Ok(UserId::from(token))
///     }
/// }
/// ```
pub trait TokenVerifier: Send + Sync + 'static {
    /// Verifies the given token and returns the id it was issued for.
    ///
    /// Called during the connection handshake, before any chat handler
    /// runs. The returned id is then resolved through the user directory;
    /// a verifier therefore does not need to check that the user still
    /// exists — only that the token is genuine and current.
    ///
    /// # Errors
    /// - [`AuthError::MissingToken`] — no token was presented
    /// - [`AuthError::InvalidToken`] — the token fails verification
    /// - [`AuthError::ExpiredToken`] — the token is past its lifetime
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, AuthError>> + Send;
}
