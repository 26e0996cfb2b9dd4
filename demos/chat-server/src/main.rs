//! Runnable chat server with an in-memory store and trusting auth.
//!
//! Connect with any WebSocket client and hand the user id as the token:
//!
//! ```json
//! { "event": "handshake", "data": { "version": 1, "token": "u-1" } }
//! ```
//!
//! Seeded users: u-1 (Ada), u-2 (Lin), u-3 (Grace). `BIND_ADDR` overrides
//! the listen address, `RUST_LOG` the log filter.

use parley::prelude::*;
use tracing_subscriber::EnvFilter;

/// Accepts the token as the user id, verbatim. The demo has no credential
/// issuer; a real deployment implements [`TokenVerifier`] against the
/// same rule its HTTP authentication middleware uses.
struct TrustingVerifier;

impl TokenVerifier for TrustingVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(UserId::from(token))
    }
}

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (id, name, email) in [
        ("u-1", "Ada", "ada@example.com"),
        ("u-2", "Lin", "lin@example.com"),
        ("u-3", "Grace", "grace@example.com"),
    ] {
        store
            .add_user(UserSummary {
                id: UserId::from(id),
                name: name.into(),
                email: email.into(),
            })
            .await;
    }
    store
}

#[tokio::main]
async fn main() -> Result<(), ChatError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());

    let store = seeded_store().await;
    let server = ChatServerBuilder::new()
        .bind(&bind_addr)
        .build(TrustingVerifier, store)
        .await?;

    tracing::info!(addr = %bind_addr, "chat server demo listening");
    server.run().await
}
