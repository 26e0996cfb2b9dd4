//! `ChatServer` builder and accept loop.
//!
//! This is the entry point for running a chat server. It ties together
//! all the layers: transport → protocol → session/room → routing.

use std::sync::Arc;

use parley_protocol::{Codec, JsonCodec};
use parley_room::RoomService;
use parley_session::{SessionConfig, SessionRegistry, TokenVerifier};
use parley_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::service::ChatService;
use crate::{ChatError, ChatStore};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The session
/// registry is the only piece behind a `Mutex` — every mutation of live
/// presence (register, channel joins, disconnect records, grace expiry)
/// goes through that one lock, which is what makes the
/// disconnect/reconnect race a lock-ordering question instead of a bug
/// hunt. The store and room service synchronize themselves.
pub(crate) struct ServerState<V: TokenVerifier, S: ChatStore, C: Codec> {
    pub(crate) registry: Mutex<SessionRegistry>,
    pub(crate) rooms: RoomService<S>,
    pub(crate) store: S,
    pub(crate) auth: V,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a chat server.
///
/// # Example
///
/// ```rust,ignore
/// use parley::prelude::*;
///
/// let server = ChatServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(my_verifier, my_store)
///     .await?;
/// server.run().await
/// ```
pub struct ChatServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration (reconnection grace period).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds the server with the given verifier and store.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` — the combination every
    /// browser client speaks.
    pub async fn build<V: TokenVerifier, S: ChatStore>(
        self,
        auth: V,
        store: S,
    ) -> Result<ChatServer<V, S, JsonCodec>, ChatError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(SessionRegistry::new(self.session_config)),
            rooms: RoomService::new(store.clone()),
            store,
            auth,
            codec: JsonCodec,
        });

        Ok(ChatServer { transport, state })
    }
}

impl Default for ChatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running chat server.
///
/// Call [`run()`](Self::run) to start accepting connections; grab a
/// [`service()`](Self::service) handle first if an HTTP layer needs to
/// issue room and history operations alongside the live connections.
pub struct ChatServer<V: TokenVerifier, S: ChatStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<V, S, C>>,
}

impl<V, S, C> ChatServer<V, S, C>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec + Clone,
{
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle for the operations that arrive outside the live
    /// connection: room creation and mutation, history queries,
    /// online-user listings. Cloneable; safe to use from any task while
    /// the server runs.
    pub fn service(&self) -> ChatService<V, S, C> {
        ChatService::new(Arc::clone(&self.state))
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each;
    /// the handler owns the handshake, authentication, and the session's
    /// entire lifetime. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ChatError> {
        tracing::info!("chat server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection::<V, S, C>(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
