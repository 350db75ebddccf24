//! Server Implementation
//!
//! Binds the listener and serves the API router until ctrl-c.

use tokio::net::TcpListener;

use crate::api;
use crate::core::{Config, ServerState};

/// HTTP server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (tests hand one in)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config),
        };

        let shutdown = state.shutdown.clone();
        let app = api::build_router(state);

        let addr = format!("{}:{}", self.config.bind_addr, self.config.http_port);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("counter-server listening on {addr}");

        // Cancelling the state token closes live WS sessions, so the
        // graceful drain is not held open by them
        let signal = async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            shutdown.cancel();
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;

        Ok(())
    }
}
