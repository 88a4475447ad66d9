//! Server Implementation
//!
//! HTTP 服务器与实时推送监听的启动和关闭管理

use tokio_util::sync::CancellationToken;

use crate::api;
use crate::core::{Config, ServerState};
use crate::fanout::FeedServer;

/// HTTP Server
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

    /// Create server with existing state (tests, tooling)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        // Create application state if not provided
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await,
        };

        let shutdown_token = CancellationToken::new();

        // Realtime feed listener on its own port
        let feed = FeedServer::new(
            state.hub.clone(),
            format!("0.0.0.0:{}", self.config.feed_port),
        );
        let feed_token = shutdown_token.clone();
        tokio::spawn(async move {
            if let Err(e) = feed.run(feed_token).await {
                tracing::error!("Realtime feed failed: {}", e);
            }
        });

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Dine Server starting on {}", addr);

        let app = api::build_app(&state);
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let shutdown = {
            let token = shutdown_token.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
                token.cancel();
            }
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        shutdown_token.cancel();
        Ok(())
    }
}
