//! Server orchestration

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::routes::{router, AppState};

/// Backend functions server
pub struct SecretServer {
    config: ServerConfig,
    state: AppState,
}

impl SecretServer {
    /// Create a server for the configured platform
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let state = config.build_state()?;
        Ok(Self { config, state })
    }

    /// Replace the handler state (e.g. a shared in-memory platform)
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = state;
        self
    }

    /// Bind the configured port and serve until the process exits
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = router(self.state, self.config.origin_header()?);

        info!("Secret server listening on {}", listener.local_addr()?);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
