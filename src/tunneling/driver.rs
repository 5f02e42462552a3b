use tracing::info;

use crate::config::SessionConfig;

use super::{SessionError, TunnelEngine};

/// Owns the process-level session loop: one session attempt at a time,
/// clean endings reconnect immediately, the first failure ends the process.
pub(crate) struct SessionDriver<E> {
    engine: E,
    config: SessionConfig,
    print_token: bool,
}

impl<E: TunnelEngine> SessionDriver<E> {
    pub fn new(engine: E, config: SessionConfig, print_token: bool) -> Self {
        SessionDriver {
            engine,
            config,
            print_token,
        }
    }

    /// Runs sessions until one fails and returns that failure unchanged.
    /// There is no backoff or bounded retry at this layer.
    pub async fn run(&self) -> SessionError {
        for (key, url) in self.config.routes.iter() {
            info!("upstream: {} => {}", key, url);
        }
        if self.print_token && !self.config.token.is_empty() {
            info!("token: {:?}", self.config.token);
        }
        loop {
            match self.engine.run_session(&self.config).await {
                Ok(()) => info!("session with {} closed, reconnecting", self.config.remote),
                Err(err) => return err,
            }
        }
    }
}
