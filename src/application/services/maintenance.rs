//! Token Sweeper Service
//!
//! Removes expired and spent password reset tokens in the background.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::RepositoryProvider;
use crate::shared::shutdown::ShutdownSignal;

/// Configuration for the token sweeper
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to sweep (in seconds)
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600, // Sweep once per hour
        }
    }
}

/// Token Sweeper Service
///
/// Runs in the background and deletes reset tokens that expired or were
/// already used. The first sweep runs right after startup.
pub struct TokenSweeper {
    repos: Arc<dyn RepositoryProvider>,
    config: SweeperConfig,
}

impl TokenSweeper {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self {
            repos,
            config: SweeperConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SweeperConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the sweeper background task
    pub fn start(&self, shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
        let repos = self.repos.clone();
        let interval_secs = self.config.interval_secs;

        tokio::spawn(async move {
            info!("🧹 Token sweeper started (interval: {}s)", interval_secs);

            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match repos.reset_tokens().delete_expired(Utc::now()).await {
                            Ok(0) => {}
                            Ok(removed) => {
                                info!("🧹 Removed {} stale password reset token(s)", removed);
                            }
                            Err(e) => {
                                warn!("Token sweep error: {}", e);
                            }
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("🧹 Token sweeper shutting down");
                        break;
                    }
                }
            }

            info!("🧹 Token sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::in_memory_provider;

    #[tokio::test]
    async fn test_sweeps_on_startup_and_stops_on_shutdown() {
        let provider = in_memory_provider();

        provider
            .reset_tokens()
            .insert("user-1", "expired", Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        provider
            .reset_tokens()
            .insert("user-1", "live", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();

        let sweeper = TokenSweeper::new(provider.clone());
        let shutdown = ShutdownSignal::new();
        let handle = sweeper.start(shutdown.clone());

        // The first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(provider
            .reset_tokens()
            .find_by_token("expired")
            .await
            .unwrap()
            .is_none());
        assert!(provider
            .reset_tokens()
            .find_by_token("live")
            .await
            .unwrap()
            .is_some());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("sweeper should stop on shutdown")
            .expect("sweeper task should not panic");
    }
}
