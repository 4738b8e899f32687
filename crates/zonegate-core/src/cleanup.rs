//! Background worker that purges expired emails and short links.

use tokio::time::{interval, Duration};
use tracing::warn;
use zonegate_common::Result;
use zonegate_storage::{
    DatabasePool, EmailRepository, EmailRepositoryTrait, LinkRepository, LinkRepositoryTrait,
};

const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Periodic expiry sweeper. Rows past their `expires_at` are deleted in
/// bulk; readers already treat them as gone, so timing is not critical.
pub struct CleanupWorker {
    emails: EmailRepository,
    links: LinkRepository,
    interval_secs: u64,
}

impl CleanupWorker {
    pub fn new(db: DatabasePool) -> Self {
        Self {
            emails: EmailRepository::new(db.clone()),
            links: LinkRepository::new(db),
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }

    /// Sets the sweep interval in seconds.
    pub fn with_interval(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Runs the sweep loop forever. Errors are logged and the loop
    /// continues on the next tick.
    pub async fn run(&self) {
        // A zero interval would panic inside tokio.
        let mut ticker = interval(Duration::from_secs(self.interval_secs.max(1)));

        loop {
            ticker.tick().await;

            match self.sweep().await {
                Ok((emails, links)) => {
                    if emails > 0 {
                        tracing::info!("Purged {} expired emails", emails);
                    }
                    if links > 0 {
                        tracing::info!("Purged {} expired short links", links);
                    }
                }
                Err(e) => {
                    warn!("Cleanup sweep failed: {}", e);
                }
            }
        }
    }

    /// Deletes expired rows once and returns (emails, links) counts.
    pub async fn sweep(&self) -> Result<(u64, u64)> {
        let expired_emails = self.emails.purge_expired().await?;
        let expired_links = self.links.purge_expired().await?;
        Ok((expired_emails, expired_links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zonegate_common::config::DatabaseConfig;

    fn test_pool() -> DatabasePool {
        let config = DatabaseConfig {
            url: Some("postgres://localhost/zonegate_test".to_string()),
            ..Default::default()
        };
        DatabasePool::new_lazy(&config).unwrap()
    }

    #[tokio::test]
    async fn interval_builder_overrides_default() {
        let worker = CleanupWorker::new(test_pool());
        assert_eq!(worker.interval_secs, DEFAULT_INTERVAL_SECS);

        let worker = CleanupWorker::new(test_pool()).with_interval(60);
        assert_eq!(worker.interval_secs, 60);
    }
}
