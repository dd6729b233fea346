//! In-memory directory with simulated lookup latency

use super::EmailDirectory;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// Accounts known to the sample directory
const SEED_ACCOUNTS: &[&str] = &[
    "Sincere@april.biz",
    "Shanna@melissa.tv",
    "Nathan@yesenia.net",
    "Julianne.OConner@kory.org",
    "Lucio_Hettinger@annie.ca",
    "Karley_Dach@jasper.info",
    "Telly.Hoeger@billy.biz",
    "Sherwood@rosamond.me",
    "Chaim_McDermott@dana.io",
    "Rey.Padberg@karina.biz",
];

/// Directory held in memory; lookups are case-insensitive
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    accounts: HashSet<String>,
    latency: Duration,
    offline: bool,
}

impl InMemoryDirectory {
    pub fn new(accounts: impl IntoIterator<Item = impl AsRef<str>>, latency: Duration) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|email| email.as_ref().to_lowercase())
                .collect(),
            latency,
            offline: false,
        }
    }

    /// Directory pre-filled with the sample accounts
    pub fn seeded(latency: Duration) -> Self {
        Self::new(SEED_ACCOUNTS.iter().copied(), latency)
    }

    /// Make every lookup fail, as if the service were down
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }
}

#[async_trait]
impl EmailDirectory for InMemoryDirectory {
    async fn is_registered(&self, email: &str) -> Result<bool> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline {
            bail!("email directory is unreachable");
        }
        tracing::debug!("Directory lookup for {email}");
        Ok(self.accounts.contains(&email.trim().to_lowercase()))
    }
}
