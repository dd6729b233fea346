//! Trait abstraction for the email directory to enable mocking in tests

use anyhow::Result;
use async_trait::async_trait;

/// Lookup service answering whether an address is already in use
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailDirectory: Send + Sync {
    /// Whether an account already uses `email`
    async fn is_registered(&self, email: &str) -> Result<bool>;
}
