//! Async validation rule backed by an [`EmailDirectory`]

use super::EmailDirectory;
use crate::form::{AsyncRule, Value};
use async_trait::async_trait;
use std::sync::Arc;

pub const EMAIL_TAKEN: &str = "Email already exists";

/// Rejects addresses the directory already knows
#[derive(Clone)]
pub struct EmailAvailable {
    directory: Arc<dyn EmailDirectory>,
}

impl EmailAvailable {
    pub fn new(directory: Arc<dyn EmailDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AsyncRule for EmailAvailable {
    async fn check(&self, value: Value, _form: Value) -> anyhow::Result<Result<(), String>> {
        let Some(email) = value.as_str() else {
            return Ok(Ok(()));
        };
        if self.directory.is_registered(email).await? {
            Ok(Err(EMAIL_TAKEN.to_string()))
        } else {
            Ok(Ok(()))
        }
    }
}
