//! ValidationEngine: ordered rule pipeline with supersession by generation
//!
//! Every field owns a [`Rules`] pipeline evaluated in a fixed order:
//!
//! 1. `required`
//! 2. `pattern` (skipped for empty values)
//! 3. synchronous validators, in registration order
//! 4. asynchronous validators, in registration order, awaited one at a time
//!
//! The first failing stage wins. Stages 1-3 run inside [`ValidationEngine::begin`];
//! stage 4 is packaged as an owned [`ValidationJob`] so it can be awaited
//! without borrowing the form. Each start of a validation and each value
//! write bumps the path's generation, and an outcome is only applied when
//! its generation is still current.

use super::error::ValidationError;
use super::path::FieldPath;
use super::value::Value;
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Synchronous check: `(value, whole form) -> Ok(()) | Err(message)`
pub type SyncCheck = Arc<dyn Fn(&Value, &Value) -> Result<(), String> + Send + Sync>;

/// Asynchronous check, e.g. a lookup against a remote service.
///
/// `Ok(Err(message))` is a normal rejection; `Err(_)` means the validator
/// itself failed and is reported as [`ValidationError::ValidatorFailed`].
#[async_trait]
pub trait AsyncRule: Send + Sync {
    async fn check(&self, value: Value, form: Value) -> anyhow::Result<Result<(), String>>;
}

#[async_trait]
impl<F, Fut> AsyncRule for F
where
    F: Fn(Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Result<(), String>>> + Send + 'static,
{
    async fn check(&self, value: Value, form: Value) -> anyhow::Result<Result<(), String>> {
        (self)(value, form).await
    }
}

/// The ordered validator stages of one field
#[derive(Clone, Default)]
pub struct Rules {
    required: Option<String>,
    pattern: Option<(Regex, String)>,
    sync: Vec<(String, SyncCheck)>,
    asynchronous: Vec<(String, Arc<dyn AsyncRule>)>,
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rules")
            .field("required", &self.required)
            .field("pattern", &self.pattern.as_ref().map(|(re, _)| re.as_str()))
            .field("sync", &self.sync.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field(
                "async",
                &self.asynchronous.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = Some(message.into());
        self
    }

    pub fn pattern(mut self, pattern: Regex, message: impl Into<String>) -> Self {
        self.pattern = Some((pattern, message.into()));
        self
    }

    pub fn validate<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.sync.push((name.into(), Arc::new(check)));
        self
    }

    pub fn validate_async<R>(mut self, name: impl Into<String>, rule: R) -> Self
    where
        R: AsyncRule + 'static,
    {
        self.asynchronous.push((name.into(), Arc::new(rule)));
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.is_some()
    }

    pub fn has_async(&self) -> bool {
        !self.asynchronous.is_empty()
    }

    /// Run stages 1-3; `Some` is the first failure
    fn check_sync(&self, value: &Value, form: &Value) -> Option<ValidationError> {
        if let Some(message) = &self.required {
            if value.is_empty() {
                return Some(ValidationError::Required {
                    message: message.clone(),
                });
            }
        }

        if let Some((pattern, message)) = &self.pattern {
            if !value.is_empty() && !pattern.is_match(&value.to_display_string()) {
                return Some(ValidationError::PatternMismatch {
                    message: message.clone(),
                });
            }
        }

        for (name, check) in &self.sync {
            if let Err(message) = check(value, form) {
                return Some(ValidationError::Custom {
                    rule: name.clone(),
                    message,
                });
            }
        }

        None
    }
}

/// Stage 4 for one field, detached from the form
#[must_use = "a validation job does nothing unless run"]
pub struct ValidationJob {
    path: FieldPath,
    generation: u64,
    value: Value,
    form: Value,
    rules: Vec<(String, Arc<dyn AsyncRule>)>,
}

impl fmt::Debug for ValidationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationJob")
            .field("path", &self.path)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ValidationJob {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Await the asynchronous validators in order, stopping at the first rejection
    pub async fn run(self) -> ValidationOutcome {
        let mut error = None;
        for (name, rule) in &self.rules {
            match rule.check(self.value.clone(), self.form.clone()).await {
                Ok(Ok(())) => continue,
                Ok(Err(message)) => {
                    error = Some(ValidationError::Custom {
                        rule: name.clone(),
                        message,
                    });
                }
                Err(err) => {
                    tracing::warn!("Validator `{name}` failed for `{}`: {err:#}", self.path);
                    error = Some(ValidationError::ValidatorFailed {
                        rule: name.clone(),
                        reason: format!("{err:#}"),
                    });
                }
            }
            break;
        }
        ValidationOutcome {
            path: self.path,
            generation: self.generation,
            error,
        }
    }
}

/// Result of a finished [`ValidationJob`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub path: FieldPath,
    pub generation: u64,
    pub error: Option<ValidationError>,
}

/// What `begin` produced for a field
#[derive(Debug)]
pub enum Stage {
    /// Validation finished synchronously
    Settled(Option<ValidationError>),
    /// Stages 1-3 passed; asynchronous validators still have to run
    Pending(ValidationJob),
}

/// Holds the rule pipelines and the per-path generations
#[derive(Debug, Default)]
pub struct ValidationEngine {
    rules: BTreeMap<FieldPath, Rules>,
    generations: BTreeMap<FieldPath, u64>,
    counter: u64,
}

impl ValidationEngine {
    pub fn set_rules(&mut self, path: &FieldPath, rules: Rules) {
        self.rules.insert(path.clone(), rules);
    }

    pub fn rules(&self, path: &FieldPath) -> Option<&Rules> {
        self.rules.get(path)
    }

    /// Invalidate any in-flight validation for `path`
    pub fn supersede(&mut self, path: &FieldPath) -> u64 {
        self.counter += 1;
        self.generations.insert(path.clone(), self.counter);
        self.counter
    }

    pub fn is_current(&self, outcome: &ValidationOutcome) -> bool {
        self.generations.get(&outcome.path) == Some(&outcome.generation)
    }

    /// Start validating `path` against `value`.
    ///
    /// Supersedes whatever validation of this path was still pending.
    pub fn begin(&mut self, path: &FieldPath, value: &Value, form: &Value) -> Stage {
        let generation = self.supersede(path);
        let Some(rules) = self.rules.get(path) else {
            return Stage::Settled(None);
        };

        if let Some(error) = rules.check_sync(value, form) {
            tracing::debug!("`{path}` failed rule `{}`", error.rule());
            return Stage::Settled(Some(error));
        }
        if !rules.has_async() {
            return Stage::Settled(None);
        }

        tracing::debug!("`{path}` pending async validation (generation {generation})");
        Stage::Pending(ValidationJob {
            path: path.clone(),
            generation,
            value: value.clone(),
            form: form.clone(),
            rules: rules.asynchronous.clone(),
        })
    }

    /// Forget rules and generations of `path` and everything beneath it
    pub fn discard_subtree(&mut self, path: &FieldPath) {
        self.rules.retain(|p, _| !path.is_prefix_of(p));
        self.generations.retain(|p, _| !path.is_prefix_of(p));
    }

    /// Re-key rule pipelines; generations under renamed paths are bumped so
    /// that jobs started under the old path are discarded
    pub fn rekey(&mut self, rename: impl Fn(&FieldPath) -> Option<FieldPath>) {
        let rules = std::mem::take(&mut self.rules);
        let mut renamed = Vec::new();
        self.rules = rules
            .into_iter()
            .map(|(path, rules)| match rename(&path) {
                Some(new_path) => {
                    renamed.push(path);
                    renamed.push(new_path.clone());
                    (new_path, rules)
                }
                None => (path, rules),
            })
            .collect();
        for path in renamed {
            self.supersede(&path);
        }
    }
}
