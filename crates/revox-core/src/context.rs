//! Run context threaded through the orchestrator

use crate::config::RevoxConfig;
use std::sync::Arc;
use uuid::Uuid;

/// Per-run values built once at startup
///
/// Carries the validated configuration and the identifiers every log line
/// of the run is tagged with.
#[derive(Debug, Clone)]
pub struct Context {
    run_id: Uuid,
    config: Arc<RevoxConfig>,
    span: tracing::Span,
}

impl Context {
    /// Create a context with a fresh run id
    #[must_use]
    pub fn new(config: RevoxConfig) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "revox",
            run_id = %run_id,
            login = %config.unity.login,
        );
        Self {
            run_id,
            config: Arc::new(config),
            span,
        }
    }

    /// Run identifier
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Validated configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RevoxConfig {
        &self.config
    }

    /// Portal account being processed
    #[inline]
    #[must_use]
    pub fn login(&self) -> &str {
        &self.config.unity.login
    }

    /// Span covering the whole run
    #[inline]
    #[must_use]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_get_distinct_run_ids() {
        let mut config = RevoxConfig::default();
        config.unity.login = "ci@example.com".to_string();

        let a = Context::new(config.clone());
        let b = Context::new(config);
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.login(), "ci@example.com");
    }
}
