//! Failure classification policies.
//!
//! A classifier looks at one failure and the route's [`RetrySettings`] and
//! decides whether the failure is transient and how much retry budget that
//! class of failure has.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ClassifierKind;
use crate::error::{FailureKind, GatewayError};
use crate::resilience::RetrySettings;

/// Outcome of classifying one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub is_transient: bool,
    pub retry_delay: Duration,
    /// Retry budget for this class of failure.
    pub max_retry_count: u32,
}

impl RetryDecision {
    pub fn transient(settings: &RetrySettings) -> Self {
        Self {
            is_transient: true,
            retry_delay: settings.retry_delay,
            max_retry_count: settings.max_retry_count,
        }
    }

    pub fn non_transient(settings: &RetrySettings) -> Self {
        Self {
            is_transient: false,
            retry_delay: settings.retry_delay,
            max_retry_count: settings.default_max_retry_count_for_non_transient,
        }
    }
}

/// Decides how the retry loop treats a failure.
pub trait FailureClassifier: Send + Sync + std::fmt::Debug {
    fn classify(&self, failure: &GatewayError, settings: &RetrySettings) -> RetryDecision;
}

/// Treats every failure as non-transient.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysNonTransient;

impl FailureClassifier for AlwaysNonTransient {
    fn classify(&self, _failure: &GatewayError, settings: &RetrySettings) -> RetryDecision {
        RetryDecision::non_transient(settings)
    }
}

/// Retries timeouts and connection failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportAware;

impl FailureClassifier for TransportAware {
    fn classify(&self, failure: &GatewayError, settings: &RetrySettings) -> RetryDecision {
        match failure.kind() {
            FailureKind::Timeout => RetryDecision::transient(settings),
            FailureKind::Transport if failure.is_connect() => RetryDecision::transient(settings),
            _ => RetryDecision::non_transient(settings),
        }
    }
}

/// Classifier configured for a route.
pub fn from_kind(kind: ClassifierKind) -> Arc<dyn FailureClassifier> {
    match kind {
        ClassifierKind::AlwaysNonTransient => Arc::new(AlwaysNonTransient),
        ClassifierKind::TransportAware => Arc::new(TransportAware),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RetrySettings {
        RetrySettings {
            max_retry_count: 5,
            retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(1),
            default_max_retry_count_for_non_transient: 30,
        }
    }

    fn timeout() -> GatewayError {
        GatewayError::Timeout {
            endpoint: "http://10.0.0.5:8080/".into(),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_default_policy_is_non_transient() {
        let decision = AlwaysNonTransient.classify(&timeout(), &settings());
        assert!(!decision.is_transient);
        assert_eq!(decision.max_retry_count, 30);
    }

    #[test]
    fn test_transport_aware() {
        let decision = TransportAware.classify(&timeout(), &settings());
        assert!(decision.is_transient);
        assert_eq!(decision.max_retry_count, 5);
        assert_eq!(decision.retry_delay, Duration::from_millis(100));

        let resolution = GatewayError::resolution("fabric:/App/Svc", "service not found");
        assert!(!TransportAware.classify(&resolution, &settings()).is_transient);

        let build = GatewayError::ClientBuild {
            endpoint: "https://h/".into(),
            reason: "unsupported scheme".into(),
        };
        assert!(!TransportAware.classify(&build, &settings()).is_transient);
    }

    #[test]
    fn test_from_kind() {
        let classifier = from_kind(ClassifierKind::TransportAware);
        assert!(classifier.classify(&timeout(), &settings()).is_transient);

        let classifier = from_kind(ClassifierKind::default());
        assert!(!classifier.classify(&timeout(), &settings()).is_transient);
    }
}
