//! Retry orchestration.
//!
//! # Responsibilities
//! - Resolve the target, acquire a client and run the unit of work
//! - Classify every failure, whichever step raised it
//! - Retry transient failures with backoff until the budget is spent
//! - Re-resolve after each failure, discarding the endpoint just used
//!
//! # State Machine
//! ```text
//! Resolving → Acquiring → Invoking → Succeeded
//!     ↑           │           │
//!     │           └─────┬─────┘
//!     │                 ▼
//!     └── Retrying ← Classifying → TerminalFailure
//! ```
//!
//! # Design Decisions
//! - 503 from a backend is transient regardless of the route's classifier
//! - Validation failures and cancellation are never retried
//! - Retries of one request are strictly sequential

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{ClientCache, ClientFactory};
use crate::error::{FailureKind, GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::partition::ServiceTarget;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::{FailureClassifier, RetryDecision, RetrySettings};
use crate::resolver::{Endpoint, ServiceResolver};

enum State<C> {
    Resolving,
    Acquiring(Endpoint),
    Invoking(Endpoint, Arc<C>),
    Classifying {
        endpoint: Option<Endpoint>,
        failure: GatewayError,
    },
    Retrying {
        endpoint: Option<Endpoint>,
        delay: Duration,
    },
}

/// Runs units of work against a partitioned service with retries.
pub struct RetryingInvoker<F: ClientFactory> {
    resolver: Arc<dyn ServiceResolver>,
    cache: Arc<ClientCache<F>>,
    classifier: Arc<dyn FailureClassifier>,
    settings: RetrySettings,
}

impl<F: ClientFactory> RetryingInvoker<F> {
    pub fn new(
        resolver: Arc<dyn ServiceResolver>,
        cache: Arc<ClientCache<F>>,
        classifier: Arc<dyn FailureClassifier>,
        settings: RetrySettings,
    ) -> Self {
        Self {
            resolver,
            cache,
            classifier,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<ClientCache<F>> {
        &self.cache
    }

    /// Run `work` against a client for `target` until it succeeds, fails
    /// terminally, or `cancel` fires.
    pub async fn invoke<T, W, Fut>(
        &self,
        target: &ServiceTarget,
        cancel: &CancellationToken,
        mut work: W,
    ) -> GatewayResult<T>
    where
        W: FnMut(Arc<F::Client>) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut state = State::Resolving;
        let mut previous: Option<Endpoint> = None;
        let mut retries: u32 = 0;

        loop {
            state = match state {
                State::Resolving => {
                    let resolved = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                        resolved = self.resolver.resolve(target, previous.as_ref()) => resolved,
                    };
                    match resolved {
                        Ok(endpoint) => State::Acquiring(endpoint),
                        Err(failure) => {
                            metrics::record_resolution_failure(target.service_uri.as_str());
                            State::Classifying {
                                endpoint: None,
                                failure,
                            }
                        }
                    }
                }

                State::Acquiring(endpoint) => {
                    let acquired = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                        acquired = self.cache.acquire(&endpoint) => acquired,
                    };
                    match acquired {
                        Ok(client) => State::Invoking(endpoint, client),
                        Err(failure) => State::Classifying {
                            endpoint: Some(endpoint),
                            failure,
                        },
                    }
                }

                State::Invoking(endpoint, client) => {
                    tracing::debug!(
                        target_service = %target,
                        endpoint = %endpoint,
                        attempt = retries + 1,
                        "Invoking backend"
                    );
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                        outcome = work(client) => outcome,
                    };
                    match outcome {
                        Ok(value) => return Ok(value),
                        Err(failure) => State::Classifying {
                            endpoint: Some(endpoint),
                            failure,
                        },
                    }
                }

                State::Classifying { endpoint, failure } => {
                    let kind = failure.kind();
                    if matches!(kind, FailureKind::Cancelled | FailureKind::Validation) {
                        return Err(failure);
                    }

                    let decision = match kind {
                        FailureKind::UpstreamUnavailable => RetryDecision::transient(&self.settings),
                        _ => self.classifier.classify(&failure, &self.settings),
                    };

                    if !decision.is_transient || retries >= decision.max_retry_count {
                        tracing::warn!(
                            target_service = %target,
                            endpoint = describe(&endpoint),
                            attempts = retries + 1,
                            transient = decision.is_transient,
                            kind = kind.as_str(),
                            error = %failure,
                            "Giving up on request"
                        );
                        return Err(failure);
                    }

                    tracing::info!(
                        target_service = %target,
                        endpoint = describe(&endpoint),
                        attempt = retries + 1,
                        kind = kind.as_str(),
                        error = %failure,
                        "Retrying request"
                    );
                    metrics::record_retry(target.service_uri.as_str(), kind.as_str());
                    State::Retrying {
                        endpoint,
                        delay: decision.retry_delay,
                    }
                }

                State::Retrying { endpoint, delay } => {
                    retries += 1;
                    if let Some(endpoint) = endpoint {
                        self.cache.invalidate(&endpoint);
                        previous = Some(endpoint);
                    }

                    let backoff = calculate_backoff(retries, delay, self.settings.max_retry_delay);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    State::Resolving
                }
            };
        }
    }
}

fn describe(endpoint: &Option<Endpoint>) -> &str {
    endpoint.as_ref().map(Endpoint::identity).unwrap_or("-")
}

impl<F: ClientFactory> std::fmt::Debug for RetryingInvoker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingInvoker")
            .field("resolver", &self.resolver)
            .field("classifier", &self.classifier)
            .field("settings", &self.settings)
            .finish()
    }
}
