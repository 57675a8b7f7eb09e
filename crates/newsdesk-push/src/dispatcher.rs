//! Batch fan-out of one message to many device tokens.

use std::sync::Arc;

use newsdesk_shared::constants::{MAX_TOKENS_PER_BATCH, TEST_TOKEN_MARKERS};
use serde::Serialize;
use tracing::{debug, warn};

use crate::gateway::{DeliveryResult, PushGateway};
use crate::message::PushMessage;

/// Aggregate outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Nothing was sent (no gateway configured or no tokens).
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_batches: usize,
    /// Tokens the gateway reported as permanently invalid.
    #[serde(skip)]
    pub invalid_tokens: Vec<String>,
}

impl DispatchReport {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn delivered_any(&self) -> bool {
        self.success_count > 0
    }
}

/// `true` for tokens that may reach a real device: non-empty and free of
/// test markers (compared case-insensitively).
pub fn is_deliverable(token: &str) -> bool {
    if token.trim().is_empty() {
        return false;
    }
    let lower = token.to_lowercase();
    !TEST_TOKEN_MARKERS.iter().any(|m| lower.contains(m))
}

/// Splits tokens into gateway-sized batches and tallies the results.
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Option<Arc<dyn PushGateway>>,
    batch_size: usize,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self {
            gateway: Some(gateway),
            batch_size: MAX_TOKENS_PER_BATCH,
        }
    }

    /// Dispatcher without a gateway: every dispatch is skipped.
    pub fn disabled() -> Self {
        Self {
            gateway: None,
            batch_size: MAX_TOKENS_PER_BATCH,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_TOKENS_PER_BATCH);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.gateway.is_some()
    }

    /// Send `message` to every token. A failing batch is counted as failed
    /// and the remaining batches are still sent.
    pub async fn dispatch(&self, message: &PushMessage, tokens: &[String]) -> DispatchReport {
        let Some(gateway) = &self.gateway else {
            return DispatchReport::skipped("push gateway not configured");
        };
        if tokens.is_empty() {
            return DispatchReport::skipped("no device tokens");
        }

        let mut report = DispatchReport::default();
        for batch in tokens.chunks(self.batch_size) {
            report.total_batches += 1;
            match gateway.send_batch(message, batch).await {
                Ok(results) => {
                    for (token, result) in batch.iter().zip(results) {
                        match result {
                            DeliveryResult::Delivered => report.success_count += 1,
                            DeliveryResult::InvalidToken(reason) => {
                                debug!(%reason, "device token permanently invalid");
                                report.failure_count += 1;
                                report.invalid_tokens.push(token.clone());
                            }
                            DeliveryResult::Failed(reason) => {
                                debug!(%reason, "device delivery failed");
                                report.failure_count += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, batch_len = batch.len(), "push batch failed");
                    report.failure_count += batch.len();
                }
            }
        }
        report
    }
}
