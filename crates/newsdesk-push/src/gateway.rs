use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::PushMessage;

/// Outcome of delivering one message to one device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    /// The token will never accept a message again (unregistered or
    /// malformed); its device row should be removed.
    InvalidToken(String),
    /// Transient or unclassified failure; the token is kept.
    Failed(String),
}

impl DeliveryResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryResult::Delivered)
    }
}

/// A push delivery service.
///
/// `send_batch` returns one result per token, in token order. An `Err`
/// means nothing in the batch was attempted.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_batch(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<DeliveryResult>>;
}

/// Gateway that records every send instead of delivering it. Tokens listed
/// as invalid are reported as such.
#[derive(Default)]
pub struct RecordingGateway {
    invalid: HashSet<String>,
    sent: Mutex<Vec<(PushMessage, Vec<String>)>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invalid_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            invalid: tokens.into_iter().map(Into::into).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every batch sent so far, oldest first.
    pub fn sent(&self) -> Vec<(PushMessage, Vec<String>)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Titles of every message sent so far, one per batch.
    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|(m, _)| m.title).collect()
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send_batch(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<DeliveryResult>> {
        let mut sent = match self.sent.lock() {
            Ok(sent) => sent,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push((message.clone(), tokens.to_vec()));

        Ok(tokens
            .iter()
            .map(|t| {
                if self.invalid.contains(t) {
                    DeliveryResult::InvalidToken("UNREGISTERED".into())
                } else {
                    DeliveryResult::Delivered
                }
            })
            .collect())
    }
}
