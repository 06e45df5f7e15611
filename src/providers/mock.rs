use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::base::{Provider, ProviderError, ToolOffer, Usage};
use super::types::message::Message;

/// One request as seen by the [`MockProvider`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    /// Names of the tools offered, empty when tools were withheld
    pub tools: Vec<String>,
    pub tools_offered: bool,
}

/// A mock provider that returns pre-configured responses for testing
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<Message, String>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Like [`MockProvider::new`], where an `Err` entry fails that request
    pub fn with_results(responses: Vec<Result<Message, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::default(),
        }
    }

    /// Requests received so far; clones share the same record
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        offer: ToolOffer<'_>,
    ) -> Result<(Message, Usage), ProviderError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tools: offer.tools().iter().map(|t| t.name.clone()).collect(),
            tools_offered: matches!(offer, ToolOffer::Auto(_)),
        });

        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(message)) => Ok((message, Usage::default())),
            Some(Err(reason)) => Err(ProviderError::MalformedResponse(reason)),
            None => Err(ProviderError::MalformedResponse(
                "mock provider has no more responses".to_string(),
            )),
        }
    }
}
