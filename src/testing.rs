//! Scripted collaborators for tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::classifier::{
    ServiceError,
    transport::{Transport, TransportResponse},
    wire::Endpoint,
};

type Scripted = Result<TransportResponse, ServiceError>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub url: String,
    pub body: String,
}

/// Transport answering from a per-endpoint script. The last scripted answer
/// of an endpoint repeats for every further call.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<HashMap<Endpoint, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, endpoint: Endpoint, response: TransportResponse) -> Self {
        self.push(endpoint, Ok(response))
    }

    pub fn fail(self, endpoint: Endpoint, error: ServiceError) -> Self {
        self.push(endpoint, Err(error))
    }

    fn push(self, endpoint: Endpoint, outcome: Scripted) -> Self {
        self.script
            .lock()
            .entry(endpoint)
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_body(&self, endpoint: Endpoint) -> Option<String> {
        self.last(endpoint).map(|call| call.body)
    }

    pub fn last_url(&self, endpoint: Endpoint) -> Option<String> {
        self.last(endpoint).map(|call| call.url)
    }

    fn last(&self, endpoint: Endpoint) -> Option<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|call| call.endpoint == endpoint)
            .cloned()
    }
}

fn endpoint_of(url: &Url) -> Option<Endpoint> {
    let last = url.path_segments()?.next_back()?;
    [
        Endpoint::VerifyKey,
        Endpoint::CommentCheck,
        Endpoint::SubmitSpam,
        Endpoint::SubmitHam,
    ]
    .into_iter()
    .find(|endpoint| endpoint.path() == last)
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_form(&self, url: &Url, body: String) -> Result<TransportResponse, ServiceError> {
        let endpoint = endpoint_of(url)
            .ok_or_else(|| ServiceError::InvalidEndpoint(url.to_string()))?;
        self.calls.lock().push(RecordedCall {
            endpoint,
            url: url.to_string(),
            body,
        });

        let mut script = self.script.lock();
        let queue = script
            .get_mut(&endpoint)
            .filter(|queue| !queue.is_empty())
            .ok_or_else(|| ServiceError::Transport(format!("no scripted reply for {url}")))?;
        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::Transport("script drained".into())))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ServiceError::Transport("script drained".into())))
        }
    }
}
