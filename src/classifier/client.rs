use std::sync::Arc;

use chrono::Utc;

use crate::domain::{ClassificationKind, ClassificationResult, CommentPayload};

use super::{
    error::ServiceError,
    key_cache::VerifiedKeySet,
    transport::Transport,
    wire::{self, Endpoint, Endpoints},
};

/// Facade over the remote spam classification service.
#[derive(Clone)]
pub struct SpamCheckClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    verified: Arc<VerifiedKeySet>,
}

impl SpamCheckClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        verified: Arc<VerifiedKeySet>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            verified,
        }
    }

    pub fn verified_keys(&self) -> &VerifiedKeySet {
        &self.verified
    }

    /// Checks an API key, answering from the verified set when possible.
    pub async fn verify_key(&self, api_key: &str, homepage: &str) -> Result<bool, ServiceError> {
        if self.verified.contains(api_key) {
            return Ok(true);
        }

        let url = self.endpoints.url(Endpoint::VerifyKey, api_key)?;
        let body = wire::encode_form(&wire::verify_key_fields(api_key, homepage));
        let response = self.transport.post_form(&url, body).await?;
        let valid = wire::parse_key_reply(&response).inspect_err(|err| {
            tracing::error!(
                target: "classifier",
                error = %err,
                server = response.header(wire::HEADER_SERVER).as_deref(),
                "key verification failed"
            );
        })?;

        tracing::debug!(
            target: "classifier",
            valid,
            debug_help = response.header(wire::HEADER_DEBUG).as_deref(),
            "key verification answered"
        );
        if valid {
            self.verified.insert(api_key);
        }
        Ok(valid)
    }

    /// Classifies a comment. Transport and protocol failures come back as
    /// `Invalid` instead of an error.
    pub async fn check_comment(
        &self,
        api_key: &str,
        payload: &CommentPayload,
    ) -> ClassificationResult {
        let response = match self.post_comment(Endpoint::CommentCheck, api_key, payload).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    target: "classifier",
                    error = %err,
                    comment = payload.correlation_id(),
                    "comment check request failed"
                );
                return ClassificationResult::invalid();
            }
        };

        if !response.is_success() {
            tracing::error!(
                target: "classifier",
                status = response.status,
                comment = payload.correlation_id(),
                "comment check rejected by classifier"
            );
            return wire::parse_check_reply(&response);
        }
        let result = wire::parse_check_reply(&response);
        if result.kind == ClassificationKind::Invalid {
            tracing::error!(
                target: "classifier",
                reply = %response.body.trim(),
                info = ?result.info,
                comment = payload.correlation_id(),
                "classifier reply could not be interpreted"
            );
        } else {
            tracing::info!(
                target: "classifier",
                verdict = %result.kind,
                comment = payload.correlation_id(),
                "comment classified"
            );
        }
        result
    }

    pub async fn report_spam(&self, api_key: &str, payload: &CommentPayload) {
        self.report(Endpoint::SubmitSpam, api_key, payload).await;
    }

    pub async fn report_ham(&self, api_key: &str, payload: &CommentPayload) {
        self.report(Endpoint::SubmitHam, api_key, payload).await;
    }

    /// Fire-and-forget submission; the reply body carries nothing useful.
    async fn report(&self, endpoint: Endpoint, api_key: &str, payload: &CommentPayload) {
        match self.post_comment(endpoint, api_key, payload).await {
            Ok(response) if response.is_success() => {
                tracing::debug!(
                    target: "classifier",
                    endpoint = ?endpoint,
                    comment = payload.correlation_id(),
                    "report submitted"
                );
            }
            Ok(response) => {
                tracing::error!(
                    target: "classifier",
                    endpoint = ?endpoint,
                    status = response.status,
                    comment = payload.correlation_id(),
                    "report rejected by classifier"
                );
            }
            Err(err) => {
                tracing::error!(
                    target: "classifier",
                    endpoint = ?endpoint,
                    error = %err,
                    comment = payload.correlation_id(),
                    "report request failed"
                );
            }
        }
    }

    async fn post_comment(
        &self,
        endpoint: Endpoint,
        api_key: &str,
        payload: &CommentPayload,
    ) -> Result<super::transport::TransportResponse, ServiceError> {
        let url = self.endpoints.url(endpoint, api_key)?;
        let body = wire::encode_form(&wire::comment_fields(api_key, payload, Utc::now()));
        self.transport.post_form(&url, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classifier::transport::TransportResponse, testing::MockTransport};

    fn client(transport: Arc<MockTransport>) -> SpamCheckClient {
        SpamCheckClient::new(transport, Endpoints::default(), Arc::new(VerifiedKeySet::new()))
    }

    #[tokio::test]
    async fn valid_key_is_verified_once() {
        let transport = Arc::new(
            MockTransport::new().reply(Endpoint::VerifyKey, TransportResponse::ok("valid")),
        );
        let client = client(transport.clone());

        assert!(client.verify_key("good", "https://site").await.unwrap());
        assert!(client.verify_key("good", "https://site").await.unwrap());

        assert_eq!(transport.calls(Endpoint::VerifyKey), 1);
        assert!(client.verified_keys().contains("good"));
        assert_eq!(
            transport.last_body(Endpoint::VerifyKey).as_deref(),
            Some("key=good&blog=https%3A%2F%2Fsite")
        );
    }

    #[tokio::test]
    async fn invalid_key_is_asked_again() {
        let transport = Arc::new(
            MockTransport::new().reply(Endpoint::VerifyKey, TransportResponse::ok("invalid")),
        );
        let client = client(transport.clone());

        assert!(!client.verify_key("bad", "https://site").await.unwrap());
        assert!(!client.verify_key("bad", "https://site").await.unwrap());

        assert_eq!(transport.calls(Endpoint::VerifyKey), 2);
        assert!(client.verified_keys().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_during_verification_is_an_error_and_not_cached() {
        let transport = Arc::new(
            MockTransport::new()
                .fail(Endpoint::VerifyKey, ServiceError::Timeout)
                .reply(Endpoint::VerifyKey, TransportResponse::ok("valid")),
        );
        let client = client(transport.clone());

        let err = client.verify_key("good", "https://site").await.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout));
        assert!(client.verified_keys().is_empty());

        assert!(client.verify_key("good", "https://site").await.unwrap());
        assert_eq!(transport.calls(Endpoint::VerifyKey), 2);
    }

    #[tokio::test]
    async fn check_comment_degrades_failures_to_invalid() {
        let transport = Arc::new(
            MockTransport::new()
                .fail(Endpoint::CommentCheck, ServiceError::Transport("reset".into()))
                .reply(
                    Endpoint::CommentCheck,
                    TransportResponse {
                        status: 502,
                        ..TransportResponse::ok("true")
                    },
                ),
        );
        let client = client(transport.clone());
        let payload = CommentPayload::default();

        assert!(client.check_comment("k", &payload).await.is_invalid());
        assert!(client.check_comment("k", &payload).await.is_invalid());
        assert_eq!(transport.calls(Endpoint::CommentCheck), 2);
    }

    #[tokio::test]
    async fn check_comment_posts_to_key_scoped_endpoint() {
        let transport = Arc::new(MockTransport::new().reply(
            Endpoint::CommentCheck,
            TransportResponse::ok("false").with_header("X-akismet-server", "s1"),
        ));
        let client = client(transport.clone());
        let payload = CommentPayload {
            content: Some("hello".into()),
            ..Default::default()
        };

        let result = client.check_comment("k1", &payload).await;
        assert_eq!(result.kind, ClassificationKind::Ham);
        assert_eq!(
            transport.last_url(Endpoint::CommentCheck).as_deref(),
            Some("https://k1.rest.example.com/1.1/comment-check")
        );
        let body = transport.last_body(Endpoint::CommentCheck).unwrap();
        assert!(body.contains("comment_content=hello"));
        assert!(body.contains("key=k1"));
    }

    #[tokio::test]
    async fn reports_swallow_failures() {
        let transport = Arc::new(
            MockTransport::new()
                .fail(Endpoint::SubmitSpam, ServiceError::Timeout)
                .reply(
                    Endpoint::SubmitHam,
                    TransportResponse::ok("Thanks for making the web a better place."),
                ),
        );
        let client = client(transport.clone());
        let payload = CommentPayload::default();

        client.report_spam("k", &payload).await;
        client.report_ham("k", &payload).await;

        assert_eq!(transport.calls(Endpoint::SubmitSpam), 1);
        assert_eq!(transport.calls(Endpoint::SubmitHam), 1);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn error_status_is_logged_once_and_not_reported_as_classified() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Arc::new(MockTransport::new().reply(
            Endpoint::CommentCheck,
            TransportResponse {
                status: 503,
                ..TransportResponse::ok("false").with_header(wire::HEADER_SERVER, "node-7")
            },
        ));
        let result = client(transport).check_comment("k", &CommentPayload::default()).await;

        assert!(result.is_invalid());
        assert!(result.info.is_empty());
        let output = String::from_utf8_lossy(&logs.0.lock()).into_owned();
        assert!(output.contains("comment check rejected by classifier"));
        assert!(!output.contains("comment classified"));
    }
}
