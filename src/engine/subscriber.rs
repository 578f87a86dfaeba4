use std::sync::Arc;

use thiserror::Error;

use crate::{
    classifier::SpamCheckClient,
    domain::{ActionKind, ClassificationResult, EventKind, LifecycleEvent, SpamCheckConfig},
    repository::{ContentNode, ContentRepository, ContentSession, NodeKind, RepositoryError, props},
};

use super::{
    dispatcher::{ActionDispatcher, ApplyReport, Decision, decide},
    payload::{PayloadDefaults, build_payload},
    resolver::ConfigResolver,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Returned to a content producer whose submission was classified as spam
/// under a `reject` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("comment not accepted")]
pub struct SubmissionRejected;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ConfigIncomplete,
    MarkedIgnore,
    NotAHandle,
    NoPublishableDocument,
}

#[derive(Debug)]
pub enum EventOutcome {
    /// The event kind is not one the subscriber reacts to.
    NotHandled,
    /// An unpublished document was pinned to `Ignore`.
    MarkedIgnore,
    Skipped(SkipReason),
    Applied(ApplyReport),
    Rejected,
    Failed(String),
}

impl EventOutcome {
    pub fn is_rejection(&self) -> bool {
        matches!(self, EventOutcome::Rejected)
    }

    /// Converts the outcome into what the producer of the content sees:
    /// everything but an explicit rejection counts as accepted.
    pub fn into_submission_result(self) -> Result<EventOutcome, SubmissionRejected> {
        match self {
            EventOutcome::Rejected => Err(SubmissionRejected),
            other => Ok(other),
        }
    }
}

/// Reacts to content lifecycle events and decides whether to publish.
pub struct EventSubscriber {
    repository: Arc<dyn ContentRepository>,
    client: SpamCheckClient,
    dispatcher: ActionDispatcher,
    defaults: PayloadDefaults,
}

impl EventSubscriber {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        client: SpamCheckClient,
        dispatcher: ActionDispatcher,
        defaults: PayloadDefaults,
    ) -> Self {
        Self {
            repository,
            client,
            dispatcher,
            defaults,
        }
    }

    /// Handles one event. Internal failures are logged and reported as
    /// [`EventOutcome::Failed`]; they never propagate to the caller.
    pub async fn on_event(&self, event: &LifecycleEvent) -> EventOutcome {
        tracing::debug!(
            target: "subscriber",
            kind = ?event.kind,
            node = %event.node,
            path = event.path.as_deref(),
            "handling lifecycle event"
        );
        match self.process(event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    target: "subscriber",
                    node = %event.node,
                    error = %err,
                    "event handling failed"
                );
                EventOutcome::Failed(err.to_string())
            }
        }
    }

    pub async fn process(&self, event: &LifecycleEvent) -> Result<EventOutcome, EngineError> {
        if !matches!(event.kind, EventKind::Unpublished) && !event.kind.is_document_new() {
            return Ok(EventOutcome::NotHandled);
        }

        let mut session = self.repository.open_session().await?;
        let node = session.get_by_id(&event.node).await?;

        if event.kind == EventKind::Unpublished {
            tracing::debug!(
                target: "subscriber",
                node = %node.id,
                "document unpublished, pinning marker to ignore"
            );
            session.add_marker(&node.id, ActionKind::Ignore).await?;
            session.save().await?;
            return Ok(EventOutcome::MarkedIgnore);
        }

        self.decide_and_apply(session.as_mut(), &node).await
    }

    async fn decide_and_apply(
        &self,
        session: &mut dyn ContentSession,
        node: &ContentNode,
    ) -> Result<EventOutcome, EngineError> {
        let config = ConfigResolver::resolve(session, node).await?;
        if !config.is_complete() {
            tracing::debug!(
                target: "subscriber",
                node = %node.id,
                "no complete spam-check configuration"
            );
            return Ok(EventOutcome::Skipped(SkipReason::ConfigIncomplete));
        }

        if ConfigResolver::resolve_marker(session, node).await? == Some(ActionKind::Ignore) {
            tracing::debug!(target: "subscriber", node = %node.id, "node is set to ignore");
            return Ok(EventOutcome::Skipped(SkipReason::MarkedIgnore));
        }

        if node.kind != NodeKind::Handle {
            tracing::debug!(
                target: "subscriber",
                node = %node.id,
                kind = ?node.kind,
                "event node is not a document handle"
            );
            return Ok(EventOutcome::Skipped(SkipReason::NotAHandle));
        }
        let Some(document) = find_unpublished(session, node).await? else {
            tracing::debug!(target: "subscriber", node = %node.id, "found no publishable document");
            return Ok(EventOutcome::Skipped(SkipReason::NoPublishableDocument));
        };

        let result = self.classify(&config, &document).await;
        if let Err(err) = session.record_check_result(&document.id, result.kind).await {
            tracing::warn!(
                target: "subscriber",
                document = %document.id,
                error = %err,
                "could not record check result"
            );
        }

        let action = match decide(&result, &config) {
            Decision::Reject => {
                tracing::info!(
                    target: "subscriber",
                    node = %node.id,
                    document = %document.id,
                    "spam rejected, nothing persisted"
                );
                return Ok(EventOutcome::Rejected);
            }
            Decision::Act(action) => action,
        };

        let report = self.dispatcher.apply(session, &node.id, &document, action).await;
        if report.succeeded() {
            session.save().await?;
        }
        Ok(EventOutcome::Applied(report))
    }

    async fn classify(
        &self,
        config: &SpamCheckConfig,
        document: &ContentNode,
    ) -> ClassificationResult {
        let Some(api_key) = config.api_key() else {
            return ClassificationResult::invalid();
        };
        match self.client.verify_key(api_key, &self.defaults.homepage).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(
                    target: "subscriber",
                    document = %document.id,
                    "configured API key was rejected by the classifier"
                );
                return ClassificationResult::invalid();
            }
            Err(err) => {
                tracing::error!(
                    target: "subscriber",
                    document = %document.id,
                    error = %err,
                    "could not verify API key"
                );
                return ClassificationResult::invalid();
            }
        }

        let payload = build_payload(document, &self.defaults);
        self.client.check_comment(api_key, &payload).await
    }
}

async fn find_unpublished(
    session: &dyn ContentSession,
    handle: &ContentNode,
) -> Result<Option<ContentNode>, RepositoryError> {
    let children = session.children(handle).await?;
    Ok(children.into_iter().find(|child| {
        child.kind == NodeKind::Document
            && child.property(props::STATE) == Some(props::STATE_UNPUBLISHED)
    }))
}
