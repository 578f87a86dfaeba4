use std::sync::Arc;

use crate::{
    domain::{ActionKind, ClassificationKind, ClassificationResult, SpamAction, SpamCheckConfig},
    repository::{ContentNode, ContentSession, NodeId, WorkflowError, WorkflowManager},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Act(ActionKind),
    /// Content must not be persisted at all.
    Reject,
}

/// Maps a verdict and the effective configuration to a decision.
pub fn decide(result: &ClassificationResult, config: &SpamCheckConfig) -> Decision {
    match result.kind {
        ClassificationKind::Invalid => {
            tracing::error!(
                target: "dispatcher",
                info = ?result.info,
                "classification invalid, leaving the document for review"
            );
            Decision::Act(ActionKind::Ignore)
        }
        ClassificationKind::Ham => Decision::Act(config.ham_action.unwrap_or(ActionKind::Ignore)),
        ClassificationKind::Spam => {
            let Some(raw) = config.spam_action.as_deref() else {
                return Decision::Act(ActionKind::Ignore);
            };
            match raw.parse::<SpamAction>() {
                Ok(SpamAction::Reject) => Decision::Reject,
                Ok(SpamAction::Recommendation) if result.recommends_discard() => Decision::Reject,
                Ok(SpamAction::Recommendation) => Decision::Act(ActionKind::Ignore),
                Ok(SpamAction::Act(action)) => Decision::Act(action),
                Err(err) => {
                    tracing::error!(
                        target: "dispatcher",
                        error = %err,
                        "unknown spam action configured, falling back to ignore"
                    );
                    Decision::Act(ActionKind::Ignore)
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum WorkflowStatus {
    NotRequired,
    Applied,
    Failed(WorkflowError),
}

#[derive(Debug)]
pub struct ApplyReport {
    pub action: ActionKind,
    pub marker_written: bool,
    pub workflow: WorkflowStatus,
}

impl ApplyReport {
    /// Whether anything worth committing happened.
    pub fn succeeded(&self) -> bool {
        self.marker_written || matches!(self.workflow, WorkflowStatus::Applied)
    }
}

/// Applies decided actions: marker first, then the workflow operation.
#[derive(Clone)]
pub struct ActionDispatcher {
    workflows: Arc<dyn WorkflowManager>,
}

impl ActionDispatcher {
    pub fn new(workflows: Arc<dyn WorkflowManager>) -> Self {
        Self { workflows }
    }

    pub async fn apply(
        &self,
        session: &mut dyn ContentSession,
        marker_node: &NodeId,
        document: &ContentNode,
        action: ActionKind,
    ) -> ApplyReport {
        let marker_written = match session.add_marker(marker_node, action).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    target: "dispatcher",
                    node = %marker_node,
                    action = %action,
                    error = %err,
                    "failed to write publication marker"
                );
                false
            }
        };

        let workflow = match action {
            ActionKind::Ignore => WorkflowStatus::NotRequired,
            ActionKind::Publish | ActionKind::PublicationRequest => {
                match self.run_workflow(document, action).await {
                    Ok(()) => WorkflowStatus::Applied,
                    Err(err) => {
                        tracing::error!(
                            target: "dispatcher",
                            document = %document.id,
                            action = %action,
                            error = %err,
                            "publication workflow failed"
                        );
                        WorkflowStatus::Failed(err)
                    }
                }
            }
        };

        tracing::info!(
            target: "dispatcher",
            node = %marker_node,
            document = %document.id,
            action = %action,
            marker_written,
            "action applied"
        );
        ApplyReport {
            action,
            marker_written,
            workflow,
        }
    }

    async fn run_workflow(
        &self,
        document: &ContentNode,
        action: ActionKind,
    ) -> Result<(), WorkflowError> {
        let workflow = self
            .workflows
            .publication_workflow(document)
            .ok_or_else(|| WorkflowError::Unavailable(document.id.clone()))?;
        match action {
            ActionKind::Publish => workflow.publish(&document.id).await,
            ActionKind::PublicationRequest => workflow.request_publication(&document.id).await,
            ActionKind::Ignore => Ok(()),
        }
    }
}
