use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ActionKind, ClassificationKind};

use super::{
    node::{Capability, ContentNode, NodeId},
    props,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("node {0} not found")]
    NotFound(NodeId),
    #[error("node {0} was modified concurrently")]
    Conflict(NodeId),
    #[error("repository error: {0}")]
    Backend(String),
}

/// One unit of work against the content store. Writes stay local to the
/// session until `save` commits them.
#[async_trait]
pub trait ContentSession: Send + Sync {
    fn root_id(&self) -> NodeId;

    async fn get_by_id(&self, id: &NodeId) -> Result<ContentNode, RepositoryError>;

    async fn get_parent(&self, node: &ContentNode) -> Result<Option<ContentNode>, RepositoryError>;

    async fn children(&self, node: &ContentNode) -> Result<Vec<ContentNode>, RepositoryError>;

    async fn set_property(
        &mut self,
        id: &NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), RepositoryError>;

    async fn add_capability(
        &mut self,
        id: &NodeId,
        capability: Capability,
    ) -> Result<(), RepositoryError>;

    async fn save(&mut self) -> Result<(), RepositoryError>;

    fn has_pending_changes(&self) -> bool;

    /// Persists the publication marker on `id`.
    async fn add_marker(&mut self, id: &NodeId, kind: ActionKind) -> Result<(), RepositoryError> {
        self.add_capability(id, Capability::AutoPublish).await?;
        self.set_property(id, props::PUBLISH_ACTION, kind.as_str()).await
    }

    async fn record_check_result(
        &mut self,
        id: &NodeId,
        verdict: ClassificationKind,
    ) -> Result<(), RepositoryError> {
        self.add_capability(id, Capability::CheckResult).await?;
        self.set_property(id, props::CHECK_RESULT, verdict.as_str()).await
    }
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn ContentSession>, RepositoryError>;
}
