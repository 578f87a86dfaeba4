use crate::{
    domain::{ActionKind, SpamCheckConfig},
    repository::{Capability, ContentNode, ContentSession, RepositoryError, props},
};

/// Upper bound on the ancestor walk. Deeper trees are treated as if the
/// root had been reached.
pub const MAX_ANCESTOR_DEPTH: usize = 256;

/// Walks a node and its ancestors merging spam-check configuration, closest
/// value first.
pub struct ConfigResolver;

impl ConfigResolver {
    /// Effective configuration for `node`. An incomplete result is normal;
    /// callers check [`SpamCheckConfig::is_complete`].
    pub async fn resolve(
        session: &dyn ContentSession,
        node: &ContentNode,
    ) -> Result<SpamCheckConfig, RepositoryError> {
        let mut config = SpamCheckConfig::default();
        let mut ancestors = Ancestors::new(session, node.clone());
        while let Some(current) = ancestors.next().await? {
            if current.has_capability(Capability::SpamCheck) {
                config.merge_missing(read_config(&current));
            }
            if config.is_complete() {
                break;
            }
        }
        tracing::debug!(
            target: "resolver",
            node = %node.id,
            complete = config.is_complete(),
            depth = ancestors.visited,
            "configuration resolved"
        );
        Ok(config)
    }

    /// Closest persisted publication marker on `node` or its ancestors.
    pub async fn resolve_marker(
        session: &dyn ContentSession,
        node: &ContentNode,
    ) -> Result<Option<ActionKind>, RepositoryError> {
        let mut ancestors = Ancestors::new(session, node.clone());
        while let Some(current) = ancestors.next().await? {
            if !current.has_capability(Capability::AutoPublish) {
                continue;
            }
            let Some(value) = current.text_property(props::PUBLISH_ACTION) else {
                continue;
            };
            match value.parse::<ActionKind>() {
                Ok(action) => return Ok(Some(action)),
                Err(err) => {
                    tracing::warn!(
                        target: "resolver",
                        node = %current.id,
                        error = %err,
                        "ignoring unreadable publication marker"
                    );
                }
            }
        }
        Ok(None)
    }
}

fn read_config(node: &ContentNode) -> SpamCheckConfig {
    let ham_action = node
        .text_property(props::HAM_ACTION)
        .map(|value| match value.parse::<ActionKind>() {
            Ok(action) => action,
            Err(err) => {
                tracing::warn!(
                    target: "resolver",
                    node = %node.id,
                    error = %err,
                    "unknown ham action, falling back to ignore"
                );
                ActionKind::Ignore
            }
        });
    SpamCheckConfig {
        api_key: node.text_property(props::API_KEY),
        ham_action,
        spam_action: node.text_property(props::SPAM_ACTION),
    }
}

struct Ancestors<'a> {
    session: &'a dyn ContentSession,
    root: crate::repository::NodeId,
    next: Option<ContentNode>,
    visited: usize,
}

impl<'a> Ancestors<'a> {
    fn new(session: &'a dyn ContentSession, start: ContentNode) -> Self {
        Self {
            root: session.root_id(),
            session,
            next: Some(start),
            visited: 0,
        }
    }

    async fn next(&mut self) -> Result<Option<ContentNode>, RepositoryError> {
        let Some(current) = self.next.take() else {
            return Ok(None);
        };
        self.visited += 1;
        if current.id != self.root && self.visited < MAX_ANCESTOR_DEPTH {
            self.next = self.session.get_parent(&current).await?;
        } else if current.id != self.root {
            tracing::warn!(
                target: "resolver",
                node = %current.id,
                "ancestor walk stopped at depth limit"
            );
        }
        Ok(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryRepository, NodeId};

    fn chain(a: ContentNode, b: ContentNode) -> (MemoryRepository, ContentNode) {
        let repo = MemoryRepository::new(ContentNode::root("root"));
        repo.insert(a).unwrap();
        repo.insert(b).unwrap();
        repo.insert(ContentNode::handle("leaf", "b")).unwrap();
        let leaf = repo.node(&NodeId::from("leaf")).unwrap();
        (repo, leaf)
    }

    fn configured(id: &str, parent: &str) -> ContentNode {
        ContentNode::folder(id, parent).with_capability(Capability::SpamCheck)
    }

    #[tokio::test]
    async fn closest_api_key_wins() {
        let (repo, leaf) = chain(
            configured("a", "root")
                .with_property(props::API_KEY, "X")
                .with_property(props::HAM_ACTION, "request"),
            configured("b", "a").with_property(props::API_KEY, "Y"),
        );

        let config = ConfigResolver::resolve(&repo.session(), &leaf).await.unwrap();
        assert_eq!(config.api_key.as_deref(), Some("Y"));
        assert_eq!(config.ham_action, Some(ActionKind::PublicationRequest));
    }

    #[tokio::test]
    async fn fields_merge_across_levels() {
        let (repo, leaf) = chain(
            configured("a", "root")
                .with_property(props::API_KEY, "X")
                .with_property(props::SPAM_ACTION, "reject"),
            configured("b", "a")
                .with_property(props::API_KEY, " Y ")
                .with_property(props::HAM_ACTION, "publish"),
        );

        let config = ConfigResolver::resolve(&repo.session(), &leaf).await.unwrap();
        assert_eq!(config.api_key.as_deref(), Some("Y"));
        assert_eq!(config.ham_action, Some(ActionKind::Publish));
        // complete at `b`, so `a` is never consulted
        assert_eq!(config.spam_action, None);
    }

    #[tokio::test]
    async fn properties_without_capability_are_not_configuration() {
        let (repo, leaf) = chain(
            ContentNode::folder("a", "root")
                .with_property(props::API_KEY, "X")
                .with_property(props::HAM_ACTION, "publish"),
            ContentNode::folder("b", "a"),
        );

        let config = ConfigResolver::resolve(&repo.session(), &leaf).await.unwrap();
        assert!(!config.is_complete());
        assert_eq!(config, SpamCheckConfig::default());
    }

    #[tokio::test]
    async fn unknown_ham_action_degrades_to_ignore() {
        let (repo, leaf) = chain(
            configured("a", "root").with_property(props::HAM_ACTION, "reject"),
            configured("b", "a").with_property(props::API_KEY, "Y"),
        );

        let config = ConfigResolver::resolve(&repo.session(), &leaf).await.unwrap();
        assert_eq!(config.ham_action, Some(ActionKind::Ignore));
    }

    #[tokio::test]
    async fn marker_is_read_from_closest_node() {
        let (repo, leaf) = chain(
            ContentNode::folder("a", "root")
                .with_capability(Capability::AutoPublish)
                .with_property(props::PUBLISH_ACTION, "ignore"),
            ContentNode::folder("b", "a")
                .with_capability(Capability::AutoPublish)
                .with_property(props::PUBLISH_ACTION, "bogus"),
        );
        let session = repo.session();

        assert_eq!(
            ConfigResolver::resolve_marker(&session, &leaf).await.unwrap(),
            Some(ActionKind::Ignore)
        );
        let root = repo.node(&NodeId::from("root")).unwrap();
        assert_eq!(ConfigResolver::resolve_marker(&session, &root).await.unwrap(), None);
    }
}
