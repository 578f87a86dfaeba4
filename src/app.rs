use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::time::timeout;

use crate::{
    classifier::{Endpoints, ReqwestTransport, SpamCheckClient, VerifiedKeySet},
    config::AppConfig,
    domain::{ClassificationResult, CommentPayload, LifecycleEvent},
    engine::{ActionDispatcher, EventOutcome, EventSubscriber, PayloadDefaults},
    infrastructure::shutdown::Shutdown,
    repository::{MemoryRepository, MemoryWorkflowManager, NodeId, TreeSnapshot},
    tasks::{EventSender, EventWorker},
};

/// Outcome of one replayed event, in input order.
#[derive(Debug)]
pub struct ReplayedEvent {
    pub event: LifecycleEvent,
    pub outcome: Option<EventOutcome>,
}

#[derive(Debug)]
pub struct ReplayReport {
    pub events: Vec<ReplayedEvent>,
    pub interrupted: bool,
    pub snapshot: TreeSnapshot,
}

impl ReplayReport {
    pub fn rejected(&self) -> usize {
        self.events
            .iter()
            .filter(|replayed| matches!(replayed.outcome, Some(EventOutcome::Rejected)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.events
            .iter()
            .filter(|replayed| matches!(replayed.outcome, Some(EventOutcome::Failed(_)) | None))
            .count()
    }
}

pub struct SpamGateApp {
    config: Arc<AppConfig>,
    client: SpamCheckClient,
    shutdown: Shutdown,
}

impl SpamGateApp {
    pub fn initialize(config: AppConfig, shutdown: Shutdown) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.classifier.timeout)
            .context("failed to build the classifier HTTP client")?;
        let endpoints = Endpoints::new(
            config.classifier.scheme.clone(),
            config.classifier.host.clone(),
            config.classifier.api_version.clone(),
        );
        let client =
            SpamCheckClient::new(Arc::new(transport), endpoints, Arc::new(VerifiedKeySet::new()));
        Ok(Self::with_client(config, client, shutdown))
    }

    pub fn with_client(config: AppConfig, client: SpamCheckClient, shutdown: Shutdown) -> Self {
        Self {
            config: Arc::new(config),
            client,
            shutdown,
        }
    }

    fn payload_defaults(&self) -> PayloadDefaults {
        PayloadDefaults {
            homepage: self.config.site.homepage.clone(),
            language: self.config.site.language.clone(),
            charset: self.config.site.charset.clone(),
        }
    }

    pub async fn verify_key(&self, api_key: &str) -> Result<bool> {
        self.client
            .verify_key(api_key, &self.config.site.homepage)
            .await
            .context("key verification failed")
    }

    pub async fn check(&self, api_key: &str, payload: &CommentPayload) -> ClassificationResult {
        let payload = self.with_site_defaults(payload);
        self.client.check_comment(api_key, &payload).await
    }

    pub async fn report_spam(&self, api_key: &str, payload: &CommentPayload) {
        let payload = self.with_site_defaults(payload);
        self.client.report_spam(api_key, &payload).await;
    }

    pub async fn report_ham(&self, api_key: &str, payload: &CommentPayload) {
        let payload = self.with_site_defaults(payload);
        self.client.report_ham(api_key, &payload).await;
    }

    fn with_site_defaults(&self, payload: &CommentPayload) -> CommentPayload {
        let defaults = self.payload_defaults();
        let mut payload = payload.clone();
        payload.homepage.get_or_insert(defaults.homepage);
        if payload.language.is_none() {
            payload.language = defaults.language;
        }
        if payload.charset.is_none() {
            payload.charset = defaults.charset;
        }
        payload
    }

    /// Feeds recorded lifecycle events through the event worker against an
    /// in-memory copy of `tree`. Events of one node run in input order;
    /// different nodes run concurrently.
    pub async fn replay(&self, tree: &Path, events: &Path) -> Result<ReplayReport> {
        let snapshot = read_snapshot(tree).await?;
        let events = read_events(events).await?;
        let repository = MemoryRepository::from_snapshot(snapshot)
            .with_context(|| format!("invalid tree snapshot {}", tree.display()))?;
        tracing::info!(target: "app", events = events.len(), "replaying lifecycle events");

        let workflows = MemoryWorkflowManager::new(repository.clone());
        let subscriber = Arc::new(EventSubscriber::new(
            Arc::new(repository.clone()),
            self.client.clone(),
            ActionDispatcher::new(Arc::new(workflows)),
            self.payload_defaults(),
        ));
        let worker_config = &self.config.worker;
        let stop = Shutdown::new();
        let (sender, receiver) =
            EventWorker::channel(worker_config.max_concurrent_events.saturating_mul(4));
        let worker = EventWorker::new(
            subscriber,
            worker_config.max_concurrent_events,
            worker_config.shutdown_timeout,
        )
        .spawn(receiver, stop.subscribe());

        let grace = worker_config.shutdown_timeout.saturating_mul(2);
        let outcomes = Mutex::new(HashMap::new());
        let mut listener = self.shutdown.subscribe();
        let interrupted = {
            let run = submit_by_node(&sender, &events, &outcomes);
            tokio::pin!(run);
            let interrupted = tokio::select! {
                _ = &mut run => false,
                _ = listener.notified() => true,
            };
            if interrupted {
                stop.trigger("replay interrupted");
                // Events still draining in the worker report back here.
                if timeout(grace, &mut run).await.is_err() {
                    tracing::warn!(
                        target: "app",
                        "pending replay results dropped after {:?}",
                        grace
                    );
                }
            }
            interrupted
        };
        drop(sender);

        if !interrupted {
            stop.trigger("replay finished");
        }
        match timeout(grace, worker).await {
            Ok(Err(err)) if err.is_panic() => {
                tracing::error!(target: "app", "event worker panicked");
            }
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(target: "app", "event worker did not stop within {:?}", grace);
            }
        }

        let mut outcomes = outcomes.into_inner();
        let events = events
            .into_iter()
            .enumerate()
            .map(|(index, event)| ReplayedEvent {
                outcome: outcomes.remove(&index),
                event,
            })
            .collect();
        Ok(ReplayReport {
            events,
            interrupted,
            snapshot: repository.snapshot(),
        })
    }
}

/// Outcomes land in `outcomes` as they arrive so an interrupted run keeps
/// everything that finished.
async fn submit_by_node(
    sender: &EventSender,
    events: &[LifecycleEvent],
    outcomes: &Mutex<HashMap<usize, EventOutcome>>,
) {
    let mut chains: Vec<(NodeId, Vec<usize>)> = Vec::new();
    for (index, event) in events.iter().enumerate() {
        match chains.iter_mut().find(|(node, _)| *node == event.node) {
            Some((_, indices)) => indices.push(index),
            None => chains.push((event.node.clone(), vec![index])),
        }
    }

    let runs = chains.into_iter().map(|(_, indices)| async move {
        for index in indices {
            let Some(outcome) = sender.submit(events[index].clone()).await else {
                break;
            };
            outcomes.lock().insert(index, outcome);
        }
    });
    futures::future::join_all(runs).await;
}

pub async fn read_snapshot(path: &Path) -> Result<TreeSnapshot> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub async fn write_snapshot(path: &Path, snapshot: &TreeSnapshot) -> Result<()> {
    let body = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

/// One JSON event per line; blank lines and `#` comments are skipped.
pub async fn read_events(path: &Path) -> Result<Vec<LifecycleEvent>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(number, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("{}:{}: not a lifecycle event", path.display(), number + 1)
            })
        })
        .collect()
}

pub async fn read_comment(path: &Path) -> Result<CommentPayload> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Short human-readable form used by the command line output.
pub fn describe(outcome: Option<&EventOutcome>) -> String {
    match outcome {
        None => "not processed".to_string(),
        Some(EventOutcome::NotHandled) => "not handled".to_string(),
        Some(EventOutcome::MarkedIgnore) => "marked ignore".to_string(),
        Some(EventOutcome::Skipped(reason)) => format!("skipped ({reason:?})"),
        Some(EventOutcome::Applied(report)) => {
            format!("applied {} (workflow {:?})", report.action, report.workflow)
        }
        Some(EventOutcome::Rejected) => "rejected: comment not accepted".to_string(),
        Some(EventOutcome::Failed(reason)) => format!("failed: {reason}"),
    }
}
