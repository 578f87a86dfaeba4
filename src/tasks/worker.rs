use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Semaphore, mpsc, oneshot},
    task::{JoinHandle, JoinSet},
    time::timeout,
};

use crate::{
    domain::LifecycleEvent,
    engine::{EventOutcome, EventSubscriber},
    infrastructure::shutdown::ShutdownListener,
};

pub struct EventEnvelope {
    event: LifecycleEvent,
    reply: Option<oneshot::Sender<EventOutcome>>,
}

/// Producer side of the worker queue.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventSender {
    /// Queues an event without waiting for its outcome. Returns `false` once
    /// the worker has stopped.
    pub async fn notify(&self, event: LifecycleEvent) -> bool {
        self.tx
            .send(EventEnvelope { event, reply: None })
            .await
            .is_ok()
    }

    /// Queues an event and waits for the outcome, `None` if the worker went
    /// away before handling it.
    pub async fn submit(&self, event: LifecycleEvent) -> Option<EventOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(EventEnvelope {
                event,
                reply: Some(reply),
            })
            .await
            .ok()?;
        outcome.await.ok()
    }
}

/// Runs every lifecycle event as its own task, bounded by a concurrency
/// limit.
pub struct EventWorker {
    subscriber: Arc<EventSubscriber>,
    limit: Arc<Semaphore>,
    drain_timeout: Duration,
}

impl EventWorker {
    pub fn new(
        subscriber: Arc<EventSubscriber>,
        max_concurrent: usize,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            subscriber,
            limit: Arc::new(Semaphore::new(max_concurrent.clamp(1, Semaphore::MAX_PERMITS))),
            drain_timeout,
        }
    }

    pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity.clamp(1, Semaphore::MAX_PERMITS));
        (EventSender { tx }, rx)
    }

    pub fn spawn(
        self,
        receiver: mpsc::Receiver<EventEnvelope>,
        shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run_loop(receiver, shutdown))
    }

    async fn run_loop(
        self,
        mut receiver: mpsc::Receiver<EventEnvelope>,
        mut shutdown: ShutdownListener,
    ) {
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join(joined);
                }
                next = receiver.recv() => {
                    let Some(envelope) = next else {
                        break;
                    };
                    let permit = tokio::select! {
                        permit = self.limit.clone().acquire_owned() => permit,
                        _ = shutdown.notified() => break,
                    };
                    let Ok(permit) = permit else {
                        break;
                    };
                    let subscriber = self.subscriber.clone();
                    tasks.spawn(async move {
                        let EventEnvelope { event, reply } = envelope;
                        let outcome = subscriber.on_event(&event).await;
                        drop(permit);
                        tracing::debug!(
                            target: "worker",
                            node = %event.node,
                            outcome = ?outcome,
                            "event finished"
                        );
                        if let Some(reply) = reply {
                            let _ = reply.send(outcome);
                        }
                    });
                }
            }
        }

        receiver.close();
        if !tasks.is_empty() {
            tracing::info!(target: "worker", in_flight = tasks.len(), "draining in-flight events");
        }
        let drained = timeout(self.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                log_join(joined);
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                target: "worker",
                remaining = tasks.len(),
                "in-flight events did not finish within {:?}; aborting",
                self.drain_timeout
            );
            tasks.abort_all();
        }
        tracing::info!(target: "worker", "event worker stopped");
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        if err.is_panic() {
            tracing::error!(target: "worker", "event task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifier::{Endpoint, Endpoints, SpamCheckClient, TransportResponse, VerifiedKeySet},
        domain::{ActionKind, EventKind},
        engine::{ActionDispatcher, PayloadDefaults},
        infrastructure::shutdown::Shutdown,
        repository::{
            Capability, ContentNode, MemoryRepository, MemoryWorkflowManager, NodeId, props,
        },
        testing::MockTransport,
    };

    fn subscriber(repo: &MemoryRepository) -> Arc<EventSubscriber> {
        let transport = Arc::new(
            MockTransport::new()
                .reply(Endpoint::VerifyKey, TransportResponse::ok("valid"))
                .reply(Endpoint::CommentCheck, TransportResponse::ok("false")),
        );
        let client =
            SpamCheckClient::new(transport, Endpoints::default(), Arc::new(VerifiedKeySet::new()));
        let workflows = MemoryWorkflowManager::new(repo.clone());
        Arc::new(EventSubscriber::new(
            Arc::new(repo.clone()),
            client,
            ActionDispatcher::new(Arc::new(workflows)),
            PayloadDefaults {
                homepage: "https://site.example".into(),
                ..PayloadDefaults::default()
            },
        ))
    }

    fn repository() -> MemoryRepository {
        let repo = MemoryRepository::new(
            ContentNode::root("root")
                .with_capability(Capability::SpamCheck)
                .with_property(props::API_KEY, "abc123")
                .with_property(props::HAM_ACTION, "publish"),
        );
        for post in ["a", "b", "c"] {
            repo.insert(ContentNode::handle(post, "root")).unwrap();
            repo.insert(
                ContentNode::document(format!("{post}-draft"), post)
                    .with_property(props::STATE, props::STATE_UNPUBLISHED),
            )
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn submitted_events_report_their_outcome() {
        let repo = repository();
        let shutdown = Shutdown::new();
        let (sender, receiver) = EventWorker::channel(8);
        let handle = EventWorker::new(subscriber(&repo), 2, Duration::from_secs(1))
            .spawn(receiver, shutdown.subscribe());

        let outcomes = futures::future::join_all(
            ["a", "b", "c"]
                .map(|post| sender.submit(LifecycleEvent::new(EventKind::Created, post))),
        )
        .await;

        for outcome in outcomes {
            assert!(matches!(outcome, Some(EventOutcome::Applied(_))));
        }
        for post in ["a", "b", "c"] {
            assert_eq!(
                repo.node(&NodeId::from(post)).unwrap().property(props::PUBLISH_ACTION),
                Some(ActionKind::Publish.as_str())
            );
        }

        shutdown.trigger("test");
        handle.await.unwrap();
        assert!(!sender.notify(LifecycleEvent::new(EventKind::Created, "a")).await);
    }

    #[tokio::test]
    async fn worker_stops_when_all_senders_are_gone() {
        let repo = repository();
        let shutdown = Shutdown::new();
        let (sender, receiver) = EventWorker::channel(1);
        let handle = EventWorker::new(subscriber(&repo), 1, Duration::from_secs(1))
            .spawn(receiver, shutdown.subscribe());

        assert!(sender.notify(LifecycleEvent::new(EventKind::Unpublished, "a")).await);
        drop(sender);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            repo.node(&NodeId::from("a")).unwrap().property(props::PUBLISH_ACTION),
            Some(ActionKind::Ignore.as_str())
        );
    }

    #[tokio::test]
    async fn oversized_limits_do_not_panic() {
        let repo = repository();
        let shutdown = Shutdown::new();
        let (sender, receiver) = EventWorker::channel(usize::MAX);
        let handle = EventWorker::new(subscriber(&repo), usize::MAX, Duration::from_secs(1))
            .spawn(receiver, shutdown.subscribe());

        let outcome = sender.submit(LifecycleEvent::new(EventKind::Created, "b")).await;
        assert!(matches!(outcome, Some(EventOutcome::Applied(_))));

        shutdown.trigger("test");
        handle.await.unwrap();
    }
}
