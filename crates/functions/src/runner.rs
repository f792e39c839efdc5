//! Trigger runner: delivers the store's change feed to document triggers.
//!
//! - One task per (change, matching trigger); deliveries are independent and unordered
//! - At-least-once: a failed delivery is retried per the `RetryPolicy`
//! - Graceful shutdown via `RunnerHandle::shutdown()`

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use recordkeep_events::{DocumentChange, EventBus, Subscription};
use recordkeep_infra::RetryPolicy;

use crate::trigger::DocumentTrigger;

#[derive(Debug, Clone)]
struct NamedTrigger {
    name: String,
    trigger: DocumentTrigger,
}

/// Registered triggers plus the redelivery policy.
#[derive(Debug, Clone, Default)]
pub struct TriggerRunner {
    triggers: Vec<NamedTrigger>,
    policy: RetryPolicy,
}

impl TriggerRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            triggers: Vec::new(),
            policy,
        }
    }

    pub fn register(&mut self, name: impl Into<String>, trigger: DocumentTrigger) {
        self.triggers.push(NamedTrigger {
            name: name.into(),
            trigger,
        });
    }

    pub fn with_triggers<I, N>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = (N, DocumentTrigger)>,
        N: Into<String>,
    {
        for (name, trigger) in triggers {
            self.register(name, trigger);
        }
        self
    }

    pub fn trigger_names(&self) -> impl Iterator<Item = &str> {
        self.triggers.iter().map(|t| t.name.as_str())
    }

    /// Deliver one change to every matching trigger, in registration order,
    /// and wait for all deliveries. Returns how many deliveries gave up.
    pub async fn dispatch(&self, change: &DocumentChange) -> usize {
        let mut failed = 0;
        for named in self.triggers.iter().filter(|t| t.trigger.matches(change)) {
            if !deliver(&named.name, &named.trigger, change, &self.policy).await {
                failed += 1;
            }
        }
        failed
    }

    /// Subscribe to `bus` and deliver every change in the background.
    pub fn spawn<B>(self, bus: &B) -> RunnerHandle
    where
        B: EventBus<DocumentChange> + ?Sized,
    {
        let subscription = bus.subscribe();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(
            triggers = ?self.trigger_names().collect::<Vec<_>>(),
            "trigger runner started"
        );
        let join = tokio::spawn(run_loop(Arc::new(self), subscription, shutdown_rx));

        RunnerHandle {
            shutdown: Some(shutdown_tx),
            join,
        }
    }
}

/// Handle to stop and join a spawned runner. Dropping it also stops the loop.
#[derive(Debug)]
pub struct RunnerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl RunnerHandle {
    /// Stop accepting changes and wait for the loop to exit.
    ///
    /// Deliveries already in flight keep running on their own tasks.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = self.join.await {
            warn!(error = ?err, "trigger runner task ended abnormally");
        }
    }
}

async fn run_loop(
    runner: Arc<TriggerRunner>,
    mut subscription: Subscription<DocumentChange>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            next = subscription.recv() => {
                let Some(change) = next else { break };
                for named in runner.triggers.iter().filter(|t| t.trigger.matches(&change)) {
                    let named = named.clone();
                    let change = change.clone();
                    let policy = runner.policy.clone();
                    tokio::spawn(async move {
                        deliver(&named.name, &named.trigger, &change, &policy).await;
                    });
                }
            }
        }
    }
    info!("trigger runner stopped");
}

async fn deliver(name: &str, trigger: &DocumentTrigger, change: &DocumentChange, policy: &RetryPolicy) -> bool {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match trigger.fire(change).await {
            Ok(()) => return true,
            Err(err) if policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    trigger = name,
                    event_id = %change.event_id(),
                    document_id = %change.document_id(),
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = ?err,
                    "trigger failed; redelivering"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!(
                    trigger = name,
                    event_id = %change.event_id(),
                    document_id = %change.document_id(),
                    attempts = attempt,
                    error = ?err,
                    "trigger failed; giving up"
                );
                return false;
            }
        }
    }
}
