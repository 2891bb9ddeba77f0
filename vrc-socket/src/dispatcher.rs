//! Bounded fan-out of events to subscriber callbacks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use vrc_core::config::StreamConfig;

use crate::error::StreamError;
use crate::events::RawEvent;
use crate::registry::{HandlerRegistry, Subscription};
use crate::state::StreamObserver;

struct Job {
    subscription: Subscription,
    event: Arc<RawEvent>,
}

/// Queues one job per matching subscriber and runs them on a fixed worker pool.
///
/// The queue is bounded. When it stays full for longer than the dispatch
/// timeout the job is dropped and reported as [`StreamError::DispatchOverflow`].
/// Queueing stops as soon as `shutdown` fires, so a full queue never holds up
/// a close. Workers exit once the dispatcher is dropped and the queue is drained.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    tx: mpsc::Sender<Job>,
    timeout: Duration,
    observer: Arc<dyn StreamObserver>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn new(
        registry: Arc<HandlerRegistry>,
        config: &StreamConfig,
        observer: Arc<dyn StreamObserver>,
        shutdown: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.dispatch_queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for n in 0..config.dispatch_workers.max(1) {
            tokio::spawn(worker(n, rx.clone(), observer.clone()));
        }

        Self {
            registry,
            tx,
            timeout: config.dispatch_timeout(),
            observer,
            shutdown,
        }
    }

    /// Queue `raw` for every exact-tag and wildcard subscriber.
    ///
    /// Jobs are queued in subscriber order and return once queued, not once
    /// run. Returns the number of jobs queued; deliveries still waiting for
    /// queue space when shutdown fires are dropped.
    pub async fn dispatch(&self, raw: RawEvent) -> usize {
        let subscriptions = self.registry.matching(&raw.event_type);
        if subscriptions.is_empty() {
            debug!("no subscribers for {}", raw.event_type);
            return 0;
        }

        let event = Arc::new(raw);
        let mut queued = 0;
        for subscription in subscriptions {
            let job = Job {
                subscription,
                event: event.clone(),
            };
            let sent = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!("shutting down, dropping pending {} deliveries", event.event_type);
                    break;
                }
                sent = self.tx.send_timeout(job, self.timeout) => sent,
            };
            match sent {
                Ok(()) => queued += 1,
                Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                    warn!("dispatch queue full, dropping {} delivery", event.event_type);
                    self.observer.on_error(&StreamError::DispatchOverflow {
                        event_type: event.event_type.clone(),
                    });
                }
                Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                    // Only possible once every worker has died.
                    error!("dispatch workers are gone, dropping {}", event.event_type);
                    break;
                }
            }
        }
        queued
    }
}

async fn worker(n: usize, rx: Arc<Mutex<mpsc::Receiver<Job>>>, observer: Arc<dyn StreamObserver>) {
    loop {
        let job = { rx.lock().await.recv().await };
        let Some(Job { subscription, event }) = job else {
            debug!("dispatch worker {n} exiting");
            return;
        };

        let event_type = event.event_type.clone();
        let run = tokio::task::spawn_blocking(move || subscription.invoke(&event));
        if let Err(e) = run.await {
            if e.is_panic() {
                error!("handler for {event_type} panicked");
                observer.on_error(&StreamError::HandlerPanicked { event_type });
            }
        }
    }
}
