use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{channel::Channel, queue::MessageQueue};

/// Minimum delay before restarting a failed poll loop (seconds).
const BACKOFF_BASE_SECS: u64 = 5;
/// Maximum delay between restarts (seconds).
const BACKOFF_MAX_SECS: u64 = 300; // 5 minutes
/// Jitter fraction applied to each delay (+10 %).
const JITTER_FRACTION: f64 = 0.10;

/// The slave channels compiled into this process, keyed by channel id.
///
/// Iteration is sorted by id; that order is also what `/extra` numbers the
/// channels by, so it must stay stable for the lifetime of the process.
#[derive(Default, Clone)]
pub struct ChannelRegistry {
    slaves: BTreeMap<String, Arc<dyn Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slave adapter, replacing any previous one with the same id.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let id = channel.info().id.clone();
        info!(channel = %id, "registering slave channel");
        self.slaves.insert(id, channel);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Channel>> {
        self.slaves.get(id).cloned()
    }

    /// Channel at `index` in sorted order.
    pub fn nth(&self, index: usize) -> Option<Arc<dyn Channel>> {
        self.slaves.values().nth(index).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Channel>> {
        self.slaves.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.slaves.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slaves.is_empty()
    }

    /// Start one supervised poll task per slave.
    ///
    /// A poll loop that fails is restarted after an exponential backoff with
    /// jitter (5 s doubling up to 300 s). A loop that returns `Ok` is
    /// considered finished. Everything stops when `cancel` fires.
    pub fn spawn_pollers(&self, queue: MessageQueue, cancel: CancellationToken) -> JoinSet<()> {
        let mut set = JoinSet::new();
        for (id, channel) in &self.slaves {
            info!(channel = %id, "starting poller");
            set.spawn(supervise(
                id.clone(),
                channel.clone(),
                queue.clone(),
                cancel.clone(),
            ));
        }
        set
    }
}

/// Run `channel.poll` until it finishes cleanly or `cancel` fires.
async fn supervise(
    id: String,
    channel: Arc<dyn Channel>,
    queue: MessageQueue,
    cancel: CancellationToken,
) {
    let mut delay_secs = BACKOFF_BASE_SECS;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let started = Instant::now();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                info!(channel = %id, "poller cancelled");
                return;
            }
            r = channel.poll(queue.clone()) => r,
        };

        match outcome {
            Ok(()) => {
                info!(channel = %id, "poll loop finished");
                return;
            }
            Err(e) => {
                // A loop that stayed up for a while starts the schedule over.
                if started.elapsed() >= Duration::from_secs(BACKOFF_MAX_SECS) {
                    delay_secs = BACKOFF_BASE_SECS;
                }
                let total = delay_secs + jitter_secs(delay_secs);
                warn!(
                    channel = %id,
                    attempt,
                    error = %e,
                    retry_after_secs = total,
                    "poll loop failed, restarting with backoff"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(channel = %id, "poller cancelled during backoff");
                        return;
                    }
                    _ = sleep(Duration::from_secs(total)) => {}
                }
                delay_secs = (delay_secs * 2).min(BACKOFF_MAX_SECS);
            }
        }
    }
}

/// Return a jitter offset (0 … `JITTER_FRACTION * base_secs`) as integer seconds.
///
/// Derived from the sub-second part of the wall clock, which is enough to
/// keep several pollers from restarting in lockstep.
fn jitter_secs(base_secs: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let max_jitter = ((base_secs as f64) * JITTER_FRACTION) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}
