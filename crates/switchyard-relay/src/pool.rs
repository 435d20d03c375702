//! Queue consumer: one FIFO lane per origin chat, bounded overall.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use switchyard_channels::{NormalizedMessage, QueueReceiver};
use switchyard_core::ChatKey;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::context::RelayContext;
use crate::dispatch::deliver;

/// Sending half of one origin's lane.
struct Lane {
    tx: mpsc::UnboundedSender<NormalizedMessage>,
    /// Messages handed to the lane and not yet delivered.
    pending: Arc<AtomicUsize>,
}

impl Lane {
    fn is_idle(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }
}

/// Open lanes by origin. Only the pool sends into them, so a lane seen idle
/// here has nothing buffered and can be closed without reordering anything.
#[derive(Default)]
struct Lanes {
    open: HashMap<ChatKey, Lane>,
}

impl Lanes {
    /// Close every idle lane; its task ends once it sees the channel close.
    fn close_idle(&mut self) -> usize {
        let before = self.open.len();
        self.open.retain(|_, lane| !lane.is_idle());
        before - self.open.len()
    }

    fn len(&self) -> usize {
        self.open.len()
    }
}

/// Consume `rx` until it closes, then wait for every lane to drain.
///
/// Messages from one origin are delivered strictly in arrival order; at most
/// `max_workers` deliveries run at the same time across all origins. A failed
/// delivery is logged and never stops its lane. Idle lanes are closed whenever
/// a new one opens, so lanes only exist for origins with work in flight.
pub async fn run_pool(ctx: Arc<RelayContext>, mut rx: QueueReceiver) {
    let permits = Arc::new(Semaphore::new(ctx.config.max_workers.max(1)));
    let mut lanes = Lanes::default();
    let mut tasks = JoinSet::new();

    info!(max_workers = ctx.config.max_workers, "relay pool started");
    while let Some(msg) = rx.next().await {
        let origin = msg.origin_key();
        let msg = match lanes.open.get(&origin) {
            Some(lane) => {
                lane.pending.fetch_add(1, Ordering::SeqCst);
                match lane.tx.send(msg) {
                    Ok(()) => continue,
                    Err(mpsc::error::SendError(returned)) => {
                        // Lane task died (panicked); start a fresh one.
                        error!(origin = %origin, "lane closed unexpectedly, reopening");
                        lanes.open.remove(&origin);
                        returned
                    }
                }
            }
            None => msg,
        };

        let closed = lanes.close_idle();
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "lane task failed");
            }
        }
        debug!(origin = %origin, closed, open = lanes.len(), "opening lane");

        let (tx, lane_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        tasks.spawn(run_lane(
            ctx.clone(),
            permits.clone(),
            origin.clone(),
            lane_rx,
            pending.clone(),
        ));
        pending.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(msg);
        lanes.open.insert(origin, Lane { tx, pending });
    }

    info!(lanes = lanes.len(), "queue closed, draining lanes");
    drop(lanes);
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "lane task failed");
        }
    }
    info!("relay pool stopped");
}

async fn run_lane(
    ctx: Arc<RelayContext>,
    permits: Arc<Semaphore>,
    origin: ChatKey,
    mut rx: mpsc::UnboundedReceiver<NormalizedMessage>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(msg) = rx.recv().await {
        let Ok(_permit) = permits.acquire().await else {
            return;
        };
        let kind = msg.body.kind();
        if let Err(e) = deliver(&ctx, msg).await {
            error!(origin = %origin, kind = %kind, code = e.code(), error = %e, "delivery failed");
        }
        pending.fetch_sub(1, Ordering::SeqCst);
    }
    debug!(origin = %origin, "lane closed");
}
