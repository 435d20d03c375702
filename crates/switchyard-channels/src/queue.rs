use tokio::sync::mpsc;

use crate::error::{ChannelError, Result};
use crate::types::NormalizedMessage;

/// Producer half of the slave → relay queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    tx: mpsc::UnboundedSender<NormalizedMessage>,
}

/// Consumer half; owned by the relay pool.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<NormalizedMessage>,
}

/// Unbounded FIFO shared by every slave poller.
pub fn message_queue() -> (MessageQueue, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MessageQueue { tx }, QueueReceiver { rx })
}

impl MessageQueue {
    /// Never blocks. Fails only once the receiver has been dropped.
    pub fn publish(&self, msg: NormalizedMessage) -> Result<()> {
        self.tx.send(msg).map_err(|_| ChannelError::QueueClosed)
    }
}

impl QueueReceiver {
    /// Next message, or `None` once every producer is gone (or after
    /// [`close`](Self::close)) and the backlog is drained.
    pub async fn next(&mut self) -> Option<NormalizedMessage> {
        self.rx.recv().await
    }

    /// Stop accepting new messages; already queued ones are still returned.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
