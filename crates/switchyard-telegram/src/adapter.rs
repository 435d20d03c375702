//! Telegram master adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event loop
//! until shutdown is requested.

use std::sync::Arc;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::handler::{handle_callback, handle_message, HandlerState};
use crate::send::TelegramMaster;

pub struct TelegramAdapter {
    master: Arc<TelegramMaster>,
    state: Arc<HandlerState>,
}

impl TelegramAdapter {
    pub fn new(master: Arc<TelegramMaster>, state: HandlerState) -> Self {
        Self {
            master,
            state: Arc::new(state),
        }
    }

    /// Drive the long-polling loop until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let bot = self.master.bot().clone();
        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handle_message))
            .branch(Update::filter_callback_query().endpoint(handle_callback));

        let mut dispatcher = Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![self.state])
            .default_handler(|_upd| async {})
            .build();

        let shutdown = dispatcher.shutdown_token();
        tokio::spawn(async move {
            cancel.cancelled().await;
            match shutdown.shutdown() {
                Ok(done) => done.await,
                Err(e) => warn!(error = %e, "Telegram dispatcher was not running"),
            }
        });

        info!(bot = %self.master.username(), "Telegram: starting long-polling dispatcher");
        dispatcher.dispatch().await;
        info!("Telegram: dispatcher stopped");
    }
}
