use std::sync::Arc;

use switchyard_channels::{ChannelRegistry, MasterSurface};
use switchyard_core::clock::{Clock, SystemClock};
use switchyard_core::config::RelayConfig;
use switchyard_core::{ChatKey, MessageRef};
use switchyard_sessions::{KeyedLocks, SessionStore};
use switchyard_store::AssociationStore;

use crate::error::{RelayError, Result};
use crate::speech::SpeechRecognizer;
use crate::transcode::{AudioTranscoder, FfmpegTranscoder};

/// Everything the relay needs, shared by the pool, the master adapter and
/// the command handlers.
pub struct RelayContext {
    pub config: RelayConfig,
    /// Master chat uid that receives messages from unlinked slave chats.
    pub default_chat: Option<String>,
    pub store: Arc<AssociationStore>,
    pub sessions: SessionStore,
    pub master: Arc<dyn MasterSurface>,
    pub slaves: ChannelRegistry,
    pub clock: Arc<dyn Clock>,
    pub transcoder: Arc<dyn AudioTranscoder>,
    pub recognizers: Vec<Arc<dyn SpeechRecognizer>>,
    /// Serialises transitions on one prompt.
    pub prompt_locks: KeyedLocks<MessageRef>,
    /// Serialises read-decide-send-write on one master chat.
    pub dest_locks: KeyedLocks<ChatKey>,
}

impl RelayContext {
    pub fn new(
        config: RelayConfig,
        default_chat: Option<String>,
        store: Arc<AssociationStore>,
        master: Arc<dyn MasterSurface>,
        slaves: ChannelRegistry,
    ) -> Self {
        let transcoder = Arc::new(FfmpegTranscoder::new(config.ffmpeg_path.clone()));
        Self {
            config,
            default_chat,
            store,
            sessions: SessionStore::new(),
            master,
            slaves,
            clock: Arc::new(SystemClock),
            transcoder,
            recognizers: Vec::new(),
            prompt_locks: KeyedLocks::new(),
            dest_locks: KeyedLocks::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn AudioTranscoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizers.push(recognizer);
        self
    }

    pub fn master_id(&self) -> &str {
        &self.master.info().id
    }

    /// Chat key of a master-side chat.
    pub fn master_key(&self, chat: &str) -> ChatKey {
        ChatKey::new(self.master_id(), chat)
    }

    pub fn default_destination(&self) -> Result<ChatKey> {
        self.default_chat
            .as_deref()
            .map(|c| self.master_key(c))
            .ok_or(RelayError::NoDefaultChat)
    }
}
