#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use switchyard_channels::{
    Button, Channel, ChannelError, ChannelRegistry, ChatEntry, Delivery, ExtraFunction, Keyboard,
    MasterSurface, MediaFile, MessageBody, MessageQueue, NormalizedMessage, OutboundMedia, Venue,
};
use switchyard_core::clock::ManualClock;
use switchyard_core::config::RelayConfig;
use switchyard_core::{ChannelInfo, ChannelKind, ChatType, Identity, MessageRef};
use switchyard_relay::{AudioTranscoder, RelayContext, RelayError};
use switchyard_store::AssociationStore;

pub const ADMIN: &str = "admin";

/// Everything the master was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Sent {
        msg: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edited {
        msg: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Media {
        msg: MessageRef,
        media: OutboundMedia,
    },
    Venue {
        msg: MessageRef,
        venue: Venue,
    },
    Reply {
        to: MessageRef,
        text: String,
    },
}

pub struct FakeMaster {
    info: ChannelInfo,
    next_id: AtomicU64,
    events: Mutex<Vec<Event>>,
}

impl FakeMaster {
    pub fn new() -> Self {
        Self {
            info: ChannelInfo {
                id: "telegram".into(),
                name: "Telegram".into(),
                emoji: "✈".into(),
                kind: ChannelKind::Master,
            },
            next_id: AtomicU64::new(1),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn last(&self) -> Event {
        self.events().last().cloned().expect("no master events")
    }

    /// Text of the latest edit of `msg`.
    pub fn last_edit(&self, msg: &MessageRef) -> (String, Option<Keyboard>) {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                Event::Edited {
                    msg: m,
                    text,
                    keyboard,
                } if &m == msg => Some((text, keyboard)),
                _ => None,
            })
            .expect("message was never edited")
    }

    pub fn replies(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Reply { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn next_ref(&self, chat: &str) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        MessageRef::new(chat, id.to_string())
    }
}

#[async_trait]
impl MasterSurface for FakeMaster {
    fn info(&self) -> &ChannelInfo {
        &self.info
    }

    async fn send_text(
        &self,
        chat: &str,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, ChannelError> {
        let msg = self.next_ref(chat);
        self.record(Event::Sent {
            msg: msg.clone(),
            text: text.to_string(),
            keyboard,
        });
        Ok(msg)
    }

    async fn edit_text(
        &self,
        msg: &MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ChannelError> {
        self.record(Event::Edited {
            msg: msg.clone(),
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn send_media(
        &self,
        chat: &str,
        media: OutboundMedia,
    ) -> Result<MessageRef, ChannelError> {
        let msg = self.next_ref(chat);
        self.record(Event::Media {
            msg: msg.clone(),
            media,
        });
        Ok(msg)
    }

    async fn send_venue(&self, chat: &str, venue: Venue) -> Result<MessageRef, ChannelError> {
        let msg = self.next_ref(chat);
        self.record(Event::Venue {
            msg: msg.clone(),
            venue,
        });
        Ok(msg)
    }

    async fn reply_text(&self, to: &MessageRef, text: &str) -> Result<MessageRef, ChannelError> {
        let msg = self.next_ref(&to.chat);
        self.record(Event::Reply {
            to: to.clone(),
            text: text.to_string(),
        });
        Ok(msg)
    }

    async fn download(&self, file_id: &str, _stem: &str) -> Result<MediaFile, ChannelError> {
        Err(ChannelError::SendFailed(format!("no file {file_id}")))
    }

    fn group_invite_link(&self, token: &str) -> String {
        format!("https://t.me/fakebot?startgroup={token}")
    }
}

/// Slave with a fixed chat list that records what it is sent. Only text is
/// accepted.
pub struct FakeSlave {
    info: ChannelInfo,
    chats: Vec<ChatEntry>,
    pub list_calls: AtomicUsize,
    pub received: Mutex<Vec<NormalizedMessage>>,
}

impl FakeSlave {
    pub fn new(chats: Vec<ChatEntry>) -> Self {
        Self {
            info: ChannelInfo {
                id: "fake".into(),
                name: "Fake".into(),
                emoji: "★".into(),
                kind: ChannelKind::Slave,
            },
            chats,
            list_calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// `n` user chats `c0..c{n-1}` named `Chat {i}`.
    pub fn with_users(n: usize) -> Self {
        Self::new(
            (0..n)
                .map(|i| ChatEntry {
                    uid: format!("c{i}"),
                    name: format!("Chat {i}"),
                    alias: format!("Chat {i}"),
                    chat_type: ChatType::User,
                })
                .collect(),
        )
    }

    pub fn bob() -> Self {
        Self::new(vec![ChatEntry {
            uid: "bob".into(),
            name: "Bob".into(),
            alias: "Bob".into(),
            chat_type: ChatType::User,
        }])
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<NormalizedMessage> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for FakeSlave {
    fn info(&self) -> &ChannelInfo {
        &self.info
    }

    async fn list_chats(&self) -> Result<Vec<ChatEntry>, ChannelError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.chats.clone())
    }

    async fn send_message(&self, msg: NormalizedMessage) -> Result<Delivery, ChannelError> {
        let dest = msg.destination.clone().expect("destination set by relay");
        if !self.chats.iter().any(|c| c.uid == dest.uid) {
            return Err(ChannelError::ChatNotFound(dest.to_string()));
        }
        if !matches!(msg.body, MessageBody::Text) {
            return Err(ChannelError::UnsupportedType(msg.body.kind().to_string()));
        }
        let mut received = self.received.lock().unwrap();
        received.push(msg);
        Ok(Delivery {
            message_id: received.len().to_string(),
        })
    }

    fn extra_functions(&self) -> Vec<ExtraFunction> {
        vec![ExtraFunction {
            name: "ping".into(),
            display_name: "Ping".into(),
            description: "Usage: {function_name}".into(),
        }]
    }

    async fn call_extra(&self, name: &str, args: &str) -> Result<String, ChannelError> {
        match name {
            "ping" => Ok(format!("pong {args}").trim_end().to_string()),
            other => Err(ChannelError::FunctionNotFound(other.into())),
        }
    }

    async fn poll(&self, _queue: MessageQueue) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Writes a stand-in `.ogg` next to the input, or fails when `broken`.
pub struct FakeTranscoder {
    pub broken: bool,
}

impl FakeTranscoder {
    pub fn working() -> Self {
        Self { broken: false }
    }

    pub fn broken() -> Self {
        Self { broken: true }
    }
}

#[async_trait]
impl AudioTranscoder for FakeTranscoder {
    async fn to_voice(&self, input: &Path) -> Result<PathBuf, RelayError> {
        if self.broken {
            return Err(RelayError::Transcode("ffmpeg exited with status 1".into()));
        }
        let mut out = input.as_os_str().to_owned();
        out.push(".ogg");
        let out = PathBuf::from(out);
        std::fs::write(&out, b"OggS")?;
        Ok(out)
    }
}

pub struct Harness {
    pub ctx: Arc<RelayContext>,
    pub master: Arc<FakeMaster>,
    pub slave: Arc<FakeSlave>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(slave: FakeSlave) -> Harness {
    harness_with(slave, RelayConfig::default())
}

pub fn harness_with(slave: FakeSlave, config: RelayConfig) -> Harness {
    build(slave, config, None)
}

pub fn harness_transcoding(slave: FakeSlave, transcoder: FakeTranscoder) -> Harness {
    build(slave, RelayConfig::default(), Some(Arc::new(transcoder)))
}

fn build(
    slave: FakeSlave,
    config: RelayConfig,
    transcoder: Option<Arc<dyn AudioTranscoder>>,
) -> Harness {
    let master = Arc::new(FakeMaster::new());
    let slave = Arc::new(slave);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let mut registry = ChannelRegistry::new();
    registry.register(slave.clone());
    let store = Arc::new(AssociationStore::open_in_memory().unwrap());

    let mut ctx = RelayContext::new(config, Some(ADMIN.into()), store, master.clone(), registry)
        .with_clock(clock.clone());
    if let Some(transcoder) = transcoder {
        ctx = ctx.with_transcoder(transcoder);
    }
    Harness {
        ctx: Arc::new(ctx),
        master,
        slave,
        clock,
    }
}

/// Text from the fake slave's user `bob`.
pub fn from_bob(text: &str) -> NormalizedMessage {
    from_user("bob", "Bob", text)
}

/// Text from any private chat on the fake slave.
pub fn from_user(uid: &str, name: &str, text: &str) -> NormalizedMessage {
    NormalizedMessage::text("fake", "★", ChatType::User, Identity::new(uid, name, name), text)
}

/// Callback data of every button in `keyboard`, row by row.
pub fn callback_data(keyboard: &Keyboard) -> Vec<String> {
    keyboard
        .buttons()
        .filter_map(|b| match b {
            Button::Callback { data, .. } => Some(data.clone()),
            Button::Url { .. } => None,
        })
        .collect()
}

/// Token carried by the first url button of `keyboard`.
pub fn link_token(keyboard: &Keyboard) -> String {
    keyboard
        .buttons()
        .find_map(|b| match b {
            Button::Url { url, .. } => url.rsplit('=').next().map(String::from),
            Button::Callback { .. } => None,
        })
        .expect("keyboard has a link button")
}
