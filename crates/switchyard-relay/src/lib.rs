pub mod commands;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod interact;
pub mod picker;
pub mod pool;
pub mod render;
pub mod reverse;
pub mod speech;
pub mod transcode;

pub use commands::{handle_command, CommandOrigin, MasterCommand};
pub use context::RelayContext;
pub use dispatch::deliver;
pub use error::RelayError;
pub use interact::{complete_group_link, handle_interaction, start_picker};
pub use pool::run_pool;
pub use reverse::{forward_to_slave, MasterInbound};
pub use speech::{RecogTarget, SpeechRecognizer, VoiceNote};
pub use transcode::{AudioTranscoder, FfmpegTranscoder};
