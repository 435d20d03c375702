use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHATS_PER_PAGE: usize = 10;
pub const DEFAULT_JOIN_MSG_THRESHOLD_SECS: u64 = 15;
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Top-level config (switchyard.toml + SWITCHYARD_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchyardConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub slaves: SlavesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Master surface: the Telegram bot the operator talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Telegram user IDs allowed to drive the bot. The first entry also
    /// receives every message from an unlinked slave chat.
    #[serde(default)]
    pub admins: Vec<i64>,
}

/// Knobs consumed by the relay core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Candidates shown per page in the chat pickers.
    #[serde(default = "default_chats_per_page")]
    pub chats_per_page: usize,
    /// Window within which consecutive text from the same origin is merged
    /// into the previously delivered message.
    #[serde(default = "default_join_msg_threshold_secs")]
    pub join_msg_threshold_secs: u64,
    /// Deliver audio as-is instead of transcoding it to an OGG/Opus voice note.
    #[serde(default)]
    pub no_conversion: bool,
    /// Upper bound on concurrently running deliveries.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Where downloaded media payloads are written before forwarding.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chats_per_page: DEFAULT_CHATS_PER_PAGE,
            join_msg_threshold_secs: DEFAULT_JOIN_MSG_THRESHOLD_SECS,
            no_conversion: false,
            max_workers: DEFAULT_MAX_WORKERS,
            storage_dir: default_storage_dir(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

/// Compiled-in slave channels. Each one is opt-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlavesConfig {
    #[serde(default)]
    pub loopback: Option<LoopbackConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn bool_true() -> bool {
    true
}
fn default_chats_per_page() -> usize {
    DEFAULT_CHATS_PER_PAGE
}
fn default_join_msg_threshold_secs() -> u64 {
    DEFAULT_JOIN_MSG_THRESHOLD_SECS
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}
fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}
fn default_db_path() -> String {
    format!("{}/switchyard.db", home_dir())
}
fn default_storage_dir() -> String {
    format!("{}/storage", home_dir())
}

fn home_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.switchyard")
}

impl SwitchyardConfig {
    /// Load config from a TOML file with SWITCHYARD_* env var overrides.
    ///
    /// Path resolution: explicit argument, else `~/.switchyard/switchyard.toml`.
    /// Nested keys are addressed with a double underscore, e.g.
    /// `SWITCHYARD_RELAY__NO_CONVERSION=true`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SwitchyardConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SWITCHYARD_").split("__"))
            .extract()
            .map_err(|e| crate::error::SwitchyardError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    format!("{}/switchyard.toml", home_dir())
}
