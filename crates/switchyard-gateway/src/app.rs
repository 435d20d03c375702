use std::sync::Arc;

use switchyard_channels::{ChannelRegistry, LoopbackChannel};
use switchyard_core::config::SlavesConfig;
use tracing::info;

/// Compiled-in slave channels enabled by config.
pub fn build_slaves(config: &SlavesConfig) -> ChannelRegistry {
    let mut registry = ChannelRegistry::new();
    if config.loopback.as_ref().is_some_and(|l| l.enabled) {
        registry.register(Arc::new(LoopbackChannel::new()));
    }
    info!(slaves = ?registry.ids(), "slave channels ready");
    registry
}

/// Default `EnvFilter` directives for `-v` repetitions.
pub fn filter_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,switchyard_gateway=info",
        1 => "info",
        _ => "info,switchyard_gateway=debug,switchyard_relay=debug,switchyard_store=debug,switchyard_sessions=debug,switchyard_channels=debug,switchyard_telegram=debug",
    }
}
