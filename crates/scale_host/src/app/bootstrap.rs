use std::sync::Arc;

use scale_engine::{
    resolve_data_paths, ConfigError, JsonPreferenceFile, ObserverId, PreferenceError,
    PreferenceStore, ScaleConfig, ScaleEngine, SpeciesTable, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::attributes::AttributeBook;
use super::loop_runner::LoopConfig;

const OBSERVER_ENV_VAR: &str = "MOBSCALE_OBSERVER";
const TICKS_ENV_VAR: &str = "MOBSCALE_TICKS";

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Preferences(#[from] PreferenceError),
    #[error("failed to start visual sync worker: {0}")]
    VisualSync(#[source] std::io::Error),
}

pub(crate) struct AppWiring {
    pub(crate) engine: ScaleEngine,
    pub(crate) attributes: AttributeBook,
    pub(crate) config: LoopConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, HostError> {
    init_tracing();
    info!("=== Mob Scale Host Startup ===");

    let paths = resolve_data_paths()?;
    info!(root = %paths.root.display(), data = %paths.data_dir.display(), "data_paths_resolved");
    let scale_config = ScaleConfig::load_or_create(&paths.config_file)?;
    let preferences =
        PreferenceStore::open(Box::new(JsonPreferenceFile::new(&paths.preferences_file)))?;

    let defaults = LoopConfig::default();
    let config = LoopConfig {
        max_ticks: parse_u64_from_env(TICKS_ENV_VAR).unwrap_or(defaults.max_ticks),
        check_interval_ticks: u64::from(scale_config.performance.check_interval_ticks),
        max_spawns_per_tick: scale_config.performance.max_processing_per_tick as usize,
        observer: parse_u64_from_env(OBSERVER_ENV_VAR).map(ObserverId),
        config_file: Some(paths.config_file.clone()),
        ..defaults
    };
    Ok(wire(scale_config, preferences, config))
}

/// Builds the engine with the host's attribute applier attached.
pub(crate) fn wire(
    scale_config: ScaleConfig,
    preferences: PreferenceStore,
    config: LoopConfig,
) -> AppWiring {
    let mut engine = ScaleEngine::new(
        Arc::new(SpeciesTable::builtin()),
        scale_config,
        preferences,
    );
    let attributes = AttributeBook::default();
    engine.add_applier(attributes.applier());

    AppWiring {
        engine,
        attributes,
        config,
    }
}

/// Loop settings for tests: no pacing, no config file.
#[cfg(test)]
pub(crate) fn test_wiring(scale_config: ScaleConfig) -> AppWiring {
    wire(
        scale_config,
        PreferenceStore::in_memory(),
        LoopConfig {
            tick_interval: std::time::Duration::ZERO,
            config_file: None,
            ..LoopConfig::default()
        },
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_u64_from_env(var: &str) -> Option<u64> {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
}
