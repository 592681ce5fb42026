use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

mod atomic_io;
pub mod biome;
pub mod cache;
pub mod config;
pub mod preferences;
pub mod resolve;
pub mod species;
mod stats;
mod sync;

pub use biome::{BiomeFamily, BiomeMatch, BiomeModifierResolver};
pub use cache::{EntityScaleCache, ScaleCacheReader};
pub use config::{ConfigAdjustment, ConfigError, ScaleConfig, CONFIG_FILE_NAME};
pub use preferences::{
    JsonPreferenceFile, ObserverId, PreferenceError, PreferenceRecord, PreferenceStore,
    ScalingMode, PREFERENCES_FILE_NAME,
};
pub use resolve::{
    AttributeAdjustments, AttributeApplier, ConfigReload, CreatureId, CreatureView, HookDecision,
    InvalidResultError, LifeStage, Outcome, Position, ProposedScale, RegionSelector,
    ResolveSummary, ResolvedScale, ScaleEngine, SkipReason,
};
pub use species::{Category, CategorySet, SpeciesProfile, SpeciesTable};
pub use stats::ScalingStatistics;

pub const ROOT_ENV_VAR: &str = "MOBSCALE_ROOT";

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub preferences_file: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create data directory at {path}: {source}")]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "MOBSCALE_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or data/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or data/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/mobscale\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Locates the project root and makes sure `data/` exists under it.
pub fn resolve_data_paths() -> Result<DataPaths, StartupError> {
    data_paths_under(resolve_root()?)
}

fn data_paths_under(root: PathBuf) -> Result<DataPaths, StartupError> {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).map_err(|source| StartupError::CreateDataDir {
        path: data_dir.clone(),
        source,
    })?;

    Ok(DataPaths {
        config_file: data_dir.join(CONFIG_FILE_NAME),
        preferences_file: data_dir.join(PREFERENCES_FILE_NAME),
        data_dir,
        root,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_data = path.join("data").is_dir();

    cargo_toml && (has_crates || has_data)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("data")).expect("data dir");
        assert!(!is_repo_marker(dir.path()));

        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(is_repo_marker(dir.path()));
    }

    #[test]
    fn data_paths_create_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = data_paths_under(dir.path().to_path_buf()).expect("paths");
        assert!(paths.data_dir.is_dir());
        assert_eq!(paths.config_file, dir.path().join("data").join("config.json"));
        assert_eq!(
            paths.preferences_file,
            dir.path().join("data").join("player_preferences.json")
        );
    }
}
