use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::atomic_io::write_json_atomic;
use crate::species::{normalize_kind, Category, CategorySet};

pub const CONFIG_FILE_NAME: &str = "config.json";

const MULTIPLIER_RANGE: (f64, f64) = (0.1, 10.0);
const JUVENILE_MULTIPLIER_RANGE: (f64, f64) = (0.1, 5.0);
const OVERRIDE_RANGE: (f64, f64) = (0.01, 10.0);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path} at {json_path}: {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("failed to write default config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Administrative scaling configuration. Every field has a default so a
/// partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScaleConfig {
    pub settings: GeneralSettings,
    pub worlds: WorldFilter,
    pub mobs: MobSettings,
    pub categories: CategoryToggles,
    pub realistic: RealisticSettings,
    pub bounds: ScaleBounds,
    pub biomes: BiomeSettings,
    pub performance: PerformanceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneralSettings {
    pub enabled: bool,
    pub debug: bool,
    pub apply_to_existing: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            apply_to_existing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldFilterMode {
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorldFilter {
    pub mode: WorldFilterMode,
    pub list: Vec<String>,
}

impl Default for WorldFilter {
    fn default() -> Self {
        Self {
            mode: WorldFilterMode::Whitelist,
            list: vec![
                "world".to_string(),
                "world_nether".to_string(),
                "world_the_end".to_string(),
            ],
        }
    }
}

impl WorldFilter {
    pub fn is_world_enabled(&self, world: &str) -> bool {
        let listed = self.list.iter().any(|entry| entry == world);
        match self.mode {
            WorldFilterMode::Whitelist => listed,
            WorldFilterMode::Blacklist => !listed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MobOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_health: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_baby_scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MobSettings {
    pub enabled_by_default: bool,
    /// Keyed by species kind, e.g. `COW`. `sanitize` folds other spellings
    /// onto the upper-case key.
    pub overrides: BTreeMap<String, MobOverride>,
}

impl Default for MobSettings {
    fn default() -> Self {
        Self {
            enabled_by_default: true,
            overrides: BTreeMap::new(),
        }
    }
}

impl MobSettings {
    pub fn is_kind_enabled(&self, kind: &str) -> bool {
        self.overrides
            .get(kind)
            .and_then(|entry| entry.enabled)
            .unwrap_or(self.enabled_by_default)
    }

    pub fn override_for(&self, kind: &str) -> Option<&MobOverride> {
        self.overrides.get(kind)
    }

    /// Re-keys overrides by canonical kind. On a clash the entry whose key
    /// sorts first wins, which keeps an exact upper-case key over `cow`.
    fn normalize_override_keys(&mut self) {
        if self
            .overrides
            .keys()
            .all(|key| normalize_kind(key) == *key)
        {
            return;
        }
        let mut normalized = BTreeMap::new();
        for (key, entry) in std::mem::take(&mut self.overrides) {
            let kind = normalize_kind(&key);
            if normalized.contains_key(&kind) {
                warn!(key = %key, kind = %kind, "config_override_duplicate_ignored");
                continue;
            }
            if kind != key {
                warn!(key = %key, kind = %kind, "config_override_key_normalized");
            }
            normalized.insert(kind, entry);
        }
        self.overrides = normalized;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CategoryToggles {
    pub animals: bool,
    pub water_creatures: bool,
    pub flying_creatures: bool,
    pub arthropods: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            animals: true,
            water_creatures: true,
            flying_creatures: true,
            arthropods: true,
        }
    }
}

impl CategoryToggles {
    /// A kind is scaled only when none of its categories is switched off.
    pub fn allows(&self, categories: CategorySet) -> bool {
        let toggles = [
            (Category::Animals, self.animals),
            (Category::WaterCreatures, self.water_creatures),
            (Category::FlyingCreatures, self.flying_creatures),
            (Category::Arthropods, self.arthropods),
        ];
        toggles
            .into_iter()
            .all(|(category, enabled)| enabled || !categories.contains(category))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RealisticSettings {
    pub baby_scaling: bool,
    pub baby_scale_multiplier: f64,
    pub realistic_health: bool,
    pub realistic_speed: bool,
    pub realistic_damage: bool,
    pub global_scale_multiplier: f64,
    pub global_health_multiplier: f64,
}

impl Default for RealisticSettings {
    fn default() -> Self {
        Self {
            baby_scaling: true,
            baby_scale_multiplier: 1.0,
            realistic_health: true,
            realistic_speed: true,
            realistic_damage: true,
            global_scale_multiplier: 1.0,
            global_health_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScaleBounds {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            min_scale: 0.05,
            max_scale: 5.0,
        }
    }
}

impl ScaleBounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_scale, self.max_scale)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_scale && value <= self.max_scale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BiomeSettings {
    pub enabled: bool,
    pub minimum_multiplier: f64,
    pub maximum_multiplier: f64,
    pub apply_to_all_entities: bool,
    pub debug_mode: bool,
    /// Environment key (upper snake case) to multiplier.
    pub multipliers: BTreeMap<String, f64>,
}

impl Default for BiomeSettings {
    fn default() -> Self {
        let multipliers = DEFAULT_BIOME_MULTIPLIERS
            .iter()
            .map(|(key, value)| ((*key).to_string(), *value))
            .collect();
        Self {
            enabled: true,
            minimum_multiplier: 0.5,
            maximum_multiplier: 2.0,
            apply_to_all_entities: false,
            debug_mode: false,
            multipliers,
        }
    }
}

const DEFAULT_BIOME_MULTIPLIERS: &[(&str, f64)] = &[
    // cold
    ("SNOWY_PLAINS", 1.1),
    ("ICE_SPIKES", 1.1),
    ("SNOWY_TAIGA", 1.05),
    ("FROZEN_PEAKS", 1.0),
    ("FROZEN_OCEAN", 0.95),
    // hot
    ("DESERT", 0.9),
    ("BADLANDS", 0.95),
    ("SAVANNA", 0.95),
    ("DESERT_OCEAN", 0.9),
    // forest
    ("FOREST", 1.0),
    ("BIRCH_FOREST", 1.0),
    ("DARK_FOREST", 1.05),
    ("OLD_GROWTH_FOREST", 1.02),
    ("TAIGA", 1.0),
    ("GROVE", 1.0),
    ("JUNGLE", 1.05),
    ("SPARSE_JUNGLE", 1.02),
    ("BAMBOO_JUNGLE", 1.05),
    // mountain
    ("MOUNTAINS", 0.95),
    ("WINDSWEPT_HILLS", 0.95),
    ("STONY_PEAKS", 0.9),
    ("JAGGED_PEAKS", 0.85),
    // ocean
    ("OCEAN", 1.0),
    ("DEEP_OCEAN", 1.1),
    ("COLD_OCEAN", 1.05),
    ("LUKEWARM_OCEAN", 1.0),
    ("WARM_OCEAN", 0.95),
    ("DEEP_LUKEWARM_OCEAN", 1.1),
    ("DEEP_COLD_OCEAN", 1.15),
    // wetlands, plains, rivers
    ("SWAMP", 1.05),
    ("MANGROVE_SWAMP", 1.05),
    ("PLAINS", 1.0),
    ("SUNFLOWER_PLAINS", 1.0),
    ("MEADOW", 1.0),
    ("RIVER", 1.02),
    ("FROZEN_RIVER", 1.02),
    ("MUSHROOM_FIELDS", 0.9),
    // nether
    ("NETHER_WASTES", 0.95),
    ("CRIMSON_FOREST", 0.9),
    ("WARPED_FOREST", 0.9),
    ("SOUL_SAND_VALLEY", 0.85),
    ("BASALT_DELTAS", 0.8),
    // end
    ("THE_END", 0.9),
    ("END_HIGHLANDS", 0.85),
    ("END_MIDLANDS", 0.9),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PerformanceSettings {
    pub check_interval_ticks: u32,
    pub max_processing_per_tick: u32,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            check_interval_ticks: 100,
            max_processing_per_tick: 10,
        }
    }
}

/// One value `sanitize` had to change.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigAdjustment {
    pub key: String,
    pub original: f64,
    pub adjusted: f64,
}

impl ScaleConfig {
    pub fn from_json_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let mut config: ScaleConfig = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| {
                let json_path = error.path().to_string();
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    json_path,
                    message: error.into_inner().to_string(),
                }
            })?;
        config.sanitize();
        Ok(config)
    }

    /// Reads `path`, or writes the defaults there when it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = ScaleConfig::default();
            write_json_atomic(path, &config).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "config_default_written");
            return Ok(config);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(path, &raw)?;
        info!(
            path = %path.display(),
            mob_overrides = config.mobs.overrides.len(),
            biome_entries = config.biomes.multipliers.len(),
            "config_loaded"
        );
        Ok(config)
    }

    /// Pulls every multiplier back into its sane range. Each offending key is
    /// reported once per call.
    pub fn sanitize(&mut self) -> Vec<ConfigAdjustment> {
        let mut adjustments = Vec::new();

        let realistic = &mut self.realistic;
        clamp_field(
            "realistic.baby-scale-multiplier",
            &mut realistic.baby_scale_multiplier,
            JUVENILE_MULTIPLIER_RANGE,
            1.0,
            &mut adjustments,
        );
        clamp_field(
            "realistic.global-scale-multiplier",
            &mut realistic.global_scale_multiplier,
            MULTIPLIER_RANGE,
            1.0,
            &mut adjustments,
        );
        clamp_field(
            "realistic.global-health-multiplier",
            &mut realistic.global_health_multiplier,
            MULTIPLIER_RANGE,
            1.0,
            &mut adjustments,
        );

        self.mobs.normalize_override_keys();
        for (kind, entry) in &mut self.mobs.overrides {
            for (name, slot) in [
                ("custom-scale", &mut entry.custom_scale),
                ("custom-health", &mut entry.custom_health),
                ("custom-baby-scale", &mut entry.custom_baby_scale),
            ] {
                if let Some(value) = slot.as_mut() {
                    clamp_field(
                        &format!("mobs.overrides.{kind}.{name}"),
                        value,
                        OVERRIDE_RANGE,
                        1.0,
                        &mut adjustments,
                    );
                }
            }
        }

        let defaults = ScaleBounds::default();
        repair_range(
            "bounds",
            &mut self.bounds.min_scale,
            &mut self.bounds.max_scale,
            (defaults.min_scale, defaults.max_scale),
            &mut adjustments,
        );
        repair_range(
            "biomes",
            &mut self.biomes.minimum_multiplier,
            &mut self.biomes.maximum_multiplier,
            (0.5, 2.0),
            &mut adjustments,
        );
        let biome_range = (
            self.biomes.minimum_multiplier,
            self.biomes.maximum_multiplier,
        );
        for (biome, value) in &mut self.biomes.multipliers {
            clamp_field(
                &format!("biomes.multipliers.{biome}"),
                value,
                biome_range,
                1.0_f64.clamp(biome_range.0, biome_range.1),
                &mut adjustments,
            );
        }

        adjustments
    }

    /// Names of the top-level sections that differ between `self` and `other`.
    pub fn changed_sections(&self, other: &ScaleConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.settings != other.settings {
            changed.push("settings");
        }
        if self.worlds != other.worlds {
            changed.push("worlds");
        }
        if self.mobs != other.mobs {
            changed.push("mobs");
        }
        if self.categories != other.categories {
            changed.push("categories");
        }
        if self.realistic != other.realistic {
            changed.push("realistic");
        }
        if self.bounds != other.bounds {
            changed.push("bounds");
        }
        if self.biomes != other.biomes {
            changed.push("biomes");
        }
        if self.performance != other.performance {
            changed.push("performance");
        }
        changed
    }
}

fn clamp_field(
    key: &str,
    value: &mut f64,
    (min, max): (f64, f64),
    fallback: f64,
    adjustments: &mut Vec<ConfigAdjustment>,
) {
    let adjusted = if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    };
    if adjusted != *value {
        record(key, value, adjusted, adjustments);
    }
}

fn repair_range(
    section: &str,
    min: &mut f64,
    max: &mut f64,
    defaults: (f64, f64),
    adjustments: &mut Vec<ConfigAdjustment>,
) {
    let valid = min.is_finite() && max.is_finite() && *min > 0.0 && *min <= *max;
    if valid {
        return;
    }
    record(&format!("{section}.min"), min, defaults.0, adjustments);
    record(&format!("{section}.max"), max, defaults.1, adjustments);
}

fn record(key: &str, value: &mut f64, adjusted: f64, adjustments: &mut Vec<ConfigAdjustment>) {
    warn!(
        key,
        original = *value,
        adjusted,
        "config_multiplier_clamped"
    );
    adjustments.push(ConfigAdjustment {
        key: key.to_string(),
        original: *value,
        adjusted,
    });
    *value = adjusted;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_values() {
        let config = ScaleConfig::default();
        assert!(config.settings.enabled);
        assert_eq!(config.realistic.global_scale_multiplier, 1.0);
        assert_eq!(config.biomes.minimum_multiplier, 0.5);
        assert_eq!(config.biomes.maximum_multiplier, 2.0);
        assert_eq!(config.biomes.multipliers.get("DESERT"), Some(&0.9));
        assert!(config.worlds.is_world_enabled("world"));
        assert!(!config.worlds.is_world_enabled("creative"));
    }

    #[test]
    fn partial_json_fills_remaining_defaults() {
        let raw = r#"{ "realistic": { "global-scale-multiplier": 1.5 },
                       "mobs": { "overrides": { "COW": { "custom-scale": 2.0 } } } }"#;
        let config = ScaleConfig::from_json_str(Path::new("config.json"), raw).expect("parse");
        assert_eq!(config.realistic.global_scale_multiplier, 1.5);
        assert_eq!(config.realistic.baby_scale_multiplier, 1.0);
        assert_eq!(
            config.mobs.override_for("COW").and_then(|o| o.custom_scale),
            Some(2.0)
        );
        assert!(config.mobs.is_kind_enabled("COW"));
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = r#"{ "bounds": { "min-scale": "tiny" } }"#;
        let error = ScaleConfig::from_json_str(Path::new("config.json"), raw).expect_err("bad");
        match error {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "bounds.min-scale"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sanitize_clamps_out_of_range_multipliers() {
        let mut config = ScaleConfig::default();
        config.realistic.global_scale_multiplier = 50.0;
        config.realistic.baby_scale_multiplier = f64::NAN;
        let adjustments = config.sanitize();

        assert_eq!(config.realistic.global_scale_multiplier, 10.0);
        assert_eq!(config.realistic.baby_scale_multiplier, 1.0);
        assert_eq!(adjustments.len(), 2);
        assert!(config.sanitize().is_empty(), "second pass is clean");
    }

    #[test]
    fn sanitize_repairs_inverted_bounds() {
        let mut config = ScaleConfig::default();
        config.bounds = ScaleBounds {
            min_scale: 3.0,
            max_scale: 1.0,
        };
        config.sanitize();
        assert_eq!(config.bounds, ScaleBounds::default());
    }

    #[test]
    fn sanitize_reports_biome_entries_outside_their_range() {
        let mut config = ScaleConfig::default();
        config.biomes.maximum_multiplier = 1.5;
        config.biomes.multipliers.insert("VOLCANO".to_string(), 9.0);
        config.biomes.multipliers.insert("VOID".to_string(), f64::INFINITY);
        let adjustments = config.sanitize();

        assert_eq!(config.biomes.multipliers.get("VOLCANO"), Some(&1.5));
        assert_eq!(config.biomes.multipliers.get("VOID"), Some(&1.0));
        let keys = adjustments
            .iter()
            .map(|adjustment| adjustment.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec!["biomes.multipliers.VOID", "biomes.multipliers.VOLCANO"]
        );
    }

    #[test]
    fn sanitize_folds_override_keys_onto_canonical_kinds() {
        let mut config = ScaleConfig::default();
        config.mobs.overrides.insert(
            "COW".to_string(),
            MobOverride {
                custom_scale: Some(2.0),
                ..MobOverride::default()
            },
        );
        config.mobs.overrides.insert(
            "cow".to_string(),
            MobOverride {
                custom_scale: Some(3.0),
                ..MobOverride::default()
            },
        );
        config.mobs.overrides.insert(
            " polar_bear".to_string(),
            MobOverride {
                enabled: Some(false),
                ..MobOverride::default()
            },
        );
        config.sanitize();

        assert_eq!(config.mobs.overrides.len(), 2);
        assert_eq!(
            config.mobs.override_for("COW").and_then(|o| o.custom_scale),
            Some(2.0)
        );
        assert!(!config.mobs.is_kind_enabled("POLAR_BEAR"));
    }

    #[test]
    fn category_toggles_block_any_disabled_membership() {
        let toggles = CategoryToggles {
            arthropods: false,
            ..CategoryToggles::default()
        };
        let bee = CategorySet::of(&[Category::FlyingCreatures, Category::Arthropods]);
        let bat = CategorySet::of(&[Category::FlyingCreatures]);
        assert!(!toggles.allows(bee));
        assert!(toggles.allows(bat));
    }

    #[test]
    fn kind_override_beats_default_enablement() {
        let mut mobs = MobSettings {
            enabled_by_default: false,
            ..MobSettings::default()
        };
        mobs.overrides.insert(
            "PIG".to_string(),
            MobOverride {
                enabled: Some(true),
                ..MobOverride::default()
            },
        );
        assert!(mobs.is_kind_enabled("PIG"));
        assert!(!mobs.is_kind_enabled("COW"));
    }

    #[test]
    fn load_or_create_writes_defaults_then_reads_them_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);

        let created = ScaleConfig::load_or_create(&path).expect("create");
        assert!(path.is_file());
        let loaded = ScaleConfig::load_or_create(&path).expect("load");
        assert_eq!(created, loaded);
    }

    #[test]
    fn changed_sections_lists_only_differences() {
        let before = ScaleConfig::default();
        let mut after = before.clone();
        after.bounds.max_scale = 3.0;
        after.biomes.enabled = false;
        assert_eq!(before.changed_sections(&after), vec!["bounds", "biomes"]);
    }
}
