use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::species::{Category, CategorySet};

pub const PERSONAL_MULTIPLIER_MIN: f64 = 0.1;
pub const PERSONAL_MULTIPLIER_MAX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMode {
    /// Every category, scaled by the personal multiplier.
    Global,
    /// Only categories the observer has switched on.
    ByCategory,
    Disabled,
}

impl ScalingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalingMode::Global => "GLOBAL",
            ScalingMode::ByCategory => "BY_CATEGORY",
            ScalingMode::Disabled => "DISABLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "GLOBAL" => Some(ScalingMode::Global),
            "BY_CATEGORY" => Some(ScalingMode::ByCategory),
            "DISABLED" => Some(ScalingMode::Disabled),
            _ => None,
        }
    }
}

/// Categories an observer sees scaled until they choose otherwise.
pub fn default_enabled_categories() -> CategorySet {
    CategorySet::all()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceRecord {
    pub observer: ObserverId,
    pub enabled: bool,
    pub mode: ScalingMode,
    pub personal_multiplier: f64,
    pub enabled_categories: CategorySet,
    pub show_scaling_info: bool,
}

impl PreferenceRecord {
    pub fn new(observer: ObserverId) -> Self {
        Self {
            observer,
            enabled: true,
            mode: ScalingMode::Global,
            personal_multiplier: 1.0,
            enabled_categories: default_enabled_categories(),
            show_scaling_info: false,
        }
    }

    /// 0.0 means "do not scale this category for this observer".
    pub fn effective_multiplier(&self, category: Category) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        match self.mode {
            ScalingMode::Global => self.personal_multiplier,
            ScalingMode::ByCategory if self.enabled_categories.contains(category) => {
                self.personal_multiplier
            }
            ScalingMode::ByCategory | ScalingMode::Disabled => 0.0,
        }
    }

    pub fn to_stored(&self) -> StoredPreference {
        StoredPreference {
            enabled: self.enabled,
            scaling_mode: self.mode.as_str().to_string(),
            personal_scale_multiplier: self.personal_multiplier,
            show_scaling_info: self.show_scaling_info,
            categories_enabled: self
                .enabled_categories
                .iter()
                .map(|category| category.label().to_string())
                .collect(),
        }
    }

    /// Rebuilds a record from its persisted form. A personal multiplier outside
    /// its range is clamped; anything unparseable is an error.
    pub fn from_stored(
        observer: ObserverId,
        stored: &StoredPreference,
    ) -> Result<Self, InvalidPreference> {
        let mode = ScalingMode::parse(&stored.scaling_mode).ok_or_else(|| InvalidPreference {
            observer,
            field: "scaling_mode",
            value: stored.scaling_mode.clone(),
        })?;
        if !stored.personal_scale_multiplier.is_finite() {
            return Err(InvalidPreference {
                observer,
                field: "personal_scale_multiplier",
                value: stored.personal_scale_multiplier.to_string(),
            });
        }
        let mut enabled_categories = CategorySet::empty();
        for label in &stored.categories_enabled {
            let category = Category::from_label(label).ok_or_else(|| InvalidPreference {
                observer,
                field: "categories_enabled",
                value: label.clone(),
            })?;
            enabled_categories.insert(category);
        }

        Ok(Self {
            observer,
            enabled: stored.enabled,
            mode,
            personal_multiplier: clamp_personal_multiplier(stored.personal_scale_multiplier),
            enabled_categories,
            show_scaling_info: stored.show_scaling_info,
        })
    }
}

pub(crate) fn clamp_personal_multiplier(value: f64) -> f64 {
    value.clamp(PERSONAL_MULTIPLIER_MIN, PERSONAL_MULTIPLIER_MAX)
}

/// On-disk shape of one observer's preferences. Kept loose (strings) so a
/// single malformed field can be detected and recovered from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredPreference {
    pub enabled: bool,
    pub scaling_mode: String,
    pub personal_scale_multiplier: f64,
    pub show_scaling_info: bool,
    pub categories_enabled: Vec<String>,
}

impl Default for StoredPreference {
    fn default() -> Self {
        PreferenceRecord::new(ObserverId(0)).to_stored()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid stored preference for {observer}: {field}={value}")]
pub struct InvalidPreference {
    pub observer: ObserverId,
    pub field: &'static str,
    pub value: String,
}
