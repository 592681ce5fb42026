use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::BiomeSettings;
use crate::species::{Category, SpeciesProfile};

const NEUTRAL: f64 = 1.0;

/// Coarse biome groups used when an environment has no entry of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiomeFamily {
    Ocean,
    Forest,
    Mountain,
    Desert,
}

impl BiomeFamily {
    const ALL: [BiomeFamily; 4] = [
        BiomeFamily::Ocean,
        BiomeFamily::Forest,
        BiomeFamily::Mountain,
        BiomeFamily::Desert,
    ];

    fn markers(self) -> &'static [&'static str] {
        match self {
            BiomeFamily::Ocean => &["OCEAN"],
            BiomeFamily::Forest => &["FOREST", "TAIGA", "BIRCH", "GROVE"],
            BiomeFamily::Mountain => &["MOUNTAIN", "PEAK", "HILLS", "WINDSWEPT"],
            BiomeFamily::Desert => &["DESERT", "BADLANDS"],
        }
    }

    fn anchor(self) -> &'static str {
        match self {
            BiomeFamily::Ocean => "OCEAN",
            BiomeFamily::Forest => "FOREST",
            BiomeFamily::Mountain => "MOUNTAINS",
            BiomeFamily::Desert => "DESERT",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Families are checked in a fixed order so a key like `DESERT_OCEAN`
    /// always lands in exactly one of them.
    pub fn classify(environment: &str) -> Option<Self> {
        BiomeFamily::ALL.into_iter().find(|family| {
            family
                .markers()
                .iter()
                .any(|marker| environment.contains(marker))
        })
    }
}

/// Where a biome multiplier came from; useful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BiomeMatch {
    Disabled,
    Ineligible,
    Exact(f64),
    Family(BiomeFamily, f64),
    Unmatched,
}

/// Read-only view of the biome table, built once from [`BiomeSettings`].
#[derive(Debug, Clone)]
pub struct BiomeModifierResolver {
    enabled: bool,
    apply_to_all: bool,
    debug: bool,
    min: f64,
    max: f64,
    entries: BTreeMap<String, f64>,
    family_fallback: [Option<f64>; 4],
}

impl BiomeModifierResolver {
    pub fn new(settings: &BiomeSettings) -> Self {
        let (min, max) = match (settings.minimum_multiplier, settings.maximum_multiplier) {
            (min, max) if min.is_finite() && max.is_finite() && min <= max => (min, max),
            _ => (0.5, 2.0),
        };
        let entries = settings
            .multipliers
            .iter()
            .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.clamp(min, max)))
            .collect::<BTreeMap<_, _>>();

        let mut family_fallback = [None; 4];
        for family in BiomeFamily::ALL {
            let anchored = entries.get(family.anchor()).copied();
            // BTreeMap iteration is sorted, so the fallback is stable across runs.
            let first_member = entries
                .iter()
                .find(|(key, _)| BiomeFamily::classify(key) == Some(family))
                .map(|(_, value)| *value);
            family_fallback[family.index()] = anchored.or(first_member);
        }

        if settings.enabled {
            info!(biome_count = entries.len(), "biome_table_loaded");
        } else {
            info!("biome_scaling_disabled");
        }

        Self {
            enabled: settings.enabled,
            apply_to_all: settings.apply_to_all_entities,
            debug: settings.debug_mode,
            min,
            max,
            entries,
            family_fallback,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn configured_biome_count(&self) -> usize {
        self.entries.len()
    }

    /// Bosses are left alone unless every entity is opted in.
    pub fn is_eligible(&self, profile: &SpeciesProfile) -> bool {
        self.apply_to_all || !profile.categories.contains(Category::Bosses)
    }

    pub fn resolve(&self, environment: &str, profile: &SpeciesProfile) -> f64 {
        match self.lookup(environment, profile) {
            BiomeMatch::Disabled | BiomeMatch::Ineligible => NEUTRAL,
            BiomeMatch::Exact(value) | BiomeMatch::Family(_, value) => value,
            BiomeMatch::Unmatched => NEUTRAL.clamp(self.min, self.max),
        }
    }

    pub fn lookup(&self, environment: &str, profile: &SpeciesProfile) -> BiomeMatch {
        if !self.enabled {
            return BiomeMatch::Disabled;
        }
        if !self.is_eligible(profile) {
            return BiomeMatch::Ineligible;
        }

        let key = environment.trim().to_ascii_uppercase();
        if let Some(value) = self.entries.get(&key) {
            if self.debug {
                debug!(biome = %key, kind = %profile.kind, multiplier = *value, "biome_exact_match");
            }
            return BiomeMatch::Exact(*value);
        }

        let family_hit = BiomeFamily::classify(&key)
            .and_then(|family| self.family_fallback[family.index()].map(|value| (family, value)));
        match family_hit {
            Some((family, value)) => {
                if self.debug {
                    debug!(
                        biome = %key,
                        kind = %profile.kind,
                        family = ?family,
                        multiplier = value,
                        "biome_family_match"
                    );
                }
                BiomeMatch::Family(family, value)
            }
            None => BiomeMatch::Unmatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::{AttributeCapabilities, CategorySet};

    fn profile(categories: &[Category]) -> SpeciesProfile {
        SpeciesProfile {
            kind: "COW".to_string(),
            reference_height_m: 1.5,
            nominal_scale_factor: 1.07,
            speed_multiplier: 0.8,
            description: "cow".to_string(),
            categories: CategorySet::of(categories),
            capabilities: AttributeCapabilities::PASSIVE,
        }
    }

    fn settings(entries: &[(&str, f64)]) -> BiomeSettings {
        BiomeSettings {
            multipliers: entries
                .iter()
                .map(|(key, value)| ((*key).to_string(), *value))
                .collect(),
            ..BiomeSettings::default()
        }
    }

    #[test]
    fn exact_match_wins() {
        let resolver = BiomeModifierResolver::new(&BiomeSettings::default());
        let cow = profile(&[Category::Animals]);
        assert_eq!(resolver.resolve("DESERT", &cow), 0.9);
        assert_eq!(resolver.resolve("desert", &cow), 0.9);
    }

    #[test]
    fn family_fallback_prefers_anchor_entry() {
        let resolver =
            BiomeModifierResolver::new(&settings(&[("DEEP_OCEAN", 1.2), ("OCEAN", 1.05)]));
        let cow = profile(&[Category::Animals]);
        assert_eq!(
            resolver.lookup("WARM_OCEAN", &cow),
            BiomeMatch::Family(BiomeFamily::Ocean, 1.05)
        );
    }

    #[test]
    fn family_fallback_without_anchor_uses_first_sorted_member() {
        let resolver =
            BiomeModifierResolver::new(&settings(&[("TAIGA", 1.3), ("BIRCH_FOREST", 1.1)]));
        let cow = profile(&[Category::Animals]);
        assert_eq!(resolver.resolve("DARK_FOREST", &cow), 1.1);
    }

    #[test]
    fn families_do_not_leak_into_each_other() {
        let resolver = BiomeModifierResolver::new(&settings(&[("FOREST", 1.2)]));
        let cow = profile(&[Category::Animals]);
        assert_eq!(resolver.lookup("STONY_PEAKS", &cow), BiomeMatch::Unmatched);
        assert_eq!(resolver.resolve("PLAINS", &cow), 1.0);
    }

    #[test]
    fn overlapping_markers_classify_in_fixed_order() {
        assert_eq!(BiomeFamily::classify("DESERT_OCEAN"), Some(BiomeFamily::Ocean));
        assert_eq!(BiomeFamily::classify("SNOWY_TAIGA"), Some(BiomeFamily::Forest));
        assert_eq!(BiomeFamily::classify("FROZEN_PEAKS"), Some(BiomeFamily::Mountain));
        assert_eq!(BiomeFamily::classify("PLAINS"), None);
    }

    #[test]
    fn entries_are_clamped_to_configured_range() {
        let resolver = BiomeModifierResolver::new(&settings(&[("VOLCANO", 9.0), ("VOID", 0.1)]));
        let cow = profile(&[Category::Animals]);
        assert_eq!(resolver.resolve("VOLCANO", &cow), 2.0);
        assert_eq!(resolver.resolve("VOID", &cow), 0.5);
    }

    #[test]
    fn disabled_or_boss_returns_neutral() {
        let disabled = BiomeModifierResolver::new(&BiomeSettings {
            enabled: false,
            ..BiomeSettings::default()
        });
        let cow = profile(&[Category::Animals]);
        assert_eq!(disabled.resolve("DESERT", &cow), 1.0);

        let resolver = BiomeModifierResolver::new(&BiomeSettings::default());
        let boss = profile(&[Category::Bosses]);
        assert_eq!(resolver.lookup("DESERT", &boss), BiomeMatch::Ineligible);

        let everyone = BiomeModifierResolver::new(&BiomeSettings {
            apply_to_all_entities: true,
            ..BiomeSettings::default()
        });
        assert_eq!(everyone.resolve("DESERT", &boss), 0.9);
    }
}
