//! Reference data for the species shipped with the engine.
//!
//! Heights are real-world measurements in meters (shoulder height for
//! quadrupeds, body length for fish and arthropods). The nominal scale is
//! real height over the in-game model height, nudged up for creatures that
//! would otherwise be too small to see.

use super::table::{AttributeCapabilities, Category, CategorySet, SpeciesSeed};

use Category::{Animals, Arthropods, FlyingCreatures, Monsters, WaterCreatures};

pub(crate) struct BuiltinSpecies {
    kind: &'static str,
    height_m: f64,
    scale: f64,
    speed: f64,
    description: &'static str,
    categories: &'static [Category],
    hostile: bool,
}

impl BuiltinSpecies {
    pub(crate) fn to_seed(&self) -> SpeciesSeed {
        SpeciesSeed {
            kind: self.kind.to_string(),
            reference_height_m: self.height_m,
            nominal_scale_factor: self.scale,
            speed_multiplier: self.speed,
            description: self.description.to_string(),
            categories: CategorySet::of(self.categories),
            capabilities: if self.hostile {
                AttributeCapabilities::HOSTILE
            } else {
                AttributeCapabilities::PASSIVE
            },
        }
    }
}

const fn species(
    kind: &'static str,
    height_m: f64,
    scale: f64,
    speed: f64,
    description: &'static str,
    categories: &'static [Category],
    hostile: bool,
) -> BuiltinSpecies {
    BuiltinSpecies {
        kind,
        height_m,
        scale,
        speed,
        description,
        categories,
        hostile,
    }
}

pub(crate) const BUILTIN_SPECIES: &[BuiltinSpecies] = &[
    // Farm animals
    species("COW", 1.5, 1.07, 0.8, "Holstein cow - 1.5m shoulder height", &[Animals], false),
    species("PIG", 0.8, 0.89, 0.9, "Domestic pig - 0.8m shoulder height", &[Animals], false),
    species("SHEEP", 0.9, 0.69, 0.95, "Domestic sheep - 0.9m shoulder height", &[Animals], false),
    species("GOAT", 0.8, 0.67, 1.0, "Domestic goat - 0.8m shoulder height", &[Animals], true),
    species("CHICKEN", 0.35, 0.5, 1.2, "Chicken - 0.35m height", &[Animals], false),
    species("PARROT", 0.25, 0.28, 1.2, "Macaw parrot - 0.25m height", &[Animals, FlyingCreatures], false),
    species("HORSE", 1.6, 1.0, 0.7, "Horse - 1.6m shoulder height", &[Animals], false),
    species("DONKEY", 1.2, 0.92, 0.8, "Donkey - 1.2m shoulder height", &[Animals], false),
    species("MULE", 1.4, 0.93, 0.75, "Mule - 1.4m shoulder height", &[Animals], false),
    species("LLAMA", 1.8, 1.0, 0.85, "Llama - 1.8m shoulder height", &[Animals], true),
    species("TRADER_LLAMA", 1.8, 1.0, 0.85, "Trader llama - 1.8m shoulder height", &[Animals], true),
    species("CAMEL", 2.1, 0.95, 0.6, "Dromedary camel - 2.1m shoulder height", &[Animals], false),
    // Wild animals
    species("POLAR_BEAR", 1.5, 1.07, 0.8, "Polar bear - 1.5m shoulder height", &[Animals], true),
    species("WOLF", 0.8, 0.94, 1.1, "Gray wolf - 0.8m shoulder height", &[Animals], true),
    species("FOX", 0.4, 0.57, 1.1, "Red fox - 0.4m shoulder height", &[Animals], true),
    species("OCELOT", 0.5, 0.71, 1.3, "Ocelot - 0.5m shoulder height", &[Animals], false),
    species("CAT", 0.5, 0.83, 1.3, "Domestic cat - 0.5m height", &[Animals], false),
    species("PANDA", 1.0, 0.83, 0.9, "Giant panda - 1.0m shoulder height", &[Animals], true),
    species("RABBIT", 0.3, 0.6, 1.4, "European rabbit - 0.3m height", &[Animals], false),
    // Aquatic
    species("DOLPHIN", 2.4, 4.0, 0.8, "Bottlenose dolphin - 2.4m length", &[WaterCreatures], true),
    species("COD", 1.2, 2.0, 1.1, "Atlantic cod - 1.2m length", &[WaterCreatures], false),
    species("SALMON", 1.5, 2.14, 1.0, "Atlantic salmon - 1.5m length", &[WaterCreatures], false),
    species("PUFFERFISH", 0.5, 0.71, 2.2, "Pufferfish - 0.5m inflated diameter", &[WaterCreatures], false),
    species("TROPICAL_FISH", 0.15, 0.5, 1.7, "Tropical fish - 0.15m length", &[WaterCreatures], false),
    species("SQUID", 0.5, 0.63, 1.3, "Giant squid - 0.5m mantle length", &[WaterCreatures], false),
    species("GLOW_SQUID", 0.3, 0.38, 1.3, "Firefly squid - 0.3m mantle length", &[WaterCreatures], false),
    // Amphibians and reptiles
    species("FROG", 0.08, 0.16, 1.5, "Bullfrog - 0.08m body length", &[Animals], false),
    species("TURTLE", 1.5, 2.5, 1.0, "Sea turtle - 1.5m shell length", &[Animals, WaterCreatures], false),
    species("AXOLOTL", 0.15, 0.38, 1.2, "Axolotl - 0.15m length", &[Animals, WaterCreatures], true),
    // Arthropods
    species("BEE", 0.015, 0.15, 2.0, "Honeybee - 0.015m length (scaled for visibility)", &[FlyingCreatures, Arthropods], true),
    species("SPIDER", 0.05, 0.056, 1.5, "Tarantula - 0.05m body length", &[Monsters, Arthropods], true),
    species("CAVE_SPIDER", 0.03, 0.06, 1.6, "Cave spider - 0.03m body length", &[Monsters, Arthropods], true),
    species("SILVERFISH", 0.02, 0.067, 3.5, "Silverfish - 0.02m length", &[Monsters, Arthropods], true),
    // Bats
    species("BAT", 0.25, 0.28, 1.8, "Large fruit bat - 0.25m wingspan (scaled for visibility)", &[FlyingCreatures], false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_unique_and_upper_snake_case() {
        let mut seen = std::collections::HashSet::new();
        for row in BUILTIN_SPECIES {
            assert!(seen.insert(row.kind), "duplicate {}", row.kind);
            assert_eq!(row.kind, row.kind.to_ascii_uppercase());
        }
    }

    #[test]
    fn every_row_is_categorised() {
        for row in BUILTIN_SPECIES {
            assert!(!row.to_seed().categories.is_empty(), "{}", row.kind);
        }
    }
}
