mod builtin;
pub mod derive;
mod table;

pub use derive::{
    derive_damage, derive_health, derive_juvenile_factor, DerivedMultipliers, REFERENCE_HEIGHT_M,
};
pub use table::{
    normalize_kind, AttributeCapabilities, Category, CategorySet, SizeClass, SpeciesProfile,
    SpeciesSeed, SpeciesTable, SpeciesTableBuilder, SpeciesTableError,
};
