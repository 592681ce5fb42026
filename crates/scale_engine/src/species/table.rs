use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::builtin::BUILTIN_SPECIES;
use super::derive::DerivedMultipliers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Animals,
    Monsters,
    WaterCreatures,
    FlyingCreatures,
    Arthropods,
    Bosses,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Animals,
        Category::Monsters,
        Category::WaterCreatures,
        Category::FlyingCreatures,
        Category::Arthropods,
        Category::Bosses,
        Category::Other,
    ];

    /// Order used to pick the single category an observer preference is keyed on.
    const PRIMARY_ORDER: [Category; 5] = [
        Category::Animals,
        Category::Monsters,
        Category::WaterCreatures,
        Category::FlyingCreatures,
        Category::Bosses,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Animals => "animals",
            Category::Monsters => "monsters",
            Category::WaterCreatures => "water-creatures",
            Category::FlyingCreatures => "flying-creatures",
            Category::Arthropods => "arthropods",
            Category::Bosses => "bosses",
            Category::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        Category::ALL
            .into_iter()
            .find(|category| category.label() == normalized)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed-size membership set over [`Category`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CategorySet(u8);

impl CategorySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Category::ALL.into_iter().collect()
    }

    pub fn of(categories: &[Category]) -> Self {
        categories.iter().copied().collect()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn insert(&mut self, category: Category) {
        self.0 |= category.bit();
    }

    pub fn remove(&mut self, category: Category) {
        self.0 &= !category.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL
            .into_iter()
            .filter(move |category| self.contains(*category))
    }

    /// Category an observer preference applies to; `Other` when none of the
    /// preference-facing categories match.
    pub fn primary(&self) -> Category {
        Category::PRIMARY_ORDER
            .into_iter()
            .find(|category| self.contains(*category))
            .unwrap_or(Category::Other)
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = CategorySet::empty();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

/// Gameplay attributes a kind actually carries. Appliers skip the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeCapabilities {
    pub health: bool,
    pub damage: bool,
    pub speed: bool,
}

impl AttributeCapabilities {
    pub const PASSIVE: Self = Self {
        health: true,
        damage: false,
        speed: true,
    };
    pub const HOSTILE: Self = Self {
        health: true,
        damage: true,
        speed: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Microscopic,
    Tiny,
    Small,
    Medium,
    Large,
    Giant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesProfile {
    pub kind: String,
    pub reference_height_m: f64,
    pub nominal_scale_factor: f64,
    pub speed_multiplier: f64,
    pub description: String,
    pub categories: CategorySet,
    pub capabilities: AttributeCapabilities,
}

impl SpeciesProfile {
    pub fn derived(&self) -> DerivedMultipliers {
        DerivedMultipliers::for_height(self.reference_height_m)
    }

    pub fn primary_category(&self) -> Category {
        self.categories.primary()
    }

    pub fn is_giant(&self) -> bool {
        self.reference_height_m > 3.0
    }

    pub fn is_tiny(&self) -> bool {
        self.reference_height_m < 0.1
    }

    pub fn size_class(&self) -> SizeClass {
        let height = self.reference_height_m;
        if self.is_tiny() {
            SizeClass::Microscopic
        } else if height < 0.3 {
            SizeClass::Tiny
        } else if height < 1.0 {
            SizeClass::Small
        } else if height < 2.0 {
            SizeClass::Medium
        } else if height < 4.0 {
            SizeClass::Large
        } else {
            SizeClass::Giant
        }
    }

    pub fn detailed_info(&self) -> String {
        let derived = self.derived();
        format!(
            "{} ({:.2}m, {:?}) - scale={:.2}x health={:.2}x speed={:.2}x",
            self.description,
            self.reference_height_m,
            self.size_class(),
            self.nominal_scale_factor,
            derived.health,
            self.speed_multiplier
        )
    }
}

/// Input record for [`SpeciesTableBuilder`].
#[derive(Debug, Clone)]
pub struct SpeciesSeed {
    pub kind: String,
    pub reference_height_m: f64,
    pub nominal_scale_factor: f64,
    pub speed_multiplier: f64,
    pub description: String,
    pub categories: CategorySet,
    pub capabilities: AttributeCapabilities,
}

#[derive(Debug, Error, PartialEq)]
pub enum SpeciesTableError {
    #[error("species kind cannot be empty")]
    EmptyKind,
    #[error("duplicate species kind: {kind}")]
    DuplicateKind { kind: String },
    #[error("species {kind} has invalid {field}: {value} (must be finite and > 0)")]
    NonPositive {
        kind: String,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Default)]
pub struct SpeciesTableBuilder {
    profiles: Vec<Arc<SpeciesProfile>>,
    index_by_kind: HashMap<String, usize>,
}

impl SpeciesTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, seed: SpeciesSeed) -> Result<&mut Self, SpeciesTableError> {
        let kind = normalize_kind(&seed.kind);
        if kind.is_empty() {
            return Err(SpeciesTableError::EmptyKind);
        }
        if self.index_by_kind.contains_key(&kind) {
            return Err(SpeciesTableError::DuplicateKind { kind });
        }
        for (field, value) in [
            ("reference height", seed.reference_height_m),
            ("nominal scale factor", seed.nominal_scale_factor),
            ("speed multiplier", seed.speed_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SpeciesTableError::NonPositive { kind, field, value });
            }
        }

        self.index_by_kind.insert(kind.clone(), self.profiles.len());
        self.profiles.push(Arc::new(SpeciesProfile {
            kind,
            reference_height_m: seed.reference_height_m,
            nominal_scale_factor: seed.nominal_scale_factor,
            speed_multiplier: seed.speed_multiplier,
            description: seed.description,
            categories: seed.categories,
            capabilities: seed.capabilities,
        }));
        Ok(self)
    }

    pub fn build(self) -> SpeciesTable {
        SpeciesTable {
            profiles: self.profiles,
            index_by_kind: self.index_by_kind,
        }
    }
}

pub fn normalize_kind(kind: &str) -> String {
    kind.trim().to_ascii_uppercase()
}

/// Immutable kind → profile mapping, built once and shared by reference.
#[derive(Debug, Default, Clone)]
pub struct SpeciesTable {
    profiles: Vec<Arc<SpeciesProfile>>,
    index_by_kind: HashMap<String, usize>,
}

impl SpeciesTable {
    pub fn builtin() -> Self {
        let mut builder = SpeciesTableBuilder::new();
        for species in BUILTIN_SPECIES {
            // Built-in rows are covered by `builtin_table_contains_every_row`.
            if let Err(error) = builder.insert(species.to_seed()) {
                tracing::error!(error = %error, "builtin_species_rejected");
            }
        }
        builder.build()
    }

    /// Kinds are stored upper snake case, e.g. `POLAR_BEAR`; other spellings
    /// are normalised before a second lookup.
    pub fn lookup(&self, kind: &str) -> Option<&Arc<SpeciesProfile>> {
        let index = match self.index_by_kind.get(kind) {
            Some(index) => index,
            None => self.index_by_kind.get(&normalize_kind(kind))?,
        };
        self.profiles.get(*index)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.lookup(kind).is_some()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<SpeciesProfile>> {
        self.profiles.iter()
    }
}
