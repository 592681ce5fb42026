//! Size-driven attribute multipliers.
//!
//! Every function here is total over heights greater than zero. Non-positive
//! heights are rejected when the species table is built, so callers never
//! pass them in.

/// Height of the reference observer all species are normalised against.
pub const REFERENCE_HEIGHT_M: f64 = 1.8;

const HEALTH_EXPONENT: f64 = 0.7;
const HEALTH_FLOOR: f64 = 0.1;
const DAMAGE_EXPONENT: f64 = 0.5;
const DAMAGE_FLOOR: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMultipliers {
    pub health: f64,
    pub damage: f64,
    pub juvenile_scale_factor: f64,
}

impl DerivedMultipliers {
    pub fn for_height(height_m: f64) -> Self {
        Self {
            health: derive_health(height_m),
            damage: derive_damage(height_m),
            juvenile_scale_factor: derive_juvenile_factor(height_m),
        }
    }
}

/// Health grows sub-linearly with body size.
pub fn derive_health(height_m: f64) -> f64 {
    (height_m / REFERENCE_HEIGHT_M)
        .powf(HEALTH_EXPONENT)
        .max(HEALTH_FLOOR)
}

pub fn derive_damage(height_m: f64) -> f64 {
    (height_m / REFERENCE_HEIGHT_M)
        .powf(DAMAGE_EXPONENT)
        .max(DAMAGE_FLOOR)
}

/// Fraction of the adult scale a juvenile of this size is drawn at.
pub fn derive_juvenile_factor(height_m: f64) -> f64 {
    if height_m < 0.1 {
        0.8
    } else if height_m < 0.5 {
        0.7
    } else if height_m < 1.0 {
        0.6
    } else if height_m < 2.0 {
        0.55
    } else {
        0.6
    }
}
