use std::sync::Arc;

use thiserror::Error;

use crate::species::SpeciesProfile;

/// Result of one resolution. Never mutated; a re-resolution publishes a new
/// value in its place.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScale {
    pub final_scale_factor: f64,
    pub health_multiplier: f64,
    pub damage_multiplier: f64,
    pub speed_multiplier: f64,
    pub source_profile: Arc<SpeciesProfile>,
    pub is_juvenile: bool,
    /// Set when an observer preference switched scaling off for this
    /// creature. Appliers restore unscaled attributes instead of multiplying.
    pub cancelled: bool,
}

/// Per-attribute multipliers, `None` where the kind lacks the attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeAdjustments {
    pub health: Option<f64>,
    pub damage: Option<f64>,
    pub speed: Option<f64>,
}

impl ResolvedScale {
    pub fn reverts_to_unscaled(&self) -> bool {
        self.cancelled
    }

    pub fn is_scaled(&self) -> bool {
        !self.cancelled && self.final_scale_factor != 1.0
    }

    pub fn adjustments(&self) -> AttributeAdjustments {
        let capabilities = self.source_profile.capabilities;
        let neutral = self.cancelled;
        let pick = |present: bool, value: f64| {
            present.then_some(if neutral { 1.0 } else { value })
        };
        AttributeAdjustments {
            health: pick(capabilities.health, self.health_multiplier),
            damage: pick(capabilities.damage, self.damage_multiplier),
            speed: pick(capabilities.speed, self.speed_multiplier),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ScalingDisabled,
    WorldDisabled,
    MissingProfile,
    KindDisabled,
    CategoryDisabled,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("resolution for {kind} produced non-finite {field}: {value}")]
pub struct InvalidResultError {
    pub kind: String,
    pub field: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Arc<ResolvedScale>),
    Skipped(SkipReason),
    Vetoed { reason: String },
    InvalidResult(InvalidResultError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(&self) -> Option<&Arc<ResolvedScale>> {
        match self {
            Outcome::Applied(scale) => Some(scale),
            _ => None,
        }
    }
}

/// Tally of a bulk re-resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub considered: usize,
    pub applied: usize,
    pub skipped: usize,
    pub vetoed: usize,
    pub invalid: usize,
}

impl ResolveSummary {
    pub(crate) fn record(&mut self, outcome: &Outcome) {
        self.considered += 1;
        match outcome {
            Outcome::Applied(_) => self.applied += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Vetoed { .. } => self.vetoed += 1,
            Outcome::InvalidResult(_) => self.invalid += 1,
        }
    }
}
