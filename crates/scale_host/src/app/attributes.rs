use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use scale_engine::{AttributeApplier, CreatureId, ResolvedScale, SpeciesProfile};
use tracing::{debug, warn};

const BASE_MAX_HEALTH: f64 = 10.0;
const BASE_ATTACK_DAMAGE: f64 = 2.0;
const BASE_MOVEMENT_SPEED: f64 = 0.25;

/// Gameplay attributes of one creature. `None` means the creature does not
/// carry that attribute at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AttributeSheet {
    pub(crate) max_health: Option<f64>,
    pub(crate) attack_damage: Option<f64>,
    pub(crate) movement_speed: Option<f64>,
}

impl AttributeSheet {
    pub(crate) fn for_profile(profile: &SpeciesProfile) -> Self {
        let capabilities = profile.capabilities;
        Self {
            max_health: capabilities.health.then_some(BASE_MAX_HEALTH),
            attack_damage: capabilities.damage.then_some(BASE_ATTACK_DAMAGE),
            movement_speed: capabilities.speed.then_some(BASE_MOVEMENT_SPEED),
        }
    }

    fn scaled(&self, scale: &ResolvedScale) -> Self {
        let adjustments = scale.adjustments();
        let apply = |base: Option<f64>, multiplier: Option<f64>| match (base, multiplier) {
            (Some(base), Some(multiplier)) => Some(base * multiplier),
            (base, _) => base,
        };
        Self {
            max_health: apply(self.max_health, adjustments.health),
            attack_damage: apply(self.attack_damage, adjustments.damage),
            movement_speed: apply(self.movement_speed, adjustments.speed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CreatureAttributes {
    pub(crate) base: AttributeSheet,
    pub(crate) current: AttributeSheet,
}

/// Attribute storage shared between the tick loop and the engine's applier.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeBook {
    entries: Arc<Mutex<HashMap<CreatureId, CreatureAttributes>>>,
}

impl AttributeBook {
    pub(crate) fn register(&self, creature: CreatureId, base: AttributeSheet) {
        self.lock().insert(
            creature,
            CreatureAttributes {
                base,
                current: base,
            },
        );
    }

    pub(crate) fn forget(&self, creature: CreatureId) {
        self.lock().remove(&creature);
    }

    pub(crate) fn current(&self, creature: CreatureId) -> Option<AttributeSheet> {
        self.lock().get(&creature).map(|entry| entry.current)
    }

    pub(crate) fn applier(&self) -> AttributeSync {
        AttributeSync { book: self.clone() }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CreatureId, CreatureAttributes>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("attribute_book_poisoned; recovered inner value");
                poisoned.into_inner()
            }
        }
    }
}

/// Writes resolved multipliers onto the attribute book. Always recomputes
/// from the base sheet so repeated resolutions never compound.
#[derive(Debug, Clone)]
pub(crate) struct AttributeSync {
    book: AttributeBook,
}

impl AttributeApplier for AttributeSync {
    fn apply(&mut self, creature: CreatureId, scale: &ResolvedScale) {
        let mut entries = self.book.lock();
        let Some(entry) = entries.get_mut(&creature) else {
            debug!(creature = creature.0, "attributes_missing_creature");
            return;
        };
        entry.current = if scale.reverts_to_unscaled() {
            entry.base
        } else {
            entry.base.scaled(scale)
        };
        debug!(
            creature = creature.0,
            max_health = ?entry.current.max_health,
            attack_damage = ?entry.current.attack_damage,
            movement_speed = ?entry.current.movement_speed,
            "attributes_applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scale_engine::SpeciesTable;

    fn resolved(kind: &str, factor: f64, health: f64, damage: f64, speed: f64) -> ResolvedScale {
        let table = SpeciesTable::builtin();
        ResolvedScale {
            final_scale_factor: factor,
            health_multiplier: health,
            damage_multiplier: damage,
            speed_multiplier: speed,
            source_profile: table.lookup(kind).expect("profile").clone(),
            is_juvenile: false,
            cancelled: false,
        }
    }

    #[test]
    fn applies_only_attributes_the_kind_carries() {
        let book = AttributeBook::default();
        let scale = resolved("COW", 1.07, 0.9, 0.8, 0.8);
        book.register(CreatureId(1), AttributeSheet::for_profile(&scale.source_profile));

        book.applier().apply(CreatureId(1), &scale);
        let current = book.current(CreatureId(1)).expect("registered");
        assert_eq!(current.max_health, Some(BASE_MAX_HEALTH * 0.9));
        assert_eq!(current.attack_damage, None);
        assert_eq!(current.movement_speed, Some(BASE_MOVEMENT_SPEED * 0.8));
    }

    #[test]
    fn repeated_application_does_not_compound() {
        let book = AttributeBook::default();
        let scale = resolved("WOLF", 0.94, 2.0, 1.5, 1.1);
        book.register(CreatureId(2), AttributeSheet::for_profile(&scale.source_profile));
        let mut applier = book.applier();
        applier.apply(CreatureId(2), &scale);
        applier.apply(CreatureId(2), &scale);
        let current = book.current(CreatureId(2)).expect("registered");
        assert_eq!(current.max_health, Some(BASE_MAX_HEALTH * 2.0));
        assert_eq!(current.attack_damage, Some(BASE_ATTACK_DAMAGE * 1.5));
    }

    #[test]
    fn cancelled_scale_restores_base_attributes() {
        let book = AttributeBook::default();
        let scale = resolved("WOLF", 0.94, 2.0, 1.5, 1.1);
        let base = AttributeSheet::for_profile(&scale.source_profile);
        book.register(CreatureId(3), base);
        let mut applier = book.applier();
        applier.apply(CreatureId(3), &scale);

        let revert = ResolvedScale {
            final_scale_factor: 0.0,
            cancelled: true,
            ..scale
        };
        applier.apply(CreatureId(3), &revert);
        assert_eq!(book.current(CreatureId(3)), Some(base));
    }

    #[test]
    fn unknown_creature_is_ignored() {
        let book = AttributeBook::default();
        book.applier()
            .apply(CreatureId(9), &resolved("COW", 1.0, 1.0, 1.0, 1.0));
        assert!(book.current(CreatureId(9)).is_none());
    }
}
