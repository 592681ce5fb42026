use std::collections::BTreeMap;

use scale_engine::{CreatureId, CreatureView, LifeStage, Position};

/// A creature as the host simulation tracks it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimCreature {
    pub(crate) id: CreatureId,
    pub(crate) kind: String,
    pub(crate) stage: LifeStage,
    pub(crate) environment: String,
    pub(crate) world: String,
    pub(crate) position: Position,
}

impl CreatureView for SimCreature {
    fn id(&self) -> CreatureId {
        self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn life_stage(&self) -> LifeStage {
        self.stage
    }

    fn environment(&self) -> &str {
        &self.environment
    }

    fn world(&self) -> &str {
        &self.world
    }

    fn position(&self) -> Position {
        self.position
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SpawnSpec<'a> {
    pub(crate) kind: &'a str,
    pub(crate) stage: LifeStage,
    pub(crate) environment: &'a str,
    pub(crate) world: &'a str,
    pub(crate) position: Position,
}

#[derive(Debug, Default)]
pub(crate) struct SimWorld {
    creatures: BTreeMap<CreatureId, SimCreature>,
    next_id: u64,
}

impl SimWorld {
    pub(crate) fn spawn(&mut self, spec: SpawnSpec<'_>) -> CreatureId {
        self.next_id += 1;
        let id = CreatureId(self.next_id);
        self.creatures.insert(
            id,
            SimCreature {
                id,
                kind: spec.kind.to_ascii_uppercase(),
                stage: spec.stage,
                environment: spec.environment.to_string(),
                world: spec.world.to_string(),
                position: spec.position,
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: CreatureId) -> Option<SimCreature> {
        self.creatures.remove(&id)
    }

    /// Juvenile to adult. Returns false when the creature is gone or
    /// already grown.
    pub(crate) fn grow_up(&mut self, id: CreatureId) -> bool {
        match self.creatures.get_mut(&id) {
            Some(creature) if creature.stage == LifeStage::Juvenile => {
                creature.stage = LifeStage::Adult;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn relocate(&mut self, id: CreatureId, environment: &str, position: Position) -> bool {
        let Some(creature) = self.creatures.get_mut(&id) else {
            return false;
        };
        creature.environment = environment.to_string();
        creature.position = position;
        true
    }

    pub(crate) fn get(&self, id: CreatureId) -> Option<&SimCreature> {
        self.creatures.get(&id)
    }

    pub(crate) fn is_live(&self, id: CreatureId) -> bool {
        self.creatures.contains_key(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &SimCreature> {
        self.creatures.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.creatures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: &str, stage: LifeStage) -> SpawnSpec<'_> {
        SpawnSpec {
            kind,
            stage,
            environment: "PLAINS",
            world: "world",
            position: Position::default(),
        }
    }

    #[test]
    fn spawn_assigns_fresh_ids_and_uppercases_kind() {
        let mut world = SimWorld::default();
        let a = world.spawn(spec("cow", LifeStage::Adult));
        let b = world.spawn(spec("pig", LifeStage::Adult));
        assert_ne!(a, b);
        assert_eq!(world.get(a).expect("cow").kind, "COW");
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn grow_up_only_applies_to_juveniles() {
        let mut world = SimWorld::default();
        let calf = world.spawn(spec("COW", LifeStage::Juvenile));
        assert!(world.grow_up(calf));
        assert!(!world.grow_up(calf));
        assert_eq!(world.get(calf).expect("cow").stage, LifeStage::Adult);
    }

    #[test]
    fn removed_creatures_are_no_longer_live() {
        let mut world = SimWorld::default();
        let id = world.spawn(spec("COW", LifeStage::Adult));
        assert!(world.remove(id).is_some());
        assert!(!world.is_live(id));
        assert!(!world.relocate(id, "DESERT", Position::default()));
    }
}
