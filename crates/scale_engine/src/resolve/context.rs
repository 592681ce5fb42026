use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId(pub u64);

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "creature#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeStage {
    Juvenile,
    Adult,
}

impl LifeStage {
    pub fn is_juvenile(self) -> bool {
        self == LifeStage::Juvenile
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// What the engine needs to know about a live creature. Every accessor is
/// read at resolution time; nothing is remembered between resolutions.
pub trait CreatureView {
    fn id(&self) -> CreatureId;
    /// Upper snake case species kind, e.g. `POLAR_BEAR`.
    fn kind(&self) -> &str;
    fn life_stage(&self) -> LifeStage;
    /// Biome or region tag of the creature's current location.
    fn environment(&self) -> &str;
    fn world(&self) -> &str;
    fn position(&self) -> Position;
}

/// Which creatures a bulk re-resolution touches.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSelector {
    All,
    World(String),
    Radius {
        world: String,
        center: Position,
        radius: f64,
    },
}

impl RegionSelector {
    pub fn contains<C: CreatureView + ?Sized>(&self, creature: &C) -> bool {
        match self {
            RegionSelector::All => true,
            RegionSelector::World(world) => creature.world() == world,
            RegionSelector::Radius {
                world,
                center,
                radius,
            } => {
                *radius > 0.0
                    && creature.world() == world
                    && creature.position().distance_squared(center) <= radius * radius
            }
        }
    }
}
