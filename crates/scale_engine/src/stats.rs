use std::collections::BTreeSet;

use crate::cache::ScaleCacheReader;
use crate::config::WorldFilter;
use crate::resolve::CreatureView;

/// Counts over the creatures in enabled worlds at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalingStatistics {
    pub total_creatures: usize,
    pub scaled_creatures: usize,
    pub worlds_checked: usize,
}

impl ScalingStatistics {
    pub fn collect<'a, C, I>(creatures: I, worlds: &WorldFilter, cache: &ScaleCacheReader) -> Self
    where
        C: CreatureView + ?Sized + 'a,
        I: IntoIterator<Item = &'a C>,
    {
        let mut seen_worlds = BTreeSet::new();
        let mut stats = ScalingStatistics::default();
        for creature in creatures {
            if !worlds.is_world_enabled(creature.world()) {
                continue;
            }
            seen_worlds.insert(creature.world().to_string());
            stats.total_creatures += 1;
            if cache
                .get(creature.id())
                .is_some_and(|scale| scale.is_scaled())
            {
                stats.scaled_creatures += 1;
            }
        }
        stats.worlds_checked = seen_worlds.len();
        stats
    }

    pub fn scaled_percentage(&self) -> f64 {
        if self.total_creatures == 0 {
            return 0.0;
        }
        self.scaled_creatures as f64 * 100.0 / self.total_creatures as f64
    }
}
