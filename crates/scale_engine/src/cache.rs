use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::resolve::{CreatureId, ResolvedScale};
use crate::sync::{read_recovering, write_recovering, PoisonWarning};

struct CacheShared {
    entries: RwLock<HashMap<CreatureId, Arc<ResolvedScale>>>,
    poison: PoisonWarning,
}

/// Latest resolved scale per live creature.
///
/// The cache has exactly one writer: this type is not `Clone`, and the engine
/// owns it. Any number of [`ScaleCacheReader`] handles may read concurrently;
/// each read returns a whole `Arc<ResolvedScale>` or nothing.
pub struct EntityScaleCache {
    shared: Arc<CacheShared>,
}

/// Read-only handle for presentation code and other threads.
#[derive(Clone)]
pub struct ScaleCacheReader {
    shared: Arc<CacheShared>,
}

impl Default for EntityScaleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityScaleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityScaleCache")
            .field("count", &self.count())
            .finish()
    }
}

impl std::fmt::Debug for ScaleCacheReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleCacheReader")
            .field("count", &self.count())
            .finish()
    }
}

impl EntityScaleCache {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(CacheShared {
                entries: RwLock::new(HashMap::new()),
                poison: PoisonWarning::new("entity_scale_cache"),
            }),
        }
    }

    pub fn reader(&self) -> ScaleCacheReader {
        ScaleCacheReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Replaces any previous entry; returns it.
    pub(crate) fn put(
        &mut self,
        creature: CreatureId,
        scale: Arc<ResolvedScale>,
    ) -> Option<Arc<ResolvedScale>> {
        write_recovering(&self.shared.entries, &self.shared.poison).insert(creature, scale)
    }

    pub(crate) fn evict(&mut self, creature: CreatureId) -> Option<Arc<ResolvedScale>> {
        write_recovering(&self.shared.entries, &self.shared.poison).remove(&creature)
    }

    /// Drops every entry whose creature is no longer live. Returns how many
    /// entries went away.
    pub(crate) fn retain_live<F>(&mut self, mut is_live: F) -> usize
    where
        F: FnMut(CreatureId) -> bool,
    {
        let mut entries = write_recovering(&self.shared.entries, &self.shared.poison);
        let before = entries.len();
        entries.retain(|creature, _| is_live(*creature));
        before - entries.len()
    }

    pub fn get(&self, creature: CreatureId) -> Option<Arc<ResolvedScale>> {
        self.shared.get(creature)
    }

    pub fn count(&self) -> usize {
        self.shared.count()
    }
}

impl ScaleCacheReader {
    pub fn get(&self, creature: CreatureId) -> Option<Arc<ResolvedScale>> {
        self.shared.get(creature)
    }

    pub fn contains(&self, creature: CreatureId) -> bool {
        read_recovering(&self.shared.entries, &self.shared.poison).contains_key(&creature)
    }

    pub fn count(&self) -> usize {
        self.shared.count()
    }

    /// Point-in-time copy, sorted by creature id.
    pub fn snapshot(&self) -> Vec<(CreatureId, Arc<ResolvedScale>)> {
        let mut entries = read_recovering(&self.shared.entries, &self.shared.poison)
            .iter()
            .map(|(creature, scale)| (*creature, Arc::clone(scale)))
            .collect::<Vec<_>>();
        entries.sort_by_key(|(creature, _)| *creature);
        entries
    }
}

impl CacheShared {
    fn get(&self, creature: CreatureId) -> Option<Arc<ResolvedScale>> {
        read_recovering(&self.entries, &self.poison)
            .get(&creature)
            .cloned()
    }

    fn count(&self) -> usize {
        read_recovering(&self.entries, &self.poison).len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::species::SpeciesTable;

    fn scale(factor: f64) -> Arc<ResolvedScale> {
        let table = SpeciesTable::builtin();
        let profile = table.lookup("COW").expect("cow").clone();
        // health mirrors the factor so a torn read would show up as a mismatch
        Arc::new(ResolvedScale {
            final_scale_factor: factor,
            health_multiplier: factor * 2.0,
            damage_multiplier: factor * 3.0,
            speed_multiplier: 1.0,
            source_profile: profile,
            is_juvenile: false,
            cancelled: false,
        })
    }

    #[test]
    fn put_replaces_and_evict_removes() {
        let mut cache = EntityScaleCache::new();
        let reader = cache.reader();
        assert!(cache.put(CreatureId(1), scale(1.0)).is_none());
        let previous = cache.put(CreatureId(1), scale(1.5)).expect("replaced");
        assert_eq!(previous.final_scale_factor, 1.0);
        assert_eq!(
            reader.get(CreatureId(1)).expect("entry").final_scale_factor,
            1.5
        );

        assert!(cache.evict(CreatureId(1)).is_some());
        assert!(reader.get(CreatureId(1)).is_none());
        assert!(cache.evict(CreatureId(1)).is_none());
    }

    #[test]
    fn retain_live_prunes_only_dead_entries() {
        let mut cache = EntityScaleCache::new();
        for id in 0..6 {
            cache.put(CreatureId(id), scale(1.0));
        }
        let pruned = cache.retain_live(|creature| creature.0 % 2 == 0);
        assert_eq!(pruned, 3);
        assert_eq!(cache.count(), 3);
        let ids = cache
            .reader()
            .snapshot()
            .into_iter()
            .map(|(creature, _)| creature.0)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 2, 4]);
    }

    #[test]
    fn readers_never_observe_partial_entries() {
        let mut cache = EntityScaleCache::new();
        cache.put(CreatureId(7), scale(1.0));

        thread::scope(|scope| {
            for _ in 0..4 {
                let reader = cache.reader();
                scope.spawn(move || {
                    for _ in 0..1_000 {
                        if let Some(entry) = reader.get(CreatureId(7)) {
                            assert_eq!(entry.health_multiplier, entry.final_scale_factor * 2.0);
                            assert_eq!(entry.damage_multiplier, entry.final_scale_factor * 3.0);
                        }
                    }
                });
            }
            for step in 0..500 {
                if step % 7 == 0 {
                    cache.evict(CreatureId(7));
                } else {
                    cache.put(CreatureId(7), scale(1.0 + f64::from(step % 5) * 0.25));
                }
            }
        });
    }
}
