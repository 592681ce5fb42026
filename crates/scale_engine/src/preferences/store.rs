use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::species::Category;
use crate::sync::{read_recovering, write_recovering, PoisonWarning};

use super::persistence::{PreferenceError, PreferencePersistence};
use super::record::{clamp_personal_multiplier, ObserverId, PreferenceRecord, ScalingMode};

struct StoreShared {
    records: RwLock<HashMap<ObserverId, Arc<PreferenceRecord>>>,
    persistence: Option<Box<dyn PreferencePersistence>>,
    poison: PoisonWarning,
}

/// Shared handle to every observer's preferences.
///
/// Records are immutable `Arc`s; a mutation builds a new record and swaps it
/// in, so concurrent readers see either the old or the new record whole.
#[derive(Clone)]
pub struct PreferenceStore {
    shared: Arc<StoreShared>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("count", &self.count())
            .field("persistent", &self.shared.persistence.is_some())
            .finish()
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PreferenceStore {
    pub fn in_memory() -> Self {
        Self::with_records(HashMap::new(), None)
    }

    /// Loads every stored record. Malformed records fall back to defaults.
    pub fn open(persistence: Box<dyn PreferencePersistence>) -> Result<Self, PreferenceError> {
        let stored = persistence.load()?;
        let mut records = HashMap::with_capacity(stored.len());
        for (observer, raw) in stored {
            let record = match PreferenceRecord::from_stored(observer, &raw) {
                Ok(record) => record,
                Err(error) => {
                    warn!(
                        observer = observer.0,
                        field = error.field,
                        value = %error.value,
                        "preference_invalid_fallback"
                    );
                    PreferenceRecord::new(observer)
                }
            };
            records.insert(observer, Arc::new(record));
        }
        info!(observer_count = records.len(), "preferences_loaded");
        Ok(Self::with_records(records, Some(persistence)))
    }

    fn with_records(
        records: HashMap<ObserverId, Arc<PreferenceRecord>>,
        persistence: Option<Box<dyn PreferencePersistence>>,
    ) -> Self {
        Self {
            shared: Arc::new(StoreShared {
                records: RwLock::new(records),
                persistence,
                poison: PoisonWarning::new("preference_store"),
            }),
        }
    }

    pub fn get(&self, observer: ObserverId) -> Option<Arc<PreferenceRecord>> {
        read_recovering(&self.shared.records, &self.shared.poison)
            .get(&observer)
            .cloned()
    }

    pub fn get_or_create(&self, observer: ObserverId) -> Arc<PreferenceRecord> {
        if let Some(record) = self.get(observer) {
            return record;
        }
        write_recovering(&self.shared.records, &self.shared.poison)
            .entry(observer)
            .or_insert_with(|| Arc::new(PreferenceRecord::new(observer)))
            .clone()
    }

    pub fn effective_multiplier(&self, observer: ObserverId, category: Category) -> f64 {
        self.get_or_create(observer).effective_multiplier(category)
    }

    pub fn count(&self) -> usize {
        read_recovering(&self.shared.records, &self.shared.poison).len()
    }

    pub fn toggle_enabled(
        &self,
        observer: ObserverId,
    ) -> Result<Arc<PreferenceRecord>, PreferenceError> {
        self.update(observer, |record| record.enabled = !record.enabled)
    }

    pub fn set_mode(
        &self,
        observer: ObserverId,
        mode: ScalingMode,
    ) -> Result<Arc<PreferenceRecord>, PreferenceError> {
        self.update(observer, |record| record.mode = mode)
    }

    /// Stores the multiplier clamped into the allowed personal range.
    pub fn set_personal_multiplier(
        &self,
        observer: ObserverId,
        multiplier: f64,
    ) -> Result<Arc<PreferenceRecord>, PreferenceError> {
        let clamped = if multiplier.is_finite() {
            clamp_personal_multiplier(multiplier)
        } else {
            1.0
        };
        if clamped != multiplier {
            warn!(
                observer = observer.0,
                requested = multiplier,
                stored = clamped,
                "preference_multiplier_clamped"
            );
        }
        self.update(observer, |record| record.personal_multiplier = clamped)
    }

    pub fn toggle_category(
        &self,
        observer: ObserverId,
        category: Category,
    ) -> Result<Arc<PreferenceRecord>, PreferenceError> {
        self.update(observer, |record| {
            if record.enabled_categories.contains(category) {
                record.enabled_categories.remove(category);
            } else {
                record.enabled_categories.insert(category);
            }
        })
    }

    pub fn set_show_scaling_info(
        &self,
        observer: ObserverId,
        show: bool,
    ) -> Result<Arc<PreferenceRecord>, PreferenceError> {
        self.update(observer, |record| record.show_scaling_info = show)
    }

    pub fn reset(&self, observer: ObserverId) -> Result<Arc<PreferenceRecord>, PreferenceError> {
        self.update(observer, |record| *record = PreferenceRecord::new(observer))
    }

    pub fn clear_all(&self) -> Result<(), PreferenceError> {
        write_recovering(&self.shared.records, &self.shared.poison).clear();
        self.persist()
    }

    /// Applies `change` to a copy of the current record and publishes it. The
    /// new record is live even when persisting it fails.
    fn update<F>(
        &self,
        observer: ObserverId,
        change: F,
    ) -> Result<Arc<PreferenceRecord>, PreferenceError>
    where
        F: FnOnce(&mut PreferenceRecord),
    {
        let updated = {
            let mut records = write_recovering(&self.shared.records, &self.shared.poison);
            let mut next = records
                .get(&observer)
                .map(|record| record.as_ref().clone())
                .unwrap_or_else(|| PreferenceRecord::new(observer));
            change(&mut next);
            let next = Arc::new(next);
            records.insert(observer, Arc::clone(&next));
            next
        };
        self.persist()?;
        Ok(updated)
    }

    fn persist(&self) -> Result<(), PreferenceError> {
        let Some(persistence) = self.shared.persistence.as_ref() else {
            return Ok(());
        };
        let mut snapshot = read_recovering(&self.shared.records, &self.shared.poison)
            .values()
            .map(|record| (record.observer, record.to_stored()))
            .collect::<Vec<_>>();
        snapshot.sort_by_key(|(observer, _)| *observer);
        persistence.save(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use super::super::persistence::JsonPreferenceFile;
    use super::super::record::StoredPreference;
    use super::*;

    #[derive(Default)]
    struct RecordingPersistence {
        initial: Vec<(ObserverId, StoredPreference)>,
        saves: Mutex<Vec<Vec<(ObserverId, StoredPreference)>>>,
    }

    impl PreferencePersistence for Arc<RecordingPersistence> {
        fn load(&self) -> Result<Vec<(ObserverId, StoredPreference)>, PreferenceError> {
            Ok(self.initial.clone())
        }

        fn save(&self, records: &[(ObserverId, StoredPreference)]) -> Result<(), PreferenceError> {
            self.saves.lock().expect("saves").push(records.to_vec());
            Ok(())
        }
    }

    #[test]
    fn first_query_creates_default_record() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.count(), 0);
        let record = store.get_or_create(ObserverId(1));
        assert_eq!(record.mode, ScalingMode::Global);
        assert_eq!(store.count(), 1);
        assert_eq!(store.effective_multiplier(ObserverId(1), Category::Animals), 1.0);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let backend = Arc::new(RecordingPersistence::default());
        let store = PreferenceStore::open(Box::new(Arc::clone(&backend))).expect("open");

        store.set_mode(ObserverId(4), ScalingMode::ByCategory).expect("mode");
        store
            .toggle_category(ObserverId(4), Category::Animals)
            .expect("toggle");

        let saves = backend.saves.lock().expect("saves");
        assert_eq!(saves.len(), 2);
        let last = &saves[1][0].1;
        assert_eq!(last.scaling_mode, "BY_CATEGORY");
        assert!(!last.categories_enabled.contains(&"animals".to_string()));
    }

    #[test]
    fn invalid_stored_record_falls_back_to_default() {
        let backend = Arc::new(RecordingPersistence {
            initial: vec![(
                ObserverId(8),
                StoredPreference {
                    scaling_mode: "???".to_string(),
                    personal_scale_multiplier: 3.0,
                    ..StoredPreference::default()
                },
            )],
            ..RecordingPersistence::default()
        });
        let store = PreferenceStore::open(Box::new(backend)).expect("open");
        let record = store.get(ObserverId(8)).expect("record kept");
        assert_eq!(*record, PreferenceRecord::new(ObserverId(8)));
    }

    #[test]
    fn personal_multiplier_is_clamped() {
        let store = PreferenceStore::in_memory();
        let record = store
            .set_personal_multiplier(ObserverId(2), 12.0)
            .expect("set");
        assert_eq!(record.personal_multiplier, 5.0);
        let record = store
            .set_personal_multiplier(ObserverId(2), 0.0)
            .expect("set");
        assert_eq!(record.personal_multiplier, 0.1);
    }

    #[test]
    fn toggles_flip_state() {
        let store = PreferenceStore::in_memory();
        assert!(!store.toggle_enabled(ObserverId(3)).expect("off").enabled);
        assert!(store.toggle_enabled(ObserverId(3)).expect("on").enabled);
        let record = store
            .toggle_category(ObserverId(3), Category::Other)
            .expect("toggle");
        assert!(!record.enabled_categories.contains(Category::Other));
        let record = store.reset(ObserverId(3)).expect("reset");
        assert_eq!(*record, PreferenceRecord::new(ObserverId(3)));
    }

    #[test]
    fn records_survive_reopen_through_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        {
            let store =
                PreferenceStore::open(Box::new(JsonPreferenceFile::new(&path))).expect("open");
            store
                .set_personal_multiplier(ObserverId(11), 2.0)
                .expect("set");
            store
                .set_show_scaling_info(ObserverId(11), true)
                .expect("show");
        }
        let reopened =
            PreferenceStore::open(Box::new(JsonPreferenceFile::new(&path))).expect("reopen");
        let record = reopened.get(ObserverId(11)).expect("persisted");
        assert_eq!(record.personal_multiplier, 2.0);
        assert!(record.show_scaling_info);
    }

    #[test]
    fn concurrent_readers_see_whole_records() {
        let store = PreferenceStore::in_memory();
        store
            .set_personal_multiplier(ObserverId(1), 1.0)
            .expect("seed");

        thread::scope(|scope| {
            for _ in 0..4 {
                let reader = store.clone();
                scope.spawn(move || {
                    for _ in 0..500 {
                        let record = reader.get_or_create(ObserverId(1));
                        let expected_show = record.personal_multiplier >= 2.0;
                        assert_eq!(record.show_scaling_info, expected_show);
                    }
                });
            }
            for step in 0..200 {
                let multiplier = if step % 2 == 0 { 2.0 } else { 1.0 };
                store
                    .update(ObserverId(1), |record| {
                        record.personal_multiplier = multiplier;
                        record.show_scaling_info = multiplier >= 2.0;
                    })
                    .expect("update");
            }
        });
    }
}
