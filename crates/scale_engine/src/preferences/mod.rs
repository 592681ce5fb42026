mod persistence;
mod record;
mod store;

pub use persistence::{
    JsonPreferenceFile, PreferenceError, PreferencePersistence, PREFERENCES_FILE_NAME,
};
pub use record::{
    default_enabled_categories, InvalidPreference, ObserverId, PreferenceRecord, ScalingMode,
    StoredPreference, PERSONAL_MULTIPLIER_MAX, PERSONAL_MULTIPLIER_MIN,
};
pub use store::PreferenceStore;
