use crate::models::UserSettings;
use skymarshal_common::error::SkymarshalError;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Loads, validates, and persists `UserSettings`. A missing or unreadable
/// file yields the defaults; saving is atomic (write-and-rename).
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: UserSettings,
}

impl SettingsManager {
    pub fn new(settings_file: PathBuf) -> Self {
        let settings = Self::load_from(&settings_file);
        SettingsManager {
            settings_file,
            settings,
        }
    }

    pub fn for_storage_root(storage_root: &Path) -> Self {
        Self::new(storage_root.join(SETTINGS_FILE_NAME))
    }

    fn load_from(path: &Path) -> UserSettings {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<UserSettings>(&bytes) {
                Ok(settings) => clamp(settings),
                Err(error) => {
                    tracing::warn!("settings file is unreadable, using defaults: {error}");
                    UserSettings::default()
                }
            },
            Err(_) => UserSettings::default(),
        }
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn update(&mut self, settings: UserSettings) -> Result<(), SkymarshalError> {
        self.settings = validate(settings)?;
        self.save()
    }

    pub fn save(&self) -> Result<(), SkymarshalError> {
        if let Some(parent) = self.settings_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.settings)?;
        let tmp = self.settings_file.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.settings_file)?;
        Ok(())
    }
}

/// Silent clamping for values read from disk.
fn clamp(mut settings: UserSettings) -> UserSettings {
    settings.records_page_size = settings.records_page_size.clamp(1, 100);
    settings.hydrate_batch_size = settings.hydrate_batch_size.clamp(1, 25);
    settings.category_workers = settings.category_workers.max(1);
    settings.network_workers = settings.network_workers.max(1);
    settings
}

/// Strict validation for values arriving from a settings editor.
fn validate(settings: UserSettings) -> Result<UserSettings, SkymarshalError> {
    if settings.records_page_size == 0 || settings.records_page_size > 100 {
        return Err(SkymarshalError::Validation(
            "records_page_size must be between 1 and 100".to_string(),
        ));
    }
    if settings.hydrate_batch_size == 0 || settings.hydrate_batch_size > 25 {
        return Err(SkymarshalError::Validation(
            "hydrate_batch_size must be between 1 and 25".to_string(),
        ));
    }
    if settings.category_workers == 0 {
        return Err(SkymarshalError::Validation(
            "category_workers must be at least 1".to_string(),
        ));
    }
    let valid = ["posts", "likes", "reposts"];
    let categories: Vec<String> = settings
        .default_categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| valid.contains(&c.as_str()))
        .collect();
    let mut settings = settings;
    settings.default_categories = if categories.is_empty() {
        valid.iter().map(|c| c.to_string()).collect()
    } else {
        categories
    };
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::for_storage_root(dir.path());
        assert_eq!(manager.settings().records_page_size, 100);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = SettingsManager::for_storage_root(dir.path());
        let mut settings = manager.settings().clone();
        settings.download_limit_default = 1234;
        settings.use_subject_engagement_for_reposts = true;
        manager.update(settings).unwrap();

        let reloaded = SettingsManager::for_storage_root(dir.path());
        assert_eq!(reloaded.settings().download_limit_default, 1234);
        assert!(reloaded.settings().use_subject_engagement_for_reposts);
    }

    #[test]
    fn test_update_rejects_out_of_range_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = SettingsManager::for_storage_root(dir.path());
        let mut settings = manager.settings().clone();
        settings.records_page_size = 500;
        assert!(manager.update(settings).is_err());
    }

    #[test]
    fn test_invalid_categories_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = SettingsManager::for_storage_root(dir.path());
        let mut settings = manager.settings().clone();
        settings.default_categories = vec!["blocks".to_string()];
        manager.update(settings).unwrap();
        assert_eq!(
            manager.settings().default_categories,
            vec!["posts", "likes", "reposts"]
        );
    }

    #[test]
    fn test_clamp_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "{\"records_page_size\":9999,\"hydrate_batch_size\":0}").unwrap();
        let manager = SettingsManager::new(path);
        assert_eq!(manager.settings().records_page_size, 100);
        assert_eq!(manager.settings().hydrate_batch_size, 1);
    }
}
