use super::{SettingKey, SettingsSnapshot, SettingsStore};
use crate::config::SettingsConfig;
use crate::error::Result;
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::debug;

/// In-process settings store backed by watch channels
pub struct LocalSettingsStore {
    channels: HashMap<SettingKey, watch::Sender<Option<String>>>,
}

impl LocalSettingsStore {
    /// Create a store with every setting absent
    pub fn new() -> Self {
        Self::from_config(&SettingsConfig::default())
    }

    /// Create a store seeded from the `[settings]` configuration section
    pub fn from_config(config: &SettingsConfig) -> Self {
        let initial = SettingsSnapshot {
            scenarios_directory: config.scenarios_directory.clone(),
            gridpath_database: config.gridpath_database.clone(),
            python_environment: config.python_environment.clone(),
        };

        let channels = SettingKey::ALL
            .into_iter()
            .map(|key| {
                let (sender, _) = watch::channel(initial.get(key).map(str::to_string));
                (key, sender)
            })
            .collect();

        Self { channels }
    }

    /// Update a setting and notify subscribers
    pub fn set(&self, key: SettingKey, value: Option<String>) {
        debug!("Setting '{}' changed to {:?}", key, value);
        if let Some(sender) = self.channels.get(&key) {
            sender.send_replace(value);
        }
    }

    pub fn get(&self, key: SettingKey) -> Option<String> {
        self.channels
            .get(&key)
            .and_then(|sender| sender.borrow().clone())
    }

    /// Number of live subscriptions to `key`
    pub fn subscriber_count(&self, key: SettingKey) -> usize {
        self.channels
            .get(&key)
            .map_or(0, |sender| sender.receiver_count())
    }

    pub(crate) fn current_snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            scenarios_directory: self.get(SettingKey::ScenariosDirectory),
            gridpath_database: self.get(SettingKey::GridpathDatabase),
            python_environment: self.get(SettingKey::PythonEnvironment),
        }
    }
}

impl Default for LocalSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SettingsStore for LocalSettingsStore {
    fn subscribe(&self, key: SettingKey) -> watch::Receiver<Option<String>> {
        match self.channels.get(&key) {
            Some(sender) => sender.subscribe(),
            // Every key is created in from_config
            None => watch::channel(None).1,
        }
    }

    async fn snapshot(&self) -> Result<SettingsSnapshot> {
        Ok(self.current_snapshot())
    }
}
