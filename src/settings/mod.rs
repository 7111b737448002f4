//! Settings-derived statuses.
//!
//! The settings store is an external collaborator that pushes every change
//! of the three dashboard-relevant settings and answers one-shot snapshot
//! requests. [`SettingsStatusBridge`] relays both into the view model.

use crate::error::Result;
use crate::status::SlotName;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

pub mod bridge;
pub mod local;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(test)]
mod tests;

pub use bridge::{BridgeHandle, SettingsStatusBridge, SnapshotReconciler};
pub use local::LocalSettingsStore;

/// Settings tracked by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    ScenariosDirectory,
    GridpathDatabase,
    PythonEnvironment,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [
        SettingKey::ScenariosDirectory,
        SettingKey::GridpathDatabase,
        SettingKey::PythonEnvironment,
    ];

    /// View-model slot fed by this setting
    pub fn slot(&self) -> SlotName {
        match self {
            SettingKey::ScenariosDirectory => SlotName::ScenariosDirectory,
            SettingKey::GridpathDatabase => SlotName::GridpathDatabase,
            SettingKey::PythonEnvironment => SlotName::PythonEnvironment,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot().as_str())
    }
}

/// Point-in-time read of all three settings; `None` means absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub scenarios_directory: Option<String>,
    pub gridpath_database: Option<String>,
    pub python_environment: Option<String>,
}

impl SettingsSnapshot {
    pub fn get(&self, key: SettingKey) -> Option<&str> {
        match key {
            SettingKey::ScenariosDirectory => self.scenarios_directory.as_deref(),
            SettingKey::GridpathDatabase => self.gridpath_database.as_deref(),
            SettingKey::PythonEnvironment => self.python_environment.as_deref(),
        }
    }

    /// Keys the snapshot reports as absent
    pub fn absent_keys(&self) -> Vec<SettingKey> {
        SettingKey::ALL
            .into_iter()
            .filter(|key| self.get(*key).is_none())
            .collect()
    }
}

/// External settings store
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// Live channel for `key`.
    ///
    /// The receiver holds the current value and changes on every update;
    /// `None` is the absent marker.
    fn subscribe(&self, key: SettingKey) -> watch::Receiver<Option<String>>;

    /// One-shot read of every setting
    async fn snapshot(&self) -> Result<SettingsSnapshot>;
}
