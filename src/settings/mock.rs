use super::{LocalSettingsStore, SettingKey, SettingsSnapshot, SettingsStore};
use crate::error::{Result, StatusboardError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Settings store with a controllable snapshot round-trip
pub(crate) struct MockSettingsStore {
    local: LocalSettingsStore,
    snapshot_override: Mutex<Option<SettingsSnapshot>>,
    snapshot_latency: Mutex<Duration>,
    snapshot_error: Mutex<Option<String>>,
    snapshot_calls: AtomicUsize,
}

impl MockSettingsStore {
    pub(crate) fn new() -> Self {
        Self {
            local: LocalSettingsStore::new(),
            snapshot_override: Mutex::new(None),
            snapshot_latency: Mutex::new(Duration::ZERO),
            snapshot_error: Mutex::new(None),
            snapshot_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set(&self, key: SettingKey, value: Option<&str>) {
        self.local.set(key, value.map(str::to_string));
    }

    /// Answer snapshots with `snapshot` instead of the live values
    pub(crate) fn set_snapshot(&self, snapshot: SettingsSnapshot) {
        *self.snapshot_override.lock() = Some(snapshot);
    }

    pub(crate) fn set_snapshot_latency(&self, latency: Duration) {
        *self.snapshot_latency.lock() = latency;
    }

    pub(crate) fn fail_snapshot(&self, message: &str) {
        *self.snapshot_error.lock() = Some(message.to_string());
    }

    pub(crate) fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn subscriber_count(&self, key: SettingKey) -> usize {
        self.local.subscriber_count(key)
    }
}

#[async_trait::async_trait]
impl SettingsStore for MockSettingsStore {
    fn subscribe(&self, key: SettingKey) -> watch::Receiver<Option<String>> {
        self.local.subscribe(key)
    }

    async fn snapshot(&self) -> Result<SettingsSnapshot> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.snapshot_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = self.snapshot_error.lock().clone() {
            return Err(StatusboardError::settings(message));
        }

        let snapshot = self.snapshot_override.lock().clone();
        Ok(snapshot.unwrap_or_else(|| self.local.current_snapshot()))
    }
}
