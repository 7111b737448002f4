use super::mock::MockSettingsStore;
use super::*;
use crate::lifecycle::{ActivationGate, SlotWriter};
use crate::status::Status;
use crate::view_model::AggregatorViewModel;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn subscribe(
    store: &MockSettingsStore,
    key: SettingKey,
) -> (Arc<AggregatorViewModel>, BridgeHandle) {
    let view_model = Arc::new(AggregatorViewModel::new());
    let writer = SlotWriter::new(key.slot(), Arc::clone(&view_model), ActivationGate::new());
    let handle = SettingsStatusBridge::subscribe(store, key, writer);
    (view_model, handle)
}

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_current_value_relayed_on_subscribe() {
    let store = MockSettingsStore::new();
    store.set(SettingKey::ScenariosDirectory, Some("/srv/scenarios"));

    let (view_model, handle) = subscribe(&store, SettingKey::ScenariosDirectory);
    settle().await;

    assert_eq!(
        view_model.get(SlotName::ScenariosDirectory),
        Some(Status::label("/srv/scenarios"))
    );
    assert!(handle.is_live());
    handle.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_changes_are_relayed_in_order() {
    let store = MockSettingsStore::new();
    let (view_model, handle) = subscribe(&store, SettingKey::GridpathDatabase);
    settle().await;
    assert!(view_model.get(SlotName::GridpathDatabase).is_none());

    store.set(SettingKey::GridpathDatabase, Some("/data/io.db"));
    settle().await;
    assert_eq!(
        view_model.get(SlotName::GridpathDatabase),
        Some(Status::label("/data/io.db"))
    );

    store.set(SettingKey::GridpathDatabase, Some("/data/test.db"));
    settle().await;
    assert_eq!(
        view_model.get(SlotName::GridpathDatabase),
        Some(Status::label("/data/test.db"))
    );

    // Other slots are never touched
    assert!(view_model.get(SlotName::ScenariosDirectory).is_none());
    handle.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_absent_snapshot_writes_not_set() {
    let store = MockSettingsStore::new();
    let (view_model, handle) = subscribe(&store, SettingKey::PythonEnvironment);
    settle().await;
    assert!(view_model.get(SlotName::PythonEnvironment).is_none());

    handle.reconciler().reconcile(&SettingsSnapshot::default());
    settle().await;

    assert_eq!(
        view_model.get(SlotName::PythonEnvironment),
        Some(Status::not_set())
    );
    handle.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_push_after_snapshot_wins() {
    let store = MockSettingsStore::new();
    let (view_model, handle) = subscribe(&store, SettingKey::PythonEnvironment);

    handle.reconciler().reconcile(&SettingsSnapshot::default());
    settle().await;
    assert_eq!(
        view_model.get(SlotName::PythonEnvironment),
        Some(Status::not_set())
    );

    store.set(SettingKey::PythonEnvironment, Some("/opt/gridpath-env"));
    settle().await;
    assert_eq!(
        view_model.get(SlotName::PythonEnvironment),
        Some(Status::label("/opt/gridpath-env"))
    );
    handle.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_stale_absent_snapshot_does_not_override_pushed_value() {
    let store = MockSettingsStore::new();
    let (view_model, handle) = subscribe(&store, SettingKey::ScenariosDirectory);

    store.set(SettingKey::ScenariosDirectory, Some("/srv/scenarios"));
    settle().await;

    // Snapshot taken before the push resolves afterwards
    handle.reconciler().reconcile(&SettingsSnapshot::default());
    settle().await;

    assert_eq!(
        view_model.get(SlotName::ScenariosDirectory),
        Some(Status::label("/srv/scenarios"))
    );
    handle.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_with_value_is_not_forwarded() {
    let store = MockSettingsStore::new();
    let (view_model, handle) = subscribe(&store, SettingKey::GridpathDatabase);
    settle().await;

    let snapshot = SettingsSnapshot {
        gridpath_database: Some("/data/io.db".to_string()),
        ..SettingsSnapshot::default()
    };
    handle.reconciler().reconcile(&snapshot);
    settle().await;

    assert!(view_model.get(SlotName::GridpathDatabase).is_none());
    assert_eq!(view_model.revision(), 0);
    handle.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_cleared_setting_becomes_not_set() {
    let store = MockSettingsStore::new();
    store.set(SettingKey::ScenariosDirectory, Some("/srv/scenarios"));
    let (view_model, handle) = subscribe(&store, SettingKey::ScenariosDirectory);
    settle().await;

    store.set(SettingKey::ScenariosDirectory, None);
    settle().await;

    assert_eq!(
        view_model.get(SlotName::ScenariosDirectory),
        Some(Status::not_set())
    );
    handle.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_stops_updates() {
    let store = MockSettingsStore::new();
    let (view_model, handle) = subscribe(&store, SettingKey::ScenariosDirectory);
    settle().await;
    assert_eq!(store.subscriber_count(SettingKey::ScenariosDirectory), 1);

    let reconciler = handle.reconciler();
    handle.unsubscribe();

    store.set(SettingKey::ScenariosDirectory, Some("/srv/late"));
    reconciler.reconcile(&SettingsSnapshot::default());
    settle().await;

    assert!(view_model.get(SlotName::ScenariosDirectory).is_none());
    assert_eq!(view_model.revision(), 0);
    assert_eq!(store.subscriber_count(SettingKey::ScenariosDirectory), 0);
}

#[tokio::test]
async fn test_local_store_snapshot_reflects_values() {
    let config = crate::config::SettingsConfig {
        scenarios_directory: Some("/srv/scenarios".to_string()),
        gridpath_database: None,
        python_environment: Some("/opt/env".to_string()),
    };
    let store = LocalSettingsStore::from_config(&config);

    let snapshot = store.snapshot().await.unwrap();
    assert_eq!(snapshot.get(SettingKey::ScenariosDirectory), Some("/srv/scenarios"));
    assert_eq!(snapshot.absent_keys(), vec![SettingKey::GridpathDatabase]);

    store.set(SettingKey::GridpathDatabase, Some("/data/io.db".to_string()));
    let snapshot = store.snapshot().await.unwrap();
    assert!(snapshot.absent_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_mock_snapshot_failure() {
    let store = MockSettingsStore::new();
    store.fail_snapshot("ipc channel closed");

    assert!(store.snapshot().await.is_err());
    assert_eq!(store.snapshot_calls(), 1);
}
