use super::{SettingKey, SettingsSnapshot, SettingsStore};
use crate::lifecycle::SlotWriter;
use crate::status::Status;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Relays a settings channel into its view-model slot
pub struct SettingsStatusBridge;

/// Handle to one settings subscription
pub struct BridgeHandle {
    key: SettingKey,
    writer: SlotWriter,
    mailbox: mpsc::UnboundedSender<BridgeMessage>,
    task: JoinHandle<()>,
}

/// Delivers a snapshot result to one bridge
#[derive(Clone)]
pub struct SnapshotReconciler {
    key: SettingKey,
    mailbox: mpsc::UnboundedSender<BridgeMessage>,
}

#[derive(Debug)]
enum BridgeMessage {
    SnapshotAbsent,
}

/// Reconciliation state owned by the bridge task
struct ChannelState {
    key: SettingKey,
    /// A concrete value has been applied since the last absent marker
    has_value: bool,
}

impl SettingsStatusBridge {
    /// Subscribe to `key` and relay its values into `writer`.
    ///
    /// The push stream and snapshot results both go through the bridge task,
    /// which is the slot's single writer.
    pub fn subscribe(store: &dyn SettingsStore, key: SettingKey, writer: SlotWriter) -> BridgeHandle {
        info!("Subscribing to setting '{}'", key);

        let values = store.subscribe(key);
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let writer = writer.scoped();
        let task_writer = writer.clone();
        let task = tokio::spawn(async move {
            run_bridge(key, values, inbox, task_writer).await;
        });

        BridgeHandle {
            key,
            writer,
            mailbox,
            task,
        }
    }
}

async fn run_bridge(
    key: SettingKey,
    mut values: watch::Receiver<Option<String>>,
    mut inbox: mpsc::UnboundedReceiver<BridgeMessage>,
    writer: SlotWriter,
) {
    let mut state = ChannelState {
        key,
        has_value: false,
    };

    // The channel already holds the current value
    let current = values.borrow_and_update().clone();
    state.on_push(current, &writer);

    let mut watching = true;
    loop {
        tokio::select! {
            biased;
            _ = writer.gate().closed() => break,
            changed = values.changed(), if watching => match changed {
                Ok(()) => {
                    let value = values.borrow_and_update().clone();
                    state.on_push(value, &writer);
                }
                Err(_) => {
                    warn!("Settings channel '{}' closed by the store", key);
                    watching = false;
                }
            },
            Some(message) = inbox.recv() => match message {
                BridgeMessage::SnapshotAbsent => state.on_snapshot_absent(&writer),
            },
        }
    }

    debug!("Settings bridge '{}' stopped", key);
}

impl ChannelState {
    fn on_push(&mut self, value: Option<String>, writer: &SlotWriter) {
        match value {
            Some(value) => {
                debug!("Setting '{}' pushed '{}'", self.key, value);
                self.has_value = true;
                writer.write(Status::Label(value));
            }
            // Cleared after having a value: the setting is known to be unset
            None if self.has_value => {
                debug!("Setting '{}' cleared", self.key);
                self.has_value = false;
                writer.write(Status::not_set());
            }
            // Unset or not loaded yet; the snapshot tells them apart
            None => debug!("Setting '{}' has no value yet", self.key),
        }
    }

    fn on_snapshot_absent(&mut self, writer: &SlotWriter) {
        if self.has_value {
            debug!(
                "Ignoring absent snapshot for '{}': a pushed value arrived first",
                self.key
            );
            return;
        }
        debug!("Snapshot reports '{}' absent", self.key);
        writer.write(Status::not_set());
    }
}

impl BridgeHandle {
    pub fn key(&self) -> SettingKey {
        self.key
    }

    /// Whether the subscription is still active
    pub fn is_live(&self) -> bool {
        self.writer.gate().is_open() && !self.task.is_finished()
    }

    pub fn reconciler(&self) -> SnapshotReconciler {
        SnapshotReconciler {
            key: self.key,
            mailbox: self.mailbox.clone(),
        }
    }

    /// Release the subscription; no further writes after this returns
    pub fn unsubscribe(self) {
        debug!("Unsubscribing from setting '{}'", self.key);
        self.writer.gate().close();
    }
}

impl SnapshotReconciler {
    pub fn key(&self) -> SettingKey {
        self.key
    }

    /// Forward the snapshot's verdict for this key to the bridge
    pub fn reconcile(&self, snapshot: &SettingsSnapshot) {
        if snapshot.get(self.key).is_some() {
            return;
        }
        if self.mailbox.send(BridgeMessage::SnapshotAbsent).is_err() {
            debug!(
                "Settings bridge '{}' already stopped, dropping snapshot result",
                self.key
            );
        }
    }
}
