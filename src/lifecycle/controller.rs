use super::gate::{ActivationGate, SlotWriter};
use super::types::{DashboardSources, LifecycleState};
use crate::config::PollingConfig;
use crate::poller::{Poller, PollerHandle};
use crate::settings::{
    BridgeHandle, SettingKey, SettingsStatusBridge, SettingsStore, SnapshotReconciler,
};
use crate::source::{FailurePolicy, StatusSource};
use crate::status::SlotName;
use crate::view_model::AggregatorViewModel;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Ties every poller and settings subscription to the dashboard's active
/// lifetime.
///
/// `activate` and `deactivate` are idempotent and never fail. Each activation
/// gets a fresh [`ActivationGate`]; deactivation closes it, which stops all
/// producers of that activation and guarantees none of them writes to the
/// view model afterwards.
pub struct LifecycleController {
    view_model: Arc<AggregatorViewModel>,
    sources: DashboardSources,
    settings: Arc<dyn SettingsStore>,
    polling: PollingConfig,
    activation: Mutex<Option<Activation>>,
}

/// Everything started by one activation
struct Activation {
    gate: ActivationGate,
    pollers: Vec<PollerHandle>,
    bridges: Vec<BridgeHandle>,
    snapshot: JoinHandle<()>,
}

impl LifecycleController {
    pub fn new(
        view_model: Arc<AggregatorViewModel>,
        sources: DashboardSources,
        settings: Arc<dyn SettingsStore>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            view_model,
            sources,
            settings,
            polling,
            activation: Mutex::new(None),
        }
    }

    /// Start every poller and settings subscription.
    ///
    /// Returns immediately; sources progress in background tasks. Must be
    /// called from within a Tokio runtime. Returns `false` when already active.
    pub fn activate(&self) -> bool {
        let mut activation = self.activation.lock();
        if activation.is_some() {
            debug!("Dashboard already active, ignoring activate");
            return false;
        }

        let gate = ActivationGate::new();
        info!("Activating dashboard (activation {})", gate.activation_id());

        let pollers = vec![
            self.start_poller(
                SlotName::Server,
                &self.sources.server,
                self.polling.server_interval(),
                &gate,
            ),
            self.start_poller(
                SlotName::RunStatus,
                &self.sources.run_status,
                self.polling.run_status_interval(),
                &gate,
            ),
            self.start_poller(
                SlotName::ValidationStatus,
                &self.sources.validation_status,
                self.polling.validation_status_interval(),
                &gate,
            ),
        ];

        let bridges: Vec<BridgeHandle> = SettingKey::ALL
            .into_iter()
            .map(|key| {
                SettingsStatusBridge::subscribe(
                    self.settings.as_ref(),
                    key,
                    self.writer(key.slot(), &gate),
                )
            })
            .collect();

        let reconcilers = bridges.iter().map(BridgeHandle::reconciler).collect();
        let snapshot = tokio::spawn(request_snapshot(
            Arc::clone(&self.settings),
            reconcilers,
            gate.clone(),
        ));

        *activation = Some(Activation {
            gate,
            pollers,
            bridges,
            snapshot,
        });
        true
    }

    /// Stop every poller and release every subscription.
    ///
    /// No view-model write from the ended activation can happen after this
    /// returns. Returns `false` when already inactive.
    pub fn deactivate(&self) -> bool {
        let Some(activation) = self.activation.lock().take() else {
            debug!("Dashboard not active, ignoring deactivate");
            return false;
        };

        let activation_id = activation.gate.activation_id();
        activation.gate.close();

        for poller in activation.pollers {
            poller.stop();
        }
        for bridge in activation.bridges {
            bridge.unsubscribe();
        }
        if !activation.snapshot.is_finished() {
            debug!("Settings snapshot still pending, its result will be dropped");
        }

        info!("Dashboard deactivated (activation {})", activation_id);
        true
    }

    pub fn state(&self) -> LifecycleState {
        if self.activation.lock().is_some() {
            LifecycleState::Active
        } else {
            LifecycleState::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Number of running pollers and subscriptions
    pub fn live_handles(&self) -> usize {
        self.activation.lock().as_ref().map_or(0, |activation| {
            let pollers = activation.pollers.iter().filter(|p| p.is_live()).count();
            let bridges = activation.bridges.iter().filter(|b| b.is_live()).count();
            pollers + bridges
        })
    }

    pub fn activation_id(&self) -> Option<Uuid> {
        self.activation
            .lock()
            .as_ref()
            .map(|activation| activation.gate.activation_id())
    }

    pub fn view_model(&self) -> Arc<AggregatorViewModel> {
        Arc::clone(&self.view_model)
    }

    fn writer(&self, slot: SlotName, gate: &ActivationGate) -> SlotWriter {
        SlotWriter::new(slot, Arc::clone(&self.view_model), gate.clone())
    }

    fn start_poller(
        &self,
        slot: SlotName,
        source: &Arc<dyn StatusSource>,
        period: Duration,
        gate: &ActivationGate,
    ) -> PollerHandle {
        Poller::start(
            Arc::clone(source),
            period,
            FailurePolicy::for_slot(slot),
            self.writer(slot, gate),
        )
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Some(activation) = self.activation.get_mut().take() {
            activation.gate.close();
        }
    }
}

/// One-shot settings snapshot used to tell "unset" from "not loaded yet"
async fn request_snapshot(
    store: Arc<dyn SettingsStore>,
    reconcilers: Vec<SnapshotReconciler>,
    gate: ActivationGate,
) {
    let result = tokio::select! {
        biased;
        _ = gate.closed() => {
            debug!("Deactivated before the settings snapshot resolved");
            return;
        }
        result = store.snapshot() => result,
    };

    match result {
        Ok(snapshot) => {
            let absent = snapshot.absent_keys();
            if !absent.is_empty() {
                info!("Settings not set: {:?}", absent);
            }
            for reconciler in &reconcilers {
                reconciler.reconcile(&snapshot);
            }
        }
        Err(e) => {
            warn!("Settings snapshot failed: {}", e);
        }
    }
}
