pub mod config;
pub mod error;
pub mod lifecycle;
pub mod poller;
pub mod settings;
pub mod source;
pub mod status;
pub mod view_model;

pub use config::StatusboardConfig;
pub use error::{Result, StatusboardError};
pub use lifecycle::{ActivationGate, DashboardSources, LifecycleController, LifecycleState, SlotWriter};
pub use poller::{Poller, PollerHandle};
pub use settings::{
    BridgeHandle, LocalSettingsStore, SettingKey, SettingsSnapshot, SettingsStatusBridge,
    SettingsStore,
};
pub use source::{FailurePolicy, FnSource, MockStatusSource, StatusSource};
pub use status::{SlotName, Status, StatusKind, StatusTable};
pub use view_model::{AggregatorViewModel, DashboardView, TrackedStatus};

#[cfg(feature = "http")]
pub use source::{HealthCheckSource, HttpStatusClient, TableSource};
