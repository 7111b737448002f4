mod controller;
mod gate;
mod types;


pub use controller::LifecycleController;
pub use gate::{ActivationGate, SlotWriter};
pub use types::{DashboardSources, LifecycleState};
