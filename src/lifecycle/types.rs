use crate::source::StatusSource;
use std::sync::Arc;

#[cfg(feature = "http")]
use crate::config::ServerConfig;
#[cfg(feature = "http")]
use crate::error::Result;
#[cfg(feature = "http")]
use crate::source::{HealthCheckSource, HttpStatusClient, TableSource};

/// Dashboard lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Inactive,
    Active,
}

/// The three polled sources
#[derive(Clone)]
pub struct DashboardSources {
    pub server: Arc<dyn StatusSource>,
    pub run_status: Arc<dyn StatusSource>,
    pub validation_status: Arc<dyn StatusSource>,
}

impl DashboardSources {
    /// Sources backed by the scenario server's HTTP endpoints
    #[cfg(feature = "http")]
    pub fn http(config: &ServerConfig) -> Result<Self> {
        let client = Arc::new(HttpStatusClient::new(config)?);

        Ok(Self {
            server: Arc::new(HealthCheckSource::new(
                Arc::clone(&client),
                config.health_path.clone(),
            )),
            run_status: Arc::new(TableSource::new(
                "run_status",
                Arc::clone(&client),
                config.run_status_path.clone(),
            )),
            validation_status: Arc::new(TableSource::new(
                "validation_status",
                client,
                config.validation_status_path.clone(),
            )),
        })
    }
}
