//! Status sources sampled by the pollers.
//!
//! A source produces one [`Status`] per call. How a failed sample shows up on
//! the dashboard is decided by the slot's [`FailurePolicy`], not by the source.

use crate::error::Result;
use crate::status::{SlotName, Status};
use std::future::Future;

#[cfg(feature = "http")]
pub mod http;
pub mod mock;

#[cfg(feature = "http")]
pub use http::{HealthCheckSource, HttpStatusClient, TableSource};
pub use mock::MockStatusSource;

/// Single-shot producer of a status value
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Fetch the current status
    async fn sample(&self) -> Result<Status>;
}

/// What a failed sample writes to the slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Replace the slot value with a fixed sentinel
    Sentinel(Status),
    /// Leave the last value in place
    KeepLast,
}

impl FailurePolicy {
    /// Policy used for each polled slot: the server check degrades to
    /// "down", run and validation tables keep their last value.
    pub fn for_slot(slot: SlotName) -> Self {
        match slot {
            SlotName::Server => FailurePolicy::Sentinel(Status::down()),
            _ => FailurePolicy::KeepLast,
        }
    }

    /// Status to write after a failure, if any
    pub fn on_failure(&self) -> Option<Status> {
        match self {
            FailurePolicy::Sentinel(status) => Some(status.clone()),
            FailurePolicy::KeepLast => None,
        }
    }
}

/// Adapter turning an async closure into a [`StatusSource`]
pub struct FnSource<F> {
    name: String,
    fetch: F,
}

impl<F, Fut> FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Status>> + Send,
{
    pub fn new<S: Into<String>>(name: S, fetch: F) -> Self {
        Self {
            name: name.into(),
            fetch,
        }
    }
}

#[async_trait::async_trait]
impl<F, Fut> StatusSource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Status>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample(&self) -> Result<Status> {
        (self.fetch)().await
    }
}
