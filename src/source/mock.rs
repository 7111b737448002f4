use crate::error::{Result, StatusboardError};
use crate::source::StatusSource;
use crate::status::Status;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

type MockResponse = std::result::Result<Status, String>;

/// Scriptable status source for demos and tests without a backend.
///
/// Queued responses are served first, in order; after that every sample
/// returns the steady response. Latency applies to every sample.
pub struct MockStatusSource {
    name: String,
    queued: Mutex<VecDeque<MockResponse>>,
    steady: Mutex<MockResponse>,
    latency: Mutex<Duration>,
    calls: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockStatusSource {
    /// Create a source that always returns `status`
    pub fn new<S: Into<String>>(name: S, status: Status) -> Self {
        Self::with_response(name, Ok(status))
    }

    /// Create a source that always fails with `message`
    pub fn failing<S: Into<String>, M: Into<String>>(name: S, message: M) -> Self {
        Self::with_response(name, Err(message.into()))
    }

    fn with_response<S: Into<String>>(name: S, response: MockResponse) -> Self {
        Self {
            name: name.into(),
            queued: Mutex::new(VecDeque::new()),
            steady: Mutex::new(response),
            latency: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn respond_with(&self, status: Status) {
        *self.steady.lock() = Ok(status);
    }

    pub fn fail_with<M: Into<String>>(&self, message: M) {
        *self.steady.lock() = Err(message.into());
    }

    /// Serve `status` once before falling back to the steady response
    pub fn enqueue(&self, status: Status) {
        self.queued.lock().push_back(Ok(status));
    }

    /// Fail once before falling back to the steady response
    pub fn enqueue_failure<M: Into<String>>(&self, message: M) {
        self.queued.lock().push_back(Err(message.into()));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Number of samples started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of samples that ran to completion
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent samples observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        if let Some(response) = self.queued.lock().pop_front() {
            return response;
        }
        self.steady.lock().clone()
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl StatusSource for MockStatusSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample(&self) -> Result<Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            sleep(latency).await;
        }

        let response = self.next_response();
        self.completed.fetch_add(1, Ordering::SeqCst);
        debug!("Mock source '{}' answered {:?}", self.name, response);

        response.map_err(|message| StatusboardError::source_failed(self.name.clone(), message))
    }
}
