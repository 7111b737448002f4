use crate::lifecycle::SlotWriter;
use crate::source::{FailurePolicy, StatusSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Drives a [`StatusSource`] on a fixed interval
pub struct Poller;

/// Handle to a running poller task
pub struct PollerHandle {
    name: String,
    writer: SlotWriter,
    task: JoinHandle<()>,
}

impl Poller {
    /// Start polling `source` into `writer`.
    ///
    /// The first sample runs immediately, then once per `period`. Each sample
    /// is awaited before the next tick is taken, so a poller never has more
    /// than one sample in flight; ticks missed during a slow sample are
    /// delayed rather than replayed.
    pub fn start(
        source: Arc<dyn StatusSource>,
        period: Duration,
        policy: FailurePolicy,
        writer: SlotWriter,
    ) -> PollerHandle {
        let name = source.name().to_string();
        // tokio's interval panics on a zero period
        let period = if period.is_zero() {
            warn!("Poller '{}' configured with a zero period, using 1ms", name);
            MIN_PERIOD
        } else {
            period
        };
        info!(
            "Starting poller '{}' for slot '{}' every {:?}",
            name,
            writer.slot(),
            period
        );

        let writer = writer.scoped();
        let task_writer = writer.clone();
        let task = tokio::spawn(async move {
            run_poller(source, period, policy, task_writer).await;
        });

        PollerHandle { name, writer, task }
    }
}

async fn run_poller(
    source: Arc<dyn StatusSource>,
    period: Duration,
    policy: FailurePolicy,
    writer: SlotWriter,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = writer.gate().closed() => break,
            _ = ticker.tick() => {}
        }

        // An in-flight sample is allowed to finish; the writer drops its
        // result if the gate closed meanwhile.
        match source.sample().await {
            Ok(status) => {
                if consecutive_failures > 0 {
                    info!(
                        "Poller '{}' recovered after {} failure(s)",
                        source.name(),
                        consecutive_failures
                    );
                }
                consecutive_failures = 0;
                debug!("Poller '{}' sampled {}", source.name(), status);
                writer.write(status);
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!(
                    "Poller '{}' sample failed (attempt {}): {}",
                    source.name(),
                    consecutive_failures,
                    e
                );
                if let Some(sentinel) = policy.on_failure() {
                    writer.write(sentinel);
                }
            }
        }
    }

    debug!("Poller '{}' stopped", source.name());
}

impl PollerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the poller task is still scheduled
    pub fn is_live(&self) -> bool {
        self.writer.gate().is_open() && !self.task.is_finished()
    }

    /// Stop the poller; a sample still in flight is discarded
    pub fn stop(self) {
        debug!("Stopping poller '{}'", self.name);
        self.writer.gate().close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ActivationGate;
    use crate::source::MockStatusSource;
    use crate::status::{SlotName, Status};
    use crate::view_model::AggregatorViewModel;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_millis(5000);

    fn writer_for(slot: SlotName) -> (Arc<AggregatorViewModel>, SlotWriter) {
        let view_model = Arc::new(AggregatorViewModel::new());
        let writer = SlotWriter::new(slot, Arc::clone(&view_model), ActivationGate::new());
        (view_model, writer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_immediately_then_every_period() {
        let (view_model, writer) = writer_for(SlotName::Server);
        let source = Arc::new(MockStatusSource::new("server", Status::up()));

        let handle = Poller::start(
            source.clone(),
            PERIOD,
            FailurePolicy::for_slot(SlotName::Server),
            writer,
        );

        sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(view_model.get(SlotName::Server), Some(Status::up()));

        sleep(PERIOD).await;
        assert_eq!(source.calls(), 2);

        sleep(PERIOD * 2).await;
        assert_eq!(source.calls(), 4);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_failure_writes_down_then_recovers() {
        let (view_model, writer) = writer_for(SlotName::Server);
        let source = Arc::new(MockStatusSource::failing("server", "connection refused"));

        let handle = Poller::start(
            source.clone(),
            PERIOD,
            FailurePolicy::for_slot(SlotName::Server),
            writer,
        );

        sleep(Duration::from_millis(10)).await;
        assert_eq!(view_model.get(SlotName::Server), Some(Status::down()));

        source.respond_with(Status::up());
        sleep(PERIOD).await;
        assert_eq!(view_model.get(SlotName::Server), Some(Status::up()));

        // Failures never end the schedule
        source.fail_with("timeout");
        sleep(PERIOD).await;
        assert_eq!(view_model.get(SlotName::Server), Some(Status::down()));
        assert!(handle.is_live());

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_failure_keeps_last_value() {
        let (view_model, writer) = writer_for(SlotName::RunStatus);
        let rows = vec![vec!["base_case".to_string(), "complete".to_string()]];
        let source = Arc::new(MockStatusSource::new("run_status", Status::table(rows.clone())));

        let handle = Poller::start(
            source.clone(),
            PERIOD,
            FailurePolicy::for_slot(SlotName::RunStatus),
            writer,
        );

        sleep(Duration::from_millis(10)).await;
        assert_eq!(view_model.get(SlotName::RunStatus), Some(Status::table(rows.clone())));

        source.fail_with("backend unavailable");
        sleep(PERIOD * 2).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(view_model.get(SlotName::RunStatus), Some(Status::table(rows)));
        assert_eq!(view_model.tracked(SlotName::RunStatus).updates, 1);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_sample_in_flight() {
        let (view_model, writer) = writer_for(SlotName::Server);
        let source = Arc::new(MockStatusSource::new("server", Status::up()));
        // Each sample outlasts several periods
        source.set_latency(Duration::from_millis(350));

        let handle = Poller::start(
            source.clone(),
            Duration::from_millis(100),
            FailurePolicy::for_slot(SlotName::Server),
            writer,
        );

        sleep(Duration::from_millis(2000)).await;

        assert_eq!(source.max_in_flight(), 1);
        assert!(source.calls() >= 5);
        // Missed ticks are delayed, not replayed back-to-back
        assert!(source.calls() <= 6);
        assert_eq!(view_model.tracked(SlotName::Server).updates, source.completed() as u64);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_keeps_polling() {
        let (view_model, writer) = writer_for(SlotName::Server);
        let source = Arc::new(MockStatusSource::new("server", Status::up()));

        let handle = Poller::start(
            source.clone(),
            Duration::ZERO,
            FailurePolicy::for_slot(SlotName::Server),
            writer,
        );

        sleep(Duration::from_millis(10)).await;
        assert!(handle.is_live());
        assert!(source.calls() >= 2);
        assert_eq!(view_model.get(SlotName::Server), Some(Status::up()));

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_in_flight_sample() {
        let (view_model, writer) = writer_for(SlotName::Server);
        let source = Arc::new(MockStatusSource::new("server", Status::up()));
        source.set_latency(Duration::from_millis(3000));

        let handle = Poller::start(
            source.clone(),
            PERIOD,
            FailurePolicy::for_slot(SlotName::Server),
            writer,
        );

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(source.in_flight(), 1);

        handle.stop();

        sleep(PERIOD * 3).await;
        // The slow sample ran to completion but its result was dropped
        assert_eq!(source.completed(), 1);
        assert_eq!(source.calls(), 1);
        assert!(view_model.get(SlotName::Server).is_none());
        assert_eq!(view_model.revision(), 0);
    }
}
