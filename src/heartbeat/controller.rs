//! Heartbeat state machine.
//!
//! # Rounds
//!
//! ```text
//!   start ──► [interval] ──► send ──► Waiting ──► [wait interval] ──► deadline
//!                ▲                                                       │
//!                │            ack (via bus) ──► Acked                    │
//!                │                                                       ▼
//!                └───────── Acked, or missed with retry_count ≤ limit ◄──┤
//!                                                                        │
//!                                 missed with retry_count > limit ──► Overtime
//! ```
//!
//! Each round's timers are tokio tasks whose abort handles live in the
//! state. Pausing aborts both and bumps the epoch, so a task that already
//! woke finds a newer epoch and does nothing.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, Sleep, sleep, sleep_until};
use tracing::{debug, info, trace, warn};

use crate::bus::EventBus;
use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::ReservedEvent;

use super::MessageSink;
use super::options::{HeartbeatOptions, HeartbeatSnapshot, HeartbeatStatus};

// ============================================================================
// Types
// ============================================================================

/// Validated configuration stored by `init`.
struct HeartbeatConfig {
    /// Serialized heartbeat message.
    payload: String,
    ack_event: String,
    interval: Duration,
    wait_interval: Option<Duration>,
    retry_limit: u32,
}

impl HeartbeatConfig {
    #[inline]
    fn effective_wait(&self) -> Duration {
        self.wait_interval.unwrap_or(self.interval)
    }
}

/// Mutable heartbeat state.
#[derive(Default)]
struct HeartbeatState {
    status: HeartbeatStatus,
    config: Option<HeartbeatConfig>,
    retry_count: u32,
    ack_subscription: Option<SubscriptionId>,
    send_timer: Option<AbortHandle>,
    wait_timer: Option<AbortHandle>,
    /// Bumped on every halt; timers carry the epoch they were scheduled in.
    epoch: u64,
}

impl HeartbeatState {
    fn abort_timers(&mut self) {
        if let Some(timer) = self.send_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.wait_timer.take() {
            timer.abort();
        }
    }
}

struct HeartbeatInner {
    state: Mutex<HeartbeatState>,
    bus: EventBus,
    sink: Arc<dyn MessageSink>,
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Application-level heartbeat driven over a [`MessageSink`].
///
/// Cloning yields a handle to the same state machine.
#[derive(Clone)]
pub struct Heartbeat {
    inner: Arc<HeartbeatInner>,
}

/// Non-owning heartbeat handle for callbacks stored on the bus.
#[derive(Clone)]
pub(crate) struct WeakHeartbeat(Weak<HeartbeatInner>);

impl WeakHeartbeat {
    pub(crate) fn upgrade(&self) -> Option<Heartbeat> {
        self.0.upgrade().map(|inner| Heartbeat { inner })
    }
}

impl std::fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Heartbeat").field(&self.snapshot()).finish()
    }
}

// ============================================================================
// Heartbeat - Constructor
// ============================================================================

impl Heartbeat {
    /// Creates an unconfigured heartbeat listening on `bus` and sending
    /// through `sink`.
    #[must_use]
    pub fn new(bus: EventBus, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            inner: Arc::new(HeartbeatInner {
                state: Mutex::new(HeartbeatState::default()),
                bus,
                sink,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakHeartbeat {
        WeakHeartbeat(Arc::downgrade(&self.inner))
    }
}

// ============================================================================
// Heartbeat - Control
// ============================================================================

impl Heartbeat {
    /// Stores configuration and moves to `Stopped`. Does not send anything.
    ///
    /// A running loop is paused first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `options` fail validation; the
    /// state is left unchanged.
    pub fn init(&self, options: HeartbeatOptions) -> Result<()> {
        if let Err(e) = options.validate() {
            warn!(error = %e, "Heartbeat init rejected");
            return Err(e);
        }
        let payload = serde_json::to_string(&options.message)?;

        self.halt();

        let mut state = self.inner.state.lock();
        state.config = Some(HeartbeatConfig {
            payload,
            ack_event: options.ack_event,
            interval: options.interval,
            wait_interval: options.wait_interval,
            retry_limit: options.retry_limit,
        });
        state.status = HeartbeatStatus::Stopped;

        debug!(
            interval_ms = options.interval.as_millis() as u64,
            retry_limit = options.retry_limit,
            "Heartbeat configured"
        );
        Ok(())
    }

    /// Starts the send/wait loop, replacing any running one.
    ///
    /// `interval` and `retry_limit` override the stored configuration when
    /// given.
    ///
    /// # Errors
    ///
    /// - [`Error::HeartbeatNotConfigured`] before `init`
    /// - [`Error::InvalidArgument`] for a zero interval override
    /// - [`Error::NotConnected`] / [`Error::NotOpen`] if the transport is not open
    /// - [`Error::UnsupportedEnvironment`] outside a tokio runtime
    pub fn start(&self, interval: Option<Duration>, retry_limit: Option<u32>) -> Result<()> {
        if self.inner.state.lock().config.is_none() {
            warn!("Heartbeat start ignored, not configured");
            return Err(Error::HeartbeatNotConfigured);
        }
        if interval.is_some_and(|d| d.is_zero()) {
            warn!("Heartbeat start ignored, interval must be > 0");
            return Err(Error::invalid_argument("heartbeat interval must be > 0"));
        }
        if Handle::try_current().is_err() {
            warn!("Heartbeat start ignored, no tokio runtime");
            return Err(Error::unsupported("no tokio runtime is running"));
        }
        if let Err(e) = self.inner.sink.ensure_open() {
            warn!(error = %e, "Heartbeat start ignored, transport not open");
            return Err(e);
        }

        // At most one round in flight
        self.halt();

        let mut state = self.inner.state.lock();
        let Some(config) = state.config.as_mut() else {
            return Err(Error::HeartbeatNotConfigured);
        };
        if let Some(interval) = interval {
            config.interval = interval;
        }
        if let Some(retry_limit) = retry_limit {
            config.retry_limit = retry_limit;
        }
        let ack_event = config.ack_event.clone();
        let interval_ms = config.interval.as_millis() as u64;

        let weak = self.downgrade();
        state.ack_subscription = Some(self.inner.bus.on(ack_event, move |_| {
            if let Some(heartbeat) = weak.upgrade() {
                heartbeat.inner.on_ack();
            }
        }));

        self.inner.schedule_send(&mut state);

        info!(interval_ms, "Heartbeat started");
        Ok(())
    }

    /// Stops the loop, keeping the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeartbeatNotConfigured`] before `init`.
    pub fn pause(&self) -> Result<()> {
        if self.status() == HeartbeatStatus::Cancelled {
            warn!("Heartbeat pause ignored, not configured");
            return Err(Error::HeartbeatNotConfigured);
        }
        self.halt();
        debug!("Heartbeat paused");
        Ok(())
    }

    /// Stops the loop and discards the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeartbeatNotConfigured`] before `init`.
    pub fn cancel(&self) -> Result<()> {
        if self.status() == HeartbeatStatus::Cancelled {
            warn!("Heartbeat cancel ignored, not configured");
            return Err(Error::HeartbeatNotConfigured);
        }
        self.reset();
        debug!("Heartbeat cancelled");
        Ok(())
    }

    /// Pause without the not-configured check.
    ///
    /// Aborts timers, retires the epoch, drops the ack subscription and
    /// resets the retry count.
    pub(crate) fn halt(&self) {
        let ack_subscription = {
            let mut state = self.inner.state.lock();
            state.abort_timers();
            state.epoch = state.epoch.wrapping_add(1);
            state.retry_count = 0;
            if state.status != HeartbeatStatus::Cancelled {
                state.status = HeartbeatStatus::Stopped;
            }
            state.ack_subscription.take()
        };

        if let Some(id) = ack_subscription {
            self.inner.bus.off_subscription(id);
        }
    }

    /// Cancel without the not-configured check.
    pub(crate) fn reset(&self) {
        self.halt();
        let mut state = self.inner.state.lock();
        state.config = None;
        state.status = HeartbeatStatus::Cancelled;
    }
}

// ============================================================================
// Heartbeat - Accessors
// ============================================================================

impl Heartbeat {
    /// Current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> HeartbeatStatus {
        self.inner.state.lock().status
    }

    /// Consecutive unanswered rounds since the last ack.
    #[inline]
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retry_count
    }

    /// Configured send interval.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.inner.state.lock().config.as_ref().map(|c| c.interval)
    }

    /// Configured ack event name.
    #[must_use]
    pub fn ack_event(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .config
            .as_ref()
            .map(|c| c.ack_event.clone())
    }

    /// Returns `true` if `name` is the configured ack event.
    #[must_use]
    pub fn is_ack_event(&self, name: &str) -> bool {
        self.inner
            .state
            .lock()
            .config
            .as_ref()
            .is_some_and(|c| c.ack_event == name)
    }

    /// Point-in-time view of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> HeartbeatSnapshot {
        let state = self.inner.state.lock();
        let config = state.config.as_ref();
        HeartbeatSnapshot {
            status: state.status,
            retry_count: state.retry_count,
            retry_limit: config.map(|c| c.retry_limit),
            interval: config.map(|c| c.interval),
            wait_interval: config.map(HeartbeatConfig::effective_wait),
            running: state.send_timer.is_some() || state.wait_timer.is_some(),
        }
    }
}

// ============================================================================
// HeartbeatInner - Rounds
// ============================================================================

/// Timer firing `delay` from now. Deadlines past the clock's range never fire.
fn round_timer(delay: Duration) -> Sleep {
    match Instant::now().checked_add(delay) {
        Some(deadline) => sleep_until(deadline),
        None => sleep(delay),
    }
}

impl HeartbeatInner {
    /// Arms the send timer for the current epoch.
    fn schedule_send(self: &Arc<Self>, state: &mut HeartbeatState) {
        let Some(delay) = state.config.as_ref().map(|c| c.interval) else {
            return;
        };
        let timer = round_timer(delay);
        let epoch = state.epoch;
        let weak = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            timer.await;
            if let Some(inner) = weak.upgrade() {
                inner.send_step(epoch);
            }
        });
        state.send_timer = Some(task.abort_handle());
    }

    /// Arms the ack deadline for the current epoch.
    fn schedule_wait(self: &Arc<Self>, state: &mut HeartbeatState) {
        let Some(delay) = state.config.as_ref().map(HeartbeatConfig::effective_wait) else {
            return;
        };
        let timer = round_timer(delay);
        let epoch = state.epoch;
        let weak = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            timer.await;
            if let Some(inner) = weak.upgrade() {
                inner.wait_step(epoch);
            }
        });
        state.wait_timer = Some(task.abort_handle());
    }

    fn send_step(self: &Arc<Self>, epoch: u64) {
        let payload = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.send_timer = None;
            let Some(payload) = state.config.as_ref().map(|c| c.payload.clone()) else {
                return;
            };

            // Waiting before the frame leaves, so a fast ack is not lost
            state.status = HeartbeatStatus::Waiting;
            self.schedule_wait(&mut state);
            payload
        };

        match self.sink.send_text(payload) {
            Ok(()) => trace!("Heartbeat sent"),
            Err(e) => warn!(error = %e, "Heartbeat send skipped"),
        }
    }

    fn wait_step(self: &Arc<Self>, epoch: u64) {
        let overtime = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.wait_timer = None;
            let Some(retry_limit) = state.config.as_ref().map(|c| c.retry_limit) else {
                return;
            };

            match state.status {
                HeartbeatStatus::Acked => {
                    self.schedule_send(&mut state);
                    false
                }
                HeartbeatStatus::Waiting => {
                    state.retry_count += 1;
                    if state.retry_count <= retry_limit {
                        debug!(
                            retry_count = state.retry_count,
                            retry_limit, "Heartbeat ack missed, retrying"
                        );
                        self.schedule_send(&mut state);
                        false
                    } else {
                        state.status = HeartbeatStatus::Overtime;
                        true
                    }
                }
                _ => false,
            }
        };

        if overtime {
            warn!("Heartbeat overtime");
            self.bus
                .emit(ReservedEvent::HeartbeatOvertime.as_str(), &Value::Null);
        }
    }

    fn on_ack(&self) {
        let mut state = self.state.lock();
        if matches!(
            state.status,
            HeartbeatStatus::Waiting | HeartbeatStatus::Acked
        ) {
            state.status = HeartbeatStatus::Acked;
            state.retry_count = 0;
            trace!("Heartbeat ack received");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use serde_json::json;
    use tokio::time::sleep;

    use crate::transport::ReadyState;

    const ACK: &str = "heartbeat";

    /// Records every frame written while "open".
    #[derive(Default)]
    struct RecordingSink {
        closed: AtomicBool,
        sent: parking_lot::Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn sent(&self) -> usize {
            self.sent.lock().len()
        }
    }

    impl MessageSink for RecordingSink {
        fn ensure_open(&self) -> Result<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::not_open(ReadyState::Closed));
            }
            Ok(())
        }

        fn send_text(&self, text: String) -> Result<()> {
            self.ensure_open()?;
            self.sent.lock().push(text);
            Ok(())
        }
    }

    struct Fixture {
        bus: EventBus,
        sink: Arc<RecordingSink>,
        heartbeat: Heartbeat,
        overtime: Arc<AtomicUsize>,
    }

    fn fixture(retry_limit: u32) -> Fixture {
        let bus = EventBus::new();
        let sink = Arc::new(RecordingSink::default());
        let heartbeat = Heartbeat::new(bus.clone(), sink.clone());
        heartbeat
            .init(
                HeartbeatOptions::new(
                    json!({ "kind": ACK, "msg": null }),
                    ACK,
                    Duration::from_millis(1000),
                )
                .with_retry_limit(retry_limit),
            )
            .expect("init");

        let overtime = Arc::new(AtomicUsize::new(0));
        let o = Arc::clone(&overtime);
        bus.on(ReservedEvent::HeartbeatOvertime.as_str(), move |_| {
            o.fetch_add(1, Ordering::SeqCst);
        });

        Fixture {
            bus,
            sink,
            heartbeat,
            overtime,
        }
    }

    async fn advance(ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }

    fn ack(bus: &EventBus) {
        bus.emit(ACK, &json!({ "kind": ACK }));
    }

    #[test]
    fn test_new_is_cancelled() {
        let heartbeat = Heartbeat::new(EventBus::new(), Arc::new(RecordingSink::default()));
        assert_eq!(heartbeat.status(), HeartbeatStatus::Cancelled);
        assert_eq!(heartbeat.interval(), None);
    }

    #[test]
    fn test_init_rejects_invalid_and_keeps_state() {
        let heartbeat = Heartbeat::new(EventBus::new(), Arc::new(RecordingSink::default()));

        let zero = HeartbeatOptions::new(json!({}), ACK, Duration::ZERO);
        assert!(matches!(
            heartbeat.init(zero),
            Err(Error::InvalidArgument { .. })
        ));
        let scalar = HeartbeatOptions::new(json!(1), ACK, Duration::from_secs(1));
        assert!(heartbeat.init(scalar).is_err());

        assert_eq!(heartbeat.status(), HeartbeatStatus::Cancelled);
    }

    #[test]
    fn test_init_moves_to_stopped() {
        let f = fixture(0);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Stopped);
        assert_eq!(f.heartbeat.interval(), Some(Duration::from_millis(1000)));
        assert!(f.heartbeat.is_ack_event(ACK));
        assert_eq!(f.sink.sent(), 0);
    }

    #[test]
    fn test_controls_before_init_are_refused() {
        let heartbeat = Heartbeat::new(EventBus::new(), Arc::new(RecordingSink::default()));
        assert!(matches!(
            heartbeat.start(None, None),
            Err(Error::HeartbeatNotConfigured)
        ));
        assert!(matches!(
            heartbeat.pause(),
            Err(Error::HeartbeatNotConfigured)
        ));
        assert!(matches!(
            heartbeat.cancel(),
            Err(Error::HeartbeatNotConfigured)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_refused_when_transport_closed() {
        let f = fixture(0);
        f.sink.closed.store(true, Ordering::SeqCst);

        assert!(matches!(
            f.heartbeat.start(None, None),
            Err(Error::NotOpen { .. })
        ));
        assert!(!f.heartbeat.snapshot().running);
        assert!(!f.bus.contains(ACK));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejects_zero_interval_override() {
        let f = fixture(0);
        assert!(f.heartbeat.start(Some(Duration::ZERO), None).is_err());
        assert!(!f.heartbeat.snapshot().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overtime_after_retry_limit() {
        let f = fixture(1);
        f.heartbeat.start(None, None).expect("start");

        // send @1000, miss @2000 (retry 1), send @3000, miss @4000 (overtime)
        advance(2500).await;
        assert_eq!(f.heartbeat.retry_count(), 1);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Waiting);
        assert_eq!(f.overtime.load(Ordering::SeqCst), 0);

        advance(2000).await;
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Overtime);
        assert_eq!(f.overtime.load(Ordering::SeqCst), 1);
        assert_eq!(f.sink.sent(), 2);

        // Loop halted
        advance(10_000).await;
        assert_eq!(f.overtime.load(Ordering::SeqCst), 1);
        assert_eq!(f.sink.sent(), 2);
        assert!(!f.heartbeat.snapshot().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overtime_with_zero_retry_limit() {
        let f = fixture(0);
        f.heartbeat.start(None, None).expect("start");

        advance(2500).await;
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Overtime);
        assert_eq!(f.overtime.load(Ordering::SeqCst), 1);
        assert_eq!(f.sink.sent(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_keeps_loop_alive() {
        let f = fixture(1);
        f.heartbeat.start(None, None).expect("start");

        advance(1500).await;
        assert_eq!(f.sink.sent(), 1);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Waiting);

        ack(&f.bus);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Acked);
        assert_eq!(f.heartbeat.retry_count(), 0);

        // Deadline @2000 sees Acked and schedules the send @3000
        advance(1000).await;
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Acked);
        assert_eq!(f.sink.sent(), 1);

        advance(1000).await;
        assert_eq!(f.sink.sent(), 2);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Waiting);
        assert_eq!(f.overtime.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_resets_retry_count() {
        let f = fixture(2);
        f.heartbeat.start(None, None).expect("start");

        advance(2500).await;
        assert_eq!(f.heartbeat.retry_count(), 1);

        ack(&f.bus);
        assert_eq!(f.heartbeat.retry_count(), 0);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Acked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sent_payload_is_configured_message() {
        let f = fixture(0);
        f.heartbeat.start(None, None).expect("start");
        advance(1500).await;

        let sent = f.sink.sent.lock().clone();
        let value: Value = serde_json::from_str(&sent[0]).expect("json");
        assert_eq!(value, json!({ "kind": ACK, "msg": null }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_sending() {
        let f = fixture(3);
        f.heartbeat.start(None, None).expect("start");

        advance(2500).await;
        assert_eq!(f.sink.sent(), 1);
        assert_eq!(f.heartbeat.retry_count(), 1);

        f.heartbeat.pause().expect("pause");
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Stopped);
        assert_eq!(f.heartbeat.retry_count(), 0);
        assert!(!f.bus.contains(ACK));

        advance(10_000).await;
        assert_eq!(f.sink.sent(), 1);
        assert_eq!(f.overtime.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_duplicate_timers() {
        let f = fixture(5);
        f.heartbeat.start(None, None).expect("start");
        advance(500).await;
        f.heartbeat.start(None, None).expect("restart");

        // Only the second start's timer remains: send @1500
        advance(800).await;
        assert_eq!(f.sink.sent(), 0);
        advance(400).await;
        assert_eq!(f.sink.sent(), 1);
        assert_eq!(f.bus.listener_count(ACK), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_overrides_interval_and_retry_limit() {
        let f = fixture(0);
        f.heartbeat
            .start(Some(Duration::from_millis(200)), Some(4))
            .expect("start");

        let snapshot = f.heartbeat.snapshot();
        assert_eq!(snapshot.interval, Some(Duration::from_millis(200)));
        assert_eq!(snapshot.retry_limit, Some(4));
        assert!(snapshot.running);

        advance(300).await;
        assert_eq!(f.sink.sent(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_wait_interval() {
        let bus = EventBus::new();
        let sink = Arc::new(RecordingSink::default());
        let heartbeat = Heartbeat::new(bus.clone(), sink.clone());
        heartbeat
            .init(
                HeartbeatOptions::new(json!({ "kind": ACK }), ACK, Duration::from_millis(1000))
                    .with_wait_interval(Duration::from_millis(300)),
            )
            .expect("init");
        heartbeat.start(None, None).expect("start");

        advance(1200).await;
        assert_eq!(heartbeat.status(), HeartbeatStatus::Waiting);
        advance(200).await;
        assert_eq!(heartbeat.status(), HeartbeatStatus::Overtime);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_skipped_when_transport_drops() {
        let f = fixture(0);
        f.heartbeat.start(None, None).expect("start");
        f.sink.closed.store(true, Ordering::SeqCst);

        advance(2500).await;
        assert_eq!(f.sink.sent(), 0);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Overtime);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_configuration() {
        let f = fixture(0);
        f.heartbeat.start(None, None).expect("start");
        f.heartbeat.cancel().expect("cancel");

        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Cancelled);
        assert_eq!(f.heartbeat.interval(), None);
        assert!(!f.heartbeat.is_ack_event(ACK));

        advance(5000).await;
        assert_eq!(f.sink.sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_interval_never_fires() {
        let bus = EventBus::new();
        let sink = Arc::new(RecordingSink::default());
        let heartbeat = Heartbeat::new(bus.clone(), sink.clone());
        heartbeat
            .init(HeartbeatOptions::new(json!({ "kind": ACK }), ACK, Duration::MAX))
            .expect("init");

        heartbeat.start(None, None).expect("start");
        assert!(heartbeat.snapshot().running);
        assert_eq!(bus.listener_count(ACK), 1);

        advance(60_000).await;
        assert_eq!(sink.sent(), 0);
        assert_eq!(heartbeat.status(), HeartbeatStatus::Stopped);

        heartbeat.pause().expect("pause");
        assert!(!heartbeat.snapshot().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_wait_interval_holds_waiting() {
        let bus = EventBus::new();
        let sink = Arc::new(RecordingSink::default());
        let heartbeat = Heartbeat::new(bus.clone(), sink.clone());
        heartbeat
            .init(
                HeartbeatOptions::new(json!({ "kind": ACK }), ACK, Duration::from_millis(1000))
                    .with_wait_interval(Duration::MAX),
            )
            .expect("init");
        heartbeat.start(None, None).expect("start");

        advance(60_000).await;
        assert_eq!(sink.sent(), 1);
        assert_eq!(heartbeat.status(), HeartbeatStatus::Waiting);
        assert_eq!(heartbeat.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_ack_after_overtime_is_ignored() {
        let f = fixture(0);
        f.heartbeat.start(None, None).expect("start");
        advance(2500).await;
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Overtime);

        ack(&f.bus);
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Overtime);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_overtime() {
        let f = fixture(0);
        f.heartbeat.start(None, None).expect("start");
        advance(2500).await;
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Overtime);

        f.heartbeat.start(None, None).expect("restart");
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Stopped);
        advance(1500).await;
        assert_eq!(f.heartbeat.status(), HeartbeatStatus::Waiting);
        assert_eq!(f.sink.sent(), 2);
    }
}
