use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quanta::Instant;

use crate::config::Configuration;
use crate::data::{HistogramCounter, LinearMapping, MeterCounter, MeterRates, WindowedCounter};
use crate::visitor::{print_field, Leaf, MetricValue, Visitor};

pub(crate) struct CounterState {
    value: AtomicI64,
}

impl CounterState {
    pub fn new() -> Self {
        Self { value: AtomicI64::new(0) }
    }
}

impl Leaf for CounterState {
    fn print(&self, visitor: &mut dyn Visitor) {
        visitor.value(self.value.load(Ordering::Relaxed).into());
    }
}

type GaugeFn = dyn Fn() -> MetricValue + Send + Sync;

pub(crate) struct GaugeState {
    callback: Box<GaugeFn>,
}

impl GaugeState {
    pub fn new<F, V>(callback: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<MetricValue> + 'static,
    {
        Self { callback: Box::new(move || callback().into()) }
    }
}

impl Leaf for GaugeState {
    fn print(&self, visitor: &mut dyn Visitor) {
        visitor.value((self.callback)());
    }
}

pub(crate) struct MeterState {
    counter: MeterCounter,
    config: Arc<Configuration>,
}

impl MeterState {
    pub fn new(config: Arc<Configuration>) -> Self {
        Self { counter: MeterCounter::new(config.clock.now()), config }
    }
}

impl Leaf for MeterState {
    fn print(&self, visitor: &mut dyn Visitor) {
        print_rates(visitor, &self.counter.rates(self.config.clock.now()));
    }
}

pub(crate) struct HistogramState {
    counter: HistogramCounter,
    config: Arc<Configuration>,
}

impl HistogramState {
    pub fn new(mapping: LinearMapping, config: Arc<Configuration>) -> Self {
        let counter = HistogramCounter::new(mapping, config.histogram_decay, config.clock.now());
        Self { counter, config }
    }
}

impl Leaf for HistogramState {
    fn print(&self, visitor: &mut dyn Visitor) {
        print_quantiles(visitor, &self.counter, &self.config);
    }
}

pub(crate) struct TimerState {
    active: AtomicI64,
    rate: MeterCounter,
    timings: HistogramCounter,
    config: Arc<Configuration>,
}

impl TimerState {
    pub fn new(config: Arc<Configuration>) -> Self {
        let now = config.clock.now();
        Self {
            active: AtomicI64::new(0),
            rate: MeterCounter::new(now),
            timings: HistogramCounter::new(config.timer_mapping, config.histogram_decay, now),
            config,
        }
    }

    fn start(&self) -> Instant {
        let now = self.config.clock.now();
        self.active.fetch_add(1, Ordering::Relaxed);
        self.rate.mark(now);
        now
    }

    fn finish(&self, start: Instant) {
        let now = self.config.clock.now();
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.timings.update(now, duration_as_millis(now.saturating_duration_since(start)));
    }
}

impl Leaf for TimerState {
    fn print(&self, visitor: &mut dyn Visitor) {
        visitor.start_node();
        print_field(visitor, "active", self.active.load(Ordering::Relaxed));
        visitor.child("rate");
        print_rates(visitor, &self.rate.rates(self.config.clock.now()));
        visitor.child("timings");
        print_quantiles(visitor, &self.timings, &self.config);
        visitor.end_node();
    }
}

pub(crate) struct WindowState {
    counter: WindowedCounter,
    config: Arc<Configuration>,
}

impl WindowState {
    pub fn new(window_size: Duration, config: Arc<Configuration>) -> Self {
        Self { counter: WindowedCounter::new(window_size, config.clock.now()), config }
    }
}

impl Leaf for WindowState {
    fn print(&self, visitor: &mut dyn Visitor) {
        visitor.value(self.counter.value(self.config.clock.now()).into());
    }
}

fn print_rates(visitor: &mut dyn Visitor, rates: &MeterRates) {
    visitor.start_node();
    print_field(visitor, "one_sec", rates.one_sec);
    print_field(visitor, "one_min", rates.one_min);
    print_field(visitor, "quarter_hour", rates.quarter_hour);
    print_field(visitor, "one_hour", rates.one_hour);
    visitor.end_node();
}

fn print_quantiles(visitor: &mut dyn Visitor, counter: &HistogramCounter, config: &Configuration) {
    let values = counter.get_quantiles(config.clock.now(), &config.quantile_values);

    visitor.start_node();
    for (quantile, value) in config.quantiles.iter().zip(values) {
        print_field(visitor, quantile.label(), value);
    }
    visitor.end_node();
}

fn duration_as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// A signed integer counter.
///
/// Printed as its current value.
#[derive(Clone, Default)]
#[must_use = "counters do nothing unless you use them"]
pub struct Counter {
    inner: Option<Arc<CounterState>>,
}

impl Counter {
    /// Creates a no-op `Counter` which does nothing.
    ///
    /// Suitable when a handle must be provided but the metric is not registered anywhere, such as
    /// when no root registry has been installed.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(state: Arc<CounterState>) -> Self {
        Self { inner: Some(state) }
    }

    /// Increments the counter.
    pub fn increment(&self, value: i64) {
        if let Some(ref inner) = self.inner {
            inner.value.fetch_add(value, Ordering::Relaxed);
        }
    }

    /// Decrements the counter.
    pub fn decrement(&self, value: i64) {
        if let Some(ref inner) = self.inner {
            inner.value.fetch_sub(value, Ordering::Relaxed);
        }
    }

    /// Sets the counter.
    pub fn set(&self, value: i64) {
        if let Some(ref inner) = self.inner {
            inner.value.store(value, Ordering::Relaxed);
        }
    }

    /// Gets the current value, or zero for a no-op counter.
    pub fn value(&self) -> i64 {
        self.inner.as_ref().map_or(0, |inner| inner.value.load(Ordering::Relaxed))
    }
}

/// A gauge, whose value is computed by a callback every time it is printed.
#[derive(Clone, Default)]
#[must_use = "gauges are unregistered once every handle is dropped"]
pub struct Gauge {
    inner: Option<Arc<GaugeState>>,
}

impl Gauge {
    /// Creates a no-op `Gauge` which does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(state: Arc<GaugeState>) -> Self {
        Self { inner: Some(state) }
    }

    /// Evaluates the callback, or returns `None` for a no-op gauge.
    pub fn value(&self) -> Option<MetricValue> {
        self.inner.as_ref().map(|inner| (inner.callback)())
    }
}

/// An event rate meter.
///
/// Printed as four per-second rates, smoothed over one second, one minute, fifteen minutes and
/// one hour.
#[derive(Clone, Default)]
#[must_use = "meters do nothing unless you use them"]
pub struct Meter {
    inner: Option<Arc<MeterState>>,
}

impl Meter {
    /// Creates a no-op `Meter` which does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(state: Arc<MeterState>) -> Self {
        Self { inner: Some(state) }
    }

    /// Records a single event.
    pub fn mark(&self) {
        if let Some(ref inner) = self.inner {
            inner.counter.mark(inner.config.clock.now());
        }
    }

    /// Gets the current rates, or `None` for a no-op meter.
    pub fn rates(&self) -> Option<MeterRates> {
        self.inner.as_ref().map(|inner| inner.counter.rates(inner.config.clock.now()))
    }
}

/// A decaying histogram of observed values.
///
/// Printed as one value per configured quantile.
#[derive(Clone, Default)]
#[must_use = "histograms do nothing unless you use them"]
pub struct Histogram {
    inner: Option<Arc<HistogramState>>,
}

impl Histogram {
    /// Creates a no-op `Histogram` which does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(state: Arc<HistogramState>) -> Self {
        Self { inner: Some(state) }
    }

    /// Records an observation.
    ///
    /// Values outside of the histogram's range are counted at the nearest edge.
    pub fn update(&self, value: f64) {
        if let Some(ref inner) = self.inner {
            inner.counter.update(inner.config.clock.now(), value);
        }
    }

    /// Gets the decayed number of observations, or zero for a no-op histogram.
    pub fn total(&self) -> f64 {
        self.inner.as_ref().map_or(0.0, |inner| inner.counter.total(inner.config.clock.now()))
    }
}

/// A timer of concurrent operations.
///
/// Tracks the number of operations in flight, the rate at which they start, and a histogram of
/// how long they take, in milliseconds.
#[derive(Clone, Default)]
#[must_use = "timers do nothing unless you use them"]
pub struct Timer {
    inner: Option<Arc<TimerState>>,
}

impl Timer {
    /// Creates a no-op `Timer` which does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(state: Arc<TimerState>) -> Self {
        Self { inner: Some(state) }
    }

    /// Starts timing an operation.
    ///
    /// Every call must be paired with exactly one call to [`finish`](Timer::finish), with the
    /// returned instant.  Prefer [`time`](Timer::time), which cannot be left unpaired.
    pub fn start(&self) -> Instant {
        match self.inner {
            Some(ref inner) => inner.start(),
            None => Instant::now(),
        }
    }

    /// Finishes timing an operation that began at `start`.
    pub fn finish(&self, start: Instant) {
        if let Some(ref inner) = self.inner {
            inner.finish(start);
        }
    }

    /// Starts timing an operation that is finished when the returned guard is dropped.
    pub fn time(&self) -> TimerGuard {
        let start = self.start();
        TimerGuard { timer: self.inner.clone(), start }
    }

    /// Gets the number of operations in flight.
    pub fn active(&self) -> i64 {
        self.inner.as_ref().map_or(0, |inner| inner.active.load(Ordering::Relaxed))
    }

    /// Gets the decayed number of finished operations, or zero for a no-op timer.
    pub fn completed(&self) -> f64 {
        self.inner.as_ref().map_or(0.0, |inner| inner.timings.total(inner.config.clock.now()))
    }
}

/// An in-flight operation started by [`Timer::time`].
///
/// The operation is finished by [`finish`](TimerGuard::finish), or on drop, whichever comes first.
#[must_use = "the operation is finished as soon as the guard is dropped"]
pub struct TimerGuard {
    timer: Option<Arc<TimerState>>,
    start: Instant,
}

impl TimerGuard {
    /// Gets the instant the operation started at.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Finishes the operation.
    ///
    /// Calling this more than once has no further effect.
    pub fn finish(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.finish(self.start);
        }
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

/// A count of events over the last full window.
///
/// Printed as the number of events seen during the most recently completed window.
#[derive(Clone, Default)]
#[must_use = "windows do nothing unless you use them"]
pub struct Window {
    inner: Option<Arc<WindowState>>,
}

impl Window {
    /// Creates a no-op `Window` which does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(state: Arc<WindowState>) -> Self {
        Self { inner: Some(state) }
    }

    /// Records a single event.
    pub fn mark(&self) {
        if let Some(ref inner) = self.inner {
            inner.counter.mark(inner.config.clock.now());
        }
    }

    /// Gets the event count of the last full window, or zero for a no-op window.
    pub fn value(&self) -> i64 {
        self.inner.as_ref().map_or(0, |inner| inner.counter.value(inner.config.clock.now()))
    }
}

macro_rules! impl_debug {
    ($($handle:ident),+) => {
        $(
            impl fmt::Debug for $handle {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($handle)).field("bound", &self.inner.is_some()).finish()
                }
            }
        )+
    };
}

impl_debug!(Counter, Gauge, Meter, Histogram, Timer, Window);

impl fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGuard").field("finished", &self.timer.is_none()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{CounterState, GaugeState, TimerState};
    use super::{Counter, Histogram, Meter, Timer, Window};
    use crate::config::Configuration;
    use crate::visitor::test_util::RecordingVisitor;
    use crate::visitor::Leaf;
    use quanta::Clock;
    use std::sync::Arc;
    use std::time::Duration;

    fn events(leaf: &dyn Leaf) -> Vec<String> {
        let mut visitor = RecordingVisitor::default();
        leaf.print(&mut visitor);
        visitor.events().into_iter().map(str::to_owned).collect()
    }

    #[test]
    fn test_noop_handles() {
        let counter = Counter::noop();
        counter.increment(5);
        counter.set(3);
        assert_eq!(counter.value(), 0);

        Meter::noop().mark();
        assert!(Meter::noop().rates().is_none());

        Histogram::noop().update(1.0);
        assert_eq!(Histogram::noop().total(), 0.0);

        Window::noop().mark();
        assert_eq!(Window::noop().value(), 0);

        let timer = Timer::noop();
        let mut guard = timer.time();
        assert_eq!(timer.active(), 0);
        guard.finish();
        assert_eq!(timer.completed(), 0.0);
    }

    #[test]
    fn test_counter() {
        let state = Arc::new(CounterState::new());
        let counter = Counter::from_arc(Arc::clone(&state));

        counter.increment(10);
        counter.decrement(3);
        assert_eq!(counter.value(), 7);
        assert_eq!(events(state.as_ref()), ["int 7"]);

        counter.set(-2);
        assert_eq!(events(state.as_ref()), ["int -2"]);
    }

    #[test]
    fn test_gauge_is_evaluated_on_print() {
        let counter = Arc::new(CounterState::new());
        let source = Counter::from_arc(Arc::clone(&counter));

        let observed = source.clone();
        let gauge = GaugeState::new(move || observed.value() as f64 / 2.0);

        source.set(3);
        assert_eq!(events(&gauge), ["float 1.5"]);
        source.set(5);
        assert_eq!(events(&gauge), ["float 2.5"]);
    }

    #[test]
    fn test_timer_guard() {
        let (clock, mock) = Clock::mock();
        let config = Arc::new(Configuration { clock, ..Default::default() });
        let timer = Timer::from_arc(Arc::new(TimerState::new(config)));

        let mut guard = timer.time();
        assert_eq!(timer.active(), 1);

        mock.increment(Duration::from_millis(25));
        guard.finish();
        assert_eq!(timer.active(), 0);
        assert_eq!(timer.completed(), 1.0);

        guard.finish();
        drop(guard);
        assert_eq!(timer.active(), 0);
        assert_eq!(timer.completed(), 1.0);

        {
            let _guard = timer.time();
            assert_eq!(timer.active(), 1);
        }
        assert_eq!(timer.active(), 0);
        assert_eq!(timer.completed(), 2.0);
    }

    #[test]
    fn test_timer_print_layout() {
        let (clock, mock) = Clock::mock();
        let config = Arc::new(Configuration { clock, ..Default::default() });
        let state = Arc::new(TimerState::new(config));
        let timer = Timer::from_arc(Arc::clone(&state));

        let start = timer.start();
        mock.increment(Duration::from_millis(25));
        timer.finish(start);

        // 25ms lands in the [20, 30) bucket; every quantile is reached at the next bucket's edge.
        let events = events(state.as_ref());
        assert_eq!(events[..3], ["start", "child active", "int 0"]);
        assert_eq!(events[3..5], ["child rate", "start"]);
        assert_eq!(events[5], "child one_sec");
        assert_eq!(events[13..16], ["end", "child timings", "start"]);
        assert_eq!(
            events[16..],
            [
                "child q50",
                "float 30",
                "child q80",
                "float 30",
                "child q90",
                "float 30",
                "child q95",
                "float 30",
                "child q99",
                "float 30",
                "end",
                "end",
            ]
        );
    }
}
