use std::thread;
use std::time::Duration;

use metrics_tree::{root, set_root, Clock, MetricValue, Registry, Visitor};

/// Flattens a traversal into `path=value` lines.
#[derive(Default)]
struct PathVisitor {
    path: Vec<String>,
    pending: Option<String>,
    lines: Vec<String>,
}

impl Visitor for PathVisitor {
    fn start_node(&mut self) {
        if let Some(name) = self.pending.take() {
            self.path.push(name);
        }
    }

    fn end_node(&mut self) {
        self.path.pop();
    }

    fn child(&mut self, name: &str) {
        self.pending = Some(name.to_string());
    }

    fn value(&mut self, value: MetricValue) {
        let name = self.pending.take().unwrap_or_default();
        let mut path = self.path.clone();
        path.push(name);

        let value = match value {
            MetricValue::Integer(i) => i.to_string(),
            MetricValue::Float(f) => format!("{:.3}", f),
        };
        self.lines.push(format!("{}={}", path.join("."), value));
    }

    fn result(&self) -> String {
        self.lines.join("\n")
    }
}

fn render(registry: &Registry) -> String {
    let mut visitor = PathVisitor::default();
    registry.print(&mut visitor);
    visitor.result()
}

#[test]
fn test_root_registry() {
    let unbound = root();
    assert!(!unbound.is_bound());
    unbound.counter("ignored").increment(1);

    let registry = Registry::new();
    set_root(registry.clone()).expect("no root installed yet");

    let counter = root().subtree("app").counter("requests");
    counter.increment(3);
    assert_eq!(render(&registry), "app.requests=3");

    let rejected = set_root(Registry::new()).expect_err("root already installed");
    assert!(rejected.into_inner().is_bound());
}

#[test]
fn test_released_metrics_are_not_printed() {
    let registry = Registry::new();
    let kept = registry.counter("kept");
    let released = registry.counter("released");
    kept.set(1);
    released.set(2);
    assert_eq!(render(&registry), "kept=1\nreleased=2");

    let clone = released.clone();
    drop(released);
    assert_eq!(render(&registry), "kept=1\nreleased=2");

    drop(clone);
    assert_eq!(render(&registry), "kept=1");
}

#[test]
fn test_pruning_respects_scoped_registries() {
    let registry = Registry::new();
    let bar = registry.subtree("bar");
    let counter = registry.subtree("foo").counter("value");

    assert!(!registry.remove_empty_nodes());
    drop(counter);
    assert!(!registry.remove_empty_nodes());

    // `foo` is gone; `bar` is empty but still held.
    let baz = bar.counter("baz");
    assert_eq!(render(&registry), "bar.baz=0");

    drop(baz);
    drop(bar);
    assert!(registry.remove_empty_nodes());
    assert_eq!(render(&registry), "");
}

#[test]
fn test_timer_activity() {
    let (clock, mock) = Clock::mock();
    let registry = Registry::builder().with_clock(clock).build();
    let timer = registry.timer("query");

    assert_eq!(timer.active(), 0);
    let start = timer.start();
    assert_eq!(timer.active(), 1);
    assert!(render(&registry).starts_with("query.active=1\n"));

    mock.increment(Duration::from_millis(1500));
    timer.finish(start);
    assert_eq!(timer.active(), 0);
    assert_eq!(timer.completed(), 1.0);

    let rendered = render(&registry);
    assert!(rendered.starts_with("query.active=0\n"));
    assert!(rendered.contains("query.timings.q50=1510.000"));
    assert!(rendered.contains("query.rate.one_min="));
}

#[test]
fn test_printing_is_idempotent() {
    let (clock, mock) = Clock::mock();
    let registry = Registry::builder().with_clock(clock).build();

    let meter = registry.subtree("http").meter("hits");
    let histogram = registry.subtree("http").histogram("size", 0.0, 1000.0);
    let timer = registry.timer("job");
    let _gauge = registry.gauge("answer", || 42);

    for i in 0..100u32 {
        meter.mark();
        histogram.update(f64::from(i) * 10.0);
        drop(timer.time());
        mock.increment(Duration::from_millis(10));
    }

    let first = render(&registry);
    let second = render(&registry);
    assert_eq!(first, second);
    assert!(first.contains("answer=42"));
    assert!(first.contains("http.hits.one_sec="));
    assert!(first.contains("http.size.q99="));
}

#[test]
fn test_meter_rate() {
    let (clock, mock) = Clock::mock();
    let registry = Registry::builder().with_clock(clock).build();
    let meter = registry.meter("events");

    // Ten events per second for ten minutes.
    for _ in 0..6000 {
        meter.mark();
        mock.increment(Duration::from_millis(100));
    }

    let rates = meter.rates().expect("meter is bound");
    assert!((rates.one_min - 10.0).abs() < 0.5, "one_min = {}", rates.one_min);
    assert!(rates.one_hour < rates.quarter_hour);
    assert!(rates.quarter_hour < rates.one_min);
}

#[test]
fn test_concurrent_updates() {
    let registry = Registry::new();
    let counter = registry.counter("hits");
    let window = registry.window("recent", Duration::from_secs(3600));
    let histogram = registry.histogram("latency", 0.0, 100.0);

    let handles = (0..8)
        .map(|_| {
            let counter = counter.clone();
            let window = window.clone();
            let histogram = histogram.clone();
            thread::spawn(move || {
                for i in 0..1000u32 {
                    counter.increment(1);
                    window.mark();
                    histogram.update(f64::from(i % 100));
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().expect("producer panicked");
    }

    assert_eq!(counter.value(), 8000);
    assert_eq!(window.value(), 0);
    assert!(histogram.total() > 7900.0);
}
