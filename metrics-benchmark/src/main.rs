use getopts::Options;
use hdrhistogram::{CreationError, Histogram as HdrHistogram};
use log::{debug, error, info};
use metrics_exporter_graphite::{GraphiteBuilder, GraphiteExporter};
use metrics_tree::{root, set_root, Counter, Histogram, Meter, Registry, Timer};
use portable_atomic::AtomicU64;
use quanta::Clock;
use std::{
    env,
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

const LOOP_SAMPLE: u64 = 1000;

/// Operations performed against the registry on every loop iteration.
const OPS_PER_LOOP: u64 = 4;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    /// Handles are created once, up front.
    Fast,

    /// The counter is looked up through the tree, and recreated, on every iteration.
    Slow,
}

struct Handles {
    counter: Counter,
    meter: Meter,
    histogram: Histogram,
    timer: Timer,
}

impl Handles {
    fn new(registry: &Registry) -> Handles {
        Handles {
            counter: registry.counter("ok"),
            meter: registry.meter("rate"),
            histogram: registry.histogram("loop_nanos", 0.0, 10_000.0),
            timer: registry.timer("iteration"),
        }
    }
}

struct Generator {
    id: usize,
    hist: HdrHistogram<u64>,
    done: Arc<AtomicBool>,
    rate_counter: Arc<AtomicU64>,
}

impl Generator {
    fn new(
        id: usize,
        done: Arc<AtomicBool>,
        rate_counter: Arc<AtomicU64>,
    ) -> Result<Generator, CreationError> {
        Ok(Generator { id, hist: new_histogram()?, done, rate_counter })
    }

    fn run(&mut self, mode: Mode) {
        let clock = Clock::new();
        let registry = root().subtree("producers").subtree(&self.id.to_string());
        let handles = Handles::new(&registry);

        let mut loop_counter = 0;
        let mut t0 = clock.recent();

        loop {
            loop_counter += 1;

            let t1 = clock.recent();
            let start = if loop_counter % LOOP_SAMPLE == 0 { Some(clock.now()) } else { None };

            let guard = handles.timer.time();
            match mode {
                Mode::Fast => handles.counter.increment(1),
                Mode::Slow => {
                    root().subtree("producers").subtree(&self.id.to_string()).counter("ok").increment(1)
                }
            }
            handles.meter.mark();
            handles.histogram.update(t1.duration_since(t0).as_nanos() as f64);
            drop(guard);

            if let Some(val) = start {
                let delta = clock.now() - val;
                self.hist.saturating_record(delta.as_nanos() as u64);

                // We also increment our global counter for the sample rate here.
                self.rate_counter.fetch_add(LOOP_SAMPLE * OPS_PER_LOOP, Ordering::AcqRel);

                if self.done.load(Ordering::Relaxed) {
                    break;
                }
            }

            t0 = t1;
        }
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        info!(
            "    sender latency: min: {:8} p50: {:8} p95: {:8} p99: {:8} p999: {:8} max: {:8}",
            nanos_to_readable(self.hist.min()),
            nanos_to_readable(self.hist.value_at_percentile(50.0)),
            nanos_to_readable(self.hist.value_at_percentile(95.0)),
            nanos_to_readable(self.hist.value_at_percentile(99.0)),
            nanos_to_readable(self.hist.value_at_percentile(99.9)),
            nanos_to_readable(self.hist.max())
        );
    }
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("d", "duration", "number of seconds to run the benchmark", "INTEGER");
    opts.optopt(
        "m",
        "mode",
        "whether to run the benchmark in slow or fast mode (tree lookups vs cached handles)",
        "STRING",
    );
    opts.optopt("p", "producers", "number of producers", "INTEGER");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        error!("Benchmark failed: {}", e);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            error!("Failed to parse command line args: {}", f);
            return Ok(());
        }
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return Ok(());
    }

    info!("metrics-tree benchmark");

    let seconds: u64 = matches.opt_str("duration").unwrap_or_else(|| "60".to_owned()).parse()?;
    let producers: usize =
        matches.opt_str("producers").unwrap_or_else(|| "1".to_owned()).parse()?;
    let mode = match matches.opt_str("mode") {
        Some(s) if s.eq_ignore_ascii_case("fast") => Mode::Fast,
        _ => Mode::Slow,
    };

    info!("duration: {}s", seconds);
    info!("producers: {}", producers);
    info!("mode: {}", if mode == Mode::Fast { "fast" } else { "slow" });

    let registry = Registry::new();
    set_root(registry.clone())?;
    let exporter = GraphiteBuilder::new().with_prefix("benchmark")?.build(registry);

    info!("registry configured");

    // Spin up our sample producers.
    let done = Arc::new(AtomicBool::new(false));
    let rate_counter = Arc::new(AtomicU64::new(0));
    let mut handles = Vec::new();

    for id in 0..producers {
        let mut gen = Generator::new(id, done.clone(), rate_counter.clone())?;
        let handle = thread::spawn(move || gen.run(mode));

        handles.push(handle);
    }

    thread::spawn(|| loop {
        thread::sleep(Duration::from_millis(10));
        quanta::set_recent(quanta::Instant::now());
    });

    // Poll the exporter to figure out the sample rate.
    let mut total = 0;
    let mut t0 = Instant::now();

    let mut render_hist = new_histogram()?;
    for _ in 0..seconds {
        let t1 = Instant::now();

        let rendered = render(&exporter, &mut render_hist);
        debug!("rendered {} bytes", rendered);

        let turn_total = rate_counter.load(Ordering::Acquire);
        let turn_delta = turn_total - total;
        total = turn_total;
        let rate = turn_delta as f64 / (t1 - t0).as_secs_f64();

        info!("sample ingest rate: {:.0} samples/sec", rate);
        t0 = t1;
        thread::sleep(Duration::new(1, 0));
    }

    info!("--------------------------------------------------------------------------------");
    info!(" ingested samples total: {}", total);
    info!(
        "   exporter render: min: {:8} p50: {:8} p95: {:8} p99: {:8} p999: {:8} max: {:8}",
        nanos_to_readable(render_hist.min()),
        nanos_to_readable(render_hist.value_at_percentile(50.0)),
        nanos_to_readable(render_hist.value_at_percentile(95.0)),
        nanos_to_readable(render_hist.value_at_percentile(99.0)),
        nanos_to_readable(render_hist.value_at_percentile(99.9)),
        nanos_to_readable(render_hist.max())
    );

    // Wait for the producers to finish so we can get their stats too.
    done.store(true, Ordering::SeqCst);
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

/// Renders the whole tree once, recording how long it took, and returns the rendered size.
fn render(exporter: &GraphiteExporter, hist: &mut HdrHistogram<u64>) -> usize {
    let start = Instant::now();
    let rendered = exporter.render_now();
    hist.saturating_record((Instant::now() - start).as_nanos() as u64);
    rendered.len()
}

fn new_histogram() -> Result<HdrHistogram<u64>, CreationError> {
    HdrHistogram::<u64>::new_with_bounds(1, u64::MAX, 3)
}

fn nanos_to_readable(t: u64) -> String {
    let f = t as f64;
    if f < 1_000.0 {
        format!("{}ns", f)
    } else if f < 1_000_000.0 {
        format!("{:.0}μs", f / 1_000.0)
    } else if f < 2_000_000_000.0 {
        format!("{:.2}ms", f / 1_000_000.0)
    } else {
        format!("{:.3}s", f / 1_000_000_000.0)
    }
}
