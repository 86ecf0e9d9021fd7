use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::config::{Configuration, RegistryBuilder};
use crate::data::LinearMapping;
use crate::error::SetRootError;
use crate::handles::{
    Counter, CounterState, Gauge, GaugeState, Histogram, HistogramState, Meter, MeterState, Timer,
    TimerState, Window, WindowState,
};
use crate::tree::Branch;
use crate::visitor::{Leaf, MetricValue, Visitor};

static ROOT: OnceCell<Registry> = OnceCell::new();

#[derive(Clone)]
struct Inner {
    branch: Arc<Branch>,
    config: Arc<Configuration>,
}

impl Inner {
    fn register<L: Leaf + 'static>(&self, name: &str, state: L) -> Arc<L> {
        let state = Arc::new(state);
        let leaf = Arc::downgrade(&state) as Weak<dyn Leaf>;
        self.branch.add_leaf(name, leaf);
        state
    }
}

/// A view over one branch of a metric tree.
///
/// A registry creates metrics under its branch, and scopes further registries to child branches
/// with [`subtree`](Registry::subtree).  Every registry derived from the same root shares its
/// configuration, including the clock.
///
/// Creating a metric under a name that is already taken replaces whatever was there: the old
/// metric keeps working for whoever holds its handles, but it is no longer reachable from the tree.
///
/// The default registry is *unbound*: it has no tree at all, and only hands out no-op metrics.
/// This is what [`root`] returns until a root registry has been installed.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Option<Inner>,
}

impl Registry {
    /// Creates a new root registry with the default configuration.
    pub fn new() -> Self {
        RegistryBuilder::new().build()
    }

    /// Creates a [`RegistryBuilder`] to configure a new root registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn from_parts(branch: Arc<Branch>, config: Arc<Configuration>) -> Self {
        Self { inner: Some(Inner { branch, config }) }
    }

    /// Returns `true` if this registry is backed by a metric tree.
    pub fn is_bound(&self) -> bool {
        self.inner.is_some()
    }

    /// Gets a registry scoped to the child branch called `name`, creating the branch if necessary.
    ///
    /// The branch survives [`remove_empty_nodes`](Registry::remove_empty_nodes) for as long as the
    /// returned registry, or any clone of it, is alive.
    pub fn subtree(&self, name: &str) -> Registry {
        match self.inner {
            Some(ref inner) => {
                Self::from_parts(inner.branch.get_branch(name), Arc::clone(&inner.config))
            }
            None => Self::default(),
        }
    }

    /// Creates a counter called `name`.
    pub fn counter(&self, name: &str) -> Counter {
        match self.inner {
            Some(ref inner) => Counter::from_arc(inner.register(name, CounterState::new())),
            None => Counter::noop(),
        }
    }

    /// Creates a gauge called `name`, reporting whatever `callback` returns when printed.
    ///
    /// The callback runs while the tree is being walked.  It may create metrics or prune the tree,
    /// but such changes only show up in the next traversal.
    pub fn gauge<F, V>(&self, name: &str, callback: F) -> Gauge
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<MetricValue> + 'static,
    {
        match self.inner {
            Some(ref inner) => Gauge::from_arc(inner.register(name, GaugeState::new(callback))),
            None => Gauge::noop(),
        }
    }

    /// Creates a meter called `name`.
    pub fn meter(&self, name: &str) -> Meter {
        match self.inner {
            Some(ref inner) => {
                Meter::from_arc(inner.register(name, MeterState::new(Arc::clone(&inner.config))))
            }
            None => Meter::noop(),
        }
    }

    /// Creates a histogram called `name` over the range `[min, max]`, using the configured number
    /// of buckets.
    ///
    /// # Panics
    /// Panics if `max` is not greater than `min`.
    pub fn histogram(&self, name: &str, min: f64, max: f64) -> Histogram {
        let buckets = self.inner.as_ref().map_or(1, |inner| inner.config.histogram_buckets);
        self.histogram_with_buckets(name, min, max, buckets)
    }

    /// Creates a histogram called `name` over the range `[min, max]`, split into `buckets` buckets.
    ///
    /// # Panics
    /// Panics if `max` is not greater than `min`, or if `buckets` is zero.
    pub fn histogram_with_buckets(&self, name: &str, min: f64, max: f64, buckets: usize) -> Histogram {
        let mapping = LinearMapping::new(min, max, buckets);
        match self.inner {
            Some(ref inner) => Histogram::from_arc(
                inner.register(name, HistogramState::new(mapping, Arc::clone(&inner.config))),
            ),
            None => Histogram::noop(),
        }
    }

    /// Creates a timer called `name`.
    pub fn timer(&self, name: &str) -> Timer {
        match self.inner {
            Some(ref inner) => {
                Timer::from_arc(inner.register(name, TimerState::new(Arc::clone(&inner.config))))
            }
            None => Timer::noop(),
        }
    }

    /// Creates a windowed event count called `name`, reporting the number of events seen over the
    /// last full `window_size`.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn window(&self, name: &str, window_size: Duration) -> Window {
        assert!(!window_size.is_zero(), "window size must be non-zero");
        match self.inner {
            Some(ref inner) => Window::from_arc(
                inner.register(name, WindowState::new(window_size, Arc::clone(&inner.config))),
            ),
            None => Window::noop(),
        }
    }

    /// Drives `visitor` over every live metric beneath this registry's branch.
    ///
    /// Does nothing for an unbound registry.
    pub fn print(&self, visitor: &mut dyn Visitor) {
        if let Some(ref inner) = self.inner {
            inner.branch.print(visitor);
        }
    }

    /// Removes dropped metrics and unreferenced empty branches beneath this registry's branch.
    ///
    /// Returns `true` if the branch is empty afterwards.  An unbound registry is always empty.
    pub fn remove_empty_nodes(&self) -> bool {
        self.inner.as_ref().map_or(true, |inner| inner.branch.remove_empty_nodes())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Registry");
        match self.inner {
            Some(ref inner) => debug.field("children", &inner.branch.len()),
            None => debug.field("bound", &false),
        };
        debug.finish()
    }
}

/// Installs the process-wide root registry.
///
/// Only the first call succeeds: the root cannot be replaced once installed.
///
/// ## Errors
///
/// If a root registry has already been installed, the given registry is handed back in the error.
pub fn set_root(registry: Registry) -> Result<(), SetRootError> {
    ROOT.set(registry).map_err(SetRootError)?;
    debug!("Installed root metrics registry.");
    Ok(())
}

/// Gets the process-wide root registry.
///
/// If no root registry has been installed, an unbound registry is returned, so that libraries can
/// be instrumented unconditionally and only report once the application opts in.
pub fn root() -> Registry {
    ROOT.get().cloned().unwrap_or_default()
}
