use std::io::Write;
use std::time::Duration;

use crossbeam_channel::bounded;
use metrics_tree::Registry;
use thiserror::Error;

use crate::exporter::GraphiteExporter;
use crate::forwarder::{Forwarder, GraphiteHandle};

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Errors that could occur while building a Graphite exporter.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The prefix would break the line format.
    #[error("invalid prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,

        /// Details about why the prefix was rejected.
        reason: &'static str,
    },

    /// Failed to spawn the background flush thread.
    #[error("failed to spawn background thread for exporter")]
    Backend,
}

/// Builder for a Graphite exporter.
#[derive(Debug)]
pub struct GraphiteBuilder {
    prefix: String,
    flush_interval: Duration,
    pruning: bool,
}

impl GraphiteBuilder {
    /// Creates a new [`GraphiteBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefix prepended to the path of every metric.
    ///
    /// The prefix is used verbatim, so it may contain dots to span several path components, such as
    /// `one_min.example`.
    ///
    /// Defaults to no prefix.
    ///
    /// ## Errors
    ///
    /// If the prefix contains whitespace, or starts or ends with a dot, an error variant will be
    /// returned.
    pub fn with_prefix<P: Into<String>>(mut self, prefix: P) -> Result<Self, BuildError> {
        let prefix = prefix.into();
        if prefix.chars().any(char::is_whitespace) {
            return Err(BuildError::InvalidPrefix { prefix, reason: "contains whitespace" });
        }
        if prefix.starts_with('.') || prefix.ends_with('.') {
            return Err(BuildError::InvalidPrefix { prefix, reason: "starts or ends with a dot" });
        }

        self.prefix = prefix;
        Ok(self)
    }

    /// Sets the flush interval of the background thread started by [`spawn`](GraphiteBuilder::spawn).
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Sets whether dead metrics and unreferenced empty branches are pruned before every render.
    ///
    /// Nothing else prunes the tree, so disabling this is only useful when some other exporter
    /// over the same registry already does.
    ///
    /// Defaults to `true`.
    #[must_use]
    pub fn with_pruning(mut self, pruning: bool) -> Self {
        self.pruning = pruning;
        self
    }

    /// Builds an exporter over `registry`, to be driven by the caller.
    pub fn build(self, registry: Registry) -> GraphiteExporter {
        GraphiteExporter::new(registry, self.prefix, self.pruning)
    }

    /// Builds an exporter over `registry` and spawns a background thread that writes a rendering
    /// to `writer` on every flush interval.
    ///
    /// Getting the output anywhere, such as a TCP connection to a Graphite server, is up to
    /// `writer`.  Write failures are logged, and do not stop the thread.
    ///
    /// ## Errors
    ///
    /// If the background thread cannot be spawned, an error variant will be returned.
    pub fn spawn<W>(self, registry: Registry, writer: W) -> Result<GraphiteHandle, BuildError>
    where
        W: Write + Send + 'static,
    {
        let flush_interval = self.flush_interval;
        let exporter = self.build(registry);
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let forwarder = Forwarder::new(exporter, writer, flush_interval, shutdown_rx);

        let thread = std::thread::Builder::new()
            .name("metrics-exporter-graphite-forwarder".to_string())
            .spawn(move || forwarder.run())
            .map_err(|_| BuildError::Backend)?;

        Ok(GraphiteHandle::new(shutdown_tx, thread))
    }
}

impl Default for GraphiteBuilder {
    fn default() -> Self {
        GraphiteBuilder {
            prefix: String::new(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            pruning: true,
        }
    }
}
