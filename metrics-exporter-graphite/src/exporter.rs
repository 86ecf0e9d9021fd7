use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use metrics_tree::Registry;
use thiserror::Error;
use tracing::trace;

use crate::writer::GraphiteVisitor;

/// Errors that could occur while exporting metrics.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The rendered metrics could not be written out.
    #[error("failed to write metrics: {0}")]
    Io(#[from] io::Error),
}

/// Renders a registry in the Graphite plaintext format.
///
/// Built with [`GraphiteBuilder`](crate::GraphiteBuilder).
#[derive(Debug, Clone)]
pub struct GraphiteExporter {
    registry: Registry,
    prefix: String,
    pruning: bool,
}

impl GraphiteExporter {
    pub(crate) fn new(registry: Registry, prefix: String, pruning: bool) -> Self {
        Self { registry, prefix, pruning }
    }

    /// Gets the registry being exported.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders every live metric, stamping each line with `timestamp`.
    ///
    /// If pruning is enabled, dead metrics and unreferenced empty branches are removed from the tree
    /// first.
    pub fn render(&self, timestamp: u64) -> String {
        if self.pruning {
            self.registry.remove_empty_nodes();
        }

        let mut visitor = GraphiteVisitor::new(self.prefix.as_str(), timestamp);
        self.registry.print(&mut visitor);
        visitor.into_string()
    }

    /// Renders every live metric, stamped with the current wall-clock time.
    pub fn render_now(&self) -> String {
        self.render(unix_timestamp())
    }

    /// Renders every live metric, stamped with the current wall-clock time, and writes the result
    /// to `writer`.
    ///
    /// Returns the number of bytes written.
    ///
    /// ## Errors
    ///
    /// If writing to `writer` fails, an error variant will be returned.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, ExportError> {
        let rendered = self.render_now();
        writer.write_all(rendered.as_bytes())?;
        writer.flush()?;

        trace!(bytes = rendered.len(), "Wrote rendered metrics.");
        Ok(rendered.len())
    }
}

/// Gets the number of whole seconds since the Unix epoch.
///
/// A system clock set before the epoch reads as zero.
pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
