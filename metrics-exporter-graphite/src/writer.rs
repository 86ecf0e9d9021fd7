use std::fmt::Write as _;

use metrics_tree::{MetricValue, Visitor};
use tracing::trace;

struct MetricValueFormatter {
    int_writer: itoa::Buffer,
    float_writer: ryu::Buffer,
    scratch: String,
}

impl MetricValueFormatter {
    fn new() -> Self {
        Self { int_writer: itoa::Buffer::new(), float_writer: ryu::Buffer::new(), scratch: String::new() }
    }

    /// Formats `value` as a plain decimal.  Floats must be finite.
    fn format(&mut self, value: MetricValue) -> &str {
        let v = match value {
            MetricValue::Integer(v) => return self.int_writer.format(v),
            MetricValue::Float(v) => v,
        };

        self.scratch.clear();
        let shortest = self.float_writer.format(v);
        if shortest.contains('e') {
            // Graphite wants plain decimals; `Display` never uses an exponent.
            let _ = write!(self.scratch, "{}", v);
            if !self.scratch.contains('.') {
                self.scratch.push_str(".0");
            }
        } else {
            self.scratch.push_str(shortest);
        }
        &self.scratch
    }
}

/// A [`Visitor`] that renders a metric tree in the Graphite plaintext format.
///
/// Every value becomes one line of `<path> <value> <timestamp>\n`, where the path is the prefix
/// followed by the names of every node leading to the value, all joined with `.`.  Dots within a
/// node name would be mistaken for a path separator, so they are replaced with `_`.  The prefix is
/// used as-is, and may itself contain dots.
///
/// Integers are rendered without a fractional part, and floating-point values always as a plain
/// decimal with one, never in exponent notation.  Graphite has no representation for NaN or
/// infinities, so non-finite values are left out of the output.
pub struct GraphiteVisitor {
    prefix: String,
    timestamp: u64,
    path: Vec<String>,
    formatter: MetricValueFormatter,
    output: String,
}

impl GraphiteVisitor {
    /// Creates a new `GraphiteVisitor` stamping every line with `timestamp`.
    pub fn new<P: Into<String>>(prefix: P, timestamp: u64) -> Self {
        Self {
            prefix: prefix.into(),
            timestamp,
            path: Vec::new(),
            formatter: MetricValueFormatter::new(),
            output: String::new(),
        }
    }

    /// Gets the timestamp every line is stamped with.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Consumes the visitor, returning the rendered lines.
    pub fn into_string(self) -> String {
        self.output
    }

    fn write_path(&mut self) {
        let mut first = true;
        if !self.prefix.is_empty() {
            self.output.push_str(&self.prefix);
            first = false;
        }

        for part in &self.path {
            if !first {
                self.output.push('.');
            }
            self.output.push_str(part);
            first = false;
        }
    }
}

impl Visitor for GraphiteVisitor {
    fn start_node(&mut self) {}

    fn end_node(&mut self) {
        // The outermost node was never announced as a child.
        self.path.pop();
    }

    fn child(&mut self, name: &str) {
        self.path.push(name.replace('.', "_"));
    }

    fn value(&mut self, value: MetricValue) {
        if let MetricValue::Float(v) = value {
            if !v.is_finite() {
                trace!(path = ?self.path, value = v, "Skipping non-finite value.");
                self.path.pop();
                return;
            }
        }

        self.write_path();
        self.output.push(' ');
        self.output.push_str(self.formatter.format(value));
        self.output.push(' ');
        let timestamp = self.formatter.int_writer.format(self.timestamp);
        self.output.push_str(timestamp);
        self.output.push('\n');

        self.path.pop();
    }

    fn result(&self) -> String {
        self.output.clone()
    }
}
