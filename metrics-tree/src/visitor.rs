//! The visitor protocol used to walk a metric tree.
//!
//! Exporters implement [`Visitor`] and hand it to [`Registry::print`](crate::Registry::print).
//! The tree then drives the visitor through every live node, in name order:
//!
//! ```text
//! start_node()
//!   child("requests")  value(42)
//!   child("db")        start_node()
//!                        child("latency") start_node() ... end_node()
//!                      end_node()
//! end_node()
//! ```
//!
//! Every call to [`Visitor::child`] is followed, before the next sibling's `child` call, by either
//! exactly one [`Visitor::value`] call (the child is a leaf with a single value) or exactly one
//! [`Visitor::start_node`]/[`Visitor::end_node`] pair (the child is a branch, or a leaf reporting
//! several named values).  Visitors may rely on this.

/// A single numeric metric value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    /// An integer value.
    Integer(i64),

    /// A floating-point value.
    Float(f64),
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Integer(value)
    }
}

impl From<i32> for MetricValue {
    fn from(value: i32) -> Self {
        MetricValue::Integer(i64::from(value))
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        MetricValue::Integer(i64::from(value))
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}

/// A sink driven by a metric tree traversal.
pub trait Visitor {
    /// Enters a node: the root, a branch, or a leaf reporting several values.
    fn start_node(&mut self);

    /// Leaves the node most recently entered.
    fn end_node(&mut self);

    /// Announces the next child of the current node.
    fn child(&mut self, name: &str);

    /// Reports the value of the most recently announced child.
    fn value(&mut self, value: MetricValue);

    /// Gets the output accumulated so far.
    fn result(&self) -> String;
}

/// A node of the metric tree that can report its own values.
///
/// Every metric type implements `Leaf`.  The tree only ever holds a weak reference to a leaf, so
/// implementations are owned by their metric handles.
pub trait Leaf: Send + Sync {
    /// Drives `visitor` with the current value(s) of this leaf.
    ///
    /// Called right after the tree has announced this leaf with [`Visitor::child`], so an
    /// implementation must report exactly one value, or exactly one
    /// `start_node`/`end_node` pair.
    fn print(&self, visitor: &mut dyn Visitor);
}

/// Reports a named value as a child of the current node.
pub(crate) fn print_field<V: Into<MetricValue>>(visitor: &mut dyn Visitor, name: &str, value: V) {
    visitor.child(name);
    visitor.value(value.into());
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::{MetricValue, Visitor};

    /// A visitor that records every call as a line of text, for asserting on traversal order.
    #[derive(Default)]
    pub struct RecordingVisitor {
        events: Vec<String>,
    }

    impl RecordingVisitor {
        pub fn events(&self) -> Vec<&str> {
            self.events.iter().map(String::as_str).collect()
        }
    }

    impl Visitor for RecordingVisitor {
        fn start_node(&mut self) {
            self.events.push("start".to_string());
        }

        fn end_node(&mut self) {
            self.events.push("end".to_string());
        }

        fn child(&mut self, name: &str) {
            self.events.push(format!("child {}", name));
        }

        fn value(&mut self, value: MetricValue) {
            match value {
                MetricValue::Integer(i) => self.events.push(format!("int {}", i)),
                MetricValue::Float(f) => self.events.push(format!("float {}", f)),
            }
        }

        fn result(&self) -> String {
            self.events.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MetricValue;

    #[test]
    fn test_conversions() {
        assert_eq!(MetricValue::from(7i32), MetricValue::Integer(7));
        assert_eq!(MetricValue::from(7u32), MetricValue::Integer(7));
        assert_eq!(MetricValue::from(-7i64), MetricValue::Integer(-7));
        assert_eq!(MetricValue::from(u64::MAX), MetricValue::Integer(i64::MAX));
        assert_eq!(MetricValue::from(0.5), MetricValue::Float(0.5));
    }
}
