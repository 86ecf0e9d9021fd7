//! Hierarchical, in-process metrics.
//!
//! Applications create named metrics in a tree of [`Registry`] branches, update them on the hot
//! path, and periodically walk the tree with a [`Visitor`] to export current values.
//!
//! # Metrics
//! - [`Counter`]: a signed integer, incremented, decremented or set directly.
//! - [`Gauge`]: a value computed by a callback whenever the tree is walked.
//! - [`Meter`]: event rates, smoothed over one second, one minute, fifteen minutes and one hour.
//! - [`Histogram`]: quantiles of recently observed values.
//! - [`Timer`]: operations in flight, their start rate and a histogram of their durations.
//! - [`Window`]: the number of events seen over the last full fixed-size window.
//!
//! Rates and histograms decay exponentially, so they describe recent behavior rather than the
//! whole lifetime of the process.
//!
//! # Ownership
//! The tree only holds weak references to metrics.  A metric is owned by its handles, and once the
//! last clone of a handle is dropped, the metric disappears from the tree:
//!
//! ```
//! use metrics_tree::Registry;
//!
//! let registry = Registry::new();
//! let requests = registry.subtree("http").counter("requests");
//! requests.increment(1);
//!
//! drop(requests);
//!
//! // The `http` branch is now empty, and nothing else refers to it.
//! assert!(registry.remove_empty_nodes());
//! ```
//!
//! Pruning dead metrics and empty branches is never automatic: exporters call
//! [`Registry::remove_empty_nodes`] periodically, usually right before printing.
//!
//! # Root registry
//! Libraries usually instrument themselves through [`root`], which hands out no-op metrics until
//! the application installs a real registry with [`set_root`].
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod config;
pub use self::config::RegistryBuilder;

pub mod data;

mod error;
pub use self::error::{BuildError, SetRootError};

mod handles;
pub use self::handles::{Counter, Gauge, Histogram, Meter, Timer, TimerGuard, Window};

pub mod lock;

mod quantile;
pub use self::quantile::{parse_quantiles, Quantile};

mod registry;
pub use self::registry::{root, set_root, Registry};

mod tree;
pub use self::tree::Branch;

mod visitor;
pub use self::visitor::{Leaf, MetricValue, Visitor};

pub use quanta::{Clock, Instant};
