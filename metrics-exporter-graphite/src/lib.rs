//! A [`metrics_tree`] exporter that renders the metric tree in the [Graphite plaintext][plaintext]
//! format.
//!
//! [plaintext]: https://graphite.readthedocs.io/en/latest/feeding-carbon.html#the-plaintext-protocol
//!
//! # Usage
//!
//! ```no_run
//! # use metrics_exporter_graphite::GraphiteBuilder;
//! # use metrics_tree::Registry;
//! # use std::net::TcpStream;
//! # use std::time::Duration;
//! let registry = Registry::new();
//! let requests = registry.subtree("http").counter("requests");
//!
//! // Render on demand...
//! let exporter = GraphiteBuilder::new()
//!     .with_prefix("one_min.example")
//!     .expect("prefix is valid")
//!     .build(registry.clone());
//! print!("{}", exporter.render_now());
//!
//! // ...or let a background thread write a rendering to a stream of your choice on an interval.
//! let stream = TcpStream::connect("127.0.0.1:2003").expect("failed to connect to Graphite");
//! let handle = GraphiteBuilder::new()
//!     .with_flush_interval(Duration::from_secs(60))
//!     .spawn(registry, stream)
//!     .expect("failed to spawn exporter");
//!
//! requests.increment(1);
//! handle.shutdown();
//! ```
//!
//! # Format
//!
//! Every value becomes one line, `<path> <value> <timestamp>`.  Metrics reporting several values,
//! such as meters, histograms and timers, produce one line per value, under synthetic child names:
//!
//! ```text
//! one_min.example.http.requests 1 1700000000
//! one_min.example.http.hits.one_sec 0.97 1700000000
//! one_min.example.http.hits.one_min 1.0 1700000000
//! one_min.example.db.query.timings.q99 120.0 1700000000
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, GraphiteBuilder};

mod exporter;
pub use self::exporter::{ExportError, GraphiteExporter};

mod forwarder;
pub use self::forwarder::GraphiteHandle;

mod writer;
pub use self::writer::GraphiteVisitor;
