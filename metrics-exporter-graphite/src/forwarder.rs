use std::io::Write;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error};

use crate::exporter::GraphiteExporter;

pub(crate) struct Forwarder<W> {
    exporter: GraphiteExporter,
    writer: W,
    flush_interval: Duration,
    shutdown: Receiver<()>,
}

impl<W: Write> Forwarder<W> {
    pub fn new(
        exporter: GraphiteExporter,
        writer: W,
        flush_interval: Duration,
        shutdown: Receiver<()>,
    ) -> Self {
        Self { exporter, writer, flush_interval, shutdown }
    }

    fn flush(&mut self) {
        match self.exporter.write_to(&mut self.writer) {
            Ok(bytes) => debug!(bytes, "Flushed metrics."),
            Err(e) => error!(error = %e, "Failed to flush metrics."),
        }
    }

    /// Runs the forwarder, flushing on every interval until shut down.
    ///
    /// One final flush happens on the way out, so that nothing recorded since the last interval is
    /// lost.
    pub fn run(mut self) {
        let mut next_flush = Instant::now() + self.flush_interval;
        loop {
            // If the previous flush took longer than the interval, don't wait at all.
            let wait = next_flush.saturating_duration_since(Instant::now());
            match self.shutdown.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {
                    next_flush = Instant::now() + self.flush_interval;
                    self.flush();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("Forwarder shutting down.");
                    self.flush();
                    return;
                }
            }
        }
    }
}

/// A handle to the background thread spawned by [`GraphiteBuilder::spawn`](crate::GraphiteBuilder::spawn).
///
/// Dropping the handle also stops the thread, after one final flush, but without waiting for it.
#[derive(Debug)]
pub struct GraphiteHandle {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl GraphiteHandle {
    pub(crate) fn new(shutdown: Sender<()>, thread: JoinHandle<()>) -> Self {
        Self { shutdown, thread }
    }

    /// Stops the background thread, waiting for its final flush to complete.
    pub fn shutdown(self) {
        // A full channel or a gone receiver both mean the thread is already stopping.
        let _ = self.shutdown.try_send(());
        if self.thread.join().is_err() {
            error!("Graphite forwarder thread panicked.");
        }
    }
}
