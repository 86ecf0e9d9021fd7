//! Counter algorithms backing the metric handles.
//!
//! Every type here takes explicit timestamps and does its own locking, so they can be used
//! directly, outside of a [`Registry`](crate::Registry), when a caller wants the raw math.
mod decaying;
pub use self::decaying::DecayingCounter;

mod histogram;
pub use self::histogram::HistogramCounter;

mod mapping;
pub use self::mapping::LinearMapping;

mod meter;
pub use self::meter::{MeterCounter, MeterRates};

mod windowed;
pub use self::windowed::WindowedCounter;
