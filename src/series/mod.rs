//! Series identity, rolling sample windows and the registry that owns them.

mod buffer;
mod registry;

pub use buffer::{DEFAULT_CAPACITY, RollingSeriesBuffer, Sample, UpdateMode};
pub use registry::{
    RegistryError, Series, SeriesHealth, SeriesId, SeriesRegistry, SeriesStatus, SharedRegistry,
};
