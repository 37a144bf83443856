use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::buffer::{DEFAULT_CAPACITY, RollingSeriesBuffer, Sample, UpdateMode};

/// Registry shared between the refresh cycle (writer) and readers.
pub type SharedRegistry = Arc<RwLock<SeriesRegistry>>;

/// Stable key of a measurement stream, e.g. `winsen1:pm25` or `3:1:2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Compose an id from its parts, joined with `:`.
    ///
    /// Empty parts are kept so `a::b` never collides with `a:b`.
    #[must_use]
    pub fn from_parts(parts: &[&str]) -> Self {
        Self(parts.join(":"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A registered measurement stream and its display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub id: SeriesId,
    pub display_name: String,
    pub unit: String,
    /// Backend name of the stream, substituted into endpoint templates.
    pub stream: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    /// Never fetched.
    Pending,
    /// Last fetch returned at least one reading.
    Connected,
    /// Last fetch succeeded but carried no reading.
    Warning,
    /// Last fetch failed.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesHealth {
    pub status: SeriesStatus,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

impl Default for SeriesHealth {
    fn default() -> Self {
        Self {
            status: SeriesStatus::Pending,
            last_error: None,
            last_success: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Series '{0}' is already registered")]
    Duplicate(SeriesId),

    #[error("Series '{0}' is not registered")]
    Unknown(SeriesId),
}

#[derive(Debug)]
struct Entry {
    series: Series,
    buffer: RollingSeriesBuffer,
    health: SeriesHealth,
}

/// Registered series in registration order, each owning its rolling window.
#[derive(Debug)]
pub struct SeriesRegistry {
    entries: Vec<Entry>,
    index: HashMap<SeriesId, usize>,
    capacity: NonZeroUsize,
}

impl SeriesRegistry {
    /// Create a registry whose buffers hold `capacity` samples each.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            capacity,
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// # Errors
    ///
    /// Returns `RegistryError::Duplicate` if the id is already registered.
    pub fn register(&mut self, series: Series) -> Result<(), RegistryError> {
        if self.index.contains_key(&series.id) {
            return Err(RegistryError::Duplicate(series.id));
        }

        self.index.insert(series.id.clone(), self.entries.len());
        self.entries.push(Entry {
            series,
            buffer: RollingSeriesBuffer::new(self.capacity),
            health: SeriesHealth::default(),
        });
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RegistryError::Unknown` if the id is not registered.
    pub fn get(&self, id: &SeriesId) -> Result<&Series, RegistryError> {
        self.entry(id).map(|e| &e.series)
    }

    /// Registered series in registration order.
    pub fn all(&self) -> impl Iterator<Item = &Series> + '_ {
        self.entries.iter().map(|e| &e.series)
    }

    /// # Errors
    ///
    /// Returns `RegistryError::Unknown` if the id is not registered.
    pub fn remove(&mut self, id: &SeriesId) -> Result<Series, RegistryError> {
        let position = self
            .index
            .remove(id)
            .ok_or_else(|| RegistryError::Unknown(id.clone()))?;
        let entry = self.entries.remove(position);

        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Ok(entry.series)
    }

    /// # Errors
    ///
    /// Returns `RegistryError::Unknown` if the id is not registered.
    pub fn buffer(&self, id: &SeriesId) -> Result<&RollingSeriesBuffer, RegistryError> {
        self.entry(id).map(|e| &e.buffer)
    }

    /// # Errors
    ///
    /// Returns `RegistryError::Unknown` if the id is not registered.
    pub fn health(&self, id: &SeriesId) -> Result<&SeriesHealth, RegistryError> {
        self.entry(id).map(|e| &e.health)
    }

    /// Apply the result of a successful fetch and return the new window.
    ///
    /// An empty `samples` marks the series as reachable without a reading
    /// and leaves the window as it was, whatever the mode.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unknown` if the id is not registered.
    pub fn record_samples(
        &mut self,
        id: &SeriesId,
        samples: Vec<Sample>,
        mode: UpdateMode,
    ) -> Result<Vec<Sample>, RegistryError> {
        let entry = self.entry_mut(id)?;

        let received = samples.len();
        if received > 0 && mode == UpdateMode::Replace {
            entry.buffer.clear();
        }
        for sample in samples {
            entry.buffer.append(sample);
        }

        entry.health.status = if received == 0 {
            SeriesStatus::Warning
        } else {
            SeriesStatus::Connected
        };
        entry.health.last_error = None;
        entry.health.last_success = Some(Utc::now());

        Ok(entry.buffer.snapshot())
    }

    /// Mark a failed fetch. The window is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unknown` if the id is not registered.
    pub fn record_failure(
        &mut self,
        id: &SeriesId,
        message: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let entry = self.entry_mut(id)?;
        entry.health.status = SeriesStatus::Error;
        entry.health.last_error = Some(message.into());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: &SeriesId) -> Result<&Entry, RegistryError> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::Unknown(id.clone()))
    }

    fn entry_mut(&mut self, id: &SeriesId) -> Result<&mut Entry, RegistryError> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(RegistryError::Unknown(id.clone())),
        }
    }
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
