use crate::backend::BackendClient;
use crate::backend::models::TopologyResponse;
use crate::error::AppResult;
use crate::series::{RegistryError, Series, SeriesId, SeriesRegistry};

/// Display name and unit for the measurements the Winsen boards report.
fn measurement_label(measurement: &str) -> Option<(&'static str, &'static str)> {
    let label = match measurement {
        "pm1" => ("PM1.0", "µg/m³"),
        "pm25" => ("PM2.5", "µg/m³"),
        "pm10" => ("PM10", "µg/m³"),
        "co2" => ("CO₂", "ppm"),
        "voc" => ("VOC", "ppm"),
        "temp" => ("Temperature", "°C"),
        "humidity" => ("Humidity", "%"),
        "ch2o" => ("Formaldehyde", "mg/m³"),
        "co" => ("CO", "ppm"),
        "o3" => ("O₃", "ppm"),
        "no2" => ("NO₂", "ppm"),
        _ => return None,
    };
    Some(label)
}

/// Build a series from a `table/measurement` stream name.
///
/// Returns `None` when the entry is not of that form.
#[must_use]
pub fn series_from_stream(entry: &str) -> Option<Series> {
    let (table, measurement) = entry.split_once('/')?;
    let (table, measurement) = (table.trim(), measurement.trim());
    if table.is_empty() || measurement.is_empty() || measurement.contains('/') {
        return None;
    }

    let (name, unit) = match measurement_label(measurement) {
        Some((name, unit)) => (format!("{name} ({table})"), unit.to_string()),
        None => (format!("{measurement} ({table})"), String::new()),
    };

    Some(Series {
        id: SeriesId::from_parts(&[table, measurement]),
        display_name: name,
        unit,
        stream: format!("{table}/{measurement}"),
    })
}

/// Register every `table/measurement` entry, in order.
///
/// Malformed entries are skipped with a warning.
///
/// # Errors
///
/// Returns `RegistryError::Duplicate` if an entry is listed twice.
pub fn register_static(
    registry: &mut SeriesRegistry,
    entries: &[String],
) -> Result<usize, RegistryError> {
    let mut registered = 0;
    for entry in entries {
        let Some(series) = series_from_stream(entry) else {
            tracing::warn!(entry = %entry, "Ignoring malformed series entry, expected table/measurement");
            continue;
        };
        registry.register(series)?;
        registered += 1;
    }
    Ok(registered)
}

/// Register one series per (sensor, measurement) row, in payload order.
///
/// # Errors
///
/// Returns `RegistryError::Duplicate` if a series id is already present.
pub fn register_topology(
    registry: &mut SeriesRegistry,
    node_id: &str,
    topology: &TopologyResponse,
) -> Result<usize, RegistryError> {
    let mut registered = 0;
    for row in &topology.sensors {
        let sensor_id = row.sensor_id.0.as_str();
        let measurement_id = row.measurement_id.0.as_str();
        let display_name = row
            .measurement_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Sensor {sensor_id} / {measurement_id}"));

        registry.register(Series {
            id: SeriesId::from_parts(&[node_id, sensor_id, measurement_id]),
            display_name,
            unit: row.unit.clone().unwrap_or_default(),
            stream: format!("{node_id}_{sensor_id}_{measurement_id}"),
        })?;
        registered += 1;
    }
    Ok(registered)
}

/// Fetch a node's topology from the backend and register its series.
///
/// # Errors
///
/// Returns an error if the backend call fails or a series is a duplicate.
pub async fn discover_node(
    registry: &mut SeriesRegistry,
    client: &BackendClient,
    node_id: &str,
) -> AppResult<usize> {
    tracing::info!(node_id, "Discovering node topology...");

    let topology = client.node_topology(node_id).await?;
    let registered = register_topology(registry, node_id, &topology)?;

    tracing::info!(
        node_id,
        sensors = topology.sensor_ids().len(),
        series = registered,
        "Node discovery complete"
    );
    Ok(registered)
}
