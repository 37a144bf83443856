use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier that the backend may send either as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawId")]
pub struct EntityId(pub String);

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<RawId> for EntityId {
    fn from(raw: RawId) -> Self {
        Self(match raw {
            RawId::Int(i) => i.to_string(),
            RawId::Float(f) => f.to_string(),
            RawId::Text(s) => s,
        })
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Response from the node listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NodesResponse {
    #[serde(default)]
    pub nodes: Vec<EntityId>,
}

/// Response from the latest-reading endpoint of one stream.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestReading {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Response from the history endpoint of one stream.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub data: Vec<HistoryRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRow {
    #[serde(default)]
    pub sensor_value: Option<f64>,
    pub timestamp: String,
}

impl HistoryRow {
    /// Timestamp as UTC, or `None` if it cannot be parsed.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Response from the node topology endpoint: one row per measurement.
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyResponse {
    #[serde(default)]
    pub sensors: Vec<MeasurementRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementRow {
    pub sensor_id: EntityId,
    pub measurement_id: EntityId,
    #[serde(default)]
    pub measurement_name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl TopologyResponse {
    /// Distinct sensor ids in payload order.
    #[must_use]
    pub fn sensor_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for row in &self.sensors {
            if !ids.contains(&row.sensor_id.0.as_str()) {
                ids.push(&row.sensor_id.0);
            }
        }
        ids
    }
}

/// Response from the location listing used by the map.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationsResponse {
    #[serde(default)]
    pub locations: Vec<Location>,
}

/// A monitoring location with its latest environmental readings.
///
/// Every reading is independently nullable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "locationId")]
    pub location_id: EntityId,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "AQI_IN", default)]
    pub aqi_in: Option<f64>,
    #[serde(rename = "AQI_US", default)]
    pub aqi_us: Option<f64>,
    #[serde(rename = "PM2_5_UGM3", default)]
    pub pm2_5: Option<f64>,
    #[serde(rename = "PM10_UGM3", default)]
    pub pm10: Option<f64>,
    #[serde(rename = "PM1_UGM3", default)]
    pub pm1: Option<f64>,
    #[serde(rename = "CO_PPB", default)]
    pub co: Option<f64>,
    #[serde(rename = "NO2_PPB", default)]
    pub no2: Option<f64>,
    #[serde(rename = "O3_PPB", default)]
    pub o3: Option<f64>,
    #[serde(rename = "SO2_PPB", default)]
    pub so2: Option<f64>,
    #[serde(rename = "T_C", default)]
    pub temperature: Option<f64>,
    #[serde(rename = "H_PERCENT", default)]
    pub humidity: Option<f64>,
    #[serde(rename = "TVOC_PPM", default)]
    pub tvoc: Option<f64>,
    #[serde(rename = "Noise_DB", default)]
    pub noise: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Parse an RFC 3339 or naive ISO-8601 timestamp. Naive values are UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let nodes: NodesResponse = serde_json::from_str(r#"{"nodes": [1, "2", 3.5]}"#).unwrap();
        let ids: Vec<&str> = nodes.nodes.iter().map(|n| n.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3.5"]);
    }

    #[test]
    fn parses_python_isoformat_and_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T14:00:00+02:00"), Some(expected));
        assert!(parse_timestamp("2024-05-01T12:00:00.250000").is_some());
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn location_readings_are_nullable() {
        let json = r#"{
            "locationId": "kathmandu-1",
            "city": "Kathmandu",
            "lat": 27.7,
            "lon": 85.3,
            "AQI_IN": null,
            "AQI_US": 88,
            "PM2_5_UGM3": 31.5
        }"#;
        let location: Location = serde_json::from_str(json).unwrap();
        assert_eq!(location.aqi_in, None);
        assert_eq!(location.aqi_us, Some(88.0));
        assert_eq!(location.pm2_5, Some(31.5));
        assert_eq!(location.noise, None);
    }

    #[test]
    fn topology_lists_distinct_sensors_in_payload_order() {
        let json = r#"{"sensors": [
            {"sensor_id": 1, "measurement_id": 1, "measurement_name": "AQI", "unit": ""},
            {"sensor_id": 2, "measurement_id": 1, "measurement_name": "PM2.5", "unit": "ug/m3"},
            {"sensor_id": 1, "measurement_id": 2, "measurement_name": "PM10", "unit": "ug/m3"}
        ]}"#;
        let topology: TopologyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(topology.sensor_ids(), vec!["1", "2"]);
        assert_eq!(topology.sensors[2].measurement_id.0, "2");
    }
}
