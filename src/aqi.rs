//! Air-quality index bands (Indian AQI) and location presentation helpers.

use serde::Serialize;
use utoipa::ToSchema;

use crate::backend::models::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
    NoData,
}

impl AqiCategory {
    #[must_use]
    pub fn from_index(aqi: Option<f64>) -> Self {
        match aqi {
            None => Self::NoData,
            Some(v) if v.is_nan() => Self::NoData,
            Some(v) if v <= 50.0 => Self::Good,
            Some(v) if v <= 100.0 => Self::Satisfactory,
            Some(v) if v <= 200.0 => Self::Moderate,
            Some(v) if v <= 300.0 => Self::Poor,
            Some(v) if v <= 400.0 => Self::VeryPoor,
            Some(_) => Self::Severe,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Severe => "Severe",
            Self::NoData => "No Data",
        }
    }

    /// Marker color as a hex string.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Good => "#00E400",
            Self::Satisfactory => "#FFFF00",
            Self::Moderate => "#FF7E00",
            Self::Poor => "#FF0000",
            Self::VeryPoor => "#8F3F97",
            Self::Severe => "#7E0023",
            Self::NoData => "#808080",
        }
    }
}

/// One labelled sub-reading of a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub label: &'static str,
    pub value: f64,
    pub unit: &'static str,
}

impl Location {
    /// Indian AQI when reported, otherwise the US index.
    #[must_use]
    pub fn aqi(&self) -> Option<f64> {
        self.aqi_in.or(self.aqi_us)
    }

    #[must_use]
    pub fn category(&self) -> AqiCategory {
        AqiCategory::from_index(self.aqi())
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        match self.city.as_deref() {
            Some(city) if !city.is_empty() => city.to_string(),
            _ => format!("Location {}", self.location_id),
        }
    }

    /// "State, Country" from whichever parts are present.
    #[must_use]
    pub fn region(&self) -> Option<String> {
        let parts: Vec<&str> = [self.state.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    /// Sub-readings that are present, in display order.
    #[must_use]
    pub fn readings(&self) -> Vec<Reading> {
        [
            ("PM2.5", self.pm2_5, "µg/m³"),
            ("PM10", self.pm10, "µg/m³"),
            ("PM1", self.pm1, "µg/m³"),
            ("CO", self.co, "ppb"),
            ("NO₂", self.no2, "ppb"),
            ("O₃", self.o3, "ppb"),
            ("SO₂", self.so2, "ppb"),
            ("Temperature", self.temperature, "°C"),
            ("Humidity", self.humidity, "%"),
            ("TVOC", self.tvoc, "ppm"),
            ("Noise", self.noise, "dB"),
        ]
        .into_iter()
        .filter_map(|(label, value, unit)| value.map(|value| Reading { label, value, unit }))
        .collect()
    }

    /// Case-insensitive match against id, place names, coordinates and indices.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        let searchable = [
            self.location_id.0.clone(),
            self.city.clone().unwrap_or_default(),
            self.state.clone().unwrap_or_default(),
            self.country.clone().unwrap_or_default(),
            self.lat.to_string(),
            self.lon.to_string(),
            optional(self.aqi_in),
            optional(self.aqi_us),
        ]
        .join(" ")
        .to_lowercase();

        searchable.contains(&term)
    }
}
