//! AQI Live - live time-series synchronizer for an air-quality sensor network
//!
//! This library exposes the core modules for testing and reuse.

pub mod aqi;
pub mod backend;
pub mod common;
pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod series;
pub mod services;
pub mod sync;
