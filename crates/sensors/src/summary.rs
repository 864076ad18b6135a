//! Read-side summaries over stored readings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use agrichain_core::ProductId;

use crate::reading::{DeviceView, SensorReading};

/// Every retained reading for one product, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEnvironmental {
    pub product_id: ProductId,
    pub environmental_data: Vec<SensorReading>,
    pub current_reading: Option<SensorReading>,
    pub total_readings: usize,
    pub first_reading: Option<DateTime<Utc>>,
    pub last_reading: Option<DateTime<Utc>>,
}

impl ProductEnvironmental {
    /// An unknown product yields an empty summary, never an error.
    pub fn from_history(product_id: ProductId, history: &[SensorReading]) -> Self {
        Self {
            product_id,
            environmental_data: history.to_vec(),
            current_reading: history.last().cloned(),
            total_readings: history.len(),
            first_reading: history.first().map(|r| r.timestamp),
            last_reading: history.last().map(|r| r.timestamp),
        }
    }
}

/// One product's line in the environmental overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOverview {
    pub product_id: ProductId,
    pub latest_reading: Option<SensorReading>,
    pub total_readings: usize,
    pub last_update: Option<DateTime<Utc>>,
    /// Distinct device ids, in first-seen order.
    pub devices: Vec<String>,
    /// Distinct locations, in first-seen order.
    pub locations: Vec<String>,
}

impl ProductOverview {
    pub fn from_history(product_id: ProductId, history: &[SensorReading]) -> Self {
        let latest = history.last().cloned();
        Self {
            product_id,
            last_update: latest.as_ref().map(|r| r.timestamp),
            latest_reading: latest,
            total_readings: history.len(),
            devices: distinct(history.iter().map(|r| r.device_id.as_str())),
            locations: distinct(history.iter().map(|r| r.location.as_str())),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|seen| seen == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// Latest reading of every known device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceList {
    pub devices: Vec<DeviceView>,
    pub total_devices: usize,
    pub online_devices: usize,
}

impl DeviceList {
    pub fn new(devices: Vec<DeviceView>) -> Self {
        Self {
            total_devices: devices.len(),
            online_devices: devices.iter().filter(|d| d.is_online()).count(),
            devices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalOverview {
    pub products: Vec<ProductOverview>,
    pub total_products: usize,
}

impl EnvironmentalOverview {
    pub fn new(products: Vec<ProductOverview>) -> Self {
        Self {
            total_products: products.len(),
            products,
        }
    }
}

/// Relay-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatistics {
    pub total_products: usize,
    pub total_devices: usize,
    pub active_devices: usize,
    pub total_readings: usize,
    /// Seconds since the relay started.
    pub uptime: f64,
    pub server_started: DateTime<Utc>,
}

impl RelayStatistics {
    pub fn uptime_secs(started: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let elapsed = now.signed_duration_since(started);
        (elapsed.num_milliseconds().max(0) as f64) / 1000.0
    }
}
