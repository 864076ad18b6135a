use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use agrichain_core::{DomainError, ProductId};

pub const DEFAULT_SENSOR_TYPE: &str = "DHT11";

/// A reading as posted by a device. `timestamp` from the device is ignored; the relay
/// stamps readings with its own receive time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    pub device_id: String,
    #[serde(deserialize_with = "product_id_from_number_or_text")]
    pub product_id: ProductId,
    #[serde(default)]
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub rssi: Option<i32>,
}

/// Devices send the product id as `1` or `"1"`.
fn product_id_from_number_or_text<'de, D>(deserializer: D) -> Result<ProductId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(ProductId::new(n)),
        NumberOrText::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl NewReading {
    /// Validate and stamp with the receive time.
    pub fn into_reading(self, received_at: DateTime<Utc>) -> Result<SensorReading, DomainError> {
        let device_id = self.device_id.trim().to_string();
        if device_id.is_empty() {
            return Err(DomainError::invalid_reading("deviceId cannot be empty"));
        }
        if !self.temperature.is_finite() || !self.humidity.is_finite() {
            return Err(DomainError::invalid_reading(format!(
                "non-numeric measurement from {device_id}"
            )));
        }

        Ok(SensorReading {
            device_id,
            product_id: self.product_id,
            location: self.location,
            temperature: self.temperature,
            humidity: self.humidity,
            quality: self.quality,
            sensor_type: self
                .sensor_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SENSOR_TYPE.to_string()),
            rssi: self.rssi,
            timestamp: received_at,
        })
    }
}

/// A stored reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub device_id: String,
    pub product_id: ProductId,
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub quality: Option<String>,
    pub sensor_type: String,
    pub rssi: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

impl DeviceStatus {
    /// Online iff the device was seen strictly less than `window` ago.
    pub fn at(last_seen: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> Self {
        if now.signed_duration_since(last_seen) < window {
            DeviceStatus::Online
        } else {
            DeviceStatus::Offline
        }
    }
}

/// Latest reading of a device together with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
}

impl DeviceView {
    pub fn new(reading: SensorReading, now: DateTime<Utc>, window: Duration) -> Self {
        let last_seen = reading.timestamp;
        Self {
            status: DeviceStatus::at(last_seen, now, window),
            last_seen,
            reading,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }
}
