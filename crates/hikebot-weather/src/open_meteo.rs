use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use hikebot_core::{HikeBotError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::snapshot::HourlyProbability;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Current conditions plus hourly precipitation probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub temp_c: f64,
    pub precip_amount: f64,
    pub hourly: Vec<HourlyProbability>,
}

/// Anything that can produce a forecast for a coordinate.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<Forecast>;

    fn source_name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
    #[serde(default)]
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    #[serde(default)]
    precipitation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

impl ForecastResponse {
    fn into_forecast(self) -> Forecast {
        let hourly = self
            .hourly
            .map(|block| {
                block
                    .time
                    .iter()
                    .zip(block.precipitation_probability)
                    .filter_map(|(time, pct)| {
                        Some(HourlyProbability {
                            time: parse_time(time)?,
                            probability: pct? / 100.0,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Forecast {
            temp_c: self.current.temperature_2m,
            precip_amount: self.current.precipitation.unwrap_or(0.0),
            hourly,
        }
    }
}

/// Client for the Open-Meteo forecast API
pub struct OpenMeteoClient {
    base_url: String,
    client: Client,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HikeBotError::Upstream(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Parse a raw forecast body. Exposed for tests and offline tooling.
    pub fn parse_forecast(body: &str) -> Result<Forecast> {
        let response: ForecastResponse = serde_json::from_str(body)?;
        Ok(response.into_forecast())
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<Forecast> {
        debug!(latitude, longitude, "Requesting Open-Meteo forecast");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", "temperature_2m,precipitation".to_string()),
                ("hourly", "precipitation_probability".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| HikeBotError::Upstream(format!("Open-Meteo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(HikeBotError::Upstream(format!(
                "Open-Meteo returned {}",
                response.status()
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| HikeBotError::Upstream(format!("invalid Open-Meteo payload: {e}")))?;

        Ok(body.into_forecast())
    }

    fn source_name(&self) -> &str {
        "open-meteo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_forecast_payload() {
        let body = r#"{
            "latitude": 47.5, "longitude": -121.7,
            "current": { "time": "2025-07-12T08:00", "temperature_2m": 14.2, "precipitation": 0.0 },
            "hourly": {
                "time": ["2025-07-12T08:00", "2025-07-12T09:00", "2025-07-12T10:00"],
                "precipitation_probability": [10, null, 65]
            }
        }"#;

        let forecast = OpenMeteoClient::parse_forecast(body).unwrap();
        assert_eq!(forecast.temp_c, 14.2);
        assert_eq!(forecast.precip_amount, 0.0);
        assert_eq!(forecast.hourly.len(), 2);
        assert_eq!(
            forecast.hourly[1].time,
            Utc.with_ymd_and_hms(2025, 7, 12, 10, 0, 0).unwrap()
        );
        assert_eq!(forecast.hourly[1].probability, 0.65);
    }

    #[test]
    fn missing_hourly_block_is_empty() {
        let body = r#"{ "current": { "temperature_2m": 3.0 } }"#;
        let forecast = OpenMeteoClient::parse_forecast(body).unwrap();
        assert!(forecast.hourly.is_empty());
        assert_eq!(forecast.precip_amount, 0.0);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(OpenMeteoClient::parse_forecast(r#"{"hourly": {}}"#).is_err());
    }
}
