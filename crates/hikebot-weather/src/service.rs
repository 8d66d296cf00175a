use chrono::{DateTime, Timelike, Utc};
use hikebot_core::{HikeBotError, Result, Route, WeatherConfig, WeatherSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheStats, TtlCache};
use crate::open_meteo::{ForecastSource, OpenMeteoClient};
use crate::snapshot::{derive_snapshot, fallback_snapshot};

/// Cache key: coordinates rounded to two decimals plus the target hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    lat_centi: i64,
    lon_centi: i64,
    hour: i64,
}

impl SnapshotKey {
    pub fn new(latitude: f64, longitude: f64, target: DateTime<Utc>) -> Self {
        let hour_start = target
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(target);
        Self {
            lat_centi: (latitude * 100.0).round() as i64,
            lon_centi: (longitude * 100.0).round() as i64,
            hour: hour_start.timestamp(),
        }
    }
}

/// Weather lookups with caching and seasonal fallback.
pub struct WeatherService {
    source: Option<Arc<dyn ForecastSource>>,
    cache: TtlCache<SnapshotKey, WeatherSnapshot>,
}

impl WeatherService {
    pub fn from_config(config: &WeatherConfig) -> Result<Self> {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        if config.offline {
            return Ok(Self::offline(ttl));
        }
        let client = OpenMeteoClient::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::with_source(Arc::new(client), ttl))
    }

    pub fn with_source(source: Arc<dyn ForecastSource>, ttl: Duration) -> Self {
        Self {
            source: Some(source),
            cache: TtlCache::new(ttl),
        }
    }

    /// Never touches the network; every lookup returns the seasonal fallback.
    pub fn offline(ttl: Duration) -> Self {
        Self {
            source: None,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.source.is_none()
    }

    /// Snapshot for a route at `target`. Fails only when the route has no coordinates.
    pub async fn snapshot(&self, route: &Route, target: DateTime<Utc>) -> Result<WeatherSnapshot> {
        let (lat, lon) = route.coordinates().ok_or_else(|| {
            HikeBotError::validation(format!("route {} has no coordinates", route.id))
        })?;
        Ok(self.snapshot_at(lat, lon, target).await)
    }

    pub async fn snapshot_at(&self, latitude: f64, longitude: f64, target: DateTime<Utc>) -> WeatherSnapshot {
        let Some(source) = &self.source else {
            return fallback_snapshot(target);
        };

        let key = SnapshotKey::new(latitude, longitude, target);
        if let Some(hit) = self.cache.get(&key) {
            debug!(latitude, longitude, "Weather cache hit");
            return hit;
        }

        match source.forecast(latitude, longitude).await {
            Ok(forecast) => {
                let snapshot = derive_snapshot(
                    forecast.temp_c,
                    forecast.precip_amount,
                    &forecast.hourly,
                    target,
                );
                self.cache.insert(key, snapshot.clone());
                snapshot
            }
            Err(e) => {
                warn!(
                    source = source.source_name(),
                    latitude,
                    longitude,
                    error = %e,
                    "Live weather unavailable, using seasonal fallback"
                );
                fallback_snapshot(target)
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
