use chrono::{DateTime, Datelike, Utc};
use hikebot_core::{RiskLevel, WeatherSnapshot, WeatherSource};

/// Hourly precipitation probability as a fraction in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyProbability {
    pub time: DateTime<Utc>,
    pub probability: f64,
}

pub fn lightning_risk(precip_prob: f64) -> RiskLevel {
    if precip_prob > 0.7 {
        RiskLevel::High
    } else if precip_prob > 0.4 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

pub fn fire_risk(precip_prob: f64, precip_amount: f64) -> RiskLevel {
    if precip_prob < 0.1 && precip_amount == 0.0 {
        RiskLevel::High
    } else if precip_prob < 0.3 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Probability at the hour nearest `target`; 0 when there is no hourly data.
pub fn closest_probability(hourly: &[HourlyProbability], target: DateTime<Utc>) -> f64 {
    hourly
        .iter()
        .min_by_key(|h| (h.time - target).num_seconds().unsigned_abs())
        .map(|h| h.probability)
        .unwrap_or(0.0)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Build a live snapshot from current conditions and the hourly forecast.
pub fn derive_snapshot(
    temp_c: f64,
    precip_amount: f64,
    hourly: &[HourlyProbability],
    target: DateTime<Utc>,
) -> WeatherSnapshot {
    let precip_prob = closest_probability(hourly, target).clamp(0.0, 1.0);

    let summary = format!(
        "Current temp {:.1}°C, precip chance {:.0}%. Pack layers and check skies near exposed ridgelines.",
        temp_c,
        precip_prob * 100.0
    );

    WeatherSnapshot {
        summary,
        temp_c: round_to(temp_c, 1),
        precip_prob: round_to(precip_prob, 2),
        lightning_risk: lightning_risk(precip_prob),
        fire_risk: fire_risk(precip_prob, precip_amount),
        source: WeatherSource::Live,
    }
}

/// Seasonal stand-in used when no live forecast is available.
pub fn fallback_snapshot(target: DateTime<Utc>) -> WeatherSnapshot {
    let (summary, temp_c, precip_prob) = match target.month() {
        11 | 12 | 1 | 2 | 3 => ("Cold, 2°C, chance of snow or rain", 2.0, 0.6),
        6..=9 => ("Sunny, 22°C, clear skies", 22.0, 0.05),
        _ => ("Overcast, 12°C, light rain likely", 12.0, 0.5),
    };

    WeatherSnapshot {
        summary: format!("{summary} (seasonal estimate, live forecast unavailable)"),
        temp_c,
        precip_prob,
        lightning_risk: lightning_risk(precip_prob),
        fire_risk: fire_risk(precip_prob, 0.0),
        source: WeatherSource::Fallback,
    }
}
