//! Clothing, hiking-condition and safety guidance derived from a snapshot.

use hikebot_core::{RiskLevel, WeatherSnapshot};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Briefing {
    pub clothing: Vec<String>,
    pub conditions: Vec<String>,
    pub warnings: Vec<String>,
}

const SAFETY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Flash flood", &["flash flood", "flooding"]),
    ("Lightning risk", &["thunderstorm", "lightning"]),
    ("Extreme cold", &["freezing", "frostbite", "hypothermia"]),
    ("Heat danger", &["heat exhaustion", "heat stroke", "extreme heat"]),
    ("High winds", &["high wind", "dangerous winds"]),
    ("Poor visibility", &["dense fog", "low visibility"]),
    ("Avalanche conditions", &["avalanche", "unstable snow"]),
    ("Ice hazard", &["icy conditions", "slippery", "black ice"]),
];

fn any_of(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

fn clothing_for(temp_f: f64, text: &str) -> Vec<String> {
    let base: &[&str] = if temp_f <= 32.0 {
        &["insulated jacket", "warm layers", "winter hat", "gloves", "insulated boots"]
    } else if temp_f <= 50.0 {
        &["warm jacket", "long pants", "warm hat", "gloves"]
    } else if temp_f <= 65.0 {
        &["light jacket", "long pants", "light sweater"]
    } else if temp_f <= 75.0 {
        &["t-shirt", "long pants or shorts", "light layer"]
    } else if temp_f <= 85.0 {
        &["t-shirt", "shorts", "sun hat"]
    } else {
        &["lightweight clothing", "sun hat", "cooling towel"]
    };

    let mut clothing: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    if any_of(text, &["rain", "shower", "storm"]) {
        clothing.push("rain jacket".into());
        clothing.push("waterproof pants".into());
    }
    if any_of(text, &["wind", "gusts"]) {
        clothing.push("windproof layer".into());
    }
    if any_of(text, &["sun", "clear", "sunny"]) {
        clothing.push("sunglasses".into());
        clothing.push("sun protection".into());
    }
    if any_of(text, &["snow", "ice", "slippery"]) {
        clothing.push("traction devices".into());
        clothing.push("waterproof boots".into());
    }
    clothing
}

fn conditions_for(temp_f: f64, text: &str) -> Vec<String> {
    let mut conditions = Vec::new();
    if temp_f <= 20.0 || temp_f >= 95.0 {
        conditions.push("Extreme temperature - use caution".to_string());
    } else if temp_f <= 35.0 || temp_f >= 85.0 {
        conditions.push("Challenging temperature conditions".to_string());
    } else {
        conditions.push("Good temperature for hiking".to_string());
    }

    if any_of(text, &["thunderstorm", "severe"]) {
        conditions.push("Dangerous weather - avoid hiking".to_string());
    } else if any_of(text, &["heavy rain", "snow"]) {
        conditions.push("Poor hiking conditions".to_string());
    } else if any_of(text, &["light rain", "scattered showers"]) {
        conditions.push("Fair conditions with precautions".to_string());
    } else if any_of(text, &["sunny", "clear", "partly cloudy"]) {
        conditions.push("Excellent hiking weather".to_string());
    }
    conditions
}

fn warnings_for(snapshot: &WeatherSnapshot, text: &str) -> Vec<String> {
    let mut warnings: Vec<String> = SAFETY_KEYWORDS
        .iter()
        .filter(|(_, words)| any_of(text, words))
        .map(|(label, _)| label.to_string())
        .collect();

    if snapshot.lightning_risk == RiskLevel::High && !warnings.iter().any(|w| w == "Lightning risk")
    {
        warnings.push("Lightning risk".to_string());
    }
    if snapshot.fire_risk == RiskLevel::High {
        warnings.push("Elevated fire danger".to_string());
    }
    warnings
}

pub fn briefing(snapshot: &WeatherSnapshot) -> Briefing {
    let temp_f = celsius_to_fahrenheit(snapshot.temp_c);
    let text = snapshot.summary.to_lowercase();

    Briefing {
        clothing: clothing_for(temp_f, &text),
        conditions: conditions_for(temp_f, &text),
        warnings: warnings_for(snapshot, &text),
    }
}

impl Briefing {
    /// Single line for chat announcements.
    pub fn headline(&self) -> String {
        let warnings = if self.warnings.is_empty() {
            "No specific warnings".to_string()
        } else {
            self.warnings.join("; ")
        };
        format!("{}. {}", self.conditions.join("; "), warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fallback_snapshot;
    use chrono::{TimeZone, Utc};
    use hikebot_core::WeatherSource;

    fn snapshot(summary: &str, temp_c: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            summary: summary.to_string(),
            temp_c,
            precip_prob: 0.2,
            lightning_risk: RiskLevel::Low,
            fire_risk: RiskLevel::Low,
            source: WeatherSource::Live,
        }
    }

    #[test]
    fn temperature_bands() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        let cold = briefing(&snapshot("overcast", -10.0));
        assert!(cold.clothing.contains(&"insulated boots".to_string()));
        assert_eq!(cold.conditions[0], "Extreme temperature - use caution");

        let mild = briefing(&snapshot("overcast", 15.0));
        assert_eq!(mild.clothing[0], "light jacket");
        assert_eq!(mild.conditions, vec!["Good temperature for hiking"]);
    }

    #[test]
    fn keyword_rules() {
        let b = briefing(&snapshot("Thunderstorm with heavy rain and flash flooding", 20.0));
        assert!(b.clothing.contains(&"rain jacket".to_string()));
        assert_eq!(b.conditions[1], "Dangerous weather - avoid hiking");
        assert_eq!(b.warnings, vec!["Flash flood", "Lightning risk"]);
    }

    #[test]
    fn summer_fallback_flags_fire() {
        let snap = fallback_snapshot(Utc.with_ymd_and_hms(2025, 8, 2, 9, 0, 0).unwrap());
        let b = briefing(&snap);
        assert!(b.clothing.contains(&"sunglasses".to_string()));
        assert!(b.conditions.contains(&"Excellent hiking weather".to_string()));
        assert!(b.warnings.contains(&"Elevated fire danger".to_string()));
        assert!(b.headline().contains("Elevated fire danger"));
    }
}
