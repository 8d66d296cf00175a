//! Client and record normalisation for the Waymarked Trails API.

use hikebot_core::{Difficulty, HikeBotError, Result, Route, RouteTag};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://hiking.waymarkedtrails.org/api/v1";
pub const DEFAULT_THEME: &str = "hiking";
pub const DEFAULT_LIMIT: usize = 25;

/// Bounding box as (min_lon, min_lat, max_lon, max_lat).
pub type BoundingBox = [f64; 4];

pub struct WaymarkedClient {
    base_url: String,
    client: Client,
}

impl WaymarkedClient {
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

    fn routes_url(
        &self,
        theme: Option<&str>,
        bbox: Option<BoundingBox>,
        limit: Option<usize>,
    ) -> Result<Url> {
        let raw = format!("{}/routes", self.base_url.trim_end_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| HikeBotError::validation(format!("invalid Waymarked URL {raw}: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(theme) = theme {
                query.append_pair("theme", theme);
            }
            if let Some(bbox) = bbox {
                let joined = bbox.iter().map(f64::to_string).collect::<Vec<_>>().join(",");
                query.append_pair("bbox", &joined);
            }
            if let Some(limit) = limit.filter(|l| *l > 0) {
                query.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    pub async fn fetch_routes(
        &self,
        theme: Option<&str>,
        bbox: Option<BoundingBox>,
        limit: Option<usize>,
    ) -> Result<Vec<Route>> {
        let url = self.routes_url(theme, bbox, limit)?;
        debug!(url = %url, "Fetching Waymarked Trails routes");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HikeBotError::Upstream(format!("Waymarked request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(HikeBotError::Upstream(format!(
                "Waymarked Trails returned {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| HikeBotError::Upstream(format!("invalid Waymarked payload: {e}")))?;

        normalize_payload(&payload)
    }
}

/// Parses `"min_lon,min_lat,max_lon,max_lat"`; logs and returns `None` when malformed.
pub fn parse_bbox(raw: &str) -> Option<BoundingBox> {
    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 4 {
        warn!(bbox = raw, "Invalid bbox, expected four comma-separated numbers");
        return None;
    }

    let mut bbox = [0.0; 4];
    for (slot, part) in bbox.iter_mut().zip(parts) {
        match part.parse::<f64>() {
            Ok(v) => *slot = v,
            Err(_) => {
                warn!(bbox = raw, "bbox contains non-numeric values");
                return None;
            }
        }
    }
    Some(bbox)
}

/// Accepts `{routes: [...]}`, `{features: [...]}`, a bare array or a single feature.
pub fn normalize_payload(payload: &Value) -> Result<Vec<Route>> {
    let records: Vec<&Value> = match payload {
        Value::Object(obj) => match (obj.get("routes"), obj.get("features")) {
            (Some(Value::Array(routes)), _) => routes.iter().collect(),
            (_, Some(Value::Array(features))) => features.iter().collect(),
            _ => vec![payload],
        },
        Value::Array(items) => items.iter().collect(),
        _ => {
            return Err(HikeBotError::Upstream(
                "unexpected Waymarked Trails payload structure".to_string(),
            ))
        }
    };

    Ok(records.into_iter().filter_map(normalize_route).collect())
}

fn normalize_route(record: &Value) -> Option<Route> {
    let outer = record.as_object()?;
    let props = match outer.get("properties") {
        Some(Value::Object(props)) => props,
        _ => outer,
    };
    let geometry = outer.get("geometry");

    let id = first_text(props, &["id", "wid"]).or_else(|| text(outer.get("id")))?;
    let name = first_text(props, &["name", "title"])?;

    let distance_km = extract_distance_km(props);
    let (latitude, longitude) = extract_coordinates(props, geometry).unzip();

    Some(Route {
        id,
        name,
        location: first_text(props, &["region", "country", "area"])
            .unwrap_or_else(|| "Unknown".to_string()),
        distance_km,
        elevation_gain_m: extract_elevation_gain(props),
        difficulty: map_difficulty(first_text(props, &["difficulty", "sac_scale"]).as_deref()),
        drive_time_min: estimate_drive_time(distance_km),
        tags: extract_tags(props.get("tags")),
        summary: first_text(props, &["description", "details"]),
        gpx_url: first_text(props, &["gpx_url", "gpx", "kml_url"]),
        latitude,
        longitude,
    })
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(props.get(*k)))
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn extract_distance_km(props: &Map<String, Value>) -> f64 {
    ["distance_km", "length_km", "distance", "length"]
        .iter()
        .find_map(|k| number(props.get(*k)))
        .or_else(|| {
            ["distance_m", "length_m"]
                .iter()
                .find_map(|k| number(props.get(*k)))
                .map(|m| m / 1000.0)
        })
        .unwrap_or(0.0)
}

fn extract_elevation_gain(props: &Map<String, Value>) -> u32 {
    ["elevation_gain_m", "ascent", "climb", "height_diff_up"]
        .iter()
        .find_map(|k| number(props.get(*k)))
        .map(|v| v.max(0.0) as u32)
        .unwrap_or(0)
}

fn map_difficulty(raw: Option<&str>) -> Difficulty {
    let value = raw.unwrap_or_default().to_lowercase();
    match value.as_str() {
        "easy" | "grade1" | "t1" => Difficulty::Easy,
        "hard" | "difficult" | "grade5" | "t4" | "t5" | "t6" => Difficulty::Hard,
        _ => Difficulty::Moderate,
    }
}

fn extract_tags(raw: Option<&Value>) -> Vec<RouteTag> {
    let labels: Vec<String> = match raw {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text(Some(v))).collect(),
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    let mut tags = Vec::new();
    for label in labels {
        let lowered = label.to_lowercase();
        let tag = if lowered.contains("dog") {
            RouteTag::DogFriendly
        } else if lowered.contains("camp") || lowered.contains("tent") {
            RouteTag::Camping
        } else if lowered.contains("water") {
            RouteTag::WaterSource
        } else if lowered.contains("loop") || lowered.contains("circuit") {
            RouteTag::Loop
        } else if lowered.contains("summit") || lowered.contains("peak") {
            RouteTag::Summit
        } else {
            continue;
        };
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn extract_coordinates(props: &Map<String, Value>, geometry: Option<&Value>) -> Option<(f64, f64)> {
    let lat = number(props.get("latitude")).or_else(|| number(props.get("lat")));
    let lon = number(props.get("longitude")).or_else(|| number(props.get("lon")));
    if let (Some(lat), Some(lon)) = (lat, lon) {
        return Some((lat, lon));
    }

    if let Some(Value::Array(center)) = props.get("center") {
        if let (Some(lon), Some(lat)) = (number(center.first()), number(center.get(1))) {
            return Some((lat, lon));
        }
    }

    let coords = geometry?.get("coordinates")?;
    first_coordinate(coords).map(|(lon, lat)| (lat, lon))
}

/// First `[x, y]` pair found depth-first in a GeoJSON coordinate tree.
fn first_coordinate(coords: &Value) -> Option<(f64, f64)> {
    let items = coords.as_array()?;
    if items.len() == 2 {
        if let (Some(x), Some(y)) = (number(items.first()), number(items.get(1))) {
            return Some((x, y));
        }
    }
    items.iter().find_map(first_coordinate)
}

fn estimate_drive_time(distance_km: f64) -> u32 {
    if distance_km <= 0.0 {
        return 90;
    }
    30u32.max((distance_km * 8.0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bbox() {
        assert_eq!(
            parse_bbox("-122.5, 47.0,-121.0,48.1"),
            Some([-122.5, 47.0, -121.0, 48.1])
        );
        assert_eq!(parse_bbox("1,2,3"), None);
        assert_eq!(parse_bbox("a,b,c,d"), None);
    }

    #[test]
    fn normalizes_flat_route_records() {
        let payload = json!({
            "routes": [
                {
                    "id": 42,
                    "name": "Ridge Circuit",
                    "region": "Cascades",
                    "length_km": "12.5",
                    "ascent": 640.7,
                    "sac_scale": "T4",
                    "tags": ["Dog OK", "Loop trail", "circuit", "Peak bagging"],
                    "center": [-121.5, 47.3]
                },
                { "id": 43 }
            ]
        });

        let routes = normalize_payload(&payload).unwrap();
        assert_eq!(routes.len(), 1);
        let r = &routes[0];
        assert_eq!(r.id, "42");
        assert_eq!(r.location, "Cascades");
        assert_eq!(r.distance_km, 12.5);
        assert_eq!(r.elevation_gain_m, 640);
        assert_eq!(r.difficulty, Difficulty::Hard);
        assert_eq!(r.drive_time_min, 100);
        assert_eq!(
            r.tags,
            vec![RouteTag::DogFriendly, RouteTag::Loop, RouteTag::Summit]
        );
        assert_eq!(r.coordinates(), Some((47.3, -121.5)));
    }

    #[test]
    fn normalizes_geojson_features() {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "wid": "w-1", "title": "Creek Walk", "distance_m": 3000 },
                "geometry": { "type": "MultiLineString", "coordinates": [[[-120.1, 45.2], [-120.2, 45.3]]] }
            }]
        });

        let routes = normalize_payload(&payload).unwrap();
        assert_eq!(routes.len(), 1);
        let r = &routes[0];
        assert_eq!(r.id, "w-1");
        assert_eq!(r.name, "Creek Walk");
        assert_eq!(r.distance_km, 3.0);
        assert_eq!(r.difficulty, Difficulty::Moderate);
        assert_eq!(r.drive_time_min, 30);
        assert_eq!(r.location, "Unknown");
        assert_eq!(r.coordinates(), Some((45.2, -120.1)));
    }

    #[test]
    fn unknown_distance_gets_default_drive_time() {
        let routes = normalize_payload(&json!([{ "id": "x", "name": "Mystery" }])).unwrap();
        assert_eq!(routes[0].distance_km, 0.0);
        assert_eq!(routes[0].drive_time_min, 90);
        assert!(routes[0].coordinates().is_none());
    }

    #[test]
    fn rejects_scalar_payloads() {
        assert!(normalize_payload(&json!("nope")).is_err());
    }

    #[test]
    fn builds_query_url() {
        let client = WaymarkedClient::new(DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap();
        let url = client
            .routes_url(Some("hiking"), Some([1.0, 2.0, 3.0, 4.0]), Some(10))
            .unwrap();
        assert_eq!(url.path(), "/api/v1/routes");
        assert_eq!(url.query(), Some("theme=hiking&bbox=1%2C2%2C3%2C4&limit=10"));
    }
}
