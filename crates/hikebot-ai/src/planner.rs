//! LLM trip planner: intent -> catalog match -> weather context -> announcement.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use hikebot_core::{GroupId, GroupMessage, Result, Route, WeatherSnapshot};
use hikebot_social::SocialService;
use hikebot_trails::RouteCatalog;
use hikebot_weather::{fallback_snapshot, WeatherService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::intent::{extract_intent, has_planning_trigger};
use crate::llm_provider::{GenerationConfig, LLMProvider, Message};

/// Forecasts for a planned day are taken at midday.
const NOON: NaiveTime = match NaiveTime::from_hms_opt(12, 0, 0) {
    Some(time) => time,
    None => panic!("12:00:00 is a valid time"),
};

fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NOON))
}

pub const PLANNER_SENDER: &str = "HikeBot";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStats {
    pub dist: String,
    pub elev: String,
}

/// The JSON card posted to the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripAnnouncement {
    pub title: String,
    pub summary: String,
    pub stats: TripStats,
    pub weather_warning: String,
    pub gear_required: Vec<String>,
    pub fun_fact: String,
}

impl TripAnnouncement {
    pub fn fallback(route: &Route) -> Self {
        let stats = stats_for(route);
        Self {
            title: format!("Hike to {}", route.name),
            summary: "Let's go hiking!".to_string(),
            stats,
            weather_warning: "Check forecast.".to_string(),
            gear_required: vec!["Water".to_string(), "Boots".to_string()],
            fun_fact: "Hiking is good for you!".to_string(),
        }
    }
}

fn stats_for(route: &Route) -> TripStats {
    TripStats {
        dist: format!("{:.1} km", route.distance_km),
        elev: format!("{} m", route.elevation_gain_m),
    }
}

const ANNOUNCEMENT_PROMPT: &str = "You are HikeBot, a veteran outdoor guide with 20 years of experience in the Pacific Northwest.\n\n\
TASK: Generate a hiking trip announcement JSON.\n\n\
TONE RULES:\n\
- If difficulty is hard OR the weather mentions rain or snow: serious, commanding, safety-first.\n\
- If difficulty is easy AND the weather is sunny: playful, excited, casual (emojis welcome).\n\n\
CONTENT RULES:\n\
1. 'summary': 2 sentences that sell the experience.\n\
2. 'gear_required': specific to the weather (e.g. microspikes if snow, sunscreen if sunny).\n\
3. 'fun_fact': one history or geology fact about this trail.\n\
4. If elevation gain > 1000 m warn about endurance. If rain, warn about slippery roots.\n\n\
OUTPUT FORMAT (JSON ONLY):\n\
{\"title\": \"...\", \"summary\": \"...\", \"stats\": {\"dist\": \"X km\", \"elev\": \"Y m\"}, \
\"weather_warning\": \"...\", \"gear_required\": [\"...\"], \"fun_fact\": \"...\"}";

/// One-line weather context for the prompt.
pub fn weather_context(snapshot: &WeatherSnapshot) -> String {
    format!(
        "{} ({:.0}°C, {:.0}% chance of precipitation)",
        snapshot.summary,
        snapshot.temp_c,
        snapshot.precip_prob * 100.0
    )
}

pub struct TripPlanner {
    llm: Arc<dyn LLMProvider>,
    catalog: Arc<RouteCatalog>,
    weather: Arc<WeatherService>,
    social: Arc<SocialService>,
}

impl TripPlanner {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        catalog: Arc<RouteCatalog>,
        weather: Arc<WeatherService>,
        social: Arc<SocialService>,
    ) -> Self {
        Self {
            llm,
            catalog,
            weather,
            social,
        }
    }

    /// Runs the pipeline for one user message. `Ok(None)` when nothing was posted.
    pub async fn run(&self, group_id: GroupId, message: &str) -> Result<Option<GroupMessage>> {
        if !has_planning_trigger(message) {
            return Ok(None);
        }

        let intent = extract_intent(self.llm.as_ref(), message).await;
        let Some(raw_name) = intent.trail_name().filter(|_| intent.is_planning_trip) else {
            return Ok(None);
        };
        info!(group_id = %group_id, trail = raw_name, date = ?intent.target_date_str, "Trip intent detected");

        let Some(route) = self.catalog.find_by_name(raw_name) else {
            warn!(trail = raw_name, "Trail not found in catalog or fixtures");
            return Ok(None);
        };

        let date = intent
            .target_date()
            .unwrap_or_else(|| Local::now().date_naive());
        let snapshot = self.weather_for(&route, date).await;
        let announcement = self
            .announcement(&route, &date.format("%Y-%m-%d").to_string(), &snapshot)
            .await;

        let content = serde_json::to_string(&announcement)?;
        let posted = self
            .social
            .post_assistant_message(group_id, PLANNER_SENDER, &content)?;
        info!(group_id = %group_id, route = %route.id, "Trip announcement posted");
        Ok(Some(posted))
    }

    async fn weather_for(&self, route: &Route, date: NaiveDate) -> WeatherSnapshot {
        let noon = noon_utc(date);
        match route.coordinates() {
            Some((lat, lon)) => self.weather.snapshot_at(lat, lon, noon).await,
            None => fallback_snapshot(noon),
        }
    }

    pub async fn announcement(
        &self,
        route: &Route,
        date: &str,
        snapshot: &WeatherSnapshot,
    ) -> TripAnnouncement {
        let tags: Vec<&str> = route.tags.iter().map(|t| t.label()).collect();
        let facts = format!(
            "FACTS:\n- Trail Name: {}\n- Location: {}\n- Difficulty: {}\n- Length: {:.1} km\n\
             - Elevation Gain: {} m\n- Features: {}\n- Date: {}\n- Weather Context: {}",
            route.name,
            route.location,
            route.difficulty,
            route.distance_km,
            route.elevation_gain_m,
            if tags.is_empty() { "none".to_string() } else { tags.join(", ") },
            date,
            weather_context(snapshot)
        );
        let messages = [Message::system(ANNOUNCEMENT_PROMPT), Message::user(facts)];

        let response = match self
            .llm
            .generate_chat(&messages, &GenerationConfig::json(0.7))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(provider = self.llm.provider_name(), error = %e, "Announcement generation failed");
                return TripAnnouncement::fallback(route);
            }
        };

        match serde_json::from_str::<TripAnnouncement>(response.content.trim()) {
            Ok(announcement) => announcement,
            Err(e) => {
                warn!(error = %e, "Announcement JSON did not match the expected shape");
                TripAnnouncement::fallback(route)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn forecasts_target_midday() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 19).unwrap();
        let target = noon_utc(date);
        assert_eq!(target.date_naive(), date);
        assert_eq!((target.hour(), target.minute()), (12, 0));
    }
}
