//! Stateless keyword chat used by the `/chat` endpoint.

use hikebot_core::{AltitudeBand, GearRequest, RouteFilters, Season, Terrain};
use hikebot_trails::{build_checklist, recommend, RouteCatalog};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub filters: Option<RouteFilters>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

impl ChatResponse {
    fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

const ROUTE_WORDS: &[&str] = &["trail", "route", "hike", "where should we go"];
const GEAR_WORDS: &[&str] = &["gear", "pack", "bring"];
const WEATHER_WORDS: &[&str] = &["weather", "forecast"];

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// A summer day hike, used when someone asks what to pack without details.
pub fn default_gear_request() -> GearRequest {
    GearRequest {
        season: Season::Summer,
        hours: 5.0,
        altitude_band: AltitudeBand::Mid,
        terrain: vec![Terrain::Dry],
        distance_km: Some(10.0),
        elevation_gain_m: Some(600),
        group_size: 3,
    }
}

pub fn handle_chat(req: &ChatRequest, catalog: &RouteCatalog) -> ChatResponse {
    let text = req.user_message.trim();
    let lower = text.to_lowercase();

    if text.is_empty() {
        return ChatResponse::new(
            "I didn't catch that. Try asking about trails, weather, or gear 🙂",
        );
    }

    if mentions(&lower, ROUTE_WORDS) {
        let filters = req.filters.clone().unwrap_or_default();
        let Some(best) = recommend(catalog.all(), &filters).into_iter().next() else {
            return ChatResponse::new(
                "I tried to find a route but nothing in my catalog matches those filters.",
            );
        };
        let route = &best.route;
        return ChatResponse::new(format!(
            "It sounds like you're deciding where to hike.\n\n\
             I recommend **{}** near {}.\n\n\
             - Distance: {:.1} km\n\
             - Elevation gain: {} m\n\
             - Driving time: ~{} minutes\n\
             - Difficulty: {}\n\n\
             Why: {}\n\n\
             You can also ask for a weather snapshot for this trail at your planned start time.",
            route.name,
            route.location,
            route.distance_km,
            route.elevation_gain_m,
            route.drive_time_min,
            route.difficulty,
            best.reasons.join("; ")
        ));
    }

    if mentions(&lower, GEAR_WORDS) {
        return match build_checklist(&default_gear_request()) {
            Ok(checklist) => {
                let lines = checklist
                    .items
                    .iter()
                    .map(|item| format!("- {item}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                ChatResponse::new(format!(
                    "Here's a basic packing checklist for a typical day hike:\n\n{lines}\n\n\
                     Plan on about {:.1} L of water and {} kcal per person.\n\
                     Always adjust for your specific route, weather, and group experience.",
                    checklist.water_liters, checklist.calories_kcal
                ))
            }
            Err(_) => ChatResponse::new("Pack water, food, layers and a first-aid kit."),
        };
    }

    if mentions(&lower, WEATHER_WORDS) {
        return ChatResponse::new(
            "For detailed weather, request a weather snapshot:\n\
             1. Pick a route.\n\
             2. Choose your start date & time.\n\
             3. Get the forecast to see temperature, rain probability, and safety notes.",
        );
    }

    ChatResponse::new(
        "I'm HikeBot 🥾. I can help your group with:\n\
         - Suggesting a trail (try: *Where should we hike this weekend?*)\n\
         - Packing lists (try: *What gear do we need?*)\n\
         - Weather safety (try: *How's the weather for hiking?*)",
    )
}
