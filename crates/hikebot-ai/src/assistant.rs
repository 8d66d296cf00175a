//! Group-chat listener.
//!
//! Only user posts reach [`GroupAssistant::on_user_message`], and assistant
//! posts are left out of the context it reads, so the assistant never reacts
//! to its own announcements.

use chrono::{Local, Utc};
use hikebot_core::{
    AuthUser, Difficulty, GroupId, GroupMessage, MessageRole, Result, Route, RouteFilters,
    TripHistoryEntry, TripStatus,
};
use hikebot_social::SocialService;
use hikebot_trails::{check_hazards, recommend, KeywordSet, RouteCatalog};
use hikebot_weather::WeatherService;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::intent::has_planning_trigger;
use crate::planner::TripPlanner;

pub const PLAN_SENDER: &str = "HikeBot";
pub const SUGGESTION_SENDER: &str = "Trail Mind";

const PLAN_CONTEXT_MESSAGES: usize = 50;
const SUGGESTION_CONTEXT_MESSAGES: usize = 20;

/// Phrases that mean the group has settled on a plan.
pub const DECISION_KEYWORDS: &[&str] = &[
    "let's go",
    "finalized",
    "confirmed",
    "it's a plan",
    "locked in",
    "deal",
    "sounds good to everyone",
    "see you there",
    "booked",
    "settled",
];

const HARD_CUES: &[&str] = &["hard", "challenging", "steep", "workout"];
const EASY_CUES: &[&str] = &["easy", "chill", "relax", "relaxed", "beginner", "flat"];
const WATER_CUES: &[&str] = &["water", "lake", "lakes", "river", "rivers", "ocean"];
const CARPOOL_CUES: &[&str] = &[
    "drive", "driving", "car", "cars", "carpool", "seat", "seats",
];

static DECISION: Lazy<KeywordSet> = Lazy::new(|| KeywordSet::new(DECISION_KEYWORDS));
static HARD: Lazy<KeywordSet> = Lazy::new(|| KeywordSet::new(HARD_CUES));
static EASY: Lazy<KeywordSet> = Lazy::new(|| KeywordSet::new(EASY_CUES));
static WATER: Lazy<KeywordSet> = Lazy::new(|| KeywordSet::new(WATER_CUES));
static CARPOOL: Lazy<KeywordSet> = Lazy::new(|| KeywordSet::new(CARPOOL_CUES));

const BASE_GEAR: &[&str] = &[
    "Hiking boots",
    "2L water",
    "Layers",
    "Power bank",
    "Snacks",
];

static MEETUP_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}(?::\d{2})?\s*(?:am|pm))")
        .unwrap_or_else(|e| panic!("invalid meetup regex: {e}"))
});

pub fn is_decision(message: &str) -> bool {
    DECISION.is_match(message)
}

pub fn is_suggestion_request(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("@hikebot") && (lowered.contains("recommend") || lowered.contains("where"))
}

pub fn meetup_time(context: &str) -> Option<String> {
    MEETUP_TIME_RE
        .captures(&context.to_lowercase())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// What the assistant did in response to a message.
#[derive(Debug, Clone)]
pub enum AssistantAction {
    TripPlan(GroupMessage),
    Suggestions(GroupMessage),
    Announcement(GroupMessage),
    Ignored,
}

pub struct GroupAssistant {
    social: Arc<SocialService>,
    catalog: Arc<RouteCatalog>,
    weather: Arc<WeatherService>,
    planner: Option<TripPlanner>,
}

impl GroupAssistant {
    pub fn new(
        social: Arc<SocialService>,
        catalog: Arc<RouteCatalog>,
        weather: Arc<WeatherService>,
    ) -> Self {
        Self {
            social,
            catalog,
            weather,
            planner: None,
        }
    }

    pub fn with_planner(mut self, planner: TripPlanner) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn has_planner(&self) -> bool {
        self.planner.is_some()
    }

    pub async fn on_user_message(
        &self,
        group_id: GroupId,
        author: &AuthUser,
        content: &str,
    ) -> Result<AssistantAction> {
        if is_decision(content) {
            let posted = self.post_trip_plan(group_id, author).await?;
            return Ok(AssistantAction::TripPlan(posted));
        }

        if is_suggestion_request(content) {
            let posted = self.suggest_routes(group_id)?;
            return Ok(AssistantAction::Suggestions(posted));
        }

        if let Some(planner) = &self.planner {
            if has_planning_trigger(content) {
                if let Some(posted) = planner.run(group_id, content).await? {
                    return Ok(AssistantAction::Announcement(posted));
                }
            }
        }

        debug!(group_id = %group_id, "No assistant action");
        Ok(AssistantAction::Ignored)
    }

    /// Lowercased user messages, oldest first, joined by spaces.
    fn context(&self, group_id: GroupId, limit: usize) -> Result<(String, Vec<String>)> {
        let messages: Vec<String> = self
            .social
            .context_messages(group_id, limit)?
            .into_iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content)
            .collect();
        Ok((messages.join(" ").to_lowercase(), messages))
    }

    async fn weather_line(&self, destination: Option<&Route>, context: &str) -> String {
        if let Some(route) = destination {
            if let Ok(snapshot) = self.weather.snapshot(route, Utc::now()).await {
                return format!(
                    "{} ({:.0}°C, {:.0}% chance of precipitation)",
                    snapshot.summary,
                    snapshot.temp_c,
                    snapshot.precip_prob * 100.0
                );
            }
        }
        if context.contains("rain") {
            "Chance of rain. Bring waterproofs!".to_string()
        } else {
            "Partly cloudy, 18°C. Perfect hiking weather.".to_string()
        }
    }

    async fn post_trip_plan(&self, group_id: GroupId, author: &AuthUser) -> Result<GroupMessage> {
        let (context, messages) = self.context(group_id, PLAN_CONTEXT_MESSAGES)?;

        let destination = self.catalog.first_named_in(&context);
        let location = destination
            .map(|r| r.name.clone())
            .unwrap_or_else(|| "Undecided Location".to_string());
        let time = meetup_time(&context).unwrap_or_else(|| "TBD".to_string());
        let carpool = if CARPOOL.is_match(&context) {
            "Carpooling mentioned. Drivers please confirm."
        } else {
            "Please discuss carpool"
        };
        let weather = self.weather_line(destination, &context).await;

        let mut safety = check_hazards(messages.as_slice());
        safety.push("Stay on marked trails. Cell service can be spotty.".to_string());

        let gear = BASE_GEAR
            .iter()
            .map(|g| format!("- {g}"))
            .collect::<Vec<_>>()
            .join("\n");
        let safety = safety
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n");

        let announcement = format!(
            "📢 **OFFICIAL TRIP PLAN**\n\n\
             Since you've finalized the plan, here is the summary:\n\n\
             📍 **Destination:** {location}\n\
             ⏰ **Meetup Time:** {time}\n\
             🚗 **Carpool:** {carpool}\n\n\
             ---\n\
             🎒 **Gear List:**\n{gear}\n\n\
             🌤️ **Weather:**\n{weather}\n\n\
             ⚠️ **Safety Instructions:**\n{safety}\n\n\
             *Have a safe hike!*"
        );

        let posted = self
            .social
            .post_assistant_message(group_id, PLAN_SENDER, &announcement)?;
        self.social.record_trip(
            author.id,
            TripHistoryEntry {
                trip_name: location.clone(),
                date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
                role: "organizer".to_string(),
                status: TripStatus::Planned,
            },
        )?;
        info!(group_id = %group_id, destination = %location, organizer = author.id, "Trip plan posted");
        Ok(posted)
    }

    /// Two route suggestions shaped by the recent conversation.
    pub fn suggest_routes(&self, group_id: GroupId) -> Result<GroupMessage> {
        let (context, _) = self.context(group_id, SUGGESTION_CONTEXT_MESSAGES)?;

        let (difficulty, intro) = if HARD.is_match(&context) {
            (
                Some(Difficulty::Hard),
                "💪 Based on your chat, you want a challenge! Check these out:",
            )
        } else if EASY.is_match(&context) {
            (
                Some(Difficulty::Easy),
                "🍃 Sounds like a relaxed vibe. Here are some chill trails:",
            )
        } else {
            (None, "Here are some top-rated trails for the group:")
        };

        let mut filters = RouteFilters {
            difficulty,
            need_water: WATER.is_match(&context),
            limit: Some(2),
            ..Default::default()
        };
        let mut picks = recommend(self.catalog.all(), &filters);
        if picks.is_empty() && filters.need_water {
            filters.need_water = false;
            picks = recommend(self.catalog.all(), &filters);
        }

        let mut body = format!("{intro}\n\n");
        for pick in &picks {
            let route = &pick.route;
            let vibe: Vec<&str> = route.tags.iter().map(|t| t.label()).collect();
            body.push_str(&format!(
                "🌲 **{}** ({})\n   - Distance: {:.1} km\n   - *Vibe:* {}\n\n",
                route.name,
                route.difficulty,
                route.distance_km,
                if vibe.is_empty() { "classic".to_string() } else { vibe.join(", ") }
            ));
        }
        if picks.is_empty() {
            body.push_str("I couldn't find a trail that fits yet. Tell me more about what you want!\n\n");
        }
        body.push_str("Discuss and let me know when you decide!");

        self.social
            .post_assistant_message(group_id, SUGGESTION_SENDER, &body)
    }
}
