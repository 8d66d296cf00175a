//! Trip-intent extraction: cheap keyword gate, then an LLM JSON call.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::llm_provider::{GenerationConfig, LLMProvider, Message};

/// Words that make a message worth an LLM call.
pub const PLANNING_TRIGGERS: &[&str] = &[
    "go to", "hike", "trail", "plan", "weekend", "saturday", "sunday", "trip", "join",
];

pub fn has_planning_trigger(message: &str) -> bool {
    let lowered = message.to_lowercase();
    PLANNING_TRIGGERS.iter().any(|t| lowered.contains(t))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    /// True only when someone proposes or confirms a plan, not when asking for info.
    #[serde(default)]
    pub is_planning_trip: bool,
    #[serde(default)]
    pub trail_name_raw: Option<String>,
    /// YYYY-MM-DD
    #[serde(default)]
    pub target_date_str: Option<String>,
}

impl ExtractionSchema {
    pub fn trail_name(&self) -> Option<&str> {
        self.trail_name_raw
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn target_date(&self) -> Option<NaiveDate> {
        self.target_date_str
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
    }
}

fn extraction_prompt(today: NaiveDate) -> String {
    format!(
        "Current Date: {} ({}).\n\n\
         Analyze the user's message. Determine if they are PROPOSING or CONFIRMING a trip.\n\n\
         Distinction:\n\
         - \"What is the weather at Rainier?\" -> is_planning_trip: false (just asking info)\n\
         - \"Let's do Mailbox this Saturday\" -> is_planning_trip: true\n\
         - \"I'm down for Rattlesnake\" -> is_planning_trip: true\n\
         - \"How about hiking Si?\" -> is_planning_trip: true\n\n\
         If true, extract:\n\
         - \"trail_name_raw\": the hiking location mentioned.\n\
         - \"target_date_str\": YYYY-MM-DD computed from the current date \
           (default to the upcoming Saturday if only 'weekend' is said).\n\n\
         Return a JSON object with keys is_planning_trip, trail_name_raw, target_date_str.",
        today.format("%Y-%m-%d"),
        today.weekday()
    )
}

/// Parse the model output. Anything that is not the expected object means "not planning".
pub fn parse_extraction(raw: &str) -> ExtractionSchema {
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    match serde_json::from_str::<ExtractionSchema>(trimmed) {
        Ok(schema) => schema,
        Err(e) => {
            debug!(error = %e, "Unparseable intent payload");
            ExtractionSchema::default()
        }
    }
}

/// Ask the model whether `message` is a trip proposal. Failures read as "no".
pub async fn extract_intent(llm: &dyn LLMProvider, message: &str) -> ExtractionSchema {
    let today = Local::now().date_naive();
    let messages = [Message::system(extraction_prompt(today)), Message::user(message)];

    match llm
        .generate_chat(&messages, &GenerationConfig::json(0.0))
        .await
    {
        Ok(response) => parse_extraction(&response.content),
        Err(e) => {
            error!(provider = llm.provider_name(), error = %e, "Intent extraction failed");
            ExtractionSchema::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_words() {
        assert!(has_planning_trigger("Anyone up for a HIKE?"));
        assert!(has_planning_trigger("Saturday works"));
        assert!(!has_planning_trigger("what's for dinner"));
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"is_planning_trip\": true, \"trail_name_raw\": \"Mailbox\", \"target_date_str\": \"2025-06-14\"}\n```";
        let schema = parse_extraction(raw);
        assert!(schema.is_planning_trip);
        assert_eq!(schema.trail_name(), Some("Mailbox"));
        assert_eq!(schema.target_date(), NaiveDate::from_ymd_opt(2025, 6, 14));
    }

    #[test]
    fn garbage_means_not_planning() {
        assert_eq!(parse_extraction("sure! let's go"), ExtractionSchema::default());
        let partial = parse_extraction(r#"{"is_planning_trip": true, "trail_name_raw": "  "}"#);
        assert!(partial.is_planning_trip);
        assert_eq!(partial.trail_name(), None);
        assert_eq!(partial.target_date(), None);
    }
}
