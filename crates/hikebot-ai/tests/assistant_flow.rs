use anyhow::anyhow;
use async_trait::async_trait;
use hikebot_ai::{
    AssistantAction, GenerationConfig, GroupAssistant, LLMProvider, LLMResponse, LLMResult,
    Message, ProviderCharacteristics, TripAnnouncement, TripPlanner,
};
use hikebot_core::{AuthUser, GroupId, MessageRole, TripStatus};
use hikebot_social::{MemoryStore, SocialService};
use hikebot_trails::RouteCatalog;
use hikebot_weather::WeatherService;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Replays canned replies and records every prompt it receives.
#[derive(Default)]
struct ScriptedLlm {
    replies: Mutex<VecDeque<LLMResult<String>>>,
    prompts: Mutex<Vec<(Vec<Message>, bool)>>,
}

impl ScriptedLlm {
    fn with_replies(replies: Vec<LLMResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.prompts
            .lock()
            .push((messages.to_vec(), config.json_response));
        let content = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted reply left")))?;
        Ok(LLMResponse {
            content,
            total_tokens: None,
            finish_reason: Some("stop".into()),
            model: "scripted".into(),
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: 8192,
            avg_latency_ms: 0,
            supports_json_mode: true,
        }
    }
}

struct World {
    social: Arc<SocialService>,
    catalog: Arc<RouteCatalog>,
    weather: Arc<WeatherService>,
    ana: AuthUser,
    ben: AuthUser,
    group: GroupId,
}

fn world() -> World {
    let social = Arc::new(SocialService::new(Arc::new(MemoryStore::new())));
    let ana = social.signup("ana", "pw", "ANA1").unwrap();
    let ben = social.signup("ben", "pw", "BEN1").unwrap();
    let group = social
        .create_group(&ana, "Weekend Crew", None, &["BEN1".into()])
        .unwrap()
        .group
        .id;
    World {
        social,
        catalog: Arc::new(RouteCatalog::fixtures()),
        weather: Arc::new(WeatherService::offline(Duration::from_secs(60))),
        ana,
        ben,
        group,
    }
}

impl World {
    fn assistant(&self) -> GroupAssistant {
        GroupAssistant::new(self.social.clone(), self.catalog.clone(), self.weather.clone())
    }

    fn assistant_with(&self, llm: Arc<ScriptedLlm>) -> GroupAssistant {
        let planner = TripPlanner::new(
            llm,
            self.catalog.clone(),
            self.weather.clone(),
            self.social.clone(),
        );
        self.assistant().with_planner(planner)
    }

    fn say(&self, who: &AuthUser, text: &str) {
        self.social.post_message(who, self.group, text).unwrap();
    }
}

#[tokio::test]
async fn decision_posts_rule_based_plan_and_records_trip() {
    let w = world();
    w.say(&w.ana, "Echo Mountain Loop this Saturday? Meet at 7:30am, I can drive");
    w.say(&w.ben, "heard the lower section is muddy after the storm");
    w.say(&w.ben, "Confirmed!");

    let action = w
        .assistant()
        .on_user_message(w.group, &w.ben, "Confirmed!")
        .await
        .unwrap();
    let AssistantAction::TripPlan(posted) = action else {
        panic!("expected a trip plan, got {action:?}");
    };

    assert_eq!(posted.sender, "HikeBot");
    assert_eq!(posted.role, MessageRole::Assistant);
    assert!(posted.content.contains("**Destination:** Echo Mountain Loop"));
    assert!(posted.content.contains("**Meetup Time:** 7:30am"));
    assert!(posted.content.contains("Carpooling mentioned"));
    assert!(posted.content.contains("Muddy trail"));
    assert!(posted.content.contains("seasonal estimate"));

    let trips = w.social.trip_history("ben").unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].trip_name, "Echo Mountain Loop");
    assert_eq!(trips[0].role, "organizer");
    assert_eq!(trips[0].status, TripStatus::Planned);
}

#[tokio::test]
async fn plan_ignores_earlier_assistant_posts() {
    let w = world();
    w.social
        .post_assistant_message(w.group, "HikeBot", "Destination: Donner Ridge Traverse at 9am")
        .unwrap();
    w.say(&w.ana, "sounds good, locked in");

    let action = w
        .assistant()
        .on_user_message(w.group, &w.ana, "sounds good, locked in")
        .await
        .unwrap();
    let AssistantAction::TripPlan(posted) = action else {
        panic!("expected a trip plan");
    };
    assert!(posted.content.contains("Undecided Location"));
    assert!(posted.content.contains("**Meetup Time:** TBD"));
}

#[tokio::test]
async fn mention_with_recommend_posts_suggestions() {
    let w = world();
    w.say(&w.ana, "I want something chill near a lake");
    w.say(&w.ben, "@HikeBot where should we go?");

    let action = w
        .assistant()
        .on_user_message(w.group, &w.ben, "@HikeBot where should we go?")
        .await
        .unwrap();
    let AssistantAction::Suggestions(posted) = action else {
        panic!("expected suggestions");
    };
    assert_eq!(posted.sender, "Trail Mind");
    assert!(posted.content.starts_with("🍃 Sounds like a relaxed vibe"));
    // No easy route has water, so the water cue is dropped.
    assert!(posted.content.contains("Muir Woods Coastal Route"));
    assert_eq!(posted.content.matches("🌲").count(), 2);
}

#[tokio::test]
async fn planner_posts_llm_announcement() {
    let w = world();
    let announcement = r#"{
        "title": "Mailbox Peak Sufferfest",
        "summary": "Steep. Worth it.",
        "stats": {"dist": "15.1 km", "elev": "1219 m"},
        "weather_warning": "Bring layers.",
        "gear_required": ["Poles", "Water"],
        "fun_fact": "There really is a mailbox."
    }"#;
    let llm = ScriptedLlm::with_replies(vec![
        Ok(r#"{"is_planning_trip": true, "trail_name_raw": "mailbox", "target_date_str": "2025-06-14"}"#.into()),
        Ok(announcement.into()),
    ]);
    let assistant = w.assistant_with(llm.clone());
    assert!(assistant.has_planner());

    let text = "How about we hike Mailbox on Saturday?";
    w.say(&w.ana, text);
    let action = assistant.on_user_message(w.group, &w.ana, text).await.unwrap();
    let AssistantAction::Announcement(posted) = action else {
        panic!("expected an announcement");
    };

    let card: TripAnnouncement = serde_json::from_str(&posted.content).unwrap();
    assert_eq!(card.title, "Mailbox Peak Sufferfest");
    assert_eq!(posted.sender, "HikeBot");

    let prompts = llm.prompts.lock();
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().all(|(_, json)| *json));
    assert!(prompts[1].0[1].content.contains("Trail Name: Mailbox Peak"));
    assert!(prompts[1].0[1].content.contains("Date: 2025-06-14"));
}

#[tokio::test]
async fn planner_falls_back_when_announcement_is_not_json() {
    let w = world();
    let llm = ScriptedLlm::with_replies(vec![
        Ok(r#"{"is_planning_trip": true, "trail_name_raw": "Mount Si"}"#.into()),
        Ok("Sure! Here's a plan: go hike.".into()),
    ]);
    let text = "Let's plan Mount Si this weekend";
    let action = w
        .assistant_with(llm)
        .on_user_message(w.group, &w.ana, text)
        .await
        .unwrap();
    let AssistantAction::Announcement(posted) = action else {
        panic!("expected an announcement");
    };
    let card: TripAnnouncement = serde_json::from_str(&posted.content).unwrap();
    assert_eq!(card.title, "Hike to Mount Si");
    assert_eq!(card.gear_required, vec!["Water", "Boots"]);
}

#[tokio::test]
async fn planner_stays_quiet_without_a_plan() {
    let w = world();

    // Not a proposal.
    let llm = ScriptedLlm::with_replies(vec![Ok(r#"{"is_planning_trip": false}"#.into())]);
    let action = w
        .assistant_with(llm.clone())
        .on_user_message(w.group, &w.ana, "Is the trail open in winter?")
        .await
        .unwrap();
    assert!(matches!(action, AssistantAction::Ignored));

    // Provider failure reads as "no plan".
    let failing = ScriptedLlm::with_replies(vec![Err(anyhow!("503"))]);
    let action = w
        .assistant_with(failing)
        .on_user_message(w.group, &w.ana, "hike on sunday?")
        .await
        .unwrap();
    assert!(matches!(action, AssistantAction::Ignored));

    // No trigger word: the model is never asked.
    let untouched = ScriptedLlm::with_replies(vec![]);
    let action = w
        .assistant_with(untouched.clone())
        .on_user_message(w.group, &w.ana, "what's for dinner")
        .await
        .unwrap();
    assert!(matches!(action, AssistantAction::Ignored));
    assert!(untouched.prompts.lock().is_empty());

    assert!(w.social.messages(&w.ana, w.group).unwrap().is_empty());
}
