pub mod assistant;
pub mod chat;
pub mod intent;
pub mod llm_factory;
pub mod llm_provider;
pub mod openai_compatible_provider;
pub mod planner;

pub use assistant::{AssistantAction, GroupAssistant, PLAN_SENDER, SUGGESTION_SENDER};
pub use chat::{handle_chat, ChatRequest, ChatResponse};
pub use intent::{extract_intent, has_planning_trigger, ExtractionSchema};
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
pub use planner::{TripAnnouncement, TripPlanner};
