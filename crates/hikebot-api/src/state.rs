use hikebot_ai::{GroupAssistant, LLMProviderFactory, TripPlanner};
use hikebot_core::{HikeBotConfig, JwtManager, Result};
use hikebot_social::{open_store, SocialService};
use hikebot_trails::RouteCatalog;
use hikebot_weather::WeatherService;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HikeBotConfig>,
    pub catalog: Arc<RouteCatalog>,
    pub weather: Arc<WeatherService>,
    pub social: Arc<SocialService>,
    pub assistant: Arc<GroupAssistant>,
    /// Present only when `auth.jwt_secret` is configured.
    pub jwt: Option<Arc<JwtManager>>,
}

impl AppState {
    pub async fn new(config: Arc<HikeBotConfig>) -> Result<Self> {
        let catalog = Arc::new(RouteCatalog::load(&config.trails).await);
        let weather = Arc::new(WeatherService::from_config(&config.weather)?);
        let social = Arc::new(SocialService::new(open_store(&config.storage)?));

        let mut assistant = GroupAssistant::new(social.clone(), catalog.clone(), weather.clone());
        if config.llm.enabled {
            match LLMProviderFactory::create_from_config(&config.llm) {
                Ok(llm) => {
                    info!(
                        provider = llm.provider_name(),
                        model = llm.model_name(),
                        "Trip planner enabled"
                    );
                    assistant = assistant.with_planner(TripPlanner::new(
                        llm,
                        catalog.clone(),
                        weather.clone(),
                        social.clone(),
                    ));
                }
                Err(e) => warn!(error = %e, "LLM provider unavailable, trip planner disabled"),
            }
        }

        let jwt = config
            .auth
            .jwt_secret()
            .map(|secret| Arc::new(JwtManager::new(secret, config.auth.token_ttl_hours)));

        info!(
            routes = catalog.len(),
            weather_offline = weather.is_offline(),
            bearer_auth = jwt.is_some(),
            "Application state ready"
        );

        Ok(Self {
            config,
            catalog,
            weather,
            social,
            assistant: Arc::new(assistant),
            jwt,
        })
    }
}
