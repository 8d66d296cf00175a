pub mod test_utils {
    use crate::AppState;
    use hikebot_core::HikeBotConfig;
    use std::sync::Arc;

    /// In-memory store, offline weather, fixture catalog, no LLM.
    pub fn test_config() -> HikeBotConfig {
        let mut config = HikeBotConfig::default();
        config.storage.backend = "memory".to_string();
        config.weather.offline = true;
        config.llm.enabled = false;
        config.trails = Default::default();
        config
    }

    impl AppState {
        /// Creates an AppState for unit tests without touching the network.
        pub async fn new_for_testing() -> Self {
            Self::new(Arc::new(test_config()))
                .await
                .expect("Failed to create test AppState")
        }

        /// Same as [`AppState::new_for_testing`] with bearer tokens enabled.
        pub async fn new_with_jwt(secret: &str) -> Self {
            let mut config = test_config();
            config.auth.jwt_secret = Some(secret.to_string());
            Self::new(Arc::new(config))
                .await
                .expect("Failed to create test AppState with JWT")
        }
    }
}
