use crate::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

fn social_routes() -> Router<AppState> {
    Router::new()
        // Friends
        .route("/friends", get(handlers::list_friends))
        .route("/friends/requests", get(handlers::friend_requests))
        .route("/friends/add", post(handlers::add_friend))
        .route("/friends/accept", post(handlers::accept_friend))
        .route("/friends/decline", post(handlers::decline_friend))
        .route("/friends/remove", post(handlers::remove_friend))
        .route("/friends/dm", post(handlers::direct_chat))
        // Groups
        .route(
            "/groups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route("/groups/{group_id}/members", get(handlers::group_members))
        .route("/groups/{group_id}/invite", post(handlers::invite_member))
        .route("/groups/{group_id}/kick", post(handlers::kick_member))
        .route("/groups/{group_id}/leave", post(handlers::leave_group))
        .route("/groups/{group_id}/join", post(handlers::join_group))
        .route(
            "/groups/{group_id}/messages",
            get(handlers::group_messages).post(handlers::post_group_message),
        )
        .route(
            "/groups/{group_id}/ai/recommend_routes",
            post(handlers::ai_recommend_routes),
        )
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Accounts
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        // Trails
        .route("/chat", post(handlers::chat))
        .route("/routes", get(handlers::list_routes))
        .route("/routes/recommend", post(handlers::recommend_routes))
        .route("/gear/checklist", post(handlers::gear_checklist))
        // Weather
        .route("/weather/snapshot", post(handlers::weather_snapshot))
        .route("/weather/briefing", post(handlers::weather_briefing))
        // Trip history
        .route("/trips/history/{username}", get(handlers::trip_history))
        .route("/users/{username}/trips", get(handlers::trip_history))
        .nest("/social", social_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
}
