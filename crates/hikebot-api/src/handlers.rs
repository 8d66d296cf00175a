use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, NaiveDateTime, Utc};
use hikebot_ai::{handle_chat, AssistantAction, ChatRequest, ChatResponse};
use hikebot_core::{
    AuthUser, GearChecklist, GearRequest, Group, GroupId, GroupMember, GroupMessage, GroupRole,
    MessageId, MessageRole, RequestId, Route, RouteFilters, RouteRecommendation, TripHistoryEntry,
    UserId, WeatherSnapshot,
};
use hikebot_social::{FriendRequestOutcome, LeaveOutcome, PendingRequest};
use hikebot_trails::{build_checklist, recommend};
use hikebot_weather::{briefing, fallback_snapshot, Briefing};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ApiError, ApiResult, AppJson, AppPath, AppState, CurrentUser};

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub routes: usize,
    pub weather_offline: bool,
    pub trip_planner: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        routes: state.catalog.len(),
        weather_offline: state.weather.is_offline(),
        trip_planner: state.assistant.has_planner(),
    })
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub user_code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: AuthUser,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn auth_response(state: &AppState, user: AuthUser, message: &str) -> ApiResult<AuthResponse> {
    let token = match &state.jwt {
        Some(jwt) => Some(
            jwt.create_token(&user)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        ),
        None => None,
    };
    Ok(AuthResponse {
        user,
        message: message.to_string(),
        token,
    })
}

pub async fn signup(
    State(state): State<AppState>,
    AppJson(request): AppJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = state
        .social
        .signup(&request.username, &request.password, &request.user_code)?;
    let response = auth_response(&state, user, "Signup successful")?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state.social.login(&request.username, &request.password)?;
    Ok(Json(auth_response(&state, user, "Login successful")?))
}

// ---------------------------------------------------------------------------
// Routes, gear, chat
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RouteListResponse {
    pub routes: Vec<Route>,
}

pub async fn list_routes(State(state): State<AppState>) -> Json<RouteListResponse> {
    Json(RouteListResponse {
        routes: state.catalog.all().to_vec(),
    })
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<RouteRecommendation>,
}

pub async fn recommend_routes(
    State(state): State<AppState>,
    AppJson(filters): AppJson<RouteFilters>,
) -> Json<RecommendResponse> {
    let recommendations = recommend(state.catalog.all(), &filters);
    debug!(count = recommendations.len(), "Routes recommended");
    Json(RecommendResponse { recommendations })
}

pub async fn gear_checklist(
    AppJson(request): AppJson<GearRequest>,
) -> ApiResult<Json<GearChecklist>> {
    Ok(Json(build_checklist(&request)?))
}

pub async fn chat(
    State(state): State<AppState>,
    AppJson(request): AppJson<ChatRequest>,
) -> Json<ChatResponse> {
    Json(handle_chat(&request, &state.catalog))
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct WeatherRequest {
    pub route_id: String,
    /// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC
    pub start_iso: String,
}

#[derive(Debug, Serialize)]
pub struct BriefingResponse {
    pub snapshot: WeatherSnapshot,
    pub briefing: Briefing,
    pub headline: String,
}

fn parse_start(raw: &str) -> ApiResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ApiError::Validation(format!("Invalid start_iso: {raw}")))
}

async fn snapshot_for(state: &AppState, request: &WeatherRequest) -> ApiResult<WeatherSnapshot> {
    let route = state
        .catalog
        .get(&request.route_id)
        .ok_or_else(|| ApiError::NotFound(format!("Route not found: {}", request.route_id)))?;
    let start = parse_start(&request.start_iso)?;

    Ok(match route.coordinates() {
        Some((lat, lon)) => state.weather.snapshot_at(lat, lon, start).await,
        None => fallback_snapshot(start),
    })
}

pub async fn weather_snapshot(
    State(state): State<AppState>,
    AppJson(request): AppJson<WeatherRequest>,
) -> ApiResult<Json<WeatherSnapshot>> {
    Ok(Json(snapshot_for(&state, &request).await?))
}

pub async fn weather_briefing(
    State(state): State<AppState>,
    AppJson(request): AppJson<WeatherRequest>,
) -> ApiResult<Json<BriefingResponse>> {
    let snapshot = snapshot_for(&state, &request).await?;
    let briefing = briefing(&snapshot);
    Ok(Json(BriefingResponse {
        headline: briefing.headline(),
        snapshot,
        briefing,
    }))
}

// ---------------------------------------------------------------------------
// Trip history
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TripHistoryResponse {
    pub trips: Vec<TripHistoryEntry>,
}

pub async fn trip_history(
    State(state): State<AppState>,
    AppPath(username): AppPath<String>,
) -> ApiResult<Json<TripHistoryResponse>> {
    Ok(Json(TripHistoryResponse {
        trips: state.social.trip_history(&username)?,
    }))
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FriendListResponse {
    pub friends: Vec<AuthUser>,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestList {
    pub requests: Vec<PendingRequest>,
}

#[derive(Debug, Deserialize)]
pub struct FriendAddRequest {
    pub friend_code: String,
}

#[derive(Debug, Serialize)]
pub struct FriendAddResponse {
    pub message: String,
    pub username: String,
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct RequestIdPayload {
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct FriendIdPayload {
    pub friend_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct DirectChatResponse {
    pub group_id: GroupId,
    pub new: bool,
}

pub async fn list_friends(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<Json<FriendListResponse>> {
    Ok(Json(FriendListResponse {
        friends: state.social.friends(&me)?,
    }))
}

pub async fn friend_requests(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<Json<FriendRequestList>> {
    Ok(Json(FriendRequestList {
        requests: state.social.pending_requests(&me)?,
    }))
}

pub async fn add_friend(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppJson(payload): AppJson<FriendAddRequest>,
) -> ApiResult<Json<FriendAddResponse>> {
    let (target, outcome) = state.social.send_friend_request(&me, &payload.friend_code)?;
    let request_id = match &outcome {
        FriendRequestOutcome::Sent(r)
        | FriendRequestOutcome::AlreadyPending(r)
        | FriendRequestOutcome::Accepted(r) => r.id,
    };
    Ok(Json(FriendAddResponse {
        message: outcome.message().to_string(),
        username: target.username,
        request_id,
    }))
}

pub async fn accept_friend(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppJson(payload): AppJson<RequestIdPayload>,
) -> ApiResult<Json<MessageResponse>> {
    state.social.accept_request(&me, payload.request_id)?;
    Ok(MessageResponse::new("Accepted"))
}

pub async fn decline_friend(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppJson(payload): AppJson<RequestIdPayload>,
) -> ApiResult<Json<MessageResponse>> {
    state.social.decline_request(&me, payload.request_id)?;
    Ok(MessageResponse::new("Declined"))
}

pub async fn remove_friend(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppJson(payload): AppJson<FriendIdPayload>,
) -> ApiResult<Json<MessageResponse>> {
    state.social.remove_friend(&me, payload.friend_id)?;
    Ok(MessageResponse::new("Friend removed"))
}

pub async fn direct_chat(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppJson(payload): AppJson<FriendIdPayload>,
) -> ApiResult<Json<DirectChatResponse>> {
    let chat = state.social.open_direct_chat(&me, payload.friend_id)?;
    Ok(Json(DirectChatResponse {
        group_id: chat.group.id,
        new: chat.created,
    }))
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
pub struct GroupCreateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupCreateResponse {
    pub message: String,
    pub group_id: GroupId,
    pub unresolved_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MemberInfo {
    pub user_id: UserId,
    pub username: String,
    pub user_code: String,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMember> for MemberInfo {
    fn from(member: GroupMember) -> Self {
        Self {
            user_id: member.user.id,
            username: member.user.username,
            user_code: member.user.user_code,
            role: member.role,
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberInfo>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub friend_code: String,
}

#[derive(Debug, Deserialize)]
pub struct KickRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub group_id: GroupId,
    pub sender: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<GroupMessage> for MessageView {
    fn from(message: GroupMessage) -> Self {
        Self {
            id: message.id,
            group_id: message.group_id,
            sender: message.sender,
            role: message.role,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Deserialize)]
pub struct MessageCreateRequest {
    #[serde(default)]
    pub content: String,
}

pub async fn list_groups(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<Json<GroupListResponse>> {
    Ok(Json(GroupListResponse {
        groups: state.social.groups_for(&me)?,
    }))
}

pub async fn create_group(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppJson(request): AppJson<GroupCreateRequest>,
) -> ApiResult<(StatusCode, Json<GroupCreateResponse>)> {
    let created = state.social.create_group(
        &me,
        &request.name,
        request.description.as_deref(),
        &request.member_codes,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(GroupCreateResponse {
            message: "Created".to_string(),
            group_id: created.group.id,
            unresolved_codes: created.unresolved_codes,
        }),
    ))
}

pub async fn group_members(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
) -> ApiResult<Json<MemberListResponse>> {
    let members = state.social.members(&me, group_id)?;
    Ok(Json(MemberListResponse {
        members: members.into_iter().map(MemberInfo::from).collect(),
    }))
}

pub async fn invite_member(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
    AppJson(request): AppJson<InviteRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let outcome = state.social.invite(&me, group_id, &request.friend_code)?;
    Ok(MessageResponse::new(if outcome.added {
        "Invited"
    } else {
        "Already a member"
    }))
}

pub async fn kick_member(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
    AppJson(request): AppJson<KickRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state.social.kick(&me, group_id, request.user_id)?;
    Ok(MessageResponse::new("Kicked"))
}

pub async fn leave_group(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(MessageResponse::new(match state.social.leave(&me, group_id)? {
        LeaveOutcome::Left { .. } => "Left",
        LeaveOutcome::GroupDeleted => "Left, group deleted",
    }))
}

pub async fn join_group(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
) -> ApiResult<Json<MessageResponse>> {
    let joined = state.social.join(&me, group_id)?;
    Ok(MessageResponse::new(if joined {
        "Joined"
    } else {
        "Already a member"
    }))
}

pub async fn group_messages(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
) -> ApiResult<Json<MessageListResponse>> {
    let messages = state.social.messages(&me, group_id)?;
    Ok(Json(MessageListResponse {
        messages: messages.into_iter().map(MessageView::from).collect(),
    }))
}

/// Stores the post, then lets the assistant react in the background.
pub async fn post_group_message(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
    AppJson(request): AppJson<MessageCreateRequest>,
) -> ApiResult<Json<MessageView>> {
    let posted = state.social.post_message(&me, group_id, &request.content)?;

    let assistant = state.assistant.clone();
    let content = posted.content.clone();
    tokio::spawn(async move {
        match assistant.on_user_message(group_id, &me, &content).await {
            Ok(AssistantAction::Ignored) => {}
            Ok(action) => info!(group_id = %group_id, ?action, "Assistant responded"),
            Err(e) => warn!(group_id = %group_id, error = %e, "Assistant task failed"),
        }
    });

    Ok(Json(posted.into()))
}

pub async fn ai_recommend_routes(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppPath(group_id): AppPath<GroupId>,
) -> ApiResult<Json<MessageView>> {
    // Membership check; the suggestion itself is posted on the system path.
    state.social.members(&me, group_id)?;
    let posted = state.assistant.suggest_routes(group_id)?;
    Ok(Json(posted.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn start_time_accepts_naive_and_offset_forms() {
        let naive = parse_start("2025-11-15T20:54:00").unwrap();
        assert_eq!(naive, Utc.with_ymd_and_hms(2025, 11, 15, 20, 54, 0).unwrap());

        let short = parse_start("2025-11-15T08:30").unwrap();
        assert_eq!(short.minute(), 30);

        let offset = parse_start("2025-11-15T12:00:00-08:00").unwrap();
        assert_eq!(offset.hour(), 20);

        assert!(matches!(parse_start("tomorrow"), Err(ApiError::Validation(_))));
    }
}
