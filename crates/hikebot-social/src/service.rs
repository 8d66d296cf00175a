//! Social rules on top of a [`SocialStore`].
//!
//! Store methods are individually atomic. Operations here that read then write
//! (friend requests, membership changes, admin promotion, posts) run their
//! checks and writes under one `graph_lock` hold, so a concurrent `leave`
//! cannot delete a group between the check and the write.

use hikebot_core::{
    hash_password, is_valid_user_code, verify_password, AuthUser, FriendRequest,
    FriendRequestStatus, Group, GroupId, GroupKind, GroupMember, GroupMessage, GroupRole,
    HikeBotError, MessageRole, RequestId, Result, SecurityEvent, SecurityLogger, TripHistoryEntry,
    User, UserId,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::store::{NewGroup, NewMessage, NewUser, SocialStore};

pub const MAX_GROUP_NAME_CHARS: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MESSAGE_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum FriendRequestOutcome {
    Sent(FriendRequest),
    AlreadyPending(FriendRequest),
    Accepted(FriendRequest),
}

impl FriendRequestOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Sent(_) => "Sent",
            Self::AlreadyPending(_) => "Exists",
            Self::Accepted(_) => "Accepted",
        }
    }
}

/// Incoming request joined with the sender's public identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingRequest {
    pub id: RequestId,
    pub from_user_id: UserId,
    pub from_username: String,
    pub from_user_code: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct DirectChat {
    pub group: Group,
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct CreatedGroup {
    pub group: Group,
    pub unresolved_codes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InviteOutcome {
    pub user: AuthUser,
    pub added: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left { promoted: Option<UserId> },
    GroupDeleted,
}

pub struct SocialService {
    store: Arc<dyn SocialStore>,
    graph_lock: Mutex<()>,
}

impl SocialService {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self {
            store,
            graph_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SocialStore> {
        &self.store
    }

    // -- accounts ----------------------------------------------------------

    pub fn signup(&self, username: &str, password: &str, user_code: &str) -> Result<AuthUser> {
        let username = username.trim();
        let user_code = user_code.trim();
        if username.is_empty() || password.is_empty() || user_code.is_empty() {
            return Err(HikeBotError::validation(
                "username, password and user_code are required",
            ));
        }
        if !is_valid_user_code(user_code) {
            return Err(HikeBotError::validation(
                "user_code must be 4-16 letters or digits",
            ));
        }
        if self.store.user_by_username(username)?.is_some() {
            return Err(HikeBotError::conflict("Username already exists"));
        }
        if self.store.user_by_code(user_code)?.is_some() {
            return Err(HikeBotError::conflict("User code already taken"));
        }

        let password_hash = hash_password(password)
            .map_err(|e| HikeBotError::Storage(format!("password hashing failed: {e}")))?;
        let user = self.store.insert_user(NewUser {
            username: username.to_string(),
            user_code: user_code.to_string(),
            password_hash,
        })?;

        SecurityLogger::log_event(SecurityEvent::SignupSuccess {
            user_id: user.id,
            username: user.username.clone(),
        });
        Ok(AuthUser::from(&user))
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AuthUser> {
        let username = username.trim();
        let reject = |reason: &str| {
            SecurityLogger::log_event(SecurityEvent::AuthenticationFailure {
                username: username.to_string(),
                method: "password",
                reason: reason.to_string(),
            });
            HikeBotError::Unauthorized("Invalid username or password".into())
        };

        let Some(user) = self.store.user_by_username(username)? else {
            return Err(reject("unknown user"));
        };
        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(reject("password mismatch")),
            Err(e) => return Err(reject(&e.to_string())),
        }

        SecurityLogger::log_event(SecurityEvent::AuthenticationSuccess {
            user_id: user.id,
            method: "password",
        });
        Ok(AuthUser::from(&user))
    }

    pub fn authenticate_headers(&self, username: &str, user_code: &str) -> Result<AuthUser> {
        let username = username.trim();
        let user_code = user_code.trim();
        match self.store.user_by_username(username)? {
            Some(user) if !user_code.is_empty() && user.user_code == user_code => {
                Ok(AuthUser::from(&user))
            }
            _ => {
                SecurityLogger::log_event(SecurityEvent::AuthenticationFailure {
                    username: username.to_string(),
                    method: "headers",
                    reason: "username and user code do not match".into(),
                });
                Err(HikeBotError::Unauthorized("Invalid auth headers".into()))
            }
        }
    }

    pub fn user(&self, id: UserId) -> Result<Option<AuthUser>> {
        Ok(self.store.user_by_id(id)?.as_ref().map(AuthUser::from))
    }

    // -- friends -----------------------------------------------------------

    pub fn send_friend_request(
        &self,
        me: &AuthUser,
        friend_code: &str,
    ) -> Result<(AuthUser, FriendRequestOutcome)> {
        let target = self
            .store
            .user_by_code(friend_code.trim())?
            .ok_or_else(|| HikeBotError::not_found("User not found"))?;
        if target.id == me.id {
            return Err(HikeBotError::validation("Cannot add yourself"));
        }

        let _guard = self.graph_lock.lock();
        if self.store.are_friends(me.id, target.id)? {
            return Err(HikeBotError::conflict("Already friends"));
        }

        let outcome = match self.store.friend_request_between(me.id, target.id)? {
            Some(req) if req.status == FriendRequestStatus::Pending && req.from_user_id == me.id => {
                FriendRequestOutcome::AlreadyPending(req)
            }
            Some(req) if req.status == FriendRequestStatus::Pending => {
                let accepted = self
                    .store
                    .resolve_friend_request(req.id, FriendRequestStatus::Accepted)?;
                FriendRequestOutcome::Accepted(accepted)
            }
            // Declined, or accepted by a pair that has since unfriended.
            Some(req) => {
                FriendRequestOutcome::Sent(self.store.reopen_friend_request(req.id, me.id, target.id)?)
            }
            None => FriendRequestOutcome::Sent(self.store.insert_friend_request(me.id, target.id)?),
        };

        info!(
            from = me.id,
            to = target.id,
            outcome = outcome.message(),
            "Friend request"
        );
        Ok((AuthUser::from(&target), outcome))
    }

    pub fn pending_requests(&self, me: &AuthUser) -> Result<Vec<PendingRequest>> {
        let mut pending = Vec::new();
        for req in self.store.pending_requests_for(me.id)? {
            if let Some(sender) = self.store.user_by_id(req.from_user_id)? {
                pending.push(PendingRequest {
                    id: req.id,
                    from_user_id: sender.id,
                    from_username: sender.username,
                    from_user_code: sender.user_code,
                    created_at: req.created_at,
                });
            }
        }
        Ok(pending)
    }

    pub fn accept_request(&self, me: &AuthUser, request_id: RequestId) -> Result<FriendRequest> {
        self.resolve_request(me, request_id, FriendRequestStatus::Accepted)
    }

    pub fn decline_request(&self, me: &AuthUser, request_id: RequestId) -> Result<FriendRequest> {
        self.resolve_request(me, request_id, FriendRequestStatus::Declined)
    }

    fn resolve_request(
        &self,
        me: &AuthUser,
        request_id: RequestId,
        status: FriendRequestStatus,
    ) -> Result<FriendRequest> {
        let _guard = self.graph_lock.lock();
        let request = self
            .store
            .friend_request(request_id)?
            .filter(|r| r.to_user_id == me.id)
            .ok_or_else(|| HikeBotError::not_found("Friend request not found"))?;
        if request.status != FriendRequestStatus::Pending {
            return Err(HikeBotError::conflict("Friend request already resolved"));
        }
        let resolved = self.store.resolve_friend_request(request.id, status)?;
        info!(
            request_id,
            user_id = me.id,
            status = status.as_str(),
            "Friend request resolved"
        );
        Ok(resolved)
    }

    pub fn remove_friend(&self, me: &AuthUser, friend_id: UserId) -> Result<()> {
        let _guard = self.graph_lock.lock();
        if !self.store.remove_friendship(me.id, friend_id)? {
            return Err(HikeBotError::not_found("Not friends"));
        }
        info!(user_id = me.id, friend_id, "Friendship removed");
        Ok(())
    }

    pub fn friends(&self, me: &AuthUser) -> Result<Vec<AuthUser>> {
        let mut friends: Vec<AuthUser> = self
            .store
            .friends_of(me.id)?
            .iter()
            .map(AuthUser::from)
            .collect();
        friends.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(friends)
    }

    pub fn open_direct_chat(&self, me: &AuthUser, friend_id: UserId) -> Result<DirectChat> {
        if friend_id == me.id {
            return Err(HikeBotError::validation("Cannot open a chat with yourself"));
        }
        let _guard = self.graph_lock.lock();
        let friend = self
            .store
            .user_by_id(friend_id)?
            .ok_or_else(|| HikeBotError::not_found("User not found"))?;
        if !self.store.are_friends(me.id, friend_id)? {
            self.deny(me, format!("dm:{friend_id}"), "not friends");
            return Err(HikeBotError::forbidden("You can only message friends"));
        }
        if let Some(group) = self.store.find_direct_group(me.id, friend_id)? {
            return Ok(DirectChat {
                group,
                created: false,
            });
        }

        let group = self.store.insert_group(
            NewGroup {
                name: format!("{} & {}", me.username, friend.username),
                description: None,
                kind: GroupKind::Direct,
                created_by: Some(me.id),
            },
            &[(me.id, GroupRole::Admin), (friend_id, GroupRole::Admin)],
        )?;
        info!(group_id = %group.id, user_id = me.id, friend_id, "Direct chat opened");
        Ok(DirectChat {
            group,
            created: true,
        })
    }

    // -- groups ------------------------------------------------------------

    pub fn create_group(
        &self,
        me: &AuthUser,
        name: &str,
        description: Option<&str>,
        member_codes: &[String],
    ) -> Result<CreatedGroup> {
        let name = name.trim();
        let name_len = name.chars().count();
        if name_len == 0 || name_len > MAX_GROUP_NAME_CHARS {
            return Err(HikeBotError::validation(format!(
                "Group name must be 1-{MAX_GROUP_NAME_CHARS} characters"
            )));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let mut seen = HashSet::new();
        let mut members = vec![(me.id, GroupRole::Admin)];
        let mut unresolved_codes = Vec::new();
        for code in member_codes.iter().map(|c| c.trim()) {
            if code.is_empty() || code == me.user_code || !seen.insert(code) {
                continue;
            }
            match self.store.user_by_code(code)? {
                Some(user) => members.push((user.id, GroupRole::Member)),
                None => unresolved_codes.push(code.to_string()),
            }
        }

        let group = self.store.insert_group(
            NewGroup {
                name: name.to_string(),
                description,
                kind: GroupKind::Group,
                created_by: Some(me.id),
            },
            &members,
        )?;
        info!(
            group_id = %group.id,
            created_by = me.id,
            members = members.len(),
            unresolved = unresolved_codes.len(),
            "Group created"
        );
        Ok(CreatedGroup {
            group,
            unresolved_codes,
        })
    }

    pub fn groups_for(&self, me: &AuthUser) -> Result<Vec<Group>> {
        self.store.groups_for(me.id)
    }

    pub fn group(&self, group_id: GroupId) -> Result<Group> {
        self.store
            .group(group_id)?
            .ok_or_else(|| HikeBotError::not_found("Group not found"))
    }

    fn require_member(&self, me: &AuthUser, group_id: GroupId) -> Result<(Group, GroupRole)> {
        let group = self.group(group_id)?;
        match self.store.membership(group_id, me.id)? {
            Some(role) => Ok((group, role)),
            None => {
                self.deny(me, format!("group:{group_id}"), "not a member");
                Err(HikeBotError::forbidden("Not a member of this group"))
            }
        }
    }

    fn deny(&self, me: &AuthUser, resource: String, reason: &str) {
        SecurityLogger::log_event(SecurityEvent::PermissionDenied {
            user_id: me.id,
            resource,
            reason: reason.to_string(),
        });
    }

    pub fn members(&self, me: &AuthUser, group_id: GroupId) -> Result<Vec<GroupMember>> {
        self.require_member(me, group_id)?;
        self.store.members(group_id)
    }

    pub fn invite(&self, me: &AuthUser, group_id: GroupId, friend_code: &str) -> Result<InviteOutcome> {
        let _guard = self.graph_lock.lock();
        let (group, _) = self.require_member(me, group_id)?;
        if group.kind == GroupKind::Direct {
            return Err(HikeBotError::validation("Direct chats cannot take invites"));
        }
        let user = self
            .store
            .user_by_code(friend_code.trim())?
            .ok_or_else(|| HikeBotError::not_found("User not found"))?;
        let added = self.store.add_member(group_id, user.id, GroupRole::Member)?;
        debug!(group_id = %group_id, user_id = user.id, added, "Invite");
        Ok(InviteOutcome {
            user: AuthUser::from(&user),
            added,
        })
    }

    pub fn kick(&self, me: &AuthUser, group_id: GroupId, user_id: UserId) -> Result<()> {
        let _guard = self.graph_lock.lock();
        let (group, role) = self.require_member(me, group_id)?;
        if role != GroupRole::Admin {
            self.deny(me, format!("group:{group_id}"), "kick requires admin");
            return Err(HikeBotError::forbidden("Only admins can remove members"));
        }
        if group.kind == GroupKind::Direct {
            return Err(HikeBotError::validation("Cannot remove members from a direct chat"));
        }
        if user_id == me.id {
            return Err(HikeBotError::validation("Use leave to exit a group"));
        }
        if !self.store.remove_member(group_id, user_id)? {
            return Err(HikeBotError::not_found("User is not a member"));
        }
        info!(group_id = %group_id, by = me.id, user_id, "Member removed");
        Ok(())
    }

    pub fn leave(&self, me: &AuthUser, group_id: GroupId) -> Result<LeaveOutcome> {
        let _guard = self.graph_lock.lock();
        self.require_member(me, group_id)?;
        self.store.remove_member(group_id, me.id)?;

        let remaining = self.store.members(group_id)?;
        let Some(earliest) = remaining.first() else {
            self.store.delete_group(group_id)?;
            info!(group_id = %group_id, "Empty group deleted");
            return Ok(LeaveOutcome::GroupDeleted);
        };

        let promoted = if remaining.iter().any(|m| m.role == GroupRole::Admin) {
            None
        } else {
            self.store
                .set_role(group_id, earliest.user.id, GroupRole::Admin)?;
            info!(group_id = %group_id, user_id = earliest.user.id, "Promoted to admin");
            Some(earliest.user.id)
        };
        Ok(LeaveOutcome::Left { promoted })
    }

    /// Returns true when the caller was newly added.
    pub fn join(&self, me: &AuthUser, group_id: GroupId) -> Result<bool> {
        let _guard = self.graph_lock.lock();
        let group = self.group(group_id)?;
        if group.kind == GroupKind::Direct {
            self.deny(me, format!("group:{group_id}"), "direct chats are private");
            return Err(HikeBotError::forbidden("Direct chats cannot be joined"));
        }
        self.store.add_member(group_id, me.id, GroupRole::Member)
    }

    // -- messages ----------------------------------------------------------

    pub fn messages(&self, me: &AuthUser, group_id: GroupId) -> Result<Vec<GroupMessage>> {
        self.require_member(me, group_id)?;
        self.store.recent_messages(group_id, MESSAGE_HISTORY_LIMIT)
    }

    pub fn post_message(&self, me: &AuthUser, group_id: GroupId, content: &str) -> Result<GroupMessage> {
        let content = content.trim();
        let len = content.chars().count();
        let _guard = self.graph_lock.lock();
        self.require_member(me, group_id)?;
        if len == 0 || len > MAX_MESSAGE_CHARS {
            return Err(HikeBotError::validation(format!(
                "Message must be 1-{MAX_MESSAGE_CHARS} characters"
            )));
        }
        self.store.insert_message(NewMessage {
            group_id,
            user_id: Some(me.id),
            sender: me.username.clone(),
            role: MessageRole::User,
            content: content.to_string(),
        })
    }

    /// Posts on behalf of the assistant. No membership check.
    pub fn post_assistant_message(
        &self,
        group_id: GroupId,
        sender: &str,
        content: &str,
    ) -> Result<GroupMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(HikeBotError::validation("Message must not be empty"));
        }
        let _guard = self.graph_lock.lock();
        self.group(group_id)?;
        self.store.insert_message(NewMessage {
            group_id,
            user_id: None,
            sender: sender.to_string(),
            role: MessageRole::Assistant,
            content: content.to_string(),
        })
    }

    /// Recent messages for assistant context. No membership check.
    pub fn context_messages(&self, group_id: GroupId, limit: usize) -> Result<Vec<GroupMessage>> {
        self.store.recent_messages(group_id, limit)
    }

    // -- trips -------------------------------------------------------------

    pub fn record_trip(&self, user_id: UserId, entry: TripHistoryEntry) -> Result<()> {
        debug!(user_id, trip = %entry.trip_name, "Recording trip");
        self.store.record_trip(user_id, entry)
    }

    /// Unknown usernames have no history.
    pub fn trip_history(&self, username: &str) -> Result<Vec<TripHistoryEntry>> {
        match self.store.user_by_username(username.trim())? {
            Some(User { id, .. }) => self.store.trips_for(id),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;

    fn service() -> SocialService {
        SocialService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn signup_validates_input() {
        let svc = service();
        assert!(matches!(
            svc.signup("  ", "pw", "CODE1"),
            Err(HikeBotError::Validation(_))
        ));
        assert!(matches!(
            svc.signup("ana", "pw", "no!"),
            Err(HikeBotError::Validation(_))
        ));

        let ana = svc.signup(" ana ", "pw", "ANA1").unwrap();
        assert_eq!(ana.username, "ana");
        assert!(matches!(
            svc.signup("ana", "pw", "ANA2"),
            Err(HikeBotError::Conflict(_))
        ));
        assert!(matches!(
            svc.signup("bob", "pw", "ANA1"),
            Err(HikeBotError::Conflict(_))
        ));
    }

    #[test]
    fn login_errors_are_generic() {
        let svc = service();
        svc.signup("ana", "secret", "ANA1").unwrap();

        let unknown = svc.login("nobody", "secret").unwrap_err().to_string();
        let wrong = svc.login("ana", "nope").unwrap_err().to_string();
        assert_eq!(unknown, wrong);
        assert_eq!(svc.login("ana", "secret").unwrap().user_code, "ANA1");
    }

    #[test]
    fn header_auth_requires_matching_code() {
        let svc = service();
        svc.signup("ana", "pw", "ANA1").unwrap();
        assert!(svc.authenticate_headers("ana", "ANA1").is_ok());
        assert!(matches!(
            svc.authenticate_headers("ana", "ANA2"),
            Err(HikeBotError::Unauthorized(_))
        ));
    }

    #[test]
    fn leave_promotes_earliest_member() {
        let svc = service();
        let ana = svc.signup("ana", "pw", "ANA1").unwrap();
        let ben = svc.signup("ben", "pw", "BEN1").unwrap();
        let cal = svc.signup("cal", "pw", "CAL1").unwrap();

        let created = svc
            .create_group(&ana, "Crew", None, &["BEN1".into(), "CAL1".into()])
            .unwrap();
        let gid = created.group.id;

        assert_eq!(
            svc.leave(&ana, gid).unwrap(),
            LeaveOutcome::Left {
                promoted: Some(ben.id)
            }
        );
        assert_eq!(svc.leave(&cal, gid).unwrap(), LeaveOutcome::Left { promoted: None });
        assert_eq!(svc.leave(&ben, gid).unwrap(), LeaveOutcome::GroupDeleted);
        assert!(matches!(svc.group(gid), Err(HikeBotError::NotFound(_))));
    }

    #[test]
    fn message_length_is_bounded() {
        let svc = service();
        let ana = svc.signup("ana", "pw", "ANA1").unwrap();
        let gid = svc.create_group(&ana, "Crew", None, &[]).unwrap().group.id;

        assert!(matches!(
            svc.post_message(&ana, gid, "   "),
            Err(HikeBotError::Validation(_))
        ));
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            svc.post_message(&ana, gid, &long),
            Err(HikeBotError::Validation(_))
        ));
        let msg = svc.post_message(&ana, gid, "  hi  ").unwrap();
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.role, MessageRole::User);
    }

    #[test]
    fn unknown_user_has_empty_trip_history() {
        let svc = service();
        assert!(svc.trip_history("ghost").unwrap().is_empty());
    }
}
