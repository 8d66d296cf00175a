//! Persistence seam for the social graph.
//!
//! Every method is atomic on its own. Multi-step rules (friend-request state
//! machine, admin promotion, empty-group cleanup) live in `SocialService`.

use hikebot_core::{
    FriendRequest, FriendRequestStatus, Group, GroupId, GroupKind, GroupMember, GroupMessage,
    GroupRole, MessageRole, RequestId, Result, TripHistoryEntry, User, UserId,
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub user_code: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub kind: GroupKind,
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub group_id: GroupId,
    pub user_id: Option<UserId>,
    pub sender: String,
    pub role: MessageRole,
    pub content: String,
}

pub trait SocialStore: Send + Sync {
    /// Fails with `Conflict` when the username or user code is taken.
    fn insert_user(&self, user: NewUser) -> Result<User>;
    fn user_by_id(&self, id: UserId) -> Result<Option<User>>;
    fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn user_by_code(&self, code: &str) -> Result<Option<User>>;

    fn friend_request(&self, id: RequestId) -> Result<Option<FriendRequest>>;
    /// The request between two users in either direction, if any.
    fn friend_request_between(&self, a: UserId, b: UserId) -> Result<Option<FriendRequest>>;
    fn insert_friend_request(&self, from: UserId, to: UserId) -> Result<FriendRequest>;
    /// Turn an existing request back into a pending one from `from` to `to`.
    fn reopen_friend_request(
        &self,
        id: RequestId,
        from: UserId,
        to: UserId,
    ) -> Result<FriendRequest>;
    fn pending_requests_for(&self, user: UserId) -> Result<Vec<FriendRequest>>;
    /// Resolve a pending request. Accepting also records the friendship in both
    /// directions. Fails with `Conflict` when the request is no longer pending.
    fn resolve_friend_request(
        &self,
        id: RequestId,
        status: FriendRequestStatus,
    ) -> Result<FriendRequest>;

    fn are_friends(&self, a: UserId, b: UserId) -> Result<bool>;
    fn friends_of(&self, user: UserId) -> Result<Vec<User>>;
    /// Deletes both friendship rows and any request between the pair.
    /// Returns false when the two were not friends.
    fn remove_friendship(&self, a: UserId, b: UserId) -> Result<bool>;

    fn insert_group(&self, group: NewGroup, members: &[(UserId, GroupRole)]) -> Result<Group>;
    fn group(&self, id: GroupId) -> Result<Option<Group>>;
    /// Groups the user belongs to, newest first.
    fn groups_for(&self, user: UserId) -> Result<Vec<Group>>;
    fn find_direct_group(&self, a: UserId, b: UserId) -> Result<Option<Group>>;
    fn membership(&self, group: GroupId, user: UserId) -> Result<Option<GroupRole>>;
    /// Members in join order.
    fn members(&self, group: GroupId) -> Result<Vec<GroupMember>>;
    /// Returns false when the user was already a member.
    fn add_member(&self, group: GroupId, user: UserId, role: GroupRole) -> Result<bool>;
    /// Returns false when the user was not a member.
    fn remove_member(&self, group: GroupId, user: UserId) -> Result<bool>;
    fn set_role(&self, group: GroupId, user: UserId, role: GroupRole) -> Result<()>;
    /// Removes the group with its members and messages.
    fn delete_group(&self, group: GroupId) -> Result<()>;

    fn insert_message(&self, message: NewMessage) -> Result<GroupMessage>;
    /// The latest `limit` messages, oldest first.
    fn recent_messages(&self, group: GroupId, limit: usize) -> Result<Vec<GroupMessage>>;

    fn record_trip(&self, user: UserId, entry: TripHistoryEntry) -> Result<()>;
    fn trips_for(&self, user: UserId) -> Result<Vec<TripHistoryEntry>>;
}
