use chrono::Utc;
use hikebot_core::{
    AuthUser, FriendRequest, FriendRequestStatus, Group, GroupId, GroupKind, GroupMember,
    GroupMessage, GroupRole, HikeBotError, MessageId, RequestId, Result, TripHistoryEntry, User,
    UserId,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use crate::store::{NewGroup, NewMessage, NewUser, SocialStore};

#[derive(Debug, Clone)]
struct MemberRow {
    user_id: UserId,
    role: GroupRole,
    joined_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct GroupRow {
    group: Group,
    seq: u64,
    members: Vec<MemberRow>,
    messages: Vec<GroupMessage>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    next_user_id: UserId,
    requests: BTreeMap<RequestId, FriendRequest>,
    next_request_id: RequestId,
    friendships: BTreeSet<(UserId, UserId)>,
    groups: HashMap<GroupId, GroupRow>,
    next_group_seq: u64,
    next_message_id: MessageId,
    trips: HashMap<UserId, Vec<TripHistoryEntry>>,
}

impl Inner {
    fn auth_user(&self, id: UserId) -> Option<AuthUser> {
        self.users.get(&id).map(AuthUser::from)
    }

    fn group_row_mut(&mut self, id: GroupId) -> Result<&mut GroupRow> {
        self.groups
            .get_mut(&id)
            .ok_or_else(|| HikeBotError::not_found(format!("group {id}")))
    }
}

/// Process-local store. Everything is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SocialStore for MemoryStore {
    fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.write();
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(HikeBotError::conflict("Username already exists"));
        }
        if inner.users.values().any(|u| u.user_code == user.user_code) {
            return Err(HikeBotError::conflict("User code already taken"));
        }
        inner.next_user_id += 1;
        let created = User {
            id: inner.next_user_id,
            username: user.username,
            user_code: user.user_code,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn user_by_code(&self, code: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .read()
            .users
            .values()
            .find(|u| u.user_code == code)
            .cloned())
    }

    fn friend_request(&self, id: RequestId) -> Result<Option<FriendRequest>> {
        Ok(self.inner.read().requests.get(&id).cloned())
    }

    fn friend_request_between(&self, a: UserId, b: UserId) -> Result<Option<FriendRequest>> {
        Ok(self
            .inner
            .read()
            .requests
            .values()
            .find(|r| r.involves(a, b))
            .cloned())
    }

    fn insert_friend_request(&self, from: UserId, to: UserId) -> Result<FriendRequest> {
        let mut inner = self.inner.write();
        if inner.requests.values().any(|r| r.involves(from, to)) {
            return Err(HikeBotError::conflict("Friend request already exists"));
        }
        inner.next_request_id += 1;
        let request = FriendRequest {
            id: inner.next_request_id,
            from_user_id: from,
            to_user_id: to,
            status: FriendRequestStatus::Pending,
            created_at: Utc::now(),
        };
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn reopen_friend_request(
        &self,
        id: RequestId,
        from: UserId,
        to: UserId,
    ) -> Result<FriendRequest> {
        let mut inner = self.inner.write();
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| HikeBotError::not_found("Friend request not found"))?;
        request.from_user_id = from;
        request.to_user_id = to;
        request.status = FriendRequestStatus::Pending;
        request.created_at = Utc::now();
        Ok(request.clone())
    }

    fn pending_requests_for(&self, user: UserId) -> Result<Vec<FriendRequest>> {
        let mut pending: Vec<FriendRequest> = self
            .inner
            .read()
            .requests
            .values()
            .filter(|r| r.to_user_id == user && r.status == FriendRequestStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(pending)
    }

    fn resolve_friend_request(
        &self,
        id: RequestId,
        status: FriendRequestStatus,
    ) -> Result<FriendRequest> {
        let mut inner = self.inner.write();
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| HikeBotError::not_found("Friend request not found"))?;
        if request.status != FriendRequestStatus::Pending {
            return Err(HikeBotError::conflict("Friend request already resolved"));
        }
        request.status = status;
        let resolved = request.clone();

        if status == FriendRequestStatus::Accepted {
            inner
                .friendships
                .insert((resolved.from_user_id, resolved.to_user_id));
            inner
                .friendships
                .insert((resolved.to_user_id, resolved.from_user_id));
        }
        Ok(resolved)
    }

    fn are_friends(&self, a: UserId, b: UserId) -> Result<bool> {
        Ok(self.inner.read().friendships.contains(&(a, b)))
    }

    fn friends_of(&self, user: UserId) -> Result<Vec<User>> {
        let inner = self.inner.read();
        Ok(inner
            .friendships
            .range((user, UserId::MIN)..=(user, UserId::MAX))
            .filter_map(|(_, friend)| inner.users.get(friend).cloned())
            .collect())
    }

    fn remove_friendship(&self, a: UserId, b: UserId) -> Result<bool> {
        let mut inner = self.inner.write();
        let removed = inner.friendships.remove(&(a, b));
        inner.friendships.remove(&(b, a));
        if removed {
            inner.requests.retain(|_, r| !r.involves(a, b));
        }
        Ok(removed)
    }

    fn insert_group(&self, group: NewGroup, members: &[(UserId, GroupRole)]) -> Result<Group> {
        let mut inner = self.inner.write();
        if let Some((missing, _)) = members.iter().find(|(id, _)| !inner.users.contains_key(id)) {
            return Err(HikeBotError::not_found(format!("user {missing}")));
        }

        let now = Utc::now();
        let created = Group {
            id: Uuid::new_v4(),
            name: group.name,
            description: group.description,
            kind: group.kind,
            created_by: group.created_by,
            created_at: now,
        };
        let mut rows: Vec<MemberRow> = Vec::with_capacity(members.len());
        for (user_id, role) in members {
            if rows.iter().all(|m| m.user_id != *user_id) {
                rows.push(MemberRow {
                    user_id: *user_id,
                    role: *role,
                    joined_at: now,
                });
            }
        }

        inner.next_group_seq += 1;
        let seq = inner.next_group_seq;
        inner.groups.insert(
            created.id,
            GroupRow {
                group: created.clone(),
                seq,
                members: rows,
                messages: Vec::new(),
            },
        );
        Ok(created)
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.inner.read().groups.get(&id).map(|row| row.group.clone()))
    }

    fn groups_for(&self, user: UserId) -> Result<Vec<Group>> {
        let inner = self.inner.read();
        let mut rows: Vec<&GroupRow> = inner
            .groups
            .values()
            .filter(|row| row.members.iter().any(|m| m.user_id == user))
            .collect();
        rows.sort_by(|a, b| {
            b.group
                .created_at
                .cmp(&a.group.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(rows.into_iter().map(|row| row.group.clone()).collect())
    }

    fn find_direct_group(&self, a: UserId, b: UserId) -> Result<Option<Group>> {
        let inner = self.inner.read();
        Ok(inner
            .groups
            .values()
            .filter(|row| row.group.kind == GroupKind::Direct)
            .find(|row| {
                row.members.len() == 2
                    && row.members.iter().any(|m| m.user_id == a)
                    && row.members.iter().any(|m| m.user_id == b)
            })
            .map(|row| row.group.clone()))
    }

    fn membership(&self, group: GroupId, user: UserId) -> Result<Option<GroupRole>> {
        Ok(self.inner.read().groups.get(&group).and_then(|row| {
            row.members
                .iter()
                .find(|m| m.user_id == user)
                .map(|m| m.role)
        }))
    }

    fn members(&self, group: GroupId) -> Result<Vec<GroupMember>> {
        let inner = self.inner.read();
        let Some(row) = inner.groups.get(&group) else {
            return Ok(Vec::new());
        };
        Ok(row
            .members
            .iter()
            .filter_map(|m| {
                Some(GroupMember {
                    user: inner.auth_user(m.user_id)?,
                    role: m.role,
                    joined_at: m.joined_at,
                })
            })
            .collect())
    }

    fn add_member(&self, group: GroupId, user: UserId, role: GroupRole) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.users.contains_key(&user) {
            return Err(HikeBotError::not_found(format!("user {user}")));
        }
        let row = inner.group_row_mut(group)?;
        if row.members.iter().any(|m| m.user_id == user) {
            return Ok(false);
        }
        row.members.push(MemberRow {
            user_id: user,
            role,
            joined_at: Utc::now(),
        });
        Ok(true)
    }

    fn remove_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        let mut inner = self.inner.write();
        let row = inner.group_row_mut(group)?;
        let before = row.members.len();
        row.members.retain(|m| m.user_id != user);
        Ok(row.members.len() != before)
    }

    fn set_role(&self, group: GroupId, user: UserId, role: GroupRole) -> Result<()> {
        let mut inner = self.inner.write();
        let row = inner.group_row_mut(group)?;
        let member = row
            .members
            .iter_mut()
            .find(|m| m.user_id == user)
            .ok_or_else(|| HikeBotError::not_found(format!("member {user}")))?;
        member.role = role;
        Ok(())
    }

    fn delete_group(&self, group: GroupId) -> Result<()> {
        self.inner.write().groups.remove(&group);
        Ok(())
    }

    fn insert_message(&self, message: NewMessage) -> Result<GroupMessage> {
        let mut inner = self.inner.write();
        inner.next_message_id += 1;
        let id = inner.next_message_id;
        let row = inner.group_row_mut(message.group_id)?;
        let stored = GroupMessage {
            id,
            group_id: message.group_id,
            user_id: message.user_id,
            sender: message.sender,
            role: message.role,
            content: message.content,
            created_at: Utc::now(),
        };
        row.messages.push(stored.clone());
        Ok(stored)
    }

    fn recent_messages(&self, group: GroupId, limit: usize) -> Result<Vec<GroupMessage>> {
        let inner = self.inner.read();
        let Some(row) = inner.groups.get(&group) else {
            return Ok(Vec::new());
        };
        let skip = row.messages.len().saturating_sub(limit);
        Ok(row.messages[skip..].to_vec())
    }

    fn record_trip(&self, user: UserId, entry: TripHistoryEntry) -> Result<()> {
        self.inner.write().trips.entry(user).or_default().push(entry);
        Ok(())
    }

    fn trips_for(&self, user: UserId) -> Result<Vec<TripHistoryEntry>> {
        Ok(self
            .inner
            .read()
            .trips
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }
}
