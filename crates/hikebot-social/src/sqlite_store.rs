//! SQLite-backed social store.
//!
//! Timestamps are stored as RFC 3339 text with microsecond precision so that
//! lexical order matches chronological order. Group ids are stored as text.

use chrono::{DateTime, SecondsFormat, Utc};
use hikebot_core::{
    AuthUser, FriendRequest, FriendRequestStatus, Group, GroupId, GroupKind, GroupMember,
    GroupMessage, GroupRole, HikeBotError, RequestId, Result, TripHistoryEntry, User, UserId,
};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::store::{NewGroup, NewMessage, NewUser, SocialStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        user_code TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS friend_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_user_id INTEGER NOT NULL REFERENCES users(id),
        to_user_id INTEGER NOT NULL REFERENCES users(id),
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL,
        UNIQUE (from_user_id, to_user_id)
    );
    CREATE TABLE IF NOT EXISTS friendships (
        user_id INTEGER NOT NULL REFERENCES users(id),
        friend_id INTEGER NOT NULL REFERENCES users(id),
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, friend_id)
    );
    CREATE TABLE IF NOT EXISTS chat_groups (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        kind TEXT NOT NULL DEFAULT 'group',
        created_by INTEGER REFERENCES users(id),
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS group_members (
        group_id TEXT NOT NULL REFERENCES chat_groups(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id),
        role TEXT NOT NULL DEFAULT 'member',
        joined_at TEXT NOT NULL,
        PRIMARY KEY (group_id, user_id)
    );
    CREATE TABLE IF NOT EXISTS group_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        group_id TEXT NOT NULL REFERENCES chat_groups(id) ON DELETE CASCADE,
        user_id INTEGER REFERENCES users(id),
        sender TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_group_messages_group
        ON group_messages (group_id, id);
    CREATE TABLE IF NOT EXISTS trip_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        trip_name TEXT NOT NULL,
        trip_date TEXT NOT NULL,
        role TEXT NOT NULL,
        status TEXT NOT NULL
    );
";

fn map_err(prefix: &str, err: rusqlite::Error) -> HikeBotError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            return HikeBotError::conflict(format!("{prefix}: {err}"));
        }
    }
    HikeBotError::Storage(format!("{prefix}: {err}"))
}

fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn enum_column<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion(idx, e))
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion(idx, e))
}

const USER_COLUMNS: &str = "id, username, user_code, password_hash, created_at";

fn user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        user_code: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: ts_column(row, 4)?,
    })
}

const REQUEST_COLUMNS: &str = "id, from_user_id, to_user_id, status, created_at";

fn request_row(row: &Row<'_>) -> rusqlite::Result<FriendRequest> {
    Ok(FriendRequest {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        status: enum_column(row, 3)?,
        created_at: ts_column(row, 4)?,
    })
}

const GROUP_COLUMNS: &str = "g.id, g.name, g.description, g.kind, g.created_by, g.created_at";

fn group_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        kind: enum_column(row, 3)?,
        created_by: row.get(4)?,
        created_at: ts_column(row, 5)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, group_id, user_id, sender, role, content, created_at";

fn message_row(row: &Row<'_>) -> rusqlite::Result<GroupMessage> {
    Ok(GroupMessage {
        id: row.get(0)?,
        group_id: uuid_column(row, 1)?,
        user_id: row.get(2)?,
        sender: row.get(3)?,
        role: enum_column(row, 4)?,
        content: row.get(5)?,
        created_at: ts_column(row, 6)?,
    })
}

/// Durable store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| map_err("open sqlite db", e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| map_err("set journal_mode", e))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| map_err("set synchronous", e))?;
        info!(path = %path.display(), "Opened SQLite social store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| map_err("open sqlite db", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| map_err("enable foreign_keys", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| map_err("ensure schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_user(&self, clause: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} = ?1"),
            [value],
            user_row,
        )
        .optional()
        .map_err(|e| map_err("read user", e))
    }

    fn load_request(conn: &Connection, id: RequestId) -> Result<Option<FriendRequest>> {
        conn.query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"),
            params![id],
            request_row,
        )
        .optional()
        .map_err(|e| map_err("read friend request", e))
    }

    fn load_group(conn: &Connection, id: GroupId) -> Result<Option<Group>> {
        conn.query_row(
            &format!("SELECT {GROUP_COLUMNS} FROM chat_groups g WHERE g.id = ?1"),
            params![id.to_string()],
            group_row,
        )
        .optional()
        .map_err(|e| map_err("read group", e))
    }
}

impl SocialStore for SqliteStore {
    fn insert_user(&self, user: NewUser) -> Result<User> {
        let conn = self.conn.lock();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO users (username, user_code, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.username, user.user_code, user.password_hash, ts(created_at)],
        )
        .map_err(|e| map_err("insert user", e))?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: user.username,
            user_code: user.user_code,
            password_hash: user.password_hash,
            created_at,
        })
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.query_user("id", &id)
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.query_user("username", &username)
    }

    fn user_by_code(&self, code: &str) -> Result<Option<User>> {
        self.query_user("user_code", &code)
    }

    fn friend_request(&self, id: RequestId) -> Result<Option<FriendRequest>> {
        Self::load_request(&self.conn.lock(), id)
    }

    fn friend_request_between(&self, a: UserId, b: UserId) -> Result<Option<FriendRequest>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {REQUEST_COLUMNS} FROM friend_requests
                 WHERE (from_user_id = ?1 AND to_user_id = ?2)
                    OR (from_user_id = ?2 AND to_user_id = ?1)
                 ORDER BY id DESC LIMIT 1"
            ),
            params![a, b],
            request_row,
        )
        .optional()
        .map_err(|e| map_err("read friend request", e))
    }

    fn insert_friend_request(&self, from: UserId, to: UserId) -> Result<FriendRequest> {
        let conn = self.conn.lock();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO friend_requests (from_user_id, to_user_id, status, created_at)
             VALUES (?1, ?2, 'pending', ?3)",
            params![from, to, ts(created_at)],
        )
        .map_err(|e| map_err("insert friend request", e))?;

        Ok(FriendRequest {
            id: conn.last_insert_rowid(),
            from_user_id: from,
            to_user_id: to,
            status: FriendRequestStatus::Pending,
            created_at,
        })
    }

    fn reopen_friend_request(
        &self,
        id: RequestId,
        from: UserId,
        to: UserId,
    ) -> Result<FriendRequest> {
        let conn = self.conn.lock();
        let created_at = Utc::now();
        let changed = conn
            .execute(
                "UPDATE friend_requests
                 SET from_user_id = ?2, to_user_id = ?3, status = 'pending', created_at = ?4
                 WHERE id = ?1",
                params![id, from, to, ts(created_at)],
            )
            .map_err(|e| map_err("reopen friend request", e))?;
        if changed == 0 {
            return Err(HikeBotError::not_found("Friend request not found"));
        }

        Ok(FriendRequest {
            id,
            from_user_id: from,
            to_user_id: to,
            status: FriendRequestStatus::Pending,
            created_at,
        })
    }

    fn pending_requests_for(&self, user: UserId) -> Result<Vec<FriendRequest>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM friend_requests
                 WHERE to_user_id = ?1 AND status = 'pending'
                 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(|e| map_err("prepare pending requests", e))?;
        let rows = stmt
            .query_map(params![user], request_row)
            .map_err(|e| map_err("query pending requests", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| map_err("decode friend request", e))
    }

    fn resolve_friend_request(
        &self,
        id: RequestId,
        status: FriendRequestStatus,
    ) -> Result<FriendRequest> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| map_err("begin tx", e))?;

        let mut request = Self::load_request(&tx, id)?
            .ok_or_else(|| HikeBotError::not_found("Friend request not found"))?;
        if request.status != FriendRequestStatus::Pending {
            return Err(HikeBotError::conflict("Friend request already resolved"));
        }

        tx.execute(
            "UPDATE friend_requests SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )
        .map_err(|e| map_err("update friend request", e))?;

        if status == FriendRequestStatus::Accepted {
            let now = ts(Utc::now());
            for (user, friend) in [
                (request.from_user_id, request.to_user_id),
                (request.to_user_id, request.from_user_id),
            ] {
                tx.execute(
                    "INSERT OR IGNORE INTO friendships (user_id, friend_id, created_at) VALUES (?1, ?2, ?3)",
                    params![user, friend, now],
                )
                .map_err(|e| map_err("insert friendship", e))?;
            }
        }

        tx.commit().map_err(|e| map_err("commit tx", e))?;
        request.status = status;
        Ok(request)
    }

    fn are_friends(&self, a: UserId, b: UserId) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
                params![a, b],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| map_err("read friendship", e))?;
        Ok(found.is_some())
    }

    fn friends_of(&self, user: UserId) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT u.id, u.username, u.user_code, u.password_hash, u.created_at
                 FROM friendships f JOIN users u ON u.id = f.friend_id
                 WHERE f.user_id = ?1
                 ORDER BY u.username",
            )
            .map_err(|e| map_err("prepare friends", e))?;
        let rows = stmt
            .query_map(params![user], user_row)
            .map_err(|e| map_err("query friends", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| map_err("decode user", e))
    }

    fn remove_friendship(&self, a: UserId, b: UserId) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| map_err("begin tx", e))?;
        let removed = tx
            .execute(
                "DELETE FROM friendships
                 WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
                params![a, b],
            )
            .map_err(|e| map_err("delete friendship", e))?;
        if removed > 0 {
            tx.execute(
                "DELETE FROM friend_requests
                 WHERE (from_user_id = ?1 AND to_user_id = ?2) OR (from_user_id = ?2 AND to_user_id = ?1)",
                params![a, b],
            )
            .map_err(|e| map_err("delete friend requests", e))?;
        }
        tx.commit().map_err(|e| map_err("commit tx", e))?;
        Ok(removed > 0)
    }

    fn insert_group(&self, group: NewGroup, members: &[(UserId, GroupRole)]) -> Result<Group> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| map_err("begin tx", e))?;

        let created = Group {
            id: Uuid::new_v4(),
            name: group.name,
            description: group.description,
            kind: group.kind,
            created_by: group.created_by,
            created_at: Utc::now(),
        };
        let created_at = ts(created.created_at);
        tx.execute(
            "INSERT INTO chat_groups (id, name, description, kind, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                created.id.to_string(),
                created.name,
                created.description,
                created.kind.as_str(),
                created.created_by,
                created_at
            ],
        )
        .map_err(|e| map_err("insert group", e))?;

        for (user, role) in members {
            tx.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![created.id.to_string(), user, role.as_str(), created_at],
            )
            .map_err(|e| map_err("insert group member", e))?;
        }

        tx.commit().map_err(|e| map_err("commit tx", e))?;
        Ok(created)
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>> {
        Self::load_group(&self.conn.lock(), id)
    }

    fn groups_for(&self, user: UserId) -> Result<Vec<Group>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {GROUP_COLUMNS} FROM chat_groups g
                 JOIN group_members m ON m.group_id = g.id
                 WHERE m.user_id = ?1
                 ORDER BY g.created_at DESC, g.rowid DESC"
            ))
            .map_err(|e| map_err("prepare groups", e))?;
        let rows = stmt
            .query_map(params![user], group_row)
            .map_err(|e| map_err("query groups", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| map_err("decode group", e))
    }

    fn find_direct_group(&self, a: UserId, b: UserId) -> Result<Option<Group>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {GROUP_COLUMNS} FROM chat_groups g
                 WHERE g.kind = 'direct'
                   AND EXISTS (SELECT 1 FROM group_members WHERE group_id = g.id AND user_id = ?1)
                   AND EXISTS (SELECT 1 FROM group_members WHERE group_id = g.id AND user_id = ?2)
                   AND (SELECT COUNT(*) FROM group_members WHERE group_id = g.id) = 2
                 LIMIT 1"
            ),
            params![a, b],
            group_row,
        )
        .optional()
        .map_err(|e| map_err("read direct group", e))
    }

    fn membership(&self, group: GroupId, user: UserId) -> Result<Option<GroupRole>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT role FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group.to_string(), user],
            |row| enum_column(row, 0),
        )
        .optional()
        .map_err(|e| map_err("read membership", e))
    }

    fn members(&self, group: GroupId) -> Result<Vec<GroupMember>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT u.id, u.username, u.user_code, m.role, m.joined_at
                 FROM group_members m JOIN users u ON u.id = m.user_id
                 WHERE m.group_id = ?1
                 ORDER BY m.joined_at, m.rowid",
            )
            .map_err(|e| map_err("prepare members", e))?;
        let rows = stmt
            .query_map(params![group.to_string()], |row| {
                Ok(GroupMember {
                    user: AuthUser {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        user_code: row.get(2)?,
                    },
                    role: enum_column(row, 3)?,
                    joined_at: ts_column(row, 4)?,
                })
            })
            .map_err(|e| map_err("query members", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| map_err("decode member", e))
    }

    fn add_member(&self, group: GroupId, user: UserId, role: GroupRole) -> Result<bool> {
        let conn = self.conn.lock();
        let added = conn
            .execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![group.to_string(), user, role.as_str(), ts(Utc::now())],
            )
            .map_err(|e| map_err("insert group member", e))?;
        Ok(added > 0)
    }

    fn remove_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn
            .execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group.to_string(), user],
            )
            .map_err(|e| map_err("delete group member", e))?;
        Ok(removed > 0)
    }

    fn set_role(&self, group: GroupId, user: UserId, role: GroupRole) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE group_members SET role = ?3 WHERE group_id = ?1 AND user_id = ?2",
                params![group.to_string(), user, role.as_str()],
            )
            .map_err(|e| map_err("update member role", e))?;
        if changed == 0 {
            return Err(HikeBotError::not_found(format!("member {user}")));
        }
        Ok(())
    }

    fn delete_group(&self, group: GroupId) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM chat_groups WHERE id = ?1",
            params![group.to_string()],
        )
        .map_err(|e| map_err("delete group", e))?;
        Ok(())
    }

    fn insert_message(&self, message: NewMessage) -> Result<GroupMessage> {
        let conn = self.conn.lock();
        if Self::load_group(&conn, message.group_id)?.is_none() {
            return Err(HikeBotError::not_found(format!("group {}", message.group_id)));
        }
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO group_messages (group_id, user_id, sender, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.group_id.to_string(),
                message.user_id,
                message.sender,
                message.role.as_str(),
                message.content,
                ts(created_at)
            ],
        )
        .map_err(|e| map_err("insert message", e))?;

        Ok(GroupMessage {
            id: conn.last_insert_rowid(),
            group_id: message.group_id,
            user_id: message.user_id,
            sender: message.sender,
            role: message.role,
            content: message.content,
            created_at,
        })
    }

    fn recent_messages(&self, group: GroupId, limit: usize) -> Result<Vec<GroupMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT * FROM (
                    SELECT {MESSAGE_COLUMNS} FROM group_messages
                    WHERE group_id = ?1 ORDER BY id DESC LIMIT ?2
                 ) ORDER BY id ASC"
            ))
            .map_err(|e| map_err("prepare messages", e))?;
        let rows = stmt
            .query_map(params![group.to_string(), limit as i64], message_row)
            .map_err(|e| map_err("query messages", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| map_err("decode message", e))
    }

    fn record_trip(&self, user: UserId, entry: TripHistoryEntry) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO trip_history (user_id, trip_name, trip_date, role, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user,
                entry.trip_name,
                entry.date,
                entry.role,
                entry.status.as_str()
            ],
        )
        .map_err(|e| map_err("insert trip", e))?;
        Ok(())
    }

    fn trips_for(&self, user: UserId) -> Result<Vec<TripHistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT trip_name, trip_date, role, status FROM trip_history
                 WHERE user_id = ?1 ORDER BY id",
            )
            .map_err(|e| map_err("prepare trips", e))?;
        let rows = stmt
            .query_map(params![user], |row| {
                Ok(TripHistoryEntry {
                    trip_name: row.get(0)?,
                    date: row.get(1)?,
                    role: row.get(2)?,
                    status: enum_column(row, 3)?,
                })
            })
            .map_err(|e| map_err("query trips", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| map_err("decode trip", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hikebot_core::{MessageRole, TripStatus};

    fn seed_user(store: &SqliteStore, name: &str, code: &str) -> User {
        store
            .insert_user(NewUser {
                username: name.into(),
                user_code: code.into(),
                password_hash: "hash".into(),
            })
            .unwrap()
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_user(&store, "ana", "ANA1");
        let err = store
            .insert_user(NewUser {
                username: "ana2".into(),
                user_code: "ANA1".into(),
                password_hash: "hash".into(),
            })
            .unwrap_err();
        assert!(matches!(err, HikeBotError::Conflict(_)));
    }

    #[test]
    fn delete_group_cascades() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ana = seed_user(&store, "ana", "ANA1");
        let group = store
            .insert_group(
                NewGroup {
                    name: "Crew".into(),
                    description: Some("weekend".into()),
                    kind: GroupKind::Group,
                    created_by: Some(ana.id),
                },
                &[(ana.id, GroupRole::Admin)],
            )
            .unwrap();
        store
            .insert_message(NewMessage {
                group_id: group.id,
                user_id: Some(ana.id),
                sender: "ana".into(),
                role: MessageRole::User,
                content: "hello".into(),
            })
            .unwrap();

        store.delete_group(group.id).unwrap();
        assert!(store.group(group.id).unwrap().is_none());
        assert!(store.members(group.id).unwrap().is_empty());
        assert!(store.recent_messages(group.id, 10).unwrap().is_empty());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("social.db");
        let ana_id = {
            let store = SqliteStore::open(&path).unwrap();
            let ana = seed_user(&store, "ana", "ANA1");
            store
                .record_trip(
                    ana.id,
                    TripHistoryEntry {
                        trip_name: "Mount Si".into(),
                        date: "2025-06-01".into(),
                        role: "organizer".into(),
                        status: TripStatus::Planned,
                    },
                )
                .unwrap();
            ana.id
        };

        let store = SqliteStore::open(&path).unwrap();
        let ana = store.user_by_username("ana").unwrap().unwrap();
        assert_eq!(ana.id, ana_id);
        let trips = store.trips_for(ana.id).unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].status, TripStatus::Planned);
    }
}
