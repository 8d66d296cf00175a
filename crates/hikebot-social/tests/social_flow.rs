use hikebot_core::{AuthUser, GroupKind, GroupRole, HikeBotError, MessageRole, TripHistoryEntry, TripStatus};
use hikebot_social::{
    FriendRequestOutcome, LeaveOutcome, MemoryStore, SocialService, SocialStore, SqliteStore,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    svc: SocialService,
    _dir: Option<TempDir>,
}

fn memory() -> Fixture {
    Fixture {
        svc: SocialService::new(Arc::new(MemoryStore::new())),
        _dir: None,
    }
}

fn sqlite() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SocialStore> = Arc::new(SqliteStore::open(dir.path().join("hikebot.db")).unwrap());
    Fixture {
        svc: SocialService::new(store),
        _dir: Some(dir),
    }
}

fn both() -> Vec<(&'static str, Fixture)> {
    vec![("memory", memory()), ("sqlite", sqlite())]
}

fn people(svc: &SocialService) -> (AuthUser, AuthUser, AuthUser) {
    (
        svc.signup("ana", "pw-ana", "ANA1").unwrap(),
        svc.signup("ben", "pw-ben", "BEN1").unwrap(),
        svc.signup("cal", "pw-cal", "CAL1").unwrap(),
    )
}

#[test]
fn friend_request_state_machine() {
    for (name, fx) in both() {
        let svc = &fx.svc;
        let (ana, ben, _) = people(svc);

        assert!(matches!(svc.send_friend_request(&ana, "NOPE1"), Err(HikeBotError::NotFound(_))), "{name}");
        assert!(matches!(svc.send_friend_request(&ana, "ANA1"), Err(HikeBotError::Validation(_))), "{name}");

        let (_, first) = svc.send_friend_request(&ana, "BEN1").unwrap();
        let FriendRequestOutcome::Sent(req) = first else {
            panic!("{name}: expected Sent");
        };
        let (_, again) = svc.send_friend_request(&ana, "BEN1").unwrap();
        assert!(matches!(again, FriendRequestOutcome::AlreadyPending(ref r) if r.id == req.id), "{name}");

        let pending = svc.pending_requests(&ben).unwrap();
        assert_eq!(pending.len(), 1, "{name}");
        assert_eq!(pending[0].from_username, "ana");
        assert!(svc.pending_requests(&ana).unwrap().is_empty(), "{name}");

        // Only the addressee can resolve.
        assert!(matches!(svc.accept_request(&ana, req.id), Err(HikeBotError::NotFound(_))), "{name}");

        svc.decline_request(&ben, req.id).unwrap();
        assert!(matches!(svc.accept_request(&ben, req.id), Err(HikeBotError::Conflict(_))), "{name}");

        // Declined requests reopen; the reverse send then accepts it.
        let (_, reopened) = svc.send_friend_request(&ana, "BEN1").unwrap();
        assert!(matches!(reopened, FriendRequestOutcome::Sent(ref r) if r.id == req.id), "{name}");
        let (_, accepted) = svc.send_friend_request(&ben, "ANA1").unwrap();
        assert!(matches!(accepted, FriendRequestOutcome::Accepted(_)), "{name}");

        let ana_friends: Vec<String> = svc.friends(&ana).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(ana_friends, vec!["ben"], "{name}");
        assert_eq!(svc.friends(&ben).unwrap()[0].username, "ana", "{name}");
        assert!(matches!(svc.send_friend_request(&ana, "BEN1"), Err(HikeBotError::Conflict(_))), "{name}");

        svc.remove_friend(&ben, ana.id).unwrap();
        assert!(svc.friends(&ana).unwrap().is_empty(), "{name}");
        assert!(matches!(svc.remove_friend(&ben, ana.id), Err(HikeBotError::NotFound(_))), "{name}");

        // After unfriending, a fresh request can be sent.
        let (_, fresh) = svc.send_friend_request(&ben, "ANA1").unwrap();
        assert!(matches!(fresh, FriendRequestOutcome::Sent(_)), "{name}");
    }
}

#[test]
fn direct_chat_requires_friendship_and_is_reused() {
    for (name, fx) in both() {
        let svc = &fx.svc;
        let (ana, ben, _) = people(svc);

        assert!(matches!(svc.open_direct_chat(&ana, ana.id), Err(HikeBotError::Validation(_))), "{name}");
        assert!(matches!(svc.open_direct_chat(&ana, ben.id), Err(HikeBotError::Forbidden(_))), "{name}");

        let (_, outcome) = svc.send_friend_request(&ana, "BEN1").unwrap();
        let FriendRequestOutcome::Sent(req) = outcome else {
            panic!("{name}: expected Sent");
        };
        svc.accept_request(&ben, req.id).unwrap();

        let first = svc.open_direct_chat(&ana, ben.id).unwrap();
        assert!(first.created, "{name}");
        assert_eq!(first.group.kind, GroupKind::Direct);
        let second = svc.open_direct_chat(&ben, ana.id).unwrap();
        assert!(!second.created, "{name}");
        assert_eq!(first.group.id, second.group.id, "{name}");

        let members = svc.members(&ana, first.group.id).unwrap();
        assert!(members.iter().all(|m| m.role == GroupRole::Admin), "{name}");

        assert!(matches!(svc.invite(&ana, first.group.id, "CAL1"), Err(HikeBotError::Validation(_))), "{name}");
        assert!(matches!(svc.kick(&ana, first.group.id, ben.id), Err(HikeBotError::Validation(_))), "{name}");
    }
}

#[test]
fn group_lifecycle() {
    for (name, fx) in both() {
        let svc = &fx.svc;
        let (ana, ben, cal) = people(svc);

        assert!(matches!(svc.create_group(&ana, "   ", None, &[]), Err(HikeBotError::Validation(_))), "{name}");
        assert!(matches!(
            svc.create_group(&ana, &"n".repeat(101), None, &[]),
            Err(HikeBotError::Validation(_))
        ), "{name}");

        let created = svc
            .create_group(
                &ana,
                "  Weekend Crew ",
                Some("  "),
                &["BEN1".into(), "BEN1".into(), "ANA1".into(), "GHOST1".into()],
            )
            .unwrap();
        let gid = created.group.id;
        assert_eq!(created.group.name, "Weekend Crew", "{name}");
        assert_eq!(created.group.description, None, "{name}");
        assert_eq!(created.unresolved_codes, vec!["GHOST1"], "{name}");

        let roles: Vec<(String, GroupRole)> = svc
            .members(&ben, gid)
            .unwrap()
            .into_iter()
            .map(|m| (m.user.username, m.role))
            .collect();
        assert_eq!(
            roles,
            vec![("ana".to_string(), GroupRole::Admin), ("ben".to_string(), GroupRole::Member)],
            "{name}"
        );

        assert!(matches!(svc.members(&cal, gid), Err(HikeBotError::Forbidden(_))), "{name}");
        assert!(matches!(svc.post_message(&cal, gid, "hi"), Err(HikeBotError::Forbidden(_))), "{name}");

        let invited = svc.invite(&ben, gid, "CAL1").unwrap();
        assert!(invited.added, "{name}");
        assert!(!svc.invite(&ben, gid, "CAL1").unwrap().added, "{name}");
        assert!(matches!(svc.invite(&ben, gid, "NOPE1"), Err(HikeBotError::NotFound(_))), "{name}");

        assert!(matches!(svc.kick(&ben, gid, cal.id), Err(HikeBotError::Forbidden(_))), "{name}");
        assert!(matches!(svc.kick(&ana, gid, ana.id), Err(HikeBotError::Validation(_))), "{name}");
        svc.kick(&ana, gid, cal.id).unwrap();
        assert!(matches!(svc.kick(&ana, gid, cal.id), Err(HikeBotError::NotFound(_))), "{name}");

        assert!(svc.join(&cal, gid).unwrap(), "{name}");
        assert!(!svc.join(&cal, gid).unwrap(), "{name}");

        assert_eq!(
            svc.leave(&ana, gid).unwrap(),
            LeaveOutcome::Left { promoted: Some(ben.id) },
            "{name}"
        );
        assert_eq!(svc.groups_for(&ana).unwrap().len(), 0, "{name}");
        assert_eq!(svc.leave(&ben, gid).unwrap(), LeaveOutcome::Left { promoted: Some(cal.id) }, "{name}");
        assert_eq!(svc.leave(&cal, gid).unwrap(), LeaveOutcome::GroupDeleted, "{name}");
        assert!(matches!(svc.join(&ana, gid), Err(HikeBotError::NotFound(_))), "{name}");
    }
}

#[test]
fn groups_are_listed_newest_first() {
    for (name, fx) in both() {
        let svc = &fx.svc;
        let (ana, _, _) = people(svc);
        let first = svc.create_group(&ana, "First", None, &[]).unwrap().group.id;
        let second = svc.create_group(&ana, "Second", None, &[]).unwrap().group.id;

        let ids: Vec<_> = svc.groups_for(&ana).unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![second, first], "{name}");
    }
}

#[test]
fn messages_and_assistant_posts() {
    for (name, fx) in both() {
        let svc = &fx.svc;
        let (ana, ben, _) = people(svc);
        let gid = svc.create_group(&ana, "Crew", None, &["BEN1".into()]).unwrap().group.id;

        svc.post_message(&ana, gid, "Mount Si on Saturday?").unwrap();
        svc.post_message(&ben, gid, "let's go, 7am").unwrap();
        let bot = svc.post_assistant_message(gid, "HikeBot", "Plan locked").unwrap();
        assert_eq!(bot.role, MessageRole::Assistant, "{name}");
        assert_eq!(bot.user_id, None, "{name}");

        let contents: Vec<String> = svc.messages(&ben, gid).unwrap().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["Mount Si on Saturday?", "let's go, 7am", "Plan locked"], "{name}");

        for i in 0..105 {
            svc.post_message(&ana, gid, &format!("msg {i}")).unwrap();
        }
        let history = svc.messages(&ana, gid).unwrap();
        assert_eq!(history.len(), 100, "{name}");
        assert_eq!(history.last().unwrap().content, "msg 104", "{name}");
        assert!(history.windows(2).all(|w| w[0].id < w[1].id), "{name}");

        assert!(matches!(
            svc.post_assistant_message(uuid::Uuid::new_v4(), "HikeBot", "x"),
            Err(HikeBotError::NotFound(_))
        ), "{name}");
    }
}

#[test]
fn trip_history_round_trip() {
    for (name, fx) in both() {
        let svc = &fx.svc;
        let (ana, _, _) = people(svc);
        svc.record_trip(
            ana.id,
            TripHistoryEntry {
                trip_name: "Rattlesnake Ledge".into(),
                date: "2025-06-14".into(),
                role: "organizer".into(),
                status: TripStatus::Planned,
            },
        )
        .unwrap();

        let trips = svc.trip_history("ana").unwrap();
        assert_eq!(trips.len(), 1, "{name}");
        assert_eq!(trips[0].trip_name, "Rattlesnake Ledge");
        assert!(svc.trip_history("ben").unwrap().is_empty(), "{name}");
    }
}

#[test]
fn racing_leave_never_surfaces_storage_conflicts() {
    for (name, fx) in both() {
        let svc = &fx.svc;
        let (ana, ben, _) = people(svc);

        for round in 0..25 {
            let gid = svc
                .create_group(&ana, &format!("Race {round}"), None, &[])
                .unwrap()
                .group
                .id;

            let (left, joined, posted) = std::thread::scope(|s| {
                let left = s.spawn(|| svc.leave(&ana, gid));
                let joined = s.spawn(|| svc.join(&ben, gid));
                let posted = s.spawn(|| svc.post_message(&ana, gid, "anyone?"));
                (
                    left.join().unwrap(),
                    joined.join().unwrap(),
                    posted.join().unwrap(),
                )
            });

            assert!(left.is_ok(), "{name} round {round}: {left:?}");
            assert!(
                matches!(joined, Ok(_) | Err(HikeBotError::NotFound(_))),
                "{name} round {round}: {joined:?}"
            );
            assert!(
                matches!(
                    posted,
                    Ok(_) | Err(HikeBotError::NotFound(_)) | Err(HikeBotError::Forbidden(_))
                ),
                "{name} round {round}: {posted:?}"
            );
        }
    }
}
