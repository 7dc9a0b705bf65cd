use rollcall_core::{
    DeliveryOutcome, DispatchError, Dispatcher, GroupService, ManualClock, Notice, RecipientId,
    RecipientService, RecipientStatus, RollCallError, RollCallService, SessionId,
    SqliteRollCallStore, Targeting,
};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const T0: i64 = 1_700_000_000_000;

struct NoEndpointDispatcher;

impl Dispatcher for NoEndpointDispatcher {
    fn send(
        &self,
        _recipient_id: &RecipientId,
        _notice: &Notice,
    ) -> Result<DeliveryOutcome, DispatchError> {
        Ok(DeliveryOutcome::NoEndpoint)
    }
}

struct Fixture {
    _dir: TempDir,
    store: Arc<SqliteRollCallStore>,
    clock: Arc<ManualClock>,
    service: Arc<RollCallService<SqliteRollCallStore>>,
}

fn fixture(roster: &[&str]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteRollCallStore::open(dir.path().join("rollcall.db")).unwrap());
    let recipients = RecipientService::new(store.clone());
    for id in roster {
        recipients.register_recipient(id, "").unwrap();
    }
    let clock = Arc::new(ManualClock::new(T0));
    let service = RollCallService::new(store.clone(), Arc::new(NoEndpointDispatcher))
        .with_clock(clock.clone());
    Fixture {
        _dir: dir,
        store,
        clock,
        service: Arc::new(service),
    }
}

fn start_all(fx: &Fixture, window_seconds: u32) -> SessionId {
    fx.service
        .start_session("supervisor-1", Targeting::All, window_seconds)
        .unwrap()
        .session_id
}

fn count_rows(fx: &Fixture, table: &str, session_id: SessionId) -> i64 {
    let conn = fx.store.database().connect().unwrap();
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE session_id = ?1;"),
        [session_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

fn rid(value: &str) -> RecipientId {
    RecipientId::parse(value).unwrap()
}

#[test]
fn repeated_check_ins_store_one_row() {
    let fx = fixture(&["20230001", "20230002"]);
    let session_id = start_all(&fx, 60);

    let first = fx.service.check_in(session_id, "20230001").unwrap();
    assert!(!first.already_checked);
    for _ in 0..4 {
        fx.clock.advance_secs(1);
        let again = fx.service.check_in(session_id, "20230001").unwrap();
        assert!(again.already_checked);
    }

    assert_eq!(count_rows(&fx, "check_ins", session_id), 1);
    let view = fx.service.live_view(session_id).unwrap();
    assert_eq!(view.counts.checked_in, 1);
    assert_eq!(
        view.status_of(&rid("20230001")),
        Some(&RecipientStatus::CheckedIn { responded_at: T0 })
    );
}

#[test]
fn group_session_with_two_check_ins_and_one_absence() {
    let fx = fixture(&[]);
    GroupService::new(fx.store.clone())
        .create_group("class-a", ["20230001", "20230002", "20230003"])
        .unwrap();
    let started = fx
        .service
        .start_session("supervisor-1", Targeting::Group("class-a".to_string()), 300)
        .unwrap();
    assert_eq!(started.target_count, 3);
    let session_id = started.session_id;

    fx.service.check_in(session_id, "20230001").unwrap();
    fx.service.check_in(session_id, "20230002").unwrap();
    fx.service
        .declare_absence(session_id, "20230003", "sick", None)
        .unwrap();

    let view = fx.service.live_view(session_id).unwrap();
    assert!(view.is_active);
    assert_eq!(view.counts.checked_in, 2);
    assert_eq!(view.counts.absent, 1);
    assert_eq!(view.counts.unresponsive, 0);
    assert_eq!(
        view.status_of(&rid("20230003")),
        Some(&RecipientStatus::Absent {
            reason: "sick".to_string(),
            location: None,
        })
    );
}

#[test]
fn mixed_responses_partition_the_roster() {
    let fx = fixture(&["s1", "s2", "s3"]);
    let session_id = start_all(&fx, 300);

    fx.service.check_in(session_id, "s1").unwrap();
    fx.service
        .declare_absence(session_id, "s2", "sick", Some("home"))
        .unwrap();

    let view = fx.service.live_view(session_id).unwrap();
    assert!(view.is_active);
    assert_eq!(view.counts.checked_in, 1);
    assert_eq!(view.counts.absent, 1);
    assert_eq!(view.counts.unresponsive, 1);
    assert_eq!(
        view.status_of(&rid("s2")),
        Some(&RecipientStatus::Absent {
            reason: "sick".to_string(),
            location: Some("home".to_string()),
        })
    );
    assert_eq!(
        view.status_of(&rid("s3")),
        Some(&RecipientStatus::Unresponsive)
    );
}

#[test]
fn concurrent_check_ins_for_same_pair_store_one_row() {
    let fx = fixture(&["20230001"]);
    let session_id = start_all(&fx, 60);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = Arc::clone(&fx.service);
            thread::spawn(move || service.check_in(session_id, "20230001"))
        })
        .collect();
    let acks: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    assert_eq!(acks.iter().filter(|ack| !ack.already_checked).count(), 1);
    assert_eq!(count_rows(&fx, "check_ins", session_id), 1);
    assert_eq!(fx.service.live_view(session_id).unwrap().counts.checked_in, 1);
}

#[test]
fn concurrent_check_ins_for_different_recipients_all_land() {
    let ids: Vec<String> = (0..8).map(|index| format!("2023{index:04}")).collect();
    let roster: Vec<&str> = ids.iter().map(String::as_str).collect();
    let fx = fixture(&roster);
    let session_id = start_all(&fx, 60);

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let service = Arc::clone(&fx.service);
            thread::spawn(move || service.check_in(session_id, &id))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let view = fx.service.live_view(session_id).unwrap();
    assert_eq!(view.counts.checked_in, ids.len());
    assert_eq!(view.counts.unresponsive, 0);
}

#[test]
fn check_in_wins_over_absence_in_either_order() {
    let fx = fixture(&["a1", "a2"]);
    let session_id = start_all(&fx, 60);

    fx.service
        .declare_absence(session_id, "a1", "late bus", None)
        .unwrap();
    fx.service.check_in(session_id, "a1").unwrap();

    fx.service.check_in(session_id, "a2").unwrap();
    fx.service
        .declare_absence(session_id, "a2", "sick", None)
        .unwrap();

    let view = fx.service.live_view(session_id).unwrap();
    assert_eq!(view.counts.checked_in, 2);
    assert_eq!(view.counts.absent, 0);
    assert_eq!(count_rows(&fx, "absence_declarations", session_id), 2);
}

#[test]
fn later_absence_replaces_earlier_one() {
    let fx = fixture(&["a1"]);
    let session_id = start_all(&fx, 60);

    fx.service
        .declare_absence(session_id, "a1", "sick", Some("home"))
        .unwrap();
    fx.clock.advance_secs(5);
    fx.service
        .declare_absence(session_id, "a1", "doctor", None)
        .unwrap();

    assert_eq!(count_rows(&fx, "absence_declarations", session_id), 1);
    let view = fx.service.live_view(session_id).unwrap();
    assert_eq!(
        view.status_of(&rid("a1")),
        Some(&RecipientStatus::Absent {
            reason: "doctor".to_string(),
            location: None,
        })
    );
}

#[test]
fn late_responses_are_recorded_after_expiry() {
    let fx = fixture(&["a1", "a2"]);
    let session_id = start_all(&fx, 60);
    fx.clock.advance_secs(120);

    let ack = fx.service.check_in(session_id, "a1").unwrap();
    assert!(!ack.already_checked);
    fx.service
        .declare_absence(session_id, "a2", "sick", None)
        .unwrap();

    let view = fx.service.live_view(session_id).unwrap();
    assert!(!view.is_active);
    assert_eq!(view.counts.checked_in, 1);
    assert_eq!(view.counts.absent, 1);
    assert_eq!(
        view.status_of(&rid("a1")),
        Some(&RecipientStatus::CheckedIn {
            responded_at: T0 + 120_000
        })
    );
}

#[test]
fn responses_from_non_targets_are_rejected() {
    let fx = fixture(&["a1"]);
    let session_id = start_all(&fx, 60);
    RecipientService::new(fx.store.clone())
        .register_recipient("late-joiner", "")
        .unwrap();

    assert!(matches!(
        fx.service.check_in(session_id, "late-joiner"),
        Err(RollCallError::NotFound(_))
    ));
    assert!(matches!(
        fx.service.declare_absence(session_id, "late-joiner", "sick", None),
        Err(RollCallError::NotFound(_))
    ));
    assert_eq!(count_rows(&fx, "check_ins", session_id), 0);
    assert_eq!(fx.service.live_view(session_id).unwrap().entries.len(), 1);
}

#[test]
fn invalid_submissions_are_rejected() {
    let fx = fixture(&["a1"]);
    let session_id = start_all(&fx, 60);

    assert!(matches!(
        fx.service.declare_absence(session_id, "a1", "   ", Some("home")),
        Err(RollCallError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.service.check_in(session_id, ""),
        Err(RollCallError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.service.check_in(session_id, "bad id!"),
        Err(RollCallError::InvalidArgument(_))
    ));
    assert_eq!(count_rows(&fx, "absence_declarations", session_id), 0);
}

#[test]
fn manual_end_does_not_block_responses() {
    let fx = fixture(&["a1"]);
    let session_id = start_all(&fx, 600);
    fx.service.end_session(session_id, "supervisor-1").unwrap();

    fx.service.check_in(session_id, "a1").unwrap();
    let view = fx.service.live_view(session_id).unwrap();
    assert!(!view.is_active);
    assert_eq!(view.counts.checked_in, 1);
}
