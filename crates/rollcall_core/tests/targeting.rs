use rollcall_core::{
    DeliveryOutcome, DispatchError, Dispatcher, GroupService, ManualClock, Notice, RecipientId,
    RecipientResolver, RecipientService, ResolveError, RollCallConfig, RollCallError,
    RollCallService, SingleTargetPolicy, SqliteRollCallStore, Targeting,
};
use std::sync::Arc;
use tempfile::TempDir;

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

fn open_store() -> (TempDir, Arc<SqliteRollCallStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteRollCallStore::open(dir.path().join("rollcall.db")).unwrap());
    (dir, store)
}

fn service(store: &Arc<SqliteRollCallStore>) -> RollCallService<SqliteRollCallStore> {
    RollCallService::new(store.clone(), Arc::new(NoEndpointDispatcher))
        .with_clock(Arc::new(ManualClock::new(1_000)))
}

fn register(store: &Arc<SqliteRollCallStore>, ids: &[&str]) {
    let recipients = RecipientService::new(store.clone());
    for id in ids {
        recipients.register_recipient(id, "").unwrap();
    }
}

fn target_ids(service: &RollCallService<SqliteRollCallStore>, targeting: Targeting) -> Vec<String> {
    let started = service.start_session("supervisor-1", targeting, 60).unwrap();
    service
        .live_view(started.session_id)
        .unwrap()
        .entries
        .into_iter()
        .map(|entry| entry.recipient_id.to_string())
        .collect()
}

#[test]
fn all_targets_the_roster_at_creation_time() {
    let (_dir, store) = open_store();
    register(&store, &["s1", "s2"]);
    let service = service(&store);

    let started = service
        .start_session("supervisor-1", Targeting::All, 60)
        .unwrap();
    assert_eq!(started.target_count, 2);

    register(&store, &["s3"]);
    let view = service.live_view(started.session_id).unwrap();
    let ids: Vec<String> = view
        .entries
        .iter()
        .map(|entry| entry.recipient_id.to_string())
        .collect();
    assert_eq!(ids, vec!["s1", "s2"]);

    assert!(matches!(
        service.check_in(started.session_id, "s3"),
        Err(RollCallError::NotFound(_))
    ));
    assert_eq!(target_ids(&service, Targeting::All), vec!["s1", "s2", "s3"]);
}

#[test]
fn group_members_are_deduplicated() {
    let (_dir, store) = open_store();
    let groups = GroupService::new(store.clone());
    groups
        .create_group("class-a", ["s2", "s1", "s2", " s1 "])
        .unwrap();

    let service = service(&store);
    assert_eq!(
        target_ids(&service, Targeting::Group("class-a".to_string())),
        vec!["s1", "s2"]
    );
}

#[test]
fn group_name_is_trimmed_before_lookup() {
    let (_dir, store) = open_store();
    GroupService::new(store.clone())
        .create_group(" class-a ", ["s1", "s2"])
        .unwrap();
    let service = service(&store);

    let started = service
        .start_session("supervisor-1", Targeting::Group(" class-a ".to_string()), 60)
        .unwrap();
    assert_eq!(started.target_count, 2);
    let view = service.live_view(started.session_id).unwrap();
    assert_eq!(view.session.targeting, Targeting::Group("class-a".to_string()));
}

#[test]
fn blank_group_name_is_invalid_argument() {
    let (_dir, store) = open_store();
    GroupService::new(store.clone())
        .create_group("class-a", ["s1"])
        .unwrap();
    let service = service(&store);

    let err = service
        .start_session("supervisor-1", Targeting::Group("   ".to_string()), 60)
        .unwrap_err();
    assert!(matches!(err, RollCallError::InvalidArgument(_)), "{err}");
    assert!(service.list_for_initiator("supervisor-1").unwrap().is_empty());
}

#[test]
fn group_members_need_not_be_registered() {
    let (_dir, store) = open_store();
    GroupService::new(store.clone())
        .create_group("visitors", ["guest-1"])
        .unwrap();

    let service = service(&store);
    assert_eq!(
        target_ids(&service, Targeting::Group("visitors".to_string())),
        vec!["guest-1"]
    );
}

#[test]
fn group_edits_do_not_change_existing_sessions() {
    let (_dir, store) = open_store();
    let groups = GroupService::new(store.clone());
    let group = groups.create_group("class-a", ["s1", "s2"]).unwrap();
    let service = service(&store);

    let before = service
        .start_session("supervisor-1", Targeting::Group("class-a".to_string()), 60)
        .unwrap();

    groups.update_group(group.id, "class-a", ["s3"]).unwrap();
    let view = service.live_view(before.session_id).unwrap();
    assert_eq!(view.entries.len(), 2);
    assert_eq!(view.session.targeting, Targeting::Group("class-a".to_string()));

    groups.delete_group(group.id).unwrap();
    let view = service.live_view(before.session_id).unwrap();
    assert_eq!(view.counts.total(), 2);
    service.check_in(before.session_id, "s2").unwrap();
}

#[test]
fn single_accepts_unregistered_ids_by_default() {
    let (_dir, store) = open_store();
    let service = service(&store);

    assert_eq!(
        target_ids(&service, Targeting::Single(RecipientId::parse("20230001").unwrap())),
        vec!["20230001"]
    );
}

#[test]
fn single_can_require_a_registered_recipient() {
    let (_dir, store) = open_store();
    register(&store, &["known"]);
    let strict = service(&store).with_config(RollCallConfig {
        require_known_single_target: true,
        ..RollCallConfig::default()
    })
    .unwrap();

    let err = strict
        .start_session(
            "supervisor-1",
            Targeting::Single(RecipientId::parse("stranger").unwrap()),
            60,
        )
        .unwrap_err();
    assert!(matches!(err, RollCallError::NotFound(_)));

    let started = strict
        .start_session(
            "supervisor-1",
            Targeting::Single(RecipientId::parse("known").unwrap()),
            60,
        )
        .unwrap();
    assert_eq!(started.target_count, 1);
}

#[test]
fn resolver_reports_each_failure_kind() {
    let (_dir, store) = open_store();
    GroupService::new(store.clone())
        .create_group("empty", Vec::<&str>::new())
        .unwrap();
    let resolver = RecipientResolver::new(store.as_ref());

    assert!(matches!(
        resolver.resolve(&Targeting::All),
        Err(ResolveError::EmptyPopulation)
    ));
    assert!(matches!(
        resolver.resolve(&Targeting::Group("empty".to_string())),
        Err(ResolveError::EmptyGroup(_))
    ));
    assert!(matches!(
        resolver.resolve(&Targeting::Group("nope".to_string())),
        Err(ResolveError::GroupNotFound(_))
    ));

    let strict = RecipientResolver::new(store.as_ref())
        .with_single_policy(SingleTargetPolicy::RequireKnown);
    assert!(matches!(
        strict.resolve(&Targeting::Single(RecipientId::parse("x1").unwrap())),
        Err(ResolveError::UnknownRecipient(_))
    ));
}
