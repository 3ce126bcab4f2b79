use super::*;
use bd_core::{Event, IssueId};

#[test]
fn filter_none_matches_everything() {
    let event = Event::Created {
        issue_id: IssueId::new("aa-1"),
        actor: "tester".to_string(),
    };
    assert!(matches_filter(&event, None));
}

#[test]
fn filter_by_issue_id() {
    let event = Event::Created {
        issue_id: IssueId::new("aa-1"),
        actor: "tester".to_string(),
    };
    assert!(matches_filter(&event, Some("issue:aa-1")));
    assert!(!matches_filter(&event, Some("issue:aa-2")));
}

#[test]
fn filter_by_mutation_type() {
    let event = Event::Exported {
        content_hash: "deadbeef".to_string(),
        issue_count: 3,
    };
    assert!(matches_filter(&event, Some("type:sync:exported")));
    assert!(!matches_filter(&event, Some("type:issue:created")));
}

#[test]
fn filter_unscoped_event_never_matches_issue_filter() {
    let event = Event::Imported {
        created: 1,
        updated: 0,
        skipped: 0,
    };
    assert!(!matches_filter(&event, Some("issue:aa-1")));
}

#[test]
fn filter_unknown_prefix_matches_nothing() {
    let event = Event::Created {
        issue_id: IssueId::new("aa-1"),
        actor: "tester".to_string(),
    };
    assert!(!matches_filter(&event, Some("bogus:aa-1")));
}

#[test]
fn router_builds_without_panicking() {
    let store: Arc<dyn bd_storage::IssueStore> = Arc::new(bd_storage::SqliteStore::open_in_memory().unwrap());
    let dispatcher = Arc::new(Dispatcher::new(
        store,
        EventBus::new(),
        crate::config::Config::default(),
        std::path::PathBuf::from("issues.jsonl"),
        None,
    ));
    let _router = router(dispatcher, EventBus::new(), Some("secret".to_string()));
}
