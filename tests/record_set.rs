mod support;

use std::sync::Arc;

use serde_json::json;

use jsonapi_store::{
    Document, FetchOptions, Record, RecordSet, Resource, SaveOptions, SetOptions, StoreError,
};
use support::{fixtures, MockTransport};

fn seeded_set(transport: Arc<MockTransport>) -> Arc<RecordSet> {
    let set = RecordSet::with_url("users", "/api/v1/users", transport);
    set.set(fixtures::users(), SetOptions::default());
    set
}

// --- lookup ---

#[test]
fn lookup_by_position_and_unique_id() {
    let set = seeded_set(MockTransport::new());

    assert_eq!(set.len(), 2);
    assert_eq!(set.record_ids(), vec!["1".to_string(), "2".to_string()]);
    assert_eq!(set.get_at(0).unwrap().unique_id(), "1");
    assert!(set.get_at(9).is_none());
    assert_eq!(
        set.get("2").unwrap().get_attribute("firstName"),
        Some(json!("John"))
    );
    assert!(set.get("9").is_none());
}

#[test]
fn meta_and_links_merge_additively() {
    let set = seeded_set(MockTransport::new());
    assert_eq!(set.get_meta("totalPages"), Some(json!(1)));
    assert_eq!(
        set.get_link("self"),
        Some(json!("http://example.com/users?page[number]=1"))
    );

    let update: Document = serde_json::from_value(json!({
        "meta": { "totalPages": 3, "totalRecords": 42 }
    }))
    .unwrap();
    set.set(update, SetOptions::default());

    assert_eq!(set.get_meta("totalPages"), Some(json!(3)));
    assert_eq!(set.get_meta("totalRecords"), Some(json!(42)));
    // Links from the first document survive.
    assert!(set.get_link("first").is_some());
}

// --- reconciliation ---

#[test]
fn reconciliation_adds_merges_and_removes() {
    let set = seeded_set(MockTransport::new());

    set.set_records(
        vec![
            Resource::with_id("users", "3").attribute("firstName", "Jane"),
            Resource::with_id("users", "2").attribute("title", "Master"),
        ],
        SetOptions::default(),
    );

    assert!(set.get("3").is_some());
    assert!(set.get("1").is_none());
    let survivor = set.get("2").unwrap();
    assert_eq!(survivor.get_attribute("title"), Some(json!("Master")));
    // The merge is in place: attributes absent from the payload survive.
    assert_eq!(survivor.get_attribute("firstName"), Some(json!("John")));
}

#[test]
fn reconciliation_preserves_member_identity_across_merges() {
    let set = seeded_set(MockTransport::new());
    let before = set.get("2").unwrap();

    set.set_records(
        vec![Resource::with_id("users", "2").attribute("title", "Master")],
        SetOptions::default(),
    );

    let after = set.get("2").unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn reconciliation_is_idempotent_for_an_unchanged_payload() {
    let set = seeded_set(MockTransport::new());
    let payload = vec![Resource::with_id("users", "2").attribute("title", "Master")];
    let options = SetOptions {
        add: false,
        merge: true,
        remove: false,
    };

    set.set_records(payload.clone(), options);
    let first = set.get("2").unwrap().attributes().snapshot();
    set.set_records(payload, options);
    let second = set.get("2").unwrap().attributes().snapshot();

    assert_eq!(first, second);
    assert_eq!(set.len(), 2);
}

#[test]
fn items_without_ids_are_always_added() {
    let set = seeded_set(MockTransport::new());

    set.set_records(
        vec![
            Resource::new("users").attribute("firstName", "Ann"),
            Resource::new("users").attribute("firstName", "Ann"),
        ],
        SetOptions {
            add: true,
            merge: true,
            remove: false,
        },
    );

    // Identical payloads without ids never match anything, including each
    // other.
    assert_eq!(set.len(), 4);
}

#[test]
fn unsaved_members_are_pruned_by_removal() {
    let set = seeded_set(MockTransport::new());
    set.add_one(Resource::new("users").attribute("firstName", "Draft"))
        .unwrap();
    assert_eq!(set.len(), 3);

    // A local key can never appear in an incoming batch, so the draft goes.
    set.set_records(
        vec![Resource::with_id("users", "1"), Resource::with_id("users", "2")],
        SetOptions::default(),
    );
    assert_eq!(set.record_ids(), vec!["1".to_string(), "2".to_string()]);
}

#[test]
fn reconciliation_switches_disable_each_phase() {
    let set = seeded_set(MockTransport::new());

    set.set_records(
        vec![Resource::with_id("users", "3")],
        SetOptions {
            add: false,
            merge: true,
            remove: false,
        },
    );
    assert!(set.get("3").is_none());

    set.set_records(
        vec![Resource::with_id("users", "1").attribute("firstName", "Other")],
        SetOptions {
            add: true,
            merge: false,
            remove: false,
        },
    );
    assert_eq!(
        set.get("1").unwrap().get_attribute("firstName"),
        Some(json!("Nick"))
    );

    set.set_records(
        vec![Resource::with_id("users", "1")],
        SetOptions {
            add: true,
            merge: true,
            remove: false,
        },
    );
    assert_eq!(set.len(), 2);
}

// --- add / remove ---

#[test]
fn add_records_returns_instances_in_input_order() {
    let transport = MockTransport::new();
    let set = RecordSet::with_url("users", "/api/v1/users", transport);

    let added = set
        .add_records(vec![
            Resource::with_id("users", "a").into(),
            Resource::with_id("users", "b").into(),
        ])
        .unwrap();

    assert_eq!(added.len(), 2);
    assert_eq!(added[0].unique_id(), "a");
    assert_eq!(added[1].unique_id(), "b");
    assert_eq!(set.record_ids(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn add_records_adopts_unowned_instances() {
    let transport = MockTransport::new();
    let set = RecordSet::with_url("users", "/api/v1/users", transport.clone());
    let record = Record::with_resource(
        "users",
        transport.clone(),
        Resource::with_id("users", "7"),
    );
    assert!(record.owner().is_none());

    set.add_records(vec![record.clone().into()]).unwrap();

    assert!(record.owner().is_some());
    assert_eq!(record.url().unwrap(), "/api/v1/users/7");
}

#[test]
fn add_records_rejects_foreign_types() {
    let transport = MockTransport::new();
    let set = RecordSet::with_url("users", "/api/v1/users", transport.clone());
    let intruder = Record::new("businesses", transport.clone());

    let err = set.add_records(vec![intruder.into()]).unwrap_err();

    assert_eq!(
        err,
        StoreError::TypeMismatch {
            expected: "users".to_string(),
            actual: "businesses".to_string(),
        }
    );
    assert_eq!(set.len(), 0);
}

#[test]
fn add_skips_items_already_held() {
    let set = seeded_set(MockTransport::new());

    let added = set
        .add(vec![
            Resource::with_id("users", "2").into(),
            Resource::with_id("users", "3").into(),
        ])
        .unwrap();

    assert_eq!(added.len(), 1);
    assert_eq!(added[0].unique_id(), "3");
    assert_eq!(set.len(), 3);
}

#[test]
fn remove_accepts_instances_and_raw_ids() {
    let set = seeded_set(MockTransport::new());
    let first = set.get("1").unwrap();

    set.remove([first.into()]);
    assert_eq!(set.record_ids(), vec!["2".to_string()]);

    set.remove(["2".into()]);
    assert!(set.is_empty());

    // Unknown ids are silently skipped.
    set.remove(["9".into()]);
    assert!(set.is_empty());
}

// --- fetch ---

#[tokio::test]
async fn fetch_reconciles_against_the_response() {
    let transport = MockTransport::new();
    transport.queue_ok(200, fixtures::users());
    let set = RecordSet::with_url("users", "/api/v1/users", transport.clone());

    let response = set
        .fetch(
            FetchOptions {
                url: None,
                params: vec![("page[number]".to_string(), "1".to_string())],
            },
            SetOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(set.len(), 2);
    assert_eq!(set.get_meta("totalPages"), Some(json!(1)));
    assert!(!set.fetching());

    let calls = transport.calls();
    assert_eq!(calls[0].method, "GET");
    assert_eq!(calls[0].url, "/api/v1/users");
    assert_eq!(
        calls[0].params,
        vec![("page[number]".to_string(), "1".to_string())]
    );
}

#[tokio::test]
async fn fetch_honors_overridden_reconciliation_switches() {
    let transport = MockTransport::new();
    let set = seeded_set(transport.clone());
    let stale: Document = serde_json::from_value(json!({
        "data": [{ "id": "3", "type": "users" }]
    }))
    .unwrap();
    transport.queue_ok(200, stale);

    set.fetch(
        FetchOptions::default(),
        SetOptions {
            add: true,
            merge: true,
            remove: false,
        },
    )
    .await
    .unwrap();

    // Members missing from the response survive when removal is disabled.
    assert_eq!(
        set.record_ids(),
        vec!["1".to_string(), "2".to_string(), "3".to_string()]
    );
}

#[tokio::test]
async fn fetch_failure_leaves_members_untouched() {
    let transport = MockTransport::new();
    let set = seeded_set(transport.clone());
    transport.queue_err(503, "unavailable");

    let err = set
        .fetch(FetchOptions::default(), SetOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(set.len(), 2);
    assert!(!set.fetching());
}

// --- create ---

#[tokio::test]
async fn create_refuses_duplicate_ids() {
    let transport = MockTransport::new();
    let set = seeded_set(transport.clone());

    let outcome = set
        .create(Resource::with_id("users", "1"), SaveOptions::default())
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert_eq!(set.len(), 2);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn optimistic_create_attaches_before_the_request() {
    let transport = MockTransport::new();
    transport.queue_ok(
        201,
        Document::from_resource(Resource::with_id("users", "3").attribute("firstName", "Jane")),
    );
    let set = seeded_set(transport.clone());

    let probed = Arc::clone(&set);
    transport.set_probe(move |call| {
        assert_eq!(call.method, "POST");
        assert_eq!(call.url, "/api/v1/users");
        // The transient record is already a member while the POST is in
        // flight.
        assert_eq!(probed.len(), 3);
        assert!(!probed.saving());
    });

    let record = set
        .create(
            Resource::new("users").attribute("firstName", "Jane"),
            SaveOptions { wait: false },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.unique_id(), "3");
    assert_eq!(set.len(), 3);
    assert!(set.get("3").is_some());
    assert!(!set.saving());
}

#[tokio::test]
async fn failed_optimistic_create_rolls_the_member_back_out() {
    let transport = MockTransport::new();
    transport.queue_err(422, "invalid");
    let set = seeded_set(transport.clone());

    let err = set
        .create(
            Resource::new("users").attribute("firstName", "Jane"),
            SaveOptions { wait: false },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert_eq!(set.len(), 2);
    assert!(!set.saving());
}

#[tokio::test]
async fn deferred_create_attaches_only_after_the_response() {
    let transport = MockTransport::new();
    transport.queue_ok(
        201,
        Document::from_resource(Resource::with_id("users", "3").attribute("firstName", "Jane")),
    );
    let set = seeded_set(transport.clone());

    let probed = Arc::clone(&set);
    transport.set_probe(move |_call| {
        assert_eq!(probed.len(), 2);
        assert!(probed.saving());
    });

    let record = set
        .create(
            Resource::new("users").attribute("firstName", "Jane"),
            SaveOptions { wait: true },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(set.len(), 3);
    assert_eq!(record.unique_id(), "3");
    assert!(!set.saving());
}

#[tokio::test]
async fn failed_deferred_create_attaches_nothing() {
    let transport = MockTransport::new();
    transport.queue_err(500, "boom");
    let set = seeded_set(transport.clone());

    let err = set
        .create(
            Resource::new("users").attribute("firstName", "Jane"),
            SaveOptions { wait: true },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(set.len(), 2);
    assert!(!set.saving());
}

// --- included ---

#[test]
fn included_resources_route_through_the_hook() {
    let transport = MockTransport::new();
    let users = RecordSet::with_url("users", "/api/v1/users", transport.clone());
    let businesses = RecordSet::with_url("businesses", "/api/v1/businesses", transport);

    let sink = Arc::clone(&businesses);
    users.on_included(move |included| {
        let forwarded: Vec<_> = included.iter().cloned().map(Into::into).collect();
        sink.add(forwarded).unwrap();
    });

    users.set(fixtures::users_with_included(), SetOptions::default());

    assert_eq!(users.len(), 1);
    assert_eq!(businesses.len(), 2);
    assert_eq!(
        businesses.get("1").unwrap().get_attribute("name"),
        Some(json!("Acme Inc"))
    );
}
