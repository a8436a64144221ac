//! End-to-end orchestration against recording mock collaborators.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::{room_key, Journal, MockBackend, MockStore};
use roomq_executor::{
    AccessDescriptor, Client, Error, Invocation, OutputOptions, QuerySpec, RaceController,
    SchemaRetryPolicy,
};
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn invocation(query: &str, named: bool, storage: Option<PathBuf>) -> Invocation {
    Invocation {
        locator: room_key(),
        query: QuerySpec::parse(query, named),
        storage,
        blind_peers: Vec::new(),
        output: OutputOptions::default(),
        debug: false,
    }
}

fn client(backend: MockBackend) -> Client<MockBackend> {
    Client::new(backend).with_schema_policy(SchemaRetryPolicy::new(3, Duration::from_millis(5)))
}

fn config_store(journal: &Journal) -> MockStore {
    MockStore::new(journal.clone())
        .named_query("api-config", "settings where app = api")
        .results(vec![Ok(vec![json!({
            "api-key": "k1",
            "database-url": "d1"
        })])])
}

const TEARDOWN: [&str; 3] = ["mirror.close", "discovery.destroy", "store.close"];

fn teardown_events(journal: &Journal) -> Vec<String> {
    journal
        .events()
        .into_iter()
        .filter(|e| TEARDOWN.contains(&e.as_str()))
        .collect()
}

// ============================================================================
// Happy paths
// ============================================================================

#[tokio::test]
async fn test_named_query_with_export() {
    let journal = Journal::default();
    let storage = TempDir::new().unwrap();
    let backend = MockBackend::new(journal.clone(), config_store(&journal));

    let mut inv = invocation(
        "api-config:api-key,database-url",
        true,
        Some(storage.path().to_path_buf()),
    );
    inv.output.export = true;
    let output = client(backend).run(&inv).await.unwrap();

    assert_eq!(
        output,
        "export API_KEY=\"k1\"\nexport DATABASE_URL=\"d1\""
    );
    assert_eq!(teardown_events(&journal), TEARDOWN);
}

#[tokio::test]
async fn test_call_order() {
    let journal = Journal::default();
    let storage = TempDir::new().unwrap();
    let backend = MockBackend::new(journal.clone(), config_store(&journal));
    let topic = AccessDescriptor::decode(&room_key())
        .unwrap()
        .discovery_key()
        .to_hex();

    client(backend)
        .run(&invocation("api-config", true, Some(storage.path().to_path_buf())))
        .await
        .unwrap();

    assert_eq!(
        journal.events(),
        vec![
            "backend.open".to_string(),
            "store.ready".to_string(),
            format!("discovery.join {}", topic),
            "store.list_schemas".to_string(),
            "store.list_named_queries main".to_string(),
            "store.query settings where app = api".to_string(),
            "mirror.close".to_string(),
            "discovery.destroy".to_string(),
            "store.close".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_expression_json_many_results() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone())
        .results(vec![Ok(vec![json!({"a": 1}), json!({"a": 2})])]);
    let backend = MockBackend::new(journal.clone(), store);

    let mut inv = invocation("items", false, None);
    inv.output.json = true;
    let output = client(backend).run(&inv).await.unwrap();
    assert_eq!(output, r#"[{"a":1},{"a":2}]"#);
}

#[tokio::test]
async fn test_blind_peers_reach_backend() {
    let journal = Journal::default();
    let backend = MockBackend::new(journal.clone(), config_store(&journal));
    let client = client(backend);

    let mut inv = invocation("api-config", true, None);
    inv.blind_peers = vec![AccessDescriptor::new([1u8; 32], Vec::new()).encode()];
    assert_eq!(client.run(&inv).await.unwrap(), "k1");
    assert_eq!(client.backend().opened()[0].2, 1);
}

// ============================================================================
// Race controller
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_race_single_emission() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone())
        .named_query("api-config", "settings")
        .results(vec![
            Err("replica behind".to_string()),
            Ok(vec![json!({"api-key": "late"})]),
        ]);
    let backend = MockBackend::new(journal.clone(), store);

    let output = client(backend)
        .run(&invocation("api-config", true, None))
        .await
        .unwrap();

    assert_eq!(output, "late");
    assert_eq!(journal.count("store.query settings"), 2);
    assert_eq!(teardown_events(&journal), TEARDOWN);
}

#[tokio::test(start_paused = true)]
async fn test_race_second_failure_is_terminal() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone());
    let backend = MockBackend::new(journal.clone(), store);

    let err = client(backend)
        .run(&invocation("missing", true, None))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QueryNotFound { ref name } if name == "missing"));
    assert_eq!(journal.count("store.list_named_queries main"), 2);
    assert_eq!(teardown_events(&journal), TEARDOWN);
}

#[tokio::test(start_paused = true)]
async fn test_race_delay_is_configurable() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone())
        .results(vec![Err("lag".to_string()), Ok(vec![json!("v")])]);
    let backend = MockBackend::new(journal.clone(), store);

    let start = tokio::time::Instant::now();
    let output = client(backend)
        .with_race(RaceController::new(Duration::from_secs(1)))
        .run(&invocation("c", false, None))
        .await
        .unwrap();
    assert_eq!(output, "v");
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

// ============================================================================
// Fatal conditions
// ============================================================================

#[tokio::test]
async fn test_decode_error_opens_nothing() {
    let journal = Journal::default();
    let backend = MockBackend::new(journal.clone(), MockStore::new(journal.clone()));

    let mut inv = invocation("q", true, None);
    inv.locator = "too-short".to_string();
    let err = client(backend).run(&inv).await.unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert!(journal.events().is_empty());
}

#[tokio::test]
async fn test_bad_blind_peer_is_decode_error() {
    let journal = Journal::default();
    let backend = MockBackend::new(journal.clone(), MockStore::new(journal.clone()));

    let mut inv = invocation("q", true, None);
    inv.blind_peers = vec![room_key()];
    let err = client(backend).run(&inv).await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[tokio::test]
async fn test_ready_failure_is_not_retried() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone()).failing_ready();
    let backend = MockBackend::new(journal.clone(), store);

    let err = client(backend)
        .run(&invocation("q", true, None))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Session { .. }));
    assert_eq!(journal.count("store.ready"), 1);
    assert_eq!(journal.count("store.list_schemas"), 0);
    assert_eq!(teardown_events(&journal), TEARDOWN);
}

#[tokio::test]
async fn test_join_failure_is_session_error() {
    let journal = Journal::default();
    let backend =
        MockBackend::new(journal.clone(), MockStore::new(journal.clone())).failing_join();

    let err = client(backend)
        .run(&invocation("q", true, None))
        .await
        .unwrap_err();
    match err {
        Error::Session { operation, .. } => assert_eq!(operation, "join"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_no_schema_is_not_raced() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone()).schemas(vec![Ok(vec![])]);
    let backend = MockBackend::new(journal.clone(), store);

    let err = client(backend)
        .run(&invocation("q", true, None))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoSchema { attempts: 3 }));
    assert_eq!(journal.count("store.list_schemas"), 3);
    assert_eq!(teardown_events(&journal), TEARDOWN);
}

#[tokio::test]
async fn test_interrupt_tears_down_once() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone()).schemas(vec![Ok(vec![])]);
    let backend = MockBackend::new(journal.clone(), store);
    let client =
        Client::new(backend).with_schema_policy(SchemaRetryPolicy::new(3, Duration::from_secs(60)));

    let err = client
        .run_until(&invocation("q", true, None), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Interrupted));
    assert_eq!(teardown_events(&journal), TEARDOWN);
    let (storage, ephemeral, _) = client.backend().opened()[0].clone();
    assert!(ephemeral);
    assert!(!storage.exists());
}

// ============================================================================
// Storage deletion policy
// ============================================================================

#[tokio::test]
async fn test_ephemeral_storage_removed_after_success() {
    let journal = Journal::default();
    let backend = MockBackend::new(journal.clone(), config_store(&journal));
    let client = client(backend);

    client
        .run(&invocation("api-config", true, None))
        .await
        .unwrap();

    let (storage, ephemeral, _) = client.backend().opened()[0].clone();
    assert!(ephemeral);
    assert!(!storage.exists());
}

#[tokio::test]
async fn test_ephemeral_storage_removed_after_error() {
    let journal = Journal::default();
    let store = MockStore::new(journal.clone()).failing_ready();
    let backend = MockBackend::new(journal.clone(), store);
    let client = client(backend);

    client
        .run(&invocation("q", true, None))
        .await
        .unwrap_err();

    let (storage, _, _) = client.backend().opened()[0].clone();
    assert!(!storage.exists());
}

#[tokio::test]
async fn test_user_storage_kept_on_error() {
    let journal = Journal::default();
    let storage = TempDir::new().unwrap();
    let store = MockStore::new(journal.clone()).failing_ready();
    let backend = MockBackend::new(journal.clone(), store);
    let client = client(backend);

    client
        .run(&invocation("q", true, Some(storage.path().to_path_buf())))
        .await
        .unwrap_err();

    let (opened, ephemeral, _) = client.backend().opened()[0].clone();
    assert_eq!(opened, storage.path());
    assert!(!ephemeral);
    assert!(storage.path().join("oplog.jsonl").exists());
}
