//! E2E Test: PWA Install and Activation
//!
//! Tests the worker lifecycle against a shared cache store:
//! 1. Install pre-caches the app shell, all or nothing, without touching
//!    caches a running instance still uses
//! 2. Activation prunes partitions from other versions
//! 3. Pruning failures are reported without blocking activation
//! 4. Open pages are claimed once the worker is active

use std::sync::Arc;

use sw_e2e_tests::*;
use sw_runtime::service_worker::{
    prune_except, CacheStore, ClientInfo, EventOutcome, FetchSource, MatchAllOptions,
    MemoryCacheStore, MemoryNetwork, Request, RequestDestination, RequestKey, Response,
    ServiceWorker, ServiceWorkerState, WorkerConfig, WorkerError, WorkerEvent,
};

fn shared_worker(
    config: WorkerConfig,
    store: &Arc<dyn CacheStore>,
    network: &Arc<MemoryNetwork>,
) -> ServiceWorker {
    ServiceWorker::new(config, Arc::clone(store), network.clone()).unwrap()
}

#[tokio::test]
async fn test_install_caches_shell() {
    let network = origin();
    let sw = worker(split_config("v1"), &network);

    let outcome = sw.dispatch(WorkerEvent::Install).await.unwrap();
    assert_eq!(outcome, EventOutcome::Installed(2));
    assert_eq!(sw.state(), ServiceWorkerState::Installed);
    assert!(!sw.lifecycle().is_waiting());

    let shell = sw.store().entry_keys("line-static-v1").await.unwrap();
    assert_eq!(shell.len(), 2);
    assert!(shell.contains(&RequestKey::get(url("/home.html"))));
}

#[tokio::test]
async fn test_install_fails_when_one_shell_entry_fails() {
    let network = origin();
    network.fail(url("/home.html"));
    let sw = worker(split_config("v1"), &network);

    let err = sw.install().await.unwrap_err();
    assert!(matches!(err, WorkerError::InstallFailed { ref url, .. } if url.ends_with("/home.html")));
    assert_eq!(sw.state(), ServiceWorkerState::Redundant);
    assert!(!sw.store().has("line-static-v1").await);
    assert!(sw.store().keys().await.unwrap().is_empty());

    // Nothing to activate
    assert!(sw.activate().await.is_err());
}

#[tokio::test]
async fn test_failed_install_keeps_previous_version() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let network = origin();
    let v1 = shared_worker(split_config("v1"), &store, &network);
    v1.install().await.unwrap();
    v1.activate().await.unwrap();

    network.fail(url("/home.html"));
    let v2 = shared_worker(split_config("v2"), &store, &network);
    assert!(v2.install().await.is_err());

    assert!(v1.is_active());
    assert_eq!(store.keys().await.unwrap(), vec!["line-static-v1"]);
}

#[tokio::test]
async fn test_failed_same_version_reinstall_keeps_live_data() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::with_quota(200));
    let network = origin();
    network.route(api("getUsers"), Response::ok_with(r#"{"users":["ada"]}"#));

    let live = shared_worker(config(), &store, &network);
    live.install().await.unwrap();
    live.activate().await.unwrap();
    live.fetch(&Request::new(api("getUsers"))).await;
    live.wait_until_idle().await;

    // The page grew past the quota; the reinstall cannot fit it
    network.route(url("/home.html"), Response::ok_with("x".repeat(300)));
    let again = shared_worker(config(), &store, &network);
    assert!(matches!(again.install().await, Err(WorkerError::Cache(_))));
    assert!(live.is_active());
    assert!(store.has("service-line-v3").await);

    network.set_online(false);
    let served = live.fetch(&Request::new(api("getUsers"))).await;
    assert_eq!(served.source, FetchSource::Cache);
    assert_eq!(json(&served.response), serde_json::json!({ "users": ["ada"] }));
    let home = live.fetch(&Request::navigate(url("/home.html"))).await;
    assert_eq!(home.response.text(), Some("<h1>home</h1>"));
}

#[tokio::test]
async fn test_prune_keeps_only_expected() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    for name in ["A", "B", "C"] {
        store.open(name).await.unwrap();
    }

    let report = prune_except(&store, &["B".to_string()].into_iter().collect())
        .await
        .unwrap();

    let mut deleted = report.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["A", "C"]);
    assert!(report.failed.is_empty());
    assert_eq!(store.keys().await.unwrap(), vec!["B"]);
}

#[tokio::test]
async fn test_version_rotation_drops_old_partitions() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let network = origin();
    network.route(url("/logo.png"), html("png"));

    let v1 = shared_worker(split_config("v1"), &store, &network);
    v1.install().await.unwrap();
    v1.activate().await.unwrap();
    v1.fetch(&Request::new(url("/logo.png")).with_destination(RequestDestination::Image))
        .await;
    assert!(store.has("line-image-v1").await);

    let v2 = shared_worker(split_config("v2"), &store, &network);
    v2.install().await.unwrap();
    let report = v2.activate().await.unwrap();
    v1.lifecycle().make_redundant().unwrap();

    let mut deleted = report.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["line-image-v1", "line-static-v1"]);
    assert_eq!(store.keys().await.unwrap(), vec!["line-static-v2"]);
    assert_eq!(v1.state(), ServiceWorkerState::Redundant);
}

#[tokio::test]
async fn test_single_layout_rotation() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    store.open("service-line-v2").await.unwrap();
    let network = origin();

    let sw = shared_worker(config(), &store, &network);
    sw.install().await.unwrap();
    let report = sw.activate().await.unwrap();

    assert_eq!(report.deleted, vec!["service-line-v2"]);
    assert_eq!(store.keys().await.unwrap(), vec!["service-line-v3"]);
}

#[tokio::test]
async fn test_prune_failure_does_not_block_activation() {
    let sticky = Arc::new(StickyStore::new(&["line-static-v0"]));
    sticky.open("line-static-v0").await.unwrap();
    sticky.open("line-api-v0").await.unwrap();
    let store: Arc<dyn CacheStore> = sticky;
    let network = origin();

    let sw = shared_worker(split_config("v1"), &store, &network);
    sw.install().await.unwrap();
    let report = sw.activate().await.unwrap();

    assert!(sw.is_active());
    assert_eq!(report.deleted, vec!["line-api-v0"]);
    assert_eq!(report.failed, vec!["line-static-v0"]);
    assert!(store.has("line-static-v0").await);
}

#[tokio::test]
async fn test_activation_claims_open_pages() {
    let network = origin();
    let sw = worker(split_config("v1"), &network);
    sw.clients().add(ClientInfo::window("tab-1", url("/")));
    sw.clients().add(ClientInfo::window("tab-2", url("/members.html")));
    assert!(sw.clients().match_all(&MatchAllOptions::default()).is_empty());

    sw.install().await.unwrap();
    sw.activate().await.unwrap();

    let controlled = sw.clients().match_all(&MatchAllOptions::default());
    assert_eq!(controlled.len(), 2);
    assert!(controlled.iter().all(|c| c.controlled));
}

#[tokio::test]
async fn test_events_out_of_order_are_rejected() {
    let network = origin();
    let sw = worker(split_config("v1"), &network);

    assert!(matches!(
        sw.dispatch(WorkerEvent::Activate).await,
        Err(WorkerError::InvalidStateTransition { .. })
    ));
    sw.dispatch(WorkerEvent::Install).await.unwrap();
    assert!(sw.dispatch(WorkerEvent::Install).await.is_err());
}
