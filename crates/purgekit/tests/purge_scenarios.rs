use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use purgekit_engine::backend::{
    CdnCacheAdapter, EdgeCacheAdapter, ObjectCacheAdapter, PlatformOptimizationAdapter,
};
use purgekit_engine::cdn::CdnCredentials;
use purgekit_engine::init_test_tracing;
use purgekit_engine::store::{KeyValueStore, MemoryStore};
use purgekit_engine::test_utils::{FailingStore, RecordingTransport, StaticAdapter, test_credentials};
use purgekit_engine::{
    AdapterRegistry, BackendKind, BackendState, BoxError, CacheControl, Dispatch, EdgeCacheMode,
    ExecutionMode, FailureKind, MemoryResultStore, PurgeConfig, ResultStore, Selection,
    TriggerSource,
};

fn cdn_pair(
    credentials: CdnCredentials,
    transport: Arc<RecordingTransport>,
    platform_enabled: bool,
) -> (Arc<CdnCacheAdapter>, Arc<PlatformOptimizationAdapter>) {
    let cdn = Arc::new(CdnCacheAdapter::new(credentials, transport));
    let platform = Arc::new(PlatformOptimizationAdapter::new(cdn.clone(), platform_enabled));
    (cdn, platform)
}

#[tokio::test]
async fn mixed_four_backend_purge() {
    init_test_tracing!();
    let dir = tempfile::tempdir().unwrap();

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = hook_calls.clone();
    let edge = Arc::new(EdgeCacheAdapter::new(EdgeCacheMode::Off, dir.path().join("none")));
    let object = Arc::new(ObjectCacheAdapter::new(
        Arc::new(FailingStore::refused()) as Arc<dyn KeyValueStore>
    ));
    let transport = Arc::new(RecordingTransport::rejecting("invalid zone"));
    let (cdn, platform) = cdn_pair(test_credentials(), transport.clone(), true);

    let mut registry = AdapterRegistry::new();
    registry.register_edge(edge);
    registry.register(object).register(cdn).register(platform);

    let results = Arc::new(MemoryResultStore::new());
    let control = CacheControl::new(registry, results.clone());
    assert!(control.register_edge_hook(Arc::new(move || -> Result<(), BoxError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })));

    let report = control.purge_all(TriggerSource::Manual).await.unwrap();

    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.outcomes.len(), 4);
    assert!(report.overall_success);
    assert_eq!(report.succeeded_kinds(), vec![BackendKind::EdgeCache]);

    let object = report.outcome(BackendKind::ObjectCache).unwrap();
    assert_eq!(object.failure, Some(FailureKind::NotConnected));
    assert!(object.message.contains("Connection refused"));

    let cdn = report.outcome(BackendKind::CdnCache).unwrap();
    assert_eq!(cdn.failure, Some(FailureKind::Logical));
    assert!(cdn.message.contains("invalid zone"));

    let platform = report.outcome(BackendKind::CdnPlatformOptimization).unwrap();
    assert_eq!(platform.failure, Some(FailureKind::Logical));
    assert!(platform.message.contains("invalid zone"));

    let lines: Vec<&str> = report.summary_message.lines().collect();
    assert_eq!(lines[0], "Successfully purged: Edge cache");
    assert!(lines[1].starts_with("✓ Edge cache:"));
    assert!(lines[2].starts_with("✗ Object cache:"));
    assert!(lines[3].starts_with("✗ CDN cache:"));
    assert!(lines[4].starts_with("✗ CDN platform optimization:"));

    // Platform delegates to the CDN, so the API saw two requests
    assert_eq!(transport.calls(), 2);
    assert_eq!(results.load().await.unwrap(), Some(report));
}

#[tokio::test]
async fn cdn_without_credentials_makes_no_http_call() {
    let transport = Arc::new(RecordingTransport::succeeding());
    let (cdn, platform) = cdn_pair(CdnCredentials::default(), transport.clone(), true);
    let registry = AdapterRegistry::new().with(cdn).with(platform);
    let control = CacheControl::new(registry, Arc::new(MemoryResultStore::new()));

    let statuses = control.get_all_status().await;
    assert_eq!(statuses[&BackendKind::CdnCache].state, BackendState::NotConfigured);
    assert_eq!(
        statuses[&BackendKind::CdnPlatformOptimization].state,
        BackendState::NotConfigured
    );

    let report = control
        .purge(&Selection::one(BackendKind::CdnCache), TriggerSource::Manual)
        .await
        .unwrap();

    assert!(!report.overall_success);
    assert_eq!(report.outcomes[0].failure, Some(FailureKind::NotConfigured));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn platform_flag_off_is_disabled() {
    let (cdn, platform) = cdn_pair(
        test_credentials(),
        Arc::new(RecordingTransport::succeeding()),
        false,
    );
    let control = CacheControl::new(
        AdapterRegistry::new().with(cdn).with(platform),
        Arc::new(MemoryResultStore::new()),
    );

    let status = control
        .get_status(BackendKind::CdnPlatformOptimization)
        .await
        .unwrap();
    assert_eq!(status.state, BackendState::Disabled);
    assert!(control.get_status(BackendKind::CdnCache).await.unwrap().is_active());
}

#[tokio::test]
async fn empty_object_cache_purge_succeeds() {
    let store = Arc::new(MemoryStore::new());
    let control = CacheControl::new(
        AdapterRegistry::new().with(Arc::new(ObjectCacheAdapter::new(
            store.clone() as Arc<dyn KeyValueStore>
        ))),
        Arc::new(MemoryResultStore::new()),
    );

    assert!(store.is_empty().await);
    let report = control
        .purge(&Selection::one(BackendKind::ObjectCache), TriggerSource::Scheduled)
        .await
        .unwrap();
    assert!(report.overall_success);
}

#[tokio::test]
async fn failing_hook_falls_back_to_disk_removal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("ab")).unwrap();
    std::fs::write(dir.path().join("ab").join("page"), b"cached").unwrap();
    std::fs::write(dir.path().join("index"), b"cached").unwrap();

    let edge = Arc::new(
        EdgeCacheAdapter::new(EdgeCacheMode::Disk, dir.path()).with_hook(Arc::new(
            || -> Result<(), BoxError> { Err("hook backend offline".into()) },
        )),
    );
    let mut registry = AdapterRegistry::new();
    registry.register_edge(edge);
    let control = CacheControl::new(registry, Arc::new(MemoryResultStore::new()));

    let report = control
        .purge(&Selection::one(BackendKind::EdgeCache), TriggerSource::ContentChange)
        .await
        .unwrap();

    let outcome = &report.outcomes[0];
    assert!(outcome.succeeded);
    assert!(outcome.message.contains("Removed 2 entries"));
    assert!(outcome.message.contains("hook backend offline"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(dir.path().exists());
}

#[tokio::test]
async fn store_mode_deletes_only_prefixed_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert("page:/", "home").await;
    store.insert("page:/about", "about").await;
    store.insert("session:42", "keep").await;

    let edge = EdgeCacheAdapter::new(EdgeCacheMode::Store, dir.path().join("absent"))
        .with_store(store.clone() as Arc<dyn KeyValueStore>, Some("page:".to_string()));
    let control = CacheControl::new(
        AdapterRegistry::new().with(Arc::new(edge)),
        Arc::new(MemoryResultStore::new()),
    );

    let report = control
        .purge(&Selection::one(BackendKind::EdgeCache), TriggerSource::Manual)
        .await
        .unwrap();

    assert!(report.overall_success);
    assert!(report.outcomes[0].message.contains("Deleted 2 keys"));
    assert!(store.get("page:/").await.is_none());
    assert_eq!(store.get("session:42").await.as_deref(), Some("keep"));
}

#[tokio::test]
async fn detached_dispatch_returns_before_adapters_finish() {
    init_test_tracing!();
    let registry = BackendKind::ALL
        .into_iter()
        .fold(AdapterRegistry::new(), |registry, kind| {
            registry.with(Arc::new(
                StaticAdapter::succeeding(kind).with_delay(Duration::from_millis(300)),
            ))
        });
    let control = CacheControl::new(registry, Arc::new(MemoryResultStore::new()));

    let started = Instant::now();
    let dispatch = control
        .dispatch(ExecutionMode::Detached, Selection::all(), TriggerSource::Manual)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(300));
    let Dispatch::Detached { id, .. } = dispatch else {
        panic!("expected a detached dispatch");
    };
    assert!(control.last_report().await.is_none());

    control.shutdown().await;

    let report = control.last_report().await.unwrap();
    assert_eq!(report.id, id);
    assert!(report.overall_success);
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(control.in_flight(), 0);
}

#[tokio::test]
async fn file_result_store_is_shared_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PurgeConfig::default();
    config.edge.mode = EdgeCacheMode::Off;
    config.edge.cache_dir = dir.path().join("edge");
    config.result_store.path = Some(dir.path().join("last-purge.json"));

    let first = CacheControl::from_config(&config).unwrap();
    let report = first.purge_all(TriggerSource::CommandLine).await.unwrap();
    assert!(!report.overall_success);
    assert!(report.summary_message.starts_with("No caches were purged"));

    let second = CacheControl::from_config(&config).unwrap();
    let snapshot = second.snapshot().await;
    assert_eq!(snapshot.last_purge, Some(report));
    assert_eq!(snapshot.statuses.len(), 4);
}
