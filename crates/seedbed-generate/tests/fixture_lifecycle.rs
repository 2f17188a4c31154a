use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use seedbed_core::{
    EntityKind, EntityType, FailureKind, NewRecord, Outcome, Registry, default_entity_types,
};
use seedbed_generate::{
    BatchRunner, NoProgress, PresetCatalog, PresetRunner, RunnerOptions,
};
use seedbed_store::{MemoryStore, StoreAccess};

fn options() -> RunnerOptions {
    RunnerOptions {
        seed: Some(42),
        now: Some(
            DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
                .expect("fixed clock")
                .with_timezone(&Utc),
        ),
        ..RunnerOptions::default()
    }
}

fn runner_with(registry: Registry, store: Arc<MemoryStore>) -> PresetRunner {
    let batch = BatchRunner::new(Arc::new(registry), store, options());
    PresetRunner::new(batch, PresetCatalog::default())
}

fn default_runner(store: Arc<MemoryStore>) -> PresetRunner {
    runner_with(
        Registry::new(default_entity_types()).expect("default registry"),
        store,
    )
}

fn summary(outcomes: &[Outcome]) -> Vec<(String, bool, u64)> {
    outcomes
        .iter()
        .map(|outcome| {
            (
                outcome.entity_type().to_string(),
                outcome.succeeded(),
                outcome.affected_count(),
            )
        })
        .collect()
}

#[tokio::test]
async fn minimal_preset_runs_in_dependency_order() {
    let store = Arc::new(MemoryStore::new());
    let runner = default_runner(store.clone());

    let report = runner
        .run_preset("minimal", &mut NoProgress, &CancellationToken::new())
        .await
        .expect("run preset");

    assert_eq!(
        summary(report.outcomes()),
        vec![
            ("board".to_string(), true, 2),
            ("category".to_string(), true, 2),
            ("content-item".to_string(), true, 2),
        ]
    );
    assert!(report.is_success());
    assert_eq!(report.preset.as_deref(), Some("minimal"));

    let boards = store.records("board").expect("boards");
    let board_ids: Vec<_> = boards.iter().map(|record| record.id).collect();
    for category in store.records("category").expect("categories") {
        assert!(board_ids.contains(&category.references["board_id"]));
    }
}

#[tokio::test]
async fn clear_keeps_protected_categories() {
    let registry = Registry::new(vec![
        EntityType::new("board", EntityKind::Board).with_natural_key(["slug"]),
        EntityType::new("category", EntityKind::Category)
            .with_parents(["board"])
            .with_natural_key(["slug"])
            .with_protected_keys(["alpha", "beta"]),
    ])
    .expect("registry");
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            "category",
            ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"]
                .into_iter()
                .map(|slug| NewRecord::new().field("slug", slug))
                .collect(),
        )
        .expect("seed categories");

    let runner = runner_with(registry, store.clone());
    let outcome = runner.batch().run_clear("category").await;
    assert!(outcome.succeeded());
    assert_eq!(outcome.affected_count(), 4);

    let read = runner.batch().read_records("category", None).await;
    let mut slugs: Vec<String> = read
        .records
        .iter()
        .filter_map(|record| record.value_of("slug"))
        .collect();
    slugs.sort();
    assert_eq!(slugs, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn missing_parent_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let runner = default_runner(store.clone());

    let outcome = runner.batch().run_generate("category", 3).await;
    assert!(!outcome.succeeded());
    assert_eq!(outcome.failure(), Some(FailureKind::MissingDependency));
    assert_eq!(outcome.affected_count(), 0);
    assert_eq!(store.count("category").expect("count"), 0);
}

#[tokio::test]
async fn preset_continues_past_a_failed_type() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = PresetCatalog::empty();
    catalog.insert(
        "five",
        [
            ("board", 2),
            ("category", 2),
            ("content-item", 3),
            ("tag", 4),
            ("group", 2),
        ]
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect(),
    );
    let batch = BatchRunner::new(
        Arc::new(Registry::new(default_entity_types()).expect("registry")),
        store.clone(),
        options(),
    );
    // No identities exist, so groups have no owner to reference.
    let runner = PresetRunner::new(batch, catalog);

    let report = runner
        .run_preset("five", &mut NoProgress, &CancellationToken::new())
        .await
        .expect("run preset");

    assert_eq!(report.outcomes().len(), 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);
    let failed: Vec<&Outcome> = report
        .outcomes()
        .iter()
        .filter(|outcome| !outcome.succeeded())
        .collect();
    assert_eq!(failed[0].entity_type(), "group");
    assert_eq!(failed[0].failure(), Some(FailureKind::MissingDependency));
    assert_eq!(store.count("tag").expect("count"), 4);
}

#[tokio::test]
async fn natural_key_upsert_is_idempotent_for_same_seed() {
    let store = Arc::new(MemoryStore::new());
    let runner = default_runner(store.clone());

    let first = runner.batch().run_generate("board", 5).await;
    let second = runner.batch().run_generate("board", 5).await;
    assert_eq!(first.affected_count(), 5);
    assert!(second.succeeded());
    assert!(second.affected_count() <= 5);
    assert_eq!(store.count("board").expect("count"), 5);
}

#[tokio::test]
async fn records_without_natural_key_append() {
    let store = Arc::new(MemoryStore::new());
    let runner = default_runner(store.clone());
    runner.batch().run_generate("board", 1).await;
    runner.batch().run_generate("category", 1).await;

    runner.batch().run_generate("content-item", 3).await;
    runner.batch().run_generate("content-item", 3).await;
    assert_eq!(store.count("content-item").expect("count"), 6);
}

#[tokio::test]
async fn denied_write_is_reported_as_access_denied() {
    let store = Arc::new(MemoryStore::new());
    store.deny("tag", StoreAccess::Write).expect("deny");
    let runner = default_runner(store.clone());

    let outcome = runner.batch().run_generate("tag", 3).await;
    assert!(!outcome.succeeded());
    assert_eq!(outcome.failure(), Some(FailureKind::AccessDenied));
    assert_eq!(store.count("tag").expect("count"), 0);
}

#[tokio::test]
async fn hidden_parents_surface_as_missing_dependency() {
    let store = Arc::new(MemoryStore::new());
    let runner = default_runner(store.clone());
    assert!(runner.batch().run_generate("board", 2).await.succeeded());

    store.deny("board", StoreAccess::Read).expect("deny");
    let outcome = runner.batch().run_generate("category", 2).await;
    assert_eq!(outcome.failure(), Some(FailureKind::MissingDependency));
}

#[tokio::test]
async fn unexpected_store_failures_are_contained() {
    let store = Arc::new(MemoryStore::new());
    store
        .fail("board", StoreAccess::Delete, "connection reset by peer")
        .expect("fail");
    let runner = default_runner(store.clone());

    let outcome = runner.batch().run_clear("board").await;
    assert_eq!(outcome.failure(), Some(FailureKind::Unexpected));
    assert!(outcome.message().contains("connection reset"));
}

#[tokio::test]
async fn unknown_types_are_not_supported() {
    let store = Arc::new(MemoryStore::new());
    store.fail("widget", StoreAccess::Write, "must not be called").expect("fail");
    let runner = default_runner(store.clone());

    let outcome = runner.batch().run_generate("widget", 3).await;
    assert_eq!(outcome.failure(), Some(FailureKind::NotSupported));
    assert!(outcome.message().contains("not supported"));
}

#[tokio::test]
async fn externally_owned_types_are_left_untouched() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            "identity",
            vec![NewRecord::new().field("handle", "ops"), NewRecord::new().field("handle", "dev")],
        )
        .expect("seed identities");
    let runner = default_runner(store.clone());

    let generate = runner.batch().generate_records("identity", 5).await;
    assert_eq!(generate.outcome.failure(), Some(FailureKind::NotSupported));
    assert_eq!(generate.records.len(), 2);

    let clear = runner.batch().run_clear("identity").await;
    assert_eq!(clear.failure(), Some(FailureKind::NotSupported));
    assert_eq!(store.count("identity").expect("count"), 2);
}

#[tokio::test]
async fn full_preset_with_identities_succeeds() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            "identity",
            (0..6)
                .map(|index| NewRecord::new().field("handle", format!("user{index}")))
                .collect(),
        )
        .expect("seed identities");
    let runner = default_runner(store.clone());

    let report = runner
        .run_preset("full", &mut NoProgress, &CancellationToken::new())
        .await
        .expect("run preset");
    assert!(report.is_success(), "{:?}", summary(report.outcomes()));

    let order: Vec<&str> = report
        .outcomes()
        .iter()
        .map(|outcome| outcome.entity_type())
        .collect();
    let position = |name: &str| order.iter().position(|entry| *entry == name).expect(name);
    assert!(position("board") < position("category"));
    assert!(position("category") < position("content-item"));
    assert!(position("content-item") < position("comment"));
    assert!(position("group") < position("membership"));
    // 5 groups x 6 identities caps memberships at 30 pairs.
    assert_eq!(store.count("membership").expect("count"), 25);
}

#[tokio::test]
async fn clear_all_runs_children_first_and_skips_external_types() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed("identity", vec![NewRecord::new().field("handle", "ops")])
        .expect("seed identity");
    let runner = default_runner(store.clone());
    runner
        .run_preset("minimal", &mut NoProgress, &CancellationToken::new())
        .await
        .expect("run preset");

    let report = runner
        .clear_all(&mut NoProgress, &CancellationToken::new())
        .await
        .expect("clear all");

    let order: Vec<&str> = report
        .outcomes()
        .iter()
        .map(|outcome| outcome.entity_type())
        .collect();
    assert_eq!(order.len(), 8);
    assert!(!order.contains(&"identity"));
    let position = |name: &str| order.iter().position(|entry| *entry == name).expect(name);
    assert!(position("content-item") < position("category"));
    assert!(position("category") < position("board"));
    assert!(report.is_success());
    assert_eq!(report.affected_total(), 6);
    assert_eq!(store.count("identity").expect("count"), 1);
}

#[tokio::test]
async fn unknown_preset_is_an_error() {
    let runner = default_runner(Arc::new(MemoryStore::new()));
    let err = runner
        .run_preset("huge", &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown preset 'huge'");
}

#[tokio::test]
async fn preset_reports_unregistered_types_alongside_the_rest() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = PresetCatalog::empty();
    catalog.insert(
        "mixed",
        [("board", 2), ("widget", 1)]
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect(),
    );
    let batch = BatchRunner::new(
        Arc::new(Registry::new(default_entity_types()).expect("registry")),
        store.clone(),
        options(),
    );
    let runner = PresetRunner::new(batch, catalog);

    let report = runner
        .run_preset("mixed", &mut NoProgress, &CancellationToken::new())
        .await
        .expect("run preset");

    assert_eq!(
        summary(report.outcomes()),
        vec![
            ("board".to_string(), true, 2),
            ("widget".to_string(), false, 0),
        ]
    );
    assert_eq!(report.outcomes()[1].failure(), Some(FailureKind::NotSupported));
    assert_eq!(store.count("board").expect("count"), 2);
}

#[tokio::test]
async fn kind_parents_wired_under_other_names_fail_without_writing() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed("section", vec![NewRecord::new().field("label", "news")])
        .expect("seed sections");
    let registry = Registry::new(vec![
        EntityType::new("section", EntityKind::Generic),
        EntityType::new("post", EntityKind::ContentItem).with_parents(["section"]),
    ])
    .expect("registry");
    let runner = runner_with(registry, store.clone());

    let outcome = runner.batch().run_generate("post", 2).await;
    assert_eq!(outcome.failure(), Some(FailureKind::MissingDependency));
    assert!(outcome.message().contains("category"));
    assert_eq!(store.count("post").expect("count"), 0);
}
