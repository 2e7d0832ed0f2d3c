//! End-to-end tests of the smoke orchestrator loop: polling, checkout,
//! build-failure handling, dependency policy and revision persistence.

mod common;

use chimps_smoker::application::use_cases::smoke_projects::{SmokeConfig, SmokeOrchestrator};
use chimps_smoker::domain::entities::smoke_result::ProjectState;
use chimps_smoker::domain::value_objects::revision::Revision;
use chimps_smoker::infrastructure::filesystem::config_store::ConfigStore;
use common::mock_services::{RecordingHarness, RecordingSender};
use common::test_fixtures::{write_registry, GitFixture, RegistryEntry};
use std::path::Path;
use tempfile::TempDir;

async fn persisted_revision(config: &Path, project: &str) -> Option<String> {
    let registry = ConfigStore::new(config).load().await.unwrap();
    registry
        .get(project)
        .and_then(|p| p.revision.as_ref())
        .map(|r| r.to_string())
}

#[tokio::test]
async fn test_new_revision_is_smoked_and_reported() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let r2 = fixture.commit_file("t/basic.t", "ok 1\nok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    // The marker lands outside the checkout; the cleaning step reverts
    // the working copy itself.
    let marker = state_dir.path().join("configured.marker");
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url())
            .with_revision(&r1)
            .with_configure_cmd(&format!("touch {}", marker.display()))],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();
    let harness = RecordingHarness::new();
    let sender = RecordingSender::new();
    let calls = harness.calls();
    let sent = sender.sent();

    let mut orchestrator = SmokeOrchestrator::new(
        store,
        registry,
        SmokeConfig::new().with_workdir(workdir.path()),
    )
    .unwrap()
    .with_harness(Box::new(harness))
    .with_sender(Box::new(sender));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    assert_eq!(summary.attempts.len(), 1);
    assert_eq!(
        summary.attempts[0],
        (
            "widget".to_string(),
            ProjectState::Reported {
                revision: Revision::from(r2.clone()),
                sent: true,
            }
        )
    );

    // The harness saw the checked-out tree with the project's
    // environment frame in place.
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let run = &calls[0];
    assert_eq!(run.project, "widget");
    assert_eq!(run.revision, r2);
    assert_eq!(run.root, workdir.path().join("widget"));
    assert_eq!(run.lib_paths[0], workdir.path().join("widget/blib/lib"));
    assert_eq!(
        run.root_env.as_deref(),
        Some(workdir.path().join("widget").display().to_string().as_str())
    );

    // Configure ran before testing.
    assert!(marker.exists());

    // One report delivered, revision persisted immediately.
    assert_eq!(sent.lock().unwrap().len(), 1);
    assert_eq!(persisted_revision(&config_path, "widget").await, Some(r2));
}

#[tokio::test]
async fn test_no_change_leaves_registry_untouched() {
    let mut fixture = GitFixture::new();
    let _r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url()).with_revision(&r2)],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();
    let harness = RecordingHarness::new();
    let calls = harness.calls();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(harness));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    assert_eq!(
        summary.attempts[0],
        ("widget".to_string(), ProjectState::NoChange)
    );
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(persisted_revision(&config_path, "widget").await, Some(r2));
}

#[tokio::test]
async fn test_build_failure_persists_revision_and_skips_testing() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url())
            .with_revision(&r1)
            .with_configure_cmd("exit 1")],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();
    let harness = RecordingHarness::new();
    let sender = RecordingSender::new();
    let calls = harness.calls();
    let sent = sender.sent();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(harness))
        .with_sender(Box::new(sender));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    // Build failed: no testing, no report, but the revision advances so
    // the broken revision is never retried forever.
    assert_eq!(
        summary.attempts[0],
        (
            "widget".to_string(),
            ProjectState::BuildFailed {
                revision: Revision::from(r2.clone()),
            }
        )
    );
    assert!(calls.lock().unwrap().is_empty());
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(persisted_revision(&config_path, "widget").await, Some(r2));
}

#[tokio::test]
async fn test_dependency_failure_keeps_revision_by_default() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let _r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[
            RegistryEntry::git("app", fixture.url())
                .with_revision(&r1)
                .with_configure_cmd("touch app.configured")
                .with_dependencies(vec!["libx"]),
            RegistryEntry::git("libx", "/nonexistent/libx.git").with_dependency_only(),
        ],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();
    let harness = RecordingHarness::new();
    let sender = RecordingSender::new();
    let calls = harness.calls();
    let sent = sender.sent();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(harness))
        .with_sender(Box::new(sender));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    // Only `app` is smokable; its attempt aborts in the dependency.
    assert_eq!(summary.attempts.len(), 1);
    assert_eq!(
        summary.attempts[0],
        (
            "app".to_string(),
            ProjectState::DependencyFailed {
                dependency: "libx".to_string(),
            }
        )
    );

    // Neither tested nor reported, and the default policy retries the
    // same combination next poll: the revision pointer stays at r1.
    assert!(calls.lock().unwrap().is_empty());
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(persisted_revision(&config_path, "app").await, Some(r1));
}

#[tokio::test]
async fn test_dependency_failure_advances_with_policy() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[
            RegistryEntry::git("app", fixture.url())
                .with_revision(&r1)
                .with_dependencies(vec!["libx"]),
            RegistryEntry::git("libx", "/nonexistent/libx.git").with_dependency_only(),
        ],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();

    let mut orchestrator = SmokeOrchestrator::new(
        store,
        registry,
        SmokeConfig::new().with_advance_on_dependency_failure(true),
    )
    .unwrap()
    .with_harness(Box::new(RecordingHarness::new()));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    assert!(matches!(
        summary.attempts[0].1,
        ProjectState::DependencyFailed { .. }
    ));
    assert_eq!(persisted_revision(&config_path, "app").await, Some(r2));
}

#[tokio::test]
async fn test_dependency_lib_paths_reach_the_harness() {
    let mut app_fixture = GitFixture::new();
    let r1 = app_fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let _r2 = app_fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let mut lib_fixture = GitFixture::new();
    let _l1 = lib_fixture.commit_file("lib.txt", "lib", "carol", "l1");

    let state_dir = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[
            RegistryEntry::git("app", app_fixture.url())
                .with_revision(&r1)
                .with_dependencies(vec!["libx"]),
            RegistryEntry::git("libx", lib_fixture.url()).with_dependency_only(),
        ],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();
    let harness = RecordingHarness::new();
    let calls = harness.calls();

    let mut orchestrator = SmokeOrchestrator::new(
        store,
        registry,
        SmokeConfig::new().with_workdir(workdir.path()),
    )
    .unwrap()
    .with_harness(Box::new(harness));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    // The dependency-only project is never polled directly.
    assert_eq!(summary.attempts.len(), 1);
    assert!(matches!(
        summary.attempts[0].1,
        ProjectState::Reported { .. }
    ));

    // Own paths first, then the dependency's, in declaration order.
    let calls = calls.lock().unwrap();
    assert_eq!(
        calls[0].lib_paths,
        vec![
            workdir.path().join("app/blib/lib"),
            workdir.path().join("libx/blib/lib"),
        ]
    );
    assert!(workdir.path().join("libx/lib.txt").exists());
}

#[tokio::test]
async fn test_harness_failure_is_treated_as_build_failure() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url()).with_revision(&r1)],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();
    let sender = RecordingSender::new();
    let sent = sender.sent();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(RecordingHarness::failing()))
        .with_sender(Box::new(sender));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    assert_eq!(
        summary.attempts[0],
        (
            "widget".to_string(),
            ProjectState::BuildFailed {
                revision: Revision::from(r2.clone()),
            }
        )
    );
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(persisted_revision(&config_path, "widget").await, Some(r2));
}

#[tokio::test]
async fn test_rejected_report_still_persists_revision() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url()).with_revision(&r1)],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(RecordingHarness::new()))
        .with_sender(Box::new(RecordingSender::rejecting()));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    assert_eq!(
        summary.attempts[0],
        (
            "widget".to_string(),
            ProjectState::Reported {
                revision: Revision::from(r2.clone()),
                sent: false,
            }
        )
    );
    assert_eq!(persisted_revision(&config_path, "widget").await, Some(r2));
}

#[tokio::test]
async fn test_iterations_advance_one_revision_at_a_time() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");
    let r3 = fixture.commit_file("t/basic.t", "ok 3", "carol", "r3");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url()).with_revision(&r1)],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();
    let harness = RecordingHarness::new();
    let calls = harness.calls();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(harness));

    let summary = orchestrator.smoke(Some(2), None).await.unwrap();

    assert_eq!(summary.iterations, 2);
    let revisions: Vec<String> = calls
        .lock()
        .unwrap()
        .iter()
        .map(|run| run.revision.clone())
        .collect();
    assert_eq!(revisions, vec![r2, r3.clone()]);
    assert_eq!(persisted_revision(&config_path, "widget").await, Some(r3));
}

#[tokio::test]
async fn test_one_broken_project_never_aborts_siblings() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let _r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[
            // Sorts first and fails to clone at all.
            RegistryEntry::git("aaa-broken", "/nonexistent/broken.git").with_revision("deadbeef"),
            RegistryEntry::git("widget", fixture.url()).with_revision(&r1),
        ],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(RecordingHarness::new()));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();

    assert_eq!(summary.attempts.len(), 2);
    assert!(matches!(
        summary.attempts[0].1,
        ProjectState::Errored { .. }
    ));
    assert!(matches!(
        summary.attempts[1].1,
        ProjectState::Reported { .. }
    ));
    assert_eq!(summary.errors.len(), 1);
}

#[tokio::test]
async fn test_clean_hook_state_replayed_after_tests() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");
    let _r2 = fixture.commit_file("t/basic.t", "ok 2", "bob", "r2");

    let state_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let log_path = out_dir.path().join("clean.log");

    // Pre-test run: empty stdin, prints the state token. Post-test run:
    // receives the captured token on stdin and appends it to the log.
    let clean_cmd = format!("cat >> {}; printf 'state-123'", log_path.display());
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url())
            .with_revision(&r1)
            .with_clean_cmd(&clean_cmd)],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new())
        .unwrap()
        .with_harness(Box::new(RecordingHarness::new()));

    let summary = orchestrator.smoke(Some(1), None).await.unwrap();
    assert!(matches!(
        summary.attempts[0].1,
        ProjectState::Reported { .. }
    ));

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(log, "state-123");
}

#[tokio::test]
async fn test_unknown_requested_project_is_fatal() {
    let mut fixture = GitFixture::new();
    let r1 = fixture.commit_file("t/basic.t", "ok 1", "alice", "r1");

    let state_dir = TempDir::new().unwrap();
    let config_path = write_registry(
        state_dir.path(),
        &[RegistryEntry::git("widget", fixture.url()).with_revision(&r1)],
    );

    let store = ConfigStore::new(&config_path);
    let registry = store.load().await.unwrap();

    let mut orchestrator = SmokeOrchestrator::new(store, registry, SmokeConfig::new()).unwrap();
    let result = orchestrator
        .smoke(Some(1), Some(&["ghost".to_string()]))
        .await;
    assert!(result.is_err());
}
