//! Debounced regeneration driven by a state store

use super::test_utils::Project;
use graphql_typegen::error::TypegenError;
use graphql_typegen::event::{ActionKind, StateStore};
use graphql_typegen::reporter::{MemoryReporter, ReportLevel, Reporter};
use graphql_typegen::scheduler::{FailurePolicy, RegenerationScheduler};
use graphql_typegen::schema::SchemaSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const DELAY: Duration = Duration::from_millis(40);

struct Harness {
    project: Project,
    store: StateStore,
    reporter: Arc<MemoryReporter>,
    scheduler: RegenerationScheduler,
}

fn harness(project: Project, policy: FailurePolicy) -> Harness {
    let host = SchemaSnapshot::from_sdl("host", &project.read("schema.graphql")).unwrap();
    let store = StateStore::new(host);
    let reporter = Arc::new(MemoryReporter::new());
    let configs = project.schema_configs(&project.config());
    let regenerator = Arc::new(project.regenerator(configs, reporter.clone()));
    let scheduler = RegenerationScheduler::new(
        regenerator,
        reporter.clone() as Arc<dyn Reporter>,
        DELAY,
        policy,
    );
    Harness {
        project,
        store,
        reporter,
        scheduler,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(10), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_burst_of_changes_regenerates_once_settled() {
    let h = harness(Project::site(), FailurePolicy::Warn);

    let driver = async {
        wait_until(|| h.reporter.messages(ReportLevel::Info).len() == 1).await;
        assert!(h.project.read("graphql-types.ts").contains("HomeQuery"));

        h.project.write(
            "src/pages/blog.tsx",
            "export const query = graphql`\n  query Blog { allPost(limit: 5) { slug title } }\n`;\n",
        );
        for _ in 0..3 {
            h.store.dispatch(ActionKind::QueryExtracted);
        }
        h.store.dispatch(ActionKind::Other("SET_PROGRAM_STATUS".to_string()));

        wait_until(|| h.reporter.messages(ReportLevel::Info).len() == 2).await;
        sleep(DELAY * 3).await;
        h.store.close();
    };

    let (outcome, _) = tokio::join!(h.scheduler.run(&h.store), driver);
    outcome.unwrap();

    assert_eq!(
        h.reporter.messages(ReportLevel::Info),
        vec![
            "definition for default-gatsby-schema has been updated.",
            "definition for default-gatsby-schema has been updated.",
        ]
    );
    let generated = h.project.read("graphql-types.ts");
    assert!(generated.contains("export type BlogQuery = {"));
    assert!(generated.contains("export type HomeQuery = {"));
}

#[tokio::test]
async fn test_warn_policy_keeps_previous_artifact() {
    let h = harness(Project::site(), FailurePolicy::Warn);

    let driver = async {
        wait_until(|| h.project.path("graphql-types.ts").exists()).await;
        let before = h.project.read("graphql-types.ts");

        h.project.write(
            "src/pages/broken.tsx",
            "export const query = graphql`\n  query Broken { site { missing } }\n`;\n",
        );
        h.store.dispatch(ActionKind::QueryExtracted);

        wait_until(|| !h.reporter.messages(ReportLevel::Warn).is_empty()).await;
        assert_eq!(h.project.read("graphql-types.ts"), before);
        h.store.close();
    };

    let (outcome, _) = tokio::join!(h.scheduler.run(&h.store), driver);
    outcome.unwrap();

    let warnings = h.reporter.messages(ReportLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("failed to generate types for default-gatsby-schema:"));
    assert!(h.reporter.messages(ReportLevel::Panic).is_empty());
}

#[tokio::test]
async fn test_fail_policy_stops_scheduler() {
    let project = Project::site();
    project.write(
        "src/pages/broken.tsx",
        "export const query = graphql`\n  query Broken { site { missing } }\n`;\n",
    );
    let h = harness(project, FailurePolicy::Fail);

    let err = timeout(Duration::from_secs(10), h.scheduler.run(&h.store))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, TypegenError::Fatal(_)));
    assert_eq!(h.reporter.messages(ReportLevel::Panic).len(), 1);
    assert!(!h.project.path("graphql-types.ts").exists());
}

#[tokio::test]
async fn test_schema_replacement_reaches_next_run() {
    let h = harness(Project::site(), FailurePolicy::Warn);

    let driver = async {
        wait_until(|| h.reporter.messages(ReportLevel::Info).len() == 1).await;
        let extended = format!("{}\ntype Author {{ name: String }}\n", h.project.read("schema.graphql"));
        h.store
            .replace_schema(SchemaSnapshot::from_sdl("host", &extended).unwrap());
        h.store.dispatch(ActionKind::QueryExtracted);

        wait_until(|| h.reporter.messages(ReportLevel::Info).len() == 2).await;
        h.store.close();
    };

    let (outcome, _) = tokio::join!(h.scheduler.run(&h.store), driver);
    outcome.unwrap();
    assert!(h.project.read("graphql-types.ts").contains("export type Author = {"));
}
