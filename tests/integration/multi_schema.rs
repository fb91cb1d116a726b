//! Independent artifacts for the host schema and additional schemas

use super::test_utils::Project;
use graphql_typegen::config::AdditionalSchemaConfig;
use graphql_typegen::error::TypegenError;
use graphql_typegen::reporter::{MemoryReporter, ReportLevel};
use graphql_typegen::scheduler::RunTarget;
use graphql_typegen::schema::{SchemaLocator, SchemaSnapshot};
use std::sync::Arc;

const CMS_SDL: &str = "type Query { article(id: ID!): Article }\ntype Article { id: ID! headline: String }\n";

fn cms_schema(document_paths: &[&str]) -> AdditionalSchemaConfig {
    AdditionalSchemaConfig {
        key: "cms".to_string(),
        file_name: None,
        schema: SchemaLocator::Pointer("cms.graphql".to_string()),
        document_paths: Some(document_paths.iter().map(|p| p.to_string()).collect()),
        pluck_config: None,
        codegen_plugins: Vec::new(),
        codegen_config: Default::default(),
    }
}

fn host(project: &Project) -> SchemaSnapshot {
    SchemaSnapshot::from_sdl("host", &project.read("schema.graphql")).unwrap()
}

#[tokio::test]
async fn test_each_schema_gets_its_own_artifact() {
    let project = Project::site();
    project.write("cms.graphql", CMS_SDL);
    project.write(
        "cms/article.graphql",
        "query Article($id: ID!) { article(id: $id) { headline } }\n",
    );

    let mut config = project.config();
    config.additional_schemas.push(cms_schema(&["./cms/**/*.graphql"]));
    let reporter = Arc::new(MemoryReporter::new());
    let regenerator = project.regenerator(project.schema_configs(&config), reporter.clone());

    let report = regenerator.run(host(&project)).await;
    assert!(report.is_success());
    assert_eq!(report.updated, vec!["default-gatsby-schema", "cms"]);

    let site = project.read("graphql-types.ts");
    assert!(site.contains("export type HomeQuery = {"));
    assert!(!site.contains("ArticleQuery"));

    let cms = project.read("graphql-types-cms.ts");
    assert!(cms.contains("export type ArticleQueryVariables = Exact<{\n  id: Scalars['ID'];\n}>;"));
    assert!(cms.contains("headline?: Maybe<Scalars['String']>;"));
    assert!(!cms.contains("HomeQuery"));
    assert!(reporter.messages(ReportLevel::Warn).is_empty());
}

#[tokio::test]
async fn test_failed_additional_schema_is_retried() {
    let project = Project::site();
    project.write(
        "cms/article.graphql",
        "query Article { article(id: \"1\") { id } }\n",
    );

    let mut config = project.config();
    config.additional_schemas.push(cms_schema(&["./cms/**/*.graphql"]));
    let regenerator = project.regenerator(
        project.schema_configs(&config),
        Arc::new(MemoryReporter::new()),
    );

    let report = regenerator.run(host(&project)).await;
    assert_eq!(report.updated, vec!["default-gatsby-schema"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "cms");
    assert!(matches!(report.failures[0].error, TypegenError::SchemaLoad { .. }));
    assert!(project.path("graphql-types.ts").exists());
    assert!(!project.path("graphql-types-cms.ts").exists());

    project.write("cms.graphql", CMS_SDL);
    let report = regenerator.run(host(&project)).await;
    assert!(report.is_success());
    assert!(project.read("graphql-types-cms.ts").contains("export type ArticleQuery = {"));
}

#[tokio::test]
async fn test_unmatched_pattern_only_warns() {
    let project = Project::site();
    project.write("cms.graphql", CMS_SDL);

    let mut config = project.config();
    config.additional_schemas.push(cms_schema(&["./nothing/**/*.graphql"]));
    let reporter = Arc::new(MemoryReporter::new());
    let regenerator = project.regenerator(project.schema_configs(&config), reporter.clone());

    let report = regenerator.run(host(&project)).await;
    assert!(report.is_success());

    let warnings = reporter.messages(ReportLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("[cms]"));
    assert!(warnings[0].contains("./nothing/**/*.graphql"));

    let cms = project.read("graphql-types-cms.ts");
    assert!(cms.contains("export type Article = {"));
}
