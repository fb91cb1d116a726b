//! End-to-end runs through the CLI run context

use super::test_utils::Project;
use graphql_typegen::cli::{map_error, Commands, RunContext};
use graphql_typegen::error::TypegenError;

const PROJECT_CONFIG: &str = r#"
file_name = "types/graphql-types.ts"
document_paths = ["./src/**/*.{ts,tsx}", "./src/**/*.graphql"]
"#;

#[test]
fn test_generate_from_project_config() {
    let project = Project::site();
    project.write("typegen.toml", PROJECT_CONFIG);

    let ctx = RunContext::new(project.root().to_path_buf(), None).unwrap();
    assert_eq!(ctx.config().file_name, "types/graphql-types.ts");

    let output = ctx.execute(&Commands::Generate).unwrap();
    assert!(output.contains("Generated 1 artifact(s)"));

    let generated = project.read("types/graphql-types.ts");
    assert!(generated.contains("export type Site = {"));
    assert!(generated.contains("export type HomeQueryVariables = Exact<{ [key: string]: never; }>;"));
    assert!(generated.contains("export type HomeQuery = {"));
    assert!(generated.contains("export type SiteMetaFragment = {"));
    assert!(generated.contains("& SiteMetaFragment"));
}

#[test]
fn test_explicit_config_file() {
    let project = Project::site();
    project.write("typegen.toml", "file_name = \"ignored.ts\"\n");
    project.write("ci/typegen.toml", PROJECT_CONFIG);

    let ctx = RunContext::new(
        project.root().to_path_buf(),
        Some(project.path("ci/typegen.toml")),
    )
    .unwrap();
    ctx.execute(&Commands::Generate).unwrap();

    assert!(project.path("types/graphql-types.ts").exists());
    assert!(!project.path("ignored.ts").exists());
}

#[test]
fn test_output_inside_src_is_rejected() {
    let project = Project::site();
    project.write("typegen.toml", "file_name = \"src/graphql-types.ts\"\n");

    let ctx = RunContext::new(project.root().to_path_buf(), None).unwrap();
    let err = ctx.execute(&Commands::Generate).unwrap_err();
    assert!(matches!(err, TypegenError::Config(_)));
    assert!(map_error(&err).contains("protected src/ directory"));
    assert!(!project.path("src/graphql-types.ts").exists());
}

#[test]
fn test_invalid_document_fails_generate() {
    let project = Project::site();
    project.write("typegen.toml", PROJECT_CONFIG);
    project.write(
        "src/pages/broken.tsx",
        "export const query = graphql`\n  query Broken { site { missing } }\n`;\n",
    );

    let ctx = RunContext::new(project.root().to_path_buf(), None).unwrap();
    let err = ctx.execute(&Commands::Generate).unwrap_err();
    assert!(matches!(err, TypegenError::Fatal(_)));
    assert!(err.to_string().contains("Cannot query field \"missing\" on type \"Site\""));
    assert!(!project.path("types/graphql-types.ts").exists());
}
