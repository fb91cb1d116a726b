//! Shared project fixtures for integration tests

use graphql_typegen::codegen::TypeScriptGenerator;
use graphql_typegen::config::{SchemaConfig, TypegenConfig};
use graphql_typegen::documents::FsDocumentLoader;
use graphql_typegen::pipeline::{GenerationPipeline, Regenerator};
use graphql_typegen::reporter::Reporter;
use graphql_typegen::schema::DefaultSchemaLoader;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const SITE_SDL: &str = r#"
type Query {
  site: Site
  allPost(limit: Int): [Post!]!
}

type Site {
  title: String
  description: String
}

type Post {
  slug: String!
  title: String
}
"#;

pub const HOME_PAGE: &str = r#"import { graphql } from "gatsby";

export const query = graphql`
  query Home {
    site {
      ...SiteMeta
    }
  }
`;
"#;

pub const FRAGMENTS: &str = r#"fragment SiteMeta on Site {
  title
  description
}
"#;

/// A temporary project directory
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// Project with `schema.graphql`, a page and a fragment file
    pub fn site() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        project.write("schema.graphql", SITE_SDL);
        project.write("src/pages/index.tsx", HOME_PAGE);
        project.write("src/fragments.graphql", FRAGMENTS);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    /// Default configuration searching `src/` only
    pub fn config(&self) -> TypegenConfig {
        let mut config = TypegenConfig::default();
        config.document_paths = vec![
            "./src/**/*.{ts,tsx}".to_string(),
            "./src/**/*.graphql".to_string(),
        ];
        config.fail_on_error = false;
        config
    }

    pub fn schema_configs(&self, config: &TypegenConfig) -> Vec<SchemaConfig> {
        config.schema_configs(self.root()).unwrap()
    }

    /// Regenerator wired with the filesystem loaders
    pub fn regenerator(
        &self,
        configs: Vec<SchemaConfig>,
        reporter: Arc<dyn Reporter>,
    ) -> Regenerator {
        let pipeline = GenerationPipeline::new(
            Arc::new(FsDocumentLoader::new(self.root())),
            Arc::new(TypeScriptGenerator::new()),
            reporter,
        );
        Regenerator::new(
            pipeline,
            Arc::new(DefaultSchemaLoader::new(self.root())),
            configs,
        )
    }
}
