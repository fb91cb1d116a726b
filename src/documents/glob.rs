//! Glob patterns for document search paths
//!
//! Patterns are relative to the project root and compile to anchored regular
//! expressions over `/`-separated relative paths. Supported syntax: `*`, `**`, `?`
//! and `{a,b}` alternation.

use crate::error::TypegenError;
use regex::Regex;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directories never descended into unless the pattern names them
const PRUNED_DIRS: [&str; 2] = [".git", "node_modules"];

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
    base: PathBuf,
    /// First magic segment below the base, when more segments follow it
    next_segment: Option<Regex>,
}

/// A directory to register with the filesystem watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    pub path: PathBuf,
    pub recursive: bool,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, TypegenError> {
        let invalid = |e: regex::Error| TypegenError::DocumentLoad {
            pattern: pattern.to_string(),
            message: format!("invalid glob: {}", e),
        };
        let normalized = normalize(pattern);
        let regex = Regex::new(&translate(&normalized)?).map_err(invalid)?;
        let base = literal_base(&normalized);
        let next_segment = match narrowing_segment(&normalized, base.components().count()) {
            Some(segment) => Some(Regex::new(&translate(segment)?).map_err(invalid)?),
            None => None,
        };
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            base,
            next_segment,
        })
    }

    /// Original pattern text
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Longest literal directory prefix; the walk starts here
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Match a `/`-separated path relative to the project root
    pub fn is_match(&self, relative: &str) -> bool {
        self.regex.is_match(relative.trim_start_matches("./"))
    }

    /// Match an absolute path located under `root`
    pub fn matches_path(&self, root: &Path, path: &Path) -> bool {
        path.strip_prefix(root)
            .ok()
            .map(|relative| self.is_match(&to_slash(relative)))
            .unwrap_or(false)
    }

    /// Walk the filesystem under `root` and return matching files, sorted
    pub fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let start = root.join(&self.base);
        if !start.exists() {
            return Vec::new();
        }
        let names_pruned = self.pruned_dirs();

        let mut files: Vec<PathBuf> = WalkDir::new(&start)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !names_pruned
                        .iter()
                        .any(|dir| entry.file_name() == OsStr::new(dir))
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.matches_path(root, path))
            .collect();

        files.sort();
        files
    }

    /// Directories to watch so changes to matching files are observed.
    ///
    /// Pruned directories are left out. When the base itself lies inside one
    /// (`node_modules/gatsby-*/...`), only the children matching the next
    /// segment are watched instead of the whole tree.
    pub fn watch_roots(&self, root: &Path) -> Vec<WatchRoot> {
        let start = root.join(&self.base);
        if !start.is_dir() {
            return Vec::new();
        }
        let children = || {
            WalkDir::new(&start)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_dir())
        };

        let inside_pruned = self
            .base
            .components()
            .any(|c| PRUNED_DIRS.iter().any(|dir| c.as_os_str() == OsStr::new(dir)));
        if inside_pruned {
            if let Some(segment) = &self.next_segment {
                return children()
                    .filter(|entry| segment.is_match(&entry.file_name().to_string_lossy()))
                    .map(|entry| WatchRoot {
                        path: entry.into_path(),
                        recursive: true,
                    })
                    .collect();
            }
        }

        let pruned = self.pruned_dirs();
        let is_pruned =
            |entry: &walkdir::DirEntry| pruned.iter().any(|dir| entry.file_name() == OsStr::new(dir));
        if !children().any(|entry| is_pruned(&entry)) {
            return vec![WatchRoot {
                path: start.clone(),
                recursive: true,
            }];
        }

        let mut roots = vec![WatchRoot {
            path: start.clone(),
            recursive: false,
        }];
        roots.extend(
            children()
                .filter(|entry| !is_pruned(entry))
                .map(|entry| WatchRoot {
                    path: entry.into_path(),
                    recursive: true,
                }),
        );
        roots
    }

    fn pruned_dirs(&self) -> Vec<&'static str> {
        PRUNED_DIRS
            .iter()
            .copied()
            .filter(|dir| !self.pattern.contains(dir))
            .collect()
    }
}

fn narrowing_segment(pattern: &str, depth: usize) -> Option<&str> {
    let segments: Vec<&str> = pattern.split('/').collect();
    if depth + 1 >= segments.len() {
        return None;
    }
    let segment = segments[depth];
    (segment != "**" && is_magic(segment)).then_some(segment)
}

fn normalize(pattern: &str) -> String {
    let pattern = pattern.trim().replace('\\', "/");
    pattern.trim_start_matches("./").to_string()
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_magic(segment: &str) -> bool {
    segment.contains(|c: char| matches!(c, '*' | '?' | '{' | '['))
}

fn literal_base(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        if is_magic(segment) {
            break;
        }
        base.push(segment);
    }
    base
}

fn translate(pattern: &str) -> Result<String, TypegenError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex = String::from("^");
    let mut brace_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    regex.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '{' => {
                brace_depth += 1;
                regex.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                regex.push(')');
            }
            ',' if brace_depth > 0 => regex.push('|'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }

    if brace_depth > 0 {
        return Err(TypegenError::DocumentLoad {
            pattern: pattern.to_string(),
            message: "unbalanced '{' in glob".to_string(),
        });
    }
    regex.push('$');
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_matches_default_document_patterns() {
        let src = GlobPattern::new("./src/**/*.{ts,tsx}").unwrap();
        assert!(src.is_match("src/pages/index.tsx"));
        assert!(src.is_match("src/a.ts"));
        assert!(src.is_match("src/deep/er/x.ts"));
        assert!(!src.is_match("src/pages/index.js"));
        assert!(!src.is_match("lib/index.ts"));
        assert_eq!(src.base_dir(), Path::new("src"));

        let modules = GlobPattern::new("./node_modules/gatsby-*/**/*.js").unwrap();
        assert!(modules.is_match("node_modules/gatsby-image/index.js"));
        assert!(modules.is_match("node_modules/gatsby-transformer-sharp/src/fragments.js"));
        assert!(!modules.is_match("node_modules/react/index.js"));
        assert_eq!(modules.base_dir(), Path::new("node_modules"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let glob = GlobPattern::new("queries/*.graphql").unwrap();
        assert!(glob.is_match("queries/site.graphql"));
        assert!(!glob.is_match("queries/nested/site.graphql"));
    }

    #[test]
    fn test_unbalanced_brace_is_rejected() {
        assert!(GlobPattern::new("src/**/*.{ts,tsx").is_err());
    }

    #[test]
    fn test_walk_collects_matching_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/pages")).unwrap();
        fs::create_dir_all(root.join("src/node_modules/pkg")).unwrap();
        fs::write(root.join("src/pages/index.tsx"), "").unwrap();
        fs::write(root.join("src/util.ts"), "").unwrap();
        fs::write(root.join("src/readme.md"), "").unwrap();
        fs::write(root.join("src/node_modules/pkg/x.ts"), "").unwrap();

        let glob = GlobPattern::new("./src/**/*.{ts,tsx}").unwrap();
        let files = glob.walk(root);
        assert_eq!(
            files,
            vec![root.join("src/pages/index.tsx"), root.join("src/util.ts")]
        );
    }

    #[test]
    fn test_watch_roots_skip_pruned_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for dir in [
            "src/pages",
            "queries",
            ".git/objects",
            "node_modules/gatsby-image/src",
            "node_modules/react",
        ] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }

        let src = GlobPattern::new("./src/**/*.{ts,tsx}").unwrap();
        assert_eq!(
            src.watch_roots(root),
            vec![WatchRoot {
                path: root.join("src"),
                recursive: true,
            }]
        );

        let modules = GlobPattern::new("./node_modules/gatsby-*/**/*.js").unwrap();
        assert_eq!(
            modules.watch_roots(root),
            vec![WatchRoot {
                path: root.join("node_modules/gatsby-image"),
                recursive: true,
            }]
        );

        let everywhere = GlobPattern::new("**/*.graphql").unwrap();
        assert_eq!(
            everywhere.watch_roots(root),
            vec![
                WatchRoot {
                    path: root.to_path_buf(),
                    recursive: false,
                },
                WatchRoot {
                    path: root.join("queries"),
                    recursive: true,
                },
                WatchRoot {
                    path: root.join("src"),
                    recursive: true,
                },
            ]
        );

        let missing = GlobPattern::new("./lib/**/*.ts").unwrap();
        assert!(missing.watch_roots(root).is_empty());
    }

    #[test]
    fn test_walk_missing_base_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let glob = GlobPattern::new("./node_modules/gatsby-*/**/*.js").unwrap();
        assert!(glob.walk(temp_dir.path()).is_empty());
    }
}
