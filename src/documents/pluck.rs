//! Extraction of GraphQL text embedded in source files
//!
//! Source files are parsed as JavaScript/TypeScript with `swc`; the syntax tree is
//! visited for tagged template literals (`graphql\`...\``) and for template
//! literals preceded by a `/* GraphQL */` magic comment. Interpolations are dropped.
//! Tags that only appear in comments or strings are never matched.

use serde::{Deserialize, Serialize};
use std::path::Path;
use swc_common::comments::{Comments, SingleThreadedComments};
use swc_common::{sync::Lrc, BytePos, FileName, Globals, SourceMap, Spanned, GLOBALS};
use swc_ecma_ast::{EsVersion, Expr, TaggedTpl, Tpl};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_visit::{Visit, VisitWith};
use thiserror::Error;

/// A module whose export tags GraphQL templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluckModule {
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
}

/// Options controlling which templates are extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluckConfig {
    #[serde(default = "default_identifier")]
    pub global_gql_identifier_name: String,

    #[serde(default)]
    pub modules: Vec<PluckModule>,

    #[serde(default = "default_magic_comment")]
    pub gql_magic_comment: String,
}

fn default_identifier() -> String {
    "graphql".to_string()
}

fn default_magic_comment() -> String {
    "graphql".to_string()
}

impl Default for PluckConfig {
    fn default() -> Self {
        Self {
            global_gql_identifier_name: default_identifier(),
            modules: vec![PluckModule {
                name: "gatsby".to_string(),
                identifier: Some("graphql".to_string()),
            }],
            gql_magic_comment: default_magic_comment(),
        }
    }
}

impl PluckConfig {
    /// All template tags recognized, deduplicated
    pub fn identifiers(&self) -> Vec<&str> {
        let mut identifiers = vec![self.global_gql_identifier_name.as_str()];
        for module in &self.modules {
            if let Some(identifier) = module.identifier.as_deref() {
                if !identifiers.contains(&identifier) {
                    identifiers.push(identifier);
                }
            }
        }
        identifiers.retain(|i| !i.is_empty());
        identifiers
    }
}

/// A template literal found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluckedTemplate {
    /// 1-based line of the tag
    pub line: usize,
    pub text: String,
}

/// A source file that could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{line}: {message}")]
pub struct PluckError {
    pub line: usize,
    pub message: String,
}

/// Extract every GraphQL template literal from `source`.
///
/// The file extension of `path` selects the parser: `.ts`/`.mts`/`.cts` as
/// TypeScript, `.tsx` as TSX, anything else as JavaScript with JSX.
pub fn pluck(
    source: &str,
    path: &Path,
    config: &PluckConfig,
) -> Result<Vec<PluckedTemplate>, PluckError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(path.display().to_string())),
        source.to_string(),
    );
    let comments = SingleThreadedComments::default();

    GLOBALS.set(&Globals::default(), || -> Result<Vec<PluckedTemplate>, PluckError> {
        let lexer = Lexer::new(
            syntax_for(path),
            EsVersion::EsNext,
            StringInput::from(&*fm),
            Some(&comments as &dyn Comments),
        );
        let mut parser = Parser::new_from(lexer);
        let program = parser.parse_program().map_err(|e| PluckError {
            line: cm.lookup_char_pos(e.span().lo).line,
            message: format!("syntax error: {:?}", e.kind()),
        })?;

        let mut collector = TemplateCollector {
            identifiers: config.identifiers(),
            magic_comment: config.gql_magic_comment.trim(),
            comments: &comments,
            source_map: &cm,
            found: Vec::new(),
        };
        program.visit_with(&mut collector);
        Ok(collector.found)
    })
}

fn syntax_for(path: &Path) -> Syntax {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ts") | Some("mts") | Some("cts") => Syntax::Typescript(TsSyntax {
            decorators: true,
            ..Default::default()
        }),
        Some("tsx") => Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        }),
        _ => Syntax::Es(EsSyntax {
            jsx: true,
            decorators: true,
            ..Default::default()
        }),
    }
}

struct TemplateCollector<'a> {
    identifiers: Vec<&'a str>,
    magic_comment: &'a str,
    comments: &'a SingleThreadedComments,
    source_map: &'a SourceMap,
    found: Vec<PluckedTemplate>,
}

impl TemplateCollector<'_> {
    fn is_tag(&self, tag: &Expr) -> bool {
        match tag {
            Expr::Ident(ident) => self.identifiers.iter().any(|name| *name == &*ident.sym),
            _ => false,
        }
    }

    fn has_magic_comment(&self, pos: BytePos) -> bool {
        if self.magic_comment.is_empty() {
            return false;
        }
        self.comments
            .get_leading(pos)
            .map(|comments| {
                comments
                    .iter()
                    .any(|comment| comment.text.trim().eq_ignore_ascii_case(self.magic_comment))
            })
            .unwrap_or(false)
    }

    fn record(&mut self, at: BytePos, tpl: &Tpl) {
        let text: String = tpl.quasis.iter().map(|quasi| unescape(&quasi.raw)).collect();
        if text.trim().is_empty() {
            return;
        }
        self.found.push(PluckedTemplate {
            line: self.source_map.lookup_char_pos(at).line,
            text,
        });
    }
}

impl Visit for TemplateCollector<'_> {
    fn visit_tagged_tpl(&mut self, node: &TaggedTpl) {
        if !self.is_tag(&node.tag) {
            node.visit_children_with(self);
            return;
        }
        self.record(node.span.lo, &node.tpl);
        // Interpolations may hold templates of their own
        for expr in &node.tpl.exprs {
            (**expr).visit_with(self);
        }
    }

    fn visit_tpl(&mut self, node: &Tpl) {
        if self.has_magic_comment(node.span.lo) {
            self.record(node.span.lo, node);
        }
        node.visit_children_with(self);
    }
}

/// Resolve the escapes that matter inside a raw template chunk
fn unescape(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('`' | '$' | '\\')) => text.push(escaped),
            Some(other) => {
                text.push('\\');
                text.push(other);
            }
            None => text.push('\\'),
        }
    }
    text
}
