//! TypeScript code generation
//!
//! [`CodeGenerator`] is the seam the generation pipeline calls. The bundled
//! [`TypeScriptGenerator`] runs a chain of plugins over the schema and the loaded
//! documents and concatenates their output:
//!
//! - `typescript`: schema types, scalars map and helper aliases
//! - `typescript-operations`: variables and result types for named operations
//!   and fragments

use crate::documents::SourceDocument;
use crate::error::TypegenError;
use crate::schema::SchemaDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub mod operations;
pub mod schema_types;
mod type_index;

pub use type_index::{OperationKind, TypeIndex};

/// Plugins bundled with the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodegenPluginKind {
    #[serde(rename = "typescript")]
    Typescript,
    #[serde(rename = "typescript-operations")]
    TypescriptOperations,
}

impl CodegenPluginKind {
    pub fn name(&self) -> &'static str {
        match self {
            CodegenPluginKind::Typescript => "typescript",
            CodegenPluginKind::TypescriptOperations => "typescript-operations",
        }
    }
}

/// Plugin options; unset fields fall back to the next layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_typename: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enums_as_types: Option<bool>,

    /// Template for nullable values, `T` is replaced by the wrapped type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maybe_value: Option<String>,

    /// Custom scalar name → TypeScript type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scalars: BTreeMap<String, String>,
}

impl CodegenConfig {
    /// Layer `self` over `base`: set fields in `self` win, scalar maps merge
    pub fn merged_over(&self, base: &CodegenConfig) -> CodegenConfig {
        let mut scalars = base.scalars.clone();
        scalars.extend(self.scalars.clone());
        CodegenConfig {
            skip_typename: self.skip_typename.or(base.skip_typename),
            enums_as_types: self.enums_as_types.or(base.enums_as_types),
            maybe_value: self.maybe_value.clone().or_else(|| base.maybe_value.clone()),
            scalars,
        }
    }

    pub fn resolve(&self) -> PluginOptions {
        PluginOptions {
            skip_typename: self.skip_typename.unwrap_or(true),
            enums_as_types: self.enums_as_types.unwrap_or(true),
            maybe_value: self
                .maybe_value
                .clone()
                .unwrap_or_else(|| "T | null".to_string()),
            scalars: self.scalars.clone(),
        }
    }
}

/// Extra plugin entry from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenPluginSpec {
    pub resolve: CodegenPluginKind,
    #[serde(default)]
    pub options: CodegenConfig,
}

/// Fully resolved options handed to a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    pub skip_typename: bool,
    pub enums_as_types: bool,
    pub maybe_value: String,
    pub scalars: BTreeMap<String, String>,
}

/// One plugin run in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInvocation {
    pub kind: CodegenPluginKind,
    pub options: PluginOptions,
}

/// Build the plugin chain: the built-in `typescript` and `typescript-operations`
/// plugins first, then any extra plugins not already present. Options of an extra
/// entry naming a built-in plugin are layered over that plugin's options.
pub fn plugin_chain(extra: &[CodegenPluginSpec], config: &CodegenConfig) -> Vec<PluginInvocation> {
    let mut chain: Vec<(CodegenPluginKind, CodegenConfig)> = vec![
        (CodegenPluginKind::Typescript, config.clone()),
        (CodegenPluginKind::TypescriptOperations, config.clone()),
    ];

    for spec in extra {
        match chain.iter_mut().find(|(kind, _)| *kind == spec.resolve) {
            Some((_, options)) => *options = spec.options.merged_over(options),
            None => chain.push((spec.resolve, spec.options.merged_over(config))),
        }
    }

    chain
        .into_iter()
        .map(|(kind, options)| PluginInvocation {
            kind,
            options: options.resolve(),
        })
        .collect()
}

/// Everything a generator needs for one artifact
pub struct GenerationInput<'a> {
    pub filename: &'a Path,
    pub schema: &'a SchemaDocument,
    pub documents: &'a [SourceDocument],
    pub plugins: &'a [PluginInvocation],
}

/// Produces the artifact text for one schema configuration
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, input: &GenerationInput<'_>) -> Result<String, TypegenError>;
}

/// Bundled TypeScript generator
#[derive(Debug, Clone, Default)]
pub struct TypeScriptGenerator;

impl TypeScriptGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeGenerator for TypeScriptGenerator {
    fn generate(&self, input: &GenerationInput<'_>) -> Result<String, TypegenError> {
        let index = TypeIndex::new(input.schema)?;
        let mut sections = Vec::with_capacity(input.plugins.len());

        for plugin in input.plugins {
            let section = match plugin.kind {
                CodegenPluginKind::Typescript => schema_types::render(&index, &plugin.options),
                CodegenPluginKind::TypescriptOperations => {
                    operations::render(&index, input.documents, &plugin.options).map_err(|e| {
                        TypegenError::Generation(format!(
                            "{} ({}): {}",
                            plugin.kind.name(),
                            input.filename.display(),
                            match e {
                                TypegenError::Generation(message) => message,
                                other => other.to_string(),
                            }
                        ))
                    })?
                }
            };
            if !section.is_empty() {
                sections.push(section);
            }
        }

        Ok(sections.join("\n"))
    }
}

/// Render a GraphQL type reference with `named` producing the innermost type
pub(crate) fn render_type_ref(
    ty: &graphql_parser::query::Type<'static, String>,
    maybe: &dyn Fn(&str) -> String,
    named: &mut dyn FnMut(&str) -> Result<String, TypegenError>,
) -> Result<(String, bool), TypegenError> {
    use graphql_parser::query::Type;

    fn non_null(
        ty: &Type<'static, String>,
        maybe: &dyn Fn(&str) -> String,
        named: &mut dyn FnMut(&str) -> Result<String, TypegenError>,
    ) -> Result<String, TypegenError> {
        match ty {
            Type::NamedType(name) => named(name.as_str()),
            Type::ListType(inner) => {
                let (rendered, nullable) = render_type_ref(inner, maybe, named)?;
                let item = if nullable { maybe(rendered.as_str()) } else { rendered };
                Ok(format!("Array<{}>", item))
            }
            Type::NonNullType(inner) => non_null(inner, maybe, named),
        }
    }

    match ty {
        Type::NonNullType(inner) => Ok((non_null(inner, maybe, named)?, false)),
        other => Ok((non_null(other, maybe, named)?, true)),
    }
}

/// Uppercase the first character
pub(crate) fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// JSDoc comment for a description, indented
pub(crate) fn doc_comment(description: Option<&str>, indent: &str) -> String {
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) if description.contains('\n') => {
            let mut out = format!("{}/**\n", indent);
            for line in description.lines() {
                out.push_str(&format!("{} * {}\n", indent, line.trim_end()));
            }
            out.push_str(&format!("{} */\n", indent));
            out
        }
        Some(description) => format!("{}/** {} */\n", indent, description),
        None => String::new(),
    }
}
