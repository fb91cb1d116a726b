//! `typescript` plugin: one TypeScript declaration per schema type

use super::type_index::{SchemaField, BUILTIN_SCALARS};
use super::{doc_comment, pascal_case, render_type_ref, PluginOptions, TypeIndex};
use crate::error::TypegenError;
use graphql_parser::schema::{InputValue, TypeDefinition};
use std::fmt::Write;

/// Wrap a type in the `Maybe` alias
pub(crate) fn maybe(inner: &str) -> String {
    format!("Maybe<{}>", inner)
}

/// TypeScript name for a named input/output type reference
pub(crate) fn named_type(index: &TypeIndex<'_>, name: &str) -> String {
    if index.is_scalar(name) {
        format!("Scalars['{}']", name)
    } else {
        name.to_string()
    }
}

pub fn render(index: &TypeIndex<'_>, options: &PluginOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "export type Maybe<T> = {};", options.maybe_value);
    out.push_str(
        "export type Exact<T extends { [key: string]: unknown }> = { [K in keyof T]: T[K] };\n",
    );
    out.push_str("/** All built-in and custom scalars, mapped to their actual values */\n");
    out.push_str("export type Scalars = {\n");
    for (scalar, ts) in BUILTIN_SCALARS {
        let ts = options.scalars.get(scalar).map(String::as_str).unwrap_or(ts);
        let _ = writeln!(out, "  {}: {};", scalar, ts);
    }
    for scalar in index.custom_scalars() {
        let ts = options.scalars.get(scalar).map(String::as_str).unwrap_or("any");
        let _ = writeln!(out, "  {}: {};", scalar, ts);
    }
    out.push_str("};\n");

    for ty in index.types() {
        let rendered = match ty {
            TypeDefinition::Scalar(_) => continue,
            TypeDefinition::Object(object) => render_fields(
                index,
                options,
                &object.name,
                object.description.as_deref(),
                &object.fields,
                true,
            ),
            TypeDefinition::Interface(interface) => render_fields(
                index,
                options,
                &interface.name,
                interface.description.as_deref(),
                &interface.fields,
                false,
            ),
            TypeDefinition::InputObject(input) => {
                let mut block = doc_comment(input.description.as_deref(), "");
                let _ = writeln!(block, "export type {} = {{", input.name);
                for field in &input.fields {
                    block.push_str(&render_input_value(index, field, "  "));
                }
                block.push_str("};\n");
                block
            }
            TypeDefinition::Enum(enumeration) => {
                let mut block = doc_comment(enumeration.description.as_deref(), "");
                if options.enums_as_types {
                    let _ = write!(block, "export type {} =", enumeration.name);
                    for value in &enumeration.values {
                        let _ = write!(block, "\n  | '{}'", value.name);
                    }
                    if enumeration.values.is_empty() {
                        block.push_str(" never");
                    }
                    block.push_str(";\n");
                } else {
                    let _ = writeln!(block, "export enum {} {{", enumeration.name);
                    for value in &enumeration.values {
                        block.push_str(&doc_comment(value.description.as_deref(), "  "));
                        let _ = writeln!(block, "  {} = '{}',", value.name, value.name);
                    }
                    block.push_str("}\n");
                }
                block
            }
            TypeDefinition::Union(union) => {
                let mut block = doc_comment(union.description.as_deref(), "");
                let members = if union.types.is_empty() {
                    "never".to_string()
                } else {
                    union.types.join(" | ")
                };
                let _ = writeln!(block, "export type {} = {};", union.name, members);
                block
            }
        };
        out.push('\n');
        out.push_str(&rendered);
    }

    out
}

fn render_fields(
    index: &TypeIndex<'_>,
    options: &PluginOptions,
    name: &str,
    description: Option<&str>,
    fields: &[SchemaField],
    concrete: bool,
) -> String {
    let mut block = doc_comment(description, "");
    let _ = writeln!(block, "export type {} = {{", name);
    if concrete && !options.skip_typename {
        let _ = writeln!(block, "  __typename?: '{}';", name);
    }
    for field in fields {
        block.push_str(&doc_comment(field.description.as_deref(), "  "));
        let (ts, nullable) = output_type(index, &field.field_type);
        if nullable {
            let _ = writeln!(block, "  {}?: {};", field.name, maybe(&ts));
        } else {
            let _ = writeln!(block, "  {}: {};", field.name, ts);
        }
    }
    block.push_str("};\n");

    for field in fields.iter().filter(|f| !f.arguments.is_empty()) {
        let _ = writeln!(
            block,
            "\nexport type {}{}Args = {{",
            name,
            pascal_case(&field.name)
        );
        for argument in &field.arguments {
            block.push_str(&render_input_value(index, argument, "  "));
        }
        block.push_str("};\n");
    }

    block
}

fn render_input_value(
    index: &TypeIndex<'_>,
    value: &InputValue<'static, String>,
    indent: &str,
) -> String {
    let mut line = doc_comment(value.description.as_deref(), indent);
    let (ts, nullable) = output_type(index, &value.value_type);
    if nullable || value.default_value.is_some() {
        let _ = writeln!(line, "{}{}?: {};", indent, value.name, maybe(&ts));
    } else {
        let _ = writeln!(line, "{}{}: {};", indent, value.name, ts);
    }
    line
}

/// Render a schema type reference; the flag tells whether the outer type is nullable
pub(crate) fn output_type(
    index: &TypeIndex<'_>,
    ty: &graphql_parser::schema::Type<'static, String>,
) -> (String, bool) {
    let result: Result<(String, bool), TypegenError> =
        render_type_ref(ty, &maybe, &mut |name| Ok(named_type(index, name)));
    // Named rendering above never fails
    result.unwrap_or_else(|_| ("any".to_string(), true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{CodegenConfig, PluginOptions};
    use crate::schema::SchemaSnapshot;
    use std::collections::BTreeMap;

    const SDL: &str = r#"
scalar Date

"A blog post"
type Post implements Node {
  id: ID!
  title: String
  tags: [String!]!
  published(format: String, fromNow: Boolean = false): Date
  status: Status!
}

interface Node {
  id: ID!
}

enum Status {
  DRAFT
  PUBLISHED
}

union SearchResult = Post | Page

type Page {
  slug: String!
}

input PostFilter {
  status: Status
  ids: [ID!]
}
"#;

    fn options() -> PluginOptions {
        CodegenConfig::default().resolve()
    }

    fn rendered(options: &PluginOptions) -> String {
        let snapshot = SchemaSnapshot::from_sdl("test", SDL).unwrap();
        let index = TypeIndex::new(snapshot.document()).unwrap();
        render(&index, options)
    }

    #[test]
    fn test_scalars_map_includes_custom_scalars() {
        let output = rendered(&options());
        assert!(output.contains("export type Scalars = {\n  ID: string;\n  String: string;\n  Boolean: boolean;\n  Int: number;\n  Float: number;\n  Date: any;\n};"));
    }

    #[test]
    fn test_object_type_fields_and_args() {
        let output = rendered(&options());
        assert!(output.contains("/** A blog post */\nexport type Post = {\n  id: Scalars['ID'];\n  title?: Maybe<Scalars['String']>;\n  tags: Array<Scalars['String']>;\n  published?: Maybe<Scalars['Date']>;\n  status: Status;\n};"));
        assert!(output.contains("export type PostPublishedArgs = {\n  format?: Maybe<Scalars['String']>;\n  fromNow?: Maybe<Scalars['Boolean']>;\n};"));
    }

    #[test]
    fn test_enums_unions_and_inputs() {
        let output = rendered(&options());
        assert!(output.contains("export type Status =\n  | 'DRAFT'\n  | 'PUBLISHED';"));
        assert!(output.contains("export type SearchResult = Post | Page;"));
        assert!(output.contains("export type PostFilter = {\n  status?: Maybe<Status>;\n  ids?: Maybe<Array<Scalars['ID']>>;\n};"));
    }

    #[test]
    fn test_enum_declarations_and_typename_when_configured() {
        let options = CodegenConfig {
            skip_typename: Some(false),
            enums_as_types: Some(false),
            scalars: BTreeMap::from([("Date".to_string(), "string".to_string())]),
            ..CodegenConfig::default()
        }
        .resolve();
        let output = rendered(&options);
        assert!(output.contains("export enum Status {\n  DRAFT = 'DRAFT',\n  PUBLISHED = 'PUBLISHED',\n}"));
        assert!(output.contains("export type Page = {\n  __typename?: 'Page';\n"));
        assert!(output.contains("export type Node = {\n  id: Scalars['ID'];\n};"));
        assert!(output.contains("  Date: string;\n"));
    }
}
