//! Introspection result → SDL conversion

use crate::error::TypegenError;
use serde::Deserialize;
use std::fmt::Write;

/// Standard introspection query sent to remote endpoints
pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
  }
}

fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    description
    isDeprecated
    deprecationReason
  }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType { kind name }
            }
          }
        }
      }
    }
  }
}
"#;

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionSchema {
    query_type: Option<NamedRef>,
    mutation_type: Option<NamedRef>,
    subscription_type: Option<NamedRef>,
    types: Vec<FullType>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullType {
    kind: TypeKind,
    name: String,
    description: Option<String>,
    fields: Option<Vec<FieldDef>>,
    input_fields: Option<Vec<InputValueDef>>,
    interfaces: Option<Vec<TypeRef>>,
    enum_values: Option<Vec<EnumValueDef>>,
    possible_types: Option<Vec<TypeRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDef {
    name: String,
    description: Option<String>,
    #[serde(default)]
    args: Vec<InputValueDef>,
    #[serde(rename = "type")]
    ty: TypeRef,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputValueDef {
    name: String,
    description: Option<String>,
    #[serde(rename = "type")]
    ty: TypeRef,
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnumValueDef {
    name: String,
    description: Option<String>,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeRef {
    kind: TypeKind,
    name: Option<String>,
    of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    fn render(&self) -> Result<String, TypegenError> {
        match self.kind {
            TypeKind::NonNull => Ok(format!("{}!", self.inner()?.render()?)),
            TypeKind::List => Ok(format!("[{}]", self.inner()?.render()?)),
            _ => self
                .name
                .clone()
                .ok_or_else(|| TypegenError::SchemaParse("named type reference without a name".to_string())),
        }
    }

    fn inner(&self) -> Result<&TypeRef, TypegenError> {
        self.of_type
            .as_deref()
            .ok_or_else(|| TypegenError::SchemaParse("wrapping type without ofType".to_string()))
    }
}

/// Convert an introspection result (with or without the `data` envelope) to SDL
pub fn introspection_to_sdl(value: &serde_json::Value) -> Result<String, TypegenError> {
    let schema_value = value
        .get("data")
        .unwrap_or(value)
        .get("__schema")
        .ok_or_else(|| TypegenError::SchemaParse("introspection result has no __schema".to_string()))?;
    let schema: IntrospectionSchema = serde_json::from_value(schema_value.clone())
        .map_err(|e| TypegenError::SchemaParse(format!("malformed introspection result: {}", e)))?;

    let mut out = String::new();
    write_schema_definition(&mut out, &schema);

    for ty in &schema.types {
        if ty.name.starts_with("__") {
            continue;
        }
        if ty.kind == TypeKind::Scalar && BUILTIN_SCALARS.contains(&ty.name.as_str()) {
            continue;
        }
        write_description(&mut out, ty.description.as_deref(), "");
        match ty.kind {
            TypeKind::Scalar => {
                let _ = writeln!(out, "scalar {}", ty.name);
            }
            TypeKind::Object | TypeKind::Interface => {
                let keyword = if ty.kind == TypeKind::Object { "type" } else { "interface" };
                let _ = write!(out, "{} {}", keyword, ty.name);
                let interfaces = ty.interfaces.as_deref().unwrap_or_default();
                if !interfaces.is_empty() {
                    let names = interfaces
                        .iter()
                        .map(TypeRef::render)
                        .collect::<Result<Vec<_>, _>>()?;
                    let _ = write!(out, " implements {}", names.join(" & "));
                }
                write_fields(&mut out, ty.fields.as_deref().unwrap_or_default())?;
            }
            TypeKind::Union => {
                let members = ty
                    .possible_types
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(TypeRef::render)
                    .collect::<Result<Vec<_>, _>>()?;
                let _ = writeln!(out, "union {} = {}", ty.name, members.join(" | "));
            }
            TypeKind::Enum => {
                let _ = writeln!(out, "enum {} {{", ty.name);
                for value in ty.enum_values.as_deref().unwrap_or_default() {
                    write_description(&mut out, value.description.as_deref(), "  ");
                    let _ = write!(out, "  {}", value.name);
                    write_deprecation(&mut out, value.is_deprecated, value.deprecation_reason.as_deref());
                    out.push('\n');
                }
                out.push_str("}\n");
            }
            TypeKind::InputObject => {
                let _ = writeln!(out, "input {} {{", ty.name);
                for field in ty.input_fields.as_deref().unwrap_or_default() {
                    write_description(&mut out, field.description.as_deref(), "  ");
                    let _ = writeln!(out, "  {}", render_input_value(field)?);
                }
                out.push_str("}\n");
            }
            TypeKind::List | TypeKind::NonNull => {
                return Err(TypegenError::SchemaParse(format!(
                    "wrapping type kind declared as top-level type {}",
                    ty.name
                )));
            }
        }
        out.push('\n');
    }

    Ok(out)
}

fn write_schema_definition(out: &mut String, schema: &IntrospectionSchema) {
    let roots = [
        ("query", &schema.query_type),
        ("mutation", &schema.mutation_type),
        ("subscription", &schema.subscription_type),
    ];
    if roots.iter().all(|(_, r)| r.is_none()) {
        return;
    }
    out.push_str("schema {\n");
    for (operation, root) in roots {
        if let Some(root) = root {
            let _ = writeln!(out, "  {}: {}", operation, root.name);
        }
    }
    out.push_str("}\n\n");
}

fn write_fields(out: &mut String, fields: &[FieldDef]) -> Result<(), TypegenError> {
    if fields.is_empty() {
        out.push('\n');
        return Ok(());
    }
    out.push_str(" {\n");
    for field in fields {
        write_description(out, field.description.as_deref(), "  ");
        let _ = write!(out, "  {}", field.name);
        if !field.args.is_empty() {
            let args = field
                .args
                .iter()
                .map(render_input_value)
                .collect::<Result<Vec<_>, _>>()?;
            let _ = write!(out, "({})", args.join(", "));
        }
        let _ = write!(out, ": {}", field.ty.render()?);
        write_deprecation(out, field.is_deprecated, field.deprecation_reason.as_deref());
        out.push('\n');
    }
    out.push_str("}\n");
    Ok(())
}

fn render_input_value(value: &InputValueDef) -> Result<String, TypegenError> {
    let mut rendered = format!("{}: {}", value.name, value.ty.render()?);
    if let Some(default) = &value.default_value {
        let _ = write!(rendered, " = {}", default);
    }
    Ok(rendered)
}

fn write_deprecation(out: &mut String, deprecated: bool, reason: Option<&str>) {
    if !deprecated {
        return;
    }
    match reason {
        Some(reason) => {
            let _ = write!(out, " @deprecated(reason: {})", quote(reason));
        }
        None => out.push_str(" @deprecated"),
    }
}

fn write_description(out: &mut String, description: Option<&str>, indent: &str) {
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "{}{}", indent, quote(description));
    }
}

fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
