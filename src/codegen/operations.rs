//! `typescript-operations` plugin
//!
//! Emits a `<Name><Kind>Variables` and a `<Name><Kind>` type for every named
//! operation and a `<Name>Fragment` type for every fragment. Selection sets are
//! rendered inline, fragment spreads as intersections with the fragment type.
//! Unless `skip_typename` is set, every selection set carries an optional
//! `__typename` of its parent type.

use super::schema_types::{maybe, named_type};
use super::{pascal_case, render_type_ref, OperationKind, PluginOptions, TypeIndex};
use crate::documents::SourceDocument;
use crate::error::TypegenError;
use graphql_parser::query::{
    Definition, Field, FragmentDefinition, OperationDefinition, Selection, SelectionSet,
    TypeCondition, VariableDefinition,
};
use graphql_parser::schema::TypeDefinition;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

type Fragment = FragmentDefinition<'static, String>;
type Operation = OperationDefinition<'static, String>;
type Selections = SelectionSet<'static, String>;
type Variable = VariableDefinition<'static, String>;

pub fn render(
    index: &TypeIndex<'_>,
    documents: &[SourceDocument],
    options: &PluginOptions,
) -> Result<String, TypegenError> {
    let fragments = collect_fragments(documents)?;
    let renderer = SelectionRenderer {
        index,
        fragments: &fragments,
        skip_typename: options.skip_typename,
    };

    let mut operation_names = HashSet::new();
    let mut blocks = Vec::new();

    for source in documents {
        let located = |message: String| {
            TypegenError::Generation(format!(
                "{}:{}: {}",
                source.location.display(),
                source.line,
                message
            ))
        };

        for definition in &source.document.definitions {
            match definition {
                Definition::Operation(operation) => {
                    let (kind, name, variables, selection_set) = match operation_parts(operation) {
                        Some(parts) => parts,
                        None => continue,
                    };
                    if !operation_names.insert(name) {
                        return Err(located(format!(
                            "operation {} is defined more than once",
                            name
                        )));
                    }

                    let root = super::type_index::type_name(index.root(kind)?);
                    let type_name = format!("{}{}", pascal_case(name), kind.suffix());
                    let variables = renderer
                        .variables(variables)
                        .map_err(message_of)
                        .map_err(&located)?;
                    let result = renderer
                        .selection_set(root, selection_set, 0)
                        .map_err(message_of)
                        .map_err(&located)?;

                    let mut block = String::new();
                    let _ = writeln!(block, "export type {}Variables = {};", type_name, variables);
                    let _ = writeln!(block, "\nexport type {} = {};", type_name, result);
                    blocks.push(block);
                }
                Definition::Fragment(fragment) => {
                    let TypeCondition::On(on) = &fragment.type_condition;
                    if index.get(on).is_none() {
                        return Err(located(format!(
                            "fragment {} is declared on unknown type {}",
                            fragment.name, on
                        )));
                    }
                    let result = renderer
                        .selection_set(on, &fragment.selection_set, 0)
                        .map_err(message_of)
                        .map_err(&located)?;
                    blocks.push(format!(
                        "export type {}Fragment = {};\n",
                        pascal_case(&fragment.name),
                        result
                    ));
                }
            }
        }
    }

    Ok(blocks.join("\n"))
}

fn message_of(error: TypegenError) -> String {
    match error {
        TypegenError::Generation(message) => message,
        other => other.to_string(),
    }
}

fn collect_fragments(documents: &[SourceDocument]) -> Result<HashMap<&str, &Fragment>, TypegenError> {
    let mut fragments = HashMap::new();
    for source in documents {
        for definition in &source.document.definitions {
            if let Definition::Fragment(fragment) = definition {
                if fragments.insert(fragment.name.as_str(), fragment).is_some() {
                    return Err(TypegenError::Generation(format!(
                        "{}:{}: fragment {} is defined more than once",
                        source.location.display(),
                        source.line,
                        fragment.name
                    )));
                }
            }
        }
    }
    Ok(fragments)
}

/// Anonymous operations have no type name and are skipped
fn operation_parts(operation: &Operation) -> Option<(OperationKind, &str, &[Variable], &Selections)> {
    match operation {
        OperationDefinition::Query(query) => Some((
            OperationKind::Query,
            query.name.as_deref()?,
            query.variable_definitions.as_slice(),
            &query.selection_set,
        )),
        OperationDefinition::Mutation(mutation) => Some((
            OperationKind::Mutation,
            mutation.name.as_deref()?,
            mutation.variable_definitions.as_slice(),
            &mutation.selection_set,
        )),
        OperationDefinition::Subscription(subscription) => Some((
            OperationKind::Subscription,
            subscription.name.as_deref()?,
            subscription.variable_definitions.as_slice(),
            &subscription.selection_set,
        )),
        OperationDefinition::SelectionSet(_) => None,
    }
}

struct SelectionRenderer<'r> {
    index: &'r TypeIndex<'r>,
    fragments: &'r HashMap<&'r str, &'r Fragment>,
    skip_typename: bool,
}

/// Members of one rendered object, first selection of a response key wins
#[derive(Default)]
struct Collected {
    keys: HashSet<String>,
    fields: Vec<String>,
    intersections: Vec<String>,
}

impl<'r> SelectionRenderer<'r> {
    fn variables(&self, variables: &[Variable]) -> Result<String, TypegenError> {
        if variables.is_empty() {
            return Ok("Exact<{ [key: string]: never; }>".to_string());
        }

        let mut out = String::from("Exact<{\n");
        for variable in variables {
            let (ts, nullable) =
                render_type_ref(&variable.var_type, &maybe, &mut |name| self.input_type(name))?;
            if nullable || variable.default_value.is_some() {
                let _ = writeln!(out, "  {}?: {};", variable.name, maybe(&ts));
            } else {
                let _ = writeln!(out, "  {}: {};", variable.name, ts);
            }
        }
        out.push_str("}>");
        Ok(out)
    }

    fn input_type(&self, name: &str) -> Result<String, TypegenError> {
        if self.index.is_scalar(name) || self.index.get(name).is_some() {
            Ok(named_type(self.index, name))
        } else {
            Err(TypegenError::Generation(format!("unknown type {}", name)))
        }
    }

    fn selection_set(
        &self,
        parent: &str,
        set: &Selections,
        depth: usize,
    ) -> Result<String, TypegenError> {
        let mut collected = Collected::default();
        self.collect(parent, set, depth, &mut collected)?;
        if !self.skip_typename && !collected.keys.contains("__typename") {
            collected
                .fields
                .insert(0, format!("__typename?: {};", self.typename_literal(parent)));
        }

        let indent = "  ".repeat(depth);
        let mut parts = Vec::new();
        if !collected.fields.is_empty() {
            let mut object = String::from("{\n");
            for line in &collected.fields {
                let _ = writeln!(object, "{}  {}", indent, line);
            }
            object.push_str(&indent);
            object.push('}');
            parts.push(object);
        } else if collected.intersections.is_empty() {
            parts.push("{}".to_string());
        }
        parts.extend(collected.intersections);

        Ok(parts.join(" & "))
    }

    fn collect(
        &self,
        parent: &str,
        set: &Selections,
        depth: usize,
        out: &mut Collected,
    ) -> Result<(), TypegenError> {
        for selection in &set.items {
            match selection {
                Selection::Field(field) => {
                    let key = field.alias.as_deref().unwrap_or(&field.name);
                    if out.keys.insert(key.to_string()) {
                        out.fields.push(self.field(parent, field, key, depth)?);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !self.fragments.contains_key(spread.fragment_name.as_str()) {
                        return Err(TypegenError::Generation(format!(
                            "unknown fragment {}",
                            spread.fragment_name
                        )));
                    }
                    let name = format!("{}Fragment", pascal_case(&spread.fragment_name));
                    if !out.intersections.contains(&name) {
                        out.intersections.push(name);
                    }
                }
                Selection::InlineFragment(inline) => match &inline.type_condition {
                    Some(TypeCondition::On(on)) if on != parent => {
                        if self.index.get(on).is_none() {
                            return Err(TypegenError::Generation(format!(
                                "inline fragment on unknown type {}",
                                on
                            )));
                        }
                        let alternative = self.selection_set(on, &inline.selection_set, depth)?;
                        out.intersections.push(format!("({} | {{}})", alternative));
                    }
                    _ => self.collect(parent, &inline.selection_set, depth, out)?,
                },
            }
        }
        Ok(())
    }

    fn field(
        &self,
        parent: &str,
        field: &Field<'static, String>,
        key: &str,
        depth: usize,
    ) -> Result<String, TypegenError> {
        if field.name == "__typename" {
            return Ok(format!("{}: {};", key, self.typename_literal(parent)));
        }

        let definition = self.index.field(parent, &field.name).ok_or_else(|| {
            TypegenError::Generation(format!(
                "Cannot query field \"{}\" on type \"{}\"",
                field.name, parent
            ))
        })?;

        let (ts, nullable) = render_type_ref(&definition.field_type, &maybe, &mut |name| {
            self.output_type(name, &field.selection_set, depth + 1)
        })?;

        Ok(if nullable {
            format!("{}?: {};", key, maybe(&ts))
        } else {
            format!("{}: {};", key, ts)
        })
    }

    /// String literal type of `__typename` on `parent`
    fn typename_literal(&self, parent: &str) -> String {
        if !self.index.is_abstract(parent) {
            return format!("'{}'", parent);
        }
        let possible = self.index.possible_types(parent);
        if possible.is_empty() {
            return "never".to_string();
        }
        possible
            .iter()
            .map(|name| format!("'{}'", name))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn output_type(
        &self,
        name: &str,
        set: &Selections,
        depth: usize,
    ) -> Result<String, TypegenError> {
        if self.index.is_scalar(name) {
            return Ok(named_type(self.index, name));
        }
        match self.index.get(name) {
            Some(TypeDefinition::Enum(_)) => Ok(name.to_string()),
            Some(TypeDefinition::Object(_))
            | Some(TypeDefinition::Interface(_))
            | Some(TypeDefinition::Union(_)) => {
                if set.items.is_empty() {
                    return Err(TypegenError::Generation(format!(
                        "field of type {} must have a selection of subfields",
                        name
                    )));
                }
                self.selection_set(name, set, depth)
            }
            _ => Err(TypegenError::Generation(format!(
                "type {} cannot be selected",
                name
            ))),
        }
    }
}
