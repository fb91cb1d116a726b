//! Name-indexed view over a schema document

use crate::error::TypegenError;
use crate::schema::SchemaDocument;
use graphql_parser::schema::{Definition, Field, TypeDefinition};
use std::collections::HashMap;

pub type SchemaType = TypeDefinition<'static, String>;
pub type SchemaField = Field<'static, String>;

pub const BUILTIN_SCALARS: [(&str, &str); 5] = [
    ("ID", "string"),
    ("String", "string"),
    ("Boolean", "boolean"),
    ("Int", "number"),
    ("Float", "number"),
];

/// Root operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

pub struct TypeIndex<'a> {
    ordered: Vec<&'a SchemaType>,
    by_name: HashMap<&'a str, &'a SchemaType>,
    query: String,
    mutation: String,
    subscription: String,
}

impl<'a> TypeIndex<'a> {
    pub fn new(document: &'a SchemaDocument) -> Result<Self, TypegenError> {
        let mut ordered = Vec::new();
        let mut by_name = HashMap::new();
        let mut query = "Query".to_string();
        let mut mutation = "Mutation".to_string();
        let mut subscription = "Subscription".to_string();

        for definition in &document.definitions {
            match definition {
                Definition::TypeDefinition(ty) => {
                    if by_name.insert(type_name(ty), ty).is_some() {
                        return Err(TypegenError::Generation(format!(
                            "type {} is defined more than once",
                            type_name(ty)
                        )));
                    }
                    ordered.push(ty);
                }
                Definition::SchemaDefinition(schema) => {
                    if let Some(name) = &schema.query {
                        query = name.clone();
                    }
                    if let Some(name) = &schema.mutation {
                        mutation = name.clone();
                    }
                    if let Some(name) = &schema.subscription {
                        subscription = name.clone();
                    }
                }
                Definition::TypeExtension(_) | Definition::DirectiveDefinition(_) => {}
            }
        }

        Ok(Self {
            ordered,
            by_name,
            query,
            mutation,
            subscription,
        })
    }

    /// Type definitions in document order
    pub fn types(&self) -> &[&'a SchemaType] {
        &self.ordered
    }

    pub fn get(&self, name: &str) -> Option<&'a SchemaType> {
        self.by_name.get(name).copied()
    }

    pub fn root(&self, kind: OperationKind) -> Result<&'a SchemaType, TypegenError> {
        let name = match kind {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
            OperationKind::Subscription => &self.subscription,
        };
        self.get(name).ok_or_else(|| {
            TypegenError::Generation(format!("schema has no {} root type {}", kind.suffix(), name))
        })
    }

    /// Field definition on an object or interface type
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&'a SchemaField> {
        match self.get(type_name)? {
            TypeDefinition::Object(object) => object.fields.iter().find(|f| f.name == field_name),
            TypeDefinition::Interface(interface) => {
                interface.fields.iter().find(|f| f.name == field_name)
            }
            _ => None,
        }
    }

    pub fn is_scalar(&self, name: &str) -> bool {
        BUILTIN_SCALARS.iter().any(|(scalar, _)| *scalar == name)
            || matches!(self.get(name), Some(TypeDefinition::Scalar(_)))
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        matches!(
            self.get(name),
            Some(TypeDefinition::Union(_)) | Some(TypeDefinition::Interface(_))
        )
    }

    /// Concrete object types a value of `name` can have
    pub fn possible_types(&self, name: &str) -> Vec<&'a str> {
        match self.get(name) {
            Some(TypeDefinition::Union(union)) => union.types.iter().map(String::as_str).collect(),
            Some(TypeDefinition::Interface(_)) => self
                .ordered
                .iter()
                .filter_map(|ty| match ty {
                    TypeDefinition::Object(object)
                        if object.implements_interfaces.iter().any(|i| i == name) =>
                    {
                        Some(object.name.as_str())
                    }
                    _ => None,
                })
                .collect(),
            Some(TypeDefinition::Object(object)) => vec![object.name.as_str()],
            _ => Vec::new(),
        }
    }

    /// Custom scalars declared by the schema, in document order
    pub fn custom_scalars(&self) -> Vec<&'a str> {
        self.ordered
            .iter()
            .filter_map(|ty| match ty {
                TypeDefinition::Scalar(scalar)
                    if !BUILTIN_SCALARS.iter().any(|(b, _)| *b == scalar.name) =>
                {
                    Some(scalar.name.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

pub fn type_name<'b>(ty: &'b SchemaType) -> &'b str {
    match ty {
        TypeDefinition::Scalar(t) => &t.name,
        TypeDefinition::Object(t) => &t.name,
        TypeDefinition::Interface(t) => &t.name,
        TypeDefinition::Union(t) => &t.name,
        TypeDefinition::Enum(t) => &t.name,
        TypeDefinition::InputObject(t) => &t.name,
    }
}
