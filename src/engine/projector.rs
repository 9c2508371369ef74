use serde_json::{Map, Value as Json};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use thiserror::Error;

/// Dotted field path → string value.
pub type ProjectedFields = BTreeMap<String, String>;

/// Errors that make a document impossible to validate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("document must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("field {path} has unsupported type {kind}")]
    UnsupportedType { path: String, kind: &'static str },

    #[error("duplicated field name {0}")]
    DuplicateField(String),
}

/// Flatten a nested document into dotted paths.
///
/// String leaves are recorded, objects are descended into with `key.`
/// appended to the prefix, and lists descend into their object elements
/// with the list's own prefix (indices are not encoded). Other list
/// elements are skipped. Numbers, booleans and nulls are rejected.
pub fn project(document: &Json) -> Result<ProjectedFields, ProjectionError> {
    let object = document
        .as_object()
        .ok_or_else(|| ProjectionError::NotAnObject(kind_of(document)))?;

    let mut fields = ProjectedFields::new();
    project_object(object, "", &mut fields)?;
    Ok(fields)
}

fn project_object(
    object: &Map<String, Json>,
    prefix: &str,
    fields: &mut ProjectedFields,
) -> Result<(), ProjectionError> {
    for (key, value) in object {
        let path = format!("{}{}", prefix, key);

        match value {
            Json::String(s) => match fields.entry(path) {
                Entry::Occupied(e) => return Err(ProjectionError::DuplicateField(e.key().clone())),
                Entry::Vacant(e) => {
                    e.insert(s.clone());
                }
            },
            Json::Object(nested) => {
                project_object(nested, &format!("{}.", path), fields)?;
            }
            Json::Array(items) => {
                let nested_prefix = format!("{}.", path);
                for nested in items.iter().filter_map(Json::as_object) {
                    project_object(nested, &nested_prefix, fields)?;
                }
            }
            other => {
                return Err(ProjectionError::UnsupportedType {
                    path,
                    kind: kind_of(other),
                })
            }
        }
    }

    Ok(())
}

fn kind_of(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
