//! Context-variable schemas (`contextDefinition`).
//!
//! A schema is authored as an object literal next to each function group.
//! `validate_context_definition` is the only way in: it checks the authored
//! JSON and hands back the typed [`ContextSchema`], so everything after it can
//! assume every entry has a description and never pairs `required: true` with
//! a `default`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CompileError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextVariable {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    /// Authored fields this compiler does not interpret, kept for the template.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContextVariable {
    pub fn new(description: &str) -> Self {
        ContextVariable {
            description: description.to_string(),
            required: None,
            default: None,
            encrypted: None,
            extra: Map::new(),
        }
    }

    /// Shared variables must agree on these three fields. An absent
    /// `required` is not the same as `required: false`.
    pub fn same_definition(&self, other: &ContextVariable) -> bool {
        self.description == other.description
            && self.required == other.required
            && self.default == other.default
    }
}

/// Variable name -> definition, in authoring order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSchema {
    variables: IndexMap<String, ContextVariable>,
}

impl ContextSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, variable: ContextVariable) {
        self.variables.insert(name.to_string(), variable);
    }

    pub fn get(&self, name: &str) -> Option<&ContextVariable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextVariable)> {
        self.variables.iter()
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn definition_error(message: String) -> CompileError {
    CompileError::ContextDefinition(message)
}

/// Checks an authored `contextDefinition`. `None` is an empty schema.
///
/// Rules, first failure wins:
/// 1. the schema is an object
/// 2. every value is an object
/// 3. every value has a non-empty `description`
/// 4. no value has both `required: true` and a `default`
pub fn validate_context_definition(raw: Option<&Value>) -> Result<ContextSchema> {
    let entries = match raw {
        None | Some(Value::Null) => return Ok(ContextSchema::new()),
        Some(Value::Object(entries)) => entries,
        Some(_) => {
            return Err(definition_error(
                "contextDefinition must be an object".to_string(),
            ))
        }
    };

    if let Some(key) = entries.keys().find(|key| !entries[key.as_str()].is_object()) {
        return Err(definition_error(format!(
            "contextDefinition.{}: value must be an object",
            key
        )));
    }

    let mut schema = ContextSchema::new();
    for (key, value) in entries {
        let has_description = value
            .get("description")
            .and_then(Value::as_str)
            .is_some_and(|description| !description.is_empty());
        if !has_description {
            return Err(definition_error(format!(
                "contextDefinition.{}: description required",
                key
            )));
        }

        let required = value.get("required").and_then(Value::as_bool) == Some(true);
        let has_default = value.get("default").is_some_and(|d| !d.is_null());
        if required && has_default {
            return Err(definition_error(format!(
                "contextDefinition.{}: default not needed if required is true",
                key
            )));
        }

        let variable: ContextVariable = serde_json::from_value(value.clone()).map_err(|e| {
            definition_error(format!("contextDefinition.{}: {}", key, e))
        })?;
        schema.insert(key, variable);
    }

    Ok(schema)
}

/// Fails on the first shared variable (by name order) whose definitions differ.
/// Argument order does not change the verdict.
pub fn check_conflicting_definitions(a: &ContextSchema, b: &ContextSchema) -> Result<()> {
    let mut shared: Vec<&String> = a.variables.keys().filter(|key| b.contains(key)).collect();
    shared.sort();

    for key in shared {
        let (left, right) = (&a.variables[key.as_str()], &b.variables[key.as_str()]);
        if !left.same_definition(right) {
            return Err(CompileError::ConflictingContext {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}
