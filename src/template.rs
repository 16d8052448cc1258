//! The template document a build writes into.
//!
//! The file pre-exists the build and may carry fields this compiler knows
//! nothing about. Only `transform`, `contextDefinition` and parts of
//! `connection` are touched; key order is kept (`serde_json` with
//! `preserve_order`).

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::context::ContextSchema;
use crate::error::{CompileError, Result};

pub const CONNECTION_KEY: &str = "connection";
pub const CONTEXT_DEFINITION_KEY: &str = "contextDefinition";
pub const TRANSFORM_KEY: &str = "transform";

/// How the collector builds its request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A static URL, possibly with `{{var}}` substitutions.
    Url(String),
    /// A compiled function body returning the URL.
    ToUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDocument {
    root: Map<String, Value>,
}

impl TemplateDocument {
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading template");
        let data = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&data)?;
        Self::from_value(value).map_err(|_| {
            CompileError::Template(format!("{} must contain a JSON object", path.display()))
        })
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(TemplateDocument { root }),
            _ => Err(CompileError::Template(
                "template must be a JSON object".to_string(),
            )),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    /// Two-space indentation and a trailing newline.
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.root)?;
        text.push('\n');
        Ok(text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_pretty_string()?)?;
        debug!(path = %path.display(), "wrote template");
        Ok(())
    }

    /// The object under `key`, created empty when absent.
    fn section_mut(&mut self, key: &str) -> Result<&mut Map<String, Value>> {
        let section = self
            .root
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        section
            .as_object_mut()
            .ok_or_else(|| CompileError::Template(format!("\"{}\" must be an object", key)))
    }

    /// Makes sure `connection` and `contextDefinition` exist.
    pub fn materialize_sections(&mut self) -> Result<()> {
        self.section_mut(CONNECTION_KEY)?;
        self.section_mut(CONTEXT_DEFINITION_KEY)?;
        Ok(())
    }

    /// Replaces `transform` wholesale.
    pub fn set_transform(
        &mut self,
        default: Option<String>,
        error_handlers: &IndexMap<String, String>,
    ) {
        let mut transform = Map::new();
        if let Some(body) = default {
            transform.insert("default".to_string(), Value::String(body));
        }
        let handlers: Map<String, Value> = error_handlers
            .iter()
            .map(|(key, body)| (key.clone(), Value::String(body.clone())))
            .collect();
        transform.insert("errorHandlers".to_string(), Value::Object(handlers));
        self.root
            .insert(TRANSFORM_KEY.to_string(), Value::Object(transform));
    }

    /// `Some` sets `connection.bulk`, `None` removes it.
    pub fn set_bulk(&mut self, bulk: Option<bool>) -> Result<()> {
        let connection = self.section_mut(CONNECTION_KEY)?;
        match bulk {
            Some(bulk) => {
                connection.insert("bulk".to_string(), Value::Bool(bulk));
            }
            None => {
                connection.shift_remove("bulk");
            }
        }
        Ok(())
    }

    /// Swaps in the new endpoint and, when given, the headers. Other
    /// connection fields stay as they are.
    pub fn patch_connection(&mut self, endpoint: Endpoint, headers: Option<Value>) -> Result<()> {
        let connection = self.section_mut(CONNECTION_KEY)?;
        connection.shift_remove("url");
        connection.shift_remove("toUrl");
        match endpoint {
            Endpoint::Url(url) => connection.insert("url".to_string(), Value::String(url)),
            Endpoint::ToUrl(body) => connection.insert("toUrl".to_string(), Value::String(body)),
        };
        if let Some(headers) = headers {
            connection.insert("headers".to_string(), headers);
        }
        Ok(())
    }

    /// Adds every variable of `schema`, overwriting same-named entries.
    pub fn merge_context_definition(&mut self, schema: &ContextSchema) -> Result<()> {
        let definitions = self.section_mut(CONTEXT_DEFINITION_KEY)?;
        for (name, variable) in schema.iter() {
            definitions.insert(name.clone(), serde_json::to_value(variable)?);
        }
        Ok(())
    }
}
