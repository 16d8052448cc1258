//! Reading a function group from its source file.
//!
//! Group files are CommonJS modules whose only job is
//! `module.exports = { ... }`. Nothing is executed: the object literal is
//! parsed with oxc and each entry becomes either the source text of a function
//! (what `Function.prototype.toString` would return for it) or a static JSON
//! value.

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    AssignmentTarget, Expression, ObjectExpression, ObjectPropertyKind, PropertyKey, PropertyKind,
    Statement,
};
use oxc_parser::Parser;
use oxc_span::GetSpan;
use oxc_syntax::operator::UnaryOperator;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{CompileError, Result};
use crate::normalize::{script_source_type, span_text};

/// One entry of `module.exports`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    /// Source text of a method, function expression or arrow function.
    Function(String),
    Object(IndexMap<String, ExportValue>),
    /// Strings, numbers, booleans, null and arrays of those.
    Literal(Value),
    /// Anything that cannot be read without running code. Holds the source.
    Opaque(String),
}

impl ExportValue {
    pub fn as_function(&self) -> Option<&str> {
        match self {
            ExportValue::Function(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, ExportValue>> {
        match self {
            ExportValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// JSON form of a static value. `None` if a function or opaque
    /// expression appears anywhere inside.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            ExportValue::Literal(value) => Some(value.clone()),
            ExportValue::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json()?);
                }
                Some(Value::Object(map))
            }
            ExportValue::Function(_) | ExportValue::Opaque(_) => None,
        }
    }

    /// Like [`to_json`](Self::to_json), but functions and opaque expressions
    /// become their source text. Used where a value is about to be rejected
    /// for its shape anyway.
    pub fn to_json_lossy(&self) -> Value {
        match self {
            ExportValue::Literal(value) => value.clone(),
            ExportValue::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json_lossy()))
                    .collect(),
            ),
            ExportValue::Function(code) | ExportValue::Opaque(code) => Value::String(code.clone()),
        }
    }

    /// `null` and `undefined` count as not exported.
    pub fn is_defined(&self) -> bool {
        !matches!(self, ExportValue::Literal(Value::Null))
    }
}

/// The `module.exports` object of one group file.
#[derive(Debug, Clone, Default)]
pub struct ExportsModule {
    entries: IndexMap<String, ExportValue>,
}

impl ExportsModule {
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading exports");
        let source = fs::read_to_string(path)?;
        Self::parse(&source).map_err(|err| match err {
            CompileError::Module(message) => {
                CompileError::Module(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn parse(source: &str) -> Result<Self> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, script_source_type()).parse();
        if !ret.errors.is_empty() {
            return Err(CompileError::Module(format!(
                "syntax error: {:?}",
                ret.errors
            )));
        }

        let exported = ret
            .program
            .body
            .iter()
            .filter_map(module_exports_object)
            .last()
            .ok_or_else(|| {
                CompileError::Module("no `module.exports = { ... }` assignment found".to_string())
            })?;

        Ok(ExportsModule {
            entries: object_entries(source, exported),
        })
    }

    pub fn get(&self, name: &str) -> Option<&ExportValue> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// An export that is present and not `null`/`undefined`.
    pub fn defined(&self, name: &str) -> Option<&ExportValue> {
        self.get(name).filter(|value| value.is_defined())
    }
}

fn module_exports_object<'b, 'a>(stmt: &'b Statement<'a>) -> Option<&'b ObjectExpression<'a>> {
    let Statement::ExpressionStatement(stmt) = stmt else {
        return None;
    };
    let Expression::AssignmentExpression(assign) = &stmt.expression else {
        return None;
    };
    let AssignmentTarget::StaticMemberExpression(member) = &assign.left else {
        return None;
    };
    let is_module = matches!(&member.object, Expression::Identifier(id) if id.name == "module");
    if !is_module || member.property.name != "exports" {
        return None;
    }
    match without_parens(&assign.right) {
        Expression::ObjectExpression(obj) => Some(&**obj),
        _ => None,
    }
}

fn without_parens<'b, 'a>(expr: &'b Expression<'a>) -> &'b Expression<'a> {
    let mut current = expr;
    while let Expression::ParenthesizedExpression(paren) = current {
        current = &paren.expression;
    }
    current
}

fn object_entries(source: &str, obj: &ObjectExpression) -> IndexMap<String, ExportValue> {
    let mut entries = IndexMap::new();
    for prop in &obj.properties {
        let ObjectPropertyKind::ObjectProperty(prop) = prop else {
            warn!("spread in exported object ignored");
            continue;
        };
        let Some(key) = property_key_name(&prop.key) else {
            warn!(
                key = span_text(source, prop.key.span()),
                "computed export key ignored"
            );
            continue;
        };

        let value = if !matches!(prop.kind, PropertyKind::Init) {
            ExportValue::Opaque(span_text(source, prop.span).to_string())
        } else if prop.method {
            ExportValue::Function(span_text(source, prop.span).to_string())
        } else {
            export_value(source, &prop.value)
        };
        entries.insert(key, value);
    }
    entries
}

fn property_key_name(key: &PropertyKey) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
        PropertyKey::NumericLiteral(num) => Some(format_number(num.value)),
        _ => None,
    }
}

fn export_value(source: &str, expr: &Expression) -> ExportValue {
    match expr {
        Expression::FunctionExpression(_) | Expression::ArrowFunctionExpression(_) => {
            ExportValue::Function(span_text(source, expr.span()).to_string())
        }
        Expression::ObjectExpression(obj) => ExportValue::Object(object_entries(source, obj)),
        Expression::ParenthesizedExpression(paren) => export_value(source, &paren.expression),
        _ => match literal_value(expr) {
            Some(value) => ExportValue::Literal(value),
            None => ExportValue::Opaque(span_text(source, expr.span()).to_string()),
        },
    }
}

fn literal_value(expr: &Expression) -> Option<Value> {
    match expr {
        Expression::StringLiteral(lit) => Some(Value::String(lit.value.to_string())),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() && tpl.quasis.len() == 1 => {
            let quasi = &tpl.quasis[0];
            let value = quasi.value.cooked.as_ref().unwrap_or(&quasi.value.raw);
            Some(Value::String(value.to_string()))
        }
        Expression::NumericLiteral(num) => number_value(num.value),
        Expression::BooleanLiteral(lit) => Some(Value::Bool(lit.value)),
        Expression::NullLiteral(_) => Some(Value::Null),
        Expression::Identifier(ident) if ident.name == "undefined" => Some(Value::Null),
        Expression::UnaryExpression(unary) if unary.operator == UnaryOperator::UnaryNegation => {
            match &unary.argument {
                Expression::NumericLiteral(num) => number_value(-num.value),
                _ => None,
            }
        }
        Expression::ArrayExpression(arr) => {
            let mut items = Vec::with_capacity(arr.elements.len());
            for elem in &arr.elements {
                let item = elem.as_expression()?;
                items.push(match item {
                    Expression::ObjectExpression(obj) => object_literal(obj)?,
                    other => literal_value(other)?,
                });
            }
            Some(Value::Array(items))
        }
        Expression::ObjectExpression(obj) => object_literal(obj),
        Expression::ParenthesizedExpression(paren) => literal_value(&paren.expression),
        _ => None,
    }
}

fn object_literal(obj: &ObjectExpression) -> Option<Value> {
    let mut map = Map::new();
    for prop in &obj.properties {
        let ObjectPropertyKind::ObjectProperty(prop) = prop else {
            return None;
        };
        if prop.method || !matches!(prop.kind, PropertyKind::Init) {
            return None;
        }
        map.insert(property_key_name(&prop.key)?, literal_value(&prop.value)?);
    }
    Some(Value::Object(map))
}

fn number_value(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Some(Value::from(value as i64))
    } else {
        serde_json::Number::from_f64(value).map(Value::Number)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
