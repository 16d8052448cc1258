//! Context-usage analysis.
//!
//! Walks a function's syntax tree and collects every `ctx.X` / `ctx['X']`
//! access, then reports the names the schema does not declare.
//!
//! Only keys visible in the source are found: a string literal, a template
//! literal without substitutions, or a bare identifier (reported under its own
//! name, `ctx[value]` -> `value`). Keys computed from concatenation, indexing,
//! member access or calls are skipped without error.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::{ComputedMemberExpression, Expression, StaticMemberExpression};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;

use crate::context::ContextSchema;
use crate::error::{CompileError, Result};
use crate::normalize::script_source_type;

pub const CONTEXT_PARAM: &str = "ctx";

struct ContextUsageCollector {
    usages: Vec<String>,
}

fn is_context_object(expr: &Expression) -> bool {
    matches!(expr, Expression::Identifier(ident) if ident.name == CONTEXT_PARAM)
}

fn bracket_key(expr: &Expression) -> Option<String> {
    match expr {
        Expression::StringLiteral(lit) => Some(lit.value.to_string()),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() && tpl.quasis.len() == 1 => {
            let quasi = &tpl.quasis[0];
            let value = quasi.value.cooked.as_ref().unwrap_or(&quasi.value.raw);
            Some(value.to_string())
        }
        Expression::Identifier(ident) => Some(ident.name.to_string()),
        Expression::ParenthesizedExpression(paren) => bracket_key(&paren.expression),
        _ => None,
    }
}

impl<'a> Visit<'a> for ContextUsageCollector {
    fn visit_static_member_expression(&mut self, expr: &StaticMemberExpression<'a>) {
        if is_context_object(&expr.object) {
            self.usages.push(expr.property.name.to_string());
        }
        oxc_ast_visit::walk::walk_static_member_expression(self, expr);
    }

    fn visit_computed_member_expression(&mut self, expr: &ComputedMemberExpression<'a>) {
        if is_context_object(&expr.object) {
            if let Some(key) = bracket_key(&expr.expression) {
                self.usages.push(key);
            }
        }
        oxc_ast_visit::walk::walk_computed_member_expression(self, expr);
    }
}

/// Every context access in `code`, in source order, duplicates included.
pub fn collect_context_usages(code: &str) -> Result<Vec<String>> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, script_source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(CompileError::UnsupportedForm(format!(
            "could not parse function for context analysis: {:?}",
            ret.errors
        )));
    }

    let mut collector = ContextUsageCollector { usages: Vec::new() };
    collector.visit_program(&ret.program);
    Ok(collector.usages)
}

/// Fails if `code` reads a context variable that `schema` does not declare.
/// `label` names the function in the message.
pub fn validate_context_usages(code: &str, schema: &ContextSchema, label: &str) -> Result<()> {
    let undefined: IndexSet<String> = collect_context_usages(code)?
        .into_iter()
        .filter(|name| !schema.contains(name))
        .collect();

    match undefined.len() {
        0 => Ok(()),
        1 => Err(CompileError::ContextUsage(format!(
            "context variable \"{}\" used in {} is not defined in contextDefinition",
            undefined[0], label
        ))),
        _ => {
            let names: Vec<&str> = undefined.iter().map(String::as_str).collect();
            Err(CompileError::ContextUsage(format!(
                "context variables [{}] used in {} are not defined in contextDefinition",
                names.join(","),
                label
            )))
        }
    }
}
