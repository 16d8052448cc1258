//! Function-form normalization.
//!
//! Template authors write functions in whatever shape `module.exports` allows:
//!
//! - method shorthand: `transformBulk(ctx, aspects, subjects, res) { ... }`
//! - function expression: `function (ctx, aspects, subjects, res) { ... }`
//! - arrow function: `(ctx, aspects, subjects, res) => { ... }` or `x => x * 2`
//!
//! Everything downstream works on exactly one shape,
//! `function <name>(<params>){<body>}`. The parameter list and body are cut out
//! of the oxc tree by span, then the rebuilt text is parsed again to make sure
//! it is a single declaration.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, Expression, Function, ObjectPropertyKind, PropertyKind, Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use regex::Regex;

use crate::error::{CompileError, Result};
use crate::signature::find_balanced_paren;

/// Source type for every parse in the pipeline. Functions are evaluated as
/// classic scripts, never as modules.
pub(crate) fn script_source_type() -> SourceType {
    SourceType::default().with_module(false)
}

pub(crate) fn span_text(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

pub fn is_identifier(name: &str) -> bool {
    lazy_static! {
        static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    }
    IDENT_RE.is_match(name)
}

struct FunctionParts {
    params: String,
    body: String,
}

/// Rewrites `code` as `function <name>(...){...}`.
pub fn normalize(code: &str, name: &str) -> Result<String> {
    if !is_identifier(name) {
        return Err(CompileError::UnsupportedForm(format!(
            "\"{}\" is not a valid function name",
            name
        )));
    }

    let source = code.trim();
    let parts = match function_parts(source, name)? {
        Some(parts) => parts,
        None => return Err(unsupported(name)),
    };

    let canonical = format!("function {}({}){}", name, parts.params, parts.body);
    ensure_single_declaration(&canonical, name)?;
    Ok(canonical)
}

fn unsupported(name: &str) -> CompileError {
    CompileError::UnsupportedForm(format!(
        "\"{}\" is not a method, function expression or arrow function",
        name
    ))
}

fn function_parts(source: &str, name: &str) -> Result<Option<FunctionParts>> {
    {
        let allocator = Allocator::default();
        if let Ok(expr) = Parser::new(&allocator, source, script_source_type()).parse_expression() {
            match without_parens(&expr) {
                Expression::FunctionExpression(func) => {
                    return parts_from_function(source, func, name).map(Some);
                }
                Expression::ArrowFunctionExpression(arrow) => {
                    return parts_from_arrow(source, arrow, name).map(Some);
                }
                _ => {}
            }
        }
    }

    // Method shorthand only parses inside an object literal.
    let wrapped = format!("{{{}}}", source);
    let allocator = Allocator::default();
    let Ok(expr) = Parser::new(&allocator, &wrapped, script_source_type()).parse_expression()
    else {
        return Ok(None);
    };
    let Expression::ObjectExpression(obj) = without_parens(&expr) else {
        return Ok(None);
    };
    if obj.properties.len() != 1 {
        return Ok(None);
    }
    match &obj.properties[0] {
        ObjectPropertyKind::ObjectProperty(prop)
            if prop.method && matches!(prop.kind, PropertyKind::Init) =>
        {
            match &prop.value {
                Expression::FunctionExpression(func) => {
                    parts_from_function(&wrapped, func, name).map(Some)
                }
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

fn without_parens<'b, 'a>(expr: &'b Expression<'a>) -> &'b Expression<'a> {
    let mut current = expr;
    while let Expression::ParenthesizedExpression(paren) = current {
        current = &paren.expression;
    }
    current
}

fn parts_from_function(source: &str, func: &Function, name: &str) -> Result<FunctionParts> {
    if func.r#async || func.generator {
        return Err(CompileError::UnsupportedForm(format!(
            "\"{}\" must not be async or a generator",
            name
        )));
    }
    let body = func.body.as_ref().ok_or_else(|| unsupported(name))?;
    Ok(FunctionParts {
        params: strip_parens(span_text(source, func.params.span)).to_string(),
        body: span_text(source, body.span).to_string(),
    })
}

fn parts_from_arrow(
    source: &str,
    arrow: &ArrowFunctionExpression,
    name: &str,
) -> Result<FunctionParts> {
    if arrow.r#async {
        return Err(CompileError::UnsupportedForm(format!(
            "\"{}\" must not be async",
            name
        )));
    }
    let params = strip_parens(span_text(source, arrow.params.span)).to_string();

    let body = if arrow.expression {
        let expr_span = match arrow.body.statements.first() {
            Some(Statement::ExpressionStatement(stmt)) => stmt.expression.span(),
            _ => arrow.body.span,
        };
        format!("{{return ({});}}", span_text(source, expr_span))
    } else {
        span_text(source, arrow.body.span).to_string()
    };

    Ok(FunctionParts { params, body })
}

/// `(a, b)` -> `a, b`; `a` stays `a`.
fn strip_parens(params: &str) -> &str {
    let trimmed = params.trim();
    if trimmed.starts_with('(') && find_balanced_paren(trimmed, 0) == Some(trimmed.len() - 1) {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

fn ensure_single_declaration(canonical: &str, name: &str) -> Result<()> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, canonical, script_source_type()).parse();
    if !ret.errors.is_empty() || ret.program.body.len() != 1 {
        return Err(unsupported(name));
    }
    match &ret.program.body[0] {
        Statement::FunctionDeclaration(func)
            if func.id.as_ref().map(|id| id.name.as_str()) == Some(name) =>
        {
            Ok(())
        }
        _ => Err(unsupported(name)),
    }
}
