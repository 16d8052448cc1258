//! Function-body extraction.
//!
//! The runtime evaluates a compiled artifact as the body of a function whose
//! parameters it binds itself, so the template stores statements only.

use oxc_allocator::Allocator;
use oxc_ast::ast::Statement;
use oxc_parser::Parser;

use crate::error::{CompileError, Result};
use crate::normalize::{script_source_type, span_text};

/// The pieces of a single `function NAME(...){...}` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeclarationParts {
    pub name: String,
    pub body: String,
}

pub(crate) fn declaration_parts(source: &str) -> Result<DeclarationParts> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, script_source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(CompileError::Compression(format!(
            "output is not valid JavaScript: {:?}",
            ret.errors
        )));
    }

    let mut functions = ret.program.body.iter().filter_map(|stmt| match stmt {
        Statement::FunctionDeclaration(func) => Some(func),
        _ => None,
    });
    let (Some(func), None) = (functions.next(), functions.next()) else {
        return Err(CompileError::Compression(
            "expected exactly one function declaration".to_string(),
        ));
    };

    let name = func
        .id
        .as_ref()
        .map(|id| id.name.to_string())
        .unwrap_or_default();
    let body = func.body.as_ref().ok_or_else(|| {
        CompileError::Compression("function declaration has no body".to_string())
    })?;

    // The block span includes both braces.
    let block = span_text(source, body.span);
    let inner = block
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(block);

    Ok(DeclarationParts {
        name,
        body: inner.to_string(),
    })
}

/// `function f(a,b){return a+b}` -> `return a+b`.
pub fn extract_body(compressed: &str) -> Result<String> {
    Ok(declaration_parts(compressed)?.body)
}
