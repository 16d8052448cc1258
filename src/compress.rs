//! Compression of one self-contained function declaration.
//!
//! The runtime binds the outer parameters by name, so those names must come
//! out of the minifier unchanged. [`OxcCompressor`] takes them off the
//! declaration before minifying: with no binding in sight the mangler treats
//! them as globals and leaves every reference alone. Nested helper
//! declarations that nothing reaches are cut before oxc sees the code.

use indexmap::{IndexMap, IndexSet};
use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPattern, Function, IdentifierReference, Statement};
use oxc_ast_visit::Visit;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use tracing::{debug, warn};

use crate::error::{CompileError, Result};
use crate::extract::declaration_parts;
use crate::normalize::{script_source_type, span_text};

/// Names the runtime binds when it evaluates a compiled body.
pub const RESERVED_NAMES: [&str; 6] = ["ctx", "aspects", "subjects", "aspect", "subject", "res"];

pub trait Compressor {
    /// Minifies `source`, a single function declaration. The declaration's
    /// own parameters and every reference to them keep their names. `reserved`
    /// lists the names the runtime binds; a parameter outside it is reported.
    /// Inner bindings, including ones that reuse a reserved name, may be
    /// renamed.
    fn compress(&self, source: &str, reserved: &[&str]) -> Result<String>;
}

/// `oxc_minifier` with compression and mangling, printed by `oxc_codegen`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcCompressor;

impl Compressor for OxcCompressor {
    fn compress(&self, source: &str, reserved: &[&str]) -> Result<String> {
        let detached = detach_params(source)?;
        for param in &detached.params {
            if !reserved.contains(&param.as_str()) {
                warn!(param = %param, "parameter is not a bound name");
            }
        }

        let pruned = prune_unused_helpers(&detached.source)?;
        let minified = minify(&pruned)?;
        let parts = declaration_parts(&minified)?;
        if parts.name != detached.name {
            return Err(CompileError::Compression(format!(
                "function \"{}\" did not survive minification",
                detached.name
            )));
        }

        debug!(
            function = %parts.name,
            before = source.len(),
            after = parts.body.len(),
            "compressed"
        );
        Ok(format!(
            "function {}({}){{{}}}",
            parts.name,
            detached.params.join(","),
            parts.body
        ))
    }
}

struct Detached {
    name: String,
    params: Vec<String>,
    /// The declaration with an empty parameter list.
    source: String,
}

fn parse_error(stage: &str, errors: impl std::fmt::Debug) -> CompileError {
    CompileError::Compression(format!("could not parse {}: {:?}", stage, errors))
}

fn single_function<'b, 'a>(body: &'b [Statement<'a>]) -> Result<&'b Function<'a>> {
    match body {
        [Statement::FunctionDeclaration(func)] => Ok(&**func),
        _ => Err(CompileError::Compression(
            "input must be exactly one function declaration".to_string(),
        )),
    }
}

fn detach_params(source: &str) -> Result<Detached> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, script_source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error("input", ret.errors));
    }
    let func = single_function(&ret.program.body)?;
    let name = func
        .id
        .as_ref()
        .map(|id| id.name.to_string())
        .ok_or_else(|| CompileError::Compression("function has no name".to_string()))?;

    if func.params.rest.is_some() {
        return Err(CompileError::Compression(
            "rest parameters cannot be bound".to_string(),
        ));
    }
    let mut params = Vec::with_capacity(func.params.items.len());
    for param in &func.params.items {
        match &param.pattern {
            BindingPattern::BindingIdentifier(id) => {
                if param.initializer.is_some() {
                    warn!(param = %id.name, "default value dropped from bound parameter");
                }
                params.push(id.name.to_string());
            }
            _ => {
                return Err(CompileError::Compression(format!(
                    "parameters of \"{}\" must be plain names",
                    name
                )))
            }
        }
    }

    let span = func.params.span;
    let replacement = if span_text(source, span).starts_with('(') {
        "()"
    } else {
        ""
    };
    let mut detached = source.to_string();
    detached.replace_range(span.start as usize..span.end as usize, replacement);

    Ok(Detached {
        name,
        params,
        source: detached,
    })
}

#[derive(Default)]
struct ReferenceCollector {
    names: IndexSet<String>,
}

impl<'a> Visit<'a> for ReferenceCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.names.insert(ident.name.to_string());
    }
}

fn references<'a>(stmt: &Statement<'a>) -> IndexSet<String> {
    let mut collector = ReferenceCollector::default();
    collector.visit_statement(stmt);
    collector.names
}

/// Removes function declarations in the outer body that no live code refers
/// to. Liveness starts from every other statement and follows references from
/// helper to helper. Matching is by name, so a shadowed name keeps its helper.
pub(crate) fn prune_unused_helpers(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, script_source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error("bundle", ret.errors));
    }
    let func = single_function(&ret.program.body)?;
    let Some(body) = &func.body else {
        return Ok(source.to_string());
    };

    let mut helpers: IndexMap<String, Vec<(u32, u32, IndexSet<String>)>> = IndexMap::new();
    let mut pending: Vec<String> = Vec::new();
    for stmt in &body.statements {
        match stmt {
            Statement::FunctionDeclaration(helper) if helper.id.is_some() => {
                let name = helper
                    .id
                    .as_ref()
                    .map(|id| id.name.to_string())
                    .unwrap_or_default();
                helpers.entry(name).or_default().push((
                    helper.span.start,
                    helper.span.end,
                    references(stmt),
                ));
            }
            _ => pending.extend(references(stmt)),
        }
    }

    let mut live: IndexSet<String> = IndexSet::new();
    while let Some(name) = pending.pop() {
        let Some(decls) = helpers.get(&name) else {
            continue;
        };
        if !live.insert(name) {
            continue;
        }
        for (_, _, refs) in decls {
            pending.extend(refs.iter().cloned());
        }
    }

    let mut replacements: Vec<(u32, u32)> = helpers
        .iter()
        .filter(|(name, _)| !live.contains(*name))
        .flat_map(|(name, decls)| {
            debug!(helper = %name, "dropping unused helper");
            decls.iter().map(|(start, end, _)| (*start, *end))
        })
        .collect();
    replacements.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result = source.to_string();
    for (start, end) in replacements {
        result.replace_range(start as usize..end as usize, "");
    }
    Ok(result)
}

fn minify(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, script_source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error("pruned bundle", ret.errors));
    }
    let mut program = ret.program;

    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::default()),
        ..MinifierOptions::default()
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            single_quote: true,
            ..CodegenOptions::minify()
        })
        .with_scoping(minified.scoping)
        .build(&program)
        .code;
    Ok(code)
}
