//! Group assembly: from a group's exports to the template document.
//!
//! Each group goes through the same stages and stops at the first failure,
//! before anything is written:
//!
//! 1. validate the group's `contextDefinition`
//! 2. check which functions are exported and that they are functions
//! 3. normalize each function and check every `ctx` access against the schema
//! 4. classify the calling convention
//! 5. bundle helpers, compress and extract each function
//! 6. merge into the template and write it back

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bundle::bundle;
use crate::compress::{Compressor, RESERVED_NAMES};
use crate::context::{check_conflicting_definitions, validate_context_definition, ContextSchema};
use crate::error::{CompileError, Result};
use crate::exports::{ExportValue, ExportsModule};
use crate::extract::extract_body;
use crate::normalize::normalize;
use crate::project::ProjectLayout;
use crate::signature::{classify, CallingConvention};
use crate::template::{Endpoint, TemplateDocument};
use crate::usage::validate_context_usages;

pub const TRANSFORM_BULK: &str = "transformBulk";
pub const TRANSFORM_BY_SUBJECT: &str = "transformBySubject";
pub const ERROR_HANDLERS: &str = "errorHandlers";
pub const TO_URL: &str = "toUrl";
pub const URL: &str = "url";
pub const HEADERS: &str = "headers";
pub const HELPERS: &str = "helpers";
pub const CONTEXT_DEFINITION: &str = "contextDefinition";

/// Canonical name given to error handlers, whose keys are status patterns.
const ERROR_HANDLER_NAME: &str = "errorHandler";

/// Compiled output of `transform/transform.js`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformArtifacts {
    pub default: Option<String>,
    pub error_handlers: IndexMap<String, String>,
    /// `None` when the group defines no functions at all.
    pub convention: Option<CallingConvention>,
    pub context_definition: ContextSchema,
}

impl TransformArtifacts {
    pub fn apply(&self, document: &mut TemplateDocument) -> Result<()> {
        document.materialize_sections()?;
        document.set_transform(self.default.clone(), &self.error_handlers);
        document.set_bulk(self.convention.map(CallingConvention::is_bulk))?;
        document.merge_context_definition(&self.context_definition)
    }
}

/// Compiled output of `connection/connection.js`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionArtifacts {
    pub endpoint: Endpoint,
    pub headers: Option<Value>,
    pub context_definition: ContextSchema,
}

impl ConnectionArtifacts {
    pub fn apply(&self, document: &mut TemplateDocument) -> Result<()> {
        document.materialize_sections()?;
        document.patch_connection(self.endpoint.clone(), self.headers.clone())?;
        document.merge_context_definition(&self.context_definition)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub transform: TransformArtifacts,
    pub connection: ConnectionArtifacts,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED STAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// The group's validated `contextDefinition`; absent is empty.
///
/// Every field of a variable must be a static value. Shape errors come from
/// the validator, which sees non-static values as their source text.
pub fn group_context_definition(exports: &ExportsModule) -> Result<ContextSchema> {
    let Some(raw) = exports.defined(CONTEXT_DEFINITION) else {
        return validate_context_definition(None);
    };
    if let Some(variables) = raw.as_object() {
        if variables.values().all(|variable| variable.as_object().is_some()) {
            let runtime_field = variables.iter().find_map(|(key, variable)| {
                let fields = variable.as_object()?;
                let (field, _) = fields.iter().find(|(_, value)| value.to_json().is_none())?;
                Some((key, field))
            });
            if let Some((key, field)) = runtime_field {
                return Err(CompileError::ContextDefinition(format!(
                    "contextDefinition.{}: \"{}\" must be a static value",
                    key, field
                )));
            }
        }
    }
    validate_context_definition(Some(&raw.to_json_lossy()))
}

fn warn_unknown_exports(exports: &ExportsModule, known: &[&str]) {
    for name in exports.names() {
        if !known.contains(&name.as_str()) {
            warn!(export = %name, "ignoring unrecognized export");
        }
    }
}

fn group_helpers(exports: &ExportsModule) -> Result<IndexMap<String, ExportValue>> {
    match exports.defined(HELPERS) {
        None => Ok(IndexMap::new()),
        Some(ExportValue::Object(helpers)) => Ok(helpers.clone()),
        Some(_) => Err(CompileError::HelperType {
            name: HELPERS.to_string(),
        }),
    }
}

/// normalize -> bundle -> compress -> extract.
pub fn compile_function(
    code: &str,
    name: &str,
    helpers: &IndexMap<String, ExportValue>,
    compressor: &dyn Compressor,
) -> Result<String> {
    let canonical = normalize(code, name)?;
    compile_canonical(&canonical, helpers, compressor)
}

fn compile_canonical(
    canonical: &str,
    helpers: &IndexMap<String, ExportValue>,
    compressor: &dyn Compressor,
) -> Result<String> {
    let bundled = bundle(canonical, helpers)?;
    let compressed = compressor.compress(&bundled, &RESERVED_NAMES)?;
    let body = extract_body(&compressed)?;
    debug!(bytes = body.len(), "compiled");
    Ok(body)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM GROUP
// ═══════════════════════════════════════════════════════════════════════════════

struct Primary<'m> {
    name: &'static str,
    code: &'m str,
    expected: CallingConvention,
    param: &'static str,
}

fn primary_transform(exports: &ExportsModule) -> Result<Option<Primary<'_>>> {
    let bulk = exports.defined(TRANSFORM_BULK);
    let by_subject = exports.defined(TRANSFORM_BY_SUBJECT);

    let (name, value, expected, param) = match (bulk, by_subject) {
        (Some(_), Some(_)) => return Err(CompileError::MultipleTransforms),
        (Some(value), None) => (TRANSFORM_BULK, value, CallingConvention::Batch, "subjects"),
        (None, Some(value)) => (
            TRANSFORM_BY_SUBJECT,
            value,
            CallingConvention::SingleItem,
            "subject",
        ),
        (None, None) => return Ok(None),
    };

    let code = value
        .as_function()
        .ok_or_else(|| CompileError::ExportType(format!("{} must be a function", name)))?;
    Ok(Some(Primary {
        name,
        code,
        expected,
        param,
    }))
}

fn error_handlers(exports: &ExportsModule) -> Result<IndexMap<&str, &str>> {
    let not_functions = || CompileError::ExportType("errorHandlers must be functions".to_string());
    let Some(value) = exports.defined(ERROR_HANDLERS) else {
        return Ok(IndexMap::new());
    };
    let handlers = value.as_object().ok_or_else(not_functions)?;
    handlers
        .iter()
        .map(|(key, handler)| {
            let code = handler.as_function().ok_or_else(not_functions)?;
            Ok((key.as_str(), code))
        })
        .collect()
}

pub fn compile_transform(
    exports: &ExportsModule,
    compressor: &dyn Compressor,
) -> Result<TransformArtifacts> {
    warn_unknown_exports(
        exports,
        &[TRANSFORM_BULK, TRANSFORM_BY_SUBJECT, ERROR_HANDLERS, HELPERS, CONTEXT_DEFINITION],
    );
    let schema = group_context_definition(exports)?;
    let primary = primary_transform(exports)?;
    let handlers = error_handlers(exports)?;
    let helpers = group_helpers(exports)?;

    let primary_source = match &primary {
        Some(primary) => {
            let canonical = normalize(primary.code, primary.name)?;
            validate_context_usages(&canonical, &schema, primary.name)?;
            Some(canonical)
        }
        None => None,
    };
    let mut handler_sources = IndexMap::with_capacity(handlers.len());
    for (key, code) in &handlers {
        let canonical = normalize(code, ERROR_HANDLER_NAME)?;
        validate_context_usages(&canonical, &schema, key)?;
        handler_sources.insert(*key, canonical);
    }

    // Classified on normalized sources: `subject => f(x)` has no parameter
    // parens of its own.
    let mut convention = None;
    if let (Some(primary), Some(canonical)) = (&primary, &primary_source) {
        match classify(canonical) {
            Ok(found) if found == primary.expected => convention = Some(found),
            _ => {
                return Err(CompileError::Signature(format!(
                    "Invalid function signature: \"{}\" must have \"{}\" param.",
                    primary.name, primary.param
                )))
            }
        }
    }
    for (key, canonical) in &handler_sources {
        match convention {
            None => convention = Some(classify(canonical)?),
            Some(established) => match classify(canonical) {
                Ok(found) if found == established => {}
                _ => {
                    return Err(CompileError::SignatureMismatch {
                        key: key.to_string(),
                    })
                }
            },
        }
    }
    debug!(?convention, "classified transform group");

    let default = match &primary_source {
        Some(canonical) => Some(compile_canonical(canonical, &helpers, compressor)?),
        None => None,
    };
    let mut compiled_handlers = IndexMap::with_capacity(handler_sources.len());
    for (key, canonical) in &handler_sources {
        let body = compile_canonical(canonical, &helpers, compressor)?;
        compiled_handlers.insert(key.to_string(), body);
    }

    Ok(TransformArtifacts {
        default,
        error_handlers: compiled_handlers,
        convention,
        context_definition: schema,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONNECTION GROUP
// ═══════════════════════════════════════════════════════════════════════════════

pub fn compile_connection(
    exports: &ExportsModule,
    compressor: &dyn Compressor,
) -> Result<ConnectionArtifacts> {
    warn_unknown_exports(exports, &[URL, TO_URL, HEADERS, HELPERS, CONTEXT_DEFINITION]);
    let schema = group_context_definition(exports)?;

    let endpoint = match (exports.defined(URL), exports.defined(TO_URL)) {
        (Some(_), Some(_)) => {
            return Err(CompileError::Connection(
                "\"url\" and \"toUrl\" cannot both be defined. Remove one.".to_string(),
            ))
        }
        (None, None) => {
            return Err(CompileError::Connection(
                "You must define either \"url\" or \"toUrl\".".to_string(),
            ))
        }
        (Some(url), None) => match url {
            ExportValue::Literal(Value::String(url)) => Endpoint::Url(url.clone()),
            _ => {
                return Err(CompileError::ExportType(
                    "\"url\" must be a string.".to_string(),
                ))
            }
        },
        (None, Some(to_url)) => {
            let code = to_url.as_function().ok_or_else(|| {
                CompileError::ExportType("\"toUrl\" must be a function.".to_string())
            })?;
            let canonical = normalize(code, TO_URL)?;
            validate_context_usages(&canonical, &schema, TO_URL)?;
            let helpers = group_helpers(exports)?;
            Endpoint::ToUrl(compile_canonical(&canonical, &helpers, compressor)?)
        }
    };

    let headers = match exports.defined(HEADERS) {
        None => None,
        Some(value) => match value.to_json() {
            Some(headers @ Value::Object(_)) => Some(headers),
            _ => {
                return Err(CompileError::ExportType(
                    "\"headers\" must be an object.".to_string(),
                ))
            }
        },
    };

    Ok(ConnectionArtifacts {
        endpoint,
        headers,
        context_definition: schema,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT BUILDS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn build_transform(
    project: &ProjectLayout,
    compressor: &dyn Compressor,
) -> Result<TransformArtifacts> {
    let exports = ExportsModule::load(&project.transform_path())?;
    let artifacts = compile_transform(&exports, compressor)?;

    let template_path = project.template_path();
    let mut document = TemplateDocument::load(&template_path)?;
    artifacts.apply(&mut document)?;
    document.save(&template_path)?;

    info!(
        project = project.name(),
        template = %template_path.display(),
        error_handlers = artifacts.error_handlers.len(),
        "transform written"
    );
    Ok(artifacts)
}

pub fn build_connection(
    project: &ProjectLayout,
    compressor: &dyn Compressor,
) -> Result<ConnectionArtifacts> {
    let exports = ExportsModule::load(&project.connection_path())?;
    let artifacts = compile_connection(&exports, compressor)?;

    let template_path = project.template_path();
    let mut document = TemplateDocument::load(&template_path)?;
    artifacts.apply(&mut document)?;
    document.save(&template_path)?;

    info!(
        project = project.name(),
        template = %template_path.display(),
        "connection written"
    );
    Ok(artifacts)
}

/// Compares the two groups' schemas without compiling anything.
pub fn check_conflicting_context_definitions(project: &ProjectLayout) -> Result<()> {
    let transform = ExportsModule::load(&project.transform_path())?;
    let connection = ExportsModule::load(&project.connection_path())?;
    check_conflicting_definitions(
        &group_context_definition(&transform)?,
        &group_context_definition(&connection)?,
    )
}

/// Conflict check, then the transform group, then the connection group.
pub fn build(project: &ProjectLayout, compressor: &dyn Compressor) -> Result<BuildOutput> {
    check_conflicting_context_definitions(project)?;
    let transform = build_transform(project, compressor)?;
    let connection = build_connection(project, compressor)?;
    Ok(BuildOutput {
        transform,
        connection,
    })
}
