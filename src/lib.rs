//! # Sample Generator Template compiler
//!
//! Compiles the functions of a template project into bodies a collector can
//! evaluate without a module system, and writes them into the template JSON.
//!
//! ## Project layout
//!
//! ```text
//! <dir>/
//!   <basename(dir)>.json       template document
//!   transform/transform.js     transformBulk | transformBySubject, errorHandlers,
//!                              contextDefinition, helpers
//!   connection/connection.js   url | toUrl, headers, contextDefinition, helpers
//! ```
//!
//! ## Compiled bodies
//!
//! 1. **Bound names**: the collector binds `ctx`, `aspects`, `subjects`,
//!    `aspect`, `subject` and `res` by name. They survive compression untouched.
//!
//! 2. **Self-contained**: every helper a body calls is declared inside it.
//!    Helpers nothing calls are dropped.
//!
//! 3. **Declared context**: every `ctx.X` the code reads must be declared in
//!    the group's `contextDefinition`, and a variable declared by both groups
//!    must be declared the same way (SGT-ERR-CTX-CONFLICT).
//!
//! 4. **One convention**: a transform group is either batch (`subjects`) or
//!    per subject (`subject`). Error handlers follow the transform.

mod assemble;
mod bundle;
mod compress;
mod context;
mod error;
mod exports;
mod extract;
mod normalize;
mod project;
mod signature;
mod template;
mod usage;

#[cfg(feature = "napi")]
mod native;

#[cfg(test)]
mod compress_tests;
#[cfg(test)]
mod template_tests;

pub use assemble::{
    build, build_connection, build_transform, check_conflicting_context_definitions,
    compile_connection, compile_function, compile_transform, group_context_definition,
    BuildOutput, ConnectionArtifacts, TransformArtifacts, TRANSFORM_BULK, TRANSFORM_BY_SUBJECT,
};
pub use bundle::bundle;
pub use compress::{Compressor, OxcCompressor, RESERVED_NAMES};
pub use context::{
    check_conflicting_definitions, validate_context_definition, ContextSchema, ContextVariable,
};
pub use error::*;
pub use exports::{ExportValue, ExportsModule};
pub use extract::extract_body;
pub use normalize::{is_identifier, normalize};
pub use project::{ProjectLayout, CONNECTION_FILE, TRANSFORM_FILE};
pub use signature::{classify, CallingConvention};
pub use template::{Endpoint, TemplateDocument};
pub use usage::{collect_context_usages, validate_context_usages, CONTEXT_PARAM};

#[cfg(feature = "napi")]
pub use native::{build_connection_native, build_native, build_transform_native};
