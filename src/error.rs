use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_CONTEXT_DEFINITION: &str = "SGT-ERR-CTX-DEF";
pub const ERR_CONTEXT_USAGE: &str = "SGT-ERR-CTX-USAGE";
pub const ERR_CONFLICTING_CONTEXT: &str = "SGT-ERR-CTX-CONFLICT";
pub const ERR_SIGNATURE: &str = "SGT-ERR-SIGNATURE";
pub const ERR_SIGNATURE_MISMATCH: &str = "SGT-ERR-SIGNATURE-MISMATCH";
pub const ERR_MULTIPLE_TRANSFORMS: &str = "SGT-ERR-MULTIPLE-TRANSFORMS";
pub const ERR_UNSUPPORTED_FORM: &str = "SGT-ERR-FORM";
pub const ERR_HELPER_TYPE: &str = "SGT-ERR-HELPER-TYPE";
pub const ERR_EXPORT_TYPE: &str = "SGT-ERR-EXPORT-TYPE";
pub const ERR_CONNECTION: &str = "SGT-ERR-CONNECTION";
pub const ERR_MODULE: &str = "SGT-ERR-MODULE";
pub const ERR_COMPRESSION: &str = "SGT-ERR-COMPRESS";
pub const ERR_TEMPLATE: &str = "SGT-ERR-TEMPLATE";
pub const ERR_IO: &str = "SGT-ERR-IO";
pub const ERR_JSON: &str = "SGT-ERR-JSON";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Every way a build can fail.
///
/// Authoring mistakes carry the exact message shown to the template author.
/// Environmental failures (`Io`, `Json`) are passed through unchanged.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{0}")]
    ContextDefinition(String),

    #[error("{0}")]
    ContextUsage(String),

    #[error("contextDefinition.{key}: conflicting definitions in transform.js and connection.js")]
    ConflictingContext { key: String },

    #[error("{0}")]
    Signature(String),

    #[error("Invalid function signature: \"{key}\" must have the same arguments as the corresponding \"transformXXXXXX\" function.")]
    SignatureMismatch { key: String },

    #[error("Only one transform function can be defined. Comment out the other one.")]
    MultipleTransforms,

    #[error("{0}")]
    UnsupportedForm(String),

    #[error("helpers must be functions")]
    HelperType { name: String },

    #[error("{0}")]
    ExportType(String),

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Module(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("{0}")]
    Template(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::ContextDefinition(_) => ERR_CONTEXT_DEFINITION,
            CompileError::ContextUsage(_) => ERR_CONTEXT_USAGE,
            CompileError::ConflictingContext { .. } => ERR_CONFLICTING_CONTEXT,
            CompileError::Signature(_) => ERR_SIGNATURE,
            CompileError::SignatureMismatch { .. } => ERR_SIGNATURE_MISMATCH,
            CompileError::MultipleTransforms => ERR_MULTIPLE_TRANSFORMS,
            CompileError::UnsupportedForm(_) => ERR_UNSUPPORTED_FORM,
            CompileError::HelperType { .. } => ERR_HELPER_TYPE,
            CompileError::ExportType(_) => ERR_EXPORT_TYPE,
            CompileError::Connection(_) => ERR_CONNECTION,
            CompileError::Module(_) => ERR_MODULE,
            CompileError::Compression(_) => ERR_COMPRESSION,
            CompileError::Template(_) => ERR_TEMPLATE,
            CompileError::Io(_) => ERR_IO,
            CompileError::Json(_) => ERR_JSON,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
