// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

use napi_derive::napi;

use crate::assemble::{build, build_connection, build_transform};
use crate::compress::OxcCompressor;
use crate::error::CompileError;
use crate::project::ProjectLayout;

fn to_napi(err: CompileError) -> napi::Error {
    napi::Error::from_reason(format!("[{}] {}", err.code(), err))
}

fn to_value<T: serde::Serialize>(value: &T) -> napi::Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[napi]
pub fn build_native(dir: String) -> napi::Result<()> {
    let project = ProjectLayout::new(dir).map_err(to_napi)?;
    build(&project, &OxcCompressor).map_err(to_napi)?;
    Ok(())
}

/// Builds the transform group; resolves to the schema it merged.
#[napi]
pub fn build_transform_native(dir: String) -> napi::Result<serde_json::Value> {
    let project = ProjectLayout::new(dir).map_err(to_napi)?;
    let artifacts = build_transform(&project, &OxcCompressor).map_err(to_napi)?;
    to_value(&artifacts.context_definition)
}

#[napi]
pub fn build_connection_native(dir: String) -> napi::Result<serde_json::Value> {
    let project = ProjectLayout::new(dir).map_err(to_napi)?;
    let artifacts = build_connection(&project, &OxcCompressor).map_err(to_napi)?;
    to_value(&artifacts.context_definition)
}
