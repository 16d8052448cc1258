//! Helper bundling.
//!
//! A compiled artifact cannot import anything, so every helper a group exports
//! is declared inside the function that may call it. The compressor drops the
//! ones nothing reaches.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{CompileError, Result};
use crate::exports::ExportValue;
use crate::normalize::normalize;

/// Appends each helper, normalized under its own key, before the closing
/// brace of `canonical`. Helpers keep their authoring order.
pub fn bundle(canonical: &str, helpers: &IndexMap<String, ExportValue>) -> Result<String> {
    if helpers.is_empty() {
        return Ok(canonical.to_string());
    }

    let close = canonical.rfind('}').ok_or_else(|| {
        CompileError::UnsupportedForm("function has no closing brace".to_string())
    })?;

    let mut declarations = String::new();
    for (name, helper) in helpers {
        let code = helper.as_function().ok_or_else(|| CompileError::HelperType {
            name: name.clone(),
        })?;
        declarations.push(';');
        declarations.push_str(&normalize(code, name)?);
    }
    debug!(count = helpers.len(), "bundled helpers");

    let mut bundled = String::with_capacity(canonical.len() + declarations.len());
    bundled.push_str(&canonical[..close]);
    bundled.push_str(&declarations);
    bundled.push_str(&canonical[close..]);
    Ok(bundled)
}
