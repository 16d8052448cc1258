//! Calling-convention classification.
//!
//! A transform runs either once for the whole batch of subjects (`subjects`
//! param) or once per subject (`subject` param). The decision is read from the
//! parameter list alone, so it works on any of the accepted function shapes
//! before they are normalized.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallingConvention {
    /// Invoked once with every subject (`subjects`).
    Batch,
    /// Invoked once per subject (`subject`).
    SingleItem,
}

impl CallingConvention {
    /// Value recorded as `connection.bulk` in the template.
    pub fn is_bulk(self) -> bool {
        matches!(self, CallingConvention::Batch)
    }
}

/// Classifies `code` by the whole-word `subject`/`subjects` in its first
/// parenthesized group.
pub fn classify(code: &str) -> Result<CallingConvention> {
    lazy_static! {
        static ref SUBJECT_RE: Regex = Regex::new(r"\bsubjects?\b").unwrap();
    }

    let params = parameter_list(code).ok_or_else(|| {
        CompileError::Signature(
            "Invalid function signature: no parameter list found".to_string(),
        )
    })?;

    let mut batch = false;
    let mut single = false;
    for m in SUBJECT_RE.find_iter(params) {
        match m.as_str() {
            "subjects" => batch = true,
            _ => single = true,
        }
    }

    match (batch, single) {
        (true, false) => Ok(CallingConvention::Batch),
        (false, true) => Ok(CallingConvention::SingleItem),
        (true, true) => Err(CompileError::Signature(
            "Invalid function signature: only one of \"subject\" or \"subjects\" may be a param"
                .to_string(),
        )),
        (false, false) => Err(CompileError::Signature(
            "Invalid function signature: must have a \"subject\" or \"subjects\" param"
                .to_string(),
        )),
    }
}

/// Text between the first `(` and its balanced `)`.
fn parameter_list(code: &str) -> Option<&str> {
    let open = code.find('(')?;
    let close = find_balanced_paren(code, open)?;
    Some(&code[open + 1..close])
}

pub(crate) fn find_balanced_paren(code: &str, start_index: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    if bytes.get(start_index)? != &b'(' {
        return None;
    }
    let mut depth = 1;
    let mut i = start_index + 1;
    while i < bytes.len() && depth > 0 {
        if bytes[i] == b'(' {
            depth += 1;
        } else if bytes[i] == b')' {
            depth -= 1;
        }
        i += 1;
    }
    if depth == 0 {
        Some(i - 1)
    } else {
        None
    }
}
