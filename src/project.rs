use std::fs;
use std::path::PathBuf;

use crate::error::{CompileError, Result};

pub const TRANSFORM_FILE: &str = "transform/transform.js";
pub const CONNECTION_FILE: &str = "connection/connection.js";

/// Where a template project keeps its files.
///
/// The template document is named after the project directory:
/// `<dir>/<basename(dir)>.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    dir: PathBuf,
    name: String,
}

impl ProjectLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let name = match dir.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            // `.` and `..` have no file name of their own.
            None => fs::canonicalize(&dir)?
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    CompileError::Template(format!(
                        "cannot name a template after {}",
                        dir.display()
                    ))
                })?,
        };
        Ok(ProjectLayout { dir, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform_path(&self) -> PathBuf {
        self.dir.join(TRANSFORM_FILE)
    }

    pub fn connection_path(&self) -> PathBuf {
        self.dir.join(CONNECTION_FILE)
    }

    pub fn template_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }
}
