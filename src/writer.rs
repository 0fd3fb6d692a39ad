//! Persists generated files under an output directory.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::TyperError;
use crate::generator::GeneratedFile;

/// Writes generated files below `base_dir`.
///
/// The whole batch is validated before anything touches the disk. Each file
/// is written to a temporary file next to its target and then renamed over
/// it, so readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Returns `base_dir` joined with each file's path, in input order.
    pub fn write_files(&self, files: &[GeneratedFile]) -> Result<Vec<PathBuf>, TyperError> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(TyperError::WriteError(
                "output directory cannot be empty".to_string(),
            ));
        }
        for (idx, file) in files.iter().enumerate() {
            validate_relative_path(&file.path)
                .map_err(|e| TyperError::WriteError(format!("file {idx}: {e}")))?;
        }

        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let target = self.base_dir.join(&file.path);
            write_atomically(&target, &file.content)?;
            debug!(path = %target.display(), bytes = file.content.len(), "wrote file");
            written.push(target);
        }
        Ok(written)
    }
}

fn validate_relative_path(path: &str) -> Result<(), String> {
    if path.trim().is_empty() {
        return Err("path cannot be empty".to_string());
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("path '{path}' must not contain '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("path '{path}' must be relative"));
            }
        }
    }
    Ok(())
}

fn write_atomically(target: &Path, content: &str) -> Result<(), TyperError> {
    let parent = target.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| {
        TyperError::WriteError(format!(
            "failed to create directory '{}': {e}",
            parent.display()
        ))
    })?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| {
        TyperError::WriteError(format!(
            "failed to create temporary file in '{}': {e}",
            parent.display()
        ))
    })?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(target).map_err(|e| {
        TyperError::WriteError(format!(
            "failed to write '{}': {}",
            target.display(),
            e.error
        ))
    })?;
    Ok(())
}
