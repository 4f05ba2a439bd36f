//! Path validation — keeps every store access inside its project tree.
//!
//! Stores accept project-relative paths only. A path is rejected when it is
//! absolute, when any component is `..`, or when the project id itself is
//! not a single plain directory name.

use loreweave_core::StoreError;
use std::path::{Component, Path, PathBuf};

/// Validate a project id: one non-empty path component, no separators.
pub fn validate_project_id(project_id: &str) -> Result<&str, StoreError> {
    let trimmed = project_id.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
    {
        return Err(StoreError::PathTraversal(project_id.into()));
    }
    Ok(trimmed)
}

/// Normalise a project-relative path to forward-slash form.
///
/// `./` segments are dropped. Empty paths, absolute paths and any `..`
/// segment are rejected.
pub fn normalize_relative(path: &str) -> Result<String, StoreError> {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || Path::new(&unified).is_absolute() {
        return Err(StoreError::PathTraversal(path.into()));
    }

    let mut parts = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StoreError::PathTraversal(path.into()));
            }
        }
    }

    if parts.is_empty() {
        return Err(StoreError::PathTraversal(path.into()));
    }
    Ok(parts.join("/"))
}

/// Resolve a project-relative path against a data root.
pub fn resolve(root: &Path, project_id: &str, path: &str) -> Result<PathBuf, StoreError> {
    let project = validate_project_id(project_id)?;
    let relative = normalize_relative(path)?;
    Ok(root.join(project).join(relative))
}
