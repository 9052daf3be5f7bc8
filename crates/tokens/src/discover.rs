use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const TEMPLATE_EXTENSION: &str = "tokens";

/// The template files under `root` in sorted path order. A file given
/// directly is used whatever its extension.
pub fn discover_templates(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map_or(true, |ext| ext != TEMPLATE_EXTENSION) {
            continue;
        }
        if path
            .file_name()
            .map_or(false, |n| n.to_string_lossy().starts_with('.'))
        {
            continue;
        }
        files.push(path.to_path_buf());
    }

    if files.is_empty() {
        return Err(Error::NoTemplates(root.to_path_buf()));
    }
    files.sort();
    log::debug!("found {} template(s) under {}", files.len(), root.display());
    Ok(files)
}
