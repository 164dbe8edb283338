//! File-set validation performed before anything is written.

use std::collections::HashSet;

use crate::error::{ForgeError, Result};
use crate::request::FileEntry;

/// Extensions a staged file may carry. Extension-less files are always allowed.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "html", "css", "json", "md", "java", "cpp", "c", "cc", "h", "hpp",
    "py", "go", "rs", "cs", "php", "rb", "sql", "sh", "bash", "yml", "yaml", "xml", "txt", "toml",
    "lock", "mod", "sum", "cfg", "ini",
];

const MAX_NAME_LEN: usize = 255;

/// Top-level workspace directory reserved for toolchain intermediates.
pub const TOOL_DIR: &str = ".forge";

/// Size and count limits applied to one file set.
#[derive(Debug, Clone, Copy)]
pub struct FileLimits {
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for FileLimits {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_files: 100,
        }
    }
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-')
}

/// Check one path, returning the first problem found.
fn check_path(path: &str) -> std::result::Result<(), String> {
    if path.is_empty() {
        return Err("File path is empty".to_string());
    }
    if path.starts_with('/') || path.starts_with('\\') || std::path::Path::new(path).is_absolute()
    {
        return Err(format!("Invalid file path: {}", path));
    }
    if path.split('/').any(|seg| seg == "..") {
        return Err(format!("Invalid file path: {}", path));
    }
    if !path.chars().all(is_allowed_char) {
        return Err(format!("File path contains invalid characters: {}", path));
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == ".") {
        return Err(format!("File path is not normalized: {}", path));
    }
    if path.split('/').next() == Some(TOOL_DIR) {
        return Err(format!("File path uses reserved directory {}: {}", TOOL_DIR, path));
    }
    Ok(())
}

fn check_extension(path: &str) -> std::result::Result<(), String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = match std::path::Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return Ok(()),
    };
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(format!("File extension not allowed: .{} in {}", ext, path))
    }
}

/// Validate a whole file set.
///
/// Every problem is collected so the caller sees all offending paths at once.
pub fn validate_files(files: &[FileEntry], limits: &FileLimits) -> Result<()> {
    if files.is_empty() {
        return Err(ForgeError::Validation(vec![
            "At least one file is required".to_string(),
        ]));
    }
    if files.len() > limits.max_files {
        return Err(ForgeError::Validation(vec![format!(
            "Too many files: {} (maximum allowed: {})",
            files.len(),
            limits.max_files
        )]));
    }

    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(files.len());

    for file in files {
        if !seen.insert(file.path.as_str()) {
            errors.push(format!("Duplicate file path: {}", file.path));
            continue;
        }

        if let Err(e) = check_path(&file.path).and_then(|_| check_extension(&file.path)) {
            errors.push(e);
            continue;
        }
        valid.push(file.path.as_str());

        if file.content.len() as u64 > limits.max_file_size {
            errors.push(format!(
                "File {} is too large: {} bytes (maximum: {} bytes)",
                file.path,
                file.content.len(),
                limits.max_file_size
            ));
        }
    }

    errors.extend(directory_conflicts(&valid));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ForgeError::Validation(errors))
    }
}

/// Paths that are also used as a parent directory by another path.
fn directory_conflicts(paths: &[&str]) -> Vec<String> {
    let files: HashSet<&str> = paths.iter().copied().collect();
    paths
        .iter()
        .filter_map(|path| {
            path.match_indices('/')
                .map(|(i, _)| &path[..i])
                .find(|parent| files.contains(parent))
                .map(|parent| {
                    format!(
                        "File path {} is also the parent directory of {}",
                        parent, path
                    )
                })
        })
        .collect()
}

/// Validate a project name used for artifact and manifest names.
pub fn validate_project_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("project name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("project name too long: {} bytes", name.len()));
    }
    if name == "." || name == ".." {
        return Err(format!("invalid project name: {}", name));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(format!(
            "invalid character '{}' in project name '{}' (only A-Z, a-z, 0-9, '.', '_', '-' allowed)",
            c, name
        ));
    }
    Ok(())
}
