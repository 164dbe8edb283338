//! Inbound build requests.

use serde::Deserialize;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::error::{ForgeError, Result};

/// One file of a generated project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative path using `/` separators.
    pub path: String,
    /// Raw file content, staged byte-for-byte.
    pub content: Vec<u8>,
    /// Language label attached by the generator, informational only.
    pub language: Option<String>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            language: None,
        }
    }

    /// Lower-cased extension of the final path segment, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// A file set plus optional language hint and project name.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub files: Vec<FileEntry>,
    pub language: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    files: Vec<WireFile>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default, alias = "project_name")]
    project_name: Option<String>,
}

#[derive(Deserialize)]
struct WireFile {
    path: String,
    content: String,
    #[serde(default)]
    language: Option<String>,
}

/// Directories never collected from a source tree.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "__pycache__"];

impl BuildRequest {
    pub fn new(files: Vec<FileEntry>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Parse the JSON body `{files, language?, projectName?}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: WireRequest =
            serde_json::from_str(json).map_err(|e| ForgeError::InvalidRequest(e.to_string()))?;

        let files = wire
            .files
            .into_iter()
            .map(|f| FileEntry {
                path: f.path,
                content: f.content.into_bytes(),
                language: f.language,
            })
            .collect();

        Ok(Self {
            files,
            language: wire.language.filter(|l| !l.trim().is_empty()),
            project_name: wire.project_name.filter(|n| !n.trim().is_empty()),
        })
    }

    /// Collect every regular file below `root` into a request.
    ///
    /// Hidden entries and build-output directories are skipped; paths are
    /// stored relative to `root`.
    pub fn from_dir(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(ForgeError::InvalidRequest(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

        for entry in walker {
            let entry = entry.map_err(|e| ForgeError::InvalidRequest(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| ForgeError::InvalidRequest(e.to_string()))?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let content = std::fs::read(entry.path())
                .map_err(|e| ForgeError::resource(entry.path(), e))?;
            files.push(FileEntry::new(path, content));
        }

        tracing::debug!(root = %root.display(), count = files.len(), "Collected source files");
        Ok(Self::new(files))
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension() {
        assert_eq!(FileEntry::new("src/Main.JAVA", "").extension(), Some("java".into()));
        assert_eq!(FileEntry::new("Makefile", "").extension(), None);
        assert_eq!(FileEntry::new("a.tar.gz", "").extension(), Some("gz".into()));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "files": [
                {"path": "main.go", "content": "package main\nfunc main(){}", "language": "go"}
            ],
            "projectName": "hello"
        }"#;
        let req = BuildRequest::from_json(json).unwrap();

        assert_eq!(req.files.len(), 1);
        assert_eq!(req.files[0].content, b"package main\nfunc main(){}");
        assert_eq!(req.files[0].language.as_deref(), Some("go"));
        assert_eq!(req.project_name.as_deref(), Some("hello"));
        assert!(req.language.is_none());
    }

    #[test]
    fn test_from_json_blank_fields_are_absent() {
        let json = r#"{"files": [], "language": "", "project_name": " "}"#;
        let req = BuildRequest::from_json(json).unwrap();
        assert!(req.language.is_none());
        assert!(req.project_name.is_none());
    }

    #[test]
    fn test_from_json_missing_content() {
        let json = r#"{"files": [{"path": "a.txt"}]}"#;
        let err = BuildRequest::from_json(json).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidRequest(_)));
    }

    #[test]
    fn test_from_dir() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src/util")).unwrap();
        fs::create_dir_all(tmp.path().join("target/debug")).unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(tmp.path().join("src/util/mod.rs"), "").unwrap();
        fs::write(tmp.path().join("target/debug/app"), "bin").unwrap();
        fs::write(tmp.path().join(".git/HEAD"), "ref").unwrap();
        fs::write(tmp.path().join(".env"), "SECRET=1").unwrap();

        let req = BuildRequest::from_dir(tmp.path()).unwrap();
        let paths: Vec<_> = req.files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, ["src/main.rs", "src/util/mod.rs"]);
    }

    #[test]
    fn test_from_dir_rejects_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("x.txt");
        fs::write(&file, "").unwrap();

        assert!(BuildRequest::from_dir(&file).is_err());
    }
}
