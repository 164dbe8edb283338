//! Core trait and types for toolchain adapters.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::runner::ToolRunner;
use crate::config::ToolchainConfig;
use crate::error::{ForgeError, Result};
use crate::language::LanguageDescriptor;
use crate::workspace::Workspace;

/// The downloadable result of a successful build.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name offered to the caller (e.g. "app.jar").
    pub filename: String,
    /// Raw artifact bytes.
    pub payload: Vec<u8>,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("bytes", &self.payload.len())
            .finish()
    }
}

/// Everything an adapter needs for one build.
pub struct BuildContext<'a> {
    pub workspace: &'a Workspace,
    pub project_name: &'a str,
    pub language: &'static LanguageDescriptor,
    pub runner: &'a dyn ToolRunner,
    pub timeouts: &'a ToolchainConfig,
}

impl BuildContext<'_> {
    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    /// Scratch directory for `tool`'s intermediates, outside the staged files.
    pub fn tool_dir(&self, tool: &str) -> PathBuf {
        self.workspace.tool_dir(tool)
    }

    /// Like [`BuildContext::tool_dir`], creating the directory first.
    pub fn create_tool_dir(&self, tool: &str) -> Result<PathBuf> {
        let dir = self.tool_dir(tool);
        fs::create_dir_all(&dir).map_err(|e| ForgeError::resource(&dir, e))?;
        Ok(dir)
    }

    /// Artifact filename for this project and language.
    pub fn artifact_name(&self) -> String {
        self.language.artifact_name(self.project_name)
    }
}

/// Trait for per-language build adapters.
///
/// Implement this trait to add build support for a new language; the
/// orchestrator reaches it through the registry and never changes.
pub trait Toolchain: Send + Sync {
    /// Unique identifier (e.g. "java").
    fn id(&self) -> &'static str;

    /// Human-readable name used in error messages (e.g. "Java").
    fn display_name(&self) -> &'static str;

    /// Language ids this toolchain builds.
    fn languages(&self) -> &'static [&'static str];

    /// Extensions of the source files it compiles, without dots.
    fn source_extensions(&self) -> &'static [&'static str];

    /// Build the staged workspace into an artifact.
    fn build(&self, ctx: &BuildContext<'_>) -> Result<Artifact>;

    /// Whether this toolchain handles `language`.
    fn handles(&self, language: &str) -> bool {
        self.languages().contains(&language)
    }

    /// Matching source files below `root`, in a stable order.
    fn find_sources(&self, root: &Path) -> Vec<PathBuf> {
        find_sources(root, self.source_extensions())
    }

    /// Like [`Toolchain::find_sources`], but an empty result is an error.
    fn require_sources(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let sources = self.find_sources(root);
        if sources.is_empty() {
            return Err(ForgeError::NotFound {
                language: self.display_name().to_string(),
            });
        }
        Ok(sources)
    }
}

/// Recursively collect files whose lower-cased extension is in `extensions`.
pub fn find_sources(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .map(|x| extensions.contains(&x.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect()
}

/// Read a tool's output file into an [`Artifact`].
///
/// A missing file after a successful run means the tool did not produce
/// what was expected, which is reported as a build failure of `tool`.
pub fn read_artifact(tool: &str, path: &Path, filename: String) -> Result<Artifact> {
    match fs::read(path) {
        Ok(payload) => Ok(Artifact { filename, payload }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ForgeError::Build {
            tool: tool.to_string(),
            output: format!("expected output not produced: {}", path.display()),
        }),
        Err(e) => Err(ForgeError::resource(path, e)),
    }
}
