//! Python toolchain: `pyinstaller --onefile`, falling back to an archive.

use std::path::{Path, PathBuf};

use crate::error::{ForgeError, Result};
use crate::language::ARCHIVE_EXTENSION;
use crate::packager::Packager;
use crate::toolchain::{read_artifact, Artifact, BuildContext, Invocation, Toolchain};

/// Entry-point names, most preferred first.
const MAIN_CANDIDATES: &[&str] = &["main.py", "app.py", "__main__.py", "run.py"];

const TOOL: &str = "pyinstaller";

/// Freezes a Python program into a single executable.
///
/// Unlike every other toolchain, a failed freeze is not reported: the
/// workspace is archived instead so the caller still gets the sources.
pub struct PythonToolchain {
    packager: Packager,
}

impl PythonToolchain {
    pub fn new() -> Self {
        Self {
            packager: Packager::new(),
        }
    }

    fn freeze(&self, ctx: &BuildContext<'_>, main: &Path) -> Result<Artifact> {
        let root = ctx.root();
        let scratch = ctx.tool_dir(TOOL);
        let dist = scratch.join("dist");

        ctx.runner.run(
            &Invocation::new(TOOL, root, ctx.timeouts.multi_stage_timeout())
                .arg("--onefile")
                .arg("--name")
                .arg(ctx.project_name)
                .arg("--distpath")
                .arg(&dist)
                .arg("--workpath")
                .arg(scratch.join("build"))
                .arg("--specpath")
                .arg(scratch.join("spec"))
                .arg(main),
        )?;

        let exe_name = ctx.artifact_name();
        read_artifact(TOOL, &dist.join(&exe_name), exe_name)
    }

    /// Archive the staged sources. Freeze intermediates are left out.
    fn fall_back(&self, ctx: &BuildContext<'_>) -> Result<Artifact> {
        let name = format!("{}{}", ctx.project_name, ARCHIVE_EXTENSION);
        self.packager.archive(ctx.workspace, &name)
    }
}

impl Default for PythonToolchain {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the entry script: a conventional file name at any depth if present,
/// else the first source.
pub fn pick_main(sources: &[PathBuf]) -> Option<PathBuf> {
    MAIN_CANDIDATES
        .iter()
        .find_map(|name| {
            sources
                .iter()
                .find(|path| path.file_name().is_some_and(|f| f == *name))
        })
        .or_else(|| sources.first())
        .cloned()
}

impl Toolchain for PythonToolchain {
    fn id(&self) -> &'static str {
        "python"
    }

    fn display_name(&self) -> &'static str {
        "Python"
    }

    fn languages(&self) -> &'static [&'static str] {
        &["python"]
    }

    fn source_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<Artifact> {
        let root = ctx.root();
        let sources = self.require_sources(root)?;
        let main = pick_main(&sources).ok_or_else(|| ForgeError::NotFound {
            language: self.display_name().to_string(),
        })?;

        match self.freeze(ctx, &main) {
            Ok(artifact) => Ok(artifact),
            Err(e) => {
                tracing::warn!("Python freeze failed, packaging sources instead: {}", e);
                self.fall_back(ctx)
            }
        }
    }
}
