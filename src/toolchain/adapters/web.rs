//! Languages shipped as source archives.

use crate::error::Result;
use crate::packager::Packager;
use crate::toolchain::{Artifact, BuildContext, Toolchain};

/// Archives the workspace as-is. Also the fallback for unknown languages.
pub struct ArchiveToolchain {
    packager: Packager,
}

impl ArchiveToolchain {
    pub fn new() -> Self {
        Self {
            packager: Packager::new(),
        }
    }
}

impl Default for ArchiveToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for ArchiveToolchain {
    fn id(&self) -> &'static str {
        "archive"
    }

    fn display_name(&self) -> &'static str {
        "Web"
    }

    fn languages(&self) -> &'static [&'static str] {
        &["web", "javascript", "typescript", "csharp"]
    }

    fn source_extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<Artifact> {
        self.packager.archive(ctx.workspace, &ctx.artifact_name())
    }
}
