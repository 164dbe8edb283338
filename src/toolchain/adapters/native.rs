//! C and C++ toolchain: `gcc` / `g++`.

use crate::error::Result;
use crate::toolchain::{read_artifact, Artifact, BuildContext, Invocation, Toolchain};

const CPP_EXTENSIONS: &[&str] = &["cpp", "cc"];

/// Compiles C and C++ sources into one native executable.
///
/// `g++` is used when any C++ source is present, `gcc` otherwise.
pub struct NativeToolchain;

impl Toolchain for NativeToolchain {
    fn id(&self) -> &'static str {
        "native"
    }

    fn display_name(&self) -> &'static str {
        "C/C++"
    }

    fn languages(&self) -> &'static [&'static str] {
        &["cpp", "c"]
    }

    fn source_extensions(&self) -> &'static [&'static str] {
        &["cpp", "cc", "c"]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<Artifact> {
        let root = ctx.root();
        let sources = self.require_sources(root)?;

        let compiler = if sources.iter().any(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| CPP_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        }) {
            "g++"
        } else {
            "gcc"
        };

        let exe_name = ctx.artifact_name();
        let exe_path = ctx.create_tool_dir(self.id())?.join(&exe_name);
        ctx.runner.run(
            &Invocation::new(compiler, root, ctx.timeouts.compile_timeout())
                .arg("-o")
                .arg(&exe_path)
                .args(&sources),
        )?;

        read_artifact(compiler, &exe_path, exe_name)
    }
}
