//! Go toolchain: `go build`.

use std::fs;
use std::path::PathBuf;

use crate::error::{ForgeError, Result};
use crate::toolchain::{read_artifact, Artifact, BuildContext, Invocation, Toolchain};

/// Builds a single Go program.
pub struct GoToolchain;

/// Whether a Go source declares the program entry point.
pub fn is_main_file(source: &str) -> bool {
    source.contains("package main") && source.contains("func main()")
}

/// The entry file among `sources`, else the first source.
pub fn find_entry(sources: &[PathBuf]) -> Option<&PathBuf> {
    sources
        .iter()
        .find(|path| {
            fs::read_to_string(path)
                .map(|content| is_main_file(&content))
                .unwrap_or(false)
        })
        .or_else(|| sources.first())
}

impl Toolchain for GoToolchain {
    fn id(&self) -> &'static str {
        "go"
    }

    fn display_name(&self) -> &'static str {
        "Go"
    }

    fn languages(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn source_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<Artifact> {
        let root = ctx.root();
        let sources = self.require_sources(root)?;
        let entry = find_entry(&sources).ok_or_else(|| ForgeError::NotFound {
            language: self.display_name().to_string(),
        })?;
        tracing::debug!("Go entry file: {}", entry.display());

        let exe_name = ctx.artifact_name();
        let exe_path = ctx.create_tool_dir(self.id())?.join(&exe_name);
        ctx.runner.run(
            &Invocation::new("go", root, ctx.timeouts.go_timeout())
                .arg("build")
                .arg("-o")
                .arg(&exe_path)
                .arg(entry),
        )?;

        read_artifact("go", &exe_path, exe_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::testing::{FakeRunner, Staged};

    const HELPER: &str = "package main\n\nfunc helper() int { return 1 }\n";
    const MAIN: &str = "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(helper())\n}\n";

    #[test]
    fn test_is_main_file() {
        assert!(is_main_file(MAIN));
        assert!(!is_main_file(HELPER));
        assert!(!is_main_file("package lib\nfunc main() {}"));
    }

    #[test]
    fn test_entry_chosen_regardless_of_order() {
        // "a_helper.go" sorts before "z_main.go"
        let staged = Staged::new(&[("z_main.go", MAIN), ("a_helper.go", HELPER)]);
        let runner = FakeRunner::producing_output();

        let ctx = staged.context("go", "hello", &runner);
        let artifact = GoToolchain.build(&ctx).unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call.program(), "go");
        assert!(call.get_args()[3].to_string_lossy().ends_with("z_main.go"));
        assert_eq!(
            artifact.filename,
            format!("hello{}", std::env::consts::EXE_SUFFIX)
        );
    }

    #[test]
    fn test_entry_falls_back_to_first() {
        let staged = Staged::new(&[("b.go", HELPER), ("a.go", HELPER)]);
        let runner = FakeRunner::producing_output();

        let ctx = staged.context("go", "hello", &runner);
        GoToolchain.build(&ctx).unwrap();

        assert!(runner.calls()[0].get_args()[3]
            .to_string_lossy()
            .ends_with("a.go"));
    }
}
