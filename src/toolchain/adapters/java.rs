//! Java toolchain: `javac` + `jar`.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{ForgeError, Result};
use crate::toolchain::{read_artifact, Artifact, BuildContext, Invocation, Toolchain};

static MAIN_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+static\s+void\s+main\s*\(").expect("main method pattern is valid")
});

static PUBLIC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+(?:(?:final|abstract)\s+)*class\s+(\w+)")
        .expect("class pattern is valid")
});

static PACKAGE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("package pattern is valid")
});

const MANIFEST_FILE: &str = "MANIFEST.MF";

/// Compiles all `.java` sources and packs them into an executable jar.
pub struct JavaToolchain;

/// Fully qualified entry class of a single source file, if it has one.
pub fn main_class_in(source: &str) -> Option<String> {
    if !MAIN_METHOD.is_match(source) {
        return None;
    }
    let class = PUBLIC_CLASS.captures(source)?.get(1)?.as_str();
    match PACKAGE_DECL.captures(source).and_then(|c| c.get(1)) {
        Some(package) => Some(format!("{}.{}", package.as_str(), class)),
        None => Some(class.to_string()),
    }
}

/// First entry class across `sources`, in the given order.
pub fn find_main_class(sources: &[PathBuf]) -> Option<String> {
    sources.iter().find_map(|path| {
        let content = fs::read_to_string(path).ok()?;
        main_class_in(&content)
    })
}

/// Jar manifest text. Without a main class the jar is a plain library.
pub fn manifest(main_class: Option<&str>) -> String {
    match main_class {
        Some(class) => format!("Manifest-Version: 1.0\nMain-Class: {}\n", class),
        None => "Manifest-Version: 1.0\n".to_string(),
    }
}

impl Toolchain for JavaToolchain {
    fn id(&self) -> &'static str {
        "java"
    }

    fn display_name(&self) -> &'static str {
        "Java"
    }

    fn languages(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn source_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<Artifact> {
        let root = ctx.root();
        let sources = self.require_sources(root)?;

        let scratch = ctx.create_tool_dir(self.id())?;
        let classes = scratch.join("classes");
        fs::create_dir_all(&classes).map_err(|e| ForgeError::resource(&classes, e))?;

        ctx.runner.run(
            &Invocation::new("javac", root, ctx.timeouts.compile_timeout())
                .arg("-d")
                .arg(&classes)
                .args(&sources),
        )?;

        let main_class = find_main_class(&sources);
        if main_class.is_none() {
            tracing::warn!("No class with a main method found, jar will not be executable");
        }
        let manifest_path = write_manifest(&scratch, main_class.as_deref())?;

        let jar_name = ctx.artifact_name();
        let jar_path = root.join(&jar_name);
        ctx.runner.run(
            &Invocation::new("jar", root, ctx.timeouts.archive_timeout())
                .arg("cfm")
                .arg(&jar_path)
                .arg(&manifest_path)
                .arg("-C")
                .arg(&classes)
                .arg("."),
        )?;

        read_artifact("jar", &jar_path, jar_name)
    }
}

fn write_manifest(dir: &Path, main_class: Option<&str>) -> Result<PathBuf> {
    let path = dir.join(MANIFEST_FILE);
    fs::write(&path, manifest(main_class)).map_err(|e| ForgeError::resource(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::testing::{FakeRunner, Staged};
    use crate::toolchain::ToolOutput;

    const MAIN: &str = "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"hi\");\n    }\n}\n";

    #[test]
    fn test_main_class_simple() {
        assert_eq!(main_class_in(MAIN).as_deref(), Some("Main"));
    }

    #[test]
    fn test_main_class_with_package_and_modifiers() {
        let src = "package com.example.app;\n\npublic final class App {\n  public  static void main (String... a) {}\n}";
        assert_eq!(main_class_in(src).as_deref(), Some("com.example.app.App"));
    }

    #[test]
    fn test_no_main_method() {
        assert!(main_class_in("public class Util { static int x() { return 1; } }").is_none());
    }

    #[test]
    fn test_manifest_text() {
        assert_eq!(
            manifest(Some("Main")),
            "Manifest-Version: 1.0\nMain-Class: Main\n"
        );
        assert_eq!(manifest(None), "Manifest-Version: 1.0\n");
    }

    #[test]
    fn test_build_writes_manifest_and_invokes_tools() {
        let staged = Staged::new(&[
            ("util/Helper.java", "public class Helper { }"),
            ("Main.java", MAIN),
        ]);
        let runner = FakeRunner::new(|inv| {
            if inv.program() == "jar" {
                std::fs::write(&inv.get_args()[1], b"PK\x03\x04").unwrap();
            }
            Ok(ToolOutput::default())
        });

        let ctx = staged.context("java", "demo", &runner);
        let artifact = JavaToolchain.build(&ctx).unwrap();

        assert_eq!(artifact.filename, "demo.jar");
        assert_eq!(artifact.payload, b"PK\x03\x04");
        assert_eq!(runner.programs(), ["javac", "jar"]);

        let javac = &runner.calls()[0];
        assert_eq!(javac.get_args().len(), 4); // -d classes + 2 sources

        let manifest =
            std::fs::read_to_string(staged.workspace.tool_dir("java").join(MANIFEST_FILE)).unwrap();
        assert!(manifest.contains("Main-Class: Main\n"));
    }

    #[test]
    fn test_user_files_named_like_intermediates_are_untouched() {
        let staged = Staged::new(&[
            ("Main.java", MAIN),
            ("classes/readme.txt", "mine"),
        ]);
        let runner = FakeRunner::new(|inv| {
            if inv.program() == "jar" {
                std::fs::write(&inv.get_args()[1], b"PK\x03\x04").unwrap();
            }
            Ok(ToolOutput::default())
        });

        let ctx = staged.context("java", "demo", &runner);
        JavaToolchain.build(&ctx).unwrap();

        let javac = &runner.calls()[0];
        let classes = javac.get_args()[1].clone();
        assert_eq!(
            std::path::PathBuf::from(classes),
            staged.workspace.tool_dir("java").join("classes")
        );
        assert!(!staged.workspace.path("MANIFEST.MF").exists());
        assert_eq!(
            std::fs::read_to_string(staged.workspace.path("classes/readme.txt")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn test_compile_error_stops_build() {
        let staged = Staged::new(&[("Main.java", "public class Main {")]);
        let runner = FakeRunner::new(|inv| {
            Err(ForgeError::Build {
                tool: inv.program().to_string(),
                output: "Main.java:1: error: reached end of file while parsing".into(),
            })
        });

        let ctx = staged.context("java", "demo", &runner);
        let err = JavaToolchain.build(&ctx).unwrap_err();

        assert!(err.to_string().contains("reached end of file"));
        assert_eq!(runner.programs(), ["javac"]);
    }

    #[test]
    fn test_no_sources() {
        let staged = Staged::new(&[("README.md", "# nothing")]);
        let runner = FakeRunner::producing_output();

        let ctx = staged.context("java", "demo", &runner);
        let err = JavaToolchain.build(&ctx).unwrap_err();

        assert!(matches!(err, ForgeError::NotFound { .. }));
        assert!(runner.calls().is_empty());
    }
}
