//! Rust toolchain: `cargo build --release`.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ForgeError, Result};
use crate::toolchain::{read_artifact, Artifact, BuildContext, Invocation, Toolchain};

const MANIFEST: &str = "Cargo.toml";

/// Builds a Rust program, synthesizing a manifest for loose sources.
pub struct CargoToolchain;

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    package: Option<Package>,
    #[serde(default)]
    bin: Vec<BinTarget>,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BinTarget {
    name: Option<String>,
}

/// Turn a project name into a valid cargo package name.
pub fn package_name(project_name: &str) -> String {
    let name: String = project_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.starts_with(|c: char| c.is_ascii_digit()) || name.is_empty() {
        format!("app_{}", name)
    } else {
        name
    }
}

/// Binary produced by an existing manifest: first `[[bin]]`, else the package.
fn binary_name(manifest_text: &str) -> std::result::Result<Option<String>, toml::de::Error> {
    let manifest: Manifest = toml::from_str(manifest_text)?;
    Ok(manifest
        .bin
        .into_iter()
        .find_map(|b| b.name)
        .or_else(|| manifest.package.map(|p| p.name)))
}

fn synthesized_manifest(package: &str) -> String {
    format!(
        "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n",
        package
    )
}

/// Write a manifest and make sure `src/main.rs` exists. Returns the binary name.
fn scaffold(root: &Path, project_name: &str, first_source: &Path) -> Result<String> {
    let package = package_name(project_name);
    let manifest_path = root.join(MANIFEST);
    fs::write(&manifest_path, synthesized_manifest(&package))
        .map_err(|e| ForgeError::resource(&manifest_path, e))?;

    let main_rs = root.join("src").join("main.rs");
    if !main_rs.is_file() {
        let src_dir = root.join("src");
        fs::create_dir_all(&src_dir).map_err(|e| ForgeError::resource(&src_dir, e))?;
        fs::copy(first_source, &main_rs).map_err(|e| ForgeError::resource(first_source, e))?;
    }

    Ok(package)
}

fn existing_binary(root: &Path, project_name: &str) -> Result<String> {
    let manifest_path = root.join(MANIFEST);
    let text =
        fs::read_to_string(&manifest_path).map_err(|e| ForgeError::resource(&manifest_path, e))?;
    match binary_name(&text) {
        Ok(Some(name)) => Ok(name),
        Ok(None) => Ok(package_name(project_name)),
        Err(e) => Err(ForgeError::Build {
            tool: "cargo".to_string(),
            output: format!("invalid {}: {}", MANIFEST, e),
        }),
    }
}

impl Toolchain for CargoToolchain {
    fn id(&self) -> &'static str {
        "cargo"
    }

    fn display_name(&self) -> &'static str {
        "Rust"
    }

    fn languages(&self) -> &'static [&'static str] {
        &["rust"]
    }

    fn source_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<Artifact> {
        let root = ctx.root();
        let sources = self.require_sources(root)?;

        let binary = if root.join(MANIFEST).is_file() {
            existing_binary(root, ctx.project_name)?
        } else {
            scaffold(root, ctx.project_name, &sources[0])?
        };

        let target_dir = ctx.tool_dir(self.id()).join("target");
        ctx.runner.run(
            &Invocation::new("cargo", root, ctx.timeouts.multi_stage_timeout())
                .arg("build")
                .arg("--release")
                .arg("--target-dir")
                .arg(&target_dir),
        )?;

        let built = target_dir
            .join("release")
            .join(format!("{}{}", binary, std::env::consts::EXE_SUFFIX));
        read_artifact("cargo", &built, ctx.artifact_name())
    }
}
