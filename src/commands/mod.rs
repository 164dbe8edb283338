//! Subcommand implementations.

pub mod build;
pub mod detect;
pub mod languages;

use anyhow::{Context, Result};
use std::path::Path;

use crate::request::BuildRequest;

/// Read a build request from a source directory or a JSON request file.
pub fn load_request(input: &Path) -> Result<BuildRequest> {
    if input.is_dir() {
        return Ok(BuildRequest::from_dir(input)?);
    }

    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read request file {}", input.display()))?;
    BuildRequest::from_json(&json)
        .with_context(|| format!("Invalid request file {}", input.display()))
}
