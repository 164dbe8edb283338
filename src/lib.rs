//! Artifact Forge - builds generated source files into downloadable artifacts
//!
//! This crate provides functionality for:
//! - Staging file sets into isolated, automatically cleaned workspaces
//! - Detecting a project's language from its file extensions
//! - Building with the language's toolchain, or archiving when there is none

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod job;
pub mod language;
pub mod orchestrator;
pub mod packager;
pub mod request;
pub mod toolchain;
pub mod workspace;

// Re-export commonly used types
pub use config::Config;
pub use error::{ForgeError, Result};
pub use job::{JobId, JobState};
pub use orchestrator::{JobReport, Orchestrator};
pub use request::{BuildRequest, FileEntry};
pub use toolchain::Artifact;
