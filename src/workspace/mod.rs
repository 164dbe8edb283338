//! Workspace management.
//!
//! This module provides:
//! - Validation of inbound file sets
//! - Creation and staging of per-job directories
//! - Deferred, cancellable removal of finished workspaces

mod manager;
mod scheduler;
mod validation;

pub use manager::{Workspace, WorkspaceManager};
pub use scheduler::{CleanupHandle, CleanupScheduler, ShutdownMode};
pub use validation::{
    validate_files, validate_project_name, FileLimits, ALLOWED_EXTENSIONS, TOOL_DIR,
};
