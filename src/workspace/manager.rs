//! Per-job workspace directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::scheduler::{CleanupHandle, CleanupScheduler, ShutdownMode};
use super::validation::{validate_files, FileLimits, TOOL_DIR};
use crate::config::WorkspaceConfig;
use crate::error::{ForgeError, Result};
use crate::request::FileEntry;

/// An isolated directory holding one job's staged files and build outputs.
///
/// Layout:
/// ```text
/// {scratch_root}/job-{uuid}/
/// ├── <staged files, as given>
/// ├── .forge/<tool>/   intermediates, never staged into
/// └── <artifact>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    id: Uuid,
    root: PathBuf,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a `/`-separated relative path inside the workspace.
    pub fn path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|seg| !seg.is_empty())
            .fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    /// Private scratch directory for one toolchain's intermediates.
    pub fn tool_dir(&self, tool: &str) -> PathBuf {
        self.root.join(TOOL_DIR).join(tool)
    }
}

/// Creates, fills and removes workspaces under one scratch root.
///
/// The manager is the only component that writes staged files or deletes
/// workspace trees.
pub struct WorkspaceManager {
    scratch_root: PathBuf,
    limits: FileLimits,
    scheduler: CleanupScheduler,
}

impl WorkspaceManager {
    pub fn new(config: &WorkspaceConfig) -> Result<Self> {
        let scheduler = CleanupScheduler::start()
            .map_err(|e| ForgeError::resource(&config.scratch_root, e))?;

        Ok(Self {
            scratch_root: config.scratch_root.clone(),
            limits: FileLimits {
                max_file_size: config.max_file_size,
                max_files: config.max_files,
            },
            scheduler,
        })
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    pub fn limits(&self) -> &FileLimits {
        &self.limits
    }

    /// Allocate a fresh, uniquely named workspace directory.
    pub fn create(&self) -> Result<Workspace> {
        fs::create_dir_all(&self.scratch_root)
            .map_err(|e| ForgeError::resource(&self.scratch_root, e))?;

        let id = Uuid::new_v4();
        let root = self.scratch_root.join(format!("job-{}", id));
        // create_dir (not create_dir_all) so a name collision is an error
        fs::create_dir(&root).map_err(|e| ForgeError::resource(&root, e))?;

        tracing::debug!(workspace = %root.display(), "Created workspace");
        Ok(Workspace { id, root })
    }

    /// Validate `files` and write them into `workspace`.
    ///
    /// Nothing is written unless the whole set validates. If a write fails
    /// part-way, files and directories already created are removed again.
    pub fn write_files(&self, workspace: &Workspace, files: &[FileEntry]) -> Result<()> {
        validate_files(files, &self.limits)?;

        let mut written: Vec<PathBuf> = Vec::with_capacity(files.len());
        let mut created_dirs: Vec<PathBuf> = Vec::new();
        for file in files {
            let target = workspace.path(&file.path);
            created_dirs.extend(missing_parents(&workspace.root, &target));
            if let Err(e) = write_one(&target, &file.content) {
                roll_back(&written, &created_dirs);
                return Err(ForgeError::resource(target, e));
            }
            written.push(target);
        }

        tracing::debug!(
            workspace = %workspace.root.display(),
            count = written.len(),
            "Staged files"
        );
        Ok(())
    }

    /// Recursively remove a workspace. Best-effort and idempotent.
    ///
    /// Returns true if a directory was actually removed.
    pub fn destroy(&self, workspace: &Workspace) -> bool {
        remove_tree(&self.scratch_root, &workspace.root)
    }

    /// Remove `workspace` once `delay` has elapsed, then call `on_removed`.
    pub fn schedule_cleanup<F>(
        &self,
        workspace: Workspace,
        delay: Duration,
        on_removed: F,
    ) -> CleanupHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let scratch_root = self.scratch_root.clone();
        tracing::debug!(
            workspace = %workspace.root.display(),
            delay_secs = delay.as_secs_f64(),
            "Scheduled workspace cleanup"
        );
        self.scheduler.schedule(delay, move || {
            remove_tree(&scratch_root, &workspace.root);
            on_removed();
        })
    }

    /// Cleanups scheduled but not yet run.
    pub fn pending_cleanups(&self) -> usize {
        self.scheduler.pending()
    }

    /// Stop the cleanup scheduler.
    pub fn shutdown(self, mode: ShutdownMode) {
        self.scheduler.shutdown(mode);
    }
}

/// Ancestors of `target` below `root` that do not exist yet, outermost first.
fn missing_parents(root: &Path, target: &Path) -> Vec<PathBuf> {
    let mut missing: Vec<PathBuf> = target
        .ancestors()
        .skip(1)
        .take_while(|dir| *dir != root && !dir.exists())
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    missing
}

fn roll_back(files: &[PathBuf], dirs: &[PathBuf]) {
    for path in files {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to remove partially staged file {}: {}", path.display(), e);
        }
    }
    for dir in dirs.iter().rev() {
        if let Err(e) = fs::remove_dir(dir) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove staged directory {}: {}", dir.display(), e);
            }
        }
    }
}

fn write_one(target: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)
}

fn remove_tree(scratch_root: &Path, root: &Path) -> bool {
    if !root.starts_with(scratch_root) || root == scratch_root {
        tracing::warn!(
            "Refusing to remove {} outside scratch root {}",
            root.display(),
            scratch_root.display()
        );
        return false;
    }

    match fs::remove_dir_all(root) {
        Ok(()) => {
            tracing::info!("Cleaned up workspace: {}", root.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Workspace already removed: {}", root.display());
            false
        }
        Err(e) => {
            tracing::warn!("Failed to cleanup {}: {}", root.display(), e);
            false
        }
    }
}
