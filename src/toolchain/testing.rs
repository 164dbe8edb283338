//! Test doubles for toolchain tests.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

use super::adapter::BuildContext;
use super::runner::{Invocation, ToolOutput, ToolRunner};
use crate::config::{ToolchainConfig, WorkspaceConfig};
use crate::error::Result;
use crate::language::lookup;
use crate::request::FileEntry;
use crate::workspace::{Workspace, WorkspaceManager};

type Handler = Box<dyn Fn(&Invocation) -> Result<ToolOutput> + Send + Sync>;

/// Records invocations and answers them with a closure.
pub struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    handler: Handler,
}

impl FakeRunner {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Invocation) -> Result<ToolOutput> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Succeeds and writes a placeholder at the path given after `-o`,
    /// the way compilers produce their output file.
    pub fn producing_output() -> Self {
        Self::new(|inv| {
            if let Some(out) = arg_after(inv, "-o") {
                std::fs::write(out, b"\x7fELF fake").unwrap();
            }
            Ok(ToolOutput::default())
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        (self.handler)(invocation)
    }
}

/// The argument following `flag`, as a path.
pub fn arg_after(inv: &Invocation, flag: &str) -> Option<PathBuf> {
    let args = inv.get_args();
    args.iter()
        .position(|a| a.as_os_str() == OsStr::new(flag))
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

/// A workspace with `files` staged into it.
pub struct Staged {
    _tmp: TempDir,
    _manager: WorkspaceManager,
    pub workspace: Workspace,
    pub timeouts: ToolchainConfig,
}

impl Staged {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let tmp = TempDir::new().unwrap();
        let config = WorkspaceConfig {
            scratch_root: tmp.path().join("scratch"),
            ..Default::default()
        };
        let manager = WorkspaceManager::new(&config).unwrap();
        let workspace = manager.create().unwrap();
        let entries: Vec<_> = files.iter().map(|(p, c)| FileEntry::new(*p, *c)).collect();
        if !entries.is_empty() {
            manager.write_files(&workspace, &entries).unwrap();
        }
        Self {
            _tmp: tmp,
            _manager: manager,
            workspace,
            timeouts: ToolchainConfig::default(),
        }
    }

    pub fn context<'a>(
        &'a self,
        language: &str,
        project_name: &'a str,
        runner: &'a dyn ToolRunner,
    ) -> BuildContext<'a> {
        BuildContext {
            workspace: &self.workspace,
            project_name,
            language: lookup(language).unwrap(),
            runner,
            timeouts: &self.timeouts,
        }
    }
}
