//! Build job orchestration.
//!
//! A job resolves its language, stages the file set into a fresh workspace,
//! dispatches to a toolchain and returns the artifact bytes. Whatever the
//! outcome, the workspace is handed to the cleanup scheduler on the way out.

use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Config;
use crate::error::{ForgeError, Result};
use crate::job::{JobId, JobRecord, JobState};
use crate::language::{detect, lookup, summarize, LanguageDescriptor, LANGUAGES};
use crate::request::{BuildRequest, FileEntry};
use crate::toolchain::{Artifact, BuildContext, ProcessRunner, ToolRunner, ToolchainRegistry};
use crate::workspace::{validate_project_name, ShutdownMode, Workspace, WorkspaceManager};

/// Cleaned job ids remembered for status queries.
const CLEANED_HISTORY: usize = 1024;

/// Live jobs plus the ids of recently cleaned ones.
#[derive(Default)]
struct Arena {
    live: HashMap<JobId, JobRecord>,
    cleaned: VecDeque<JobId>,
}

impl Arena {
    fn retire(&mut self, id: JobId) {
        if self.live.remove(&id).is_some() {
            if self.cleaned.len() == CLEANED_HISTORY {
                self.cleaned.pop_front();
            }
            self.cleaned.push_back(id);
        }
    }
}

type JobArena = Arc<Mutex<Arena>>;

fn lock(jobs: &Mutex<Arena>) -> MutexGuard<'_, Arena> {
    jobs.lock().unwrap_or_else(|e| e.into_inner())
}

/// Outcome of one job.
#[derive(Debug)]
pub struct JobReport {
    pub id: JobId,
    pub language: &'static str,
    pub project_name: String,
    pub result: Result<Artifact>,
}

/// Progress tracker for batches of builds.
pub struct BuildProgress {
    /// Total number of jobs in the batch.
    pub total: usize,
    completed: AtomicUsize,
    current: Mutex<Option<String>>,
}

impl BuildProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_current(&self, name: String) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(name);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Summary of a batch of builds.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub success_count: usize,
    pub failed_count: usize,
    /// Combined size of all produced artifacts.
    pub total_bytes: u64,
}

/// Schedules cleanup of a job's workspace when dropped.
///
/// Held across staging and building so every exit path, including a
/// panicking toolchain, hands the workspace to the scheduler.
struct CleanupGuard<'a> {
    manager: &'a WorkspaceManager,
    jobs: JobArena,
    id: JobId,
    delay: Duration,
    workspace: Workspace,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        let jobs = Arc::clone(&self.jobs);
        let id = self.id;
        self.manager
            .schedule_cleanup(self.workspace.clone(), self.delay, move || {
                lock(&jobs).retire(id);
            });
    }
}

/// Runs build jobs against a shared scratch root.
pub struct Orchestrator {
    config: Config,
    workspaces: WorkspaceManager,
    registry: ToolchainRegistry,
    runner: Arc<dyn ToolRunner>,
    jobs: JobArena,
}

impl Orchestrator {
    /// Create an orchestrator that runs real toolchain processes.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    /// Create an orchestrator that runs tools through `runner`.
    pub fn with_runner(config: Config, runner: Arc<dyn ToolRunner>) -> Result<Self> {
        config.validate()?;
        let workspaces = WorkspaceManager::new(&config.workspace)?;

        tracing::debug!(
            scratch_root = %workspaces.scratch_root().display(),
            "Orchestrator ready"
        );

        Ok(Self {
            config,
            workspaces,
            registry: ToolchainRegistry::new(),
            runner,
            jobs: Arc::new(Mutex::new(Arena::default())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Supported languages, in detection priority order.
    pub fn languages(&self) -> &'static [LanguageDescriptor] {
        LANGUAGES
    }

    /// The request's language hint if recognized, else the detected language.
    pub fn resolve_language(&self, request: &BuildRequest) -> &'static LanguageDescriptor {
        if let Some(hint) = request.language.as_deref() {
            match lookup(hint) {
                Some(language) => return language,
                None => tracing::warn!("Unknown language hint '{}', detecting instead", hint),
            }
        }
        detect(&request.files)
    }

    /// Build `request` and return the artifact.
    pub fn run_build(&self, request: &BuildRequest) -> Result<Artifact> {
        self.run_job(request).result
    }

    /// Build `request`, reporting the job identity alongside the result.
    pub fn run_job(&self, request: &BuildRequest) -> JobReport {
        let id = JobId::new();
        let language = self.resolve_language(request);
        let project_name = request
            .project_name
            .clone()
            .unwrap_or_else(|| self.config.build.default_project_name.clone());

        let span = tracing::info_span!("job", %id, language = language.id);
        let _enter = span.enter();

        let result = self.execute(id, language, &project_name, &request.files);
        match &result {
            Ok(artifact) => tracing::info!(
                artifact = %artifact.filename,
                bytes = artifact.len(),
                "Build succeeded"
            ),
            Err(e) => tracing::warn!(kind = e.kind(), "Build failed: {}", e),
        }

        JobReport {
            id,
            language: language.id,
            project_name,
            result,
        }
    }

    fn execute(
        &self,
        id: JobId,
        language: &'static LanguageDescriptor,
        project_name: &str,
        files: &[FileEntry],
    ) -> Result<Artifact> {
        validate_project_name(project_name).map_err(|e| ForgeError::Validation(vec![e]))?;
        tracing::debug!(summary = ?summarize(files), "Received file set");

        let workspace = self.workspaces.create()?;
        lock(&self.jobs)
            .live
            .insert(id, JobRecord::new(id, language.id, project_name));

        let guard = CleanupGuard {
            manager: &self.workspaces,
            jobs: Arc::clone(&self.jobs),
            id,
            delay: self.config.workspace.cleanup_delay(),
            workspace,
        };

        let result = self.stage_and_build(id, &guard.workspace, language, project_name, files);
        self.set_state(
            id,
            if result.is_ok() {
                JobState::Succeeded
            } else {
                JobState::Failed
            },
        );
        result
    }

    fn stage_and_build(
        &self,
        id: JobId,
        workspace: &Workspace,
        language: &'static LanguageDescriptor,
        project_name: &str,
        files: &[FileEntry],
    ) -> Result<Artifact> {
        self.workspaces.write_files(workspace, files)?;

        self.set_state(id, JobState::Building);
        let toolchain = self.registry.for_language(language.id);
        tracing::debug!(toolchain = toolchain.id(), "Dispatching build");

        let ctx = BuildContext {
            workspace,
            project_name,
            language,
            runner: self.runner.as_ref(),
            timeouts: &self.config.toolchain,
        };
        toolchain.build(&ctx)
    }

    fn set_state(&self, id: JobId, state: JobState) {
        if let Some(record) = lock(&self.jobs).live.get_mut(&id) {
            record.state = state;
        }
    }

    /// Build several requests concurrently on `parallelism` threads.
    ///
    /// Reports come back in request order.
    pub fn run_all(
        &self,
        requests: &[BuildRequest],
        parallelism: usize,
        progress: Option<Arc<BuildProgress>>,
    ) -> Vec<JobReport> {
        let run = |request: &BuildRequest| {
            if let Some(ref prog) = progress {
                prog.set_current(
                    request
                        .project_name
                        .clone()
                        .unwrap_or_else(|| self.config.build.default_project_name.clone()),
                );
            }
            let report = self.run_job(request);
            if let Some(ref prog) = progress {
                prog.increment();
            }
            report
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| requests.par_iter().map(run).collect()),
            Err(e) => {
                tracing::warn!("Could not start build pool, building sequentially: {}", e);
                requests.iter().map(run).collect()
            }
        }
    }

    /// Get summary statistics from reports.
    pub fn summarize(reports: &[JobReport]) -> BuildSummary {
        let mut summary = BuildSummary::default();

        for report in reports {
            match &report.result {
                Ok(artifact) => {
                    summary.success_count += 1;
                    summary.total_bytes += artifact.len() as u64;
                }
                Err(_) => summary.failed_count += 1,
            }
        }

        summary
    }

    /// Current state of a job.
    ///
    /// Cleaned jobs are only remembered for a while; `None` means the id is
    /// unknown or long gone.
    pub fn status(&self, id: JobId) -> Option<JobState> {
        let arena = lock(&self.jobs);
        match arena.live.get(&id) {
            Some(record) => Some(record.state),
            None if arena.cleaned.contains(&id) => Some(JobState::Cleaned),
            None => None,
        }
    }

    /// Jobs whose workspace still exists.
    pub fn active_jobs(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<_> = lock(&self.jobs).live.values().cloned().collect();
        jobs.sort_by_key(|r| std::cmp::Reverse(r.elapsed()));
        jobs
    }

    /// Cleanups scheduled but not yet run.
    pub fn pending_cleanups(&self) -> usize {
        self.workspaces.pending_cleanups()
    }

    /// Stop accepting work and drain pending cleanups.
    pub fn shutdown(self, mode: ShutdownMode) {
        tracing::debug!(?mode, pending = self.pending_cleanups(), "Shutting down");
        self.workspaces.shutdown(mode);
    }
}
