//! Job identity and lifecycle bookkeeping.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Identifier of one build job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Coarse job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Workspace is being created and files written.
    Staging,
    /// A toolchain is running.
    Building,
    Succeeded,
    Failed,
    /// The workspace has been removed.
    Cleaned,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, JobState::Staging | JobState::Building)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Staging => "staging",
            JobState::Building => "building",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cleaned => "cleaned",
        };
        f.write_str(s)
    }
}

/// Arena entry for a live job. Dropped when the job's workspace is cleaned.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub language: &'static str,
    pub project_name: String,
    pub state: JobState,
    started: Instant,
}

impl JobRecord {
    pub fn new(id: JobId, language: &'static str, project_name: impl Into<String>) -> Self {
        Self {
            id,
            language,
            project_name: project_name.into(),
            state: JobState::Staging,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_round_trips_through_display() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_job_id_serializes_as_plain_uuid() {
        let id = JobId::new();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", id));
        assert_eq!(serde_json::to_string(&JobState::Cleaned).unwrap(), "\"cleaned\"");
    }

    #[test]
    fn test_job_id_rejects_garbage() {
        assert!("not-a-job".parse::<JobId>().is_err());
    }

    #[test]
    fn test_state_display_and_finished() {
        assert_eq!(JobState::Building.to_string(), "building");
        assert!(JobState::Failed.is_finished());
        assert!(JobState::Cleaned.is_finished());
        assert!(!JobState::Staging.is_finished());
    }

    #[test]
    fn test_new_record_is_staging() {
        let record = JobRecord::new(JobId::new(), "go", "hello");
        assert_eq!(record.state, JobState::Staging);
        assert_eq!(record.project_name, "hello");
    }
}
