//! Export job identifiers and on-disk job directories.
//!
//! Each export lands in `<output_dir>/<job_id>/ecuador_<YYYYmmdd_HHMMSS>.<ext>`.
//! Artifacts are written under a `.partial` name and renamed when
//! complete, so a job directory without a finished artifact reads as
//! pending.

use chrono::NaiveDateTime;
use ecuterra_common::BoundingBox;
use ecuterra_export::{ExportArtifact, ExportFormat};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Length of a job id in hex characters.
pub const JOB_ID_LEN: usize = 16;

const ARTIFACT_PREFIX: &str = "ecuador_";
const PARTIAL_SUFFIX: &str = ".partial";

/// Stable id for a request: the same box, format and settings always map
/// to the same id.
pub fn job_id<S: Serialize>(
    bbox: &BoundingBox,
    format: ExportFormat,
    settings: &S,
) -> serde_json::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{:.6},{:.6},{:.6},{:.6}|{}|",
            bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon, format
        )
        .as_bytes(),
    );
    hasher.update(serde_json::to_vec(settings)?);
    let mut id = hex::encode(hasher.finalize());
    id.truncate(JOB_ID_LEN);
    Ok(id)
}

/// True if `id` has the shape produced by [`job_id`].
pub fn is_valid_job_id(id: &str) -> bool {
    id.len() == JOB_ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Artifact file name for a job finished at `timestamp`.
pub fn artifact_file_name(format: ExportFormat, timestamp: NaiveDateTime) -> String {
    format!(
        "{}{}.{}",
        ARTIFACT_PREFIX,
        timestamp.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Progress of an export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// No directory for this id.
    NotFound,
    /// Directory exists but holds no finished artifact.
    Pending,
    /// Finished; the newest artifact.
    Done(PathBuf),
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotFound => "not_found",
            JobStatus::Pending => "pending",
            JobStatus::Done(_) => "done",
        }
    }
}

/// Job directories under an output root.
#[derive(Debug, Clone)]
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.root.join(job_id)
    }

    /// Write `artifact` into the job directory and return its final path.
    pub fn store(
        &self,
        job_id: &str,
        artifact: &ExportArtifact,
        timestamp: NaiveDateTime,
    ) -> io::Result<PathBuf> {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir)?;

        let path = dir.join(artifact_file_name(artifact.format(), timestamp));
        let partial = path.with_extension(format!("{}{}", artifact.format().extension(), PARTIAL_SUFFIX));
        fs::write(&partial, artifact.as_bytes())?;
        fs::rename(&partial, &path)?;

        debug!(job_id, path = %path.display(), "Stored artifact");
        Ok(path)
    }

    /// Look up a job. Ids that [`job_id`] could not have produced are
    /// reported as not found.
    pub fn status(&self, job_id: &str) -> io::Result<JobStatus> {
        if !is_valid_job_id(job_id) {
            return Ok(JobStatus::NotFound);
        }
        let dir = self.job_dir(job_id);
        if !dir.is_dir() {
            return Ok(JobStatus::NotFound);
        }

        let mut finished: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_artifact = name.starts_with(ARTIFACT_PREFIX)
                && ExportFormat::ALL
                    .iter()
                    .any(|f| name.ends_with(&format!(".{}", f.extension())));
            if is_artifact {
                finished.push(path);
            }
        }

        // Timestamped names sort chronologically
        finished.sort();
        Ok(match finished.pop() {
            Some(path) => JobStatus::Done(path),
            None => JobStatus::Pending,
        })
    }
}
