//! The multi-gene bulk annotation pipeline as a detached background job.
//!
//! A job runs the external toolchain through a [`PipelineTool`], which leaves
//! a tab-separated file behind. The runner records the outcome as
//! `<work_dir>/<job>.status.json`, so a later process can poll a job it did
//! not start; in-memory state lasts only while the job runs. Tool chatter goes
//! to `<work_dir>/<job>.log`.

use std::{
  collections::HashMap,
  fs::{self, File, OpenOptions},
  io::{Read, Write},
  path::{Path, PathBuf},
  process::{Command, Stdio},
  sync::{Arc, Mutex},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;
use vardb_core::{schema::BULK_COLUMNS, variant::FieldUpdates};

use crate::{Error, Result, tool::ToolError};

pub type JobId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
  Running,
  Succeeded { output: PathBuf, rows: usize },
  Failed { reason: String },
}

/// Everything one pipeline run needs to know.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
  pub job:        JobId,
  pub genes_file: PathBuf,
  pub work_dir:   PathBuf,
  pub log_path:   PathBuf,
}

/// The external toolchain. Blocks until done; returns the path of the TSV
/// it produced.
pub trait PipelineTool: Send + Sync + 'static {
  fn run(&self, request: &PipelineRequest) -> Result<PathBuf, ToolError>;
}

// ─── Shell toolchain ─────────────────────────────────────────────────────────

/// Runs `<interpreter> <script> <genes_file> <job>` in the work directory,
/// expecting it to leave `<job>.vcf.gz` behind, then decompresses that and
/// converts it with `<converter> <job>.vcf > <job>.tsv`.
#[derive(Debug, Clone)]
pub struct ShellPipeline {
  pub interpreter: String,
  pub script:      PathBuf,
  pub converter:   PathBuf,
}

impl ShellPipeline {
  fn stage(
    &self,
    command: &mut Command,
    request: &PipelineRequest,
    stdout: Option<File>,
  ) -> Result<(), ToolError> {
    let program = format!("{:?}", command.get_program());
    let log = OpenOptions::new().create(true).append(true).open(&request.log_path)?;
    let stdout = match stdout {
      Some(f) => Stdio::from(f),
      None => Stdio::from(log.try_clone()?),
    };

    let status = command
      .current_dir(&request.work_dir)
      .stdout(stdout)
      .stderr(Stdio::from(log))
      .status()
      .map_err(|source| ToolError::Spawn { program: program.clone(), source })?;

    if !status.success() {
      return Err(ToolError::Failed {
        program,
        status: status.to_string(),
        stderr: format!("see {}", request.log_path.display()),
      });
    }
    Ok(())
  }
}

impl PipelineTool for ShellPipeline {
  fn run(&self, request: &PipelineRequest) -> Result<PathBuf, ToolError> {
    for path in [&self.script, &self.converter] {
      if !path.is_file() {
        return Err(ToolError::NotFound(path.clone()));
      }
    }

    let job = request.job.simple().to_string();
    self.stage(
      Command::new(&self.interpreter)
        .arg(&self.script)
        .arg(&request.genes_file)
        .arg(&job),
      request,
      None,
    )?;

    self.stage(
      Command::new("gunzip").arg("-f").arg(format!("{job}.vcf.gz")),
      request,
      None,
    )?;

    let tsv = request.work_dir.join(format!("{job}.tsv"));
    self.stage(
      Command::new(&self.converter).arg(format!("{job}.vcf")),
      request,
      Some(File::create(&tsv)?),
    )?;
    Ok(tsv)
  }
}

// ─── Runner ──────────────────────────────────────────────────────────────────

/// Submits pipeline jobs and answers status queries.
///
/// Cheap to clone; job state is shared.
pub struct PipelineRunner<T> {
  tool:     Arc<T>,
  work_dir: PathBuf,
  jobs:     Arc<Mutex<HashMap<JobId, JobStatus>>>,
  handles:  Arc<Mutex<HashMap<JobId, JoinHandle<JobStatus>>>>,
}

impl<T> Clone for PipelineRunner<T> {
  fn clone(&self) -> Self {
    Self {
      tool:     self.tool.clone(),
      work_dir: self.work_dir.clone(),
      jobs:     self.jobs.clone(),
      handles:  self.handles.clone(),
    }
  }
}

impl<T: PipelineTool> PipelineRunner<T> {
  pub fn new(tool: T, work_dir: impl Into<PathBuf>) -> Self {
    Self {
      tool:     Arc::new(tool),
      work_dir: work_dir.into(),
      jobs:     Arc::default(),
      handles:  Arc::default(),
    }
  }

  pub fn log_path(&self, job: JobId) -> PathBuf {
    self.work_dir.join(format!("{}.log", job.simple()))
  }

  fn status_path(&self, job: JobId) -> PathBuf {
    self.work_dir.join(format!("{}.status.json", job.simple()))
  }

  /// Start a job on the blocking pool and return immediately. Must be called
  /// from within a tokio runtime.
  pub fn submit(&self, genes_file: impl Into<PathBuf>) -> Result<JobId> {
    let job = Uuid::new_v4();
    let request = PipelineRequest {
      job,
      genes_file: genes_file.into(),
      work_dir: self.work_dir.clone(),
      log_path: self.log_path(job),
    };

    fs::create_dir_all(&self.work_dir)?;
    record(&self.jobs, &self.status_path(job), job, JobStatus::Running)?;

    let tool = self.tool.clone();
    let jobs = self.jobs.clone();
    let handles = self.handles.clone();
    let status_path = self.status_path(job);

    // Held until the handle is stored, so the task's own eviction runs after
    // the insert.
    let mut pending = lock(&self.handles);
    let handle = tokio::task::spawn_blocking(move || {
      let status = execute(tool.as_ref(), &request);
      match persist(&status_path, &status) {
        // The artifact answers `status` from here on.
        Ok(()) => {
          lock(&jobs).remove(&job);
        }
        Err(e) => {
          tracing::warn!(%job, error = %e, "could not persist pipeline status");
          lock(&jobs).insert(job, status.clone());
        }
      }
      lock(&handles).remove(&job);
      status
    });
    pending.insert(job, handle);
    drop(pending);

    tracing::info!(%job, "submitted bulk annotation job");
    Ok(job)
  }

  /// Current status of `job`, from memory or from its status artifact.
  pub fn status(&self, job: JobId) -> Result<JobStatus> {
    if let Some(status) = lock(&self.jobs).get(&job) {
      return Ok(status.clone());
    }
    match fs::read_to_string(self.status_path(job)) {
      Ok(json) => Ok(serde_json::from_str(&json)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::UnknownJob(job)),
      Err(e) => Err(e.into()),
    }
  }

  /// Wait for a job submitted by this runner to finish.
  pub async fn wait(&self, job: JobId) -> Result<JobStatus> {
    let handle = lock(&self.handles).remove(&job);
    match handle {
      Some(handle) => Ok(handle.await.unwrap_or_else(|e| JobStatus::Failed {
        reason: format!("job task aborted: {e}"),
      })),
      None => self.status(job),
    }
  }
}

fn execute<T: PipelineTool>(tool: &T, request: &PipelineRequest) -> JobStatus {
  append_log(&request.log_path, "pipeline started");
  let status = match tool.run(request) {
    Ok(output) => match File::open(&output).map_err(Error::from).and_then(read_queue_tsv) {
      Ok(rows) => JobStatus::Succeeded { output, rows: rows.len() },
      Err(e) => JobStatus::Failed { reason: format!("unreadable output: {e}") },
    },
    Err(e) => JobStatus::Failed { reason: e.to_string() },
  };

  match &status {
    JobStatus::Succeeded { rows, .. } => {
      tracing::info!(job = %request.job, rows, "bulk annotation job finished");
      append_log(&request.log_path, &format!("pipeline finished: {rows} rows"));
    }
    JobStatus::Failed { reason } => {
      tracing::warn!(job = %request.job, reason, "bulk annotation job failed");
      append_log(&request.log_path, &format!("pipeline failed: {reason}"));
    }
    JobStatus::Running => {}
  }
  status
}

fn record(
  jobs: &Mutex<HashMap<JobId, JobStatus>>,
  path: &Path,
  job: JobId,
  status: JobStatus,
) -> Result<()> {
  persist(path, &status)?;
  lock(jobs).insert(job, status);
  Ok(())
}

fn persist(path: &Path, status: &JobStatus) -> Result<()> {
  fs::write(path, serde_json::to_vec_pretty(status)?)?;
  Ok(())
}

fn append_log(path: &Path, line: &str) {
  let written = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .and_then(|mut f| writeln!(f, "[{}] {line}", Utc::now().to_rfc3339()));
  if let Err(e) = written {
    tracing::warn!(path = %path.display(), error = %e, "could not write pipeline log");
  }
}

/// A poisoned map only means another job panicked mid-insert; the data is
/// still usable.
fn lock<V>(m: &Mutex<HashMap<JobId, V>>) -> std::sync::MutexGuard<'_, HashMap<JobId, V>> {
  m.lock().unwrap_or_else(|e| e.into_inner())
}

// ─── TSV ─────────────────────────────────────────────────────────────────────

/// Read the pipeline's TSV (one header line, then rows in [`BULK_COLUMNS`]
/// order). `\N`, `.` and empty cells are NULL. Rows without a variation are
/// skipped.
pub fn read_queue_tsv<R: Read>(reader: R) -> Result<Vec<FieldUpdates>> {
  let mut rdr = csv::ReaderBuilder::new()
    .delimiter(b'\t')
    .has_headers(true)
    .flexible(true)
    .quoting(false)
    .from_reader(reader);

  let mut rows = Vec::new();
  for (line, record) in rdr.records().enumerate() {
    let record = record?;
    let row = FieldUpdates::sanitize(BULK_COLUMNS.iter().zip(record.iter()).map(
      |(column, cell)| {
        let value = match cell.trim() {
          "\\N" | "." | "" => None,
          v => Some(v),
        };
        (*column, value)
      },
    ));

    if row.get("variation").is_none() {
      tracing::warn!(line = line + 2, "skipping bulk row without a variation");
      continue;
    }
    rows.push(row);
  }
  Ok(rows)
}
