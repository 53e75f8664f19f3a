//! Single-variant annotation through the external engine.

use std::{
  fs,
  path::{Path, PathBuf},
};

use uuid::Uuid;
use vardb_core::{
  annotation::{AnnotationError, AnnotationRecord, AnnotationSource},
  position,
  schema::FrequencySource,
};

use crate::{
  parse::{classify_error_log, credit_comments, parse_output},
  tool::{AnnotationTool, ToolError},
};

/// Implements [`AnnotationSource`] on top of an [`AnnotationTool`].
///
/// Each call gets its own scratch directory under `work_dir`, removed when
/// the call returns whatever the outcome.
#[derive(Debug, Clone)]
pub struct AnnotationGateway<T> {
  tool:        T,
  work_dir:    PathBuf,
  frequencies: Vec<FrequencySource>,
}

impl<T: AnnotationTool> AnnotationGateway<T> {
  pub fn new(tool: T, work_dir: impl Into<PathBuf>, frequencies: Vec<FrequencySource>) -> Self {
    Self { tool, work_dir: work_dir.into(), frequencies }
  }

  fn run_in(&self, scratch: &Path, variation: &str) -> Result<AnnotationRecord, AnnotationError> {
    let tool_input =
      position::normalize_for_tool(variation).map_err(|e| AnnotationError::InvalidPosition(e.to_string()))?;

    let stem = Uuid::new_v4().simple().to_string();
    let input = scratch.join(format!("{stem}.in"));
    let output = scratch.join(format!("{stem}.out"));
    let error_log = scratch.join(format!("{stem}.error_log"));

    fs::write(&input, format!("{tool_input}\n")).map_err(io_error)?;

    match self.tool.run(&input, &output) {
      Ok(()) => {}
      Err(ToolError::NotFound(path)) => {
        tracing::warn!(path = %path.display(), "annotation tool missing");
        return Err(AnnotationError::ToolNotConfigured);
      }
      Err(e @ ToolError::Spawn { .. }) => {
        tracing::warn!(error = %e, "annotation tool could not be launched");
        return Err(AnnotationError::ToolNotConfigured);
      }
      // The engine's exit status is not authoritative; its error log and
      // output decide the outcome.
      Err(e) => tracing::warn!(error = %e, variation, "annotation tool reported failure"),
    }

    if let Ok(log) = fs::read_to_string(&error_log) {
      if let Some(err) = classify_error_log(&log) {
        return Err(err);
      }
    }

    let contents = match fs::read_to_string(&output) {
      Ok(c) => c,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AnnotationError::NoDataFound),
      Err(e) => return Err(io_error(e)),
    };

    let mut record = parse_output(&contents)?;
    let credits = credit_comments(&record, &self.frequencies);
    record.insert("comments", Some(credits.as_str()));
    Ok(record)
  }
}

impl<T: AnnotationTool> AnnotationSource for AnnotationGateway<T> {
  fn annotate(&self, variation: &str) -> Result<AnnotationRecord, AnnotationError> {
    // Reject malformed positions before touching the filesystem.
    position::normalize(variation).map_err(|e| AnnotationError::InvalidPosition(e.to_string()))?;

    if !self.work_dir.is_dir() {
      tracing::warn!(work_dir = %self.work_dir.display(), "annotation work directory missing");
      return Err(AnnotationError::ToolNotConfigured);
    }

    let scratch = tempfile::Builder::new()
      .prefix("annotate-")
      .tempdir_in(&self.work_dir)
      .map_err(io_error)?;

    let result = self.run_in(scratch.path(), variation);
    match &result {
      Ok(record) => tracing::info!(variation, fields = record.len(), "annotated variant"),
      Err(e) => tracing::info!(variation, error = %e, "annotation failed"),
    }
    result
  }
}

fn io_error(e: std::io::Error) -> AnnotationError { AnnotationError::Io(e.to_string()) }
