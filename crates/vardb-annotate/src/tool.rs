//! The annotation engine as an external command.

use std::{
  io,
  path::{Path, PathBuf},
  process::Command,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
  #[error("tool not found at {0}")]
  NotFound(PathBuf),

  #[error("failed to launch {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source:  io::Error,
  },

  #[error("{program} exited with {status}: {stderr}")]
  Failed {
    program: String,
    status:  String,
    stderr:  String,
  },

  #[error("i/o error: {0}")]
  Io(#[from] io::Error),
}

/// Runs the annotation engine once: read one position from `input`, write a
/// header line and a data line to `output`.
///
/// The engine reports rejected variants in a sibling `<input stem>.error_log`
/// file rather than through its exit status.
pub trait AnnotationTool: Send + Sync {
  fn run(&self, input: &Path, output: &Path) -> Result<(), ToolError>;
}

/// Invokes a script through an interpreter:
/// `<interpreter> <script> --progress --in <input> --out <output>`.
#[derive(Debug, Clone)]
pub struct CommandTool {
  pub interpreter: String,
  pub script:      PathBuf,
}

impl CommandTool {
  pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
    Self { interpreter: interpreter.into(), script: script.into() }
  }
}

impl AnnotationTool for CommandTool {
  fn run(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
    if !self.script.is_file() {
      return Err(ToolError::NotFound(self.script.clone()));
    }

    let result = Command::new(&self.interpreter)
      .arg(&self.script)
      .arg("--progress")
      .arg("--in")
      .arg(input)
      .arg("--out")
      .arg(output)
      .output()
      .map_err(|source| ToolError::Spawn {
        program: self.interpreter.clone(),
        source,
      })?;

    tracing::debug!(
      stdout = %String::from_utf8_lossy(&result.stdout).trim(),
      "annotation tool finished"
    );

    if !result.status.success() {
      return Err(ToolError::Failed {
        program: self.script.display().to_string(),
        status:  result.status.to_string(),
        stderr:  String::from_utf8_lossy(&result.stderr).trim().to_owned(),
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_script_is_not_found() {
    let tool = CommandTool::new("ruby", "/nonexistent/kafeen.rb");
    let err = tool
      .run(Path::new("/tmp/in"), Path::new("/tmp/out"))
      .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
  }

  #[test]
  fn unlaunchable_interpreter_is_a_spawn_error() {
    let script = tempfile::NamedTempFile::new().unwrap();
    let tool = CommandTool::new("/nonexistent/interpreter", script.path());
    let err = tool
      .run(Path::new("/tmp/in"), Path::new("/tmp/out"))
      .unwrap_err();
    assert!(matches!(err, ToolError::Spawn { .. }));
  }
}
