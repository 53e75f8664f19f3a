//! Error type for `vardb-annotate`.

use thiserror::Error;
use uuid::Uuid;

use crate::tool::ToolError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vardb_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("dbSNP lookup returned {0}")]
  LookupStatus(reqwest::StatusCode),

  #[error("tool error: {0}")]
  Tool(#[from] ToolError),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("unknown pipeline job: {0}")]
  UnknownJob(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
