//! Error type for `vardb-store-sqlite`.

use thiserror::Error;
use vardb_core::{annotation::AnnotationError, variant::VariantId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vardb_core::Error),

  /// Passed through unchanged from the annotation source.
  #[error("annotation error: {0}")]
  Annotation(#[from] AnnotationError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("stored value could not be decoded: {0}")]
  Decode(String),

  #[error("variant {0} already exists")]
  DuplicateVariant(String),

  #[error("variant not found: {0}")]
  VariantNotFound(VariantId),

  /// Only the bootstrap version may be released with nothing staged.
  #[error("nothing to release for version {version}")]
  NothingToRelease { version: u32 },

  #[error("table {table} does not match the variant schema: {detail}")]
  SchemaMismatch { table: String, detail: String },

  #[error("invalid table name: {0:?}")]
  InvalidTableName(String),

  #[error("annotation task failed: {0}")]
  Blocking(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
