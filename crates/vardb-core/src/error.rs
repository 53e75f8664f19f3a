//! Error types for `vardb-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A position string that is not `<chrom>:<position>:<ref><op><alt>`.
  #[error("invalid genomic position format: {0:?}")]
  InvalidFormat(String),

  #[error("unknown pathogenicity class: {0:?}")]
  UnknownPathogenicity(String),

  #[error("row has {found} values, schema expects {expected}")]
  FieldCount { expected: usize, found: usize },

  #[error("malformed expert curation on line {line}: {detail}")]
  MalformedOverride { line: u64, detail: String },

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
