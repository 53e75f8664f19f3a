//! The boundary between the store and the external annotation engine.
//!
//! Annotation failures form a closed set. Callers branch on the variant, never
//! on a numeric code, and every failure is recoverable per variant.

use thiserror::Error;

use crate::variant::FieldUpdates;

/// Field data produced by annotating one variant.
pub type AnnotationRecord = FieldUpdates;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
  #[error("annotation tool is not configured or cannot be found")]
  ToolNotConfigured,

  #[error("mutation type is not supported by the annotation tool")]
  UnsupportedMutationType,

  #[error("no matching reference sequence for this variant")]
  NoMatchingReference,

  #[error("annotation returned no data for this variant")]
  NoDataFound,

  /// Raised before the tool is invoked.
  #[error("invalid genomic position: {0:?}")]
  InvalidPosition(String),

  #[error("annotation scratch file error: {0}")]
  Io(String),
}

/// Anything that can turn a genomic position into field data.
///
/// Implementations block for the duration of one external invocation; the
/// store runs them off the async executor.
pub trait AnnotationSource: Send + Sync {
  fn annotate(&self, variation: &str) -> Result<AnnotationRecord, AnnotationError>;
}
