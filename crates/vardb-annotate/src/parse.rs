//! Parsing the annotation engine's output.

use vardb_core::{
  annotation::{AnnotationError, AnnotationRecord},
  schema::{FrequencySource, frequency_fields},
  variant::FieldUpdates,
};

/// Marker the engine writes to its error log for variants it cannot model.
pub(crate) const UNSUPPORTED_MUTATION_MARKER: &str = "ERROR_NOT_SUPPORTED_MUTATION_TYPE";
/// Marker the engine writes when no RefSeq transcript matches the position.
pub(crate) const NO_MATCHING_REFSEQ_MARKER: &str = "ERROR_NO_MATCHING_REFSEQ";

const CURATION_NOTE: &str = "Manual curation in progress.";
const BASE_CREDIT: &str = "dbNSFP 2";

/// Map the contents of the engine's error log to a failure, if it names one.
pub(crate) fn classify_error_log(contents: &str) -> Option<AnnotationError> {
  if contents.contains(UNSUPPORTED_MUTATION_MARKER) {
    Some(AnnotationError::UnsupportedMutationType)
  } else if contents.contains(NO_MATCHING_REFSEQ_MARKER) {
    Some(AnnotationError::NoMatchingReference)
  } else {
    None
  }
}

/// Turn the engine's two-line output (a header of column names and one row of
/// tab-separated values) into field data.
///
/// `.` and empty cells become NULL. Columns the schema does not know are
/// ignored. Anything short of a header and a data row is
/// [`AnnotationError::NoDataFound`].
pub fn parse_output(contents: &str) -> Result<AnnotationRecord, AnnotationError> {
  let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
  let (Some(header), Some(row)) = (lines.next(), lines.next()) else {
    return Err(AnnotationError::NoDataFound);
  };

  let mut record = FieldUpdates::new();
  for (key, value) in header.split('\t').zip(row.split('\t')) {
    let value = match value.trim() {
      "." | "" => None,
      v => Some(v),
    };
    record.insert(key.trim(), value);
  }

  if record.iter().all(|(_, v)| v.is_none()) {
    return Err(AnnotationError::NoDataFound);
  }
  Ok(record)
}

/// The provenance note stored in `comments`: one credit per enabled frequency
/// source that contributed a value, then the prediction database.
pub fn credit_comments(record: &AnnotationRecord, enabled: &[FrequencySource]) -> String {
  let mut credits: Vec<&str> = FrequencySource::ALL
    .into_iter()
    .filter(|source| enabled.contains(source))
    .filter(|source| frequency_fields(*source).any(|f| record.get(f).is_some()))
    .map(FrequencySource::credit)
    .collect();
  credits.push(BASE_CREDIT);

  format!("{CURATION_NOTE} Record generated from: {}.", credits.join(", "))
}
