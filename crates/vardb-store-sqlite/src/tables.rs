//! Injected table names.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Names of the tables the store reads and writes.
///
/// Lets several curation databases (or a staging copy) share one SQLite file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
  pub live:        String,
  pub queue:       String,
  pub reviews:     String,
  pub versions:    String,
  pub gene_counts: String,
  pub history:     String,
  pub expert:      String,
  pub activity:    String,
}

impl Default for TableNames {
  fn default() -> Self {
    Self {
      live:        "variations".into(),
      queue:       "variations_queue".into(),
      reviews:     "reviews".into(),
      versions:    "versions".into(),
      gene_counts: "variant_count".into(),
      history:     "variations_log".into(),
      expert:      "expert_curations".into(),
      activity:    "activity_log".into(),
    }
  }
}

impl TableNames {
  fn all(&self) -> [&str; 8] {
    [
      &self.live,
      &self.queue,
      &self.reviews,
      &self.versions,
      &self.gene_counts,
      &self.history,
      &self.expert,
      &self.activity,
    ]
  }

  /// Every name must be a plain SQL identifier, and no two may collide.
  pub fn validate(&self) -> Result<()> {
    let names = self.all();
    for (i, name) in names.iter().enumerate() {
      if !is_identifier(name) {
        return Err(Error::InvalidTableName((*name).to_owned()));
      }
      if names[..i].iter().any(|other| other.eq_ignore_ascii_case(name)) {
        return Err(Error::InvalidTableName(format!("{name} (used twice)")));
      }
    }
    Ok(())
  }
}

fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  chars
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
