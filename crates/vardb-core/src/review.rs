//! Review ledger, release versions and the per-gene count cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::variant::VariantId;

// ─── Review ledger ───────────────────────────────────────────────────────────

/// Staff-only review state for a staged variant. At most one per id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
  pub variant_id:             VariantId,
  pub confirmed_for_release:  bool,
  pub scheduled_for_deletion: bool,
  pub informatics_comments:   Option<String>,
  pub created:                DateTime<Utc>,
  pub updated:                DateTime<Utc>,
}

impl ReviewRecord {
  /// True when the review alone warrants a curator's attention: it carries
  /// informatics comments or schedules the variant for deletion.
  pub fn needs_attention(&self) -> bool {
    self.scheduled_for_deletion
      || self
        .informatics_comments
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty())
  }
}

/// Partial update applied by an upsert; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUpdate {
  pub confirmed_for_release:  Option<bool>,
  pub scheduled_for_deletion: Option<bool>,
  /// `Some(None)` clears the comments.
  pub informatics_comments:   Option<Option<String>>,
}

impl ReviewUpdate {
  pub fn confirm(mut self, confirmed: bool) -> Self {
    self.confirmed_for_release = Some(confirmed);
    self
  }

  pub fn schedule_deletion(mut self, scheduled: bool) -> Self {
    self.scheduled_for_deletion = Some(scheduled);
    self
  }

  pub fn comments(mut self, comments: Option<String>) -> Self {
    self.informatics_comments =
      Some(comments.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty()));
    self
  }
}

// ─── Versions ────────────────────────────────────────────────────────────────

/// Appended once per successful release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
  pub version:  u32,
  pub created:  DateTime<Utc>,
  pub updated:  DateTime<Utc>,
  /// Live rows after the release.
  pub variants: u64,
  /// Distinct non-null genes in the live table after the release.
  pub genes:    u64,
}

/// The bootstrap version: the only one at which an empty release is allowed.
pub const BOOTSTRAP_VERSION: u32 = 0;

/// One row of the derived gene-count cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneCount {
  pub gene:  String,
  pub count: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn review() -> ReviewRecord {
    let now = Utc::now();
    ReviewRecord {
      variant_id:             1,
      confirmed_for_release:  false,
      scheduled_for_deletion: false,
      informatics_comments:   None,
      created:                now,
      updated:                now,
    }
  }

  #[test]
  fn default_review_needs_no_attention() {
    assert!(!review().needs_attention());
  }

  #[test]
  fn comments_or_deletion_need_attention() {
    let mut r = review();
    r.informatics_comments = Some("check PMID".into());
    assert!(r.needs_attention());

    let mut r = review();
    r.informatics_comments = Some("   ".into());
    assert!(!r.needs_attention());

    let mut r = review();
    r.scheduled_for_deletion = true;
    assert!(r.needs_attention());
  }

  #[test]
  fn comments_update_trims_and_clears() {
    let u = ReviewUpdate::default().comments(Some("  ".into()));
    assert_eq!(u.informatics_comments, Some(None));
    let u = ReviewUpdate::default().comments(Some(" ok ".into())).confirm(true);
    assert_eq!(u.informatics_comments, Some(Some("ok".into())));
    assert_eq!(u.confirmed_for_release, Some(true));
  }
}
