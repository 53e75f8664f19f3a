//! Live-versus-queue diff engine.
//!
//! Reconciles a staged queue row with its published live row and reports the
//! field-level deltas a curator has to sign off before release. The store
//! loads the rows; everything here is pure.

use std::{collections::BTreeMap, fmt};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::{
  review::ReviewRecord,
  variant::{Variant, VariantId, is_blank},
};

// ─── Result types ────────────────────────────────────────────────────────────

/// One side of a field change as shown to a curator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
  /// Nothing on this side (new variant, or an empty value).
  None,
  Value(String),
}

impl fmt::Display for Shown {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Shown::None => f.write_str("None"),
      Shown::Value(v) => f.write_str(v),
    }
  }
}

impl Serialize for Shown {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Shown::None => serializer.serialize_none(),
      Shown::Value(v) => serializer.serialize_str(v),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
  pub live_value:  Shown,
  pub queue_value: Shown,
}

/// Unreleased changes for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
  pub id:      VariantId,
  /// `gene|protein|variation` of the row the diff was taken from.
  pub name:    String,
  /// The live row is a ghost: this variant has never been released.
  pub is_new:  bool,
  /// Changed fields in schema order.
  pub changes: IndexMap<&'static str, FieldChange>,
}

/// Per-id diff results, ordered by id.
pub type UnreleasedChanges = BTreeMap<VariantId, DiffResult>;

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Diff a staged row against its live row.
///
/// Returns `None` when nothing survives the comparison and the review (if
/// any) does not need attention on its own.
pub fn diff_staged(
  queue:  &Variant,
  live:   Option<&Variant>,
  review: Option<&ReviewRecord>,
) -> Option<DiffResult> {
  let is_new = live.is_none_or(Variant::is_ghost);
  let mut changes = IndexMap::new();

  for (field, queue_value) in queue.fields() {
    let live_value = live.map(|l| l.get(field));
    if live_value == Some(queue_value) {
      continue;
    }
    if let Some(change) = field_change(is_new, live_value, queue_value) {
      changes.insert(field, change);
    }
  }

  let needs_attention = review.is_some_and(ReviewRecord::needs_attention);
  if changes.is_empty() && !needs_attention {
    return None;
  }

  Some(DiffResult { id: queue.id, name: queue.label(), is_new, changes })
}

/// Collapse the per-variant results; `None` when nothing is unreleased.
pub fn collect(results: impl IntoIterator<Item = DiffResult>) -> Option<UnreleasedChanges> {
  let map: UnreleasedChanges = results.into_iter().map(|r| (r.id, r)).collect();
  (!map.is_empty()).then_some(map)
}

/// `live_value` is `None` when the live row is absent altogether.
fn field_change(
  is_new:      bool,
  live_value:  Option<Option<&str>>,
  queue_value: Option<&str>,
) -> Option<FieldChange> {
  let queue_shown = match queue_value {
    Some(v) if !v.is_empty() => Shown::Value(v.to_owned()),
    _ => Shown::None,
  };

  let Some(live_value) = live_value.filter(|_| !is_new) else {
    // New variant or field missing from live: nothing to compare against.
    return match queue_shown {
      Shown::None => None,
      shown => Some(FieldChange { live_value: Shown::None, queue_value: shown }),
    };
  };

  if is_blank(queue_value) && is_blank(live_value) {
    return None;
  }
  let live_shown = match live_value {
    Some(v) if !v.is_empty() => Shown::Value(v.to_owned()),
    _ => Shown::None,
  };
  Some(FieldChange { live_value: live_shown, queue_value: queue_shown })
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn released(id: VariantId) -> Variant {
    let mut v = Variant::ghost(id);
    v.set("variation", Some("chr13:20763612:C>T".into()));
    v.set("hgvs_nucleotide_change", Some("c.101T>C".into()));
    v.set("gene", Some("GJB2".into()));
    v.set("pathogenicity", Some("Likely pathogenic".into()));
    v.set("pubmed_id", Some("123".into()));
    v
  }

  fn review(id: VariantId) -> ReviewRecord {
    let now = Utc::now();
    ReviewRecord {
      variant_id:             id,
      confirmed_for_release:  false,
      scheduled_for_deletion: false,
      informatics_comments:   None,
      created:                now,
      updated:                now,
    }
  }

  #[test]
  fn identical_rows_without_attention_are_omitted() {
    let live = released(1);
    let queue = live.clone();
    assert!(diff_staged(&queue, Some(&live), Some(&review(1))).is_none());
    assert!(diff_staged(&queue, Some(&live), None).is_none());
  }

  #[test]
  fn ghost_queue_matching_ghost_live_surfaces_only_with_comments() {
    let live = Variant::ghost(7);
    let queue = Variant::ghost(7);
    assert!(diff_staged(&queue, Some(&live), Some(&review(7))).is_none());

    let mut commented = review(7);
    commented.informatics_comments = Some("please check".into());
    let result = diff_staged(&queue, Some(&live), Some(&commented)).unwrap();
    assert!(result.changes.is_empty());
    assert!(result.is_new);
  }

  #[test]
  fn edited_field_shows_both_sides() {
    let live = released(2);
    let mut queue = live.clone();
    queue.set("pubmed_id", Some("456".into()));

    let result = diff_staged(&queue, Some(&live), None).unwrap();
    assert!(!result.is_new);
    assert_eq!(result.changes.len(), 1);
    let change = &result.changes["pubmed_id"];
    assert_eq!(change.live_value, Shown::Value("123".into()));
    assert_eq!(change.queue_value, Shown::Value("456".into()));
  }

  #[test]
  fn cleared_field_shows_none_on_queue_side() {
    let live = released(3);
    let mut queue = live.clone();
    queue.set("pubmed_id", None);

    let result = diff_staged(&queue, Some(&live), None).unwrap();
    let change = &result.changes["pubmed_id"];
    assert_eq!(change.live_value, Shown::Value("123".into()));
    assert_eq!(change.queue_value, Shown::None);
  }

  #[test]
  fn filled_field_shows_none_on_live_side() {
    let live = released(4);
    let mut queue = live.clone();
    queue.set("disease", Some("DFNB1A".into()));

    let result = diff_staged(&queue, Some(&live), None).unwrap();
    let change = &result.changes["disease"];
    assert_eq!(change.live_value, Shown::None);
    assert_eq!(change.queue_value, Shown::Value("DFNB1A".into()));
  }

  #[test]
  fn null_versus_empty_string_is_not_a_change() {
    let mut live = released(5);
    live.set("disease", Some(String::new()));
    let mut queue = live.clone();
    queue.set("disease", None);
    assert!(diff_staged(&queue, Some(&live), None).is_none());
  }

  #[test]
  fn new_variant_lists_only_populated_queue_fields() {
    let live = Variant::ghost(6);
    let mut queue = Variant::ghost(6);
    queue.set("variation", Some("chr1:100:A>T".into()));
    queue.set("pathogenicity", Some("Unknown significance".into()));

    let result = diff_staged(&queue, Some(&live), None).unwrap();
    assert!(result.is_new);
    assert_eq!(
      result.changes.keys().copied().collect::<Vec<_>>(),
      vec!["variation", "pathogenicity"]
    );
    assert!(result.changes.values().all(|c| c.live_value == Shown::None));
  }

  #[test]
  fn missing_live_row_is_treated_as_new() {
    let queue = released(8);
    let result = diff_staged(&queue, None, None).unwrap();
    assert!(result.is_new);
    assert_eq!(result.changes.len(), 5);
  }

  #[test]
  fn unchanged_row_surfaces_when_scheduled_for_deletion() {
    let live = released(9);
    assert!(diff_staged(&live, Some(&live), Some(&review(9))).is_none());

    let mut flagged = review(9);
    flagged.scheduled_for_deletion = true;
    let result = diff_staged(&live, Some(&live), Some(&flagged)).unwrap();
    assert!(result.changes.is_empty());
    assert_eq!(result.name, "GJB2|MISSING_PROTEIN_CHANGE|chr13:20763612:C>T");
  }

  #[test]
  fn collect_returns_none_when_empty() {
    assert!(collect(Vec::new()).is_none());
    let live = released(10);
    let mut queue = live.clone();
    queue.set("gene", Some("GJB6".into()));
    let all = collect(diff_staged(&queue, Some(&live), None)).unwrap();
    assert!(all.contains_key(&10));
  }
}
