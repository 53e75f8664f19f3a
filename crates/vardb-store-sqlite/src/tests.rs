//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use vardb_core::{
  annotation::{AnnotationError, AnnotationRecord, AnnotationSource},
  expert::ExpertOverride,
  log::{Action, HistoryKind},
  review::ReviewUpdate,
  store::{CreateMode, CurationStore},
  variant::{FieldUpdates, RawFields, Tier, VariantId},
};

use crate::{Error, SqliteStore, TableNames};

const ACTOR: &str = "curator";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fields(pairs: &[(&str, &str)]) -> RawFields {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_owned(), Some((*v).to_owned())))
    .collect()
}

/// Annotation source returning a fixed record, or a fixed failure.
struct FakeAnnotator(Result<AnnotationRecord, AnnotationError>);

impl AnnotationSource for FakeAnnotator {
  fn annotate(&self, _variation: &str) -> Result<AnnotationRecord, AnnotationError> {
    self.0.clone()
  }
}

fn annotated(gene: &str) -> CreateMode {
  let mut record = FieldUpdates::new();
  record.insert("gene", Some(gene));
  record.insert("sift_pred", Some("D"));
  CreateMode::Annotated(Arc::new(FakeAnnotator(Ok(record))))
}

async fn create(s: &SqliteStore, variation: &str, gene: &str) -> VariantId {
  let data = fields(&[
    ("variation", variation),
    ("gene", gene),
    ("pathogenicity", "Unknown significance"),
  ]);
  s.create_variant(variation, CreateMode::ManualWithData { data, reimport: false }, ACTOR)
    .await
    .unwrap()
}

async fn confirm(s: &SqliteStore, id: VariantId) {
  s.update_review(id, ReviewUpdate::default().confirm(true), ACTOR)
    .await
    .unwrap();
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn custom_table_names_are_used() {
  let tables = TableNames { live: "vd_live".into(), queue: "vd_queue".into(), ..TableNames::default() };
  let s = SqliteStore::open_in_memory_with(tables).await.unwrap();
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  assert!(s.get_by_id(id, Tier::Queue).await.unwrap().is_some());
}

#[tokio::test]
async fn invalid_table_name_is_rejected_before_connecting() {
  let tables = TableNames { reviews: "reviews--".into(), ..TableNames::default() };
  let err = SqliteStore::open_in_memory_with(tables).await.err().unwrap();
  assert!(matches!(err, Error::InvalidTableName(_)));
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn annotated_create_stages_record_under_ghost_id() {
  let s = store().await;
  let id = s
    .create_variant("13:20763612:c>t", annotated("GJB2"), ACTOR)
    .await
    .unwrap();

  let live = s.get_by_id(id, Tier::Live).await.unwrap().unwrap();
  assert!(live.is_ghost());

  let queued = s.get_by_id(id, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(queued.variation(), Some("chr13:20763612:C>T"));
  assert_eq!(queued.gene(), Some("GJB2"));

  let review = s.get_review(id).await.unwrap().unwrap();
  assert!(!review.confirmed_for_release);
  assert!(!review.scheduled_for_deletion);
}

#[tokio::test]
async fn second_create_is_a_duplicate() {
  let s = store().await;
  s.create_variant("chr1:100:A>T", annotated("GJB2"), ACTOR)
    .await
    .unwrap();
  let err = s
    .create_variant("chr1:100:A>T", annotated("GJB2"), ACTOR)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateVariant(v) if v == "chr1:100:A>T"));
}

#[tokio::test]
async fn reimport_skips_duplicate_check() {
  let s = store().await;
  create(&s, "chr1:100:A>T", "GJB2").await;
  let data = fields(&[("variation", "chr1:100:A>T"), ("gene", "GJB2")]);
  let id = s
    .create_variant("chr1:100:A>T", CreateMode::ManualWithData { data, reimport: true }, ACTOR)
    .await
    .unwrap();
  assert!(id > 0);
}

#[tokio::test]
async fn manual_data_is_checked_under_its_own_variation() {
  let s = store().await;
  create(&s, "chr1:100:A>T", "GJB2").await;

  let data = fields(&[("variation", "1:100:a>t"), ("gene", "GJB2")]);
  let err = s
    .create_variant("chr9:1:A>T", CreateMode::ManualWithData { data, reimport: false }, ACTOR)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateVariant(v) if v == "chr1:100:A>T"));

  let staged = s.get_by_position("chr1:100", Tier::Queue, false).await.unwrap().unwrap();
  assert_eq!(staged.len(), 1);
  assert!(s.get_by_position("chr9:1", Tier::Queue, false).await.unwrap().is_none());
}

#[tokio::test]
async fn manual_blank_uses_default_classification() {
  let s = store().await;
  let id = s
    .create_variant("chrx:5:g>a", CreateMode::ManualBlank, ACTOR)
    .await
    .unwrap();
  let row = s.get_by_id(id, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(row.variation(), Some("chrX:5:G>A"));
  assert_eq!(row.get("pathogenicity"), Some("Unknown significance"));
  assert_eq!(row.get("comments"), Some("Manual curation in progress."));
}

#[tokio::test]
async fn annotation_failure_is_propagated_and_writes_nothing() {
  let s = store().await;
  let mode = CreateMode::Annotated(Arc::new(FakeAnnotator(Err(
    AnnotationError::NoMatchingReference,
  ))));
  let err = s.create_variant("chr1:1:A>G", mode, ACTOR).await.unwrap_err();
  assert!(matches!(err, Error::Annotation(AnnotationError::NoMatchingReference)));
  assert!(s.all_variants(Tier::Live).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_position_is_rejected() {
  let s = store().await;
  let err = s
    .create_variant("chr1:100", CreateMode::ManualBlank, ACTOR)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(_)));
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_by_id_prefers_queue_then_live() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;

  // Only in queue (live is a ghost).
  let row = s.get_by_id(id, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(row.gene(), Some("GJB2"));

  s.release(0, false, ACTOR).await.unwrap();

  // Only in live.
  let row = s.get_by_id(id, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(row.gene(), Some("GJB2"));

  // In neither.
  assert!(s.get_by_id(id + 100, Tier::Queue).await.unwrap().is_none());
}

#[tokio::test]
async fn position_lookup_exact_and_fuzzy() {
  let s = store().await;
  create(&s, "chr13:20796839:C>T", "GJB2").await;
  create(&s, "chr13:207:A>G", "GJB2").await;

  let exact = s
    .get_by_position("chr13:207", Tier::Queue, false)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(exact.len(), 1);
  assert_eq!(exact[0].variation(), Some("chr13:207:A>G"));

  let fuzzy = s
    .get_by_position("chr13:20", Tier::Queue, true)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fuzzy.len(), 2);

  assert!(s
    .get_by_position("chr13:20", Tier::Queue, false)
    .await
    .unwrap()
    .is_none());
}

#[tokio::test]
async fn variants_by_gene_falls_back_to_live() {
  let s = store().await;
  create(&s, "chr1:2:A>G", "MYO7A").await;
  create(&s, "chr1:1:A>G", "MYO7A").await;
  s.release(0, false, ACTOR).await.unwrap();

  let rows = s.variants_by_gene("MYO7A", Tier::Queue).await.unwrap();
  let variations: Vec<_> = rows.iter().filter_map(|v| v.variation()).collect();
  assert_eq!(variations, vec!["chr1:1:A>G", "chr1:2:A>G"]);
}

// ─── Queue edits ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_matching_live_is_a_no_op() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  s.release(0, false, ACTOR).await.unwrap();

  let changed = s
    .update_queue(id, fields(&[("gene", " GJB2 "), ("bogus", "x")]), ACTOR)
    .await
    .unwrap();
  assert!(!changed);
  assert!(s.all_variants(Tier::Queue).await.unwrap().is_empty());
  assert!(s.get_review(id).await.unwrap().is_none());
}

#[tokio::test]
async fn update_materialises_queue_row_from_live() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  s.release(0, false, ACTOR).await.unwrap();

  let changed = s
    .update_queue(id, fields(&[("disease", "Deafness"), ("comments", "")]), ACTOR)
    .await
    .unwrap();
  assert!(changed);

  let queued = s.get_by_id(id, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(queued.get("disease"), Some("Deafness"));
  assert_eq!(queued.gene(), Some("GJB2"));
  assert!(s.get_review(id).await.unwrap().is_some());

  let edits: Vec<_> = s
    .activity()
    .await
    .unwrap()
    .into_iter()
    .filter(|a| a.action == Action::Edit)
    .collect();
  assert_eq!(edits.len(), 1);
  assert_eq!(edits[0].fields, vec!["disease".to_owned()]);
  assert_eq!(edits[0].label.as_deref(), Some("GJB2|MISSING_PROTEIN_CHANGE|chr1:100:A>G"));
}

#[tokio::test]
async fn update_unknown_id_fails() {
  let s = store().await;
  let err = s
    .update_queue(42, fields(&[("gene", "GJB2")]), ACTOR)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::VariantNotFound(42)));
}

#[tokio::test]
async fn update_unknown_id_with_only_unknown_fields_fails() {
  let s = store().await;
  let err = s
    .update_queue(42, fields(&[("bogus", "x")]), ACTOR)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::VariantNotFound(42)));

  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  assert!(!s.update_queue(id, fields(&[("bogus", "x")]), ACTOR).await.unwrap());
}

#[tokio::test]
async fn editing_variation_onto_another_variant_is_a_duplicate() {
  let s = store().await;
  let a = create(&s, "chr1:100:A>G", "GJB2").await;
  let b = create(&s, "chr1:200:A>G", "GJB2").await;

  let err = s
    .update_queue(b, fields(&[("variation", "chr1:100:a>g")]), ACTOR)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateVariant(v) if v == "chr1:100:A>G"));
  assert_eq!(
    s.get_by_id(b, Tier::Queue).await.unwrap().unwrap().variation(),
    Some("chr1:200:A>G")
  );

  // Re-stating a variant's own variation is not a clash.
  s.update_queue(a, fields(&[("variation", "chr1:100:A>G")]), ACTOR)
    .await
    .unwrap();
  assert!(s.update_queue(b, fields(&[("variation", "chr1:300:A>G")]), ACTOR).await.unwrap());
}

#[tokio::test]
async fn remove_all_changes_drops_ghost() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;

  s.remove_all_changes(id, ACTOR).await.unwrap();
  assert!(s.get_by_id(id, Tier::Queue).await.unwrap().is_none());
  assert!(s.get_review(id).await.unwrap().is_none());
}

#[tokio::test]
async fn remove_all_changes_keeps_released_row() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  s.release(0, false, ACTOR).await.unwrap();
  s.update_queue(id, fields(&[("disease", "Usher")]), ACTOR)
    .await
    .unwrap();

  s.remove_all_changes(id, ACTOR).await.unwrap();
  let row = s.get_by_id(id, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(row.get("disease"), None);
  assert_eq!(row.gene(), Some("GJB2"));
}

#[tokio::test]
async fn remove_if_unchanged_only_when_edit_was_reverted() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  s.release(0, false, ACTOR).await.unwrap();
  s.update_queue(id, fields(&[("disease", "Usher")]), ACTOR)
    .await
    .unwrap();

  assert!(!s.remove_from_queue_if_unchanged(id, ACTOR).await.unwrap());

  s.update_queue(id, RawFields::from([("disease".to_owned(), None)]), ACTOR)
    .await
    .unwrap();
  assert!(s.remove_from_queue_if_unchanged(id, ACTOR).await.unwrap());
  assert!(s.all_variants(Tier::Queue).await.unwrap().is_empty());
  assert!(s.get_review(id).await.unwrap().is_none());
}

// ─── Diff ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn untouched_ghost_only_surfaces_with_review_comments() {
  let s = store().await;
  let id = s
    .create_variant(
      "chr1:100:A>G",
      CreateMode::ManualWithData { data: RawFields::new(), reimport: false },
      ACTOR,
    )
    .await
    .unwrap();

  assert!(s.unreleased_changes(Some(id)).await.unwrap().is_none());
  assert!(s.unreleased_changes(None).await.unwrap().is_none());

  s.update_review(
    id,
    ReviewUpdate::default().comments(Some("check frequency".into())),
    ACTOR,
  )
  .await
  .unwrap();

  let changes = s.unreleased_changes(Some(id)).await.unwrap().unwrap();
  assert!(changes[&id].changes.is_empty());
}

#[tokio::test]
async fn diff_of_new_variant_shows_none_on_live_side() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;

  let changes = s.unreleased_changes(None).await.unwrap().unwrap();
  let diff = &changes[&id];
  assert!(diff.is_new);
  assert_eq!(diff.name, "GJB2|MISSING_PROTEIN_CHANGE|chr1:100:A>G");
  assert_eq!(diff.changes["gene"].live_value.to_string(), "None");
  assert_eq!(diff.changes["gene"].queue_value.to_string(), "GJB2");
  assert!(!diff.changes.contains_key("disease"));
}

#[tokio::test]
async fn diff_of_edit_shows_live_value() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  s.release(0, false, ACTOR).await.unwrap();
  s.update_queue(id, fields(&[("gene", "GJB6")]), ACTOR)
    .await
    .unwrap();

  let changes = s.unreleased_changes(Some(id)).await.unwrap().unwrap();
  let diff = &changes[&id];
  assert!(!diff.is_new);
  assert_eq!(diff.changes.len(), 1);
  assert_eq!(diff.changes["gene"].live_value.to_string(), "GJB2");
  assert_eq!(diff.changes["gene"].queue_value.to_string(), "GJB6");
}

// ─── Review ledger ───────────────────────────────────────────────────────────

#[tokio::test]
async fn review_upsert_keeps_created_and_unset_columns() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  let before = s.get_review(id).await.unwrap().unwrap();

  let after = s
    .update_review(id, ReviewUpdate::default().confirm(true), ACTOR)
    .await
    .unwrap();
  assert!(after.confirmed_for_release);
  assert_eq!(after.created, before.created);

  let after = s
    .update_review(id, ReviewUpdate::default().schedule_deletion(true), ACTOR)
    .await
    .unwrap();
  assert!(after.confirmed_for_release);
  assert!(after.scheduled_for_deletion);
  assert_eq!(s.list_reviews().await.unwrap().len(), 1);
  assert_eq!(s.num_unreleased().await.unwrap(), 1);
}

#[tokio::test]
async fn review_for_unknown_variant_fails() {
  let s = store().await;
  let err = s
    .update_review(7, ReviewUpdate::default().confirm(true), ACTOR)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::VariantNotFound(7)));
}

// ─── Release ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_release_only_at_bootstrap() {
  let s = store().await;

  let err = s.release(3, true, ACTOR).await.unwrap_err();
  assert!(matches!(err, Error::NothingToRelease { version: 3 }));
  assert!(s.versions().await.unwrap().is_empty());

  let report = s.release(0, true, ACTOR).await.unwrap();
  assert_eq!(report.variants, 0);
  let versions = s.versions().await.unwrap();
  assert_eq!(versions.len(), 1);
  assert_eq!(versions[0].version, 0);
  assert_eq!(versions[0].variants, 0);
  assert_eq!(versions[0].genes, 0);
}

#[tokio::test]
async fn release_merges_staged_rows_field_for_field() {
  let s = store().await;
  let a = create(&s, "chr1:100:A>G", "GJB2").await;
  let b = create(&s, "chr1:200:A>G", "GJB2").await;
  let c = create(&s, "chr2:300:C>T", "MYO7A").await;
  let staged_a = s.get_by_id(a, Tier::Queue).await.unwrap().unwrap();

  let report = s.release(1, false, ACTOR).await.unwrap();
  assert_eq!(report.merged, vec![a, b, c]);
  assert_eq!(report.variants, 3);
  assert_eq!(report.genes, 2);

  assert_eq!(s.get_by_id(a, Tier::Live).await.unwrap().unwrap(), staged_a);
  assert!(s.all_variants(Tier::Queue).await.unwrap().is_empty());
  assert!(s.list_reviews().await.unwrap().is_empty());

  let counts = s.gene_counts().await.unwrap();
  assert_eq!(counts.len(), 2);
  assert_eq!((counts[0].gene.as_str(), counts[0].count), ("GJB2", 2));
  assert_eq!(s.current_version().await.unwrap(), 1);
}

#[tokio::test]
async fn confirmed_only_release_leaves_unconfirmed_staged() {
  let s = store().await;
  let a = create(&s, "chr1:100:A>G", "GJB2").await;
  let b = create(&s, "chr1:200:A>G", "GJB2").await;
  confirm(&s, a).await;

  let report = s.release(2, true, ACTOR).await.unwrap();
  assert_eq!(report.merged, vec![a]);

  assert!(s.get_by_id(b, Tier::Queue).await.unwrap().unwrap().variation().is_some());
  assert!(s.get_review(b).await.unwrap().is_some());
  assert!(s.get_by_id(b, Tier::Live).await.unwrap().unwrap().is_ghost());
}

#[tokio::test]
async fn version_counts_match_the_live_table() {
  let s = store().await;
  let a = create(&s, "chr1:100:A>G", "GJB2").await;
  create(&s, "chr2:200:C>T", "MYO7A").await;
  confirm(&s, a).await;

  let report = s.release(1, true, ACTOR).await.unwrap();
  let live = s.all_variants(Tier::Live).await.unwrap();
  assert_eq!(live.len(), 2);
  assert_eq!(report.variants, 2);

  let versions = s.versions().await.unwrap();
  assert_eq!(versions[0].variants, live.len() as u64);
  assert_eq!(versions[0].genes, 1);
}

#[tokio::test]
async fn failed_release_leaves_state_untouched() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("variants.sqlite");
  let s = SqliteStore::open(&path, TableNames::default()).await.unwrap();
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  let staged = s.get_by_id(id, Tier::Queue).await.unwrap().unwrap();

  // Break the last step of the release from a second connection.
  rusqlite::Connection::open(&path)
    .unwrap()
    .execute_batch("DROP TABLE variant_count")
    .unwrap();

  assert!(s.release(1, false, ACTOR).await.is_err());

  assert_eq!(s.get_by_id(id, Tier::Queue).await.unwrap().unwrap(), staged);
  assert!(s.get_by_id(id, Tier::Live).await.unwrap().unwrap().is_ghost());
  assert!(s.get_review(id).await.unwrap().is_some());
  assert!(s.versions().await.unwrap().is_empty());
  assert!(s.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn scheduled_deletion_is_archived_and_purged() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  s.release(0, false, ACTOR).await.unwrap();

  s.update_review(
    id,
    ReviewUpdate::default().schedule_deletion(true).confirm(true),
    ACTOR,
  )
  .await
  .unwrap();
  let report = s.release(1, true, ACTOR).await.unwrap();
  assert_eq!(report.deleted, vec![id]);
  assert_eq!(report.variants, 0);

  assert!(s.get_by_id(id, Tier::Queue).await.unwrap().is_none());
  let history = s.history().await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].kind, HistoryKind::ReleasedDeletion);
  assert_eq!(history[0].variant_id, Some(id));
  assert_eq!(history[0].payload["gene"], "GJB2");
  assert!(s.gene_counts().await.unwrap().is_empty());
}

#[tokio::test]
async fn unconfirmed_deletion_waits_under_confirmed_only() {
  let s = store().await;
  let a = create(&s, "chr1:100:A>G", "GJB2").await;
  let b = create(&s, "chr1:200:A>G", "GJB2").await;
  confirm(&s, a).await;
  s.update_review(b, ReviewUpdate::default().schedule_deletion(true), ACTOR)
    .await
    .unwrap();

  let report = s.release(1, true, ACTOR).await.unwrap();
  assert!(report.deleted.is_empty());
  assert!(s.get_review(b).await.unwrap().unwrap().scheduled_for_deletion);
}

// ─── Expert overlay ──────────────────────────────────────────────────────────

fn expert(variation: &str, pathogenicity: &str) -> ExpertOverride {
  let mut o = ExpertOverride::new(variation);
  o.pathogenicity = Some(pathogenicity.into());
  o.disease = Some("Deafness".into());
  o
}

#[tokio::test]
async fn loading_an_override_twice_archives_the_first() {
  let s = store().await;
  s.load_expert_overrides(vec![expert("chr1:100:A>G", "Benign")], ACTOR)
    .await
    .unwrap();
  s.load_expert_overrides(vec![expert("chr1:100:A>G", "Pathogenic")], ACTOR)
    .await
    .unwrap();

  let overrides = s.expert_overrides().await.unwrap();
  assert_eq!(overrides.len(), 1);
  assert_eq!(overrides[0].pathogenicity.as_deref(), Some("Pathogenic"));

  let history = s.history().await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].kind, HistoryKind::SupersededOverride);
  assert_eq!(history[0].payload["pathogenicity"], "Benign");
}

#[tokio::test]
async fn apply_overwrites_queue_and_schedules_deletions() {
  let s = store().await;
  let a = create(&s, "chr1:100:A>G", "GJB2").await;
  let b = create(&s, "chr1:200:A>G", "GJB2").await;
  let c = create(&s, "chr1:300:A>G", "GJB2").await;

  let mut drop_b = expert("chr1:200:A>G", "Benign");
  drop_b.delete_on_release = true;
  let mut disabled_c = expert("chr1:300:A>G", "Benign");
  disabled_c.disabled = true;
  disabled_c.delete_on_release = true;

  s.load_expert_overrides(
    vec![expert("chr1:100:A>G", "Pathogenic"), drop_b, disabled_c],
    ACTOR,
  )
  .await
  .unwrap();
  let report = s.apply_expert_overrides(ACTOR).await.unwrap();

  assert_eq!(report.updated, vec![a, b]);
  assert_eq!(report.scheduled, vec![b]);

  let row = s.get_by_id(a, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(row.get("pathogenicity"), Some("Pathogenic"));
  assert_eq!(row.get("disease"), Some("Deafness"));
  assert!(s.get_review(b).await.unwrap().unwrap().scheduled_for_deletion);
  let untouched = s.get_by_id(c, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(untouched.get("pathogenicity"), Some("Unknown significance"));
  assert!(!s.get_review(c).await.unwrap().unwrap().scheduled_for_deletion);
}

// ─── Bulk load and statistics ────────────────────────────────────────────────

fn bulk_row(variation: &str, gene: &str, class: &str) -> FieldUpdates {
  FieldUpdates::sanitize([
    ("variation", Some(variation)),
    ("gene", Some(gene)),
    ("pathogenicity", Some(class)),
  ])
}

#[tokio::test]
async fn bulk_load_reuses_live_ids_and_creates_ghosts() {
  let s = store().await;
  let existing = create(&s, "chr1:100:A>G", "GJB2").await;
  s.update_queue(existing, fields(&[("comments", "curated")]), ACTOR)
    .await
    .unwrap();
  s.release(0, false, ACTOR).await.unwrap();

  let report = s
    .bulk_load_queue(
      vec![
        bulk_row("chr1:100:A>G", "GJB2", "Pathogenic"),
        bulk_row("chr1:999:T>C", "GJB2", "Benign"),
        FieldUpdates::sanitize([("gene", Some("GJB2"))]),
      ],
      ACTOR,
    )
    .await
    .unwrap();
  assert_eq!(report.staged, 2);
  assert_eq!(report.created, 1);
  assert_eq!(report.skipped, 1);

  let reloaded = s.get_by_id(existing, Tier::Queue).await.unwrap().unwrap();
  assert_eq!(reloaded.get("pathogenicity"), Some("Pathogenic"));
  assert_eq!(reloaded.get("comments"), Some("curated"));
  assert_eq!(s.num_unreleased().await.unwrap(), 2);

  let stats = s.diff_stats().await.unwrap();
  assert_eq!(stats.len(), 1);
  assert_eq!(stats[0].gene, "GJB2");
  assert_eq!(stats[0].added, 1);
  assert_eq!(stats[0].changed, 1);
}

#[tokio::test]
async fn every_write_is_audited() {
  let s = store().await;
  let id = create(&s, "chr1:100:A>G", "GJB2").await;
  confirm(&s, id).await;
  s.release(0, true, ACTOR).await.unwrap();

  let actions: Vec<Action> = s
    .activity()
    .await
    .unwrap()
    .into_iter()
    .map(|a| a.action)
    .collect();
  assert_eq!(actions, vec![Action::Add, Action::Review, Action::Release]);
}
