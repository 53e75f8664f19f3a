//! The `CurationStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `vardb-store-sqlite`).
//! The admin binary depends on this abstraction, not on any concrete backend.

use std::{future::Future, sync::Arc};

use serde::Serialize;

use crate::{
  annotation::AnnotationSource,
  diff::UnreleasedChanges,
  expert::ExpertOverride,
  review::{ReviewRecord, ReviewUpdate},
  variant::{RawFields, Tier, Variant, VariantId},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Where the data for a new variant comes from.
#[derive(Clone)]
pub enum CreateMode {
  /// Run the annotation engine on the position.
  Annotated(Arc<dyn AnnotationSource>),
  /// Curator entry with no data beyond the position and default
  /// classification.
  ManualBlank,
  /// Caller-supplied fields. With `reimport` set the duplicate check is
  /// skipped, for reloading previously exported records.
  ManualWithData { data: RawFields, reimport: bool },
}

impl std::fmt::Debug for CreateMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Annotated(_) => f.write_str("Annotated"),
      Self::ManualBlank => f.write_str("ManualBlank"),
      Self::ManualWithData { data, reimport } => f
        .debug_struct("ManualWithData")
        .field("fields", &data.len())
        .field("reimport", reimport)
        .finish(),
    }
  }
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// What a release published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
  pub version:  u32,
  /// Ids purged from live, queue and review.
  pub deleted:  Vec<VariantId>,
  /// Ids whose queue row was merged into live.
  pub merged:   Vec<VariantId>,
  pub variants: u64,
  pub genes:    u64,
}

/// What applying the expert overrides touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlayReport {
  /// Queue rows whose curation fields were overwritten.
  pub updated:   Vec<VariantId>,
  /// Queue variants newly scheduled for deletion.
  pub scheduled: Vec<VariantId>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the two-tier variant store, its review ledger, the
/// release controller and the expert overlay.
///
/// Reads on [`Tier::Queue`] fall back to [`Tier::Live`]. Only `release`
/// deletes from live or records versions.
pub trait CurationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Variants ──────────────────────────────────────────────────────────

  /// Reserve a fresh id with a ghost live row, stage the variant's data in
  /// the queue and open a default review.
  ///
  /// Fails with a duplicate error when the variation already exists in
  /// either tier, unless `mode` is a re-import. Caller-supplied data is
  /// checked under its own `variation` when it has one.
  fn create_variant<'a>(
    &'a self,
    variation: &'a str,
    mode: CreateMode,
    actor: &'a str,
  ) -> impl Future<Output = Result<VariantId, Self::Error>> + Send + 'a;

  /// Fetch a row by id, re-querying live when `tier` has no match.
  fn get_by_id(
    &self,
    id: VariantId,
    tier: Tier,
  ) -> impl Future<Output = Result<Option<Variant>, Self::Error>> + Send + '_;

  /// Rows whose variation starts with `position:`; with `fuzzy`, also those
  /// starting with the bare `position`.
  fn get_by_position<'a>(
    &'a self,
    position: &'a str,
    tier: Tier,
    fuzzy: bool,
  ) -> impl Future<Output = Result<Option<Vec<Variant>>, Self::Error>> + Send + 'a;

  /// Stage field edits. Returns `false` (and writes nothing) when the
  /// variant has no queue row and the edits match its live row. Setting a
  /// `variation` another id already carries is a duplicate error.
  fn update_queue<'a>(
    &'a self,
    id: VariantId,
    fields: RawFields,
    actor: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Drop the queue row and review, and the live row if it is still a ghost.
  fn remove_all_changes<'a>(
    &'a self,
    id: VariantId,
    actor: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Same as [`Self::remove_all_changes`] when the diff engine reports no
  /// field changes for `id`. Returns whether anything was removed.
  fn remove_from_queue_if_unchanged<'a>(
    &'a self,
    id: VariantId,
    actor: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Diff every queued id, or just `id`. `None` when nothing is unreleased.
  fn unreleased_changes(
    &self,
    id: Option<VariantId>,
  ) -> impl Future<Output = Result<Option<UnreleasedChanges>, Self::Error>> + Send + '_;

  // ── Review ledger ─────────────────────────────────────────────────────

  fn get_review(
    &self,
    id: VariantId,
  ) -> impl Future<Output = Result<Option<ReviewRecord>, Self::Error>> + Send + '_;

  /// Upsert the review for `id`.
  fn update_review<'a>(
    &'a self,
    id: VariantId,
    update: ReviewUpdate,
    actor: &'a str,
  ) -> impl Future<Output = Result<ReviewRecord, Self::Error>> + Send + 'a;

  // ── Release ───────────────────────────────────────────────────────────

  /// Atomically purge scheduled deletions, merge staged rows into live,
  /// record `version` and rebuild the gene-count cache.
  fn release<'a>(
    &'a self,
    version: u32,
    confirmed_only: bool,
    actor: &'a str,
  ) -> impl Future<Output = Result<ReleaseReport, Self::Error>> + Send + 'a;

  // ── Expert overlay ────────────────────────────────────────────────────

  /// Upsert overrides by variation, archiving any value they replace.
  fn load_expert_overrides<'a>(
    &'a self,
    overrides: Vec<ExpertOverride>,
    actor: &'a str,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Apply every enabled override to the matching queue rows.
  fn apply_expert_overrides<'a>(
    &'a self,
    actor: &'a str,
  ) -> impl Future<Output = Result<OverlayReport, Self::Error>> + Send + 'a;
}
