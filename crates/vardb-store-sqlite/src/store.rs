//! [`SqliteStore`]: the SQLite implementation of [`CurationStore`].

use std::{collections::BTreeSet, path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, Params, Row, ToSql, params};
use serde::Serialize;
use vardb_core::{
  diff::{self, UnreleasedChanges},
  expert::ExpertOverride,
  log::{Action, ActivityEntry, HistoryEntry, HistoryKind},
  position,
  review::{BOOTSTRAP_VERSION, GeneCount, ReviewRecord, ReviewUpdate, VersionRecord},
  stats::{self, GeneDiffStats},
  store::{CreateMode, CurationStore, OverlayReport, ReleaseReport},
  variant::{FieldUpdates, Pathogenicity, RawFields, Tier, Variant, VariantId},
};

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawHistory, RawReview, RawVariant, RawVersion, encode_dt, read_expert,
  },
  schema,
  sql::{Sql, TierSql},
  tables::TableNames,
};

/// Comment stored on a variant entered by hand without annotation.
const MANUAL_NOTE: &str = "Manual curation in progress.";

/// Fields an expert override writes into the queue.
const OVERRIDE_FIELDS: [&str; 4] = ["pathogenicity", "disease", "pubmed_id", "comments"];

// ─── Store ───────────────────────────────────────────────────────────────────

/// A curation store backed by a single SQLite file.
///
/// Cloning is cheap; the connection and rendered statements are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  sql:  Arc<Sql>,
}

/// What [`SqliteStore::bulk_load_queue`] staged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkLoadReport {
  /// Rows written to the queue.
  pub staged:  usize,
  /// Rows whose variation was new, and so received a ghost live row.
  pub created: usize,
  /// Rows skipped for lacking a variation.
  pub skipped: usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, tables: TableNames) -> Result<Self> {
    tables.validate()?;
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, tables).await
  }

  /// Open an in-memory store with the default table names; useful for
  /// testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(TableNames::default()).await
  }

  pub async fn open_in_memory_with(tables: TableNames) -> Result<Self> {
    tables.validate()?;
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, tables).await
  }

  async fn init(conn: tokio_rusqlite::Connection, tables: TableNames) -> Result<Self> {
    let store = Self { conn, sql: Arc::new(Sql::new(&tables)) };
    store.init_schema(&tables).await?;
    Ok(store)
  }

  /// Create missing tables, then check that live and queue carry every
  /// descriptor column.
  async fn init_schema(&self, tables: &TableNames) -> Result<()> {
    let ddl = schema::ddl(tables);
    let sql = self.sql.clone();

    let present: Vec<(String, Vec<String>)> = self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        let mut out = Vec::new();
        for tier in [&sql.live, &sql.queue] {
          let names = query_all(conn, &tier.columns, [], |row| row.get::<_, String>(1))?;
          out.push((tier.table.clone(), names));
        }
        Ok(out)
      })
      .await?;

    for (table, names) in present {
      let missing = schema::missing_columns(&names);
      if !missing.is_empty() {
        return Err(Error::SchemaMismatch {
          table,
          detail: format!("missing columns: {}", missing.join(", ")),
        });
      }
    }
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn select_variants(
    &self,
    tier: Tier,
    query: TierQuery,
    arg: Option<String>,
  ) -> Result<Vec<Variant>> {
    let sql = self.sql.clone();

    let raws: Vec<RawVariant> = self
      .conn
      .call(move |conn| {
        let text = query.text(sql.tier(tier));
        let rows = match &arg {
          Some(a) => query_all(conn, text, params![a], RawVariant::from_row)?,
          None => query_all(conn, text, [], RawVariant::from_row)?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVariant::into_variant).collect()
  }

  /// [`Self::select_variants`] with the queue-then-live read precedence.
  async fn select_with_fallback(
    &self,
    tier: Tier,
    query: TierQuery,
    arg: Option<String>,
  ) -> Result<Vec<Variant>> {
    let rows = self.select_variants(tier, query, arg.clone()).await?;
    match tier.fallback() {
      Some(next) if rows.is_empty() => self.select_variants(next, query, arg).await,
      _ => Ok(rows),
    }
  }

  /// Every variant of `gene`, ordered by variation.
  pub async fn variants_by_gene(&self, gene: &str, tier: Tier) -> Result<Vec<Variant>> {
    self
      .select_with_fallback(tier, TierQuery::Gene, Some(gene.to_owned()))
      .await
  }

  /// Every row of one tier, ghosts included. No fallback.
  pub async fn all_variants(&self, tier: Tier) -> Result<Vec<Variant>> {
    self.select_variants(tier, TierQuery::All, None).await
  }

  pub async fn list_reviews(&self) -> Result<Vec<ReviewRecord>> {
    let sql = self.sql.clone();
    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql.list_reviews, [], RawReview::from_row)?))
      .await?;
    raws.into_iter().map(RawReview::into_review).collect()
  }

  /// Number of variants with a review row, i.e. awaiting release.
  pub async fn num_unreleased(&self) -> Result<u64> {
    let sql = self.sql.clone();
    let count: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql.count_reviews, [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  pub async fn gene_counts(&self) -> Result<Vec<GeneCount>> {
    let sql = self.sql.clone();
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        Ok(query_all(conn, &sql.gene_counts, [], |r| {
          Ok((r.get(0)?, r.get(1)?))
        })?)
      })
      .await?;
    Ok(
      rows
        .into_iter()
        .map(|(gene, count)| GeneCount { gene, count: count.max(0) as u64 })
        .collect(),
    )
  }

  /// Every recorded release, oldest first.
  pub async fn versions(&self) -> Result<Vec<VersionRecord>> {
    let sql = self.sql.clone();
    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql.list_versions, [], RawVersion::from_row)?))
      .await?;
    raws.into_iter().map(RawVersion::into_version).collect()
  }

  /// The highest released version, or the bootstrap version when nothing
  /// has been released.
  pub async fn current_version(&self) -> Result<u32> {
    let sql = self.sql.clone();
    let max: Option<i64> = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql.max_version, [], |r| r.get(0))?))
      .await?;
    match max {
      Some(v) => u32::try_from(v).map_err(|e| Error::Decode(e.to_string())),
      None => Ok(BOOTSTRAP_VERSION),
    }
  }

  /// The append-only archive of released deletions and superseded overrides.
  pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
    let sql = self.sql.clone();
    let raws: Vec<RawHistory> = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql.list_history, [], RawHistory::from_row)?))
      .await?;
    raws.into_iter().map(RawHistory::into_entry).collect()
  }

  /// The audit trail, oldest first.
  pub async fn activity(&self) -> Result<Vec<ActivityEntry>> {
    let sql = self.sql.clone();
    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql.list_activity, [], RawActivity::from_row)?))
      .await?;
    raws.into_iter().map(RawActivity::into_entry).collect()
  }

  pub async fn expert_overrides(&self) -> Result<Vec<ExpertOverride>> {
    let sql = self.sql.clone();
    Ok(
      self
        .conn
        .call(move |conn| Ok(query_all(conn, &sql.list_expert, [], read_expert)?))
        .await?,
    )
  }

  /// Per-gene statistics for every gene with staged rows, comparing the
  /// queue against the live rows of the same genes.
  pub async fn diff_stats(&self) -> Result<Vec<GeneDiffStats>> {
    let queue = self.all_variants(Tier::Queue).await?;
    let genes: BTreeSet<&str> = queue.iter().filter_map(Variant::gene).collect();
    let live: Vec<Variant> = self
      .all_variants(Tier::Live)
      .await?
      .into_iter()
      .filter(|v| v.gene().is_some_and(|g| genes.contains(g)))
      .collect();
    Ok(stats::diff_stats(&live, &queue))
  }

  // ── Bulk load ─────────────────────────────────────────────────────────────

  /// Stage the output of the bulk annotation pipeline in one transaction.
  ///
  /// A row whose variation is already live reuses that id and is laid over
  /// the live row; one already staged replaces the staged row; anything else
  /// gets a fresh ghost id. Every staged id gets a review row.
  pub async fn bulk_load_queue(
    &self,
    rows: Vec<FieldUpdates>,
    actor: &str,
  ) -> Result<BulkLoadReport> {
    let sql = self.sql.clone();
    let actor = actor.to_owned();
    let now = encode_dt(Utc::now());

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut report = BulkLoadReport::default();

        for row in &rows {
          let Some(variation) = row.get("variation") else {
            report.skipped += 1;
            continue;
          };

          let live_id: Option<VariantId> = tx
            .query_row(&sql.live_id_for, params![variation], |r| r.get(0))
            .optional()?;
          let base = match live_id {
            Some(id) => load_variant(&tx, &sql.live.by_id, id)?,
            None => None,
          };
          let id = match live_id {
            Some(id) => id,
            None => {
              let queued: Option<VariantId> = tx
                .query_row(&sql.queue_id_for, params![variation], |r| r.get(0))
                .optional()?;
              match queued {
                Some(id) => id,
                None => {
                  tx.execute(&sql.insert_ghost, [])?;
                  report.created += 1;
                  tx.last_insert_rowid()
                }
              }
            }
          };

          let mut staged = base.unwrap_or_else(|| Variant::ghost(id));
          staged.apply(row);
          write_queue(&tx, &sql, &staged)?;
          tx.execute(&sql.touch_review, params![id, now])?;
          report.staged += 1;
        }

        Audit {
          actor:      &actor,
          action:     Action::BulkLoad,
          variant_id: None,
          label:      Some(format!("{} rows", report.staged)),
          fields:     Vec::new(),
        }
        .write(&tx, &sql, &now)?;

        tx.commit()?;
        Ok(report)
      })
      .await?;

    tracing::info!(
      staged = report.staged,
      created = report.created,
      skipped = report.skipped,
      "bulk-loaded queue"
    );
    Ok(report)
  }
}

// ─── CurationStore impl ──────────────────────────────────────────────────────

impl CurationStore for SqliteStore {
  type Error = Error;

  // ── Variants ──────────────────────────────────────────────────────────────

  async fn create_variant(
    &self,
    variation: &str,
    mode: CreateMode,
    actor: &str,
  ) -> Result<VariantId> {
    let mut variation = position::normalize(variation)?;

    let (data, check_duplicates) = match mode {
      CreateMode::Annotated(source) => {
        let key = variation.clone();
        let mut record = tokio::task::spawn_blocking(move || source.annotate(&key))
          .await
          .map_err(|e| Error::Blocking(e.to_string()))??;
        record.insert("variation", Some(variation.as_str()));
        (record, true)
      }
      CreateMode::ManualBlank => {
        let mut data = FieldUpdates::new();
        data.insert("variation", Some(variation.as_str()));
        data.insert("pathogenicity", Some(Pathogenicity::UnknownSignificance.label()));
        data.insert("comments", Some(MANUAL_NOTE));
        (data, true)
      }
      CreateMode::ManualWithData { data, reimport } => {
        // The staged row carries the data's own variation, so that is the
        // key the duplicate check has to use.
        let mut data = FieldUpdates::sanitize(data);
        if let Some(own) = data.get("variation").map(position::normalize).transpose()? {
          data.insert("variation", Some(own.as_str()));
          variation = own;
        }
        (data, !reimport)
      }
    };

    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let key = variation.clone();
    let now = encode_dt(Utc::now());

    let created: Option<(VariantId, Vec<&'static str>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if check_duplicates {
          let existing: Option<VariantId> = tx
            .query_row(&sql.find_variation, params![key], |r| r.get(0))
            .optional()?;
          if existing.is_some() {
            return Ok(None);
          }
        }

        tx.execute(&sql.insert_ghost, [])?;
        let id = tx.last_insert_rowid();

        let fields = match stage_fields(&tx, &sql, id, &data)? {
          Staged::Written { fields, .. } => fields,
          Staged::Unchanged | Staged::Missing => Vec::new(),
        };
        tx.execute(&sql.touch_review, params![id, now])?;

        Audit {
          actor: &actor_name,
          action: Action::Add,
          variant_id: Some(id),
          label: Some(data.to_variant(id).label()),
          fields: fields.clone(),
        }
        .write(&tx, &sql, &now)?;

        tx.commit()?;
        Ok(Some((id, fields)))
      })
      .await?;

    let Some((id, fields)) = created else {
      return Err(Error::DuplicateVariant(variation));
    };
    tracing::info!(actor, id, variation, fields = fields.len(), "created variant");
    Ok(id)
  }

  async fn get_by_id(&self, id: VariantId, tier: Tier) -> Result<Option<Variant>> {
    let sql = self.sql.clone();

    let raw: Option<RawVariant> = self
      .conn
      .call(move |conn| {
        let mut current = Some(tier);
        while let Some(t) = current {
          let found = conn
            .query_row(&sql.tier(t).by_id, params![id], RawVariant::from_row)
            .optional()?;
          if found.is_some() {
            return Ok(found);
          }
          current = t.fallback();
        }
        Ok(None)
      })
      .await?;

    raw.map(RawVariant::into_variant).transpose()
  }

  async fn get_by_position(
    &self,
    position: &str,
    tier: Tier,
    fuzzy: bool,
  ) -> Result<Option<Vec<Variant>>> {
    // An exact match is a prefix match on `position:`, which the bare
    // fuzzy prefix subsumes.
    let position = position.trim();
    let prefix = if fuzzy { position.to_owned() } else { format!("{position}:") };
    let rows = self
      .select_with_fallback(tier, TierQuery::Prefix, Some(prefix))
      .await?;
    tracing::debug!(position, fuzzy, matches = rows.len(), "position lookup");
    Ok((!rows.is_empty()).then_some(rows))
  }

  async fn update_queue(&self, id: VariantId, fields: RawFields, actor: &str) -> Result<bool> {
    let mut updates = FieldUpdates::sanitize(fields);
    if updates.is_empty() {
      return match self.get_by_id(id, Tier::Queue).await? {
        Some(_) => Ok(false),
        None => Err(Error::VariantNotFound(id)),
      };
    }

    let new_variation = updates.get("variation").map(position::normalize).transpose()?;
    if let Some(v) = &new_variation {
      updates.insert("variation", Some(v.as_str()));
    }

    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let now = encode_dt(Utc::now());
    let key = new_variation.clone();

    let staged: Option<Staged> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(v) = &key {
          let taken: Option<VariantId> = tx
            .query_row(&sql.find_other, params![v, id], |r| r.get(0))
            .optional()?;
          if taken.is_some() {
            return Ok(None);
          }
        }

        let staged = stage_fields(&tx, &sql, id, &updates)?;
        if let Staged::Written { row, fields } = &staged {
          tx.execute(&sql.touch_review, params![id, now])?;
          Audit {
            actor:      &actor_name,
            action:     Action::Edit,
            variant_id: Some(id),
            label:      Some(row.label()),
            fields:     fields.clone(),
          }
          .write(&tx, &sql, &now)?;
          tx.commit()?;
        }
        Ok(Some(staged))
      })
      .await?;

    let Some(staged) = staged else {
      return Err(Error::DuplicateVariant(new_variation.unwrap_or_default()));
    };
    match staged {
      Staged::Written { row, fields } => {
        tracing::info!(actor, id, label = %row.label(), ?fields, "staged edit");
        Ok(true)
      }
      Staged::Unchanged => {
        tracing::debug!(id, "edit matches live row; nothing staged");
        Ok(false)
      }
      Staged::Missing => Err(Error::VariantNotFound(id)),
    }
  }

  async fn remove_all_changes(&self, id: VariantId, actor: &str) -> Result<()> {
    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let now = encode_dt(Utc::now());

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let removed = remove_changes(&tx, &sql, id, &actor_name, &now)?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    tracing::info!(
      actor,
      id,
      queue = removed.queue,
      review = removed.review,
      ghost = removed.ghost,
      "removed staged changes"
    );
    Ok(())
  }

  async fn remove_from_queue_if_unchanged(&self, id: VariantId, actor: &str) -> Result<bool> {
    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let now = encode_dt(Utc::now());

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let queued = load_variant(&tx, &sql.queue.by_id, id)?;
        let live = load_variant(&tx, &sql.live.by_id, id)?;

        let changed = queued
          .as_ref()
          .and_then(|q| diff::diff_staged(q, live.as_ref(), None))
          .is_some_and(|d| !d.changes.is_empty());
        if changed {
          return Ok(None);
        }

        let removed = remove_changes(&tx, &sql, id, &actor_name, &now)?;
        tx.commit()?;
        Ok(Some(removed))
      })
      .await?;

    match removed {
      Some(r) if r.any() => {
        tracing::info!(actor, id, ghost = r.ghost, "removed unchanged staged variant");
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn unreleased_changes(&self, id: Option<VariantId>) -> Result<Option<UnreleasedChanges>> {
    let sql = self.sql.clone();

    type Loaded = (Option<Variant>, Option<Variant>, Option<RawReview>);
    let loaded: Vec<Loaded> = self
      .conn
      .call(move |conn| {
        let ids = match id {
          Some(id) => vec![id],
          None => query_all(conn, &sql.staged_ids, [], |r| r.get(0))?,
        };

        let mut loaded = Vec::with_capacity(ids.len());
        for id in ids {
          let queued = load_variant(conn, &sql.queue.by_id, id)?;
          let live = load_variant(conn, &sql.live.by_id, id)?;
          let review = conn
            .query_row(&sql.select_review, params![id], RawReview::from_row)
            .optional()?;
          loaded.push((queued, live, review));
        }
        Ok(loaded)
      })
      .await?;

    let mut results = Vec::new();
    for (queued, live, review) in loaded {
      let review = review.map(RawReview::into_review).transpose()?;
      // Queue-then-live precedence: with nothing staged, the live row is
      // diffed against itself so only the review can surface it.
      let Some(staged) = queued.or_else(|| live.clone()) else {
        continue;
      };
      if let Some(result) = diff::diff_staged(&staged, live.as_ref(), review.as_ref()) {
        results.push(result);
      }
    }

    let changes = diff::collect(results);
    tracing::debug!(
      target_id = ?id,
      variants = changes.as_ref().map_or(0, |c| c.len()),
      "computed unreleased changes"
    );
    Ok(changes)
  }

  // ── Review ledger ─────────────────────────────────────────────────────────

  async fn get_review(&self, id: VariantId) -> Result<Option<ReviewRecord>> {
    let sql = self.sql.clone();
    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql.select_review, params![id], RawReview::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawReview::into_review).transpose()
  }

  async fn update_review(
    &self,
    id: VariantId,
    update: ReviewUpdate,
    actor: &str,
  ) -> Result<ReviewRecord> {
    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let now = encode_dt(Utc::now());

    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(&sql.select_review, params![id], RawReview::from_row)
          .optional()?;
        let row = match load_variant(&tx, &sql.queue.by_id, id)? {
          Some(row) => Some(row),
          None => load_variant(&tx, &sql.live.by_id, id)?,
        };
        let Some(row) = row else {
          return Ok(None);
        };

        let confirmed = update
          .confirmed_for_release
          .unwrap_or_else(|| existing.as_ref().is_some_and(|r| r.confirmed_for_release));
        let scheduled = update
          .scheduled_for_deletion
          .unwrap_or_else(|| existing.as_ref().is_some_and(|r| r.scheduled_for_deletion));
        let comments = match &update.informatics_comments {
          Some(c) => c.clone(),
          None => existing.and_then(|r| r.informatics_comments),
        };

        tx.execute(
          &sql.upsert_review,
          params![id, confirmed, scheduled, comments, now],
        )?;

        let mut fields = Vec::new();
        if update.confirmed_for_release.is_some() {
          fields.push("confirmed_for_release");
        }
        if update.scheduled_for_deletion.is_some() {
          fields.push("scheduled_for_deletion");
        }
        if update.informatics_comments.is_some() {
          fields.push("informatics_comments");
        }
        Audit {
          actor: &actor_name,
          action: Action::Review,
          variant_id: Some(id),
          label: Some(row.label()),
          fields,
        }
        .write(&tx, &sql, &now)?;

        let saved = tx.query_row(&sql.select_review, params![id], RawReview::from_row)?;
        tx.commit()?;
        Ok(Some(saved))
      })
      .await?;

    let review = raw.ok_or(Error::VariantNotFound(id))?.into_review()?;
    tracing::info!(
      actor,
      id,
      confirmed = review.confirmed_for_release,
      scheduled_for_deletion = review.scheduled_for_deletion,
      "updated review"
    );
    Ok(review)
  }

  // ── Release ───────────────────────────────────────────────────────────────

  async fn release(&self, version: u32, confirmed_only: bool, actor: &str) -> Result<ReleaseReport> {
    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let now = encode_dt(Utc::now());

    // Dropping the transaction without committing rolls every step back.
    let report: Option<ReleaseReport> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let deletions: Vec<VariantId> =
          query_all(&tx, &sql.deletion_set, params![confirmed_only], |r| r.get(0))?;
        let updates: Vec<VariantId> =
          query_all(&tx, &sql.update_set, params![confirmed_only], |r| r.get(0))?;

        if deletions.is_empty() && updates.is_empty() && version != BOOTSTRAP_VERSION {
          return Ok(None);
        }

        for &id in &deletions {
          if let Some(row) = load_variant(&tx, &sql.live.by_id, id)? {
            tx.execute(
              &sql.archive,
              params![
                HistoryKind::ReleasedDeletion.as_str(),
                row.variation(),
                id,
                row.to_json().to_string(),
                now,
              ],
            )?;
          }
          tx.execute(&sql.delete_review, params![id])?;
          tx.execute(&sql.delete_queue, params![id])?;
          tx.execute(&sql.delete_live, params![id])?;
        }

        let mut merged = Vec::with_capacity(updates.len());
        for &id in &updates {
          if tx.execute(&sql.merge, params![id])? > 0 {
            merged.push(id);
          }
          tx.execute(&sql.delete_queue, params![id])?;
          tx.execute(&sql.delete_review, params![id])?;
          // Nothing was ever staged for this id; its reservation lapses.
          tx.execute(&sql.delete_ghost, params![id])?;
        }

        let (variants, genes): (i64, i64) =
          tx.query_row(&sql.live_totals, [], |r| Ok((r.get(0)?, r.get(1)?)))?;
        tx.execute(&sql.insert_version, params![version, now, variants, genes])?;

        tx.execute(&sql.clear_counts, [])?;
        tx.execute(&sql.rebuild_counts, [])?;

        Audit {
          actor:      &actor_name,
          action:     Action::Release,
          variant_id: None,
          label:      Some(format!("version {version}")),
          fields:     Vec::new(),
        }
        .write(&tx, &sql, &now)?;

        tx.commit()?;
        Ok(Some(ReleaseReport {
          version,
          deleted: deletions,
          merged,
          variants: variants.max(0) as u64,
          genes: genes.max(0) as u64,
        }))
      })
      .await?;

    let report = report.ok_or(Error::NothingToRelease { version })?;
    tracing::info!(
      actor,
      version,
      confirmed_only,
      deleted = report.deleted.len(),
      merged = report.merged.len(),
      variants = report.variants,
      genes = report.genes,
      "released"
    );
    Ok(report)
  }

  // ── Expert overlay ────────────────────────────────────────────────────────

  async fn load_expert_overrides(
    &self,
    overrides: Vec<ExpertOverride>,
    actor: &str,
  ) -> Result<usize> {
    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let now = encode_dt(Utc::now());

    let (loaded, superseded) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut superseded = 0usize;

        for o in &overrides {
          let previous = tx
            .query_row(&sql.select_expert, params![o.variation], read_expert)
            .optional()?;
          if let Some(previous) = previous {
            let payload = serde_json::to_string(&previous).map_err(other)?;
            tx.execute(
              &sql.archive,
              params![
                HistoryKind::SupersededOverride.as_str(),
                previous.variation,
                Option::<VariantId>::None,
                payload,
                now,
              ],
            )?;
            superseded += 1;
          }

          tx.execute(
            &sql.upsert_expert,
            params![
              o.variation,
              o.gene,
              o.chr,
              o.pos,
              o.ref_allele,
              o.alt_allele,
              o.pathogenicity,
              o.disease,
              o.pubmed_id,
              o.comments,
              o.delete_on_release,
              o.disabled,
              now,
            ],
          )?;

          Audit {
            actor:      &actor_name,
            action:     Action::ExpertLoad,
            variant_id: None,
            label:      Some(o.variation.clone()),
            fields:     Vec::new(),
          }
          .write(&tx, &sql, &now)?;
        }

        tx.commit()?;
        Ok((overrides.len(), superseded))
      })
      .await?;

    tracing::info!(actor, loaded, superseded, "loaded expert overrides");
    Ok(loaded)
  }

  async fn apply_expert_overrides(&self, actor: &str) -> Result<OverlayReport> {
    let sql = self.sql.clone();
    let actor_name = actor.to_owned();
    let now = encode_dt(Utc::now());

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let overrides = query_all(&tx, &sql.list_expert, [], read_expert)?;
        let mut report = OverlayReport::default();

        for o in overrides.iter().filter(|o| !o.disabled) {
          let updated: Vec<VariantId> = query_all(
            &tx,
            &sql.apply_expert,
            params![o.variation, o.pathogenicity, o.disease, o.pubmed_id, o.comments],
            |r| r.get(0),
          )?;

          for &id in &updated {
            tx.execute(&sql.touch_review, params![id, now])?;
            Audit {
              actor:      &actor_name,
              action:     Action::ExpertApply,
              variant_id: Some(id),
              label:      Some(o.variation.clone()),
              fields:     OVERRIDE_FIELDS.to_vec(),
            }
            .write(&tx, &sql, &now)?;
          }
          report.updated.extend(updated);

          if o.deletes() {
            let ids: Vec<VariantId> =
              query_all(&tx, &sql.queue_ids_for, params![o.variation], |r| r.get(0))?;
            for id in ids {
              if tx.execute(&sql.schedule_review, params![id, now])? > 0 {
                report.scheduled.push(id);
              }
            }
          }
        }

        tx.commit()?;
        Ok(report)
      })
      .await?;

    tracing::info!(
      actor,
      updated = report.updated.len(),
      scheduled = report.scheduled.len(),
      "applied expert overrides"
    );
    Ok(report)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Which of a tier's prepared reads to run.
#[derive(Debug, Clone, Copy)]
enum TierQuery {
  Prefix,
  Gene,
  All,
}

impl TierQuery {
  fn text(self, sql: &TierSql) -> &str {
    match self {
      Self::Prefix => &sql.by_prefix,
      Self::Gene => &sql.by_gene,
      Self::All => &sql.all,
    }
  }
}

/// Outcome of staging field updates for one id.
enum Staged {
  Written { row: Variant, fields: Vec<&'static str> },
  /// No queue row, and the updates match the live row.
  Unchanged,
  /// Neither tier has the id.
  Missing,
}

/// Removal counts for one id.
#[derive(Debug, Clone, Copy)]
struct Removed {
  queue:  usize,
  review: usize,
  ghost:  usize,
}

impl Removed {
  fn any(self) -> bool { self.queue + self.review + self.ghost > 0 }
}

/// One `activity_log` row.
struct Audit<'a> {
  actor:      &'a str,
  action:     Action,
  variant_id: Option<VariantId>,
  label:      Option<String>,
  fields:     Vec<&'static str>,
}

impl Audit<'_> {
  fn write(&self, conn: &Connection, sql: &Sql, now: &str) -> tokio_rusqlite::Result<()> {
    let fields = serde_json::to_string(&self.fields).map_err(other)?;
    conn.execute(
      &sql.audit,
      params![now, self.actor, self.action.as_str(), self.variant_id, self.label, fields],
    )?;
    Ok(())
  }
}

fn other<E: std::error::Error + Send + Sync + 'static>(e: E) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, f: F) -> rusqlite::Result<Vec<T>>
where
  P: Params,
  F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, f)?.collect::<rusqlite::Result<Vec<T>>>()?;
  Ok(rows)
}

fn load_variant(
  conn: &Connection,
  sql: &str,
  id: VariantId,
) -> tokio_rusqlite::Result<Option<Variant>> {
  conn
    .query_row(sql, params![id], RawVariant::from_row)
    .optional()?
    .map(|raw| Variant::from_values(raw.id, raw.values))
    .transpose()
    .map_err(other)
}

fn write_queue(conn: &Connection, sql: &Sql, row: &Variant) -> rusqlite::Result<()> {
  let mut values: Vec<&dyn ToSql> = Vec::with_capacity(row.values().len() + 1);
  values.push(&row.id);
  values.extend(row.values().iter().map(|v| v as &dyn ToSql));
  conn.execute(&sql.upsert_queue, values.as_slice())?;
  Ok(())
}

/// Apply `updates` to the staged row for `id`, materialising one from the
/// live row when nothing is staged yet and the updates change something.
fn stage_fields(
  conn: &Connection,
  sql: &Sql,
  id: VariantId,
  updates: &FieldUpdates,
) -> tokio_rusqlite::Result<Staged> {
  let (mut row, fields) = match load_variant(conn, &sql.queue.by_id, id)? {
    Some(queued) => {
      let fields = queued.differing_fields(updates);
      (queued, fields)
    }
    None => {
      let Some(live) = load_variant(conn, &sql.live.by_id, id)? else {
        return Ok(Staged::Missing);
      };
      let fields = live.differing_fields(updates);
      if fields.is_empty() {
        return Ok(Staged::Unchanged);
      }
      (live, fields)
    }
  };

  row.apply(updates);
  write_queue(conn, sql, &row)?;
  Ok(Staged::Written { row, fields })
}

/// Delete the queue and review rows for `id`, and its live row if that is
/// still a ghost.
fn remove_changes(
  conn: &Connection,
  sql: &Sql,
  id: VariantId,
  actor: &str,
  now: &str,
) -> tokio_rusqlite::Result<Removed> {
  let label = match load_variant(conn, &sql.queue.by_id, id)? {
    Some(row) => Some(row.label()),
    None => load_variant(conn, &sql.live.by_id, id)?.map(|row| row.label()),
  };

  let removed = Removed {
    queue:  conn.execute(&sql.delete_queue, params![id])?,
    review: conn.execute(&sql.delete_review, params![id])?,
    ghost:  conn.execute(&sql.delete_ghost, params![id])?,
  };

  if removed.any() {
    Audit { actor, action: Action::Delete, variant_id: Some(id), label, fields: Vec::new() }
      .write(conn, sql, now)?;
  }
  Ok(removed)
}
