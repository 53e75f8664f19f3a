//! Statement text, rendered once per store from the injected table names.
//!
//! Closures handed to `tokio_rusqlite` must be `'static`, so the store keeps
//! these behind an `Arc` and clones the handle into each call.

use vardb_core::{schema::VARIANT_FIELDS, variant::Tier};

use crate::tables::TableNames;

/// Reads against one tier (live or queue).
pub struct TierSql {
  pub table:     String,
  pub by_id:     String,
  pub by_prefix: String,
  pub by_gene:   String,
  pub all:       String,
  pub columns:   String,
}

impl TierSql {
  fn new(table: &str, cols: &str) -> Self {
    let select = format!("SELECT id, {cols} FROM {table}");
    Self {
      table:     table.to_owned(),
      by_id:     format!("{select} WHERE id = ?1"),
      by_prefix: format!(
        "{select} WHERE substr(variation, 1, length(?1)) = ?1 ORDER BY variation, id"
      ),
      by_gene:   format!("{select} WHERE gene = ?1 ORDER BY variation, id"),
      all:       format!("{select} ORDER BY id"),
      columns:   format!("PRAGMA table_info({table})"),
    }
  }
}

pub struct Sql {
  pub live:  TierSql,
  pub queue: TierSql,

  // ── Variants ──────────────────────────────────────────────────────────
  pub find_variation: String,
  /// `find_variation` ignoring rows of the id being edited.
  pub find_other:     String,
  pub live_id_for:    String,
  pub queue_id_for:   String,
  pub insert_ghost:   String,
  pub upsert_queue:   String,
  pub delete_queue:   String,
  pub delete_ghost:   String,
  pub delete_live:    String,
  pub staged_ids:     String,

  // ── Reviews ───────────────────────────────────────────────────────────
  pub select_review:   String,
  pub list_reviews:    String,
  pub count_reviews:   String,
  pub touch_review:    String,
  pub upsert_review:   String,
  pub schedule_review: String,
  pub delete_review:   String,

  // ── Release ───────────────────────────────────────────────────────────
  pub deletion_set:   String,
  pub update_set:     String,
  pub merge:          String,
  pub live_totals:    String,
  pub insert_version: String,
  pub list_versions:  String,
  pub max_version:    String,
  pub clear_counts:   String,
  pub rebuild_counts: String,
  pub gene_counts:    String,

  // ── Logs ──────────────────────────────────────────────────────────────
  pub archive:       String,
  pub list_history:  String,
  pub audit:         String,
  pub list_activity: String,

  // ── Expert overlay ────────────────────────────────────────────────────
  pub select_expert:  String,
  pub list_expert:    String,
  pub upsert_expert:  String,
  pub apply_expert:   String,
  pub queue_ids_for:  String,
}

const EXPERT_COLUMNS: &str = "variation, gene, chr, pos, ref, alt, pathogenicity, disease, \
                              pubmed_id, comments, delete_on_release, disabled";

const REVIEW_COLUMNS: &str = "variant_id, confirmed_for_release, scheduled_for_deletion, \
                              informatics_comments, created, updated";

impl Sql {
  pub fn new(t: &TableNames) -> Self {
    let cols = VARIANT_FIELDS
      .iter()
      .map(|f| f.name)
      .collect::<Vec<_>>()
      .join(", ");
    let placeholders = (1..=VARIANT_FIELDS.len() + 1)
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");

    let (live, queue, reviews) = (&t.live, &t.queue, &t.reviews);

    Self {
      live:  TierSql::new(live, &cols),
      queue: TierSql::new(queue, &cols),

      find_variation: format!(
        "SELECT id FROM {live} WHERE variation = ?1
         UNION ALL
         SELECT id FROM {queue} WHERE variation = ?1
         LIMIT 1"
      ),
      find_other:     format!(
        "SELECT id FROM {live} WHERE variation = ?1 AND id <> ?2
         UNION ALL
         SELECT id FROM {queue} WHERE variation = ?1 AND id <> ?2
         LIMIT 1"
      ),
      live_id_for:    format!("SELECT id FROM {live} WHERE variation = ?1 ORDER BY id LIMIT 1"),
      queue_id_for:   format!("SELECT id FROM {queue} WHERE variation = ?1 ORDER BY id LIMIT 1"),
      insert_ghost:   format!("INSERT INTO {live} (variation) VALUES (NULL)"),
      upsert_queue:   format!(
        "INSERT OR REPLACE INTO {queue} (id, {cols}) VALUES ({placeholders})"
      ),
      delete_queue:   format!("DELETE FROM {queue} WHERE id = ?1"),
      delete_ghost:   format!(
        "DELETE FROM {live}
         WHERE id = ?1 AND variation IS NULL AND hgvs_nucleotide_change IS NULL"
      ),
      delete_live:    format!("DELETE FROM {live} WHERE id = ?1"),
      staged_ids:     format!(
        "SELECT id FROM {queue} UNION SELECT variant_id FROM {reviews} ORDER BY 1"
      ),

      select_review:   format!("SELECT {REVIEW_COLUMNS} FROM {reviews} WHERE variant_id = ?1"),
      list_reviews:    format!("SELECT {REVIEW_COLUMNS} FROM {reviews} ORDER BY variant_id"),
      count_reviews:   format!("SELECT COUNT(*) FROM {reviews}"),
      touch_review:    format!(
        "INSERT INTO {reviews} (variant_id, created, updated) VALUES (?1, ?2, ?2)
         ON CONFLICT(variant_id) DO UPDATE SET updated = excluded.updated"
      ),
      upsert_review:   format!(
        "INSERT INTO {reviews} ({REVIEW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(variant_id) DO UPDATE SET
           confirmed_for_release  = excluded.confirmed_for_release,
           scheduled_for_deletion = excluded.scheduled_for_deletion,
           informatics_comments   = excluded.informatics_comments,
           updated                = excluded.updated"
      ),
      schedule_review: format!(
        "INSERT INTO {reviews} (variant_id, scheduled_for_deletion, created, updated)
         VALUES (?1, 1, ?2, ?2)
         ON CONFLICT(variant_id) DO UPDATE SET
           scheduled_for_deletion = 1,
           updated                = excluded.updated
         WHERE scheduled_for_deletion = 0"
      ),
      delete_review:   format!("DELETE FROM {reviews} WHERE variant_id = ?1"),

      deletion_set:   format!(
        "SELECT variant_id FROM {reviews}
         WHERE scheduled_for_deletion = 1 AND (?1 = 0 OR confirmed_for_release = 1)
         ORDER BY variant_id"
      ),
      update_set:     format!(
        "SELECT variant_id FROM {reviews}
         WHERE scheduled_for_deletion = 0 AND (?1 = 0 OR confirmed_for_release = 1)
         ORDER BY variant_id"
      ),
      merge:          format!(
        "UPDATE {live} SET ({cols}) = (SELECT {cols} FROM {queue} WHERE {queue}.id = {live}.id)
         WHERE id = ?1 AND EXISTS (SELECT 1 FROM {queue} WHERE {queue}.id = ?1)"
      ),
      live_totals:    format!(
        "SELECT COUNT(*), COUNT(DISTINCT gene) FROM {live}"
      ),
      insert_version: format!(
        "INSERT INTO {} (version, created, updated, variants, genes)
         VALUES (?1, ?2, ?2, ?3, ?4)",
        t.versions
      ),
      list_versions:  format!(
        "SELECT version, created, updated, variants, genes FROM {} ORDER BY entry_id",
        t.versions
      ),
      max_version:    format!("SELECT MAX(version) FROM {}", t.versions),
      clear_counts:   format!("DELETE FROM {}", t.gene_counts),
      rebuild_counts: format!(
        "INSERT INTO {} (gene, count)
         SELECT gene, COUNT(*) FROM {live} WHERE gene IS NOT NULL GROUP BY gene",
        t.gene_counts
      ),
      gene_counts:    format!("SELECT gene, count FROM {} ORDER BY gene", t.gene_counts),

      archive:       format!(
        "INSERT INTO {} (kind, variation, variant_id, payload, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        t.history
      ),
      list_history:  format!(
        "SELECT entry_id, kind, variation, variant_id, payload, recorded_at
         FROM {} ORDER BY entry_id",
        t.history
      ),
      audit:         format!(
        "INSERT INTO {} (recorded_at, actor, action, variant_id, label, fields)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        t.activity
      ),
      list_activity: format!(
        "SELECT entry_id, recorded_at, actor, action, variant_id, label, fields
         FROM {} ORDER BY entry_id",
        t.activity
      ),

      select_expert: format!("SELECT {EXPERT_COLUMNS} FROM {} WHERE variation = ?1", t.expert),
      list_expert:   format!("SELECT {EXPERT_COLUMNS} FROM {} ORDER BY variation", t.expert),
      upsert_expert: format!(
        "INSERT INTO {} ({EXPERT_COLUMNS}, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(variation) DO UPDATE SET
           gene              = excluded.gene,
           chr               = excluded.chr,
           pos               = excluded.pos,
           ref               = excluded.ref,
           alt               = excluded.alt,
           pathogenicity     = excluded.pathogenicity,
           disease           = excluded.disease,
           pubmed_id         = excluded.pubmed_id,
           comments          = excluded.comments,
           delete_on_release = excluded.delete_on_release,
           disabled          = excluded.disabled,
           updated           = excluded.updated",
        t.expert
      ),
      apply_expert:  format!(
        "UPDATE {queue}
         SET pathogenicity = ?2, disease = ?3, pubmed_id = ?4, comments = ?5
         WHERE variation = ?1
         RETURNING id"
      ),
      queue_ids_for: format!("SELECT id FROM {queue} WHERE variation = ?1 ORDER BY id"),
    }
  }

  pub fn tier(&self, tier: Tier) -> &TierSql {
    match tier {
      Tier::Live => &self.live,
      Tier::Queue => &self.queue,
    }
  }
}
