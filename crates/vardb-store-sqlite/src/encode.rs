//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Field lists and archived rows are compact
//! JSON. Flags are stored as integers.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use vardb_core::{
  expert::ExpertOverride,
  log::{Action, ActivityEntry, HistoryEntry, HistoryKind},
  review::{ReviewRecord, VersionRecord},
  schema::VARIANT_FIELDS,
  variant::{Variant, VariantId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Variant rows ────────────────────────────────────────────────────────────

/// `id` followed by every descriptor column, as selected by `TierSql`.
pub struct RawVariant {
  pub id:     VariantId,
  pub values: Vec<Option<String>>,
}

impl RawVariant {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let id = row.get(0)?;
    let values = (1..=VARIANT_FIELDS.len())
      .map(|i| row.get(i))
      .collect::<rusqlite::Result<Vec<Option<String>>>>()?;
    Ok(Self { id, values })
  }

  pub fn into_variant(self) -> Result<Variant> { Ok(Variant::from_values(self.id, self.values)?) }
}

// ─── Reviews and versions ────────────────────────────────────────────────────

pub struct RawReview {
  pub variant_id:             VariantId,
  pub confirmed_for_release:  bool,
  pub scheduled_for_deletion: bool,
  pub informatics_comments:   Option<String>,
  pub created:                String,
  pub updated:                String,
}

impl RawReview {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      variant_id:             row.get(0)?,
      confirmed_for_release:  row.get(1)?,
      scheduled_for_deletion: row.get(2)?,
      informatics_comments:   row.get(3)?,
      created:                row.get(4)?,
      updated:                row.get(5)?,
    })
  }

  pub fn into_review(self) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
      variant_id:             self.variant_id,
      confirmed_for_release:  self.confirmed_for_release,
      scheduled_for_deletion: self.scheduled_for_deletion,
      informatics_comments:   self.informatics_comments,
      created:                decode_dt(&self.created)?,
      updated:                decode_dt(&self.updated)?,
    })
  }
}

pub struct RawVersion {
  pub version:  i64,
  pub created:  String,
  pub updated:  String,
  pub variants: i64,
  pub genes:    i64,
}

impl RawVersion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version:  row.get(0)?,
      created:  row.get(1)?,
      updated:  row.get(2)?,
      variants: row.get(3)?,
      genes:    row.get(4)?,
    })
  }

  pub fn into_version(self) -> Result<VersionRecord> {
    Ok(VersionRecord {
      version:  u32::try_from(self.version).map_err(|e| Error::Decode(e.to_string()))?,
      created:  decode_dt(&self.created)?,
      updated:  decode_dt(&self.updated)?,
      variants: self.variants.max(0) as u64,
      genes:    self.genes.max(0) as u64,
    })
  }
}

// ─── Logs ────────────────────────────────────────────────────────────────────

pub struct RawHistory {
  pub entry_id:    i64,
  pub kind:        String,
  pub variation:   Option<String>,
  pub variant_id:  Option<VariantId>,
  pub payload:     String,
  pub recorded_at: String,
}

impl RawHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:    row.get(0)?,
      kind:        row.get(1)?,
      variation:   row.get(2)?,
      variant_id:  row.get(3)?,
      payload:     row.get(4)?,
      recorded_at: row.get(5)?,
    })
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      entry_id:    self.entry_id,
      kind:        self.kind.parse::<HistoryKind>().map_err(Error::Decode)?,
      variation:   self.variation,
      variant_id:  self.variant_id,
      payload:     serde_json::from_str(&self.payload)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

pub struct RawActivity {
  pub entry_id:    i64,
  pub recorded_at: String,
  pub actor:       String,
  pub action:      String,
  pub variant_id:  Option<VariantId>,
  pub label:       Option<String>,
  pub fields:      String,
}

impl RawActivity {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:    row.get(0)?,
      recorded_at: row.get(1)?,
      actor:       row.get(2)?,
      action:      row.get(3)?,
      variant_id:  row.get(4)?,
      label:       row.get(5)?,
      fields:      row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      entry_id:    self.entry_id,
      recorded_at: decode_dt(&self.recorded_at)?,
      actor:       self.actor,
      action:      self.action.parse::<Action>().map_err(Error::Decode)?,
      variant_id:  self.variant_id,
      label:       self.label,
      fields:      serde_json::from_str(&self.fields)?,
    })
  }
}

// ─── Expert overrides ────────────────────────────────────────────────────────

pub fn read_expert(row: &Row<'_>) -> rusqlite::Result<ExpertOverride> {
  Ok(ExpertOverride {
    variation:         row.get(0)?,
    gene:              row.get(1)?,
    chr:               row.get(2)?,
    pos:               row.get(3)?,
    ref_allele:        row.get(4)?,
    alt_allele:        row.get(5)?,
    pathogenicity:     row.get(6)?,
    disease:           row.get(7)?,
    pubmed_id:         row.get(8)?,
    comments:          row.get(9)?,
    delete_on_release: row.get(10)?,
    disabled:          row.get(11)?,
  })
}
