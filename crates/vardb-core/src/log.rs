//! Append-only history and the curation audit trail.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::variant::VariantId;

// ─── History log ─────────────────────────────────────────────────────────────

/// Why a row was archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
  /// A live row removed by a release.
  ReleasedDeletion,
  /// An expert override replaced by a newer upload.
  SupersededOverride,
}

impl HistoryKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ReleasedDeletion => "released_deletion",
      Self::SupersededOverride => "superseded_override",
    }
  }
}

impl FromStr for HistoryKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "released_deletion" => Ok(Self::ReleasedDeletion),
      "superseded_override" => Ok(Self::SupersededOverride),
      other => Err(format!("unknown history kind: {other:?}")),
    }
  }
}

/// One archived value. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub entry_id:    i64,
  pub kind:        HistoryKind,
  pub variation:   Option<String>,
  pub variant_id:  Option<VariantId>,
  /// The archived row as JSON.
  pub payload:     serde_json::Value,
  pub recorded_at: DateTime<Utc>,
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  Add,
  Edit,
  Delete,
  Review,
  Release,
  ExpertLoad,
  ExpertApply,
  BulkLoad,
}

impl Action {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Add => "add",
      Self::Edit => "edit",
      Self::Delete => "delete",
      Self::Review => "review",
      Self::Release => "release",
      Self::ExpertLoad => "expert_load",
      Self::ExpertApply => "expert_apply",
      Self::BulkLoad => "bulk_load",
    }
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Action {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    [
      Self::Add,
      Self::Edit,
      Self::Delete,
      Self::Review,
      Self::Release,
      Self::ExpertLoad,
      Self::ExpertApply,
      Self::BulkLoad,
    ]
    .into_iter()
    .find(|a| a.as_str() == s)
    .ok_or_else(|| format!("unknown action: {s:?}"))
  }
}

/// Who touched which variant, and which fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub entry_id:    i64,
  pub recorded_at: DateTime<Utc>,
  pub actor:       String,
  pub action:      Action,
  pub variant_id:  Option<VariantId>,
  /// `gene|protein|variation` at the time of the write.
  pub label:       Option<String>,
  pub fields:      Vec<String>,
}
