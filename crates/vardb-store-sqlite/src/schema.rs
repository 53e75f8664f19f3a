//! SQL schema for the SQLite curation store.
//!
//! Generated from the injected [`TableNames`] and the static variant field
//! descriptor, then executed once at connection startup. The version written
//! to `PRAGMA user_version` is [`SCHEMA_VERSION`].

use std::fmt::Write as _;

use vardb_core::schema::{SCHEMA_VERSION, VARIANT_FIELDS};

use crate::tables::TableNames;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub fn ddl(t: &TableNames) -> String {
  let mut live_columns = String::new();
  for field in VARIANT_FIELDS {
    let _ = write!(live_columns, ",\n    {} TEXT", field.name);
  }

  format!(
    "
PRAGMA journal_mode = WAL;

-- Published rows. Ids are only ever generated here; a row with neither a
-- variation nor an HGVS nucleotide change is a ghost reserving an id.
CREATE TABLE IF NOT EXISTS {live} (
    id INTEGER PRIMARY KEY AUTOINCREMENT{live_columns}
);

-- Staged rows, keyed by the id of their live row.
CREATE TABLE IF NOT EXISTS {queue} (
    id INTEGER PRIMARY KEY{live_columns}
);

CREATE TABLE IF NOT EXISTS {reviews} (
    variant_id             INTEGER PRIMARY KEY,
    confirmed_for_release  INTEGER NOT NULL DEFAULT 0,
    scheduled_for_deletion INTEGER NOT NULL DEFAULT 0,
    informatics_comments   TEXT,
    created                TEXT NOT NULL,   -- ISO 8601 UTC
    updated                TEXT NOT NULL
);

-- Append-only; one row per release.
CREATE TABLE IF NOT EXISTS {versions} (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    version  INTEGER NOT NULL,
    created  TEXT NOT NULL,
    updated  TEXT NOT NULL,
    variants INTEGER NOT NULL,
    genes    INTEGER NOT NULL
);

-- Derived; rebuilt wholesale by every release.
CREATE TABLE IF NOT EXISTS {gene_counts} (
    gene  TEXT PRIMARY KEY,
    count INTEGER NOT NULL
);

-- Append-only archive of released deletions and superseded overrides.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS {history} (
    entry_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL,   -- 'released_deletion' | 'superseded_override'
    variation   TEXT,
    variant_id  INTEGER,
    payload     TEXT NOT NULL,   -- JSON of the archived row
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS {expert} (
    variation         TEXT PRIMARY KEY,
    gene              TEXT,
    chr               TEXT,
    pos               TEXT,
    ref               TEXT,
    alt               TEXT,
    pathogenicity     TEXT,
    disease           TEXT,
    pubmed_id         TEXT,
    comments          TEXT,
    delete_on_release INTEGER NOT NULL DEFAULT 0,
    disabled          INTEGER NOT NULL DEFAULT 0,
    updated           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS {activity} (
    entry_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at TEXT NOT NULL,
    actor       TEXT NOT NULL,
    action      TEXT NOT NULL,
    variant_id  INTEGER,
    label       TEXT,
    fields      TEXT NOT NULL DEFAULT '[]'   -- JSON array of field names
);

CREATE INDEX IF NOT EXISTS {live}_variation_idx  ON {live}(variation);
CREATE INDEX IF NOT EXISTS {live}_gene_idx       ON {live}(gene);
CREATE INDEX IF NOT EXISTS {queue}_variation_idx ON {queue}(variation);
CREATE INDEX IF NOT EXISTS {queue}_gene_idx      ON {queue}(gene);

PRAGMA user_version = {SCHEMA_VERSION};
",
    live = t.live,
    queue = t.queue,
    reviews = t.reviews,
    versions = t.versions,
    gene_counts = t.gene_counts,
    history = t.history,
    expert = t.expert,
    activity = t.activity,
  )
}

/// Descriptor columns missing from a table, given its `PRAGMA table_info`
/// column names.
pub fn missing_columns(present: &[String]) -> Vec<&'static str> {
  VARIANT_FIELDS
    .iter()
    .map(|f| f.name)
    .filter(|name| !present.iter().any(|p| p == name))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ddl_uses_injected_names() {
    let names = TableNames { live: "vd_live".into(), ..TableNames::default() };
    let sql = ddl(&names);
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS vd_live ("));
    assert!(sql.contains("hgvs_nucleotide_change TEXT"));
    assert!(!sql.contains("EXISTS variations ("));
  }

  #[test]
  fn reports_missing_columns() {
    let present: Vec<String> = VARIANT_FIELDS
      .iter()
      .map(|f| f.name.to_owned())
      .filter(|n| n != "gene")
      .collect();
    assert_eq!(missing_columns(&present), vec!["gene"]);
  }
}
