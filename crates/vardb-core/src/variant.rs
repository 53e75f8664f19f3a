//! Variant records and staged field updates.
//!
//! A [`Variant`] is one row of either tier: the published live table or the
//! staging queue. Both tiers share the same id for the same variant, and both
//! hold exactly the columns of [`VARIANT_FIELDS`].

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
  Error, Result,
  schema::{self, VARIANT_FIELDS},
};

/// Row id shared by a live row and its queue entry. Issued by the live table.
pub type VariantId = i64;

/// Caller-supplied field values before sanitisation, keyed by column name.
pub type RawFields = IndexMap<String, Option<String>>;

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Which of the two tables a read targets.
///
/// Reads against [`Tier::Queue`] fall back to [`Tier::Live`] when the queue
/// has no match, so staged data always takes precedence over published data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  #[default]
  Queue,
  Live,
}

impl Tier {
  /// The tier to re-query when this one has no match.
  pub fn fallback(self) -> Option<Tier> {
    match self {
      Tier::Queue => Some(Tier::Live),
      Tier::Live => None,
    }
  }
}

// ─── Pathogenicity ───────────────────────────────────────────────────────────

/// Clinical classification of a variant.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Pathogenicity {
  #[serde(rename = "Pathogenic")]
  Pathogenic,
  #[serde(rename = "Likely pathogenic")]
  LikelyPathogenic,
  #[serde(rename = "Unknown significance")]
  UnknownSignificance,
  #[serde(rename = "Likely benign")]
  LikelyBenign,
  #[serde(rename = "Benign")]
  Benign,
  #[serde(rename = "Benign*")]
  BenignStar,
}

impl Pathogenicity {
  pub const ALL: [Self; 6] = [
    Self::Pathogenic,
    Self::LikelyPathogenic,
    Self::UnknownSignificance,
    Self::LikelyBenign,
    Self::Benign,
    Self::BenignStar,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Self::Pathogenic => "Pathogenic",
      Self::LikelyPathogenic => "Likely pathogenic",
      Self::UnknownSignificance => "Unknown significance",
      Self::LikelyBenign => "Likely benign",
      Self::Benign => "Benign",
      Self::BenignStar => "Benign*",
    }
  }
}

impl fmt::Display for Pathogenicity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for Pathogenicity {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim();
    Self::ALL
      .into_iter()
      .find(|p| p.label().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| Error::UnknownPathogenicity(s.to_owned()))
  }
}

// ─── Variant ─────────────────────────────────────────────────────────────────

/// One row of the live table or the queue.
///
/// Values are positionally aligned with [`VARIANT_FIELDS`]; `None` is SQL
/// NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
  pub id: VariantId,
  values: Vec<Option<String>>,
}

impl Variant {
  /// A row with every field NULL: the placeholder reserved in the live table
  /// for a new variant before its data is released.
  pub fn ghost(id: VariantId) -> Self {
    Self { id, values: vec![None; VARIANT_FIELDS.len()] }
  }

  /// Build from values in schema order.
  pub fn from_values(id: VariantId, values: Vec<Option<String>>) -> Result<Self> {
    if values.len() != VARIANT_FIELDS.len() {
      return Err(Error::FieldCount {
        expected: VARIANT_FIELDS.len(),
        found:    values.len(),
      });
    }
    Ok(Self { id, values })
  }

  pub fn values(&self) -> &[Option<String>] { &self.values }

  /// Value of a schema field; `None` for NULL or for unknown field names.
  pub fn get(&self, field: &str) -> Option<&str> {
    schema::field_index(field).and_then(|i| self.values[i].as_deref())
  }

  /// Set a schema field. Returns `false` when `field` is not a column.
  pub fn set(&mut self, field: &str, value: Option<String>) -> bool {
    match schema::field_index(field) {
      Some(i) => {
        self.values[i] = value;
        true
      }
      None => false,
    }
  }

  /// `(field, value)` pairs in schema order.
  pub fn fields(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
    VARIANT_FIELDS
      .iter()
      .zip(&self.values)
      .map(|(spec, value)| (spec.name, value.as_deref()))
  }

  pub fn variation(&self) -> Option<&str> { self.get("variation") }

  pub fn gene(&self) -> Option<&str> { self.get("gene") }

  pub fn hgvs_protein_change(&self) -> Option<&str> { self.get("hgvs_protein_change") }

  pub fn pathogenicity(&self) -> Option<Pathogenicity> {
    self.get("pathogenicity").and_then(|p| p.parse().ok())
  }

  /// A ghost row has neither a variation nor an HGVS nucleotide change.
  pub fn is_ghost(&self) -> bool {
    self.variation().is_none() && self.get("hgvs_nucleotide_change").is_none()
  }

  /// `gene|protein|variation`, with placeholders for missing parts.
  pub fn label(&self) -> String {
    format!(
      "{}|{}|{}",
      self.gene().unwrap_or("MISSING_GENE"),
      self.hgvs_protein_change().unwrap_or("MISSING_PROTEIN_CHANGE"),
      self.variation().unwrap_or("MISSING_VARIATION"),
    )
  }

  /// Overwrite every field named in `updates`.
  pub fn apply(&mut self, updates: &FieldUpdates) {
    for (field, value) in updates.iter() {
      self.set(field, value.map(str::to_owned));
    }
  }

  /// Names of the fields in `updates` whose value differs from this row.
  pub fn differing_fields(&self, updates: &FieldUpdates) -> Vec<&'static str> {
    updates
      .iter()
      .filter(|(field, value)| self.get(field) != *value)
      .map(|(field, _)| field)
      .collect()
  }

  /// JSON object of `id` plus every field; used for archive payloads.
  pub fn to_json(&self) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("id".into(), self.id.into());
    for (field, value) in self.fields() {
      map.insert(field.into(), value.map_or(serde_json::Value::Null, Into::into));
    }
    serde_json::Value::Object(map)
  }
}

impl Serialize for Variant {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
    map.serialize_entry("id", &self.id)?;
    for (field, value) in self.fields() {
      map.serialize_entry(field, &value)?;
    }
    map.end()
  }
}

// ─── Field updates ───────────────────────────────────────────────────────────

/// Sanitised field values: keys are guaranteed schema columns, strings are
/// trimmed and empty strings are NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldUpdates(IndexMap<&'static str, Option<String>>);

impl FieldUpdates {
  pub fn new() -> Self { Self::default() }

  /// Sanitise raw input against the schema. Unknown keys (including `id`)
  /// are dropped.
  pub fn sanitize<I, K, V>(raw: I) -> Self
  where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut clean = IndexMap::new();
    for (key, value) in raw {
      let Some(name) = schema::canonical_name(key.as_ref()) else {
        continue;
      };
      clean.insert(name, clean_value(value.as_ref().map(|v| v.as_ref())));
    }
    Self(clean)
  }

  /// Insert one value, applying the same cleaning rules as [`Self::sanitize`].
  /// Returns `false` when `field` is not a schema column.
  pub fn insert(&mut self, field: &str, value: Option<&str>) -> bool {
    match schema::canonical_name(field) {
      Some(name) => {
        self.0.insert(name, clean_value(value));
        true
      }
      None => false,
    }
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.0.get(field).and_then(|v| v.as_deref())
  }

  pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

  pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
    self.0.iter().map(|(k, v)| (*k, v.as_deref()))
  }

  pub fn field_names(&self) -> Vec<&'static str> { self.0.keys().copied().collect() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// A full row built by applying these updates to a ghost row.
  pub fn to_variant(&self, id: VariantId) -> Variant {
    let mut variant = Variant::ghost(id);
    variant.apply(self);
    variant
  }
}

fn clean_value(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// True for NULL and for the empty string.
pub fn is_blank(value: Option<&str>) -> bool { value.is_none_or(str::is_empty) }
