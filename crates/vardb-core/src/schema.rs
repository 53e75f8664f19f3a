//! Static, versioned descriptor of the variant record.
//!
//! The live and queue tables share exactly this column set (plus `id`). DDL,
//! the release merge column list and field sanitisation are all derived from
//! [`VARIANT_FIELDS`], so nothing downstream discovers columns at runtime.

use serde::Serialize;

/// Bumped whenever [`VARIANT_FIELDS`] changes; stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

// ─── Field groups ─────────────────────────────────────────────────────────────

/// A population-frequency data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencySource {
  Evs,
  ThousandGenomes,
  Otoscope,
}

impl FrequencySource {
  pub const ALL: [Self; 3] = [Self::Evs, Self::ThousandGenomes, Self::Otoscope];

  /// Column-name prefix shared by every field from this source.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Evs => "evs_",
      Self::ThousandGenomes => "tg_",
      Self::Otoscope => "otoscope_",
    }
  }

  /// Name credited in the generated `comments` field.
  pub fn credit(self) -> &'static str {
    match self {
      Self::Evs => "ESP6500",
      Self::ThousandGenomes => "1000 Genomes",
      Self::Otoscope => "OtoSCOPE",
    }
  }

  /// Key used in configuration to enable the source.
  pub fn config_key(self) -> &'static str {
    match self {
      Self::Evs => "evs",
      Self::ThousandGenomes => "1000genomes",
      Self::Otoscope => "otoscope",
    }
  }

  pub fn from_config_key(key: &str) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|s| s.config_key().eq_ignore_ascii_case(key.trim()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
  /// Coordinates and nomenclature.
  Identity,
  /// Curator-maintained classification and references.
  Curation,
  /// In-silico prediction scores and labels.
  Prediction,
  Frequency(FrequencySource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub name:  &'static str,
  pub group: FieldGroup,
}

const fn field(name: &'static str, group: FieldGroup) -> FieldSpec {
  FieldSpec { name, group }
}

use FieldGroup::{Curation, Frequency, Identity, Prediction};
use FrequencySource::{Evs, Otoscope, ThousandGenomes};

// ─── Descriptor ───────────────────────────────────────────────────────────────

/// Every variant column except `id`, in storage order.
pub const VARIANT_FIELDS: &[FieldSpec] = &[
  field("variation", Identity),
  field("gene", Identity),
  field("hgvs_nucleotide_change", Identity),
  field("hgvs_protein_change", Identity),
  field("variantlocale", Identity),
  field("pathogenicity", Curation),
  field("disease", Curation),
  field("pubmed_id", Curation),
  field("dbsnp", Identity),
  field("summary_insilico", Curation),
  field("summary_frequency", Curation),
  field("summary_published", Curation),
  field("comments", Curation),
  field("phylop_score", Prediction),
  field("phylop_pred", Prediction),
  field("sift_score", Prediction),
  field("sift_pred", Prediction),
  field("polyphen2_score", Prediction),
  field("polyphen2_pred", Prediction),
  field("lrt_score", Prediction),
  field("lrt_omega", Prediction),
  field("lrt_pred", Prediction),
  field("mutationtaster_score", Prediction),
  field("mutationtaster_pred", Prediction),
  field("gerp_nr", Prediction),
  field("gerp_rs", Prediction),
  field("gerp_pred", Prediction),
  field("evs_ea_ac", Frequency(Evs)),
  field("evs_ea_an", Frequency(Evs)),
  field("evs_ea_af", Frequency(Evs)),
  field("evs_aa_ac", Frequency(Evs)),
  field("evs_aa_an", Frequency(Evs)),
  field("evs_aa_af", Frequency(Evs)),
  field("evs_all_ac", Frequency(Evs)),
  field("evs_all_an", Frequency(Evs)),
  field("evs_all_af", Frequency(Evs)),
  field("otoscope_aj_ac", Frequency(Otoscope)),
  field("otoscope_aj_af", Frequency(Otoscope)),
  field("otoscope_co_ac", Frequency(Otoscope)),
  field("otoscope_co_af", Frequency(Otoscope)),
  field("otoscope_us_ac", Frequency(Otoscope)),
  field("otoscope_us_af", Frequency(Otoscope)),
  field("otoscope_jp_ac", Frequency(Otoscope)),
  field("otoscope_jp_af", Frequency(Otoscope)),
  field("otoscope_es_ac", Frequency(Otoscope)),
  field("otoscope_es_af", Frequency(Otoscope)),
  field("otoscope_tr_ac", Frequency(Otoscope)),
  field("otoscope_tr_af", Frequency(Otoscope)),
  field("otoscope_all_ac", Frequency(Otoscope)),
  field("otoscope_all_af", Frequency(Otoscope)),
  field("tg_afr_ac", Frequency(ThousandGenomes)),
  field("tg_afr_af", Frequency(ThousandGenomes)),
  field("tg_eur_ac", Frequency(ThousandGenomes)),
  field("tg_eur_af", Frequency(ThousandGenomes)),
  field("tg_amr_ac", Frequency(ThousandGenomes)),
  field("tg_amr_af", Frequency(ThousandGenomes)),
  field("tg_asn_ac", Frequency(ThousandGenomes)),
  field("tg_asn_af", Frequency(ThousandGenomes)),
  field("tg_all_ac", Frequency(ThousandGenomes)),
  field("tg_all_af", Frequency(ThousandGenomes)),
];

/// Ordered column list of the TSV produced by the bulk annotation pipeline.
/// `id` is not part of the file; ids are assigned by the store on load.
pub const BULK_COLUMNS: &[&str] = &[
  "gene",
  "sift_score",
  "sift_pred",
  "polyphen2_score",
  "polyphen2_pred",
  "lrt_score",
  "lrt_pred",
  "mutationtaster_score",
  "mutationtaster_pred",
  "gerp_rs",
  "phylop_score",
  "gerp_pred",
  "phylop_pred",
  "variation",
  "hgvs_nucleotide_change",
  "hgvs_protein_change",
  "variantlocale",
  "pathogenicity",
  "disease",
  "pubmed_id",
  "comments",
  "dbsnp",
  "evs_all_af",
  "evs_ea_ac",
  "evs_ea_af",
  "evs_aa_ac",
  "evs_aa_an",
  "evs_aa_af",
  "tg_all_af",
  "tg_afr_af",
  "tg_amr_af",
  "tg_eur_af",
];

/// Position of `name` in [`VARIANT_FIELDS`].
pub fn field_index(name: &str) -> Option<usize> {
  VARIANT_FIELDS.iter().position(|f| f.name == name)
}

/// The `'static` schema name matching `name`, if it is a variant column.
pub fn canonical_name(name: &str) -> Option<&'static str> {
  field_index(name).map(|i| VARIANT_FIELDS[i].name)
}

pub fn field_names() -> impl Iterator<Item = &'static str> {
  VARIANT_FIELDS.iter().map(|f| f.name)
}

/// Fields contributed by one frequency source.
pub fn frequency_fields(source: FrequencySource) -> impl Iterator<Item = &'static str> {
  VARIANT_FIELDS
    .iter()
    .filter(move |f| f.group == FieldGroup::Frequency(source))
    .map(|f| f.name)
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn field_names_are_unique() {
    let names: HashSet<_> = field_names().collect();
    assert_eq!(names.len(), VARIANT_FIELDS.len());
  }

  #[test]
  fn bulk_columns_are_all_schema_fields() {
    for col in BULK_COLUMNS {
      assert!(field_index(col).is_some(), "{col} missing from schema");
    }
  }

  #[test]
  fn frequency_groups_match_prefixes() {
    for source in FrequencySource::ALL {
      let fields: Vec<_> = frequency_fields(source).collect();
      assert!(!fields.is_empty());
      assert!(fields.iter().all(|f| f.starts_with(source.prefix())));
    }
  }

  #[test]
  fn config_keys_round_trip() {
    assert_eq!(
      FrequencySource::from_config_key("1000Genomes"),
      Some(FrequencySource::ThousandGenomes)
    );
    assert_eq!(FrequencySource::from_config_key("gnomad"), None);
  }
}
