//! Expert overrides: curator corrections applied to the queue before release.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A manual correction keyed by the variant's position string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertOverride {
  pub variation:         String,
  pub gene:              Option<String>,
  pub chr:               Option<String>,
  pub pos:               Option<String>,
  #[serde(rename = "ref")]
  pub ref_allele:        Option<String>,
  #[serde(rename = "alt")]
  pub alt_allele:        Option<String>,
  pub pathogenicity:     Option<String>,
  pub disease:           Option<String>,
  pub pubmed_id:         Option<String>,
  pub comments:          Option<String>,
  /// Schedule the matching queued variant for deletion on the next release.
  pub delete_on_release: bool,
  /// A disabled override is kept on file but never applied.
  pub disabled:          bool,
}

impl ExpertOverride {
  pub fn new(variation: impl Into<String>) -> Self {
    Self {
      variation:         variation.into(),
      gene:              None,
      chr:               None,
      pos:               None,
      ref_allele:        None,
      alt_allele:        None,
      pathogenicity:     None,
      disease:           None,
      pubmed_id:         None,
      comments:          None,
      delete_on_release: false,
      disabled:          false,
    }
  }

  /// Whether [`apply`](crate::store::CurationStore::apply_expert_overrides)
  /// should schedule the variant for deletion.
  pub fn deletes(&self) -> bool { self.delete_on_release && !self.disabled }

  /// Parse a curator upload: one header line, then
  /// `gene,chr,pos,ref,alt,variation,pathogenicity,disease,pubmed_id,comments,delete_on_release,disabled`.
  pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Self>> {
    let mut csv = csv::ReaderBuilder::new()
      .has_headers(true)
      .flexible(true)
      .trim(csv::Trim::All)
      .from_reader(reader);

    let mut out = Vec::new();
    for record in csv.records() {
      let record = record?;
      let line = record.position().map_or(0, |p| p.line());
      if record.len() < 12 {
        return Err(Error::MalformedOverride {
          line,
          detail: format!("expected 12 columns, found {}", record.len()),
        });
      }
      let text = |i: usize| {
        Some(record[i].to_owned()).filter(|v: &String| !v.is_empty())
      };
      let variation = text(5).ok_or_else(|| Error::MalformedOverride {
        line,
        detail: "missing variation".into(),
      })?;
      out.push(Self {
        variation,
        gene: text(0),
        chr: text(1),
        pos: text(2),
        ref_allele: text(3),
        alt_allele: text(4),
        pathogenicity: text(6),
        disease: text(7),
        pubmed_id: text(8),
        comments: text(9),
        delete_on_release: parse_flag(&record[10], line)?,
        disabled: parse_flag(&record[11], line)?,
      });
    }
    Ok(out)
  }
}

fn parse_flag(value: &str, line: u64) -> Result<bool> {
  match value.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" => Ok(true),
    "false" | "0" | "no" | "" => Ok(false),
    other => Err(Error::MalformedOverride {
      line,
      detail: format!("not a boolean: {other:?}"),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const UPLOAD: &str = "\
\"gene\",\"chr\",\"pos\",\"ref\",\"alt\",\"variation\",\"pathogenicity\",\"disease\",\"pubmed_id\",\"comments\",\"delete\",\"disable\"
\"GJB2\",\"13\",\"20763612\",\"C\",\"T\",\"chr13:20763612:C>T\",\"Pathogenic\",\"Deafness, autosomal recessive 1A\",\"9336417\",\"Reviewed\",\"FALSE\",\"FALSE\"
\"MYO7A\",\"11\",\"76853783\",\"G\",\"A\",\"chr11:76853783:G>A\",\"\",\"\",\"\",\"\",\"TRUE\",\"FALSE\"
";

  #[test]
  fn reads_quoted_upload() {
    let overrides = ExpertOverride::read_csv(UPLOAD.as_bytes()).unwrap();
    assert_eq!(overrides.len(), 2);

    let first = &overrides[0];
    assert_eq!(first.variation, "chr13:20763612:C>T");
    assert_eq!(first.disease.as_deref(), Some("Deafness, autosomal recessive 1A"));
    assert_eq!(first.ref_allele.as_deref(), Some("C"));
    assert!(!first.deletes());

    let second = &overrides[1];
    assert_eq!(second.pathogenicity, None);
    assert!(second.deletes());
  }

  #[test]
  fn disabled_override_never_deletes() {
    let mut o = ExpertOverride::new("chr1:1:A>T");
    o.delete_on_release = true;
    o.disabled = true;
    assert!(!o.deletes());
  }

  #[test]
  fn short_rows_are_rejected() {
    let bad = "h1,h2\nGJB2,13\n";
    let err = ExpertOverride::read_csv(bad.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::MalformedOverride { .. }));
  }

  #[test]
  fn bad_flags_are_rejected() {
    let bad = "a,b,c,d,e,f,g,h,i,j,k,l\nG,1,2,A,T,chr1:2:A>T,,,,,maybe,0\n";
    let err = ExpertOverride::read_csv(bad.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::MalformedOverride { line: 2, .. }));
  }
}
