//! Canonicalisation of Hg19 genomic position strings.
//!
//! A position has three colon-delimited parts, `<chrom>:<position>:<alleles>`,
//! for example `chr1:41283868:G>A`. Users may type the chromosome in any case
//! and may omit the `chr` prefix; [`normalize`] folds all of those spellings
//! onto one canonical form so the position can be used as a lookup key.

use crate::{Error, Result};

const CHR_PREFIX: &str = "chr";

/// Canonical form of `raw`.
///
/// The chromosome is lowercased and prefixed with `chr`, except that `X` and
/// `Y` stay uppercase. The allele part is uppercased. Idempotent.
///
/// ```
/// use vardb_core::position::normalize;
///
/// assert_eq!(normalize("1:41283868:g>a").unwrap(), "chr1:41283868:G>A");
/// assert_eq!(normalize("CHRx:100:c>t").unwrap(), "chrX:100:C>T");
/// ```
pub fn normalize(raw: &str) -> Result<String> {
  let mut parts = split(raw)?;
  parts[0] = canonical_chromosome(&parts[0]);
  parts[2] = parts[2].to_uppercase();
  Ok(parts.join(":"))
}

/// One-way transform into the tab-delimited line the annotation tool reads:
/// `chr1:41283868:G>A` becomes `1\t41283868\tG\tA`.
pub fn normalize_for_tool(raw: &str) -> Result<String> {
  let canonical = normalize(raw)?;
  let bare = canonical.strip_prefix(CHR_PREFIX).unwrap_or(&canonical);
  Ok(bare.to_uppercase().replace([':', '>'], "\t"))
}

/// Chromosome (without `chr`) and base position of a variation, used for
/// external id lookups.
pub fn chromosome_and_position(raw: &str) -> Result<(String, String)> {
  let canonical = normalize(raw)?;
  let mut parts = canonical.splitn(3, ':');
  let chrom = parts.next().unwrap_or_default();
  let pos = parts.next().unwrap_or_default();
  Ok((
    chrom.strip_prefix(CHR_PREFIX).unwrap_or(chrom).to_owned(),
    pos.to_owned(),
  ))
}

fn split(raw: &str) -> Result<Vec<String>> {
  let trimmed = raw.trim();
  let parts: Vec<String> = trimmed.split(':').map(str::to_owned).collect();
  if parts.len() < 3 || parts[..3].iter().any(|p| p.trim().is_empty()) {
    return Err(Error::InvalidFormat(raw.to_owned()));
  }
  Ok(parts)
}

fn canonical_chromosome(token: &str) -> String {
  let lower = token.to_lowercase();
  let prefixed = if lower.starts_with(CHR_PREFIX) {
    lower
  } else {
    format!("{CHR_PREFIX}{lower}")
  };
  prefixed.replace('x', "X").replace('y', "Y")
}
