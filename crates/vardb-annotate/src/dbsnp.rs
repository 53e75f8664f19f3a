//! dbSNP id lookup over HTTP.

use std::time::Duration;

use reqwest::Client;
use vardb_core::position;

use crate::{Error, Result};

const SNP_ID_KEY: &str = "SNP_ID=";

/// Client for the NCBI SNP search endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct DbSnpClient {
  client:   Client,
  endpoint: String,
}

impl DbSnpClient {
  pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, endpoint: endpoint.into() })
  }

  /// Resolve `variation` to an `rs` id.
  ///
  /// `Ok(None)` when the search matches no record or more than one.
  pub async fn lookup(&self, variation: &str) -> Result<Option<String>> {
    let (chrom, pos) = position::chromosome_and_position(variation)?;
    let term = format!("(({chrom}[Chromosome]) AND {pos}[Base Position])");

    let resp = self
      .client
      .get(&self.endpoint)
      .query(&[("term", term.as_str()), ("report", "DocSet")])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::LookupStatus(resp.status()));
    }

    let body = resp.text().await?;
    let id = extract_snp_id(&body);
    tracing::debug!(variation, dbsnp = ?id, "dbSNP lookup");
    Ok(id)
  }
}

/// The single `rs` id named by `SNP_ID=<digits>` tokens in `body`, if exactly
/// one distinct id appears.
pub fn extract_snp_id(body: &str) -> Option<String> {
  let mut found: Vec<&str> = Vec::new();
  for token in body.split_whitespace() {
    let Some(start) = token.find(SNP_ID_KEY) else {
      continue;
    };
    let rest = &token[start + SNP_ID_KEY.len()..];
    let end = rest
      .find(|c: char| !c.is_ascii_digit())
      .unwrap_or(rest.len());
    let digits = &rest[..end];
    if !digits.is_empty() && !found.contains(&digits) {
      found.push(digits);
    }
  }

  match found.as_slice() {
    [only] => Some(format!("rs{only}")),
    _ => None,
  }
}
