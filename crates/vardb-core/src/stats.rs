//! Per-gene release statistics comparing the staged snapshot with live data.
//!
//! Meant for the report curators review after a bulk pipeline run, when the
//! queue holds a complete re-annotation of the submitted genes.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::variant::{Pathogenicity, Variant};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneDiffStats {
  pub gene:           String,
  pub live_variants:  u64,
  pub queue_variants: u64,
  /// Staged variations with no live counterpart.
  pub added:          u64,
  /// Live variations with no staged counterpart.
  pub dropped:        u64,
  /// Classification counts in the live table.
  pub before:         BTreeMap<Pathogenicity, u64>,
  /// Classification counts in the queue.
  pub after:          BTreeMap<Pathogenicity, u64>,
  /// Variations present in both whose classification changed.
  pub changed:        u64,
  pub unchanged:      u64,
  /// `(from, to)` classification moves among `changed`.
  pub transitions:    Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
  pub from:  Pathogenicity,
  pub to:    Pathogenicity,
  pub count: u64,
}

/// Compute statistics for every gene present in either tier.
///
/// Variants are matched across tiers by `variation`; rows without a gene or a
/// variation are ignored.
pub fn diff_stats(live: &[Variant], queue: &[Variant]) -> Vec<GeneDiffStats> {
  let mut by_gene: BTreeMap<String, GeneDiffStats> = BTreeMap::new();
  let mut transitions: BTreeMap<(String, Pathogenicity, Pathogenicity), u64> =
    BTreeMap::new();

  let live_index: HashMap<&str, &Variant> =
    live.iter().filter_map(|v| Some((v.variation()?, v))).collect();
  let queue_index: HashMap<&str, &Variant> =
    queue.iter().filter_map(|v| Some((v.variation()?, v))).collect();

  for (variation, variant) in &live_index {
    let Some(gene) = variant.gene() else { continue };
    let stats = entry(&mut by_gene, gene);
    stats.live_variants += 1;
    if let Some(class) = variant.pathogenicity() {
      *stats.before.entry(class).or_default() += 1;
    }
    if !queue_index.contains_key(variation) {
      stats.dropped += 1;
    }
  }

  for (variation, variant) in &queue_index {
    let Some(gene) = variant.gene() else { continue };
    let stats = entry(&mut by_gene, gene);
    stats.queue_variants += 1;
    let after = variant.pathogenicity();
    if let Some(class) = after {
      *stats.after.entry(class).or_default() += 1;
    }

    let Some(previous) = live_index.get(variation) else {
      stats.added += 1;
      continue;
    };
    match (previous.pathogenicity(), after) {
      (Some(from), Some(to)) if from != to => {
        stats.changed += 1;
        *transitions.entry((gene.to_owned(), from, to)).or_default() += 1;
      }
      (from, to) if from == to => stats.unchanged += 1,
      _ => stats.changed += 1,
    }
  }

  for ((gene, from, to), count) in transitions {
    if let Some(stats) = by_gene.get_mut(&gene) {
      stats.transitions.push(Transition { from, to, count });
    }
  }

  by_gene.into_values().collect()
}

fn entry<'a>(
  by_gene: &'a mut BTreeMap<String, GeneDiffStats>,
  gene: &str,
) -> &'a mut GeneDiffStats {
  by_gene.entry(gene.to_owned()).or_insert_with(|| GeneDiffStats {
    gene: gene.to_owned(),
    ..Default::default()
  })
}
