//! Operator configuration, layered from `vardb.toml` and `VARDB_*` variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;
use vardb_core::schema::FrequencySource;
use vardb_store_sqlite::TableNames;

// ─── Sections ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
  pub store_path: PathBuf,
  /// Recorded in the audit trail for every mutating command.
  pub actor:      String,
  /// Version to publish when `release` is given none. Falls back to the
  /// current version plus one.
  pub version:    Option<u32>,
  pub tables:     TableNames,
  pub annotation: AnnotationConfig,
  pub pipeline:   PipelineConfig,
  pub dbsnp:      DbSnpConfig,
}

impl Default for AdminConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/vardb/variants.sqlite"),
      actor:      "admin".into(),
      version:    None,
      tables:     TableNames::default(),
      annotation: AnnotationConfig::default(),
      pipeline:   PipelineConfig::default(),
      dbsnp:      DbSnpConfig::default(),
    }
  }
}

/// The single-variant annotation engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
  /// Unset means the engine is not installed; annotated creates then fail
  /// with `ToolNotConfigured`.
  pub tool_path:   Option<PathBuf>,
  pub interpreter: String,
  pub work_dir:    PathBuf,
  /// Population sources that may be credited in `comments`.
  pub frequencies: Vec<String>,
}

impl Default for AnnotationConfig {
  fn default() -> Self {
    Self {
      tool_path:   None,
      interpreter: "perl".into(),
      work_dir:    std::env::temp_dir().join("vardb-annotate"),
      frequencies: FrequencySource::ALL.iter().map(|s| s.config_key().to_owned()).collect(),
    }
  }
}

impl AnnotationConfig {
  pub fn frequency_sources(&self) -> anyhow::Result<Vec<FrequencySource>> {
    self
      .frequencies
      .iter()
      .map(|key| {
        FrequencySource::from_config_key(key)
          .with_context(|| format!("unknown frequency source {key:?} in annotation.frequencies"))
      })
      .collect()
  }
}

/// The multi-gene bulk pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub script:      PathBuf,
  pub interpreter: String,
  /// Turns the pipeline's VCF into the queue TSV.
  pub converter:   PathBuf,
  pub work_dir:    PathBuf,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      script:      PathBuf::from("pipeline/run_genes.sh"),
      interpreter: "bash".into(),
      converter:   PathBuf::from("pipeline/vcf_to_queue_tsv"),
      work_dir:    std::env::temp_dir().join("vardb-pipeline"),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbSnpConfig {
  pub endpoint:     String,
  pub timeout_secs: u64,
}

impl Default for DbSnpConfig {
  fn default() -> Self {
    Self {
      endpoint:     "https://www.ncbi.nlm.nih.gov/snp/".into(),
      timeout_secs: 5,
    }
  }
}

impl DbSnpConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

// ─── Loading ──────────────────────────────────────────────────────────────────

/// Read `path` (optional) and overlay `VARDB_*` environment variables, with
/// `__` separating nested keys (`VARDB_DBSNP__TIMEOUT_SECS`).
pub fn load(path: &Path) -> anyhow::Result<AdminConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("VARDB")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let mut cfg: AdminConfig = settings
    .try_deserialize()
    .context("failed to deserialise AdminConfig")?;

  cfg.store_path = expand_tilde(&cfg.store_path);
  cfg.annotation.work_dir = expand_tilde(&cfg.annotation.work_dir);
  cfg.annotation.tool_path = cfg.annotation.tool_path.as_deref().map(expand_tilde);
  cfg.pipeline.work_dir = expand_tilde(&cfg.pipeline.work_dir);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
