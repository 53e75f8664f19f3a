//! `vardb`, the operator binary for the variant curation database.
//!
//! Reads `vardb.toml` (or the path given with `--config`), opens the SQLite
//! store and runs one curation command. Results go to stdout as JSON; logs
//! go to stderr.
//!
//! ```text
//! vardb create chr13:20763612:C>T
//! vardb edit 42 --set pathogenicity="Likely pathogenic" --clear disease
//! vardb diff
//! vardb review 42 --confirm true
//! vardb release --confirmed-only
//! ```

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vardb_core::variant::{Tier, VariantId};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Variant curation database admin")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "vardb.toml")]
  config: PathBuf,

  /// Actor recorded in the audit trail; overrides `actor` from the config.
  #[arg(long, global = true)]
  actor: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
  Queue,
  Live,
}

impl From<TierArg> for Tier {
  fn from(tier: TierArg) -> Self {
    match tier {
      TierArg::Queue => Tier::Queue,
      TierArg::Live => Tier::Live,
    }
  }
}

#[derive(Subcommand)]
enum Command {
  /// Print the canonical form of a genomic position.
  Normalize { position: String },

  /// Create a variant in the queue.
  Create {
    position: String,
    /// Skip the annotation engine and stage an empty record.
    #[arg(long, conflicts_with = "data")]
    blank:    bool,
    /// JSON object of field values to stage instead of annotating.
    #[arg(long, value_name = "FILE")]
    data:     Option<PathBuf>,
    /// With `--data`, allow a variation that already exists.
    #[arg(long, requires = "data")]
    reimport: bool,
    /// Do not look up the dbSNP id after creating.
    #[arg(long)]
    no_dbsnp: bool,
  },

  /// Show one variant.
  Show {
    id:   VariantId,
    #[arg(long, value_enum, default_value = "queue")]
    tier: TierArg,
  },

  /// Find variants at a position (`chr13:20763612`).
  Find {
    position: String,
    /// Also match the bare position without the trailing `:`.
    #[arg(long)]
    fuzzy:    bool,
    #[arg(long, value_enum, default_value = "queue")]
    tier:     TierArg,
  },

  /// List the variants of a gene, ordered by variation.
  Gene {
    gene: String,
    #[arg(long, value_enum, default_value = "queue")]
    tier: TierArg,
  },

  /// Stage field edits.
  Edit {
    id:    VariantId,
    /// `field=value`, repeatable.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    set:   Vec<String>,
    /// Field to null out, repeatable.
    #[arg(long = "clear", value_name = "FIELD")]
    clear: Vec<String>,
  },

  /// Drop all staged changes for a variant.
  Revert {
    id:           VariantId,
    /// Only revert when the staged row no longer differs from live.
    #[arg(long)]
    if_unchanged: bool,
  },

  /// Show unreleased changes, for every queued variant or just one.
  Diff { id: Option<VariantId> },

  /// Show or update a variant's review.
  Review {
    id:                VariantId,
    #[arg(long)]
    confirm:           Option<bool>,
    #[arg(long)]
    schedule_deletion: Option<bool>,
    #[arg(long, conflicts_with = "clear_comments")]
    comments:          Option<String>,
    #[arg(long)]
    clear_comments:    bool,
  },

  /// List every open review.
  Reviews,

  /// Publish the queue.
  Release {
    /// Defaults to `version` from the config, then the current version + 1.
    #[arg(long)]
    version:        Option<u32>,
    /// Merge only rows whose review is confirmed.
    #[arg(long)]
    confirmed_only: bool,
  },

  /// Expert curation overrides.
  Expert {
    #[command(subcommand)]
    command: ExpertCommand,
  },

  /// Bulk annotation pipeline.
  Pipeline {
    #[command(subcommand)]
    command: PipelineCommand,
  },

  /// Stage a pipeline TSV in the queue.
  LoadQueue { tsv: PathBuf },

  /// Per-gene statistics of the queue against live.
  Stats,

  /// Current version and number of open reviews.
  Status,

  /// Recorded releases.
  Versions,

  /// Released variant count per gene.
  Counts,

  /// Archived deletions and superseded overrides.
  History,

  /// Audit trail of curation actions.
  Activity,
}

#[derive(Subcommand)]
enum ExpertCommand {
  /// Upsert overrides from a curator CSV.
  Load { csv: PathBuf },
  /// Apply every enabled override to the queue.
  Apply,
  /// List stored overrides.
  List,
}

#[derive(Subcommand)]
enum PipelineCommand {
  /// Run the pipeline for a genes file and wait for it to finish.
  Run {
    genes_file: PathBuf,
    /// Stage the produced TSV in the queue on success.
    #[arg(long)]
    load:       bool,
  },
  /// Status of a job, from its status artifact.
  Status { job: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing; stdout carries command output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Pure commands need neither config nor store.
  if let Command::Normalize { position } = &cli.command {
    return commands::normalize(position);
  }

  let mut cfg = config::load(&cli.config)?;
  if let Some(actor) = cli.actor {
    cfg.actor = actor;
  }

  let admin = commands::Admin::open(cfg).await?;
  admin.run(cli.command).await
}
