//! One handler per subcommand, each mapping onto a single store, gateway or
//! pipeline operation.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::{Context as _, bail};
use serde::Serialize;
use vardb_annotate::{
  AnnotationGateway, CommandTool, DbSnpClient, JobStatus, PipelineRunner, ShellPipeline,
  read_queue_tsv,
};
use vardb_core::{
  annotation::AnnotationError,
  expert::ExpertOverride,
  position,
  review::ReviewUpdate,
  store::{CreateMode, CurationStore},
  variant::{RawFields, Tier, VariantId},
};
use vardb_store_sqlite::SqliteStore;

use crate::{Command, ExpertCommand, PipelineCommand, config::AdminConfig};

pub fn normalize(raw: &str) -> anyhow::Result<()> {
  println!("{}", position::normalize(raw)?);
  Ok(())
}

pub struct Admin {
  cfg:   AdminConfig,
  store: SqliteStore,
}

impl Admin {
  pub async fn open(cfg: AdminConfig) -> anyhow::Result<Self> {
    if let Some(parent) = cfg.store_path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {parent:?}"))?;
    }

    let store = SqliteStore::open(&cfg.store_path, cfg.tables.clone())
      .await
      .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

    Ok(Self { cfg, store })
  }

  fn actor(&self) -> &str { &self.cfg.actor }

  pub async fn run(&self, command: Command) -> anyhow::Result<()> {
    match command {
      // Handled before the store is opened.
      Command::Normalize { position } => normalize(&position),

      Command::Create { position, blank, data, reimport, no_dbsnp } => {
        self.create(&position, blank, data.as_deref(), reimport, no_dbsnp).await
      }

      Command::Show { id, tier } => {
        let variant = self.store.get_by_id(id, tier.into()).await?;
        print_json(&variant.with_context(|| format!("variant {id} not found"))?)
      }

      Command::Find { position, fuzzy, tier } => {
        let found = self.store.get_by_position(&position, tier.into(), fuzzy).await?;
        print_json(&found.unwrap_or_default())
      }

      Command::Gene { gene, tier } => {
        print_json(&self.store.variants_by_gene(&gene, tier.into()).await?)
      }

      Command::Edit { id, set, clear } => self.edit(id, &set, &clear).await,

      Command::Revert { id, if_unchanged } => {
        let removed = if if_unchanged {
          self.store.remove_from_queue_if_unchanged(id, self.actor()).await?
        } else {
          self.store.remove_all_changes(id, self.actor()).await?;
          true
        };
        print_json(&serde_json::json!({ "id": id, "removed": removed }))
      }

      Command::Diff { id } => {
        let changes = self.store.unreleased_changes(id).await?;
        print_json(&changes.unwrap_or_default())
      }

      Command::Review { id, confirm, schedule_deletion, comments, clear_comments } => {
        let mut update = ReviewUpdate::default();
        if let Some(confirmed) = confirm {
          update = update.confirm(confirmed);
        }
        if let Some(scheduled) = schedule_deletion {
          update = update.schedule_deletion(scheduled);
        }
        if comments.is_some() || clear_comments {
          update = update.comments(comments);
        }

        if update == ReviewUpdate::default() {
          let review = self.store.get_review(id).await?;
          return print_json(&review.with_context(|| format!("no review for variant {id}"))?);
        }
        print_json(&self.store.update_review(id, update, self.actor()).await?)
      }

      Command::Reviews => print_json(&self.store.list_reviews().await?),

      Command::Release { version, confirmed_only } => {
        let version = match version.or(self.cfg.version) {
          Some(v) => v,
          None => self.store.current_version().await? + 1,
        };
        let report = self.store.release(version, confirmed_only, self.actor()).await?;
        print_json(&report)
      }

      Command::Expert { command } => self.expert(command).await,

      Command::Pipeline { command } => self.pipeline(command).await,

      Command::LoadQueue { tsv } => self.load_queue(&tsv).await,

      Command::Stats => print_json(&self.store.diff_stats().await?),

      Command::Status => print_json(&serde_json::json!({
        "version":    self.store.current_version().await?,
        "unreleased": self.store.num_unreleased().await?,
      })),

      Command::Versions => print_json(&self.store.versions().await?),

      Command::Counts => print_json(&self.store.gene_counts().await?),

      Command::History => print_json(&self.store.history().await?),

      Command::Activity => print_json(&self.store.activity().await?),
    }
  }

  // ─── Variants ───────────────────────────────────────────────────────────────

  async fn create(
    &self,
    raw: &str,
    blank: bool,
    data: Option<&Path>,
    reimport: bool,
    no_dbsnp: bool,
  ) -> anyhow::Result<()> {
    let variation = position::normalize(raw)?;

    let mode = match data {
      Some(path) => {
        let json = std::fs::read_to_string(path)
          .with_context(|| format!("failed to read {path:?}"))?;
        let data: RawFields = serde_json::from_str(&json)
          .with_context(|| format!("{path:?} is not a JSON object of field values"))?;
        CreateMode::ManualWithData { data, reimport }
      }
      None if blank => CreateMode::ManualBlank,
      None => CreateMode::Annotated(self.annotation_gateway()?),
    };
    let lookup_dbsnp = !no_dbsnp && data.is_none();

    let id = self.store.create_variant(&variation, mode, self.actor()).await?;

    if lookup_dbsnp {
      self.attach_dbsnp(id, &variation).await?;
    }

    let variant = self.store.get_by_id(id, Tier::Queue).await?;
    print_json(&variant)
  }

  fn annotation_gateway(&self) -> anyhow::Result<Arc<AnnotationGateway<CommandTool>>> {
    let annotation = &self.cfg.annotation;
    let Some(tool_path) = annotation.tool_path.clone() else {
      return Err(
        anyhow::Error::new(AnnotationError::ToolNotConfigured)
          .context("annotation.tool_path is not set"),
      );
    };

    let tool = CommandTool::new(annotation.interpreter.clone(), tool_path);
    std::fs::create_dir_all(&annotation.work_dir)
      .with_context(|| format!("failed to create {:?}", annotation.work_dir))?;

    Ok(Arc::new(AnnotationGateway::new(
      tool,
      annotation.work_dir.clone(),
      annotation.frequency_sources()?,
    )))
  }

  /// Stage the dbSNP id for a fresh variant. A failed lookup only warns; the
  /// variant stays queued without one.
  async fn attach_dbsnp(&self, id: VariantId, variation: &str) -> anyhow::Result<()> {
    let client = DbSnpClient::new(self.cfg.dbsnp.endpoint.clone(), self.cfg.dbsnp.timeout())?;

    match client.lookup(variation).await {
      Ok(Some(rs)) => {
        let mut fields = RawFields::new();
        fields.insert("dbsnp".into(), Some(rs));
        self.store.update_queue(id, fields, self.actor()).await?;
      }
      Ok(None) => tracing::debug!(id, variation, "no unique dbSNP id"),
      Err(e) => tracing::warn!(id, variation, error = %e, "dbSNP lookup failed"),
    }
    Ok(())
  }

  async fn edit(&self, id: VariantId, set: &[String], clear: &[String]) -> anyhow::Result<()> {
    let mut fields = RawFields::new();
    for pair in set {
      let Some((field, value)) = pair.split_once('=') else {
        bail!("expected FIELD=VALUE, got {pair:?}");
      };
      fields.insert(field.trim().to_owned(), Some(value.to_owned()));
    }
    for field in clear {
      fields.insert(field.trim().to_owned(), None);
    }
    if fields.is_empty() {
      bail!("nothing to edit; pass --set or --clear");
    }

    let staged = self.store.update_queue(id, fields, self.actor()).await?;
    print_json(&serde_json::json!({ "id": id, "staged": staged }))
  }

  // ─── Expert overlay ─────────────────────────────────────────────────────────

  async fn expert(&self, command: ExpertCommand) -> anyhow::Result<()> {
    match command {
      ExpertCommand::Load { csv } => {
        let file = File::open(&csv).with_context(|| format!("failed to open {csv:?}"))?;
        let overrides = ExpertOverride::read_csv(file)
          .with_context(|| format!("failed to parse {csv:?}"))?;
        let loaded = self.store.load_expert_overrides(overrides, self.actor()).await?;
        print_json(&serde_json::json!({ "loaded": loaded }))
      }
      ExpertCommand::Apply => {
        print_json(&self.store.apply_expert_overrides(self.actor()).await?)
      }
      ExpertCommand::List => print_json(&self.store.expert_overrides().await?),
    }
  }

  // ─── Bulk pipeline ──────────────────────────────────────────────────────────

  fn pipeline_runner(&self) -> PipelineRunner<ShellPipeline> {
    let pipeline = &self.cfg.pipeline;
    PipelineRunner::new(
      ShellPipeline {
        interpreter: pipeline.interpreter.clone(),
        script:      pipeline.script.clone(),
        converter:   pipeline.converter.clone(),
      },
      pipeline.work_dir.clone(),
    )
  }

  async fn pipeline(&self, command: PipelineCommand) -> anyhow::Result<()> {
    let runner = self.pipeline_runner();
    match command {
      PipelineCommand::Run { genes_file, load } => {
        let job = runner.submit(genes_file)?;
        tracing::info!(%job, log = %runner.log_path(job).display(), "waiting for pipeline");

        let status = runner.wait(job).await?;
        if load && let JobStatus::Succeeded { output, .. } = &status {
          self.load_queue(output).await?;
        }
        print_json(&serde_json::json!({ "job": job, "status": status }))
      }
      PipelineCommand::Status { job } => print_json(&runner.status(job)?),
    }
  }

  async fn load_queue(&self, tsv: &Path) -> anyhow::Result<()> {
    let file = File::open(tsv).with_context(|| format!("failed to open {tsv:?}"))?;
    let rows = read_queue_tsv(file).with_context(|| format!("failed to parse {tsv:?}"))?;
    let report = self.store.bulk_load_queue(rows, self.actor()).await?;
    print_json(&report)
  }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
