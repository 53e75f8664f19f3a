//! Adapters around the external tools that feed the curation database.
//!
//! - [`AnnotationGateway`] runs the single-variant annotation engine and turns
//!   its tab-separated output into field data.
//! - [`DbSnpClient`] resolves a position to a dbSNP id over HTTP.
//! - [`PipelineRunner`] submits the multi-gene bulk pipeline as a detached job
//!   and exposes its status for polling.
//!
//! Every external program sits behind a narrow trait ([`AnnotationTool`],
//! [`PipelineTool`]) so tests can substitute a fake.

mod dbsnp;
mod gateway;
mod parse;
mod pipeline;
mod tool;

pub mod error;

pub use dbsnp::{DbSnpClient, extract_snp_id};
pub use error::{Error, Result};
pub use gateway::AnnotationGateway;
pub use parse::{credit_comments, parse_output};
pub use pipeline::{
  JobId, JobStatus, PipelineRequest, PipelineRunner, PipelineTool, ShellPipeline,
  read_queue_tsv,
};
pub use tool::{AnnotationTool, CommandTool, ToolError};
