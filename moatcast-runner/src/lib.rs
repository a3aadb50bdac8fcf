//! MoatCast Runner: pipeline orchestration, table loading, baseline, export.
//!
//! This crate builds on `moatcast-core` to provide:
//! - TOML pipeline configuration with a content-addressed run id
//! - CSV table loading through polars
//! - The orchestrator sequencing alignment, features and both stages
//! - Single-stage baseline comparison with MAE and R²
//! - All-or-nothing artifact export (CSV, JSON, Markdown)

pub mod baseline;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod pipeline;

pub use baseline::{run_baseline, split_indices, BaselineReport};
pub use config::{ConfigError, PipelineConfig, RunId};
pub use data_loader::{load_tables, LoadError, LoadedTables};
pub use export::{write_artifacts, RunManifest, SCHEMA_VERSION};
pub use metrics::{mean_absolute_error, r_squared, ModelScore};
pub use pipeline::{run_pipeline, PipelineError, PipelineOutput, RowCounts, Stage};
