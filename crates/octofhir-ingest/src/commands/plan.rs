use anyhow::{Context, Result};
use octofhir_ingest_core::{Batch, DependencyGraph, build_manifest, group_files, plan_batches};

use crate::cli::OutputFormat;
use crate::config::IngestConfig;
use crate::datadir::discover_ndjson_files;
use crate::output::{print_manifests, print_plan_table};

/// Discover the data directory and layer its files into batches.
pub fn load_plan(cfg: &IngestConfig) -> Result<Vec<Batch>> {
    let files = discover_ndjson_files(&cfg.data_dir)?;
    let graph = DependencyGraph::standard();
    let groups = group_files(files, graph);
    let batches = plan_batches(groups, graph)
        .inspect_err(|e| {
            tracing::error!(category = %e.category(), error = %e, "Import planning failed")
        })
        .context("failed to plan import batches")?;
    tracing::info!(batches = batches.len(), "Import plan ready");
    Ok(batches)
}

pub fn plan(cfg: &IngestConfig, format: OutputFormat) -> Result<()> {
    let batches = load_plan(cfg)?;
    match format {
        OutputFormat::Table => print_plan_table(&batches),
        OutputFormat::Json => {
            let base_url = cfg.manifest_base_url();
            let manifests = batches
                .iter()
                .map(|batch| Ok((batch.index, build_manifest(batch, &base_url)?)))
                .collect::<Result<Vec<_>>>()?;
            print_manifests(&manifests)?;
        }
    }
    Ok(())
}
