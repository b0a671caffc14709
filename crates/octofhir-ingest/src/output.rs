use colored::Colorize;
use octofhir_ingest_core::{Batch, Manifest};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::orchestrator::IngestReport;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_plan_table(batches: &[Batch]) {
    if batches.is_empty() {
        println!("Nothing to import.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["Batch", "Resource types", "Files"]);
    for batch in batches {
        let types: Vec<&str> = batch.resource_types().map(|t| t.as_str()).collect();
        builder.push_record([
            (batch.index + 1).to_string(),
            types.join(", "),
            batch.file_count().to_string(),
        ]);
    }
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
    let files: usize = batches.iter().map(Batch::file_count).sum();
    println!("Total: {} batches, {files} files", batches.len());
}

pub fn print_manifests(manifests: &[(usize, Manifest)]) -> anyhow::Result<()> {
    let value: Vec<serde_json::Value> = manifests
        .iter()
        .map(|(index, manifest)| {
            serde_json::json!({
                "batch": index + 1,
                "manifest": manifest,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn print_report(report: &IngestReport) {
    for batch in &report.batches {
        let job = batch.job.as_deref().unwrap_or("-");
        println!(
            "  {} {} ({} files) {}",
            format!("#{}", batch.index + 1).cyan(),
            batch.resource_types.join(", "),
            batch.files,
            job.dimmed()
        );
    }
    print_success(&format!(
        "Imported {} files in {} batches",
        report.files(),
        report.batches.len()
    ));
}
