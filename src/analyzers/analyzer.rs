use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::analyzers::rollup::build_site_data;
use crate::analyzers::types::SiteData;
use crate::config::SiteConfig;
use crate::output::{print_json, write_json};
use crate::table::{MERGED_REQUIRED_COLUMNS, Record, read_rows};

/// Summary of a generate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteSummary {
    pub records: usize,
    pub majors: usize,
    pub groups: usize,
}

/// Aggregates an in-memory merged table into the site artifact.
pub fn aggregate(records: &[Record], config: &SiteConfig) -> SiteData {
    build_site_data(records, &config.selection, &config.groups, &config.options)
}

/// Loads the merged table at `input`, aggregates it and writes the artifact
/// to `output`.
///
/// Nothing is written unless loading and aggregation both succeed.
///
/// # Errors
///
/// Returns an error if `input` is missing, lacks a key column or holds a
/// malformed row, or if the artifact cannot be written.
#[tracing::instrument(skip_all, fields(input = %input.display(), output = %output.display(), bins = config.options.bins))]
pub fn generate_site_data(input: &Path, output: &Path, config: &SiteConfig) -> Result<SiteSummary> {
    let records: Vec<Record> = read_rows(input, MERGED_REQUIRED_COLUMNS)?;
    info!(records = records.len(), selection = ?config.selection, "Loaded merged data");

    let data = aggregate(&records, config);
    print_json(&data.groups)?;

    write_json(output, &data)?;

    let summary = SiteSummary {
        records: records.len(),
        majors: data.majors.len(),
        groups: data.groups.len(),
    };
    info!(
        majors = summary.majors,
        groups = summary.groups,
        "Wrote site data"
    );
    Ok(summary)
}
