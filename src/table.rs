//! Row types and CSV persistence for the institution, field-of-study and
//! merged tables.
//!
//! All value columns are kept as raw strings; numeric coercion happens in the
//! aggregation stage so that unparseable cells degrade to absence per record.

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, WriterBuilder};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

use crate::parser::coerce;

pub const INSTITUTION_COLUMNS: &[&str] = &[
    "UNITID",
    "INSTNM",
    "CONTROL",
    "DISTANCEONLY",
    "NPT4_PUB",
    "NPT4_PRIV",
    "COSTT4_A",
    "MD_EARN_WNE_P6",
    "MD_EARN_WNE_P10",
    "MD_EARN_WNE_5YR",
    "DEBT_MDN",
    "RPY_1YR_RT",
    "RPY_3YR_RT",
    "RPY_5YR_RT",
];

pub const FIELD_OF_STUDY_COLUMNS: &[&str] = &[
    "UNITID",
    "CIPCODE",
    "CIPDESC",
    "CREDLEV",
    "EARN_MDN_1YR",
    "EARN_MDN_4YR",
    "EARN_MDN_5YR",
    "EARN_MDN_HI_1YR",
    "EARN_MDN_HI_2YR",
    "EARN_PELL_WNE_MDN_1YR",
    "EARN_NOPELL_WNE_MDN_1YR",
    "EARN_MALE_WNE_MDN_1YR",
    "EARN_NOMALE_WNE_MDN_1YR",
    "DEBT_ALL_STGP_ANY_MDN",
    "DEBT_ALL_PP_ANY_MDN",
    "DEBT_ALL_PP_ANY_MDN10YRPAY",
    "BBRR1_FED_COMP_N",
    "BBRR1_FED_COMP_PAIDINFULL",
    "BBRR1_FED_COMP_MAKEPROG",
    "BBRR1_FED_COMP_DFLT",
    "BBRR1_FED_COMP_DLNQ",
    "BBRR1_FED_COMP_FBR",
    "BBRR1_FED_COMP_DFR",
    "BBRR4_FED_COMP_N",
    "BBRR4_FED_COMP_PAIDINFULL",
    "BBRR4_FED_COMP_MAKEPROG",
    "BBRR4_FED_COMP_DFLT",
    "BBRR4_FED_COMP_DLNQ",
    "BBRR4_FED_COMP_FBR",
    "BBRR4_FED_COMP_DFR",
];

/// Columns the aggregation stage needs from the merged table.
pub const MERGED_REQUIRED_COLUMNS: &[&str] = &["UNITID", "CIPCODE", "CIPDESC", "CREDLEV"];

/// One row of the institution-level file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct InstitutionRow {
    pub unitid: String,
    pub instnm: Option<String>,
    pub control: Option<String>,
    pub distanceonly: Option<String>,
    pub npt4_pub: Option<String>,
    pub npt4_priv: Option<String>,
    pub costt4_a: Option<String>,
    pub md_earn_wne_p6: Option<String>,
    pub md_earn_wne_p10: Option<String>,
    pub md_earn_wne_5yr: Option<String>,
    pub debt_mdn: Option<String>,
    pub rpy_1yr_rt: Option<String>,
    pub rpy_3yr_rt: Option<String>,
    pub rpy_5yr_rt: Option<String>,
}

/// One row of the field-of-study file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FieldOfStudyRow {
    pub unitid: String,
    pub cipcode: Option<String>,
    pub cipdesc: Option<String>,
    pub credlev: Option<String>,
    pub earn_mdn_1yr: Option<String>,
    pub earn_mdn_4yr: Option<String>,
    pub earn_mdn_5yr: Option<String>,
    pub earn_mdn_hi_1yr: Option<String>,
    pub earn_mdn_hi_2yr: Option<String>,
    pub earn_pell_wne_mdn_1yr: Option<String>,
    pub earn_nopell_wne_mdn_1yr: Option<String>,
    pub earn_male_wne_mdn_1yr: Option<String>,
    pub earn_nomale_wne_mdn_1yr: Option<String>,
    pub debt_all_stgp_any_mdn: Option<String>,
    pub debt_all_pp_any_mdn: Option<String>,
    pub debt_all_pp_any_mdn10yrpay: Option<String>,
    pub bbrr1_fed_comp_n: Option<String>,
    pub bbrr1_fed_comp_paidinfull: Option<String>,
    pub bbrr1_fed_comp_makeprog: Option<String>,
    pub bbrr1_fed_comp_dflt: Option<String>,
    pub bbrr1_fed_comp_dlnq: Option<String>,
    pub bbrr1_fed_comp_fbr: Option<String>,
    pub bbrr1_fed_comp_dfr: Option<String>,
    pub bbrr4_fed_comp_n: Option<String>,
    pub bbrr4_fed_comp_paidinfull: Option<String>,
    pub bbrr4_fed_comp_makeprog: Option<String>,
    pub bbrr4_fed_comp_dflt: Option<String>,
    pub bbrr4_fed_comp_dlnq: Option<String>,
    pub bbrr4_fed_comp_fbr: Option<String>,
    pub bbrr4_fed_comp_dfr: Option<String>,
}

/// A field-of-study row with its institution columns joined in.
///
/// This is the interchange format between the merge and aggregation stages.
/// Every column except the key is optional on read, so a merged file
/// produced from a narrower extract still loads.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Record {
    pub unitid: String,
    pub cipcode: Option<String>,
    pub cipcode_orig: Option<String>,
    pub cipdesc: Option<String>,
    pub credlev: Option<String>,
    pub earn_mdn_1yr: Option<String>,
    pub earn_mdn_4yr: Option<String>,
    pub earn_mdn_5yr: Option<String>,
    pub earn_mdn_hi_1yr: Option<String>,
    pub earn_mdn_hi_2yr: Option<String>,
    pub earn_pell_wne_mdn_1yr: Option<String>,
    pub earn_nopell_wne_mdn_1yr: Option<String>,
    pub earn_male_wne_mdn_1yr: Option<String>,
    pub earn_nomale_wne_mdn_1yr: Option<String>,
    pub debt_all_stgp_any_mdn: Option<String>,
    pub debt_all_pp_any_mdn: Option<String>,
    pub debt_all_pp_any_mdn10yrpay: Option<String>,
    pub bbrr1_fed_comp_n: Option<String>,
    pub bbrr1_fed_comp_paidinfull: Option<String>,
    pub bbrr1_fed_comp_makeprog: Option<String>,
    pub bbrr1_fed_comp_dflt: Option<String>,
    pub bbrr1_fed_comp_dlnq: Option<String>,
    pub bbrr1_fed_comp_fbr: Option<String>,
    pub bbrr1_fed_comp_dfr: Option<String>,
    pub bbrr4_fed_comp_n: Option<String>,
    pub bbrr4_fed_comp_paidinfull: Option<String>,
    pub bbrr4_fed_comp_makeprog: Option<String>,
    pub bbrr4_fed_comp_dflt: Option<String>,
    pub bbrr4_fed_comp_dlnq: Option<String>,
    pub bbrr4_fed_comp_fbr: Option<String>,
    pub bbrr4_fed_comp_dfr: Option<String>,
    pub instnm: Option<String>,
    pub control: Option<String>,
    pub distanceonly: Option<String>,
    pub npt4_pub: Option<String>,
    pub npt4_priv: Option<String>,
    pub costt4_a: Option<String>,
    pub md_earn_wne_p6: Option<String>,
    pub md_earn_wne_p10: Option<String>,
    pub md_earn_wne_5yr: Option<String>,
    pub debt_mdn: Option<String>,
    pub rpy_1yr_rt: Option<String>,
    pub rpy_3yr_rt: Option<String>,
    pub rpy_5yr_rt: Option<String>,
}

impl Record {
    /// Credential level as an integer code. `"3"` and `"3.0"` both read as 3.
    pub fn credential_level(&self) -> Option<i64> {
        let v = coerce(self.credlev.as_deref())?;
        (v.fract() == 0.0).then_some(v as i64)
    }

    /// Major description, if present and non-blank.
    pub fn major(&self) -> Option<&str> {
        self.cipdesc
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Opens `path` for reading, transparently decompressing `.gz` files.
fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Checks that `headers` carries every column in `expected`.
///
/// # Errors
///
/// Returns an error listing every missing column if any are absent.
pub fn validate_headers(headers: &csv::StringRecord, expected: &[&str], path: &Path) -> Result<()> {
    let missing: Vec<&str> = expected
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim() == *col))
        .collect();

    if !missing.is_empty() {
        bail!(
            "{} is missing expected column(s): {}",
            path.display(),
            missing.join(", ")
        );
    }
    Ok(())
}

/// Reads every row of a CSV file after checking its header against `expected`.
///
/// Columns not named by `T` are ignored, so full upstream extracts load as-is.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be opened, if its
/// header lacks a column in `expected`, or if any row fails to deserialize.
pub fn read_rows<T: DeserializeOwned>(path: &Path, expected: &[&str]) -> Result<Vec<T>> {
    let reader = open_reader(path)?;
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);

    let headers = rdr
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();
    validate_headers(&headers, expected, path)?;

    let mut rows = Vec::new();
    for (idx, result) in rdr.deserialize().enumerate() {
        let row: T =
            result.with_context(|| format!("{}: malformed row {}", path.display(), idx + 1))?;
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "Loaded CSV");
    Ok(rows)
}

/// Writes `rows` to a CSV file with a header line, gzip-compressing `.gz` paths.
///
/// # Errors
///
/// Returns an error if the parent directory or the file cannot be created,
/// or if a row fails to serialize or flush.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;

    if is_gzip(path) {
        let encoder = serialize_rows(
            GzEncoder::new(BufWriter::new(file), Compression::default()),
            rows,
        )?;
        encoder.finish()?.flush()?;
    } else {
        serialize_rows(BufWriter::new(file), rows)?.flush()?;
    }

    debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

fn serialize_rows<W: Write, T: Serialize>(sink: W, rows: &[T]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(sink);
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV writer: {}", e.error()))
}
