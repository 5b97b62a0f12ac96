//! Merge stage: joins institution columns onto field-of-study rows.

use anyhow::Result;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use tracing::{info, warn};

use crate::cip;
use crate::parser::integral_text;
use crate::table::{
    FIELD_OF_STUDY_COLUMNS, FieldOfStudyRow, INSTITUTION_COLUMNS, InstitutionRow, Record,
    read_rows, write_rows,
};

/// Summary of a merge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub rows: usize,
    pub unmatched: usize,
    pub duplicate_institutions: usize,
}

/// Canonical form of an institution id: trimmed, with `"123.0"` read as `"123"`.
fn join_key(raw: &str) -> String {
    integral_text(raw.trim()).to_string()
}

/// Left-joins `institutions` onto `fos` by institution id.
///
/// Every field-of-study row appears exactly once in the output, in input
/// order. Rows without a matching institution keep empty institution columns.
/// If an institution id repeats, the first row wins.
pub fn left_join(fos: Vec<FieldOfStudyRow>, institutions: &[InstitutionRow]) -> (Vec<Record>, MergeSummary) {
    let mut by_id: HashMap<String, &InstitutionRow> = HashMap::with_capacity(institutions.len());
    let mut duplicate_institutions = 0;
    for inst in institutions {
        match by_id.entry(join_key(&inst.unitid)) {
            Entry::Vacant(slot) => {
                slot.insert(inst);
            }
            Entry::Occupied(_) => duplicate_institutions += 1,
        }
    }
    if duplicate_institutions > 0 {
        warn!(duplicate_institutions, "Duplicate institution ids; keeping first occurrence");
    }

    let mut unmatched = 0;
    let records: Vec<Record> = fos
        .into_iter()
        .map(|row| {
            let inst = by_id.get(&join_key(&row.unitid)).copied();
            if inst.is_none() {
                unmatched += 1;
            }
            merge_row(row, inst)
        })
        .collect();

    let summary = MergeSummary {
        rows: records.len(),
        unmatched,
        duplicate_institutions,
    };
    (records, summary)
}

fn merge_row(row: FieldOfStudyRow, inst: Option<&InstitutionRow>) -> Record {
    let inst = inst.cloned().unwrap_or_default();

    Record {
        unitid: row.unitid,
        cipcode: cip::normalize(row.cipcode.as_deref()),
        cipcode_orig: row.cipcode,
        cipdesc: row.cipdesc,
        credlev: row.credlev,
        earn_mdn_1yr: row.earn_mdn_1yr,
        earn_mdn_4yr: row.earn_mdn_4yr,
        earn_mdn_5yr: row.earn_mdn_5yr,
        earn_mdn_hi_1yr: row.earn_mdn_hi_1yr,
        earn_mdn_hi_2yr: row.earn_mdn_hi_2yr,
        earn_pell_wne_mdn_1yr: row.earn_pell_wne_mdn_1yr,
        earn_nopell_wne_mdn_1yr: row.earn_nopell_wne_mdn_1yr,
        earn_male_wne_mdn_1yr: row.earn_male_wne_mdn_1yr,
        earn_nomale_wne_mdn_1yr: row.earn_nomale_wne_mdn_1yr,
        debt_all_stgp_any_mdn: row.debt_all_stgp_any_mdn,
        debt_all_pp_any_mdn: row.debt_all_pp_any_mdn,
        debt_all_pp_any_mdn10yrpay: row.debt_all_pp_any_mdn10yrpay,
        bbrr1_fed_comp_n: row.bbrr1_fed_comp_n,
        bbrr1_fed_comp_paidinfull: row.bbrr1_fed_comp_paidinfull,
        bbrr1_fed_comp_makeprog: row.bbrr1_fed_comp_makeprog,
        bbrr1_fed_comp_dflt: row.bbrr1_fed_comp_dflt,
        bbrr1_fed_comp_dlnq: row.bbrr1_fed_comp_dlnq,
        bbrr1_fed_comp_fbr: row.bbrr1_fed_comp_fbr,
        bbrr1_fed_comp_dfr: row.bbrr1_fed_comp_dfr,
        bbrr4_fed_comp_n: row.bbrr4_fed_comp_n,
        bbrr4_fed_comp_paidinfull: row.bbrr4_fed_comp_paidinfull,
        bbrr4_fed_comp_makeprog: row.bbrr4_fed_comp_makeprog,
        bbrr4_fed_comp_dflt: row.bbrr4_fed_comp_dflt,
        bbrr4_fed_comp_dlnq: row.bbrr4_fed_comp_dlnq,
        bbrr4_fed_comp_fbr: row.bbrr4_fed_comp_fbr,
        bbrr4_fed_comp_dfr: row.bbrr4_fed_comp_dfr,
        instnm: inst.instnm,
        control: inst.control,
        distanceonly: inst.distanceonly,
        npt4_pub: inst.npt4_pub,
        npt4_priv: inst.npt4_priv,
        costt4_a: inst.costt4_a,
        md_earn_wne_p6: inst.md_earn_wne_p6,
        md_earn_wne_p10: inst.md_earn_wne_p10,
        md_earn_wne_5yr: inst.md_earn_wne_5yr,
        debt_mdn: inst.debt_mdn,
        rpy_1yr_rt: inst.rpy_1yr_rt,
        rpy_3yr_rt: inst.rpy_3yr_rt,
        rpy_5yr_rt: inst.rpy_5yr_rt,
    }
}

/// Loads both input files, joins them and writes the merged table to `output`.
///
/// Both inputs are loaded and validated before the output is created, so a
/// missing file or column leaves no partial output behind.
///
/// # Errors
///
/// Returns an error if either input is missing or lacks a required column,
/// or if the merged table cannot be written.
#[tracing::instrument(skip_all, fields(institutions = %institutions.display(), fields_of_study = %fields_of_study.display(), output = %output.display()))]
pub fn merge_files(institutions: &Path, fields_of_study: &Path, output: &Path) -> Result<MergeSummary> {
    info!("Loading field-of-study data");
    let fos: Vec<FieldOfStudyRow> = read_rows(fields_of_study, FIELD_OF_STUDY_COLUMNS)?;

    info!("Loading institution-level data");
    let inst: Vec<InstitutionRow> = read_rows(institutions, INSTITUTION_COLUMNS)?;

    let (records, summary) = left_join(fos, &inst);
    info!(
        rows = summary.rows,
        unmatched = summary.unmatched,
        institutions = inst.len(),
        "Merged field-of-study and institution data"
    );

    write_rows(output, &records)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fos(unitid: &str, cip: &str) -> FieldOfStudyRow {
        FieldOfStudyRow {
            unitid: unitid.into(),
            cipcode: Some(cip.into()),
            cipdesc: Some("Psychology, General.".into()),
            credlev: Some("3".into()),
            ..Default::default()
        }
    }

    fn inst(unitid: &str, cost: &str) -> InstitutionRow {
        InstitutionRow {
            unitid: unitid.into(),
            costt4_a: Some(cost.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_left_join_keeps_every_left_row() {
        let left = vec![fos("1", "42.01"), fos("2", "4201"), fos("1", "4201")];
        let right = vec![inst("1", "20000")];

        let (records, summary) = left_join(left, &right);

        assert_eq!(records.len(), 3);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(records[0].costt4_a.as_deref(), Some("20000"));
        assert_eq!(records[1].costt4_a, None);
        assert_eq!(records[2].costt4_a.as_deref(), Some("20000"));
    }

    #[test]
    fn test_left_join_normalizes_cip_and_keeps_original() {
        let (records, _) = left_join(vec![fos("1", "42.01")], &[]);
        assert_eq!(records[0].cipcode.as_deref(), Some("004201"));
        assert_eq!(records[0].cipcode_orig.as_deref(), Some("42.01"));
    }

    #[test]
    fn test_duplicate_institution_does_not_duplicate_rows() {
        let right = vec![inst("1", "100"), inst("1", "200")];
        let (records, summary) = left_join(vec![fos("1", "4201")], &right);

        assert_eq!(records.len(), 1);
        assert_eq!(summary.duplicate_institutions, 1);
        assert_eq!(records[0].costt4_a.as_deref(), Some("100"));
    }

    #[test]
    fn test_join_key_accepts_float_spelling() {
        let (records, summary) = left_join(vec![fos("100654", "4201")], &[inst("100654.0", "1")]);
        assert_eq!(summary.unmatched, 0);
        assert_eq!(records[0].costt4_a.as_deref(), Some("1"));
    }
}
