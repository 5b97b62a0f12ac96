use outcomes_rollup::analyzers::analyzer::generate_site_data;
use outcomes_rollup::config::{Overrides, SiteConfig};
use outcomes_rollup::merge::merge_files;
use outcomes_rollup::table::{
    FIELD_OF_STUDY_COLUMNS, INSTITUTION_COLUMNS, MERGED_REQUIRED_COLUMNS, Record, read_rows,
};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const PSYCH: &str = "Psychology, General.";
const COMPSCI: &str = "Computer and Information Sciences, General.";
const HISTORY: &str = "History, General.";

fn workdir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("outcomes_rollup_it_{}_{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Renders a CSV with `columns` as header; unspecified cells are left empty.
fn csv_with(columns: &[&str], rows: &[Vec<(&str, String)>]) -> String {
    let mut out = columns.join(",");
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| {
                row.iter()
                    .find(|(k, _)| k == col)
                    .map(|(_, v)| format!("\"{v}\""))
                    .unwrap_or_default()
            })
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn earnings_row(unitid: &str, earn: u32) -> Vec<(&'static str, String)> {
    vec![
        ("UNITID", unitid.to_string()),
        ("CIPCODE", "42.01".to_string()),
        ("CIPDESC", PSYCH.to_string()),
        ("CREDLEV", "3".to_string()),
        ("EARN_MDN_1YR", earn.to_string()),
    ]
}

fn repayment_row(unitid: &str, n: &str, paid: &str) -> Vec<(&'static str, String)> {
    vec![
        ("UNITID", unitid.to_string()),
        ("CIPCODE", "1101".to_string()),
        ("CIPDESC", COMPSCI.to_string()),
        ("CREDLEV", "3".to_string()),
        ("EARN_MDN_1YR", "PrivacySuppressed".to_string()),
        ("BBRR1_FED_COMP_N", n.to_string()),
        ("BBRR1_FED_COMP_PAIDINFULL", paid.to_string()),
        ("BBRR1_FED_COMP_MAKEPROG", "<=0.3".to_string()),
        ("BBRR1_FED_COMP_DFLT", "PS".to_string()),
        ("BBRR1_FED_COMP_DLNQ", "0.05".to_string()),
        ("BBRR1_FED_COMP_FBR", "0.1".to_string()),
        ("BBRR1_FED_COMP_DFR", "0.1".to_string()),
    ]
}

/// Writes the two raw extracts into `dir` and returns their paths.
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let institutions = dir.join("institutions.csv");
    let fos = dir.join("fos.csv");

    let inst_rows = vec![vec![
        ("UNITID", "900".to_string()),
        ("INSTNM", "Example College".to_string()),
        ("COSTT4_A", "21000".to_string()),
        ("RPY_3YR_RT", "0.61".to_string()),
    ]];

    let mut fos_rows: Vec<Vec<(&str, String)>> =
        (1..=12).map(|i| earnings_row("100", 20000 + i * 1500)).collect();
    fos_rows.push(repayment_row("100", "40", "0.1-0.2"));
    fos_rows.push(repayment_row("100", "60", "0.2"));
    fos_rows.push(repayment_row("100", "", "0.9"));
    fos_rows.push(vec![
        ("UNITID", "900".to_string()),
        ("CIPCODE", "54.01".to_string()),
        ("CIPDESC", HISTORY.to_string()),
        ("CREDLEV", "3".to_string()),
        ("EARN_MDN_1YR", "38000".to_string()),
    ]);

    fs::write(&institutions, csv_with(INSTITUTION_COLUMNS, &inst_rows)).unwrap();
    fs::write(&fos, csv_with(FIELD_OF_STUDY_COLUMNS, &fos_rows)).unwrap();
    (institutions, fos)
}

fn restricted_config(bins: usize) -> SiteConfig {
    let overrides = Overrides {
        bins: Some(bins),
        ..Default::default()
    };
    SiteConfig::load(None, overrides).unwrap()
}

#[test]
fn test_merge_keeps_every_field_of_study_row() {
    let dir = workdir("merge");
    let (institutions, fos) = write_inputs(&dir);
    let merged = dir.join("clean").join("clean_data.csv");

    let summary = merge_files(&institutions, &fos, &merged).unwrap();
    assert_eq!(summary.rows, 16);
    assert_eq!(summary.unmatched, 15);

    let records: Vec<Record> = read_rows(&merged, MERGED_REQUIRED_COLUMNS).unwrap();
    assert_eq!(records.len(), 16);

    let history = records.iter().find(|r| r.major() == Some(HISTORY)).unwrap();
    assert_eq!(history.cipcode.as_deref(), Some("005401"));
    assert_eq!(history.costt4_a.as_deref(), Some("21000"));
    assert_eq!(history.instnm.as_deref(), Some("Example College"));

    let psych = records.iter().find(|r| r.major() == Some(PSYCH)).unwrap();
    assert_eq!(psych.costt4_a, None);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_end_to_end_restricted_mode() {
    let dir = workdir("e2e");
    let (institutions, fos) = write_inputs(&dir);
    let merged = dir.join("clean_data.csv");
    let output = dir.join("docs").join("data.json");

    merge_files(&institutions, &fos, &merged).unwrap();
    let summary = generate_site_data(&merged, &output, &restricted_config(10)).unwrap();
    assert_eq!(summary.majors, 2);

    let data: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();

    // History is outside the default allow-list.
    assert_eq!(data["majors"], serde_json::json!([COMPSCI, PSYCH]));
    assert_eq!(data["credlevs"], serde_json::json!([3]));
    assert_eq!(data["groups"]["Psychology"], serde_json::json!([PSYCH]));
    assert_eq!(data["groups"]["Computer Sciences"], serde_json::json!([COMPSCI]));
    assert!(data["payload"].get(HISTORY).is_none());

    let psych = &data["payload"][PSYCH]["__ALL__"];
    assert_eq!(psych["earn_bins"].as_array().unwrap().len(), 10);
    assert_eq!(psych["earn_pcts"].as_object().unwrap().len(), 5);
    assert!(psych.get("debt_mdn").is_none());
    assert!(psych.get("cost_avg").is_none());
    assert!(psych.get("rpy1").is_none());
    assert!(data["payload"][PSYCH]["3"].is_object());

    let compsci = &data["payload"][COMPSCI]["__ALL__"];
    assert!(compsci.get("earn_bins").is_none());
    let rpy1 = &compsci["rpy1"];
    // paid: (0.15 * 40 + 0.2 * 60) / 100 = 0.18, plus progress 0.3
    assert_eq!(rpy1["healthy"].as_f64(), Some(0.48));
    assert_eq!(rpy1["dist"]["default_delinq"].as_f64(), Some(0.05));
    assert_eq!(rpy1["dist"]["other"].as_f64(), Some(0.2));
    assert_eq!(rpy1["cohort_n"].as_f64(), Some(100.0));
    assert!(compsci.get("rpy4").is_none());

    let group = &data["group_payloads"]["Psychology"]["__ALL__"];
    assert_eq!(group["earn_pcts"], psych["earn_pcts"]);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_full_mode_includes_every_major() {
    let dir = workdir("full");
    let (institutions, fos) = write_inputs(&dir);
    let merged = dir.join("clean_data.csv.gz");
    let output = dir.join("data.json");

    merge_files(&institutions, &fos, &merged).unwrap();
    let config = SiteConfig::load(
        None,
        Overrides {
            full: true,
            ..Default::default()
        },
    )
    .unwrap();
    generate_site_data(&merged, &output, &config).unwrap();

    let data: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(data["majors"], serde_json::json!([COMPSCI, HISTORY, PSYCH]));

    let history = &data["payload"][HISTORY]["__ALL__"];
    assert_eq!(history["cost_avg"].as_f64(), Some(21000.0));
    assert_eq!(history["rpy_3yr_rt"].as_f64(), Some(0.61));
    assert_eq!(history["earn_bins"].as_array().unwrap().len(), 50);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = workdir("determinism");
    let (institutions, fos) = write_inputs(&dir);
    let merged = dir.join("clean_data.csv");
    merge_files(&institutions, &fos, &merged).unwrap();

    let first = dir.join("first.json");
    let second = dir.join("second.json");
    let config = restricted_config(10);
    generate_site_data(&merged, &first, &config).unwrap();
    generate_site_data(&merged, &second, &config).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_input_writes_nothing() {
    let dir = workdir("missing");
    let output = dir.join("data.json");

    let err = generate_site_data(&dir.join("nope.csv"), &output, &SiteConfig::default()).unwrap_err();
    assert!(err.to_string().contains("input file not found"));
    assert!(!output.exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_join_key_is_fatal() {
    let dir = workdir("schema");
    let (_, fos) = write_inputs(&dir);
    let institutions = dir.join("bad_institutions.csv");
    let columns: Vec<&str> = INSTITUTION_COLUMNS
        .iter()
        .copied()
        .filter(|c| *c != "UNITID")
        .collect();
    fs::write(&institutions, csv_with(&columns, &[])).unwrap();
    let merged = dir.join("clean_data.csv");

    let err = merge_files(&institutions, &fos, &merged).unwrap_err();
    assert!(err.to_string().contains("UNITID"));
    assert!(!merged.exists());

    fs::remove_dir_all(&dir).unwrap();
}
