//! Hierarchical rollup: major, subject group and credential level.
//!
//! The build runs in two passes. Every slice payload is computed first into a
//! [`PayloadTable`]; the nested [`SiteData`] is then assembled from that table
//! alone.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::analyzers::groups::SubjectGroups;
use crate::analyzers::payload::{PayloadOptions, to_payload};
use crate::analyzers::types::{Level, Payload, SiteData};
use crate::table::Record;

/// What a slice is grouped by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Major(String),
    Group(String),
}

/// Every computed slice payload, keyed by scope and level.
pub type PayloadTable = BTreeMap<(Scope, Level), Payload>;

/// Which majors take part in the rollup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MajorSelection {
    /// Only majors named in the allow-list.
    Restricted(Vec<String>),
    /// Every major present.
    Full,
}

impl MajorSelection {
    pub fn includes(&self, major: &str) -> bool {
        match self {
            MajorSelection::Restricted(allowed) => allowed.iter().any(|m| m == major),
            MajorSelection::Full => true,
        }
    }
}

/// Records of each selected major, keyed by major and kept in input order.
pub fn records_by_major<'a>(
    records: &'a [Record],
    selection: &MajorSelection,
) -> BTreeMap<&'a str, Vec<&'a Record>> {
    let mut majors: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in records {
        if let Some(major) = record.major().filter(|m| selection.includes(m)) {
            majors.entry(major).or_default().push(record);
        }
    }
    majors
}

/// Payloads for one slice overall and per credential level.
fn scope_payloads(
    scope: &Scope,
    records: &[&Record],
    options: &PayloadOptions,
) -> Vec<((Scope, Level), Payload)> {
    let mut by_level: BTreeMap<i64, Vec<&Record>> = BTreeMap::new();
    for record in records {
        if let Some(level) = record.credential_level() {
            by_level.entry(level).or_default().push(*record);
        }
    }

    let overall = to_payload(records, options).map(|p| ((scope.clone(), Level::All), p));
    let per_level = by_level.iter().filter_map(|(level, slice)| {
        to_payload(slice, options).map(|p| ((scope.clone(), Level::Credential(*level)), p))
    });

    overall.into_iter().chain(per_level).collect()
}

/// Pass one: computes every major and group payload.
///
/// A major's group is derived from the CIP code of its first record. Only
/// majors with at least one payload become group members.
pub fn compute_payloads(
    majors: &BTreeMap<&str, Vec<&Record>>,
    groups: &SubjectGroups,
    options: &PayloadOptions,
) -> (PayloadTable, BTreeMap<String, Vec<String>>) {
    let mut table: PayloadTable = majors
        .iter()
        .flat_map(|(major, records)| {
            scope_payloads(&Scope::Major(major.to_string()), records, options)
        })
        .collect();

    let with_payload: BTreeSet<&Scope> = table.keys().map(|(scope, _)| scope).collect();

    let mut membership: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (major, records) in majors {
        if !with_payload.contains(&Scope::Major(major.to_string())) {
            debug!(major, "Dropping major with no usable data");
            continue;
        }
        let cip = records.first().and_then(|r| r.cipcode.as_deref());
        membership
            .entry(groups.for_cip(cip).to_string())
            .or_default()
            .push(major.to_string());
    }

    let group_table: PayloadTable = membership
        .iter()
        .flat_map(|(group, members)| {
            let slice: Vec<&Record> = members
                .iter()
                .filter_map(|m| majors.get(m.as_str()))
                .flatten()
                .copied()
                .collect();
            scope_payloads(&Scope::Group(group.clone()), &slice, options)
        })
        .collect();

    table.extend(group_table);
    (table, membership)
}

/// Pass two: assembles the final artifact from the payload table.
pub fn assemble(table: PayloadTable, membership: BTreeMap<String, Vec<String>>) -> SiteData {
    let mut data = SiteData {
        groups: membership,
        ..Default::default()
    };
    let mut credlevs = BTreeSet::new();

    for ((scope, level), payload) in table {
        match scope {
            Scope::Major(major) => {
                if let Level::Credential(c) = level {
                    credlevs.insert(c);
                }
                data.payload.entry(major).or_default().insert(level, payload);
            }
            Scope::Group(group) => {
                data.group_payloads
                    .entry(group)
                    .or_default()
                    .insert(level, payload);
            }
        }
    }

    data.majors = data.payload.keys().cloned().collect();
    data.credlevs = credlevs.into_iter().collect();
    data
}

/// Runs both passes over `records`.
pub fn build_site_data(
    records: &[Record],
    selection: &MajorSelection,
    groups: &SubjectGroups,
    options: &PayloadOptions,
) -> SiteData {
    let majors = records_by_major(records, selection);
    debug!(majors = majors.len(), "Grouped records by major");

    let (table, membership) = compute_payloads(&majors, groups, options);
    assemble(table, membership)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(major: &str, cip: &str, credlev: &str, earn: &str) -> Record {
        Record {
            cipdesc: Some(major.into()),
            cipcode: Some(cip.into()),
            credlev: Some(credlev.into()),
            earn_mdn_1yr: Some(earn.into()),
            ..Default::default()
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("Psychology, General.", "004201", "3", "30000"),
            record("Psychology, General.", "004201", "5", "45000"),
            record("Accounting.", "005203", "3", "50000"),
            record("Business Administration.", "005202", "2", "40000"),
            record("Empty Major.", "005201", "3", "PS"),
            record("Unknown Series.", "009901", "1", "20000"),
        ]
    }

    #[test]
    fn test_full_rollup_structure() {
        let records = sample();
        let data = build_site_data(
            &records,
            &MajorSelection::Full,
            &SubjectGroups::default(),
            &PayloadOptions::default(),
        );

        assert_eq!(
            data.majors,
            vec![
                "Accounting.",
                "Business Administration.",
                "Psychology, General.",
                "Unknown Series."
            ]
        );
        assert_eq!(data.credlevs, vec![1, 2, 3, 5]);
        assert_eq!(
            data.groups["Business/Marketing"],
            vec!["Accounting.", "Business Administration."]
        );
        assert_eq!(data.groups["Other"], vec!["Unknown Series."]);
        assert!(!data.payload.contains_key("Empty Major."));

        let psych = &data.payload["Psychology, General."];
        assert_eq!(
            psych.keys().copied().collect::<Vec<_>>(),
            vec![Level::All, Level::Credential(3), Level::Credential(5)]
        );
    }

    #[test]
    fn test_group_payload_unions_member_records() {
        let records = sample();
        let data = build_site_data(
            &records,
            &MajorSelection::Full,
            &SubjectGroups::default(),
            &PayloadOptions::default(),
        );

        let business = &data.group_payloads["Business/Marketing"];
        let all = business[&Level::All].earnings.earn_pcts.as_ref().unwrap();
        assert_eq!(all.p50, 45000.0);
        assert!(business.contains_key(&Level::Credential(2)));
        assert!(business.contains_key(&Level::Credential(3)));
    }

    #[test]
    fn test_every_listed_major_and_group_is_populated() {
        let records = sample();
        let data = build_site_data(
            &records,
            &MajorSelection::Full,
            &SubjectGroups::default(),
            &PayloadOptions::default(),
        );

        for major in &data.majors {
            assert!(!data.payload[major].is_empty());
        }
        for members in data.groups.values() {
            assert!(!members.is_empty());
        }
    }

    #[test]
    fn test_restricted_selection() {
        let records = sample();
        let selection = MajorSelection::Restricted(vec!["Accounting.".to_string()]);
        let data = build_site_data(
            &records,
            &selection,
            &SubjectGroups::default(),
            &PayloadOptions::default(),
        );

        assert_eq!(data.majors, vec!["Accounting."]);
        assert_eq!(data.groups.len(), 1);
        assert_eq!(data.credlevs, vec![3]);
    }

    #[test]
    fn test_group_follows_first_record_cip() {
        let records = vec![
            record("Mixed.", "004201", "3", "30000"),
            record("Mixed.", "001101", "3", "60000"),
        ];
        let data = build_site_data(
            &records,
            &MajorSelection::Full,
            &SubjectGroups::default(),
            &PayloadOptions::default(),
        );
        assert_eq!(data.groups.keys().collect::<Vec<_>>(), vec!["Psychology"]);
    }

    #[test]
    fn test_no_records_yields_empty_artifact() {
        let data = build_site_data(
            &[],
            &MajorSelection::Full,
            &SubjectGroups::default(),
            &PayloadOptions::default(),
        );
        assert_eq!(data, SiteData::default());
    }
}
