//! Data types used by the aggregation pipeline.
//!
//! Every metric is optional and omitted from the JSON when absent; nothing is
//! zero-filled.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::table::Record;

/// One histogram bin over the earnings distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub x0: f64,
    pub x1: f64,
    pub count: usize,
}

/// Earnings percentile ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Earnings and debt metrics for one earnings column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EarningsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earn_bins: Option<Vec<Bin>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earn_pcts: Option<Percentiles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_mdn: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earn_to_debt_ratio: Option<f64>,
}

impl EarningsSummary {
    pub fn is_empty(&self) -> bool {
        self.earn_bins.is_none()
            && self.earn_pcts.is_none()
            && self.debt_mdn.is_none()
            && self.earn_to_debt_ratio.is_none()
    }
}

/// Bucketed repayment outcome shares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentDistribution {
    pub paid_prog: f64,
    pub default_delinq: f64,
    pub other: f64,
}

/// Cohort-weighted repayment outcome breakdown for one horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentBreakdown {
    pub healthy: f64,
    pub dist: RepaymentDistribution,
    pub cohort_n: f64,
}

/// Statistics summary for one slice of records.
///
/// The primary earnings summary is flattened into the top level; the
/// sub-population summaries sit under `views`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payload {
    #[serde(flatten)]
    pub earnings: EarningsSummary,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub views: BTreeMap<String, EarningsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpy_3yr_rt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpy1: Option<RepaymentBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpy4: Option<RepaymentBreakdown>,
}

impl Payload {
    /// True when no metric at all is present.
    pub fn is_empty(&self) -> bool {
        self.earnings.is_empty()
            && self.views.is_empty()
            && self.rpy_3yr_rt.is_none()
            && self.cost_avg.is_none()
            && self.rpy1.is_none()
            && self.rpy4.is_none()
    }
}

/// Earnings columns of the field-of-study table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningsColumn {
    OneYear,
    FourYear,
    FiveYear,
    Pell,
    NoPell,
    Male,
    NoMale,
}

impl EarningsColumn {
    /// Sub-population views, keyed by their JSON name.
    pub const VIEWS: [(&'static str, EarningsColumn); 4] = [
        ("pell", EarningsColumn::Pell),
        ("nopell", EarningsColumn::NoPell),
        ("male", EarningsColumn::Male),
        ("nomale", EarningsColumn::NoMale),
    ];

    pub fn cell(self, record: &Record) -> Option<&str> {
        let cell = match self {
            EarningsColumn::OneYear => &record.earn_mdn_1yr,
            EarningsColumn::FourYear => &record.earn_mdn_4yr,
            EarningsColumn::FiveYear => &record.earn_mdn_5yr,
            EarningsColumn::Pell => &record.earn_pell_wne_mdn_1yr,
            EarningsColumn::NoPell => &record.earn_nopell_wne_mdn_1yr,
            EarningsColumn::Male => &record.earn_male_wne_mdn_1yr,
            EarningsColumn::NoMale => &record.earn_nomale_wne_mdn_1yr,
        };
        cell.as_deref()
    }
}

/// Which records of a major or group a payload covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    All,
    Credential(i64),
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Level::All => serializer.serialize_str("__ALL__"),
            Level::Credential(c) => serializer.serialize_i64(*c),
        }
    }
}

/// Payloads of one major or group, keyed by level.
pub type LevelPayloads = BTreeMap<Level, Payload>;

/// The final artifact consumed by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SiteData {
    pub groups: BTreeMap<String, Vec<String>>,
    pub group_payloads: BTreeMap<String, LevelPayloads>,
    pub majors: Vec<String>,
    pub credlevs: Vec<i64>,
    pub payload: BTreeMap<String, LevelPayloads>,
}
