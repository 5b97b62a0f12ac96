//! Statistics payload builder for a single slice of records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyzers::repayment::{RepaymentHorizon, breakdown};
use crate::analyzers::types::{Bin, EarningsColumn, EarningsSummary, Payload, Percentiles};
use crate::analyzers::utility::{histogram, mean, median, percentile_sorted, round_to, sorted};
use crate::parser::coerce;
use crate::table::Record;

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 50;

/// When a slice's metrics are good enough to emit a payload.
///
/// The primary fields are the primary earnings summary, the repayment rate
/// and the cost average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadPolicy {
    /// Emit whenever any metric is present.
    #[default]
    AnyField,
    /// Emit when at least one primary field is present.
    AnyPrimary,
    /// Emit only when every primary field is present.
    AllPrimary,
}

impl PayloadPolicy {
    pub fn accepts(self, payload: &Payload) -> bool {
        let primary = [
            !payload.earnings.is_empty(),
            payload.rpy_3yr_rt.is_some(),
            payload.cost_avg.is_some(),
        ];
        match self {
            PayloadPolicy::AnyField => !payload.is_empty(),
            PayloadPolicy::AnyPrimary => primary.iter().any(|p| *p),
            PayloadPolicy::AllPrimary => primary.iter().all(|p| *p),
        }
    }
}

/// Knobs for [`to_payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadOptions {
    pub bins: usize,
    pub policy: PayloadPolicy,
    pub earnings: EarningsColumn,
}

impl Default for PayloadOptions {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            policy: PayloadPolicy::default(),
            earnings: EarningsColumn::OneYear,
        }
    }
}

/// Builds the statistics payload for `slice`.
///
/// Returns `None` when the slice is empty or when `options.policy` rejects
/// the metrics found.
pub fn to_payload(slice: &[&Record], options: &PayloadOptions) -> Option<Payload> {
    if slice.is_empty() {
        return None;
    }

    // A view exists only where its own sub-population reports earnings.
    let views: BTreeMap<String, EarningsSummary> = EarningsColumn::VIEWS
        .iter()
        .map(|(name, column)| (name.to_string(), earnings_summary(slice, *column, options.bins)))
        .filter(|(_, summary)| summary.earn_bins.is_some())
        .collect();

    let rpy: Vec<f64> = slice.iter().filter_map(|r| coerce(r.rpy_3yr_rt.as_deref())).collect();
    let cost: Vec<f64> = slice.iter().filter_map(|r| coerce(r.costt4_a.as_deref())).collect();

    let payload = Payload {
        earnings: earnings_summary(slice, options.earnings, options.bins),
        views,
        rpy_3yr_rt: mean(&rpy).map(|v| round_to(v, 4)),
        cost_avg: mean(&cost).map(|v| round_to(v, 2)),
        rpy1: breakdown(slice.iter().copied(), RepaymentHorizon::OneYear),
        rpy4: breakdown(slice.iter().copied(), RepaymentHorizon::FourYear),
    };

    options.policy.accepts(&payload).then_some(payload)
}

/// Earnings distribution, debt median and earnings-to-debt ratio for one
/// earnings column against the primary debt column.
pub fn earnings_summary(slice: &[&Record], column: EarningsColumn, bins: usize) -> EarningsSummary {
    let pairs: Vec<(Option<f64>, Option<f64>)> = slice
        .iter()
        .map(|r| (coerce(column.cell(r)), coerce(r.debt_all_stgp_any_mdn.as_deref())))
        .collect();

    let earn: Vec<f64> = pairs.iter().filter_map(|(e, _)| *e).collect();
    let debt: Vec<f64> = pairs.iter().filter_map(|(_, d)| *d).collect();

    // Ratios only from records carrying both values.
    let ratios: Vec<f64> = pairs
        .iter()
        .filter_map(|pair| match *pair {
            (Some(e), Some(d)) => Some(e / d),
            _ => None,
        })
        .filter(|r| r.is_finite())
        .collect();

    let mut summary = EarningsSummary {
        debt_mdn: median(&debt).map(|v| round_to(v, 2)),
        earn_to_debt_ratio: median(&ratios).map(|v| round_to(v, 4)),
        ..Default::default()
    };

    if let Some((edges, counts)) = histogram(&earn, bins) {
        summary.earn_bins = Some(
            counts
                .iter()
                .enumerate()
                .map(|(i, &count)| Bin {
                    x0: round_to(edges[i], 2),
                    x1: round_to(edges[i + 1], 2),
                    count,
                })
                .collect(),
        );
        summary.earn_pcts = percentiles(&earn);
    }

    summary
}

fn percentiles(values: &[f64]) -> Option<Percentiles> {
    let s = sorted(values);
    let at = |q: f64| percentile_sorted(&s, q).map(|v| round_to(v, 2));
    Some(Percentiles {
        p10: at(10.0)?,
        p25: at(25.0)?,
        p50: at(50.0)?,
        p75: at(75.0)?,
        p90: at(90.0)?,
    })
}
