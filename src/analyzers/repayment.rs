//! Cohort-weighted repayment outcome breakdowns.

use crate::analyzers::types::{RepaymentBreakdown, RepaymentDistribution};
use crate::analyzers::utility::round_to;
use crate::parser::{coerce, parse_encoded};
use crate::table::Record;

/// Horizon after entering repayment at which the cohort is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaymentHorizon {
    OneYear,
    FourYear,
}

/// Raw repayment-component cells of one record for one horizon.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentCells<'a> {
    pub n: Option<&'a str>,
    pub paid_in_full: Option<&'a str>,
    pub making_progress: Option<&'a str>,
    pub default: Option<&'a str>,
    pub delinquent: Option<&'a str>,
    pub forbearance: Option<&'a str>,
    pub deferment: Option<&'a str>,
}

impl RepaymentHorizon {
    pub fn cells(self, r: &Record) -> ComponentCells<'_> {
        match self {
            RepaymentHorizon::OneYear => ComponentCells {
                n: r.bbrr1_fed_comp_n.as_deref(),
                paid_in_full: r.bbrr1_fed_comp_paidinfull.as_deref(),
                making_progress: r.bbrr1_fed_comp_makeprog.as_deref(),
                default: r.bbrr1_fed_comp_dflt.as_deref(),
                delinquent: r.bbrr1_fed_comp_dlnq.as_deref(),
                forbearance: r.bbrr1_fed_comp_fbr.as_deref(),
                deferment: r.bbrr1_fed_comp_dfr.as_deref(),
            },
            RepaymentHorizon::FourYear => ComponentCells {
                n: r.bbrr4_fed_comp_n.as_deref(),
                paid_in_full: r.bbrr4_fed_comp_paidinfull.as_deref(),
                making_progress: r.bbrr4_fed_comp_makeprog.as_deref(),
                default: r.bbrr4_fed_comp_dflt.as_deref(),
                delinquent: r.bbrr4_fed_comp_dlnq.as_deref(),
                forbearance: r.bbrr4_fed_comp_fbr.as_deref(),
                deferment: r.bbrr4_fed_comp_dfr.as_deref(),
            },
        }
    }
}

/// Running cohort-weighted sum for one component.
#[derive(Debug, Default, Clone, Copy)]
struct Weighted {
    total: f64,
    weight: f64,
}

impl Weighted {
    fn add(&mut self, rate: Option<f64>, n: f64) {
        if let Some(rate) = rate {
            self.total += rate * n;
            self.weight += n;
        }
    }

    /// Weighted mean over the rows that reported this component; 0 if none did.
    fn rate(self) -> f64 {
        if self.weight > 0.0 {
            self.total / self.weight
        } else {
            0.0
        }
    }
}

/// Computes the breakdown for `horizon` over `records`.
///
/// Records without a cohort size are dropped. Each component rate is the
/// cohort-weighted mean over the records that report it. The six components
/// fold into healthy (paid in full + making progress), bad (default +
/// delinquent) and other (forbearance + deferment); if those exceed 1.0 they
/// are scaled to sum to exactly 1.0. Returns `None` unless the total cohort
/// size is positive.
pub fn breakdown<'a, I>(records: I, horizon: RepaymentHorizon) -> Option<RepaymentBreakdown>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut total_n = 0.0;
    let mut paid = Weighted::default();
    let mut prog = Weighted::default();
    let mut dflt = Weighted::default();
    let mut dlnq = Weighted::default();
    let mut fbr = Weighted::default();
    let mut dfr = Weighted::default();

    for record in records {
        let cells = horizon.cells(record);
        let Some(n) = coerce(cells.n) else {
            continue;
        };
        total_n += n;

        paid.add(parse_encoded(cells.paid_in_full).value(), n);
        prog.add(parse_encoded(cells.making_progress).value(), n);
        dflt.add(parse_encoded(cells.default).value(), n);
        dlnq.add(parse_encoded(cells.delinquent).value(), n);
        fbr.add(parse_encoded(cells.forbearance).value(), n);
        dfr.add(parse_encoded(cells.deferment).value(), n);
    }

    if total_n <= 0.0 {
        return None;
    }

    let mut healthy = paid.rate() + prog.rate();
    let mut bad = dflt.rate() + dlnq.rate();
    let mut other = fbr.rate() + dfr.rate();

    let sum = healthy + bad + other;
    if sum > 1.0 {
        healthy /= sum;
        bad /= sum;
        other /= sum;
    }

    let healthy = round_to(healthy, 4);
    Some(RepaymentBreakdown {
        healthy,
        dist: RepaymentDistribution {
            paid_prog: healthy,
            default_delinq: round_to(bad, 4),
            other: round_to(other, 4),
        },
        cohort_n: total_n,
    })
}
