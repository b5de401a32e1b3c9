//! Classification of realized P&L by trade reason.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfitBucket {
    Grid,
    Trend,
    BasePosition,
    Other,
}

impl ProfitBucket {
    pub const ALL: [ProfitBucket; 4] = [
        ProfitBucket::Grid,
        ProfitBucket::Trend,
        ProfitBucket::BasePosition,
        ProfitBucket::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProfitBucket::Grid => "Grid profit",
            ProfitBucket::Trend => "Trend profit",
            ProfitBucket::BasePosition => "Base position profit",
            ProfitBucket::Other => "Other profit",
        }
    }
}

impl fmt::Display for ProfitBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn is_box_grid(reason: &str) -> bool {
    reason.contains("BOX_GRID")
}

fn is_above_120(reason: &str) -> bool {
    reason.contains("ABOVE_120")
}

fn is_between_300_150(reason: &str) -> bool {
    reason.contains("BETWEEN_300_150")
}

/// Evaluated in order against the upper-cased reason; first match wins.
pub const CLASSIFICATION_RULES: &[(fn(&str) -> bool, ProfitBucket)] = &[
    (is_box_grid, ProfitBucket::Grid),
    (is_above_120, ProfitBucket::Trend),
    (is_between_300_150, ProfitBucket::BasePosition),
];

pub fn classify_reason(reason: &str) -> ProfitBucket {
    let reason = reason.to_uppercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(matches, _)| matches(reason.as_str()))
        .map(|&(_, bucket)| bucket)
        .unwrap_or(ProfitBucket::Other)
}

/// Realized P&L summed per bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfitBreakdown {
    amounts: BTreeMap<ProfitBucket, f64>,
}

impl ProfitBreakdown {
    pub fn from_reasons(realized_by_reason: &BTreeMap<String, f64>) -> Self {
        let mut breakdown = ProfitBreakdown::default();
        for (reason, amount) in realized_by_reason {
            breakdown.add(classify_reason(reason), *amount);
        }
        breakdown
    }

    pub fn add(&mut self, bucket: ProfitBucket, amount: f64) {
        *self.amounts.entry(bucket).or_insert(0.0) += amount;
    }

    pub fn merge(&mut self, other: &ProfitBreakdown) {
        for (&bucket, &amount) in &other.amounts {
            self.add(bucket, amount);
        }
    }

    pub fn get(&self, bucket: ProfitBucket) -> f64 {
        self.amounts.get(&bucket).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }

    /// Each bucket's percentage of `total`, or `None` when `total` is exactly zero.
    pub fn shares(&self, total: f64) -> Option<Vec<(ProfitBucket, f64)>> {
        if total == 0.0 {
            return None;
        }
        Some(
            ProfitBucket::ALL
                .iter()
                .map(|&bucket| (bucket, self.get(bucket) / total * 100.0))
                .collect(),
        )
    }
}
