//! Baseline covariate balance across treatment groups.
//!
//! Numeric covariates are compared with a one-way ANOVA, categorical ones with a
//! chi-square test of independence (Yates-corrected on 2×2 tables). A covariate
//! counts as balanced when `p > 0.05`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::anova::one_way;
use super::stats::chi_square_p_value;
use super::types::SIGNIFICANCE_LEVEL;
use crate::units::{CovariateValues, UnitPool};

/// Maximum number of covariates examined by a balance check.
pub const MAX_BALANCE_COVARIATES: usize = 10;

/// Test used for one covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BalanceTest {
    /// One-way ANOVA F test.
    Anova,
    /// Chi-square test of independence.
    ChiSquare,
}

/// Balance result for one covariate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CovariateBalance {
    /// Covariate name.
    pub name: String,
    /// Test applied.
    pub test: BalanceTest,
    /// F or chi-square statistic.
    pub statistic: f64,
    /// P-value.
    pub p_value: f64,
    /// Whether `p > 0.05`.
    pub balanced: bool,
}

/// Balance of baseline covariates across treatment groups.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BalanceReport {
    /// Per-covariate results, in pool order.
    pub covariates: Vec<CovariateBalance>,
    /// Covariates that could not be tested.
    pub skipped: Vec<String>,
}

impl BalanceReport {
    /// Number of covariates tested.
    #[must_use]
    pub fn tested(&self) -> usize {
        self.covariates.len()
    }

    /// Number of balanced covariates.
    #[must_use]
    pub fn balanced(&self) -> usize {
        self.covariates.iter().filter(|c| c.balanced).count()
    }

    /// Fraction of tested covariates that are balanced; `0.0` when none were tested.
    #[must_use]
    pub fn fraction_balanced(&self) -> f64 {
        if self.covariates.is_empty() {
            0.0
        } else {
            self.balanced() as f64 / self.tested() as f64
        }
    }
}

/// Check covariate balance for a treatment assignment aligned with the pool.
///
/// `treatments[i]` is the label of unit `i`, `None` when unassigned.
#[must_use]
pub fn check_balance(pool: &UnitPool, treatments: &[Option<String>]) -> BalanceReport {
    let mut report = BalanceReport::default();

    for covariate in pool.covariates().iter().take(MAX_BALANCE_COVARIATES) {
        let result = match &covariate.values {
            CovariateValues::Numeric(values) => numeric_balance(treatments, values),
            CovariateValues::Categorical(values) => categorical_balance(treatments, values),
        };

        match result {
            Some((test, statistic, p_value)) => report.covariates.push(CovariateBalance {
                name: covariate.name.clone(),
                test,
                statistic,
                p_value,
                balanced: p_value > SIGNIFICANCE_LEVEL,
            }),
            None => {
                tracing::warn!(covariate = %covariate.name, "could not check balance, skipping");
                report.skipped.push(covariate.name.clone());
            }
        }
    }

    if pool.covariates().len() > MAX_BALANCE_COVARIATES {
        tracing::debug!(
            total = pool.covariates().len(),
            checked = MAX_BALANCE_COVARIATES,
            "balance check limited to the first covariates"
        );
    }
    tracing::info!(
        balanced = report.balanced(),
        tested = report.tested(),
        "balance check: covariates balanced (p > 0.05)"
    );
    report
}

fn numeric_balance(
    treatments: &[Option<String>],
    values: &[Option<f64>],
) -> Option<(BalanceTest, f64, f64)> {
    let (keys, observed): (Vec<Option<&str>>, Vec<f64>) = treatments
        .iter()
        .zip(values)
        .filter_map(|(t, v)| Some((Some(t.as_deref()?), (*v)?)))
        .unzip();

    let anova = one_way("treatment", keys, &observed);
    if anova.f_statistic.is_nan() {
        return None;
    }
    Some((BalanceTest::Anova, anova.f_statistic, anova.p_value))
}

fn categorical_balance(
    treatments: &[Option<String>],
    values: &[Option<String>],
) -> Option<(BalanceTest, f64, f64)> {
    let mut rows: Vec<&str> = Vec::new();
    let mut cols: Vec<&str> = Vec::new();
    let mut cells: Vec<(usize, usize)> = Vec::new();
    for (t, v) in treatments.iter().zip(values) {
        let (Some(t), Some(v)) = (t.as_deref(), v.as_deref()) else {
            continue;
        };
        let r = index_of(&mut rows, t);
        let c = index_of(&mut cols, v);
        cells.push((r, c));
    }
    if rows.len() < 2 || cols.len() < 2 {
        return None;
    }

    let mut observed = vec![vec![0.0_f64; cols.len()]; rows.len()];
    for (r, c) in cells {
        observed[r][c] += 1.0;
    }
    let (statistic, df) = chi_square_statistic(&observed);
    Some((BalanceTest::ChiSquare, statistic, chi_square_p_value(statistic, df)))
}

fn index_of<'a>(seen: &mut Vec<&'a str>, value: &'a str) -> usize {
    match seen.iter().position(|s| *s == value) {
        Some(idx) => idx,
        None => {
            seen.push(value);
            seen.len() - 1
        }
    }
}

/// Pearson chi-square statistic of a contingency table and its degrees of
/// freedom, with the Yates continuity correction when `df == 1`.
pub(crate) fn chi_square_statistic(observed: &[Vec<f64>]) -> (f64, usize) {
    let n_rows = observed.len();
    let n_cols = observed.first().map_or(0, Vec::len);
    let row_totals: Vec<f64> = observed.iter().map(|r| r.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..n_cols)
        .map(|c| observed.iter().map(|r| r[c]).sum())
        .collect();
    let total: f64 = row_totals.iter().sum();

    let df = n_rows.saturating_sub(1) * n_cols.saturating_sub(1);
    let yates = df == 1;

    let mut statistic = 0.0;
    for (r, row) in observed.iter().enumerate() {
        for (c, &o) in row.iter().enumerate() {
            let expected = row_totals[r] * col_totals[c] / total;
            if expected <= 0.0 {
                continue;
            }
            let mut diff = (o - expected).abs();
            if yates {
                diff = (diff - 0.5).max(0.0);
            }
            statistic += diff * diff / expected;
        }
    }
    (statistic, df)
}
