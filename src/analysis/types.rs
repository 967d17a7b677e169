//! Analysis result types.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Significance level used for the `significant` shorthand on results.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Conventional interpretation of an eta-squared effect size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EffectSize {
    /// η² < 0.01
    Negligible,
    /// 0.01 ≤ η² < 0.06
    Small,
    /// 0.06 ≤ η² < 0.14
    Medium,
    /// η² ≥ 0.14
    Large,
}

impl EffectSize {
    /// Classify an eta-squared value. `NaN` is treated as negligible.
    #[must_use]
    pub fn from_eta_squared(eta_squared: f64) -> Self {
        match eta_squared {
            e if e.is_nan() || e < 0.01 => Self::Negligible,
            e if e < 0.06 => Self::Small,
            e if e < 0.14 => Self::Medium,
            _ => Self::Large,
        }
    }
}

/// Cohen's f from eta-squared: `sqrt(η² / (1 − η²))`.
///
/// Infinite when η² = 1, `NaN` when η² is `NaN`.
#[must_use]
pub fn cohens_f(eta_squared: f64) -> f64 {
    if eta_squared.is_nan() {
        f64::NAN
    } else if eta_squared >= 1.0 {
        f64::INFINITY
    } else {
        (eta_squared.max(0.0) / (1.0 - eta_squared)).sqrt()
    }
}

impl fmt::Display for EffectSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negligible => "negligible",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        })
    }
}

/// Why a statistic could not be computed normally.
///
/// Degenerate inputs never fail the analysis; the affected statistics are set
/// to `f = NaN`, `p = 1.0` and the reason is recorded here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnalysisFlag {
    /// Fewer than two groups had observations.
    SingleGroup,
    /// The response has no variation.
    ZeroVariance,
    /// No residual degrees of freedom remain.
    NoErrorDegreesOfFreedom,
    /// Rows dropped because of a missing response or unassigned level.
    DroppedRows {
        /// Number of rows dropped.
        count: usize,
    },
    /// The residual sum of squares came out negative (unbalanced blocks).
    NegativeResidual,
}

/// Descriptive statistics of one group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupStats {
    /// Group label (treatment, block or factor level).
    pub label: String,
    /// Number of observations.
    pub n: usize,
    /// Group mean.
    pub mean: f64,
    /// Sample standard deviation (`n - 1` denominator).
    pub std_dev: f64,
    /// Standard error of the mean.
    pub std_error: f64,
}

/// One-way ANOVA result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OneWayAnova {
    /// Grouping column.
    pub factor: String,
    /// Number of observations used.
    pub n: usize,
    /// Mean of all observations used.
    pub grand_mean: f64,
    /// Per-group statistics, in first-appearance order.
    pub groups: Vec<GroupStats>,
    /// Between-group sum of squares.
    pub ss_between: f64,
    /// Within-group sum of squares.
    pub ss_within: f64,
    /// Total sum of squares.
    pub ss_total: f64,
    /// Between-group degrees of freedom.
    pub df_between: usize,
    /// Within-group degrees of freedom.
    pub df_within: usize,
    /// Between-group mean square.
    pub ms_between: f64,
    /// Within-group mean square.
    pub ms_within: f64,
    /// F statistic.
    pub f_statistic: f64,
    /// P-value.
    pub p_value: f64,
    /// SS_between / SS_total.
    pub eta_squared: f64,
    /// Cohen's f, the effect size used for response-surface work.
    pub cohens_f: f64,
    /// Interpretation of `eta_squared`.
    pub effect_size: EffectSize,
    /// Degeneracy flags.
    pub flags: Vec<AnalysisFlag>,
}

impl OneWayAnova {
    /// Whether `p < 0.05`.
    #[must_use]
    pub fn significant(&self) -> bool {
        self.p_value < SIGNIFICANCE_LEVEL
    }
}

/// One source row of an ANOVA table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnovaRow {
    /// Source of variation.
    pub source: String,
    /// Sum of squares.
    pub sum_of_squares: f64,
    /// Degrees of freedom.
    pub df: usize,
    /// Mean square (SS / df).
    pub mean_square: f64,
    /// F statistic, `NaN` for the error row or when untestable.
    pub f_statistic: f64,
    /// P-value, `1.0` when untestable.
    pub p_value: f64,
    /// SS / SS_total.
    pub eta_squared: f64,
}

/// Two-way (treatment + block) ANOVA of a randomized block design.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockAnova {
    /// Number of observations used.
    pub n: usize,
    /// Mean of all observations used.
    pub grand_mean: f64,
    /// Treatment row.
    pub treatment: AnovaRow,
    /// Block row.
    pub block: AnovaRow,
    /// Residual row.
    pub error: AnovaRow,
    /// Total sum of squares.
    pub ss_total: f64,
    /// Total degrees of freedom.
    pub df_total: usize,
    /// Efficiency of blocking relative to a completely randomized design.
    pub relative_efficiency: f64,
    /// Per-treatment statistics.
    pub treatment_stats: Vec<GroupStats>,
    /// Per-block statistics.
    pub block_stats: Vec<GroupStats>,
    /// Degeneracy flags.
    pub flags: Vec<AnalysisFlag>,
}

/// How much the blocking variable explains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BlockingVerdict {
    /// ICC > 0.25
    HighlyEffective,
    /// ICC > 0.10
    ModeratelyEffective,
    /// ICC > 0.05
    MarginallyEffective,
    /// ICC ≤ 0.05
    NotEffective,
}

impl BlockingVerdict {
    /// Classify an intraclass correlation.
    #[must_use]
    pub fn from_icc(icc: f64) -> Self {
        match icc {
            i if i > 0.25 => Self::HighlyEffective,
            i if i > 0.10 => Self::ModeratelyEffective,
            i if i > 0.05 => Self::MarginallyEffective,
            _ => Self::NotEffective,
        }
    }
}

/// Variance decomposition by block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockEffectiveness {
    /// Sample variance of all observations.
    pub total_variance: f64,
    /// Mean squared deviation of block means from the grand mean.
    pub between_block_variance: f64,
    /// Mean of the within-block sample variances.
    pub within_block_variance: f64,
    /// Intraclass correlation: between / (between + within).
    pub icc: f64,
    /// Interpretation of `icc`.
    pub verdict: BlockingVerdict,
    /// Whether blocking is worth keeping (`icc > 0.05`).
    pub keep_blocking: bool,
}

/// Main effect of one factor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MainEffect {
    /// Factor name.
    pub factor: String,
    /// Mean response at each level.
    pub level_stats: Vec<GroupStats>,
    /// Sum of squares between levels.
    pub sum_of_squares: f64,
    /// F statistic of the one-way ANOVA by level.
    pub f_statistic: f64,
    /// P-value.
    pub p_value: f64,
    /// SS_factor / SS_total.
    pub eta_squared: f64,
    /// Cohen's f of `eta_squared`.
    pub cohens_f: f64,
    /// Interpretation of `eta_squared`.
    pub effect_size: EffectSize,
}

/// Interaction among two or three factors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InteractionEffect {
    /// Display name, e.g. `"A × B"`.
    pub name: String,
    /// Interacting factors.
    pub factors: Vec<String>,
    /// Deviation of cell means from the additive prediction.
    pub sum_of_squares: f64,
    /// F statistic of the one-way ANOVA across cells.
    pub f_statistic: f64,
    /// P-value.
    pub p_value: f64,
    /// SS_interaction / SS_total.
    pub eta_squared: f64,
    /// Cohen's f of `eta_squared`.
    pub cohens_f: f64,
    /// Interpretation of `eta_squared`.
    pub effect_size: EffectSize,
    /// Whether the sum of squares uses the hierarchical approximation.
    pub approximate: bool,
}

/// Main effects and interactions of a factorial design.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EffectsAnalysis {
    /// Response column analyzed.
    pub response: String,
    /// Number of observations used.
    pub n: usize,
    /// Mean of all observations used.
    pub grand_mean: f64,
    /// Total sum of squares.
    pub ss_total: f64,
    /// One entry per factor.
    pub main_effects: Vec<MainEffect>,
    /// Two-way (and optionally three-way) interactions.
    pub interactions: Vec<InteractionEffect>,
    /// Degeneracy flags.
    pub flags: Vec<AnalysisFlag>,
}

/// Mean response in one cell of a two-factor layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InteractionCell {
    /// Level of the first factor.
    pub level_a: String,
    /// Level of the second factor.
    pub level_b: String,
    /// Number of observations.
    pub n: usize,
    /// Cell mean.
    pub mean: f64,
    /// Standard error of the cell mean.
    pub std_error: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_size_thresholds() {
        assert_eq!(EffectSize::from_eta_squared(0.0), EffectSize::Negligible);
        assert_eq!(EffectSize::from_eta_squared(0.01), EffectSize::Small);
        assert_eq!(EffectSize::from_eta_squared(0.06), EffectSize::Medium);
        assert_eq!(EffectSize::from_eta_squared(0.14), EffectSize::Large);
        assert_eq!(EffectSize::from_eta_squared(f64::NAN), EffectSize::Negligible);
        assert_eq!(EffectSize::Medium.to_string(), "medium");
    }

    #[test]
    fn test_cohens_f() {
        assert!((cohens_f(0.2) - 0.5).abs() < 1e-12);
        assert_eq!(cohens_f(0.0), 0.0);
        assert_eq!(cohens_f(1.0), f64::INFINITY);
        assert!(cohens_f(f64::NAN).is_nan());
    }

    #[test]
    fn test_blocking_verdict() {
        assert_eq!(BlockingVerdict::from_icc(0.3), BlockingVerdict::HighlyEffective);
        assert_eq!(BlockingVerdict::from_icc(0.25), BlockingVerdict::ModeratelyEffective);
        assert_eq!(BlockingVerdict::from_icc(0.06), BlockingVerdict::MarginallyEffective);
        assert_eq!(BlockingVerdict::from_icc(0.05), BlockingVerdict::NotEffective);
        assert_eq!(BlockingVerdict::from_icc(f64::NAN), BlockingVerdict::NotEffective);
    }
}
