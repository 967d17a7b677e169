//! ANOVA (Analysis of Variance) for designed experiments.
//!
//! Calculates sums of squares, F statistics, p-values and eta-squared for the
//! one-way (treatment) and two-way (treatment + block) layouts. Observations are
//! passed as grouping keys aligned with response values; rows with a missing key
//! or a non-finite response are dropped and counted.

use super::stats::{f_distribution_p_value, mean, sample_variance, sum_of_squares};
use super::types::{
    cohens_f, AnalysisFlag, AnovaRow, BlockAnova, BlockEffectiveness, BlockingVerdict,
    EffectSize, GroupStats, OneWayAnova,
};

/// Observations split by group, in first-appearance order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Groups {
    pub(crate) labels: Vec<String>,
    pub(crate) values: Vec<Vec<f64>>,
}

impl Groups {
    pub(crate) fn collect<'a>(
        keys: impl IntoIterator<Item = Option<&'a str>>,
        values: impl IntoIterator<Item = f64>,
    ) -> Self {
        let mut groups = Self::default();
        for (key, value) in keys.into_iter().zip(values) {
            let Some(key) = key else { continue };
            if !value.is_finite() {
                continue;
            }
            match groups.labels.iter().position(|l| l == key) {
                Some(idx) => groups.values[idx].push(value),
                None => {
                    groups.labels.push(key.to_string());
                    groups.values.push(vec![value]);
                }
            }
        }
        groups
    }

    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn total(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    pub(crate) fn all_values(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    pub(crate) fn means(&self) -> Vec<f64> {
        self.values.iter().map(|v| mean(v)).collect()
    }

    /// Σ nᵍ (ȳᵍ - ȳ)²
    pub(crate) fn ss_between(&self, grand_mean: f64) -> f64 {
        self.values
            .iter()
            .map(|v| v.len() as f64 * (mean(v) - grand_mean).powi(2))
            .sum()
    }

    /// Σᵍ Σᵢ (yᵢ - ȳᵍ)²
    pub(crate) fn ss_within(&self) -> f64 {
        self.values.iter().map(|v| sum_of_squares(v, mean(v))).sum()
    }

    pub(crate) fn stats(&self) -> Vec<GroupStats> {
        self.labels
            .iter()
            .zip(&self.values)
            .map(|(label, values)| group_stats(label, values))
            .collect()
    }
}

pub(crate) fn group_stats(label: &str, values: &[f64]) -> GroupStats {
    let n = values.len();
    let std_dev = sample_variance(values).sqrt();
    GroupStats {
        label: label.to_string(),
        n,
        mean: mean(values),
        std_dev,
        std_error: if n > 0 { std_dev / (n as f64).sqrt() } else { f64::NAN },
    }
}

/// Whether a sum of squares is zero up to rounding, relative to the data scale.
pub(crate) fn is_negligible(ss: f64, grand_mean: f64, n: usize) -> bool {
    ss <= 1e-12 * (1.0 + grand_mean.abs()).powi(2) * n.max(1) as f64
}

pub(crate) fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn mean_square(ss: f64, df: usize) -> f64 {
    if df > 0 {
        ss / df as f64
    } else {
        f64::NAN
    }
}

/// F and p for a between/within split, with degeneracy flags.
pub(crate) fn f_test(
    ms_effect: f64,
    ms_error: f64,
    df_effect: usize,
    df_error: usize,
    degenerate: Option<AnalysisFlag>,
    flags: &mut Vec<AnalysisFlag>,
) -> (f64, f64) {
    let flag = if let Some(flag) = degenerate {
        Some(flag)
    } else if df_effect == 0 {
        Some(AnalysisFlag::SingleGroup)
    } else if df_error == 0 {
        Some(AnalysisFlag::NoErrorDegreesOfFreedom)
    } else {
        None
    };
    if let Some(flag) = flag {
        if !flags.contains(&flag) {
            flags.push(flag);
        }
        return (f64::NAN, 1.0);
    }

    let f = if ms_error > 0.0 {
        ms_effect / ms_error
    } else {
        f64::INFINITY
    };
    (f, f_distribution_p_value(f, df_effect, df_error))
}

/// One-way ANOVA of `values` grouped by `keys`.
pub(crate) fn one_way<'a>(
    factor: &str,
    keys: impl IntoIterator<Item = Option<&'a str>>,
    values: &[f64],
) -> OneWayAnova {
    let groups = Groups::collect(keys, values.iter().copied());
    let dropped = values.len() - groups.total();
    one_way_from_groups(factor, &groups, dropped)
}

pub(crate) fn one_way_from_groups(factor: &str, groups: &Groups, dropped: usize) -> OneWayAnova {
    let all = groups.all_values();
    let n = all.len();
    let k = groups.len();
    let grand_mean = mean(&all);

    let ss_total = sum_of_squares(&all, grand_mean);
    let ss_between = groups.ss_between(grand_mean);
    let ss_within = groups.ss_within();

    let df_between = k.saturating_sub(1);
    let df_within = n.saturating_sub(k);
    let ms_between = mean_square(ss_between, df_between);
    let ms_within = mean_square(ss_within, df_within);

    let mut flags = Vec::new();
    if dropped > 0 {
        flags.push(AnalysisFlag::DroppedRows { count: dropped });
    }
    let degenerate = if k < 2 {
        Some(AnalysisFlag::SingleGroup)
    } else if df_within > 0 && is_negligible(ss_total, grand_mean, n) {
        Some(AnalysisFlag::ZeroVariance)
    } else {
        None
    };
    let ms_error = if is_negligible(ss_within, grand_mean, n) {
        0.0
    } else {
        ms_within
    };
    let (f_statistic, p_value) =
        f_test(ms_between, ms_error, df_between, df_within, degenerate, &mut flags);

    let eta_squared = ratio_or_zero(ss_between, ss_total);
    OneWayAnova {
        factor: factor.to_string(),
        n,
        grand_mean,
        groups: groups.stats(),
        ss_between,
        ss_within,
        ss_total,
        df_between,
        df_within,
        ms_between,
        ms_within,
        f_statistic,
        p_value,
        eta_squared,
        cohens_f: cohens_f(eta_squared),
        effect_size: EffectSize::from_eta_squared(eta_squared),
        flags,
    }
}

/// Two-way ANOVA with treatment and block as additive factors.
///
/// `SS_error = SS_total − SS_treatment − SS_block` with `(k−1)(b−1)` degrees of
/// freedom. The residual is not clamped; a negative value is flagged.
pub(crate) fn block_anova<'a>(
    treatments: impl IntoIterator<Item = Option<&'a str>>,
    blocks: impl IntoIterator<Item = Option<&'a str>>,
    values: &[f64],
) -> BlockAnova {
    let rows: Vec<(&str, &str, f64)> = treatments
        .into_iter()
        .zip(blocks)
        .zip(values.iter().copied())
        .filter_map(|((t, b), y)| Some((t?, b?, y)).filter(|_| y.is_finite()))
        .collect();
    let dropped = values.len() - rows.len();

    let by_treatment = Groups::collect(rows.iter().map(|r| Some(r.0)), rows.iter().map(|r| r.2));
    let by_block = Groups::collect(rows.iter().map(|r| Some(r.1)), rows.iter().map(|r| r.2));

    let all = by_treatment.all_values();
    let n = all.len();
    let grand_mean = mean(&all);
    let ss_total = sum_of_squares(&all, grand_mean);
    let ss_treatment = by_treatment.ss_between(grand_mean);
    let ss_block = by_block.ss_between(grand_mean);
    let ss_error = ss_total - ss_treatment - ss_block;

    let k = by_treatment.len();
    let b = by_block.len();
    let df_treatment = k.saturating_sub(1);
    let df_block = b.saturating_sub(1);
    let df_error = df_treatment * df_block;

    let ms_treatment = mean_square(ss_treatment, df_treatment);
    let ms_block = mean_square(ss_block, df_block);
    let ms_error = mean_square(ss_error, df_error);

    let mut flags = Vec::new();
    if dropped > 0 {
        flags.push(AnalysisFlag::DroppedRows { count: dropped });
    }
    let tolerance_hit = is_negligible(ss_error.abs(), grand_mean, n);
    if ss_error < 0.0 && !tolerance_hit {
        flags.push(AnalysisFlag::NegativeResidual);
    }
    let degenerate = if is_negligible(ss_total, grand_mean, n) && n > 0 {
        Some(AnalysisFlag::ZeroVariance)
    } else if df_error > 0 && (ss_error < 0.0 && !tolerance_hit) {
        Some(AnalysisFlag::NegativeResidual)
    } else {
        None
    };
    let ms_error_for_test = if tolerance_hit { 0.0 } else { ms_error };

    let (f_treatment, p_treatment) = f_test(
        ms_treatment,
        ms_error_for_test,
        df_treatment,
        df_error,
        degenerate.clone(),
        &mut flags,
    );
    let (f_block, p_block) = f_test(
        ms_block,
        ms_error_for_test,
        df_block,
        df_error,
        degenerate,
        &mut flags,
    );

    let relative_efficiency = if ms_error.is_finite() && ms_error > 0.0 && b > 0 {
        (ms_block + (b as f64 - 1.0) * ms_error) / (b as f64 * ms_error)
    } else {
        1.0
    };

    BlockAnova {
        n,
        grand_mean,
        treatment: AnovaRow {
            source: "Treatment".to_string(),
            sum_of_squares: ss_treatment,
            df: df_treatment,
            mean_square: ms_treatment,
            f_statistic: f_treatment,
            p_value: p_treatment,
            eta_squared: ratio_or_zero(ss_treatment, ss_total),
        },
        block: AnovaRow {
            source: "Block".to_string(),
            sum_of_squares: ss_block,
            df: df_block,
            mean_square: ms_block,
            f_statistic: f_block,
            p_value: p_block,
            eta_squared: ratio_or_zero(ss_block, ss_total),
        },
        error: AnovaRow {
            source: "Error".to_string(),
            sum_of_squares: ss_error,
            df: df_error,
            mean_square: ms_error,
            f_statistic: f64::NAN,
            p_value: 1.0,
            eta_squared: ratio_or_zero(ss_error, ss_total),
        },
        ss_total,
        df_total: n.saturating_sub(1),
        relative_efficiency,
        treatment_stats: by_treatment.stats(),
        block_stats: by_block.stats(),
        flags,
    }
}

/// Variance decomposition of `values` by block.
pub(crate) fn block_effectiveness<'a>(
    blocks: impl IntoIterator<Item = Option<&'a str>>,
    values: &[f64],
) -> BlockEffectiveness {
    let groups = Groups::collect(blocks, values.iter().copied());
    let all = groups.all_values();
    let grand_mean = mean(&all);

    let block_means = groups.means();
    let between_block_variance = if block_means.is_empty() {
        0.0
    } else {
        sum_of_squares(&block_means, grand_mean) / block_means.len() as f64
    };

    let within: Vec<f64> = groups
        .values
        .iter()
        .filter(|v| v.len() > 1)
        .map(|v| sample_variance(v))
        .collect();
    let within_block_variance = if within.is_empty() { 0.0 } else { mean(&within) };

    let icc = ratio_or_zero(
        between_block_variance,
        between_block_variance + within_block_variance,
    );

    BlockEffectiveness {
        total_variance: sample_variance(&all),
        between_block_variance,
        within_block_variance,
        icc,
        verdict: BlockingVerdict::from_icc(icc),
        keep_blocking: icc > 0.05,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<'a>(labels: &'a [&'a str]) -> impl Iterator<Item = Option<&'a str>> + 'a {
        labels.iter().map(|s| Some(*s))
    }

    #[test]
    fn test_one_way_textbook() {
        // groups A: 1,2,3  B: 4,5,6  C: 7,8,9
        let labels = ["A", "A", "A", "B", "B", "B", "C", "C", "C"];
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let result = one_way("g", keys(&labels), &values);

        assert_eq!(result.n, 9);
        assert!((result.grand_mean - 5.0).abs() < 1e-12);
        assert!((result.ss_between - 54.0).abs() < 1e-9);
        assert!((result.ss_within - 6.0).abs() < 1e-9);
        assert!((result.ss_total - 60.0).abs() < 1e-9);
        assert_eq!((result.df_between, result.df_within), (2, 6));
        assert!((result.f_statistic - 27.0).abs() < 1e-9);
        assert!(result.p_value < 0.001);
        assert!((result.eta_squared - 0.9).abs() < 1e-12);
        assert!((result.cohens_f - 3.0).abs() < 1e-9);
        assert_eq!(result.effect_size, EffectSize::Large);
        assert!(result.significant());
        assert_eq!(result.groups[1].label, "B");
        assert!((result.groups[1].std_dev - 1.0).abs() < 1e-12);
        assert!(result.flags.is_empty());
    }

    #[test]
    fn test_one_way_drops_missing() {
        let labels = [Some("A"), None, Some("B"), Some("A"), Some("B")];
        let values = [1.0, 100.0, 3.0, f64::NAN, 5.0];
        let result = one_way("g", labels, &values);
        assert_eq!(result.n, 3);
        assert!(result.flags.contains(&AnalysisFlag::DroppedRows { count: 2 }));
    }

    #[test]
    fn test_one_way_degenerate() {
        let single = one_way("g", keys(&["A", "A", "A"]), &[1.0, 2.0, 3.0]);
        assert!(single.f_statistic.is_nan());
        assert_eq!(single.p_value, 1.0);
        assert!(single.flags.contains(&AnalysisFlag::SingleGroup));

        let flat = one_way("g", keys(&["A", "A", "B", "B"]), &[5.0; 4]);
        assert!(flat.f_statistic.is_nan());
        assert_eq!(flat.p_value, 1.0);
        assert!(flat.flags.contains(&AnalysisFlag::ZeroVariance));
        assert_eq!(flat.eta_squared, 0.0);

        let saturated = one_way("g", keys(&["A", "B"]), &[1.0, 2.0]);
        assert!(saturated.flags.contains(&AnalysisFlag::NoErrorDegreesOfFreedom));
        assert_eq!(saturated.p_value, 1.0);
    }

    #[test]
    fn test_one_way_perfect_separation() {
        let result = one_way("g", keys(&["A", "A", "B", "B"]), &[1.0, 1.0, 2.0, 2.0]);
        assert!(result.f_statistic.is_infinite());
        assert_eq!(result.p_value, 0.0);
    }

    #[test]
    fn test_block_anova_decomposition() {
        // 3 treatments x 4 blocks, one observation per cell
        let treatments = ["T1", "T2", "T3"];
        let blocks = ["B1", "B2", "B3", "B4"];
        let data = [
            [10.0, 12.0, 11.0, 14.0],
            [13.0, 15.0, 13.0, 17.0],
            [9.0, 10.0, 12.0, 12.0],
        ];
        let mut t_keys = Vec::new();
        let mut b_keys = Vec::new();
        let mut values = Vec::new();
        for (ti, t) in treatments.iter().enumerate() {
            for (bi, b) in blocks.iter().enumerate() {
                t_keys.push(Some(*t));
                b_keys.push(Some(*b));
                values.push(data[ti][bi]);
            }
        }

        let result = block_anova(t_keys, b_keys, &values);
        let sum = result.treatment.sum_of_squares
            + result.block.sum_of_squares
            + result.error.sum_of_squares;
        assert!((result.ss_total - sum).abs() < 1e-9 * result.ss_total);
        assert_eq!(result.treatment.df, 2);
        assert_eq!(result.block.df, 3);
        assert_eq!(result.error.df, 6);
        assert_eq!(result.df_total, 11);
        assert!(result.treatment.f_statistic > 0.0);
        assert!(result.treatment.p_value < 0.05);
        assert!(result.relative_efficiency > 1.0);
        assert_eq!(result.treatment_stats.len(), 3);
        assert_eq!(result.block_stats.len(), 4);

        assert!((result.treatment.sum_of_squares - 30.166_666_666_666_668).abs() < 1e-9);
        assert!((result.block.sum_of_squares - 20.666_666_666_666_68).abs() < 1e-9);
        assert!((result.treatment.f_statistic - 15.514_285_714_285_7).abs() < 1e-6);
        assert!((result.relative_efficiency - 2.521_428_571_428_57).abs() < 1e-6);
    }

    #[test]
    fn test_block_anova_single_block() {
        let result = block_anova(
            keys(&["A", "B", "A", "B"]),
            keys(&["X", "X", "X", "X"]),
            &[1.0, 2.0, 1.5, 2.5],
        );
        assert_eq!(result.error.df, 0);
        assert!(result.treatment.f_statistic.is_nan());
        assert_eq!(result.treatment.p_value, 1.0);
        assert_eq!(result.relative_efficiency, 1.0);
    }

    #[test]
    fn test_block_effectiveness() {
        let blocks = ["N", "N", "N", "S", "S", "S"];
        let values = [10.0, 11.0, 12.0, 20.0, 21.0, 22.0];
        let result = block_effectiveness(keys(&blocks), &values);

        // block means 11 and 21, grand 16 -> between = 25; within = 1
        assert!((result.between_block_variance - 25.0).abs() < 1e-12);
        assert!((result.within_block_variance - 1.0).abs() < 1e-12);
        assert!((result.icc - 25.0 / 26.0).abs() < 1e-12);
        assert_eq!(result.verdict, BlockingVerdict::HighlyEffective);
        assert!(result.keep_blocking);
    }
}
