//! Main effects and interactions of factorial designs.

use std::collections::HashMap;

use super::anova::{
    group_stats, is_negligible, one_way, one_way_from_groups, ratio_or_zero, Groups,
};
use super::stats::{mean, sum_of_squares};
use super::types::{
    cohens_f, AnalysisFlag, EffectSize, EffectsAnalysis, InteractionCell, InteractionEffect,
    MainEffect,
};
use crate::error::{Error, Result};
use crate::table::DesignTable;
use crate::utils::combinations;

/// Rows of a table usable for effect analysis: every factor assigned and a
/// finite response.
///
/// Levels are held as positions in their factor's level list, so cells are
/// identified by index and never by label text.
struct Observations {
    /// `positions[factor][row]`
    positions: Vec<Vec<usize>>,
    /// Number of levels of each factor.
    radix: Vec<usize>,
    values: Vec<f64>,
    dropped: usize,
}

impl Observations {
    fn gather(table: &DesignTable, response: &str) -> Result<Self> {
        let response_values = table.response(response)?;
        let factors = table.factors();

        let mut positions = vec![Vec::new(); factors.len()];
        let mut values = Vec::new();
        for (run, &y) in table.runs().iter().zip(response_values) {
            if !y.is_finite() {
                continue;
            }
            let row: Option<Vec<usize>> = factors
                .iter()
                .zip(run.levels())
                .map(|(factor, level)| factor.position_of(level))
                .collect();
            let Some(row) = row else { continue };
            for (column, position) in positions.iter_mut().zip(row) {
                column.push(position);
            }
            values.push(y);
        }
        let dropped = response_values.len() - values.len();
        Ok(Self {
            positions,
            radix: factors.iter().map(|f| f.num_levels()).collect(),
            values,
            dropped,
        })
    }

    /// Mixed-radix cell index of `row` over the given factors.
    fn cell_of(&self, factors: &[usize], row: usize) -> usize {
        factors
            .iter()
            .fold(0, |cell, &f| cell * self.radix[f] + self.positions[f][row])
    }

    /// Cell index of every row.
    fn cells(&self, factors: &[usize]) -> Vec<usize> {
        (0..self.values.len()).map(|row| self.cell_of(factors, row)).collect()
    }

    /// Observations grouped by cell, in first-appearance order.
    fn cell_groups(&self, factors: &[usize]) -> Groups {
        let labels: Vec<String> = self.cells(factors).iter().map(ToString::to_string).collect();
        Groups::collect(
            labels.iter().map(|l| Some(l.as_str())),
            self.values.iter().copied(),
        )
    }

    /// Mean response per cell of the given factors.
    fn cell_means(&self, factors: &[usize]) -> HashMap<usize, f64> {
        let cells = self.cells(factors);
        let mut sums: HashMap<usize, (f64, usize)> = HashMap::new();
        for (cell, &y) in cells.into_iter().zip(&self.values) {
            let entry = sums.entry(cell).or_insert((0.0, 0));
            entry.0 += y;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(cell, (sum, n))| (cell, sum / n as f64))
            .collect()
    }
}

/// Analyze main effects and interactions of a factorial design.
///
/// Main effects are one-way ANOVAs by factor level. Interaction sums of squares
/// measure the deviation of cell means from the additive prediction
/// (`ȳᵢ + ȳⱼ − ȳ` for pairs); the F test is a one-way ANOVA across the cells.
/// Three-way interactions, requested with `max_interaction_order >= 3`, use the
/// hierarchical prediction with all two-factor terms and are marked
/// `approximate`.
///
/// # Errors
///
/// Returns [`Error::UnknownColumn`] if the response does not exist.
///
/// # Example
///
/// ```
/// use expdesign::analysis::analyze_effects;
/// use expdesign::construct::FullFactorial;
/// use expdesign::Factor;
///
/// let table = FullFactorial::new(1)
///     .create_design(vec![Factor::two_level("A"), Factor::two_level("B")], 2, false)
///     .unwrap()
///     .with_response("y", vec![10.0, 12.0, 20.0, 22.0, 11.0, 13.0, 21.0, 23.0])
///     .unwrap();
///
/// let effects = analyze_effects(&table, "y", true, 2).unwrap();
/// assert_eq!(effects.main_effects.len(), 2);
/// assert_eq!(effects.interactions[0].name, "A × B");
/// assert!(effects.main_effects[0].eta_squared > effects.main_effects[1].eta_squared);
/// ```
pub fn analyze_effects(
    table: &DesignTable,
    response: &str,
    include_interactions: bool,
    max_interaction_order: usize,
) -> Result<EffectsAnalysis> {
    let obs = Observations::gather(table, response)?;
    let n = obs.values.len();
    let grand_mean = mean(&obs.values);
    let ss_total = sum_of_squares(&obs.values, grand_mean);

    let mut flags = Vec::new();
    if obs.dropped > 0 {
        flags.push(AnalysisFlag::DroppedRows { count: obs.dropped });
    }
    if n > 0 && is_negligible(ss_total, grand_mean, n) {
        flags.push(AnalysisFlag::ZeroVariance);
    }

    let names = table.factor_names();
    let main_effects: Vec<MainEffect> = table
        .factors()
        .iter()
        .enumerate()
        .map(|(f, factor)| {
            let labels: Vec<String> = obs.positions[f]
                .iter()
                .map(|&p| factor.levels()[p].to_string())
                .collect();
            let anova = one_way(
                factor.name(),
                labels.iter().map(|l| Some(l.as_str())),
                &obs.values,
            );
            let eta_squared = ratio_or_zero(anova.ss_between, ss_total);
            tracing::info!(
                factor = %factor.name(),
                f = anova.f_statistic,
                p = anova.p_value,
                eta_squared,
                "main effect"
            );
            MainEffect {
                factor: factor.name().to_string(),
                level_stats: anova.groups,
                sum_of_squares: anova.ss_between,
                f_statistic: anova.f_statistic,
                p_value: anova.p_value,
                eta_squared,
                cohens_f: cohens_f(eta_squared),
                effect_size: EffectSize::from_eta_squared(eta_squared),
            }
        })
        .collect();

    let mut interactions = Vec::new();
    if include_interactions && names.len() >= 2 {
        let main_means: Vec<HashMap<usize, f64>> =
            (0..names.len()).map(|f| obs.cell_means(&[f])).collect();

        for pair in combinations(names.len(), 2) {
            let (i, j) = (pair[0], pair[1]);
            let ss = deviation_ss(&obs, &pair, |row| {
                main_means[i][&obs.positions[i][row]] + main_means[j][&obs.positions[j][row]]
                    - grand_mean
            });
            interactions.push(interaction(&names, &pair, &obs, ss, ss_total, false));
        }

        if max_interaction_order >= 3 && names.len() >= 3 {
            let pair_means: HashMap<(usize, usize), HashMap<usize, f64>> =
                combinations(names.len(), 2)
                    .into_iter()
                    .map(|p| ((p[0], p[1]), obs.cell_means(&p)))
                    .collect();
            let pair_mean = |a: usize, b: usize, row: usize| {
                pair_means[&(a, b)][&obs.cell_of(&[a, b], row)]
            };

            for triple in combinations(names.len(), 3) {
                let (i, j, k) = (triple[0], triple[1], triple[2]);
                let ss = deviation_ss(&obs, &triple, |row| {
                    pair_mean(i, j, row) + pair_mean(i, k, row) + pair_mean(j, k, row)
                        - main_means[i][&obs.positions[i][row]]
                        - main_means[j][&obs.positions[j][row]]
                        - main_means[k][&obs.positions[k][row]]
                        + grand_mean
                });
                interactions.push(interaction(&names, &triple, &obs, ss, ss_total, true));
            }
        }
    }

    Ok(EffectsAnalysis {
        response: response.to_string(),
        n,
        grand_mean,
        ss_total,
        main_effects,
        interactions,
        flags,
    })
}

/// Σ n_cell (ȳ_cell − prediction)², where `prediction(row)` is evaluated at any
/// row of the cell.
fn deviation_ss(obs: &Observations, factors: &[usize], prediction: impl Fn(usize) -> f64) -> f64 {
    let mut cells: Vec<(usize, usize, f64, usize)> = Vec::new();
    for (row, cell) in obs.cells(factors).into_iter().enumerate() {
        let y = obs.values[row];
        match cells.iter_mut().find(|(c, ..)| *c == cell) {
            Some(entry) => {
                entry.2 += y;
                entry.3 += 1;
            }
            None => cells.push((cell, row, y, 1)),
        }
    }

    cells
        .iter()
        .map(|&(_, row, sum, count)| {
            let cell_mean = sum / count as f64;
            count as f64 * (cell_mean - prediction(row)).powi(2)
        })
        .sum()
}

fn interaction(
    names: &[&str],
    factors: &[usize],
    obs: &Observations,
    ss: f64,
    ss_total: f64,
    approximate: bool,
) -> InteractionEffect {
    let factor_names: Vec<String> = factors.iter().map(|&f| names[f].to_string()).collect();
    let name = factor_names.join(" × ");
    let anova = one_way_from_groups(&name, &obs.cell_groups(factors), 0);
    let eta_squared = ratio_or_zero(ss, ss_total);
    tracing::info!(
        interaction = %name,
        f = anova.f_statistic,
        p = anova.p_value,
        approximate,
        "interaction"
    );
    InteractionEffect {
        name,
        factors: factor_names,
        sum_of_squares: ss,
        f_statistic: anova.f_statistic,
        p_value: anova.p_value,
        eta_squared,
        cohens_f: cohens_f(eta_squared),
        effect_size: EffectSize::from_eta_squared(eta_squared),
        approximate,
    }
}

/// Cell means of two factors for interaction plots.
///
/// Cells are ordered by the declared level order of `factor_a`, then
/// `factor_b`; empty cells are omitted.
///
/// # Errors
///
/// Returns [`Error::UnknownColumn`] if a factor or the response does not exist.
pub fn interaction_means(
    table: &DesignTable,
    response: &str,
    factor_a: &str,
    factor_b: &str,
) -> Result<Vec<InteractionCell>> {
    let a = table.factor_index(factor_a)?;
    let b = table.factor_index(factor_b)?;
    if a == b {
        return Err(Error::invalid_factors(format!(
            "interaction of '{factor_a}' with itself"
        )));
    }
    let values = table.response(response)?;
    let keys_a = table.keys_of(a);
    let keys_b = table.keys_of(b);

    let mut cells = Vec::new();
    for level_a in table.factors()[a].levels() {
        for level_b in table.factors()[b].levels() {
            let (la, lb) = (level_a.to_string(), level_b.to_string());
            let observed: Vec<f64> = values
                .iter()
                .enumerate()
                .filter(|&(row, y)| {
                    y.is_finite()
                        && keys_a[row].as_deref() == Some(la.as_str())
                        && keys_b[row].as_deref() == Some(lb.as_str())
                })
                .map(|(_, &y)| y)
                .collect();
            if observed.is_empty() {
                continue;
            }
            let stats = group_stats(&la, &observed);
            cells.push(InteractionCell {
                level_a: la,
                level_b: lb,
                n: stats.n,
                mean: stats.mean,
                std_error: stats.std_error,
            });
        }
    }
    Ok(cells)
}
