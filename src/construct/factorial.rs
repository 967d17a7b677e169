//! Full factorial designs.

use rand::seq::index;
use rand_pcg::Pcg64;

use super::{randomize_run_order, rng_from_seed};
use crate::analysis::{self, EffectsAnalysis, InteractionCell};
use crate::error::{Error, Result};
use crate::factor::{ensure_unique_names, Factor};
use crate::table::{DesignSummary, DesignTable, Run};
use crate::units::UnitPool;

/// Largest number of runs a full factorial may have.
pub const MAX_FACTORIAL_RUNS: usize = 1 << 24;

/// Full factorial design generator.
///
/// Runs are the Cartesian product of all factor levels in declaration order,
/// with the last factor varying fastest. Each replicate is a complete pass.
///
/// # Example
///
/// ```
/// use expdesign::construct::FullFactorial;
/// use expdesign::Factor;
///
/// let factors = vec![
///     Factor::new("Discount", ["0%", "10%"]).unwrap(),
///     Factor::new("Channel", ["Email", "SMS", "Push"]).unwrap(),
/// ];
/// let design = FullFactorial::new(42).create_design(factors, 2, true).unwrap();
///
/// assert_eq!(design.len(), 2 * 3 * 2);
/// assert_eq!(design.summary().design_type, "Full Factorial Design (2x3)");
/// ```
#[derive(Debug, Clone)]
pub struct FullFactorial {
    seed: u64,
    rng: Pcg64,
}

impl FullFactorial {
    /// Create a generator with its own random stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: rng_from_seed(seed),
        }
    }

    /// Seed of the generator's random stream.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate the full factorial table.
    ///
    /// `std_order` numbers the runs `1..=N` in generation order; when
    /// `randomize` is set, `run_order` is a uniform random permutation and the
    /// rows are stored sorted by it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidFactorConfig`] for an empty factor list, duplicate
    ///   names or zero replications
    /// - [`Error::InvalidRunCount`] if the run count exceeds [`MAX_FACTORIAL_RUNS`]
    pub fn create_design(
        &mut self,
        factors: Vec<Factor>,
        replications: usize,
        randomize: bool,
    ) -> Result<DesignTable> {
        if factors.is_empty() {
            return Err(Error::invalid_factors("at least one factor is required"));
        }
        ensure_unique_names(factors.iter().map(Factor::name))?;
        if replications == 0 {
            return Err(Error::invalid_factors("replications must be at least 1"));
        }

        let per_replicate = factors
            .iter()
            .try_fold(1usize, |acc, f| acc.checked_mul(f.num_levels()))
            .filter(|&n| n <= MAX_FACTORIAL_RUNS);
        let total = per_replicate
            .and_then(|n| n.checked_mul(replications))
            .filter(|&n| n <= MAX_FACTORIAL_RUNS)
            .ok_or_else(|| {
                Error::invalid_run_count(format!(
                    "full factorial exceeds the maximum of {MAX_FACTORIAL_RUNS} runs"
                ))
            })?;
        let per_replicate = total / replications;

        let mut runs = Vec::with_capacity(total);
        for rep in 1..=replications {
            for combo in 0..per_replicate {
                // mixed-radix digits, last factor fastest
                let mut rest = combo;
                let mut levels = vec![factors[0].levels()[0].clone(); factors.len()];
                for (slot, factor) in levels.iter_mut().zip(&factors).rev() {
                    let n = factor.num_levels();
                    *slot = factor.levels()[rest % n].clone();
                    rest /= n;
                }
                runs.push(Run::new(levels, runs.len() + 1).with_replication(rep));
            }
        }

        if randomize {
            randomize_run_order(&mut runs, &mut self.rng);
        }

        let shape: Vec<String> = factors.iter().map(|f| f.num_levels().to_string()).collect();
        let mut summary =
            DesignSummary::new(format!("Full Factorial Design ({})", shape.join("x")), self.seed);
        summary.replications = Some(replications);
        summary.randomized = randomize;

        tracing::info!(
            factors = factors.len(),
            combinations = per_replicate,
            replications,
            runs = total,
            "full factorial created"
        );
        DesignTable::new(factors, runs, summary)
    }

    /// Attach a distinct, randomly sampled unit to every run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the pool has fewer units than the table
    /// has runs.
    pub fn assign_to_units(&mut self, table: &DesignTable, units: &UnitPool) -> Result<DesignTable> {
        if units.len() < table.len() {
            return Err(Error::Allocation {
                requested: table.len(),
                available: units.len(),
            });
        }
        let chosen = index::sample(&mut self.rng, units.len(), table.len());
        let ids = chosen.iter().map(|i| units.ids()[i].clone()).collect();
        if units.len() > table.len() {
            tracing::debug!(
                runs = table.len(),
                units = units.len(),
                "sampled a subset of the unit pool"
            );
        }
        table.with_unit_ids(units.id_column(), ids)
    }

    /// Main effects and interactions; see [`analysis::analyze_effects`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if the response does not exist.
    pub fn analyze_effects(
        &self,
        table: &DesignTable,
        response: &str,
        include_interactions: bool,
        max_interaction_order: usize,
    ) -> Result<EffectsAnalysis> {
        analysis::analyze_effects(table, response, include_interactions, max_interaction_order)
    }

    /// Two-factor cell means; see [`analysis::interaction_means`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if a factor or the response does not exist.
    pub fn interaction_means(
        &self,
        table: &DesignTable,
        response: &str,
        factor_a: &str,
        factor_b: &str,
    ) -> Result<Vec<InteractionCell>> {
        analysis::interaction_means(table, response, factor_a, factor_b)
    }
}
