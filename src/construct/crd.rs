//! Completely randomized design.

use rand::seq::SliceRandom;
use rand_pcg::Pcg64;

use super::rng_from_seed;
use crate::analysis::{self, check_balance, OneWayAnova};
use crate::error::{Error, Result};
use crate::factor::{Factor, Level};
use crate::table::{DesignSummary, DesignTable, Run};
use crate::units::UnitPool;

/// Default name of the treatment column.
pub const DEFAULT_TREATMENT_COLUMN: &str = "treatment";

/// Completely randomized design (CRD) generator.
///
/// Every unit of the pool is an independent candidate for any treatment; the
/// allocation is a uniformly random permutation of the treatment labels.
///
/// # Example
///
/// ```
/// use expdesign::construct::CompletelyRandomized;
/// use expdesign::UnitPool;
///
/// let pool = UnitPool::with_sequential_ids("unit_id", 10);
/// let design = CompletelyRandomized::new(42)
///     .create_design(&pool, &["Control", "A", "B"], None)
///     .unwrap();
///
/// // 10 units over 3 treatments: the first treatment gets the extra unit
/// assert_eq!(
///     design.summary().sample_sizes,
///     vec![("Control".to_string(), 4), ("A".to_string(), 3), ("B".to_string(), 3)]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CompletelyRandomized {
    seed: u64,
    rng: Pcg64,
    balance_check: bool,
    treatment_column: String,
}

impl CompletelyRandomized {
    /// Create a generator with its own random stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: rng_from_seed(seed),
            balance_check: true,
            treatment_column: DEFAULT_TREATMENT_COLUMN.to_string(),
        }
    }

    /// Enable or disable the covariate balance check (default: enabled).
    #[must_use]
    pub fn with_balance_check(mut self, enabled: bool) -> Self {
        self.balance_check = enabled;
        self
    }

    /// Name of the treatment column (default: `"treatment"`).
    #[must_use]
    pub fn with_treatment_column(mut self, name: impl Into<String>) -> Self {
        self.treatment_column = name.into();
        self
    }

    /// Seed of the generator's random stream.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Name of the treatment column.
    #[must_use]
    pub fn treatment_column(&self) -> &str {
        &self.treatment_column
    }

    /// Assign treatments to the units of `units`.
    ///
    /// Without `sample_sizes` the units are split evenly, the remainder going
    /// one by one to the first treatments in list order. Units beyond the
    /// requested total stay [`Level::Unassigned`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidFactorConfig`] for an empty or duplicated treatment
    ///   list, or a `sample_sizes` length that differs from the treatment count
    /// - [`Error::Allocation`] if the requested sizes exceed the pool
    pub fn create_design<S: AsRef<str>>(
        &mut self,
        units: &UnitPool,
        treatments: &[S],
        sample_sizes: Option<&[usize]>,
    ) -> Result<DesignTable> {
        let factor = Factor::new(
            self.treatment_column.clone(),
            treatments.iter().map(|t| t.as_ref()),
        )?;
        if self.treatment_column == units.id_column() {
            return Err(Error::invalid_factors(format!(
                "treatment column '{}' clashes with the unit id column",
                self.treatment_column
            )));
        }

        let n_units = units.len();
        let n_treatments = factor.num_levels();
        let sizes: Vec<usize> = match sample_sizes {
            Some(sizes) if sizes.len() != n_treatments => {
                return Err(Error::invalid_factors(format!(
                    "{} sample sizes given for {n_treatments} treatments",
                    sizes.len()
                )));
            }
            Some(sizes) => sizes.to_vec(),
            None => {
                let base = n_units / n_treatments;
                let remainder = n_units % n_treatments;
                (0..n_treatments)
                    .map(|i| base + usize::from(i < remainder))
                    .collect()
            }
        };

        let requested: usize = sizes.iter().sum();
        if requested > n_units {
            return Err(Error::Allocation {
                requested,
                available: n_units,
            });
        }
        let unassigned = n_units - requested;
        if unassigned > 0 {
            tracing::warn!(
                requested,
                available = n_units,
                unassigned,
                "sample sizes do not cover the unit pool; remaining units are not assigned"
            );
        }

        let mut assignment: Vec<Level> = factor
            .levels()
            .iter()
            .zip(&sizes)
            .flat_map(|(level, &size)| std::iter::repeat(level.clone()).take(size))
            .collect();
        assignment.resize(n_units, Level::Unassigned);
        assignment.shuffle(&mut self.rng);

        let runs: Vec<Run> = assignment
            .iter()
            .zip(units.ids())
            .enumerate()
            .map(|(i, (level, id))| Run::new(vec![level.clone()], i + 1).with_unit(id.as_str()))
            .collect();

        let mut summary = DesignSummary::new("Completely Randomized Design (CRD)", self.seed);
        summary.randomized = true;
        summary.unassigned_units = unassigned;
        summary.sample_sizes = factor
            .levels()
            .iter()
            .map(ToString::to_string)
            .zip(sizes.iter().copied())
            .collect();

        tracing::info!(
            treatments = n_treatments,
            units = n_units,
            "CRD created"
        );
        for (treatment, size) in &summary.sample_sizes {
            tracing::debug!(
                treatment = %treatment,
                n = size,
                share = *size as f64 / n_units.max(1) as f64,
                "treatment allocation"
            );
        }

        if self.balance_check {
            let labels: Vec<Option<String>> = assignment.iter().map(Level::key).collect();
            summary.balance = Some(check_balance(units, &labels));
        }

        Ok(DesignTable::new(vec![factor], runs, summary)?
            .with_unit_columns(Some(units.id_column().to_string()), None))
    }

    /// One-way ANOVA of `response` across the treatment groups.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if the table has no treatment column of
    /// this generator's name or no such response.
    pub fn analyze(&self, table: &DesignTable, response: &str) -> Result<OneWayAnova> {
        analysis::one_way_anova(table, &self.treatment_column, response)
    }
}
