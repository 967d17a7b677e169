//! Randomized (complete) block design.

use rand::seq::{index, SliceRandom};
use rand_pcg::Pcg64;

use super::crd::DEFAULT_TREATMENT_COLUMN;
use super::rng_from_seed;
use crate::analysis::{self, BlockAnova, BlockEffectiveness};
use crate::error::{Error, Result};
use crate::factor::{Factor, Level};
use crate::table::{DesignSummary, DesignTable, Run};
use crate::units::UnitPool;

/// Randomized block design (RBD) generator.
///
/// Units are grouped by a blocking column of the pool; within each block every
/// treatment appears `replications` times, assigned to a random subset of the
/// block's units in random order.
///
/// # Example
///
/// ```
/// use expdesign::construct::RandomizedBlock;
/// use expdesign::UnitPool;
///
/// let sites: Vec<Option<String>> = ["N", "S", "E"]
///     .iter()
///     .flat_map(|s| std::iter::repeat(Some(s.to_string())).take(8))
///     .collect();
/// let pool = UnitPool::with_sequential_ids("unit_id", 24)
///     .with_categorical("site", sites)
///     .unwrap();
///
/// let design = RandomizedBlock::new(42)
///     .create_design(&pool, &["Control", "A", "B", "C"], "site", 2)
///     .unwrap();
///
/// assert_eq!(design.summary().blocks, vec!["N", "S", "E"]);
/// assert_eq!(design.unassigned_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct RandomizedBlock {
    seed: u64,
    rng: Pcg64,
    check_completeness: bool,
    treatment_column: String,
}

impl RandomizedBlock {
    /// Create a generator with its own random stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: rng_from_seed(seed),
            check_completeness: true,
            treatment_column: DEFAULT_TREATMENT_COLUMN.to_string(),
        }
    }

    /// Reject blocks too small for a complete treatment set (default: true).
    ///
    /// When disabled, short blocks receive as many complete sets as fit.
    #[must_use]
    pub fn with_check_completeness(mut self, enabled: bool) -> Self {
        self.check_completeness = enabled;
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

    /// Assign treatments within the blocks defined by `block_column`.
    ///
    /// Blocks are processed in order of first appearance. Units with a missing
    /// block value, and units beyond the `t × replications` needed by their
    /// block, stay [`Level::Unassigned`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidFactorConfig`] for an unknown block column, zero
    ///   replications, or an empty or duplicated treatment list
    /// - [`Error::IncompleteBlock`] if completeness is checked and a block has
    ///   fewer than `t × replications` units
    pub fn create_design<S: AsRef<str>>(
        &mut self,
        units: &UnitPool,
        treatments: &[S],
        block_column: &str,
        replications: usize,
    ) -> Result<DesignTable> {
        let factor = Factor::new(
            self.treatment_column.clone(),
            treatments.iter().map(|t| t.as_ref()),
        )?;
        if replications == 0 {
            return Err(Error::invalid_factors("replications must be at least 1"));
        }
        if self.treatment_column == block_column || self.treatment_column == units.id_column() {
            return Err(Error::invalid_factors(format!(
                "treatment column '{}' clashes with an existing column",
                self.treatment_column
            )));
        }
        let (blocks, missing) = units.groups_by(block_column).map_err(|err| match err {
            Error::UnknownColumn(name) => {
                Error::invalid_factors(format!("block column '{name}' not found in the unit pool"))
            }
            other => other,
        })?;

        let n_treatments = factor.num_levels();
        let required = n_treatments * replications;
        tracing::info!(
            treatments = n_treatments,
            blocks = blocks.len(),
            replications,
            "creating RBD"
        );

        let mut assignment = vec![Level::Unassigned; units.len()];
        let mut block_of: Vec<Option<String>> = vec![None; units.len()];

        for (block, members) in &blocks {
            let available = members.len();
            let sets = if available < required {
                if self.check_completeness {
                    return Err(Error::IncompleteBlock {
                        block: block.clone(),
                        available,
                        required,
                        treatments: n_treatments,
                        replications,
                    });
                }
                let sets = available / n_treatments;
                tracing::warn!(
                    block = %block,
                    available,
                    required,
                    complete_sets = sets,
                    "block has insufficient units; assigning complete treatment sets only"
                );
                sets
            } else {
                replications
            };

            let mut labels: Vec<&Level> = factor
                .levels()
                .iter()
                .cycle()
                .take(sets * n_treatments)
                .collect();
            labels.shuffle(&mut self.rng);
            let chosen = index::sample(&mut self.rng, available, labels.len());

            for &member in members {
                block_of[member] = Some(block.clone());
            }
            for (pick, label) in chosen.iter().zip(labels) {
                assignment[members[pick]] = label.clone();
            }
        }

        let runs: Vec<Run> = assignment
            .iter()
            .zip(block_of)
            .zip(units.ids())
            .enumerate()
            .map(|(i, ((level, block), id))| {
                Run::new(vec![level.clone()], i + 1)
                    .with_unit(id.as_str())
                    .with_block(block)
            })
            .collect();

        let unassigned = assignment.iter().filter(|l| !l.is_assigned()).count();
        if !missing.is_empty() {
            tracing::warn!(
                units = missing.len(),
                block_column,
                "units without a block value are not assigned"
            );
        }

        let mut summary = DesignSummary::new("Randomized Block Design (RBD)", self.seed);
        summary.randomized = true;
        summary.replications = Some(replications);
        summary.blocks = blocks.iter().map(|(b, _)| b.clone()).collect();
        summary.unassigned_units = unassigned;
        summary.sample_sizes = factor
            .levels()
            .iter()
            .map(|level| {
                let n = assignment.iter().filter(|l| *l == level).count();
                (level.to_string(), n)
            })
            .collect();

        for (block, members) in &blocks {
            let assigned = members.iter().filter(|&&m| assignment[m].is_assigned()).count();
            tracing::debug!(block = %block, units = members.len(), assigned, "block allocation");
        }

        Ok(DesignTable::new(vec![factor], runs, summary)?.with_unit_columns(
            Some(units.id_column().to_string()),
            Some(block_column.to_string()),
        ))
    }

    /// Two-way ANOVA of `response` by treatment and block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if the table lacks the treatment column,
    /// the blocks or the response.
    pub fn analyze(&self, table: &DesignTable, response: &str) -> Result<BlockAnova> {
        analysis::block_anova(table, &self.treatment_column, response)
    }

    /// How much of the response variance the blocks explain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if the table lacks blocks or the response.
    pub fn block_effectiveness(
        &self,
        table: &DesignTable,
        response: &str,
    ) -> Result<BlockEffectiveness> {
        analysis::block_effectiveness(table, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BlockingVerdict;

    fn pool_with_blocks(sizes: &[(&str, usize)]) -> UnitPool {
        let blocks: Vec<Option<String>> = sizes
            .iter()
            .flat_map(|(name, n)| std::iter::repeat(Some((*name).to_string())).take(*n))
            .collect();
        UnitPool::with_sequential_ids("id", blocks.len())
            .with_categorical("site", blocks)
            .unwrap()
    }

    fn count(table: &DesignTable, block: &str, treatment: &str) -> usize {
        table
            .runs()
            .iter()
            .filter(|r| r.block() == Some(block) && r.levels()[0].to_string() == treatment)
            .count()
    }

    #[test]
    fn test_each_treatment_replicated_per_block() {
        let pool = pool_with_blocks(&[("N", 10), ("S", 6)]);
        let table = RandomizedBlock::new(3)
            .create_design(&pool, &["A", "B", "C"], "site", 2)
            .unwrap();

        for block in ["N", "S"] {
            for t in ["A", "B", "C"] {
                assert_eq!(count(&table, block, t), 2);
            }
        }
        // N has 4 spare units
        assert_eq!(table.summary().unassigned_units, 4);
        assert_eq!(table.summary().sample_sizes[0], ("A".to_string(), 4));
        assert_eq!(table.header()[..3], ["treatment".to_string(), "id".to_string(), "site".to_string()]);
    }

    #[test]
    fn test_incomplete_block_rejected() {
        let pool = pool_with_blocks(&[("N", 6), ("S", 5)]);
        let err = RandomizedBlock::new(3)
            .create_design(&pool, &["A", "B", "C"], "site", 2)
            .unwrap_err();
        assert_eq!(
            err,
            Error::IncompleteBlock {
                block: "S".into(),
                available: 5,
                required: 6,
                treatments: 3,
                replications: 2
            }
        );
    }

    #[test]
    fn test_short_block_gets_complete_sets() {
        let pool = pool_with_blocks(&[("N", 6), ("S", 5)]);
        let table = RandomizedBlock::new(3)
            .with_check_completeness(false)
            .create_design(&pool, &["A", "B", "C"], "site", 2)
            .unwrap();

        for t in ["A", "B", "C"] {
            assert_eq!(count(&table, "S", t), 1);
            assert_eq!(count(&table, "N", t), 2);
        }
        assert_eq!(table.summary().unassigned_units, 2);
    }

    #[test]
    fn test_invalid_inputs() {
        let pool = pool_with_blocks(&[("N", 6)]);
        let mut rbd = RandomizedBlock::new(1);
        assert!(matches!(
            rbd.create_design(&pool, &["A", "B"], "nope", 1),
            Err(Error::InvalidFactorConfig { .. })
        ));
        assert!(matches!(
            rbd.create_design(&pool, &["A", "B"], "site", 0),
            Err(Error::InvalidFactorConfig { .. })
        ));
    }

    #[test]
    fn test_missing_block_values_unassigned() {
        let mut blocks: Vec<Option<String>> = vec![Some("N".into()); 4];
        blocks.push(None);
        let pool = UnitPool::with_sequential_ids("id", 5)
            .with_categorical("site", blocks)
            .unwrap();
        let table = RandomizedBlock::new(1)
            .create_design(&pool, &["A", "B"], "site", 2)
            .unwrap();
        assert_eq!(table.runs()[4].block(), None);
        assert!(!table.runs()[4].levels()[0].is_assigned());
        assert_eq!(table.summary().unassigned_units, 1);
    }

    #[test]
    fn test_analyze_and_block_effectiveness() {
        let pool = pool_with_blocks(&[("N", 3), ("S", 3), ("E", 3), ("W", 3)]);
        let rbd = RandomizedBlock::new(11);
        let table = rbd.clone().create_design(&pool, &["A", "B", "C"], "site", 1).unwrap();

        let block_offset = |b: &str| match b {
            "N" => 0.0,
            "S" => 10.0,
            "E" => 20.0,
            _ => 30.0,
        };
        let response: Vec<f64> = table
            .runs()
            .iter()
            .enumerate()
            .map(|(i, run)| {
                let t = match run.levels()[0].to_string().as_str() {
                    "A" => 1.0,
                    "B" => 2.0,
                    _ => 4.0,
                };
                t + block_offset(run.block().unwrap_or_default()) + (i % 2) as f64 * 0.2
            })
            .collect();
        let table = table.with_response("y", response).unwrap();

        let anova = rbd.analyze(&table, "y").unwrap();
        let residual = anova.ss_total
            - anova.treatment.sum_of_squares
            - anova.block.sum_of_squares
            - anova.error.sum_of_squares;
        assert!(residual.abs() < 1e-6 * anova.ss_total);
        assert_eq!(anova.treatment.df, 2);
        assert_eq!(anova.block.df, 3);
        assert_eq!(anova.error.df, 6);
        assert!(anova.block.p_value < 0.001);
        assert!(anova.relative_efficiency > 1.0);

        let eff = rbd.block_effectiveness(&table, "y").unwrap();
        assert_eq!(eff.verdict, BlockingVerdict::HighlyEffective);
        assert!(eff.keep_blocking);
    }

    #[test]
    fn test_same_seed_same_design() {
        let pool = pool_with_blocks(&[("N", 9), ("S", 9)]);
        let a = RandomizedBlock::new(5)
            .create_design(&pool, &["A", "B"], "site", 3)
            .unwrap();
        let b = RandomizedBlock::new(5)
            .create_design(&pool, &["A", "B"], "site", 3)
            .unwrap();
        assert_eq!(a, b);
    }
}
