//! Parallel generation and analysis across many designs.
//!
//! Each design still owns its own seeded random stream, so the results are the
//! same as building the designs one after another. Enable with the `parallel`
//! feature flag.
//!
//! # Usage
//!
//! ```ignore
//! use expdesign::construct::CompletelyRandomized;
//! use expdesign::parallel::par_generate;
//! use expdesign::UnitPool;
//!
//! let pool = UnitPool::with_sequential_ids("unit_id", 100);
//! let designs = par_generate(&[1, 2, 3, 4], |seed| {
//!     CompletelyRandomized::new(seed).create_design(&pool, &["A", "B"], None)
//! })
//! .unwrap();
//! assert_eq!(designs.len(), 4);
//! ```
//!
//! Parallelism pays off for many seeds (randomization studies) or large pools;
//! a single small design is faster built directly.

use rayon::prelude::*;

use crate::analysis::{self, OneWayAnova};
use crate::error::Result;
use crate::table::DesignTable;

/// Build one design per seed in parallel.
///
/// The output keeps the order of `seeds`. The first error encountered is
/// returned.
///
/// # Errors
///
/// Propagates the error of any failing `build` call.
pub fn par_generate<F>(seeds: &[u64], build: F) -> Result<Vec<DesignTable>>
where
    F: Fn(u64) -> Result<DesignTable> + Sync + Send,
{
    tracing::debug!(designs = seeds.len(), "generating designs in parallel");
    seeds.par_iter().map(|&seed| build(seed)).collect()
}

/// One-way ANOVA of `response` by `factor` for every table, in parallel.
///
/// Results are returned per table so one malformed table does not hide the
/// others.
#[must_use]
pub fn par_analyze_one_way(
    tables: &[DesignTable],
    factor: &str,
    response: &str,
) -> Vec<Result<OneWayAnova>> {
    tables
        .par_iter()
        .map(|table| analysis::one_way_anova(table, factor, response))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::{CompletelyRandomized, FractionalFactorial};
    use crate::error::Error;
    use crate::units::UnitPool;

    #[test]
    fn test_par_generate_matches_sequential() {
        let pool = UnitPool::with_sequential_ids("id", 24);
        let seeds: Vec<u64> = (0..16).collect();
        let build =
            |seed: u64| CompletelyRandomized::new(seed).create_design(&pool, &["A", "B", "C"], None);

        let parallel = par_generate(&seeds, build).unwrap();
        let sequential: Vec<DesignTable> = seeds.iter().map(|&s| build(s).unwrap()).collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_par_generate_propagates_errors() {
        let result = par_generate(&[1, 2], |seed| {
            FractionalFactorial::new(seed).create_design(5, 12, None)
        });
        assert!(matches!(result, Err(Error::InvalidRunCount { .. })));
    }

    #[test]
    fn test_par_analyze_one_way() {
        let pool = UnitPool::with_sequential_ids("id", 12);
        let tables: Vec<DesignTable> = (0..4)
            .map(|seed| {
                let table = CompletelyRandomized::new(seed)
                    .create_design(&pool, &["A", "B"], None)
                    .unwrap();
                let y: Vec<f64> = (0..12).map(f64::from).collect();
                table.with_response("y", y).unwrap()
            })
            .collect();

        let results = par_analyze_one_way(&tables, "treatment", "y");
        assert_eq!(results.len(), 4);
        for (table, result) in tables.iter().zip(&results) {
            let expected = analysis::one_way_anova(table, "treatment", "y").unwrap();
            assert_eq!(result.as_ref().unwrap(), &expected);
        }
        assert!(par_analyze_one_way(&tables, "treatment", "missing")
            .iter()
            .all(Result::is_err));
    }
}
