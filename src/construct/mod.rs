//! Design generators.
//!
//! Each generator owns its own seeded random stream, so two instances built
//! with the same seed and parameters produce identical tables.
//!
//! ## Available Generators
//!
//! | Generator | Design | Runs |
//! |-----------|--------|------|
//! | [`StandardOrder`] | 2^k Yates matrix | 2^k |
//! | [`CompletelyRandomized`] | CRD over a unit pool | pool size |
//! | [`RandomizedBlock`] | RBD over a unit pool | t · r per block |
//! | [`FullFactorial`] | Cartesian product of factor levels | r · Πnᵢ |
//! | [`FractionalFactorial`] | 2^(k-p) with generators | 2^(k-p) |
//! | [`CentralComposite`] | CCD (face-centered, rotatable, orthogonal) | 2^k + 2k + c |
//! | [`BoxBehnken`] | Box-Behnken | 4·C(k,2) + c |
//!
//! ## Usage
//!
//! ```
//! use expdesign::construct::{CentralComposite, CcdType};
//!
//! let ccd = CentralComposite::new(42)
//!     .create_design(2, CcdType::FaceCentered, 3, None)
//!     .expect("construction failed");
//!
//! assert_eq!(ccd.len(), 4 + 4 + 3);
//! assert_eq!(ccd.summary().alpha, Some(1.0));
//! ```

mod alias;
mod crd;
mod factorial;
mod fractional;
mod rbd;
mod response_surface;
mod standard_order;

pub use alias::{AliasEntry, AliasResolver, AliasStructure, MAX_FRACTIONAL_FACTORS, MAX_GENERATORS};
pub use crd::{CompletelyRandomized, DEFAULT_TREATMENT_COLUMN};
pub use factorial::{FullFactorial, MAX_FACTORIAL_RUNS};
pub use fractional::FractionalFactorial;
pub use rbd::RandomizedBlock;
pub use response_surface::{
    compare_rsm_designs, decode, BoxBehnken, CcdType, CentralComposite, RsmComparison,
    RsmDesignStats,
};
pub use standard_order::{StandardOrder, MAX_STANDARD_ORDER_FACTORS};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::table::Run;

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// Create the random stream owned by a generator.
pub(crate) fn rng_from_seed(seed: u64) -> Pcg64 {
    Pcg64::seed_from_u64(seed)
}

/// Assign a uniformly random run order and store the runs sorted by it.
///
/// `std_order` is left untouched.
pub(crate) fn randomize_run_order(runs: &mut Vec<Run>, rng: &mut Pcg64) {
    let mut order: Vec<usize> = (1..=runs.len()).collect();
    order.shuffle(rng);
    for (run, position) in runs.iter_mut().zip(order) {
        run.run_order = position;
    }
    runs.sort_by_key(|run| run.run_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::Level;

    #[test]
    fn test_randomize_run_order_is_permutation() {
        let mut runs: Vec<Run> = (1..=20).map(|i| Run::new(vec![Level::Numeric(i as f64)], i)).collect();
        let mut rng = rng_from_seed(3);
        randomize_run_order(&mut runs, &mut rng);

        let orders: Vec<usize> = runs.iter().map(Run::run_order).collect();
        assert_eq!(orders, (1..=20).collect::<Vec<_>>());

        let mut std: Vec<usize> = runs.iter().map(Run::std_order).collect();
        assert_ne!(std, (1..=20).collect::<Vec<_>>());
        std.sort_unstable();
        assert_eq!(std, (1..=20).collect::<Vec<_>>());
    }
}
