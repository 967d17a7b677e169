//! # expdesign
//!
//! Classical experimental design generation and analysis.
//!
//! ## Overview
//!
//! This library builds the design matrices of classical designed experiments and
//! analyzes their responses:
//! - **Unit allocation**: Completely Randomized (CRD) and Randomized Block (RBD)
//!   designs over a pool of experimental units
//! - **Factorial designs**: full factorials over labelled or numeric factors and
//!   two-level 2^(k-p) fractions with generator-driven aliasing
//! - **Response surfaces**: Central Composite (face-centered, rotatable,
//!   orthogonal) and Box-Behnken designs in coded units
//! - **Analysis**: one-way, two-way (block) and factorial ANOVA decompositions
//!
//! ## Quick Start
//!
//! ```rust
//! use expdesign::construct::FractionalFactorial;
//!
//! // 5 factors in 8 runs with the default generators D=AB, E=AC
//! let design = FractionalFactorial::new(42).create_design(5, 8, None).unwrap();
//!
//! assert_eq!(design.len(), 8);
//! assert_eq!(design.summary().resolution, Some(3));
//! ```
//!
//! Unit-based designs draw from a [`UnitPool`]:
//!
//! ```rust
//! use expdesign::construct::RandomizedBlock;
//! use expdesign::UnitPool;
//!
//! let pool = UnitPool::with_sequential_ids("plot", 12)
//!     .with_categorical(
//!         "field",
//!         (0..12).map(|i| Some(if i < 6 { "north" } else { "south" }.to_string())).collect(),
//!     )
//!     .unwrap();
//!
//! let design = RandomizedBlock::new(42)
//!     .create_design(&pool, &["A", "B", "C"], "field", 2)
//!     .unwrap();
//! assert_eq!(design.summary().blocks, vec!["north", "south"]);
//! assert_eq!(design.unassigned_count(), 0);
//! ```
//!
//! ## Reproducibility
//!
//! Every generator owns a random stream seeded from the `u64` it is created
//! with. Two generators with the same seed and parameters produce identical
//! tables; there is no global random state.
//!
//! ## Features
//!
//! - `serde` (default): serialization of tables and results, and the JSON
//!   [`config`] layer
//! - `parallel`: generate and analyze many designs using rayon
//! - `python`: Python bindings via PyO3

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod analysis;
pub mod catalogue;
#[cfg(feature = "serde")]
pub mod config;
pub mod construct;
pub mod error;
pub mod factor;
#[cfg(feature = "python")]
pub mod python;
pub mod table;
pub mod units;
pub mod utils;

#[cfg(feature = "parallel")]
pub mod parallel;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::analysis::{
        analyze_effects, block_anova, block_effectiveness, interaction_means, one_way_anova,
        BlockAnova, BlockEffectiveness, EffectsAnalysis, OneWayAnova,
    };
    pub use crate::construct::{
        compare_rsm_designs, decode, AliasResolver, AliasStructure, BoxBehnken, CcdType,
        CentralComposite, CompletelyRandomized, FractionalFactorial, FullFactorial,
        RandomizedBlock, StandardOrder,
    };
    pub use crate::error::{Error, Result};
    pub use crate::factor::{Factor, GeneratorExpression, Level};
    pub use crate::table::{DesignSummary, DesignTable, PointType, Run};
    pub use crate::units::UnitPool;

    #[cfg(feature = "serde")]
    pub use crate::config::ExperimentConfig;

    #[cfg(feature = "parallel")]
    pub use crate::parallel::{par_analyze_one_way, par_generate};
}

// Re-export commonly used items at crate root
pub use catalogue::{get_by_name as get_common_design, list_common_designs};
pub use error::{Error, Result};
pub use factor::{Factor, GeneratorExpression, Level};
pub use table::{DesignSummary, DesignTable, PointType, Run};
pub use units::UnitPool;

#[cfg(feature = "parallel")]
pub use parallel::{par_analyze_one_way, par_generate};
