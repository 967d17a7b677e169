//! Analysis of designed experiments.
//!
//! This module provides the ANOVA decompositions used by the generators:
//! - One-way ANOVA across treatment groups (CRD)
//! - Two-way treatment + block ANOVA with relative efficiency (RBD)
//! - Block effectiveness by intraclass correlation
//! - Main effects and interactions (factorial designs)
//! - Covariate balance checks (CRD)
//!
//! ## Quick Start
//!
//! ```rust
//! use expdesign::analysis::one_way_anova;
//! use expdesign::construct::CompletelyRandomized;
//! use expdesign::UnitPool;
//!
//! let pool = UnitPool::with_sequential_ids("unit_id", 12);
//! let design = CompletelyRandomized::new(42)
//!     .create_design(&pool, &["Control", "Email", "SMS"], None)
//!     .unwrap();
//!
//! let response: Vec<f64> = design
//!     .runs()
//!     .iter()
//!     .map(|run| {
//!         let base = match run.levels()[0].to_string().as_str() {
//!             "Control" => 10.0,
//!             "Email" => 12.0,
//!             _ => 15.0,
//!         };
//!         base + (run.std_order() % 3) as f64 * 0.1
//!     })
//!     .collect();
//! let design = design.with_response("conversion", response).unwrap();
//!
//! let anova = one_way_anova(&design, "treatment", "conversion").unwrap();
//! assert_eq!(anova.groups.len(), 3);
//! assert!(anova.significant());
//! ```
//!
//! ## Degenerate data
//!
//! Analysis never fails on degenerate data. Zero variance, a single group or no
//! residual degrees of freedom yield `f = NaN`, `p = 1.0` and an
//! [`AnalysisFlag`]. Only contract violations (unknown columns) are errors.

mod anova;
mod balance;
mod effects;
pub mod stats;
mod types;

pub use balance::{
    check_balance, BalanceReport, BalanceTest, CovariateBalance, MAX_BALANCE_COVARIATES,
};
pub use effects::{analyze_effects, interaction_means};
pub use types::{
    cohens_f, AnalysisFlag, AnovaRow, BlockAnova, BlockEffectiveness, BlockingVerdict, EffectSize,
    EffectsAnalysis, GroupStats, InteractionCell, InteractionEffect, MainEffect, OneWayAnova,
    SIGNIFICANCE_LEVEL,
};

use crate::error::{Error, Result};
use crate::table::DesignTable;

/// One-way ANOVA of a response grouped by one factor of the table.
///
/// Runs with an unassigned level or a missing (`NaN`) response are skipped.
///
/// # Errors
///
/// Returns [`Error::UnknownColumn`] if the factor or the response does not exist.
pub fn one_way_anova(table: &DesignTable, factor: &str, response: &str) -> Result<OneWayAnova> {
    let idx = table.factor_index(factor)?;
    let values = table.response(response)?;
    let keys = table.keys_of(idx);
    let result = anova::one_way(factor, keys.iter().map(Option::as_deref), values);
    tracing::info!(
        factor,
        response,
        df_between = result.df_between,
        df_within = result.df_within,
        f = result.f_statistic,
        p = result.p_value,
        "one-way ANOVA"
    );
    Ok(result)
}

fn block_keys(table: &DesignTable) -> Result<Vec<Option<&str>>> {
    if table.runs().iter().all(|r| r.block().is_none()) {
        return Err(Error::UnknownColumn(
            table.block_column().unwrap_or("block").to_string(),
        ));
    }
    Ok(table.runs().iter().map(|r| r.block()).collect())
}

/// Two-way ANOVA of a response by treatment factor and block.
///
/// # Errors
///
/// Returns [`Error::UnknownColumn`] if the factor, the response or the block
/// column does not exist.
pub fn block_anova(table: &DesignTable, factor: &str, response: &str) -> Result<BlockAnova> {
    let idx = table.factor_index(factor)?;
    let values = table.response(response)?;
    let blocks = block_keys(table)?;
    let treatments = table.keys_of(idx);

    let result = anova::block_anova(treatments.iter().map(Option::as_deref), blocks, values);
    tracing::info!(
        factor,
        response,
        f_treatment = result.treatment.f_statistic,
        p_treatment = result.treatment.p_value,
        f_block = result.block.f_statistic,
        relative_efficiency = result.relative_efficiency,
        "block ANOVA"
    );
    Ok(result)
}

/// Variance decomposition of a response by block.
///
/// # Errors
///
/// Returns [`Error::UnknownColumn`] if the response or the block column does
/// not exist.
pub fn block_effectiveness(table: &DesignTable, response: &str) -> Result<BlockEffectiveness> {
    let values = table.response(response)?;
    let blocks = block_keys(table)?;
    Ok(anova::block_effectiveness(blocks, values))
}
