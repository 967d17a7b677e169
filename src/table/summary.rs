//! Design summary metadata.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::BalanceReport;
use crate::construct::AliasStructure;
use crate::factor::Factor;

/// Name and level labels of one factor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactorSummary {
    /// Factor name.
    pub name: String,
    /// Levels rendered as text, in declaration order.
    pub levels: Vec<String>,
}

impl From<&Factor> for FactorSummary {
    fn from(factor: &Factor) -> Self {
        Self {
            name: factor.name().to_string(),
            levels: factor.levels().iter().map(ToString::to_string).collect(),
        }
    }
}

/// Run counts by point type (response-surface designs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointCounts {
    /// `±1` cube corners.
    pub factorial: usize,
    /// Star points.
    pub axial: usize,
    /// Box-Behnken edge midpoints.
    pub edge: usize,
    /// Center replicates.
    pub center: usize,
}

/// How a design table was generated.
///
/// Fields that do not apply to a design type are left empty.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DesignSummary {
    /// Human-readable design type, e.g. `"2^(5-2) Fractional Factorial"`.
    pub design_type: String,
    /// Factor names and levels.
    pub factors: Vec<FactorSummary>,
    /// Total number of runs.
    pub run_count: usize,
    /// Replicates per treatment combination.
    pub replications: Option<usize>,
    /// Whether run order was randomized.
    pub randomized: bool,
    /// Seed of the generator's random stream.
    pub seed: u64,
    /// Point counts by type.
    pub point_counts: Option<PointCounts>,
    /// Design resolution (fractional factorials).
    pub resolution: Option<u32>,
    /// Axial distance (central composite designs).
    pub alpha: Option<f64>,
    /// Generator expressions, rendered as text.
    pub generators: Vec<String>,
    /// Alias structure (fractional factorials).
    pub alias_structure: Option<AliasStructure>,
    /// Units allocated per treatment.
    pub sample_sizes: Vec<(String, usize)>,
    /// Block identifiers in processing order.
    pub blocks: Vec<String>,
    /// Units left without a treatment.
    pub unassigned_units: usize,
    /// Covariate balance across treatment groups.
    pub balance: Option<BalanceReport>,
}

impl DesignSummary {
    pub(crate) fn new(design_type: impl Into<String>, seed: u64) -> Self {
        Self {
            design_type: design_type.into(),
            seed,
            ..Self::default()
        }
    }
}
