//! The design table shared by every generator.
//!
//! ## Overview
//!
//! - [`DesignTable`]: ordered runs over a set of named factors
//! - [`Run`]: one row with its levels and metadata
//! - [`DesignSummary`]: snapshot of how the table was generated
//!
//! A table is created once by a generator and never mutated afterwards. Adding a
//! response column, decoding coded units, or reordering rows returns a new table.

mod export;
mod summary;

pub use summary::{DesignSummary, FactorSummary, PointCounts};

use ndarray::Array2;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::factor::{Factor, Level};

/// Role of a point in a response-surface design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointType {
    /// A `±1` corner of the factorial cube.
    Factorial,
    /// A star point: one factor at `±α`, all others at the center.
    Axial,
    /// All factors at the center.
    Center,
    /// A Box-Behnken edge midpoint: two factors at `±1`, the rest at the center.
    Edge,
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Factorial => "Factorial",
            Self::Axial => "Axial",
            Self::Center => "Center",
            Self::Edge => "Edge",
        })
    }
}

/// One run (row) of a design table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Run {
    pub(crate) levels: Vec<Level>,
    pub(crate) std_order: usize,
    pub(crate) run_order: usize,
    pub(crate) replication: Option<usize>,
    pub(crate) point_type: Option<PointType>,
    pub(crate) unit_id: Option<String>,
    pub(crate) block: Option<String>,
}

impl Run {
    /// A run in generation position `std_order` (1-based), not yet randomized.
    pub(crate) fn new(levels: Vec<Level>, std_order: usize) -> Self {
        Self {
            levels,
            std_order,
            run_order: std_order,
            replication: None,
            point_type: None,
            unit_id: None,
            block: None,
        }
    }

    pub(crate) fn with_replication(mut self, replication: usize) -> Self {
        self.replication = Some(replication);
        self
    }

    pub(crate) fn with_point_type(mut self, point_type: PointType) -> Self {
        self.point_type = Some(point_type);
        self
    }

    pub(crate) fn with_unit(mut self, unit_id: impl Into<String>) -> Self {
        self.unit_id = Some(unit_id.into());
        self
    }

    pub(crate) fn with_block(mut self, block: Option<String>) -> Self {
        self.block = block;
        self
    }

    /// Levels, one per factor of the owning table.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Position in canonical generation order (1-based).
    #[must_use]
    pub fn std_order(&self) -> usize {
        self.std_order
    }

    /// Position in execution order (1-based).
    #[must_use]
    pub fn run_order(&self) -> usize {
        self.run_order
    }

    /// Replicate index (1-based), when the design is replicated.
    #[must_use]
    pub fn replication(&self) -> Option<usize> {
        self.replication
    }

    /// Point type for response-surface designs.
    #[must_use]
    pub fn point_type(&self) -> Option<PointType> {
        self.point_type
    }

    /// Identifier of the experimental unit this run is assigned to.
    #[must_use]
    pub fn unit_id(&self) -> Option<&str> {
        self.unit_id.as_deref()
    }

    /// Block identifier (randomized block designs).
    #[must_use]
    pub fn block(&self) -> Option<&str> {
        self.block.as_deref()
    }

    /// Number of non-zero numeric coordinates.
    #[must_use]
    pub fn nonzero_count(&self) -> usize {
        self.levels
            .iter()
            .filter(|l| l.as_f64().is_some_and(|v| v != 0.0))
            .count()
    }
}

/// A response column attached to a table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Response {
    name: String,
    values: Vec<f64>,
}

/// A generated experimental design.
///
/// Every run holds exactly one level per factor; the row count equals the
/// theoretical run count of the design that produced it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DesignTable {
    factors: Vec<Factor>,
    runs: Vec<Run>,
    responses: Vec<Response>,
    unit_column: Option<String>,
    block_column: Option<String>,
    summary: DesignSummary,
}

impl DesignTable {
    /// Assemble a table, checking that every run matches the factors.
    pub(crate) fn new(factors: Vec<Factor>, runs: Vec<Run>, mut summary: DesignSummary) -> Result<Self> {
        for run in &runs {
            if run.levels.len() != factors.len() {
                return Err(Error::DimensionMismatch {
                    expected: format!("{} levels per run", factors.len()),
                    actual: format!("{} levels in run {}", run.levels.len(), run.std_order),
                });
            }
            for (factor, level) in factors.iter().zip(&run.levels) {
                if level.is_assigned() && factor.position_of(level).is_none() {
                    return Err(Error::invalid_factors(format!(
                        "level '{level}' is not a level of factor '{}'",
                        factor.name()
                    )));
                }
            }
        }

        summary.factors = factors.iter().map(FactorSummary::from).collect();
        summary.run_count = runs.len();

        Ok(Self {
            factors,
            runs,
            responses: Vec::new(),
            unit_column: None,
            block_column: None,
            summary,
        })
    }

    /// Build a table of numeric factors from a coded point matrix (rows are runs).
    pub(crate) fn from_matrix(
        names: &[String],
        matrix: &Array2<f64>,
        point_types: Option<&[PointType]>,
        summary: DesignSummary,
    ) -> Result<Self> {
        if names.len() != matrix.ncols() {
            return Err(Error::DimensionMismatch {
                expected: format!("{} factor names", matrix.ncols()),
                actual: format!("{} names", names.len()),
            });
        }
        let factors: Vec<Factor> = names
            .iter()
            .zip(matrix.columns())
            .map(|(name, column)| Factor::from_numeric_values(name.clone(), &column.to_vec()))
            .collect();

        let runs = matrix
            .rows()
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let levels = row
                    .iter()
                    .map(|&v| Level::Numeric(if v == 0.0 { 0.0 } else { v }))
                    .collect();
                let run = Run::new(levels, idx + 1);
                match point_types.and_then(|pts| pts.get(idx)) {
                    Some(&pt) => run.with_point_type(pt),
                    None => run,
                }
            })
            .collect();

        Self::new(factors, runs, summary)
    }

    pub(crate) fn with_unit_columns(
        mut self,
        unit_column: Option<String>,
        block_column: Option<String>,
    ) -> Self {
        self.unit_column = unit_column;
        self.block_column = block_column;
        self
    }

    /// Apply `f` to the run list, e.g. to randomize the run order.
    pub(crate) fn map_runs(mut self, f: impl FnOnce(&mut Vec<Run>)) -> Self {
        f(&mut self.runs);
        self
    }

    /// Return a new table with one unit id attached to each run, in row order.
    pub(crate) fn with_unit_ids(&self, unit_column: &str, ids: Vec<String>) -> Result<Self> {
        if ids.len() != self.len() {
            return Err(Error::DimensionMismatch {
                expected: format!("{} unit ids", self.len()),
                actual: format!("{} ids", ids.len()),
            });
        }
        if self.factor(unit_column).is_some() || self.response(unit_column).is_ok() {
            return Err(Error::invalid_factors(format!(
                "unit column '{unit_column}' clashes with an existing column"
            )));
        }
        let mut table = self.clone();
        for (run, id) in table.runs.iter_mut().zip(ids) {
            run.unit_id = Some(id);
        }
        table.unit_column = Some(unit_column.to_string());
        Ok(table)
    }

    /// Declared factors, in column order.
    #[must_use]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Look up a factor by name.
    #[must_use]
    pub fn factor(&self, name: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.name() == name)
    }

    /// Column index of a factor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if no factor has this name.
    pub fn factor_index(&self, name: &str) -> Result<usize> {
        self.factors
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Factor names, in column order.
    #[must_use]
    pub fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(Factor::name).collect()
    }

    /// All runs, in stored order.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the table has no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Snapshot of how this design was generated.
    #[must_use]
    pub fn summary(&self) -> &DesignSummary {
        &self.summary
    }

    /// Name of the unit identifier column, for unit-based designs.
    #[must_use]
    pub fn unit_column(&self) -> Option<&str> {
        self.unit_column.as_deref()
    }

    /// Name of the blocking column, for block designs.
    #[must_use]
    pub fn block_column(&self) -> Option<&str> {
        self.block_column.as_deref()
    }

    /// Levels of one factor, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if the factor does not exist.
    pub fn column(&self, name: &str) -> Result<Vec<&Level>> {
        let idx = self.factor_index(name)?;
        Ok(self.runs.iter().map(|r| &r.levels[idx]).collect())
    }

    /// Grouping keys for one factor column; `None` marks unassigned runs.
    pub(crate) fn keys_of(&self, factor_idx: usize) -> Vec<Option<String>> {
        self.runs.iter().map(|r| r.levels[factor_idx].key()).collect()
    }

    /// Number of runs with at least one unassigned level.
    #[must_use]
    pub fn unassigned_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.levels.iter().any(|l| !l.is_assigned()))
            .count()
    }

    /// The factor levels as a numeric matrix (runs x factors).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFactorConfig`] if any level is not numeric.
    pub fn numeric_matrix(&self) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((self.len(), self.factors.len()));
        for (i, run) in self.runs.iter().enumerate() {
            for (j, level) in run.levels.iter().enumerate() {
                matrix[[i, j]] = level.as_f64().ok_or_else(|| {
                    Error::invalid_factors(format!(
                        "factor '{}' has non-numeric level '{level}'",
                        self.factors[j].name()
                    ))
                })?;
            }
        }
        Ok(matrix)
    }

    /// Response values by column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if no response has this name.
    pub fn response(&self, name: &str) -> Result<&[f64]> {
        self.responses
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.values.as_slice())
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Names of attached responses.
    #[must_use]
    pub fn response_names(&self) -> Vec<&str> {
        self.responses.iter().map(|r| r.name.as_str()).collect()
    }

    /// Return a new table with a response column joined row by row.
    ///
    /// `NaN` marks a missing observation; analysis skips such rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the length differs from the run count or the name
    /// collides with an existing column.
    ///
    /// # Example
    ///
    /// ```
    /// use expdesign::construct::FullFactorial;
    /// use expdesign::Factor;
    ///
    /// let table = FullFactorial::new(7)
    ///     .create_design(vec![Factor::two_level("A")], 1, false)
    ///     .unwrap();
    /// let with_y = table.with_response("y", vec![1.0, 2.0]).unwrap();
    /// assert_eq!(with_y.response("y").unwrap(), &[1.0, 2.0]);
    /// assert!(table.response("y").is_err());
    /// ```
    pub fn with_response(&self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(Error::DimensionMismatch {
                expected: format!("{} response values", self.len()),
                actual: format!("{} values", values.len()),
            });
        }
        if self.header().iter().any(|h| *h == name) {
            return Err(Error::invalid_factors(format!(
                "column '{name}' already exists in the design table"
            )));
        }
        let mut table = self.clone();
        table.responses.push(Response { name, values });
        Ok(table)
    }

    /// Return a new table with rows sorted by standard order.
    #[must_use]
    pub fn in_standard_order(&self) -> Self {
        self.reordered(|run| run.std_order)
    }

    /// Return a new table with rows sorted by run order.
    #[must_use]
    pub fn in_run_order(&self) -> Self {
        self.reordered(|run| run.run_order)
    }

    fn reordered(&self, key: impl Fn(&Run) -> usize) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| key(&self.runs[i]));

        let mut table = self.clone();
        table.runs = order.iter().map(|&i| self.runs[i].clone()).collect();
        for response in &mut table.responses {
            response.values = order.iter().map(|&i| response.values[i]).collect();
        }
        table
    }

    /// Return a new table with the given factors' levels mapped through `map`.
    pub(crate) fn map_numeric_levels(
        &self,
        factor_idx: usize,
        map: impl Fn(f64) -> f64,
    ) -> Result<Self> {
        let factor = &self.factors[factor_idx];
        let mut values = Vec::with_capacity(factor.num_levels());
        for level in factor.levels() {
            values.push(map(level.as_f64().ok_or_else(|| {
                Error::invalid_factors(format!("factor '{}' is not numeric", factor.name()))
            })?));
        }

        let mut table = self.clone();
        table.factors[factor_idx] = Factor::new(factor.name(), values)?;
        for run in &mut table.runs {
            if let Level::Numeric(v) = run.levels[factor_idx] {
                run.levels[factor_idx] = Level::Numeric(map(v));
            }
        }
        table.summary.factors = table.factors.iter().map(FactorSummary::from).collect();
        Ok(table)
    }
}

impl fmt::Display for DesignTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} runs)", self.summary.design_type, self.len())?;
        writeln!(f, "  {}", self.header().join("\t"))?;
        for record in self.records() {
            writeln!(f, "  {}", record.join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_table() -> DesignTable {
        let m = array![[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];
        DesignTable::from_matrix(
            &["A".to_string(), "B".to_string()],
            &m,
            None,
            DesignSummary::new("test", 0),
        )
        .unwrap()
    }

    #[test]
    fn test_from_matrix() {
        let table = small_table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.factor_names(), vec!["A", "B"]);
        assert_eq!(table.factor("A").unwrap().num_levels(), 2);
        assert_eq!(table.summary().run_count, 4);
        assert_eq!(table.runs()[2].std_order(), 3);
        assert_eq!(table.numeric_matrix().unwrap()[[1, 0]], 1.0);
    }

    #[test]
    fn test_new_rejects_ragged_runs() {
        let factors = vec![Factor::two_level("A")];
        let runs = vec![Run::new(vec![Level::Numeric(1.0), Level::Numeric(1.0)], 1)];
        let err = DesignTable::new(factors, runs, DesignSummary::new("t", 0)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_new_rejects_foreign_level() {
        let factors = vec![Factor::two_level("A")];
        let runs = vec![Run::new(vec![Level::Numeric(0.5)], 1)];
        assert!(DesignTable::new(factors, runs, DesignSummary::new("t", 0)).is_err());
    }

    #[test]
    fn test_with_response_is_a_new_table() {
        let table = small_table();
        let enriched = table.with_response("y", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(table.response_names().is_empty());
        assert_eq!(enriched.response_names(), vec!["y"]);

        assert!(table.with_response("y", vec![1.0]).is_err());
        assert!(table.with_response("A", vec![0.0; 4]).is_err());
        assert!(enriched.with_response("y", vec![0.0; 4]).is_err());
    }

    #[test]
    fn test_reordering_carries_responses() {
        let mut table = small_table();
        for (run, order) in table.runs.iter_mut().zip([3, 1, 4, 2]) {
            run.run_order = order;
        }
        let table = table.with_response("y", vec![10.0, 20.0, 30.0, 40.0]).unwrap();

        let by_run = table.in_run_order();
        let orders: Vec<usize> = by_run.runs().iter().map(Run::run_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert_eq!(by_run.response("y").unwrap(), &[20.0, 40.0, 10.0, 30.0]);

        let back = by_run.in_standard_order();
        assert_eq!(back.response("y").unwrap(), &[10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_nonzero_count() {
        let run = Run::new(vec![Level::Numeric(0.0), Level::Numeric(-1.0), Level::Numeric(1.0)], 1);
        assert_eq!(run.nonzero_count(), 2);
    }
}
