//! The experimental unit pool.
//!
//! Unit-based designs (CRD, RBD, and unit assignment of factorial runs) draw from
//! a [`UnitPool`]: a stable identifier column plus any number of baseline
//! covariates. Loading the pool from disk is the caller's concern.

use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Values of one covariate column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "values", rename_all = "lowercase"))]
pub enum CovariateValues {
    /// Numeric measurements; `None` is missing.
    Numeric(Vec<Option<f64>>),
    /// Category labels; `None` is missing.
    Categorical(Vec<Option<String>>),
}

impl CovariateValues {
    fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    /// Value of unit `idx` rendered as a category key.
    ///
    /// Numeric values are formatted, so a numeric column can serve as a block.
    #[must_use]
    pub fn key_at(&self, idx: usize) -> Option<String> {
        match self {
            Self::Numeric(v) => v.get(idx).copied().flatten().map(|x| x.to_string()),
            Self::Categorical(v) => v.get(idx).cloned().flatten(),
        }
    }
}

/// A named covariate column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Covariate {
    /// Column name.
    pub name: String,
    /// Column values, one per unit.
    pub values: CovariateValues,
}

/// A population of experimental units.
///
/// # Example
///
/// ```
/// use expdesign::UnitPool;
///
/// let pool = UnitPool::with_sequential_ids("unit_id", 4)
///     .with_numeric("baseline", vec![Some(1.0), Some(2.0), None, Some(4.0)])
///     .unwrap()
///     .with_categorical("region", ["N", "S", "N", "S"].map(|s| Some(s.to_string())).to_vec())
///     .unwrap();
///
/// assert_eq!(pool.len(), 4);
/// assert_eq!(pool.covariates().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitPool {
    id_column: String,
    ids: Vec<String>,
    covariates: Vec<Covariate>,
}

impl UnitPool {
    /// Create a pool from explicit unit identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the id column name is blank or an identifier repeats.
    pub fn new<I, S>(id_column: impl Into<String>, ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id_column = id_column.into();
        if id_column.trim().is_empty() {
            return Err(Error::invalid_factors("id column name must not be empty"));
        }
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(Error::invalid_factors(format!(
                    "unit id '{id}' appears more than once"
                )));
            }
        }
        Ok(Self {
            id_column,
            ids,
            covariates: Vec::new(),
        })
    }

    /// Create a pool of `n` units identified `0..n`.
    #[must_use]
    pub fn with_sequential_ids(id_column: impl Into<String>, n: usize) -> Self {
        Self {
            id_column: id_column.into(),
            ids: (0..n).map(|i| i.to_string()).collect(),
            covariates: Vec::new(),
        }
    }

    /// Add a numeric covariate.
    ///
    /// # Errors
    ///
    /// Returns an error if the length differs from the pool size or the name is taken.
    pub fn with_numeric(self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<Self> {
        self.with_covariate(name.into(), CovariateValues::Numeric(values))
    }

    /// Add a categorical covariate.
    ///
    /// # Errors
    ///
    /// Returns an error if the length differs from the pool size or the name is taken.
    pub fn with_categorical(
        self,
        name: impl Into<String>,
        values: Vec<Option<String>>,
    ) -> Result<Self> {
        self.with_covariate(name.into(), CovariateValues::Categorical(values))
    }

    fn with_covariate(mut self, name: String, values: CovariateValues) -> Result<Self> {
        if values.len() != self.ids.len() {
            return Err(Error::DimensionMismatch {
                expected: format!("{} values for covariate '{name}'", self.ids.len()),
                actual: format!("{} values", values.len()),
            });
        }
        if name == self.id_column || self.covariate(&name).is_some() {
            return Err(Error::invalid_factors(format!(
                "column '{name}' already exists in the unit pool"
            )));
        }
        self.covariates.push(Covariate { name, values });
        Ok(self)
    }

    /// Name of the identifier column.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Unit identifiers, in pool order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All covariates, in insertion order.
    #[must_use]
    pub fn covariates(&self) -> &[Covariate] {
        &self.covariates
    }

    /// Look up a covariate by name.
    #[must_use]
    pub fn covariate(&self, name: &str) -> Option<&Covariate> {
        self.covariates.iter().find(|c| c.name == name)
    }

    /// Group unit indices by the value of a covariate, in first-appearance order.
    ///
    /// Units with a missing value are returned separately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if the covariate does not exist.
    pub fn groups_by(&self, name: &str) -> Result<(Vec<(String, Vec<usize>)>, Vec<usize>)> {
        let covariate = self
            .covariate(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;

        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut missing = Vec::new();
        for idx in 0..self.len() {
            match covariate.values.key_at(idx) {
                Some(key) => match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, members)) => members.push(idx),
                    None => groups.push((key, vec![idx])),
                },
                None => missing.push(idx),
            }
        }
        Ok((groups, missing))
    }
}
