//! Factors, levels and generator expressions.
//!
//! A [`Factor`] is a named, ordered set of [`Level`]s. Treatment factors carry
//! labels (`"Control"`, `"Email"`), two-level and response-surface factors carry
//! coded numeric values (`-1`, `0`, `+1`, `±α`).
//!
//! A [`GeneratorExpression`] defines a derived factor of a fractional factorial
//! design as the product of other factors, e.g. `D=ABC`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single level of a factor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Level {
    /// A named level such as a treatment label.
    Label(String),
    /// A numeric level, coded (`-1`, `0`, `+1`, `±α`) or in physical units.
    Numeric(f64),
    /// No level assigned (a unit left out of the allocation).
    Unassigned,
}

impl Level {
    /// Numeric value of the level, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Label of the level, if it has one.
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(s) => Some(s),
            _ => None,
        }
    }

    /// Whether a level was assigned.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unassigned)
    }

    /// Grouping key used by the analysis routines.
    ///
    /// Returns `None` for unassigned levels.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        self.is_assigned().then(|| self.to_string())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(s) => f.write_str(s),
            // normalise -0.0 so that "-0" never shows up in exported tables
            Self::Numeric(v) if *v == 0.0 => f.write_str("0"),
            Self::Numeric(v) => write!(f, "{v}"),
            Self::Unassigned => Ok(()),
        }
    }
}

impl From<&str> for Level {
    fn from(value: &str) -> Self {
        Self::Label(value.to_string())
    }
}

impl From<String> for Level {
    fn from(value: String) -> Self {
        Self::Label(value)
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

impl From<i32> for Level {
    fn from(value: i32) -> Self {
        Self::Numeric(f64::from(value))
    }
}

/// A named experimental factor with an ordered list of levels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Factor {
    name: String,
    levels: Vec<Level>,
}

impl Factor {
    /// Create a factor, validating its name and levels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFactorConfig`] if the name is blank, there are no
    /// levels, a level is repeated or unassigned, or a numeric level is not finite.
    ///
    /// # Example
    ///
    /// ```
    /// use expdesign::Factor;
    ///
    /// let f = Factor::new("Discount", ["0%", "10%", "20%"]).unwrap();
    /// assert_eq!(f.num_levels(), 3);
    /// assert!(Factor::new("Discount", ["0%", "0%"]).is_err());
    /// ```
    pub fn new<I, L>(name: impl Into<String>, levels: I) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_factors("factor name must not be empty"));
        }

        let levels: Vec<Level> = levels.into_iter().map(Into::into).collect();
        if levels.is_empty() {
            return Err(Error::invalid_factors(format!(
                "factor '{name}' must have at least one level"
            )));
        }

        let mut seen = HashSet::with_capacity(levels.len());
        for level in &levels {
            match level {
                Level::Unassigned => {
                    return Err(Error::invalid_factors(format!(
                        "factor '{name}' has an unassigned level"
                    )));
                }
                Level::Numeric(v) if !v.is_finite() => {
                    return Err(Error::invalid_factors(format!(
                        "factor '{name}' has a non-finite level {v}"
                    )));
                }
                _ => {}
            }
            if !seen.insert(level.to_string()) {
                return Err(Error::invalid_factors(format!(
                    "factor '{name}' repeats level '{level}'"
                )));
            }
        }

        Ok(Self { name, levels })
    }

    /// Create a two-level factor coded `-1, +1`.
    #[must_use]
    pub fn two_level(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            levels: vec![Level::Numeric(-1.0), Level::Numeric(1.0)],
        }
    }

    /// Build a numeric factor whose levels are the distinct values of a column,
    /// sorted ascending.
    pub(crate) fn from_numeric_values(name: impl Into<String>, values: &[f64]) -> Self {
        let mut distinct: Vec<f64> = Vec::new();
        for &v in values {
            let v = if v == 0.0 { 0.0 } else { v };
            if !distinct.iter().any(|d| *d == v) {
                distinct.push(v);
            }
        }
        distinct.sort_by(f64::total_cmp);
        Self {
            name: name.into(),
            levels: distinct.into_iter().map(Level::Numeric).collect(),
        }
    }

    /// Factor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered levels.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Number of levels.
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Index of `level` among this factor's levels.
    #[must_use]
    pub fn position_of(&self, level: &Level) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }

    /// Whether every level is numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.levels.iter().all(|l| matches!(l, Level::Numeric(_)))
    }
}

/// Ensure factor names are unique.
pub(crate) fn ensure_unique_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::invalid_factors(format!(
                "factor name '{name}' is declared more than once"
            )));
        }
    }
    Ok(())
}

/// A generator expression of a fractional factorial design.
///
/// `D=ABC` means that factor `D` is set to the product of `A`, `B` and `C` in
/// `±1` coding (the modulo-2 sum of their sign bits). Single-letter factor names
/// may be written run together; longer names are separated with `*`, as in
/// `Temp=Press*Time`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct GeneratorExpression {
    target: String,
    sources: Vec<String>,
}

impl GeneratorExpression {
    /// Create a generator from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGenerator`] if either side is empty, a source is
    /// repeated, or the target also appears as a source.
    pub fn new<I, S>(target: impl Into<String>, sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = target.into().trim().to_string();
        let sources: Vec<String> = sources
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .collect();
        let expression = format!("{}={}", target, sources.join("*"));

        if target.is_empty() {
            return Err(Error::invalid_generator(expression, "missing target factor"));
        }
        if sources.is_empty() || sources.iter().any(String::is_empty) {
            return Err(Error::invalid_generator(expression, "missing source factors"));
        }
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.as_str()) {
                return Err(Error::invalid_generator(
                    expression,
                    format!("source factor '{source}' is repeated"),
                ));
            }
        }
        if seen.contains(target.as_str()) {
            return Err(Error::invalid_generator(
                expression,
                "target factor appears among its own sources",
            ));
        }

        Ok(Self { target, sources })
    }

    /// The derived factor.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The factors whose product defines the target.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Number of letters on the right-hand side.
    #[must_use]
    pub fn word_length(&self) -> usize {
        self.sources.len()
    }
}

impl FromStr for GeneratorExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((lhs, rhs)) = s.split_once('=') else {
            return Err(Error::invalid_generator(s, "missing '='"));
        };
        let lhs = lhs.trim();
        let rhs = rhs.trim();
        if rhs.contains('=') {
            return Err(Error::invalid_generator(s, "more than one '='"));
        }

        let sources: Vec<String> = if rhs.contains('*') {
            rhs.split('*').map(|p| p.trim().to_string()).collect()
        } else {
            rhs.chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect()
        };

        Self::new(lhs, sources).map_err(|err| match err {
            Error::InvalidGenerator { reason, .. } => Error::invalid_generator(s, reason),
            other => other,
        })
    }
}

impl TryFrom<String> for GeneratorExpression {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<GeneratorExpression> for String {
    fn from(value: GeneratorExpression) -> Self {
        value.to_string()
    }
}

impl fmt::Display for GeneratorExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compact = self.target.chars().count() == 1
            && self.sources.iter().all(|s| s.chars().count() == 1);
        let separator = if compact { "" } else { "*" };
        write!(f, "{}={}", self.target, self.sources.join(separator))
    }
}
