//! Catalogue of standard two-level fractional factorial designs.
//!
//! Two lookups live here. [`generators_for`] gives the generator set that
//! [`FractionalFactorial`] uses by default for a `2^(k-p)` design, and
//! [`get_by_name`] builds one of the common named designs such as
//! `2^(5-2)_III` for users who know them by that name.

use crate::construct::{FractionalFactorial, DEFAULT_SEED};
use crate::error::{Error, Result};
use crate::factor::GeneratorExpression;
use crate::table::DesignTable;

/// Default generators keyed by `(k, p)`, written over the letters `A..H`.
const STANDARD_GENERATORS: &[((usize, usize), &[&str])] = &[
    ((4, 1), &["D=ABC"]),
    ((5, 1), &["E=ABCD"]),
    ((5, 2), &["D=AB", "E=AC"]),
    ((6, 1), &["F=ABCDE"]),
    ((6, 2), &["E=ABC", "F=BCD"]),
    ((6, 3), &["D=AB", "E=AC", "F=BC"]),
    ((7, 1), &["G=ABCDEF"]),
    ((7, 2), &["F=ABCD", "G=ABCE"]),
    ((7, 3), &["E=ABC", "F=BCD", "G=ACD"]),
    ((7, 4), &["D=AB", "E=AC", "F=BC", "G=ABC"]),
    ((8, 4), &["E=BCD", "F=ACD", "G=ABC", "H=ABD"]),
];

/// A named fractional factorial design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonDesign {
    /// Catalogue name, e.g. `2^(7-4)_III`.
    pub name: &'static str,
    /// Number of two-level factors.
    pub factors: usize,
    /// Number of runs.
    pub runs: usize,
    /// Design resolution.
    pub resolution: u32,
    /// Generators over the letters `A, B, C, ...`.
    pub generators: &'static [&'static str],
    /// What the design is typically used for.
    pub description: &'static str,
}

const COMMON_DESIGNS: &[CommonDesign] = &[
    CommonDesign {
        name: "2^(4-1)_IV",
        factors: 4,
        runs: 8,
        resolution: 4,
        generators: &["D=ABC"],
        description: "4 factors in 8 runs, Resolution IV",
    },
    CommonDesign {
        name: "2^(5-1)_V",
        factors: 5,
        runs: 16,
        resolution: 5,
        generators: &["E=ABCD"],
        description: "5 factors in 16 runs, Resolution V",
    },
    CommonDesign {
        name: "2^(5-2)_III",
        factors: 5,
        runs: 8,
        resolution: 3,
        generators: &["D=AB", "E=AC"],
        description: "5 factors in 8 runs, Resolution III (screening only)",
    },
    CommonDesign {
        name: "2^(7-4)_III",
        factors: 7,
        runs: 8,
        resolution: 3,
        generators: &["D=AB", "E=AC", "F=BC", "G=ABC"],
        description: "7 factors in 8 runs, Resolution III (screening)",
    },
    CommonDesign {
        name: "2^(7-3)_IV",
        factors: 7,
        runs: 16,
        resolution: 4,
        generators: &["E=ABC", "F=BCD", "G=ACD"],
        description: "7 factors in 16 runs, Resolution IV",
    },
];

/// Default generators for a `2^(k-p)` design, if the catalogue has one.
#[must_use]
pub fn generators_for(k: usize, p: usize) -> Option<&'static [&'static str]> {
    STANDARD_GENERATORS
        .iter()
        .find(|(key, _)| *key == (k, p))
        .map(|(_, generators)| *generators)
}

/// Rewrite letter-based catalogue generators onto arbitrary factor names.
///
/// Letter `A` stands for `names[0]`, `B` for `names[1]`, and so on.
pub(crate) fn map_letters(generators: &[&str], names: &[String]) -> Result<Vec<GeneratorExpression>> {
    let name_of = |letter: &str| {
        letter
            .bytes()
            .next()
            .and_then(|b| names.get(usize::from(b.wrapping_sub(b'A'))))
            .cloned()
            .ok_or_else(|| Error::UnknownColumn(letter.to_string()))
    };
    generators
        .iter()
        .map(|expr| {
            let parsed: GeneratorExpression = expr.parse()?;
            let sources = parsed
                .sources()
                .iter()
                .map(|s| name_of(s))
                .collect::<Result<Vec<_>>>()?;
            GeneratorExpression::new(name_of(parsed.target())?, sources)
        })
        .collect()
}

/// Look up a common design by name without building it.
#[must_use]
pub fn common_design(name: &str) -> Option<&'static CommonDesign> {
    COMMON_DESIGNS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name.trim()))
}

/// Build a common fractional factorial design by its catalogue name.
///
/// The table is in standard order (not randomized).
///
/// # Example
///
/// ```
/// use expdesign::catalogue::get_by_name;
///
/// let design = get_by_name("2^(5-2)_III").unwrap();
/// assert_eq!(design.len(), 8);
/// assert_eq!(design.summary().resolution, Some(3));
/// ```
///
/// # Errors
///
/// Returns [`Error::Config`] for an unknown name.
pub fn get_by_name(name: &str) -> Result<DesignTable> {
    let design = common_design(name)
        .ok_or_else(|| Error::config(format!("unknown fractional factorial design: {name}")))?;
    let generators: Vec<GeneratorExpression> = design
        .generators
        .iter()
        .map(|g| g.parse())
        .collect::<Result<_>>()?;
    FractionalFactorial::new(DEFAULT_SEED)
        .with_randomization(false)
        .create_design(design.factors, design.runs, Some(&generators))
}

/// List all named common designs.
#[must_use]
pub fn list_common_designs() -> Vec<&'static str> {
    COMMON_DESIGNS.iter().map(|d| d.name).collect()
}
