//! Generator validation, resolution and alias structure of two-level
//! fractional factorial designs.
//!
//! Every generator `D=ABC` contributes the word `ABCD` to the defining relation
//! `I = ABCD = ...`. Words are stored as bitmasks over the factor columns, so
//! multiplying two words is a XOR and the length of a word is its popcount.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::factor::GeneratorExpression;
use crate::utils::combinations;

/// Largest number of factors a word bitmask can hold.
pub const MAX_FRACTIONAL_FACTORS: usize = 64;

/// Largest number of generators; the defining relation has 2^p − 1 words.
pub const MAX_GENERATORS: usize = 20;

/// Number of leading factors whose two-factor interactions are listed in the
/// simplified alias structure.
const LISTED_INTERACTION_FACTORS: usize = 4;

/// One effect and the effects it is confounded with.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AliasEntry {
    /// Effect name, e.g. `"D"` or `"AB"`.
    pub effect: String,
    /// Alias set; the first element is the effect itself.
    pub aliases: Vec<String>,
}

/// Ordered map from effect name to its alias set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AliasStructure {
    entries: Vec<AliasEntry>,
}

impl AliasStructure {
    /// Alias set of an effect.
    #[must_use]
    pub fn get(&self, effect: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.effect == effect)
            .map(|e| e.aliases.as_slice())
    }

    /// All entries, main effects first.
    #[must_use]
    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    /// Number of effects listed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no effect is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AliasStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry.aliases.join(" = "))?;
        }
        Ok(())
    }
}

/// Validated generator set of a 2^(k-p) design.
///
/// # Example
///
/// ```
/// use expdesign::construct::AliasResolver;
/// use expdesign::GeneratorExpression;
///
/// let names: Vec<String> = ["A", "B", "C", "D", "E"].map(String::from).to_vec();
/// let generators: Vec<GeneratorExpression> =
///     vec!["D=AB".parse().unwrap(), "E=AC".parse().unwrap()];
/// let resolver = AliasResolver::new(&names, 3, &generators).unwrap();
///
/// assert_eq!(resolver.resolution(), 3);
/// assert_eq!(resolver.defining_relation(), vec!["ABD", "ACE", "BCDE"]);
/// assert_eq!(resolver.simplified_structure().get("D").unwrap(), ["D", "AB"]);
/// ```
#[derive(Debug, Clone)]
pub struct AliasResolver {
    names: Vec<String>,
    n_base: usize,
    generators: Vec<GeneratorExpression>,
    /// (target column, source columns) per generator
    columns: Vec<(usize, Vec<usize>)>,
    words: Vec<u64>,
}

impl AliasResolver {
    /// Validate `generators` against the factor names.
    ///
    /// The first `n_base` names are base factors. Every other factor must be
    /// the target of exactly one generator, and a generator may only reference
    /// base factors or targets of earlier generators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGenerator`] for unknown or forward references,
    /// a base-factor target, a target defined twice or a missing definition,
    /// and [`Error::InvalidRunCount`] if there are too many factors.
    pub fn new(
        names: &[String],
        n_base: usize,
        generators: &[GeneratorExpression],
    ) -> Result<Self> {
        if names.len() > MAX_FRACTIONAL_FACTORS {
            return Err(Error::invalid_run_count(format!(
                "{} factors exceeds the maximum of {MAX_FRACTIONAL_FACTORS}",
                names.len()
            )));
        }
        if generators.len() > MAX_GENERATORS {
            return Err(Error::invalid_run_count(format!(
                "{} generators exceeds the maximum of {MAX_GENERATORS}",
                generators.len()
            )));
        }
        let index_of = |name: &str| names.iter().position(|n| n == name);

        let mut defined = vec![false; names.len()];
        defined.iter_mut().take(n_base).for_each(|d| *d = true);

        let mut columns = Vec::with_capacity(generators.len());
        let mut words = Vec::with_capacity(generators.len());
        for generator in generators {
            let reject = |reason: String| Error::invalid_generator(generator.to_string(), reason);

            let target = index_of(generator.target()).ok_or_else(|| {
                reject(format!("unknown target factor '{}'", generator.target()))
            })?;
            if target < n_base {
                return Err(reject(format!(
                    "'{}' is a base factor and cannot be generated",
                    generator.target()
                )));
            }
            if defined[target] {
                return Err(reject(format!(
                    "factor '{}' is defined more than once",
                    generator.target()
                )));
            }

            let mut sources = Vec::with_capacity(generator.word_length());
            for source in generator.sources() {
                let idx = index_of(source)
                    .ok_or_else(|| reject(format!("unknown source factor '{source}'")))?;
                if !defined[idx] {
                    return Err(reject(format!(
                        "source factor '{source}' is not defined before this generator"
                    )));
                }
                sources.push(idx);
            }

            defined[target] = true;
            words.push(sources.iter().fold(1u64 << target, |w, &s| w | (1u64 << s)));
            columns.push((target, sources));
        }

        if let Some(missing) = defined.iter().position(|d| !d) {
            let expression = generators
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::invalid_generator(
                expression,
                format!("factor '{}' has no generator", names[missing]),
            ));
        }

        Ok(Self {
            names: names.to_vec(),
            n_base,
            generators: generators.to_vec(),
            columns,
            words,
        })
    }

    /// Factor names, base factors first.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of base factors.
    #[must_use]
    pub fn n_base(&self) -> usize {
        self.n_base
    }

    /// The validated generators, in evaluation order.
    #[must_use]
    pub fn generators(&self) -> &[GeneratorExpression] {
        &self.generators
    }

    /// `(target column, source columns)` of each generator, in evaluation order.
    pub(crate) fn columns(&self) -> &[(usize, Vec<usize>)] {
        &self.columns
    }

    /// Resolution from the generator word lengths: `1 + min |rhs|`.
    ///
    /// A design without generators (a full factorial) reports 2.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.generators
            .iter()
            .map(|g| g.word_length() as u32 + 1)
            .min()
            .unwrap_or(2)
    }

    /// Length of the shortest word in the full defining relation.
    ///
    /// Differs from [`resolution`](Self::resolution) when a product of
    /// generator words is shorter than every single word. `None` for a full
    /// factorial.
    #[must_use]
    pub fn exact_resolution(&self) -> Option<u32> {
        self.relation_words().into_iter().map(u64::count_ones).min()
    }

    /// All words of the defining relation except `I`, shortest first.
    #[must_use]
    pub fn defining_relation(&self) -> Vec<String> {
        let mut words = self.relation_words();
        sort_words(&mut words);
        words.into_iter().map(|w| self.word_name(w)).collect()
    }

    fn relation_words(&self) -> Vec<u64> {
        let p = self.words.len();
        (1u64..(1u64 << p))
            .map(|subset| {
                self.words
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| subset & (1 << i) != 0)
                    .fold(0u64, |acc, (_, w)| acc ^ w)
            })
            .collect()
    }

    /// Exact alias chain of an effect through every word of the defining relation.
    ///
    /// `effect` is written like a word: `"AB"` with single-letter factor names,
    /// `"Temp*Time"` otherwise. The effect itself is not included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if the effect names an unknown factor.
    pub fn aliases_of(&self, effect: &str) -> Result<Vec<String>> {
        let mask = self.parse_word(effect)?;
        let mut aliases: Vec<u64> = self
            .relation_words()
            .into_iter()
            .map(|w| w ^ mask)
            .filter(|&w| w != 0)
            .collect();
        sort_words(&mut aliases);
        Ok(aliases.into_iter().map(|w| self.word_name(w)).collect())
    }

    /// Alias structure derived from the generators alone.
    ///
    /// Each factor's set starts with itself. For every generator the target
    /// gains the source word, and each source gains the target combined with
    /// the remaining sources. Two-factor interactions among the first four
    /// factors are listed as aliased with themselves only; use
    /// [`aliases_of`](Self::aliases_of) for the exact chains.
    #[must_use]
    pub fn simplified_structure(&self) -> AliasStructure {
        let mut entries = Vec::new();
        for factor in 0..self.names.len() {
            let mut aliases = vec![self.names[factor].clone()];
            for (target, sources) in &self.columns {
                let word = if *target == factor {
                    Some(bits(sources.iter().copied()))
                } else if sources.contains(&factor) {
                    Some(bits(sources.iter().copied().filter(|&s| s != factor)) | (1 << target))
                } else {
                    None
                };
                if let Some(word) = word {
                    let name = self.word_name(word);
                    if !aliases.contains(&name) {
                        aliases.push(name);
                    }
                }
            }
            entries.push(AliasEntry {
                effect: self.names[factor].clone(),
                aliases,
            });
        }

        let listed = self.names.len().min(LISTED_INTERACTION_FACTORS);
        for pair in combinations(listed, 2) {
            let name = self.word_name(bits(pair));
            entries.push(AliasEntry {
                effect: name.clone(),
                aliases: vec![name],
            });
        }
        AliasStructure { entries }
    }

    fn separator(&self) -> &'static str {
        if self.names.iter().all(|n| n.chars().count() == 1) {
            ""
        } else {
            "*"
        }
    }

    fn word_name(&self, word: u64) -> String {
        (0..self.names.len())
            .filter(|&i| word & (1 << i) != 0)
            .map(|i| self.names[i].as_str())
            .collect::<Vec<_>>()
            .join(self.separator())
    }

    fn parse_word(&self, effect: &str) -> Result<u64> {
        let effect = effect.trim();
        let parts: Vec<String> = if effect.contains('*') {
            effect.split('*').map(|p| p.trim().to_string()).collect()
        } else if self.separator().is_empty() {
            effect
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect()
        } else {
            vec![effect.to_string()]
        };

        let mut mask = 0u64;
        for part in &parts {
            let idx = self
                .names
                .iter()
                .position(|n| n == part)
                .ok_or_else(|| Error::UnknownColumn(part.clone()))?;
            mask ^= 1 << idx;
        }
        if mask == 0 {
            return Err(Error::UnknownColumn(effect.to_string()));
        }
        Ok(mask)
    }
}

fn bits(columns: impl IntoIterator<Item = usize>) -> u64 {
    columns.into_iter().fold(0, |w, c| w | (1 << c))
}

/// Order words by length, then by their lowest differing factor.
fn sort_words(words: &mut [u64]) {
    words.sort_by_key(|&w| (w.count_ones(), w.reverse_bits()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(k: usize) -> Vec<String> {
        (0..k).map(|i| char::from(b'A' + i as u8).to_string()).collect()
    }

    fn gens(exprs: &[&str]) -> Vec<GeneratorExpression> {
        exprs.iter().map(|e| e.parse().unwrap()).collect()
    }

    #[test]
    fn test_resolution_from_word_lengths() {
        let r = AliasResolver::new(&letters(4), 3, &gens(&["D=ABC"])).unwrap();
        assert_eq!(r.resolution(), 4);
        assert_eq!(r.exact_resolution(), Some(4));

        let r = AliasResolver::new(&letters(3), 3, &[]).unwrap();
        assert_eq!(r.resolution(), 2);
        assert_eq!(r.exact_resolution(), None);
        assert!(r.defining_relation().is_empty());
    }

    #[test]
    fn test_exact_resolution_can_be_lower() {
        // F=ABCD, G=ABCE multiply to DEFG
        let r = AliasResolver::new(&letters(7), 5, &gens(&["F=ABCD", "G=ABCE"])).unwrap();
        assert_eq!(r.resolution(), 5);
        assert_eq!(r.exact_resolution(), Some(4));
        assert_eq!(r.defining_relation(), vec!["DEFG", "ABCDF", "ABCEG"]);
    }

    #[test]
    fn test_simplified_structure() {
        let r = AliasResolver::new(&letters(5), 3, &gens(&["D=AB", "E=AC"])).unwrap();
        let s = r.simplified_structure();

        assert_eq!(s.get("D").unwrap(), ["D", "AB"]);
        assert_eq!(s.get("E").unwrap(), ["E", "AC"]);
        assert_eq!(s.get("A").unwrap(), ["A", "BD", "CE"]);
        assert_eq!(s.get("B").unwrap(), ["B", "AD"]);
        assert_eq!(s.get("AB").unwrap(), ["AB"]);
        assert_eq!(s.len(), 5 + 6);
        assert!(s.get("BE").is_none());
    }

    #[test]
    fn test_aliases_of() {
        let r = AliasResolver::new(&letters(4), 3, &gens(&["D=ABC"])).unwrap();
        assert_eq!(r.aliases_of("AB").unwrap(), vec!["CD"]);
        assert_eq!(r.aliases_of("A").unwrap(), vec!["BCD"]);
        assert!(r.aliases_of("AZ").is_err());
    }

    #[test]
    fn test_multi_letter_names() {
        let names: Vec<String> = ["Temp", "Press", "Time"].map(String::from).to_vec();
        let r = AliasResolver::new(&names, 2, &gens(&["Time=Temp*Press"])).unwrap();
        assert_eq!(r.defining_relation(), vec!["Temp*Press*Time"]);
        assert_eq!(r.aliases_of("Temp*Press").unwrap(), vec!["Time"]);
        assert_eq!(r.simplified_structure().get("Time").unwrap(), ["Time", "Temp*Press"]);
    }

    #[test]
    fn test_later_generators_may_use_derived_factors() {
        let r = AliasResolver::new(&letters(5), 3, &gens(&["D=AB", "E=CD"])).unwrap();
        assert_eq!(r.columns()[1], (4, vec![2, 3]));
    }

    #[test]
    fn test_validation() {
        let names = letters(5);
        let invalid = |exprs: &[&str]| {
            matches!(
                AliasResolver::new(&names, 3, &gens(exprs)),
                Err(Error::InvalidGenerator { .. })
            )
        };
        assert!(invalid(&["D=AB", "C=AB"])); // base target
        assert!(invalid(&["D=AB", "D=AC"])); // defined twice
        assert!(invalid(&["D=AB", "E=AZ"])); // unknown source
        assert!(invalid(&["D=AE", "E=AB"])); // forward reference
        assert!(invalid(&["D=AB"])); // E undefined
        assert!(invalid(&["D=AB", "X=AC"])); // unknown target
    }
}
