//! Two-level fractional factorial designs.

use ndarray::{s, Array2};
use rand_pcg::Pcg64;

use super::alias::{AliasResolver, MAX_FRACTIONAL_FACTORS};
use super::{randomize_run_order, rng_from_seed, StandardOrder};
use crate::catalogue;
use crate::error::{Error, Result};
use crate::factor::{ensure_unique_names, GeneratorExpression};
use crate::table::{DesignSummary, DesignTable};
use crate::utils::{factor_letter, log2_exact};

/// Smallest supported fraction size: one base factor.
const MIN_RUNS: usize = 2;

/// 2^(k-p) fractional factorial generator.
///
/// The first `k − p` factors form a full two-level factorial in standard order;
/// each remaining factor is the product of other columns as given by a
/// [`GeneratorExpression`]. Without explicit generators the catalogue set for
/// `(k, p)` is used, and failing that a Resolution III set is synthesized.
///
/// # Example
///
/// ```
/// use expdesign::construct::FractionalFactorial;
///
/// let design = FractionalFactorial::new(42).create_design(5, 8, None).unwrap();
///
/// let summary = design.summary();
/// assert_eq!(summary.generators, vec!["D=AB", "E=AC"]);
/// assert_eq!(summary.resolution, Some(3));
/// let aliases = summary.alias_structure.as_ref().unwrap();
/// assert_eq!(aliases.get("D").unwrap(), ["D", "AB"]);
/// ```
#[derive(Debug, Clone)]
pub struct FractionalFactorial {
    seed: u64,
    rng: Pcg64,
    factor_names: Option<Vec<String>>,
    randomize: bool,
}

impl FractionalFactorial {
    /// Create a generator with its own random stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: rng_from_seed(seed),
            factor_names: None,
            randomize: true,
        }
    }

    /// Use custom factor names instead of `A, B, C, ...`.
    #[must_use]
    pub fn with_factor_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.factor_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable run-order randomization (default: enabled).
    #[must_use]
    pub fn with_randomization(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }

    /// Seed of the generator's random stream.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a `2^(k-p)` design with `run_count = 2^(k-p)` runs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRunCount`] if `run_count` is not a power of two, is
    ///   below 2 or above `2^k`, or `k` is out of range
    /// - [`Error::InvalidFactorConfig`] if custom names do not match `k`
    /// - [`Error::InvalidGenerator`] if a generator is inconsistent with the factors
    pub fn create_design(
        &mut self,
        k: usize,
        run_count: usize,
        generators: Option<&[GeneratorExpression]>,
    ) -> Result<DesignTable> {
        let names = self.resolve_names(k)?;

        let m = log2_exact(run_count)
            .ok_or_else(|| {
                Error::invalid_run_count(format!("run count must be a power of 2 (got {run_count})"))
            })? as usize;
        if run_count < MIN_RUNS {
            return Err(Error::invalid_run_count(format!(
                "run count must be at least {MIN_RUNS} (got {run_count})"
            )));
        }
        if m > k {
            return Err(Error::invalid_run_count(format!(
                "run count {run_count} exceeds the full factorial size 2^{k}"
            )));
        }
        let n_base = m;
        let p = k - n_base;

        let generators = match generators {
            Some(explicit) => explicit.to_vec(),
            None => match catalogue::generators_for(k, p) {
                Some(standard) => catalogue::map_letters(standard, &names)?,
                None if p == 0 => Vec::new(),
                None => fallback_generators(&names, n_base, p)?,
            },
        };
        let resolver = AliasResolver::new(&names, n_base, &generators)?;

        let mut matrix = Array2::<f64>::zeros((run_count, k));
        matrix
            .slice_mut(s![.., ..n_base])
            .assign(&StandardOrder::coded(n_base)?);
        for (target, sources) in resolver.columns() {
            for mut row in matrix.rows_mut() {
                let value: f64 = sources.iter().map(|&s| row[s]).product();
                row[*target] = value;
            }
        }

        let resolution = resolver.resolution();
        let mut summary = DesignSummary::new(format!("2^({k}-{p}) Fractional Factorial"), self.seed);
        summary.randomized = self.randomize;
        summary.resolution = Some(resolution);
        summary.generators = resolver.generators().iter().map(ToString::to_string).collect();
        summary.alias_structure = Some(resolver.simplified_structure());

        tracing::info!(
            factors = k,
            base_factors = n_base,
            fraction = 1usize << p,
            runs = run_count,
            resolution,
            generators = %summary.generators.join(", "),
            "fractional factorial created"
        );

        let table = DesignTable::from_matrix(&names, &matrix, None, summary)?;
        Ok(if self.randomize {
            table.map_runs(|runs| randomize_run_order(runs, &mut self.rng))
        } else {
            table
        })
    }

    fn resolve_names(&self, k: usize) -> Result<Vec<String>> {
        if k < 2 {
            return Err(Error::invalid_run_count(format!(
                "a fractional factorial needs at least 2 factors (got {k})"
            )));
        }
        if k > MAX_FRACTIONAL_FACTORS {
            return Err(Error::invalid_run_count(format!(
                "{k} factors exceeds the maximum of {MAX_FRACTIONAL_FACTORS}"
            )));
        }
        match &self.factor_names {
            Some(names) if names.len() != k => Err(Error::invalid_factors(format!(
                "expected {k} factor names, got {}",
                names.len()
            ))),
            Some(names) => {
                if names.iter().any(|n| n.trim().is_empty() || n.contains(['*', '='])) {
                    return Err(Error::invalid_factors(
                        "factor names must be non-empty and must not contain '*' or '='",
                    ));
                }
                ensure_unique_names(names.iter().map(String::as_str))?;
                Ok(names.clone())
            }
            None => (0..k)
                .map(|i| {
                    factor_letter(i).ok_or_else(|| {
                        Error::invalid_run_count(format!(
                            "{k} factors need custom names (only A to Z are generated)"
                        ))
                    })
                })
                .collect(),
        }
    }
}

/// Resolution III generators pairing consecutive base factors.
///
/// Used when the catalogue has no entry for `(k, p)`. With a single base
/// factor every derived factor copies it (Resolution II).
fn fallback_generators(
    names: &[String],
    n_base: usize,
    p: usize,
) -> Result<Vec<GeneratorExpression>> {
    tracing::warn!(
        factors = names.len(),
        fraction = p,
        "no catalogue generators for this design; using Resolution III generators"
    );
    (0..p)
        .map(|i| {
            let sources = match n_base {
                1 => vec![names[0].clone()],
                _ if i + 1 < n_base => vec![names[i].clone(), names[i + 1].clone()],
                _ => vec![names[0].clone(), names[1].clone()],
            };
            GeneratorExpression::new(names[n_base + i].clone(), sources)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Run;

    fn column(table: &DesignTable, name: &str) -> Vec<f64> {
        table
            .column(name)
            .unwrap()
            .into_iter()
            .map(|l| l.as_f64().unwrap())
            .collect()
    }

    #[test]
    fn test_default_five_factor_eighth() {
        let table = FractionalFactorial::new(1)
            .with_randomization(false)
            .create_design(5, 8, None)
            .unwrap();

        assert_eq!(table.len(), 8);
        assert_eq!(table.summary().design_type, "2^(5-2) Fractional Factorial");
        assert_eq!(table.summary().resolution, Some(3));

        let (a, b, c) = (column(&table, "A"), column(&table, "B"), column(&table, "C"));
        let (d, e) = (column(&table, "D"), column(&table, "E"));
        for i in 0..8 {
            assert_eq!(d[i], a[i] * b[i]);
            assert_eq!(e[i], a[i] * c[i]);
        }
        // base factors in Yates order
        assert_eq!(a, vec![-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(c, vec![-1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0]);
    }

    #[test]
    fn test_half_fraction_defining_relation_holds() {
        let table = FractionalFactorial::new(3).create_design(4, 8, None).unwrap();
        let m = table.numeric_matrix().unwrap();
        for row in m.rows() {
            assert_eq!(row.product(), 1.0);
        }
        assert_eq!(table.summary().resolution, Some(4));
        let orders: Vec<usize> = table.runs().iter().map(Run::run_order).collect();
        assert_eq!(orders, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_every_column_is_balanced() {
        let table = FractionalFactorial::new(5).create_design(7, 16, None).unwrap();
        let m = table.numeric_matrix().unwrap();
        for col in m.columns() {
            assert_eq!(col.sum(), 0.0);
        }
    }

    #[test]
    fn test_explicit_generators_with_names() {
        let generators: Vec<GeneratorExpression> = vec!["Time=Temp*Press".parse().unwrap()];
        let table = FractionalFactorial::new(2)
            .with_factor_names(["Temp", "Press", "Time"])
            .with_randomization(false)
            .create_design(3, 4, Some(&generators))
            .unwrap();

        assert_eq!(table.factor_names(), vec!["Temp", "Press", "Time"]);
        assert_eq!(table.summary().generators, vec!["Time=Temp*Press"]);
        let structure = table.summary().alias_structure.as_ref().unwrap();
        assert_eq!(structure.get("Temp").unwrap(), ["Temp", "Press*Time"]);
    }

    #[test]
    fn test_catalogue_generators_follow_custom_names() {
        let table = FractionalFactorial::new(2)
            .with_factor_names(["w", "x", "y", "z"])
            .create_design(4, 8, None)
            .unwrap();
        assert_eq!(table.summary().generators, vec!["z=wxy"]);
    }

    #[test]
    fn test_fallback_generators() {
        let table = FractionalFactorial::new(2).create_design(9, 32, None).unwrap();
        assert_eq!(
            table.summary().generators,
            vec!["F=AB", "G=BC", "H=CD", "I=DE"]
        );
        assert_eq!(table.summary().resolution, Some(3));

        let table = FractionalFactorial::new(2).create_design(6, 4, None).unwrap();
        assert_eq!(
            table.summary().generators,
            vec!["C=AB", "D=AB", "E=AB", "F=AB"]
        );
    }

    #[test]
    fn test_two_run_fraction() {
        let generators: Vec<GeneratorExpression> = vec!["B=A".parse().unwrap()];
        let table = FractionalFactorial::new(0)
            .with_randomization(false)
            .create_design(2, 2, Some(&generators))
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.summary().resolution, Some(2));
        let m = table.numeric_matrix().unwrap();
        assert_eq!(m.row(0).to_vec(), vec![-1.0, -1.0]);
        assert_eq!(m.row(1).to_vec(), vec![1.0, 1.0]);

        let table = FractionalFactorial::new(0).create_design(3, 2, None).unwrap();
        assert_eq!(table.summary().generators, vec!["B=A", "C=A"]);
    }

    #[test]
    fn test_full_fraction_has_no_generators() {
        let table = FractionalFactorial::new(2).create_design(3, 8, None).unwrap();
        assert!(table.summary().generators.is_empty());
        assert_eq!(table.summary().resolution, Some(2));
        assert_eq!(table.summary().design_type, "2^(3-0) Fractional Factorial");
    }

    #[test]
    fn test_invalid_requests() {
        let mut gen = FractionalFactorial::new(0);
        let run_count_error = |r: Result<DesignTable>| matches!(r, Err(Error::InvalidRunCount { .. }));

        assert!(run_count_error(gen.create_design(5, 12, None)));
        assert!(run_count_error(gen.create_design(5, 64, None)));
        assert!(run_count_error(gen.create_design(5, 1, None)));
        assert!(run_count_error(gen.create_design(1, 4, None)));
        assert!(run_count_error(gen.create_design(27, 8, None)));

        let bad: Vec<GeneratorExpression> = vec!["D=AB".parse().unwrap(), "E=AZ".parse().unwrap()];
        assert!(matches!(
            gen.create_design(5, 8, Some(&bad)),
            Err(Error::InvalidGenerator { .. })
        ));

        let mut named = FractionalFactorial::new(0).with_factor_names(["x", "y"]);
        assert!(matches!(
            named.create_design(3, 4, None),
            Err(Error::InvalidFactorConfig { .. })
        ));
    }

    #[test]
    fn test_same_seed_same_design() {
        let a = FractionalFactorial::new(11).create_design(6, 16, None).unwrap();
        let b = FractionalFactorial::new(11).create_design(6, 16, None).unwrap();
        assert_eq!(a, b);
    }
}
