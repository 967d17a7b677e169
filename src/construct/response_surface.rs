//! Response-surface designs: central composite and Box-Behnken.
//!
//! Both generators work in coded units. [`decode`] maps a coded table onto
//! physical factor ranges.

use std::fmt;

use ndarray::{s, Array2};
use rand_pcg::Pcg64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{randomize_run_order, rng_from_seed, StandardOrder};
use crate::error::{Error, Result};
use crate::factor::ensure_unique_names;
use crate::table::{DesignSummary, DesignTable, PointCounts, PointType};
use crate::utils::{coded_names, combinations};

/// Factor count above which a CCD gets a run-count warning.
const CCD_WARN_FACTORS: usize = 10;

/// Factor count above which a Box-Behnken design gets a run-count warning.
const BBD_WARN_FACTORS: usize = 7;

/// Axial distance rule of a central composite design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CcdType {
    /// α = 1: axial points on the cube faces, three levels per factor.
    FaceCentered,
    /// α = (2^k)^(1/4): constant prediction variance at equal distance.
    #[default]
    Rotatable,
    /// α chosen so that quadratic terms are estimated orthogonally.
    Orthogonal,
}

impl CcdType {
    /// Parse a design type name, falling back to rotatable for unknown text.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "face-centered" | "face-centred" | "facecentered" | "ccf" => Self::FaceCentered,
            "rotatable" => Self::Rotatable,
            "orthogonal" => Self::Orthogonal,
            other => {
                tracing::warn!(design_type = other, "unknown CCD type, using rotatable");
                Self::Rotatable
            }
        }
    }

    /// Default axial distance for `k` factors and `total_runs` runs.
    #[must_use]
    pub fn alpha(self, k: usize, total_runs: usize) -> f64 {
        let factorial = 2f64.powi(k as i32);
        match self {
            Self::FaceCentered => 1.0,
            Self::Rotatable => factorial.powf(0.25),
            Self::Orthogonal => {
                let alpha_squared = ((factorial * total_runs as f64).sqrt() - factorial) / 2.0;
                alpha_squared.max(1.0).sqrt()
            }
        }
    }
}

impl fmt::Display for CcdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FaceCentered => "face-centered",
            Self::Rotatable => "rotatable",
            Self::Orthogonal => "orthogonal",
        })
    }
}

fn resolve_names(custom: Option<&Vec<String>>, k: usize) -> Result<Vec<String>> {
    match custom {
        Some(names) if names.len() != k => Err(Error::invalid_factors(format!(
            "expected {k} factor names, got {}",
            names.len()
        ))),
        Some(names) => {
            ensure_unique_names(names.iter().map(String::as_str))?;
            Ok(names.clone())
        }
        None => Ok(coded_names(k)),
    }
}

/// Central composite design (CCD) generator.
///
/// Runs come in three blocks: the 2^k factorial corners in standard order, the
/// 2k axial points (per factor `+α` then `−α`), and the center replicates.
#[derive(Debug, Clone)]
pub struct CentralComposite {
    seed: u64,
    rng: Pcg64,
    factor_names: Option<Vec<String>>,
    randomize: bool,
}

impl CentralComposite {
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

    /// Use custom factor names instead of `x1, x2, ...`.
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

    /// Generate a CCD in coded units.
    ///
    /// `alpha` overrides the distance implied by `design_type`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRunCount`] if `k < 2` or `2^k` is too large
    /// - [`Error::InvalidFactorConfig`] for a non-finite or non-positive
    ///   `alpha`, or custom names that do not match `k`
    pub fn create_design(
        &mut self,
        k: usize,
        design_type: CcdType,
        center_points: usize,
        alpha: Option<f64>,
    ) -> Result<DesignTable> {
        if k < 2 {
            return Err(Error::invalid_run_count(format!(
                "a central composite design needs at least 2 factors (got {k})"
            )));
        }
        if k > CCD_WARN_FACTORS {
            tracing::warn!(factors = k, "CCD with this many factors requires many runs; consider screening first");
        }
        let names = resolve_names(self.factor_names.as_ref(), k)?;
        let factorial = StandardOrder::coded(k)?;

        let n_factorial = factorial.nrows();
        let n_axial = 2 * k;
        let total = n_factorial + n_axial + center_points;

        let alpha = match alpha {
            Some(a) if !a.is_finite() || a <= 0.0 => {
                return Err(Error::invalid_factors(format!(
                    "axial distance must be finite and positive (got {a})"
                )));
            }
            Some(a) => a,
            None => design_type.alpha(k, total),
        };

        let mut matrix = Array2::<f64>::zeros((total, k));
        matrix.slice_mut(s![..n_factorial, ..]).assign(&factorial);
        for factor in 0..k {
            matrix[[n_factorial + 2 * factor, factor]] = alpha;
            matrix[[n_factorial + 2 * factor + 1, factor]] = -alpha;
        }

        let point_types: Vec<PointType> = std::iter::repeat(PointType::Factorial)
            .take(n_factorial)
            .chain(std::iter::repeat(PointType::Axial).take(n_axial))
            .chain(std::iter::repeat(PointType::Center).take(center_points))
            .collect();

        let mut summary =
            DesignSummary::new(format!("Central Composite Design ({design_type})"), self.seed);
        summary.randomized = self.randomize;
        summary.alpha = Some(alpha);
        summary.point_counts = Some(PointCounts {
            factorial: n_factorial,
            axial: n_axial,
            edge: 0,
            center: center_points,
        });

        tracing::info!(
            factors = k,
            %design_type,
            alpha,
            factorial = n_factorial,
            axial = n_axial,
            center = center_points,
            runs = total,
            "CCD created"
        );

        let table = DesignTable::from_matrix(&names, &matrix, Some(&point_types), summary)?;
        Ok(if self.randomize {
            table.map_runs(|runs| randomize_run_order(runs, &mut self.rng))
        } else {
            table
        })
    }
}

/// Box-Behnken design generator.
///
/// For every pair of factors the four `(±1, ±1)` combinations are taken with
/// all other factors at the center, followed by the center replicates. No run
/// sits on a corner of the cube.
///
/// # Example
///
/// ```
/// use expdesign::construct::BoxBehnken;
///
/// let design = BoxBehnken::new(42).create_design(3, 3).unwrap();
/// assert_eq!(design.len(), 12 + 3);
/// assert!(design.runs().iter().all(|r| r.nonzero_count() <= 2));
/// ```
#[derive(Debug, Clone)]
pub struct BoxBehnken {
    seed: u64,
    rng: Pcg64,
    factor_names: Option<Vec<String>>,
    randomize: bool,
}

impl BoxBehnken {
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

    /// Use custom factor names instead of `x1, x2, ...`.
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

    /// Generate a Box-Behnken design in coded units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRunCount`] if `k < 3`, and
    /// [`Error::InvalidFactorConfig`] if custom names do not match `k`.
    pub fn create_design(&mut self, k: usize, center_points: usize) -> Result<DesignTable> {
        if k < 3 {
            return Err(Error::invalid_run_count(format!(
                "a Box-Behnken design needs at least 3 factors (got {k})"
            )));
        }
        if k > BBD_WARN_FACTORS {
            tracing::warn!(factors = k, "Box-Behnken with this many factors requires many runs");
        }
        let names = resolve_names(self.factor_names.as_ref(), k)?;

        let pairs = combinations(k, 2);
        let n_edge = 4 * pairs.len();
        let total = n_edge + center_points;

        let mut matrix = Array2::<f64>::zeros((total, k));
        for (p, pair) in pairs.iter().enumerate() {
            for (c, (a, b)) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)]
                .into_iter()
                .enumerate()
            {
                matrix[[4 * p + c, pair[0]]] = a;
                matrix[[4 * p + c, pair[1]]] = b;
            }
        }

        let point_types: Vec<PointType> = std::iter::repeat(PointType::Edge)
            .take(n_edge)
            .chain(std::iter::repeat(PointType::Center).take(center_points))
            .collect();

        let mut summary = DesignSummary::new("Box-Behnken Design", self.seed);
        summary.randomized = self.randomize;
        summary.point_counts = Some(PointCounts {
            factorial: 0,
            axial: 0,
            edge: n_edge,
            center: center_points,
        });

        tracing::info!(
            factors = k,
            edge = n_edge,
            center = center_points,
            runs = total,
            "Box-Behnken design created"
        );

        let table = DesignTable::from_matrix(&names, &matrix, Some(&point_types), summary)?;
        Ok(if self.randomize {
            table.map_runs(|runs| randomize_run_order(runs, &mut self.rng))
        } else {
            table
        })
    }
}

/// Map coded factor values onto physical ranges.
///
/// Each `(name, low, high)` entry maps `c` to `(low + high)/2 + c·(high − low)/2`,
/// so `−1` becomes `low` and `+1` becomes `high`. Factors not listed keep their
/// coded values.
///
/// # Errors
///
/// Returns [`Error::InvalidFactorConfig`] for an unknown or non-numeric factor
/// or a non-finite or empty range.
///
/// # Example
///
/// ```
/// use expdesign::construct::{decode, CentralComposite, CcdType};
///
/// let coded = CentralComposite::new(1)
///     .with_randomization(false)
///     .create_design(2, CcdType::FaceCentered, 1, None)
///     .unwrap();
/// let actual = decode(&coded, &[("x1", 100.0, 200.0)]).unwrap();
///
/// let x1: Vec<f64> = actual.column("x1").unwrap().iter().map(|l| l.as_f64().unwrap()).collect();
/// assert_eq!(&x1[..4], &[100.0, 100.0, 200.0, 200.0]);
/// assert_eq!(x1[8], 150.0);
/// ```
pub fn decode(table: &DesignTable, ranges: &[(&str, f64, f64)]) -> Result<DesignTable> {
    let mut decoded = table.clone();
    for &(name, low, high) in ranges {
        let idx = table.factor_index(name).map_err(|_| {
            Error::invalid_factors(format!("cannot decode unknown factor '{name}'"))
        })?;
        if !low.is_finite() || !high.is_finite() || low == high {
            return Err(Error::invalid_factors(format!(
                "invalid range [{low}, {high}] for factor '{name}'"
            )));
        }
        let center = (low + high) / 2.0;
        let radius = (high - low) / 2.0;
        decoded = decoded.map_numeric_levels(idx, |c| center + c * radius)?;
        tracing::debug!(factor = name, low, high, "decoded factor");
    }
    Ok(decoded)
}

/// Run counts of one response-surface design.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RsmDesignStats {
    /// Design label.
    pub design: String,
    /// Total number of runs.
    pub total_runs: usize,
    /// Cube corners.
    pub factorial_points: usize,
    /// Axial (CCD) or edge (Box-Behnken) points.
    pub axial_or_edge_points: usize,
    /// Center replicates.
    pub center_points: usize,
    /// Whether every run stays inside the factorial cube.
    pub avoids_extremes: bool,
    /// Whether the design is rotatable.
    pub rotatable: bool,
}

impl RsmDesignStats {
    fn from_table(design: &str, table: &DesignTable, avoids_extremes: bool, rotatable: bool) -> Self {
        let counts = table.summary().point_counts.unwrap_or_default();
        Self {
            design: design.to_string(),
            total_runs: table.len(),
            factorial_points: counts.factorial,
            axial_or_edge_points: counts.axial + counts.edge,
            center_points: counts.center,
            avoids_extremes,
            rotatable,
        }
    }
}

/// Side-by-side run counts of a rotatable CCD and a Box-Behnken design.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RsmComparison {
    /// Number of factors compared.
    pub factors: usize,
    /// Rotatable CCD with 5 center points.
    pub central_composite: RsmDesignStats,
    /// Box-Behnken with 3 center points; `None` below 3 factors.
    pub box_behnken: Option<RsmDesignStats>,
}

/// Compare a rotatable CCD (5 center points) with a Box-Behnken design
/// (3 center points) for `k` factors.
///
/// # Errors
///
/// Returns [`Error::InvalidRunCount`] if `k < 2`.
pub fn compare_rsm_designs(k: usize) -> Result<RsmComparison> {
    let ccd = CentralComposite::new(super::DEFAULT_SEED)
        .with_randomization(false)
        .create_design(k, CcdType::Rotatable, 5, None)?;
    let central_composite = RsmDesignStats::from_table("CCD (Rotatable)", &ccd, false, true);

    let box_behnken = if k >= 3 {
        let bbd = BoxBehnken::new(super::DEFAULT_SEED)
            .with_randomization(false)
            .create_design(k, 3)?;
        Some(RsmDesignStats::from_table("Box-Behnken", &bbd, true, false))
    } else {
        None
    };

    Ok(RsmComparison {
        factors: k,
        central_composite,
        box_behnken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Run;

    fn ccd(k: usize, design_type: CcdType, center: usize) -> DesignTable {
        CentralComposite::new(7)
            .with_randomization(false)
            .create_design(k, design_type, center, None)
            .unwrap()
    }

    #[test]
    fn test_face_centered_two_factors() {
        let table = ccd(2, CcdType::FaceCentered, 3);
        assert_eq!(table.len(), 11);
        assert_eq!(table.summary().alpha, Some(1.0));

        let m = table.numeric_matrix().unwrap();
        assert!(m.iter().all(|v| [-1.0, 0.0, 1.0].contains(v)));
        assert_eq!(m.row(4).to_vec(), vec![1.0, 0.0]);
        assert_eq!(m.row(5).to_vec(), vec![-1.0, 0.0]);
        assert_eq!(m.row(6).to_vec(), vec![0.0, 1.0]);
        assert_eq!(table.factor("x1").unwrap().num_levels(), 3);
    }

    #[test]
    fn test_rotatable_alpha_and_axial_rows() {
        let table = ccd(3, CcdType::Rotatable, 4);
        let alpha = table.summary().alpha.unwrap();
        assert!((alpha - 8f64.powf(0.25)).abs() < 1e-12);
        assert_eq!(table.len(), 8 + 6 + 4);

        for run in table.runs() {
            match run.point_type() {
                Some(PointType::Axial) => {
                    assert_eq!(run.nonzero_count(), 1);
                    let v = run.levels().iter().find_map(|l| l.as_f64().filter(|v| *v != 0.0));
                    assert!((v.unwrap().abs() - alpha).abs() < 1e-12);
                }
                Some(PointType::Center) => assert_eq!(run.nonzero_count(), 0),
                Some(PointType::Factorial) => assert_eq!(run.nonzero_count(), 3),
                other => panic!("unexpected point type {other:?}"),
            }
        }
        let counts = table.summary().point_counts.unwrap();
        assert_eq!((counts.factorial, counts.axial, counts.center), (8, 6, 4));
    }

    #[test]
    fn test_orthogonal_alpha() {
        // F = 4, N = 4 + 4 + 1 = 9: sqrt(36) = 6, (6 - 4) / 2 = 1
        assert_eq!(CcdType::Orthogonal.alpha(2, 9), 1.0);
        // F = 8, N = 8 + 6 + 6 = 20: (sqrt(160) - 8) / 2 = 2.32456
        let alpha = CcdType::Orthogonal.alpha(3, 20);
        assert!((alpha - 1.524650).abs() < 1e-5);
        // small products clamp to alpha = 1
        assert_eq!(CcdType::Orthogonal.alpha(2, 8), 1.0);
    }

    #[test]
    fn test_explicit_alpha() {
        let mut gen = CentralComposite::new(0);
        let table = gen.create_design(2, CcdType::Rotatable, 0, Some(2.0)).unwrap();
        assert_eq!(table.summary().alpha, Some(2.0));
        assert!(gen.create_design(2, CcdType::Rotatable, 0, Some(0.0)).is_err());
        assert!(gen.create_design(2, CcdType::Rotatable, 0, Some(f64::NAN)).is_err());
        assert!(matches!(
            gen.create_design(1, CcdType::Rotatable, 0, None),
            Err(Error::InvalidRunCount { .. })
        ));
    }

    #[test]
    fn test_ccd_type_parse() {
        assert_eq!(CcdType::parse("face-centered"), CcdType::FaceCentered);
        assert_eq!(CcdType::parse("Face_Centered"), CcdType::FaceCentered);
        assert_eq!(CcdType::parse("orthogonal"), CcdType::Orthogonal);
        assert_eq!(CcdType::parse("spherical"), CcdType::Rotatable);
        assert_eq!(CcdType::Orthogonal.to_string(), "orthogonal");
    }

    #[test]
    fn test_randomized_ccd_keeps_points() {
        let table = CentralComposite::new(3)
            .create_design(2, CcdType::Rotatable, 5, None)
            .unwrap();
        assert!(table.summary().randomized);
        let orders: Vec<usize> = table.runs().iter().map(Run::run_order).collect();
        assert_eq!(orders, (1..=13).collect::<Vec<_>>());

        let standard = table.in_standard_order();
        assert_eq!(standard.runs()[0].point_type(), Some(PointType::Factorial));
        assert_eq!(standard.runs()[12].point_type(), Some(PointType::Center));
    }

    #[test]
    fn test_box_behnken() {
        let table = BoxBehnken::new(1)
            .with_randomization(false)
            .create_design(4, 2)
            .unwrap();
        assert_eq!(table.len(), 4 * 6 + 2);
        assert!(table.runs().iter().all(|r| r.nonzero_count() <= 2));
        assert_eq!(table.runs()[0].levels()[0].as_f64(), Some(-1.0));
        assert_eq!(table.runs()[0].levels()[1].as_f64(), Some(-1.0));
        assert_eq!(table.runs()[0].levels()[2].as_f64(), Some(0.0));
        assert_eq!(table.runs()[25].point_type(), Some(PointType::Center));

        assert!(matches!(
            BoxBehnken::new(1).create_design(2, 3),
            Err(Error::InvalidRunCount { .. })
        ));
    }

    #[test]
    fn test_custom_names() {
        let table = BoxBehnken::new(1)
            .with_factor_names(["Temp", "Press", "Time"])
            .create_design(3, 1)
            .unwrap();
        assert_eq!(table.factor_names(), vec!["Temp", "Press", "Time"]);

        let mut bad = CentralComposite::new(1).with_factor_names(["a"]);
        assert!(bad.create_design(2, CcdType::Rotatable, 1, None).is_err());
    }

    #[test]
    fn test_decode() {
        let coded = ccd(2, CcdType::Rotatable, 1);
        let decoded = decode(&coded, &[("x1", 10.0, 20.0), ("x2", -5.0, 5.0)]).unwrap();
        let m = decoded.numeric_matrix().unwrap();
        let alpha = coded.summary().alpha.unwrap();

        assert_eq!(m.row(0).to_vec(), vec![10.0, -5.0]);
        assert!((m[[4, 0]] - (15.0 + 5.0 * alpha)).abs() < 1e-12);
        assert_eq!(m.row(8).to_vec(), vec![15.0, 0.0]);
        // the input table is untouched
        assert_eq!(coded.numeric_matrix().unwrap()[[0, 0]], -1.0);

        assert!(decode(&coded, &[("x9", 0.0, 1.0)]).is_err());
        assert!(decode(&coded, &[("x1", 0.0, f64::INFINITY)]).is_err());
        assert!(decode(&coded, &[("x1", 3.0, 3.0)]).is_err());
    }

    #[test]
    fn test_compare_rsm_designs() {
        let comparison = compare_rsm_designs(3).unwrap();
        assert_eq!(comparison.central_composite.total_runs, 8 + 6 + 5);
        let bbd = comparison.box_behnken.unwrap();
        assert_eq!(bbd.total_runs, 12 + 3);
        assert_eq!(bbd.axial_or_edge_points, 12);

        assert!(compare_rsm_designs(2).unwrap().box_behnken.is_none());
        assert!(compare_rsm_designs(1).is_err());
    }
}
