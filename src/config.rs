//! JSON experiment configuration.
//!
//! An [`ExperimentConfig`] names a design and its parameters in one document,
//! so a design can be regenerated from a stored file:
//!
//! ```
//! use expdesign::config::ExperimentConfig;
//!
//! let config = ExperimentConfig::from_json(
//!     r#"{ "design": "fractional_factorial", "factors": 5, "runs": 8, "seed": 7 }"#,
//! )
//! .unwrap();
//! let design = config.build(None).unwrap();
//! assert_eq!(design.len(), 8);
//! assert_eq!(design.summary().seed, 7);
//! ```
//!
//! Unit-based designs (CRD, RBD) take the unit pool as an argument of
//! [`ExperimentConfig::build`]; the configuration only names the columns.

use serde::{Deserialize, Serialize};

use crate::construct::{
    BoxBehnken, CcdType, CentralComposite, CompletelyRandomized, FractionalFactorial,
    FullFactorial, RandomizedBlock, DEFAULT_SEED, DEFAULT_TREATMENT_COLUMN,
};
use crate::error::{Error, Result};
use crate::factor::{Factor, GeneratorExpression, Level};
use crate::table::DesignTable;
use crate::units::UnitPool;

/// A factor declaration: name plus ordered levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorConfig {
    /// Factor name.
    pub name: String,
    /// Levels in declaration order; numbers become numeric levels.
    pub levels: Vec<Level>,
}

/// Design type and its parameters, tagged by `"design"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "design", rename_all = "snake_case")]
pub enum DesignConfig {
    /// Completely randomized design over a unit pool.
    #[allow(missing_docs)]
    CompletelyRandomized {
        treatments: Vec<String>,
        #[serde(default)]
        sample_sizes: Option<Vec<usize>>,
        #[serde(default = "DesignConfig::default_true")]
        balance_check: bool,
        #[serde(default = "DesignConfig::default_treatment_column")]
        treatment_column: String,
    },
    /// Randomized block design over a unit pool.
    #[allow(missing_docs)]
    RandomizedBlock {
        treatments: Vec<String>,
        block_column: String,
        #[serde(default = "DesignConfig::default_replications")]
        replications: usize,
        #[serde(default = "DesignConfig::default_true")]
        check_completeness: bool,
        #[serde(default = "DesignConfig::default_treatment_column")]
        treatment_column: String,
    },
    /// Full factorial over declared factors.
    #[allow(missing_docs)]
    FullFactorial {
        factors: Vec<FactorConfig>,
        #[serde(default = "DesignConfig::default_replications")]
        replications: usize,
        #[serde(default = "DesignConfig::default_true")]
        randomize: bool,
    },
    /// Two-level 2^(k-p) fraction.
    #[allow(missing_docs)]
    FractionalFactorial {
        factors: usize,
        runs: usize,
        #[serde(default)]
        generators: Option<Vec<GeneratorExpression>>,
        #[serde(default)]
        factor_names: Option<Vec<String>>,
        #[serde(default = "DesignConfig::default_true")]
        randomize: bool,
    },
    /// Central composite design in coded units.
    #[allow(missing_docs)]
    CentralComposite {
        factors: usize,
        #[serde(default)]
        ccd_type: CcdType,
        #[serde(default = "DesignConfig::default_ccd_center_points")]
        center_points: usize,
        #[serde(default)]
        alpha: Option<f64>,
        #[serde(default)]
        factor_names: Option<Vec<String>>,
        #[serde(default = "DesignConfig::default_true")]
        randomize: bool,
    },
    /// Box-Behnken design in coded units.
    #[allow(missing_docs)]
    BoxBehnken {
        factors: usize,
        #[serde(default = "DesignConfig::default_bbd_center_points")]
        center_points: usize,
        #[serde(default)]
        factor_names: Option<Vec<String>>,
        #[serde(default = "DesignConfig::default_true")]
        randomize: bool,
    },
}

impl DesignConfig {
    const fn default_true() -> bool {
        true
    }

    const fn default_replications() -> usize {
        1
    }

    const fn default_ccd_center_points() -> usize {
        5
    }

    const fn default_bbd_center_points() -> usize {
        3
    }

    fn default_treatment_column() -> String {
        DEFAULT_TREATMENT_COLUMN.to_string()
    }

    /// Whether the design allocates treatments to a unit pool.
    #[must_use]
    pub fn requires_units(&self) -> bool {
        matches!(
            self,
            Self::CompletelyRandomized { .. } | Self::RandomizedBlock { .. }
        )
    }
}

/// A complete, reproducible experiment description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Seed of the generator's random stream (default 42).
    #[serde(default = "ExperimentConfig::default_seed")]
    pub seed: u64,
    /// The design and its parameters.
    #[serde(flatten)]
    pub design: DesignConfig,
}

impl ExperimentConfig {
    const fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed JSON, an unknown design or an
    /// invalid field (including a malformed generator expression).
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::config(e.to_string()))
    }

    /// Render the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Generate the configured design.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a unit-based design is built without a
    /// unit pool, and otherwise whatever the generator returns.
    pub fn build(&self, units: Option<&UnitPool>) -> Result<DesignTable> {
        let pool = || {
            units.ok_or_else(|| Error::config("this design needs a unit pool to allocate treatments"))
        };
        tracing::debug!(seed = self.seed, "building design from configuration");

        match &self.design {
            DesignConfig::CompletelyRandomized {
                treatments,
                sample_sizes,
                balance_check,
                treatment_column,
            } => CompletelyRandomized::new(self.seed)
                .with_balance_check(*balance_check)
                .with_treatment_column(treatment_column.clone())
                .create_design(pool()?, treatments, sample_sizes.as_deref()),
            DesignConfig::RandomizedBlock {
                treatments,
                block_column,
                replications,
                check_completeness,
                treatment_column,
            } => RandomizedBlock::new(self.seed)
                .with_check_completeness(*check_completeness)
                .with_treatment_column(treatment_column.clone())
                .create_design(pool()?, treatments, block_column, *replications),
            DesignConfig::FullFactorial {
                factors,
                replications,
                randomize,
            } => {
                let factors = factors
                    .iter()
                    .map(|f| Factor::new(f.name.clone(), f.levels.clone()))
                    .collect::<Result<Vec<_>>>()?;
                FullFactorial::new(self.seed).create_design(factors, *replications, *randomize)
            }
            DesignConfig::FractionalFactorial {
                factors,
                runs,
                generators,
                factor_names,
                randomize,
            } => {
                let mut generator = FractionalFactorial::new(self.seed).with_randomization(*randomize);
                if let Some(names) = factor_names {
                    generator = generator.with_factor_names(names.clone());
                }
                generator.create_design(*factors, *runs, generators.as_deref())
            }
            DesignConfig::CentralComposite {
                factors,
                ccd_type,
                center_points,
                alpha,
                factor_names,
                randomize,
            } => {
                let mut generator = CentralComposite::new(self.seed).with_randomization(*randomize);
                if let Some(names) = factor_names {
                    generator = generator.with_factor_names(names.clone());
                }
                generator.create_design(*factors, *ccd_type, *center_points, *alpha)
            }
            DesignConfig::BoxBehnken {
                factors,
                center_points,
                factor_names,
                randomize,
            } => {
                let mut generator = BoxBehnken::new(self.seed).with_randomization(*randomize);
                if let Some(names) = factor_names {
                    generator = generator.with_factor_names(names.clone());
                }
                generator.create_design(*factors, *center_points)
            }
        }
    }
}
