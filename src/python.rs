//! Python bindings for expdesign.
//!
//! This module exposes the design generators to Python using PyO3. Enable the
//! `python` feature to use this.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyList;

use crate::construct::{
    BoxBehnken, CcdType, CentralComposite, CompletelyRandomized, FractionalFactorial,
    FullFactorial, DEFAULT_SEED,
};
use crate::error::Error;
use crate::factor::{Factor, GeneratorExpression};
use crate::table::DesignTable;
use crate::units::UnitPool;

fn to_py_err(err: Error) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Python wrapper for a design table.
#[pyclass(name = "Design")]
pub struct PyDesign {
    inner: DesignTable,
}

#[pymethods]
impl PyDesign {
    /// Get the number of runs.
    #[getter]
    fn runs(&self) -> usize {
        self.inner.len()
    }

    /// Get the design type name.
    #[getter]
    fn design_type(&self) -> String {
        self.inner.summary().design_type.clone()
    }

    /// Get the factor names.
    #[getter]
    fn factors(&self) -> Vec<String> {
        self.inner.factor_names().into_iter().map(String::from).collect()
    }

    /// Resolution of a fractional factorial design.
    #[getter]
    fn resolution(&self) -> Option<u32> {
        self.inner.summary().resolution
    }

    /// Axial distance of a central composite design.
    #[getter]
    fn alpha(&self) -> Option<f64> {
        self.inner.summary().alpha
    }

    /// Generator expressions of a fractional factorial design.
    #[getter]
    fn generators(&self) -> Vec<String> {
        self.inner.summary().generators.clone()
    }

    /// Column names of the flat record stream.
    fn header(&self) -> Vec<String> {
        self.inner.header()
    }

    /// The table as a list of rows of strings.
    fn records(&self, py: Python<'_>) -> PyResult<PyObject> {
        let list = PyList::empty(py);
        for record in self.inner.records() {
            list.append(PyList::new(py, record))?;
        }
        Ok(list.into())
    }

    /// The table rendered as CSV text.
    fn to_csv(&self) -> PyResult<String> {
        let mut buffer = Vec::new();
        self.inner.write_csv(&mut buffer).map_err(to_py_err)?;
        String::from_utf8(buffer).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("Design('{}', runs={})", self.inner.summary().design_type, self.inner.len())
    }
}

/// Construct a completely randomized design over the given unit ids.
#[pyfunction]
#[pyo3(signature = (unit_ids, treatments, sample_sizes=None, seed=DEFAULT_SEED))]
fn completely_randomized(
    unit_ids: Vec<String>,
    treatments: Vec<String>,
    sample_sizes: Option<Vec<usize>>,
    seed: u64,
) -> PyResult<PyDesign> {
    let pool = UnitPool::new("unit_id", unit_ids).map_err(to_py_err)?;
    let inner = CompletelyRandomized::new(seed)
        .create_design(&pool, &treatments, sample_sizes.as_deref())
        .map_err(to_py_err)?;
    Ok(PyDesign { inner })
}

/// Construct a full factorial design from `(name, levels)` pairs.
#[pyfunction]
#[pyo3(signature = (factors, replications=1, randomize=true, seed=DEFAULT_SEED))]
fn full_factorial(
    factors: Vec<(String, Vec<String>)>,
    replications: usize,
    randomize: bool,
    seed: u64,
) -> PyResult<PyDesign> {
    let factors = factors
        .into_iter()
        .map(|(name, levels)| Factor::new(name, levels))
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_py_err)?;
    let inner = FullFactorial::new(seed)
        .create_design(factors, replications, randomize)
        .map_err(to_py_err)?;
    Ok(PyDesign { inner })
}

/// Construct a 2^(k-p) fractional factorial design.
#[pyfunction]
#[pyo3(signature = (factors, runs, generators=None, randomize=true, seed=DEFAULT_SEED))]
fn fractional_factorial(
    factors: usize,
    runs: usize,
    generators: Option<Vec<String>>,
    randomize: bool,
    seed: u64,
) -> PyResult<PyDesign> {
    let generators = generators
        .map(|exprs| {
            exprs
                .iter()
                .map(|e| e.parse::<GeneratorExpression>())
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .map_err(to_py_err)?;
    let inner = FractionalFactorial::new(seed)
        .with_randomization(randomize)
        .create_design(factors, runs, generators.as_deref())
        .map_err(to_py_err)?;
    Ok(PyDesign { inner })
}

/// Construct a central composite design in coded units.
#[pyfunction]
#[pyo3(signature = (factors, design_type="rotatable", center_points=5, alpha=None, seed=DEFAULT_SEED))]
fn central_composite(
    factors: usize,
    design_type: &str,
    center_points: usize,
    alpha: Option<f64>,
    seed: u64,
) -> PyResult<PyDesign> {
    let inner = CentralComposite::new(seed)
        .create_design(factors, CcdType::parse(design_type), center_points, alpha)
        .map_err(to_py_err)?;
    Ok(PyDesign { inner })
}

/// Construct a Box-Behnken design in coded units.
#[pyfunction]
#[pyo3(signature = (factors, center_points=3, seed=DEFAULT_SEED))]
fn box_behnken(factors: usize, center_points: usize, seed: u64) -> PyResult<PyDesign> {
    let inner = BoxBehnken::new(seed)
        .create_design(factors, center_points)
        .map_err(to_py_err)?;
    Ok(PyDesign { inner })
}

/// Build a named common fractional factorial design.
#[pyfunction]
fn common_design(name: &str) -> PyResult<PyDesign> {
    let inner = crate::catalogue::get_by_name(name).map_err(to_py_err)?;
    Ok(PyDesign { inner })
}

/// The expdesign Python module.
#[pymodule]
fn expdesign(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyDesign>()?;
    m.add_function(wrap_pyfunction!(completely_randomized, m)?)?;
    m.add_function(wrap_pyfunction!(full_factorial, m)?)?;
    m.add_function(wrap_pyfunction!(fractional_factorial, m)?)?;
    m.add_function(wrap_pyfunction!(central_composite, m)?)?;
    m.add_function(wrap_pyfunction!(box_behnken, m)?)?;
    m.add_function(wrap_pyfunction!(common_design, m)?)?;
    m.add("COMMON_DESIGNS", crate::catalogue::list_common_designs())?;
    Ok(())
}
