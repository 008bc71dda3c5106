use std::ffi::CString;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyString};

use super::namespace::Namespace;

pub const EVAL_ERROR_PREFIX: &str = "Error evaluating: ";

#[derive(Debug)]
pub enum Evaluation {
    Value(Py<PyAny>),
    Failed(String),
}

impl Evaluation {
    pub fn failed(expression: &str) -> Self {
        Self::Failed(format!("{EVAL_ERROR_PREFIX}{expression}"))
    }

    pub fn bind<'py>(&self, py: Python<'py>) -> Bound<'py, PyAny> {
        match self {
            Self::Value(value) => value.bind(py).clone(),
            Self::Failed(message) => PyString::new(py, message).into_any(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

pub fn evaluate<'py>(ns: &Namespace<'py>, expression: &str) -> PyResult<Bound<'py, PyAny>> {
    let py = ns.py();
    let source = CString::new(expression.trim_start_matches([' ', '\t']))
        .map_err(|_| PyValueError::new_err("expression contains a NUL byte"))?;
    let scope = PyDict::new(py);
    py.eval(source.as_c_str(), Some(&scope), Some(ns.entries()))
}
