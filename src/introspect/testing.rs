use std::ffi::CString;
use std::sync::atomic::{AtomicUsize, Ordering};

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::host::{FrameScope, HostContext};
use super::namespace::frame_namespace;

pub(crate) const FAKE_ARRAY_SOURCE: &str = r#"
class FakeDType:
    def __init__(self, name):
        self.name = name

class FakeArray:
    def __init__(self, values, shape, dtype):
        self._values = values
        self.shape = shape
        self.dtype = FakeDType(dtype)
        self.size = len(values)

    def __array__(self):
        return self._values

    @property
    def flat(self):
        return iter(self._values)

    def __float__(self):
        return float(self._values[0])

    def __int__(self):
        return int(self._values[0])

matrix = FakeArray([1, 2, 3, 4, 5, 6], (2, 3), 'int64')
scalar = FakeArray([7], (), 'float64')
int_scalar = FakeArray([5], (), 'int32')
empty = FakeArray([], (), 'float32')
"#;

pub(crate) struct ScratchHost {
    locals: Py<PyDict>,
    globals: Option<Py<PyDict>>,
    broken: bool,
    interrupts: AtomicUsize,
    closes: AtomicUsize,
}

impl ScratchHost {
    pub(crate) fn new(source: &str) -> Self {
        Python::attach(|py| Self::build(run_fresh(py, source).unbind(), None, false))
    }

    pub(crate) fn with_frames(globals_source: &str, locals_source: &str) -> Self {
        Python::attach(|py| {
            let globals = run_fresh(py, globals_source).unbind();
            let locals = run_fresh(py, locals_source).unbind();
            Self::build(locals, Some(globals), false)
        })
    }

    pub(crate) fn broken() -> Self {
        Python::attach(|py| Self::build(PyDict::new(py).unbind(), None, true))
    }

    fn build(locals: Py<PyDict>, globals: Option<Py<PyDict>>, broken: bool) -> Self {
        Self {
            locals,
            globals,
            broken,
            interrupts: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_value<R>(&self, path: &str, f: impl FnOnce(&Bound<'_, PyAny>) -> R) -> R {
        Python::attach(|py| {
            let value = frame_namespace(self, py)
                .resolve(path)
                .unwrap_or_else(|err| panic!("resolve {path}: {err}"));
            f(&value)
        })
    }

    pub(crate) fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

fn run_fresh<'py>(py: Python<'py>, source: &str) -> Bound<'py, PyDict> {
    let dict = PyDict::new(py);
    let code = CString::new(source).expect("python code cstring");
    py.run(code.as_c_str(), Some(&dict), Some(&dict))
        .expect("seed scratch namespace");
    dict
}

impl HostContext for ScratchHost {
    fn frame<'py>(&self, py: Python<'py>) -> PyResult<FrameScope<'py>> {
        if self.broken {
            return Err(PyRuntimeError::new_err("frame unavailable"));
        }
        Ok(FrameScope {
            locals: self.locals.bind(py).clone(),
            globals: self.globals.as_ref().map(|globals| globals.bind(py).clone()),
        })
    }

    fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
    }

    fn close_input(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
