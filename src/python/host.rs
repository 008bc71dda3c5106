use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::introspect::{FrameScope, HostContext};
use crate::kernel::InputFeed;
use crate::trace::SessionTrace;

pub struct PythonHost {
    namespace: Py<PyDict>,
    feed: InputFeed,
    trace: SessionTrace,
}

impl PythonHost {
    pub(super) fn new(namespace: Py<PyDict>, feed: InputFeed, trace: SessionTrace) -> Self {
        Self {
            namespace,
            feed,
            trace,
        }
    }

    fn report_interrupt_failure(&self, err: &PyErr) {
        self.trace
            .log_kernel(&format!("unable to interrupt the kernel: {err}"));
    }
}

impl HostContext for PythonHost {
    // User code always runs at module level in `__main__`.
    fn frame<'py>(&self, py: Python<'py>) -> PyResult<FrameScope<'py>> {
        Ok(FrameScope {
            locals: self.namespace.bind(py).clone(),
            globals: None,
        })
    }

    fn interrupt(&self) {
        let sent = Python::attach(|py| -> PyResult<()> {
            PyModule::import(py, "_thread")?.call_method0("interrupt_main")?;
            Ok(())
        });
        if let Err(err) = sent {
            self.report_interrupt_failure(&err);
        }
    }

    fn close_input(&self) {
        self.feed.close();
    }
}
