use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Variable bindings of the frame the host is currently executing.
pub struct FrameScope<'py> {
    pub locals: Bound<'py, PyDict>,
    pub globals: Option<Bound<'py, PyDict>>,
}

/// What the introspector needs from the process that owns the interpreter.
///
/// The host's execution thread owns and mutates the frame namespaces; the
/// introspector only reads them from its own thread, without locking.
pub trait HostContext {
    fn frame<'py>(&self, py: Python<'py>) -> PyResult<FrameScope<'py>>;

    /// Ask the execution thread to raise a user interruption at its next
    /// interruptible point. Must not block and must not fail.
    fn interrupt(&self);

    /// Close the host's primary input so its read loop sees end-of-stream.
    fn close_input(&self);
}
