mod host;
mod interpreter;

pub use host::PythonHost;
pub use interpreter::{ExceptionInfo, InputCompleteness, PythonSession, UserRunResult};
