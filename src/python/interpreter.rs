use anyhow::{Result, anyhow};
use pyo3::exceptions::PyKeyboardInterrupt;
use pyo3::prelude::*;
use pyo3::types::{PyAnyMethods, PyDict, PyDictMethods, PyModule};
use std::ffi::CString;

use crate::kernel::InputFeed;
use crate::trace::SessionTrace;

use super::host::PythonHost;

const USER_FILENAME: &str = "<stdin>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub exc_type: String,
    pub message: String,
    pub traceback: String,
}

impl ExceptionInfo {
    fn keyboard_interrupt() -> Self {
        Self {
            exc_type: "KeyboardInterrupt".to_string(),
            message: String::new(),
            traceback: "KeyboardInterrupt\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRunResult {
    Evaluated { value_repr: Option<String> },
    Executed,
    Failed(ExceptionInfo),
    Exited { code: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCompleteness {
    Complete,
    Incomplete,
    Invalid,
    Interrupted,
}

pub struct PythonSession {
    main_module: Py<PyModule>,
    helpers: Py<PyDict>,
    interrupts_enabled: bool,
}

impl PythonSession {
    pub fn initialize() -> Result<Self> {
        Python::attach(|py| -> Result<Self> {
            let main_module = PyModule::import(py, "__main__")?;
            let helpers = Self::install_host_helpers(py)?;
            Self::health_check(py, &main_module)?;

            let interrupts_enabled = Self::call_helper(
                &helpers,
                "_pyreflect_install_interrupt_handler",
                (),
            )?
            .is_truthy()?;

            let session = Self {
                main_module: main_module.unbind(),
                helpers: helpers.unbind(),
                interrupts_enabled,
            };

            if !session.is_healthy() {
                anyhow::bail!("python session failed health check");
            }

            Ok(session)
        })
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    pub fn host(&self, feed: InputFeed, trace: SessionTrace) -> PythonHost {
        Python::attach(|py| {
            let namespace = self.main_module.bind(py).dict().unbind();
            PythonHost::new(namespace, feed, trace)
        })
    }

    pub fn run_user_input(&self, source: &str) -> Result<UserRunResult> {
        self.run_source(source, "hybrid", USER_FILENAME)
    }

    pub fn run_exec_input(&self, source: &str, filename: &str) -> Result<UserRunResult> {
        self.run_source(source, "exec", filename)
    }

    fn run_source(&self, source: &str, mode: &str, filename: &str) -> Result<UserRunResult> {
        Python::attach(|py| -> Result<UserRunResult> {
            let namespace = self.main_module.bind(py).dict();
            let helpers = self.helpers.bind(py);
            let result = match Self::helper(helpers, "_pyreflect_run_user_input")?
                .call1((source, namespace, mode, filename))
            {
                Ok(result) => result,
                Err(err) if err.is_instance_of::<PyKeyboardInterrupt>(py) => {
                    return Ok(UserRunResult::Failed(ExceptionInfo::keyboard_interrupt()));
                }
                Err(err) => return Err(err.into()),
            };
            let result = Self::cast_dict(&result)?;
            let kind = Self::dict_string(result, "kind")?;

            match kind.as_str() {
                "evaluated" => Ok(UserRunResult::Evaluated {
                    value_repr: Self::dict_item(result, "value_repr")?.extract()?,
                }),
                "executed" => Ok(UserRunResult::Executed),
                "exited" => Ok(UserRunResult::Exited {
                    code: Self::dict_item(result, "code")?.extract()?,
                }),
                "failed" => Ok(UserRunResult::Failed(Self::dict_exception(result)?)),
                _ => anyhow::bail!("unknown user run result kind: {kind}"),
            }
        })
    }

    pub fn check_input_completeness(&self, source: &str) -> Result<InputCompleteness> {
        Python::attach(|py| -> Result<InputCompleteness> {
            let helpers = self.helpers.bind(py);
            let result = match Self::helper(helpers, "_pyreflect_check_input_complete")?
                .call1((source,))
            {
                Ok(result) => result,
                Err(err) if err.is_instance_of::<PyKeyboardInterrupt>(py) => {
                    return Ok(InputCompleteness::Interrupted);
                }
                Err(err) => return Err(err.into()),
            };
            let result = Self::cast_dict(&result)?;
            if !Self::dict_item(result, "ok")?.extract::<bool>()? {
                let exception = Self::dict_exception(result)?;
                anyhow::bail!("{}", exception.traceback)
            }

            let status = Self::dict_string(result, "status")?;
            match status.as_str() {
                "complete" => Ok(InputCompleteness::Complete),
                "incomplete" => Ok(InputCompleteness::Incomplete),
                "invalid" => Ok(InputCompleteness::Invalid),
                "interrupted" => Ok(InputCompleteness::Interrupted),
                _ => anyhow::bail!("unknown completeness status: {status}"),
            }
        })
    }

    /// Runs any signal handler left pending while the kernel was idle.
    /// Returns true if that raised a `KeyboardInterrupt`, which is dropped.
    pub fn discard_pending_interrupt(&self) -> Result<bool> {
        Python::attach(|py| match py.check_signals() {
            Ok(()) => Ok(false),
            Err(err) if err.is_instance_of::<PyKeyboardInterrupt>(py) => Ok(true),
            Err(err) => Err(err.into()),
        })
    }

    pub fn is_healthy(&self) -> bool {
        Python::attach(|py| {
            let main = self.main_module.bind(py);
            Self::health_check(py, main).is_ok()
        })
    }

    fn health_check(py: Python<'_>, main_module: &Bound<'_, PyModule>) -> PyResult<()> {
        let globals = main_module.dict();
        let _ = py.eval(c"1 + 1", Some(&globals), Some(&globals))?;
        Ok(())
    }

    fn install_host_helpers(py: Python<'_>) -> Result<Bound<'_, PyDict>> {
        let helpers = PyDict::new(py);
        let helper_code = CString::new(include_str!("host_helpers.py"))?;
        py.run(helper_code.as_c_str(), Some(&helpers), None)?;
        Ok(helpers)
    }

    /// Makes every later completeness check behave as if interrupted.
    #[cfg(test)]
    pub(crate) fn interrupt_completeness_checks(&self) {
        Python::attach(|py| {
            let scope = PyDict::new(py);
            py.run(
                c"class InterruptingCodeop:\n    @staticmethod\n    def compile_command(*args):\n        raise KeyboardInterrupt\n",
                Some(&scope),
                None,
            )
            .expect("define interrupting codeop");
            let codeop = scope
                .get_item("InterruptingCodeop")
                .expect("lookup")
                .expect("class defined");
            self.helpers
                .bind(py)
                .set_item("codeop", codeop)
                .expect("patch codeop");
        });
    }

    fn helper<'py>(helpers: &Bound<'py, PyDict>, helper_name: &str) -> Result<Bound<'py, PyAny>> {
        helpers
            .get_item(helper_name)?
            .ok_or_else(|| anyhow!("missing host helper {helper_name}"))
    }

    fn call_helper<'py, A>(
        helpers: &Bound<'py, PyDict>,
        helper_name: &str,
        args: A,
    ) -> Result<Bound<'py, PyAny>>
    where
        A: pyo3::call::PyCallArgs<'py>,
    {
        Ok(Self::helper(helpers, helper_name)?.call1(args)?)
    }

    fn dict_item<'py>(dict: &Bound<'py, PyDict>, key: &str) -> Result<Bound<'py, PyAny>> {
        dict.get_item(key)?
            .ok_or_else(|| anyhow!("missing {key} in helper result"))
    }

    fn dict_string(dict: &Bound<'_, PyDict>, key: &str) -> Result<String> {
        Ok(Self::dict_item(dict, key)?.extract()?)
    }

    fn dict_exception(dict: &Bound<'_, PyDict>) -> Result<ExceptionInfo> {
        let exception = Self::dict_item(dict, "exception")?;
        let exception = Self::cast_dict(&exception)?;
        Ok(ExceptionInfo {
            exc_type: Self::dict_string(exception, "exc_type")?,
            message: Self::dict_string(exception, "message")?,
            traceback: Self::dict_string(exception, "traceback")?,
        })
    }

    fn cast_dict<'a, 'py>(value: &'a Bound<'py, PyAny>) -> Result<&'a Bound<'py, PyDict>> {
        value
            .cast::<PyDict>()
            .map_err(|err| anyhow!(err.to_string()))
    }
}
