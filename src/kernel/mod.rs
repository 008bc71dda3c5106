mod input;

use anyhow::Result;
use std::io::Write;

use crate::python::{InputCompleteness, PythonSession, UserRunResult};
use crate::trace::SessionTrace;

pub use input::{InputChannel, InputFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    EndOfInput,
    Exited(i32),
}

impl HostExit {
    pub fn code(self) -> i32 {
        match self {
            Self::EndOfInput => 0,
            Self::Exited(code) => code,
        }
    }
}

/// Must run on the interpreter's main thread for interrupts to land in user
/// code.
pub fn run_host_loop<O, E>(
    python: &PythonSession,
    input: &mut InputChannel,
    trace: &SessionTrace,
    out: &mut O,
    err: &mut E,
) -> Result<HostExit>
where
    O: Write,
    E: Write,
{
    let mut buffer: Vec<String> = Vec::new();

    loop {
        let Some(line) = input.recv_blocking() else {
            trace.log_kernel("input closed");
            if !buffer.is_empty() {
                let source = buffer.join("\n");
                if let Some(exit) = run_block(python, &source, trace, out, err)? {
                    return Ok(exit);
                }
            }
            return Ok(HostExit::EndOfInput);
        };

        if python.discard_pending_interrupt()? {
            trace.log_kernel("interrupt received while idle: ignored");
        }

        if buffer.is_empty() && line.trim().is_empty() {
            continue;
        }
        buffer.push(line);

        let source = buffer.join("\n");
        match python.check_input_completeness(&source)? {
            InputCompleteness::Incomplete => continue,
            InputCompleteness::Interrupted => {
                buffer.clear();
                report_interrupted_input(trace, err)?;
                continue;
            }
            InputCompleteness::Complete | InputCompleteness::Invalid => {}
        }
        buffer.clear();

        if let Some(exit) = run_block(python, &source, trace, out, err)? {
            return Ok(exit);
        }
    }
}

fn report_interrupted_input<E: Write>(trace: &SessionTrace, err: &mut E) -> Result<()> {
    const MESSAGE: &str = "KeyboardInterrupt\n";
    write!(err, "{MESSAGE}")?;
    err.flush()?;
    trace.log_output("py.err", MESSAGE);
    Ok(())
}

fn run_block<O, E>(
    python: &PythonSession,
    source: &str,
    trace: &SessionTrace,
    out: &mut O,
    err: &mut E,
) -> Result<Option<HostExit>>
where
    O: Write,
    E: Write,
{
    trace.log_input_python(source);

    match python.run_user_input(source)? {
        UserRunResult::Evaluated {
            value_repr: Some(repr),
        } => {
            writeln!(out, "{repr}")?;
            out.flush()?;
            trace.log_output("py.out", &repr);
        }
        UserRunResult::Evaluated { value_repr: None } | UserRunResult::Executed => {}
        UserRunResult::Failed(exception) => {
            write!(err, "{}", exception.traceback)?;
            err.flush()?;
            trace.log_output("py.err", &exception.traceback);
        }
        UserRunResult::Exited { code } => {
            trace.log_kernel(&format!("user code exited with status {code}"));
            return Ok(Some(HostExit::Exited(code)));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::{HostExit, InputChannel, run_host_loop};
    use crate::python::PythonSession;
    use crate::trace::SessionTrace;

    fn run_lines(python: &PythonSession, lines: &[&str]) -> (HostExit, String, String) {
        let (mut input, feed) = InputChannel::pair();
        for line in lines {
            feed.push((*line).to_string());
        }
        feed.close();

        let mut out = Vec::new();
        let mut err = Vec::new();
        let exit = run_host_loop(python, &mut input, &SessionTrace::disabled(), &mut out, &mut err)
            .expect("host loop");
        (
            exit,
            String::from_utf8(out).expect("utf-8 stdout"),
            String::from_utf8(err).expect("utf-8 stderr"),
        )
    }

    #[test]
    fn echoes_values_and_skips_none() {
        let python = PythonSession::initialize().expect("python session");
        let (exit, out, err) = run_lines(&python, &["loop_value = 20", "loop_value + 1", "None"]);
        assert_eq!(exit, HostExit::EndOfInput);
        assert_eq!(out, "21\n");
        assert_eq!(err, "");
    }

    #[test]
    fn blocks_run_after_blank_line() {
        let python = PythonSession::initialize().expect("python session");
        let (_, out, _) = run_lines(
            &python,
            &["def loop_double(x):", "    return x * 2", "", "loop_double(4)"],
        );
        assert_eq!(out, "8\n");
    }

    #[test]
    fn unfinished_block_runs_at_end_of_input() {
        let python = PythonSession::initialize().expect("python session");
        run_lines(&python, &["def loop_tail():", "    return 'tail'"]);
        let (_, out, _) = run_lines(&python, &["loop_tail()"]);
        assert_eq!(out, "'tail'\n");
    }

    #[test]
    fn errors_go_to_stderr_and_loop_continues() {
        let python = PythonSession::initialize().expect("python session");
        let (exit, out, err) = run_lines(&python, &["1 / 0", "if True", "2 + 2"]);
        assert_eq!(exit, HostExit::EndOfInput);
        assert!(err.contains("ZeroDivisionError"));
        assert!(err.contains("SyntaxError"));
        assert_eq!(out, "4\n");
    }

    #[test]
    fn interrupted_input_is_dropped_and_loop_continues() {
        let python = PythonSession::initialize().expect("python session");
        python.interrupt_completeness_checks();
        let (exit, out, err) = run_lines(&python, &["dropped_value = 1", "dropped_value"]);
        assert_eq!(exit, HostExit::EndOfInput);
        assert_eq!(out, "");
        assert_eq!(err.matches("KeyboardInterrupt").count(), 2);
    }

    #[test]
    fn keyboard_interrupt_in_user_code_is_reported() {
        let python = PythonSession::initialize().expect("python session");
        let (exit, out, err) = run_lines(&python, &["raise KeyboardInterrupt", "'still here'"]);
        assert_eq!(exit, HostExit::EndOfInput);
        assert!(err.contains("KeyboardInterrupt"));
        assert_eq!(out, "'still here'\n");
    }

    #[test]
    fn system_exit_stops_the_loop() {
        let python = PythonSession::initialize().expect("python session");
        let (exit, out, _) = run_lines(&python, &["raise SystemExit(2)", "'never'"]);
        assert_eq!(exit, HostExit::Exited(2));
        assert_eq!(exit.code(), 2);
        assert_eq!(out, "");
    }
}
