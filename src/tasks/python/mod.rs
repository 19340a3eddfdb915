/* ************************************************************************ **
** This file is part of msim, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of msim is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

pub use self::spglib::SpglibRefiner;
mod spglib;

//---------------------------------------------------------
use crate::{FailResult, FailOk};
use crate::fsx;
use std::io::prelude::*;
use std::process::{self, ChildStderr, Stdio};
use std::thread;

const PY_NOOP: &str = indoc!(r#"
    #!/usr/bin/env python3
"#);

#[derive(Debug, Fail)]
#[fail(display = "an error occurred running the most trivial python script")]
pub struct PythonExecutionError;

pub fn check_availability() -> FailResult<()> {
    use self::spglib::PY_CHECK_SPGLIB_AVAILABILITY;
    use self::spglib::SpglibAvailabilityError;

    call_script_and_check_success(PY_NOOP, PythonExecutionError)?;
    call_script_and_check_success(PY_CHECK_SPGLIB_AVAILABILITY, SpglibAvailabilityError)?;
    Ok(())
}

fn call_script_and_check_success<E: failure::Fail>(
    script: &'static str,
    error: E,
) -> FailResult<()>
{
    let tmp = fsx::TempDir::new("msim")?;
    let path = tmp.path().join("script.py");
    fsx::write(&path, script)?;

    let mut cmd = process::Command::new("python3");
    cmd.arg(path);
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stderr_worker = child.stderr.take().map(spawn_stderr_worker);

    let status = child.wait()?;
    if let Some(worker) = stderr_worker {
        let _ = worker.join();
    }
    if !status.success() {
        return Err(error.into());
    }
    Ok(())
}

fn call_script_and_communicate<In, Out>(
    script: &'static str,
    stdin_data: &In,
) -> FailResult<Out>
where
    In: serde::Serialize,
    Out: for<'de> serde::Deserialize<'de>,
{
    let tmp = fsx::TempDir::new("msim")?;
    let (_tmp, value) = tmp.try_with_recovery(|tmp| FailOk({
        let main_path = tmp.path().join("main-script.py");
        fsx::write(&main_path, script)?;

        let mut cmd = process::Command::new("python3");
        cmd.arg(main_path);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stderr_worker = child.stderr.take().map(spawn_stderr_worker);

        match child.stdin.take() {
            // dropped at the end of the statement, closing the pipe
            Some(stdin) => serde_json::to_writer(stdin, stdin_data)?,
            None => bail!("(BUG!) python3 was spawned without a stdin pipe"),
        }

        let mut stdout = String::new();
        match child.stdout.take() {
            Some(mut child_stdout) => { child_stdout.read_to_string(&mut stdout)?; },
            None => bail!("(BUG!) python3 was spawned without a stdout pipe"),
        }
        // for debugging
        fsx::write(tmp.path().join("_py_stdout"), &stdout)?;

        let status = child.wait()?;
        if let Some(worker) = stderr_worker {
            let _ = worker.join();
        }
        if !status.success() {
            bail!("an error occurred in a python script; check the log for a python backtrace");
        }

        serde_json::from_str(&stdout)?
    }))?;
    Ok(value)
}

/// Forward a child's stderr to the log, line by line.
fn spawn_stderr_worker(stderr: ChildStderr) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let reader = std::io::BufReader::new(stderr);
        for line in reader.lines() {
            match line {
                Ok(line) => warn!(target: "msim::python", "{}", line),
                Err(e) => {
                    debug!("stopped reading python stderr: {}", e);
                    break;
                },
            }
        }
    })
}
