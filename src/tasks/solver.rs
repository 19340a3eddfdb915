/* ********************************************************************** **
**  This file is part of msim.                                            **
**                                                                        **
**  msim is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of msim is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

//! Running the external solver.

use crate::FailResult;
use crate::fsx;
use crate::relax::Solver;

use std::path::Path;
use std::process::{self, Stdio};

/// The solver's command line failed to start.
#[derive(Debug, Fail)]
#[fail(display = "could not start solver '{}': {}", program, message)]
pub struct SolverSpawnError {
    program: String,
    message: String,
}

/// Runs a command line in the working directory, appending its output to a log.
#[derive(Debug, Clone)]
pub struct CommandSolver {
    argv: Vec<String>,
    log: String,
}

impl CommandSolver {
    /// `{nprocs}` in `template` is replaced before the command is split on whitespace.
    pub fn new(template: &str, nprocs: u32, log: &str) -> FailResult<Self> {
        let argv: Vec<String> = {
            template.replace("{nprocs}", &nprocs.to_string())
                .split_whitespace()
                .map(String::from)
                .collect()
        };
        ensure!(!argv.is_empty(), "the solver command is empty");
        Ok(CommandSolver { argv, log: log.to_string() })
    }

    pub fn argv(&self) -> &[String] { &self.argv }
}

impl Solver for CommandSolver {
    fn invoke(&mut self, dir: &Path) -> FailResult<()> {
        let log = fsx::append(dir.join(&self.log))?;

        let mut cmd = process::Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);
        cmd.current_dir(dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(log.try_clone()?);
        cmd.stderr(log);

        debug!("running {:?} in '{}'", self.argv, dir.display());
        let status = {
            cmd.status()
                .map_err(|e| SolverSpawnError {
                    program: self.argv[0].clone(),
                    message: e.to_string(),
                })?
        };
        if !status.success() {
            // the log scan decides what happened
            warn!("solver exited with {}", status);
        }
        Ok(())
    }
}
