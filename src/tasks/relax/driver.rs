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

use crate::FailResult;
use crate::fsx;
use crate::relax::{
    Solver, ConvergenceOracle, SymmetryRefiner,
    StatusCode, LogClassifier, LogWatcher,
    Bookkeeper, IterationRecord, IdsExhausted, next_iteration_id,
    RelaxMachine, RelaxState, Request,
    refine_structure_file,
};

use msim_tasks_config::{Relax, Files, FinalStatic, LogPatterns, WarningPolicy};
use std::path::{Path, PathBuf};

/// Everything the driver needs to know, fixed for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// All files are resolved against this directory; the process cwd is never used.
    pub dir: PathBuf,
    /// Control file staged over `files.incar` before the loop.
    pub incar: String,
    pub refine: bool,
    pub run_static: bool,
    pub max_iterations: u32,
    pub warning_policy: WarningPolicy,
    pub final_static: FinalStatic,
    pub solver_log: String,
    pub log_patterns: LogPatterns,
    pub files: Files,
}

impl RunConfig {
    pub fn from_settings(dir: impl AsRef<Path>, relax: &Relax) -> Self {
        RunConfig {
            dir: dir.as_ref().to_owned(),
            incar: relax.incar_to_stage().to_string(),
            refine: relax.refine,
            run_static: relax.run_static,
            max_iterations: relax.max_iterations,
            warning_policy: relax.warning_policy,
            final_static: relax.final_static.clone(),
            solver_log: relax.solver.log.clone(),
            log_patterns: relax.log_patterns.clone(),
            files: relax.files.clone(),
        }
    }
}

/// How a driver call ended.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxOutcome {
    /// SUCCESS both for convergence and for running out of iterations.
    pub status: StatusCode,
    /// Tells convergence apart from exhaustion.
    pub state: RelaxState,
    /// Solver runs, including the final static run.
    pub invocations: u32,
    pub static_run: bool,
    pub records: Vec<IterationRecord>,
}

impl RelaxOutcome {
    pub fn converged(&self) -> bool { self.state == RelaxState::Converged }

    /// Whether the run deserves a failure marker.
    ///
    /// A single-shot run fails on any status but SUCCESS; a loop fails unless it converged.
    pub fn is_failure(&self, max_iterations: u32) -> bool {
        match max_iterations {
            1 => self.status != StatusCode::Success,
            _ => !self.converged(),
        }
    }
}

pub struct RelaxDriver<S, C, R> {
    config: RunConfig,
    book: Bookkeeper,
    watcher: LogWatcher,
    classifier: LogClassifier,
    solver: S,
    oracle: C,
    refiner: R,
    invocations: u32,
}

impl<S, C, R> RelaxDriver<S, C, R>
where
    S: Solver,
    C: ConvergenceOracle,
    R: SymmetryRefiner,
{
    pub fn new(config: RunConfig, solver: S, oracle: C, refiner: R) -> Self {
        RelaxDriver {
            book: Bookkeeper::new(&config.dir, &config.files),
            watcher: LogWatcher::new(&config.dir, &config.solver_log),
            classifier: LogClassifier::new(&config.log_patterns),
            config, solver, oracle, refiner,
            invocations: 0,
        }
    }

    pub fn config(&self) -> &RunConfig { &self.config }

    /// Run the loop to a terminal state, then the final static run if it applies.
    pub fn run(mut self) -> FailResult<RelaxOutcome> {
        let mut machine = RelaxMachine::new(self.config.max_iterations, self.config.warning_policy)?;

        self.prepare()?;

        let existing = self.book.existing_ids()?;
        if existing.is_empty() {
            self.book.save_initial_structure()?;
        } else {
            info!("Found {} archived iterations; resuming.", existing.len());
        }
        let first_id = next_iteration_id(&existing)?;

        let mut records = vec![];
        machine.start();
        while let RelaxState::Running { index } = machine.state() {
            info!("Relaxation run {} of at most {}.", index + 1, self.config.max_iterations);
            self.run_iteration()?;
            let id = first_id.checked_add(index).ok_or(IdsExhausted { last: std::u32::MAX })?;
            if let Some(record) = self.step(&mut machine, id)? {
                records.push(record);
            }
        }

        let status = machine.status();
        let state = machine.state();
        match state {
            RelaxState::Converged => info!("Relaxation converged."),
            RelaxState::Stopped(StatusCode::Success) if self.config.max_iterations > 1 => {
                warn!("Relaxation did not converge in {} runs.", self.config.max_iterations);
            },
            RelaxState::Stopped(StatusCode::Success) => {},
            _ => warn!("Relaxation stopped: {}", status),
        }

        let static_run = self.wants_static_run(status, state);
        if static_run {
            self.final_static_run()?;
        } else if self.config.run_static {
            info!("Skipping the final static run.");
        }

        Ok(RelaxOutcome {
            status, state, static_run, records,
            invocations: self.invocations,
        })
    }

    /// Stage the control files for relaxation.
    pub fn prepare(&mut self) -> FailResult<()> {
        let files = &self.config.files;
        if self.config.incar != files.incar {
            info!("Using {} as {}.", self.config.incar, files.incar);
            fsx::copy(self.book.path(&self.config.incar), self.book.path(&files.incar))?;
        }
        if self.config.run_static {
            let staged = fsx::copy_if_exists(
                self.book.path(&files.kpoints_relax),
                self.book.path(&files.kpoints),
            )?;
            if staged {
                info!("Using {} as {}.", files.kpoints_relax, files.kpoints);
            }
        }
        Ok(())
    }

    /// One blocking solver run.
    pub fn run_iteration(&mut self) -> FailResult<()> {
        self.invocations += 1;
        self.solver.invoke(&self.config.dir)
    }

    /// Everything that happens between two solver runs.
    ///
    /// Returns the record of what was archived, if anything.
    pub fn step(&mut self, machine: &mut RelaxMachine, id: u32) -> FailResult<Option<IterationRecord>> {
        let lines = self.watcher.new_lines()?;
        let status = self.classifier.classify(&lines);
        self.watcher.mark_checked()?;
        info!("Solver log status: {}", status);
        if status == StatusCode::Warning && self.config.warning_policy == WarningPolicy::Continue {
            warn!("The solver log contains a warning; continuing anyway.");
        }

        match machine.on_status(status) {
            Request::Halt => return Ok(None),
            Request::Archive => {},
        }

        let structure_snapshot = self.book.archive_structure(id)?;
        if self.config.refine {
            let poscar = self.book.path(&self.config.files.poscar);
            refine_structure_file(&poscar, &mut self.refiner)?;
        }
        let trajectory_snapshot = self.book.archive_trajectory(id)?;

        let converged = match machine.wants_convergence() {
            true => {
                let converged = self.oracle.read_convergence(&trajectory_snapshot)?;
                debug!("{} converged: {}", trajectory_snapshot.display(), converged);
                Some(converged)
            },
            false => None,
        };
        machine.on_archived(converged);

        Ok(Some(IterationRecord { id, structure_snapshot, trajectory_snapshot }))
    }

    fn wants_static_run(&self, status: StatusCode, state: RelaxState) -> bool {
        self.config.run_static
            && status == StatusCode::Success
            && (state == RelaxState::Converged || !self.config.final_static.require_convergence)
    }

    /// Stage the final control files and run once more, without looking at the result.
    fn final_static_run(&mut self) -> FailResult<()> {
        let FinalStatic { incar, kpoints, .. } = &self.config.final_static;
        let files = &self.config.files;

        fsx::copy_if_exists(self.book.path(kpoints), self.book.path(&files.kpoints))?;
        fsx::copy(self.book.path(incar), self.book.path(&files.incar))?;

        info!("Final static run.");
        self.run_iteration()?;
        // keep the static run out of the next classification in this directory
        self.watcher.mark_checked()
    }
}
