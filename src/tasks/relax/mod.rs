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

//! The relax-and-resubmit loop.

use crate::FailResult;
use msim_structure_io::ReducedCell;
use std::path::Path;

pub use self::classify::{StatusCode, LogClassifier};
mod classify;

pub use self::log_watch::LogWatcher;
mod log_watch;

pub use self::bookkeeping::{Bookkeeper, IterationRecord, IdsExhausted, next_iteration_id};
pub mod bookkeeping;

pub use self::machine::{RelaxMachine, RelaxState, Request};
mod machine;

pub use self::refine::refine_structure_file;
mod refine;

pub use self::driver::{RelaxDriver, RunConfig, RelaxOutcome};
mod driver;

/// Runs the solver once, to completion, in a working directory.
pub trait Solver {
    fn invoke(&mut self, dir: &Path) -> FailResult<()>;
}

/// Decides whether an archived trajectory shows a finished ionic relaxation.
pub trait ConvergenceOracle {
    fn read_convergence(&mut self, trajectory: &Path) -> FailResult<bool>;
}

/// Symmetrizes a structure.
pub trait SymmetryRefiner {
    fn refine(&mut self, cell: &ReducedCell) -> FailResult<ReducedCell>;
}

impl<'a, S: Solver + ?Sized> Solver for &'a mut S {
    fn invoke(&mut self, dir: &Path) -> FailResult<()>
    { (**self).invoke(dir) }
}

impl<'a, C: ConvergenceOracle + ?Sized> ConvergenceOracle for &'a mut C {
    fn read_convergence(&mut self, trajectory: &Path) -> FailResult<bool>
    { (**self).read_convergence(trajectory) }
}

impl<'a, R: SymmetryRefiner + ?Sized> SymmetryRefiner for &'a mut R {
    fn refine(&mut self, cell: &ReducedCell) -> FailResult<ReducedCell>
    { (**self).refine(cell) }
}

/// Reads `NSW`, `IBRION` and the ionic step count from vasprun.xml.
#[derive(Debug, Default, Clone, Copy)]
pub struct VasprunOracle;

impl ConvergenceOracle for VasprunOracle {
    fn read_convergence(&mut self, trajectory: &Path) -> FailResult<bool>
    { msim_vasp_io::read_convergence(trajectory) }
}
