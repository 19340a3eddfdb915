//! Stand-ins for the solver and the two oracles.

use failure::Error;
use msim_fs_util as fsx;
use msim_structure_io::ReducedCell;
use msim_tasks::relax::{Solver, ConvergenceOracle, SymmetryRefiner};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

type FailResult<T> = Result<T, Error>;

/// What one fake solver run leaves behind.
#[derive(Debug, Clone)]
pub struct Run {
    pub log: Vec<String>,
    pub contcar: String,
    pub vasprun: String,
}

impl Run {
    /// A quiet run whose outputs are tagged with `tag`.
    pub fn ok(tag: &str) -> Self {
        Run {
            log: vec![
                "running on   16 total cores".to_string(),
                format!("  {} F= -.1E+02", tag),
            ],
            contcar: format!("CONTCAR from {}", tag),
            vasprun: format!("<modeling><!-- {} --></modeling>", tag),
        }
    }

    pub fn with_line(mut self, line: &str) -> Self {
        self.log.push(line.to_string());
        self
    }

    pub fn with_contcar(mut self, contcar: &str) -> Self {
        self.contcar = contcar.to_string();
        self
    }
}

/// What the solver found staged when it was invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub incar: Option<String>,
    pub kpoints: Option<String>,
}

/// Plays back scripted runs, and remembers the control files of each.
#[derive(Debug, Default)]
pub struct FakeSolver {
    pub runs: VecDeque<Run>,
    pub seen: Vec<Seen>,
}

impl FakeSolver {
    pub fn new(runs: Vec<Run>) -> Self
    { FakeSolver { runs: runs.into(), seen: vec![] } }
}

impl Solver for FakeSolver {
    fn invoke(&mut self, dir: &Path) -> FailResult<()> {
        let read = |name: &str| fsx::read_to_string(dir.join(name)).ok();
        self.seen.push(Seen { incar: read("INCAR"), kpoints: read("KPOINTS") });

        let run = self.runs.pop_front().unwrap_or_else(|| Run::ok("an unscripted run"));
        let mut log = fsx::read_to_string(dir.join("vasp.log")).unwrap_or_default();
        for line in &run.log {
            log.push_str(line);
            log.push('\n');
        }
        fsx::write(dir.join("vasp.log"), log)?;
        fsx::write(dir.join("CONTCAR"), &run.contcar)?;
        fsx::write(dir.join("vasprun.xml"), &run.vasprun)?;
        Ok(())
    }
}

/// Answers convergence queries from a script, recording what it was asked about.
#[derive(Debug, Default)]
pub struct FakeOracle {
    pub answers: VecDeque<bool>,
    pub asked: Vec<PathBuf>,
}

impl FakeOracle {
    pub fn new(answers: Vec<bool>) -> Self
    { FakeOracle { answers: answers.into(), asked: vec![] } }
}

impl ConvergenceOracle for FakeOracle {
    fn read_convergence(&mut self, trajectory: &Path) -> FailResult<bool> {
        self.asked.push(trajectory.to_owned());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}

/// Returns its input unchanged.
#[derive(Debug, Default)]
pub struct IdentityRefiner {
    pub calls: u32,
}

impl SymmetryRefiner for IdentityRefiner {
    fn refine(&mut self, cell: &ReducedCell) -> FailResult<ReducedCell> {
        self.calls += 1;
        Ok(cell.clone())
    }
}
