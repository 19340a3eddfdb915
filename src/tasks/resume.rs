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

//! Undo the traces of an interrupted solver run so the loop can pick up again.

use crate::FailResult;
use crate::fsx;
use crate::relax::{Bookkeeper, LogWatcher};

use msim_tasks_config::Files;
use std::path::{Path, PathBuf};

/// Printed by VASP once per execution, at start-up.
pub const START_BANNER: &str = "running on ";

/// Solver outputs that only matter to the run that wrote them.
pub const SCRATCH_FILES: &[&str] = &[
    "CHG", "CHGCAR", "DOSCAR", "EIGENVAL", "IBZKPT", "OSZICAR",
    "OUTCAR", "PCDAT", "REPORT", "WAVECAR", "XDATCAR",
];

#[derive(Debug, Fail)]
#[fail(display = "'{}' has no line containing '{}'; nothing to resume", path, banner)]
pub struct NoStartBanner {
    path: String,
    banner: &'static str,
}

#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeReport {
    /// Executions that finished before the interrupted one, by the log's banners.
    pub completed_runs: u32,
    /// Id of the newest complete snapshot, or 0 if there is none.
    pub last_archived: u32,
    /// The structure that the next run starts from.
    pub restored_from: PathBuf,
    pub removed: Vec<PathBuf>,
}

/// Names of the things `clean_for_resume` touches besides the standard files.
#[derive(Debug, Clone)]
pub struct ResumeFiles<'a> {
    pub files: &'a Files,
    /// Solver log containing the start banners.
    pub solver_log: &'a str,
    /// Scheduler stderr file, discarded with the scratch outputs.
    pub scheduler_stderr: &'a str,
}

pub fn clean_for_resume(dir: &Path, names: &ResumeFiles<'_>) -> FailResult<ResumeReport> {
    let book = Bookkeeper::new(dir, names.files);
    let files = names.files;

    // 1. forget the interrupted run in the log
    let log_path = book.path(names.solver_log);
    let mut lines = fsx::read_lines_lossy(&log_path)?;
    let last_start = match lines.iter().rposition(|line| line.contains(START_BANNER)) {
        Some(i) => i,
        None => return Err(NoStartBanner {
            path: log_path.display().to_string(),
            banner: START_BANNER,
        }.into()),
    };
    lines.truncate(last_start);
    fsx::write(&log_path, lines.iter().map(|line| format!("{}\n", line)).collect::<String>())?;
    let completed_runs = lines.iter().filter(|line| line.contains(START_BANNER)).count() as u32;

    // 2. scratch outputs
    let mut removed = vec![];
    let mut scratch: Vec<&str> = SCRATCH_FILES.to_vec();
    scratch.extend(&[&files.contcar[..], &files.vasprun[..], names.scheduler_stderr]);
    for name in scratch {
        remove_if_exists(book.path(name), &mut removed)?;
    }

    // 3. the newest trajectory snapshot marks the last finished iteration;
    //    a structure snapshot past it was archived halfway
    let last_archived = book.existing_ids()?.into_iter().max().unwrap_or(0);
    let half_archived = last_archived.checked_add(1).map(|id| book.structure_snapshot(id));
    if let Some(path) = half_archived {
        remove_if_exists(path, &mut removed)?;
    }

    // 4. restart from the last archived structure
    let restored_from = match last_archived {
        0 => book.path(&files.poscar_init),
        id => book.structure_snapshot(id),
    };
    fsx::copy(&restored_from, book.path(&files.poscar))?;
    info!("Restored {} from {}.", files.poscar, restored_from.display());

    // 5. the truncated log is all that has been seen
    LogWatcher::new(dir, names.solver_log).mark_checked()?;

    Ok(ResumeReport { completed_runs, last_archived, restored_from, removed })
}

fn remove_if_exists(path: PathBuf, removed: &mut Vec<PathBuf>) -> FailResult<()> {
    if path.exists() {
        fsx::remove_file(&path)?;
        debug!("removed '{}'", path.display());
        removed.push(path);
    }
    Ok(())
}
