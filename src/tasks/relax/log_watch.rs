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

use std::path::{Path, PathBuf};

/// Tracks which part of the solver log has already been classified.
///
/// The log is append-only across iterations (and across driver invocations
/// in the same directory), so the checked portion is remembered as a copy of
/// the log next to it, `<log>.checked`.
#[derive(Debug, Clone)]
pub struct LogWatcher {
    log: PathBuf,
    baseline: PathBuf,
}

impl LogWatcher {
    pub fn new(dir: impl AsRef<Path>, log_name: &str) -> Self {
        let dir = dir.as_ref();
        LogWatcher {
            log: dir.join(log_name),
            baseline: dir.join(format!("{}.checked", log_name)),
        }
    }

    pub fn log_path(&self) -> &Path { &self.log }

    pub fn baseline_path(&self) -> &Path { &self.baseline }

    /// Lines of the log past the end of the baseline.
    ///
    /// A missing log has no lines. A log shorter than its baseline has been
    /// replaced since the last check, so all of it is new.
    pub fn new_lines(&self) -> FailResult<Vec<String>> {
        let current = read_lines_or_empty(&self.log)?;
        let checked = read_lines_or_empty(&self.baseline)?.len();

        if current.len() < checked {
            warn!(
                "'{}' is shorter than when it was last checked; scanning all of it",
                self.log.display(),
            );
            return Ok(current);
        }
        Ok(current.into_iter().skip(checked).collect())
    }

    /// Record the current contents of the log as checked.
    pub fn mark_checked(&self) -> FailResult<()> {
        if self.log.exists() {
            fsx::copy(&self.log, &self.baseline)?;
        } else {
            fsx::write(&self.baseline, "")?;
        }
        Ok(())
    }
}

fn read_lines_or_empty(path: &Path) -> FailResult<Vec<String>> {
    match path.exists() {
        true => Ok(fsx::read_lines_lossy(path)?),
        false => Ok(vec![]),
    }
}
