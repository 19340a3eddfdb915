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

use ansi_term::Colour;
use log::{Level, LevelFilter};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Builder-style setup for logging
#[derive(Debug, Clone, Default)]
pub struct GlobalLogger {
    path: Option<PathBuf>,
    verbosity: Verbosity,
    show_target: bool,
}

impl GlobalLogger {
    /// Also write everything to this file (appending).
    pub fn path<P: AsRef<Path>>(&mut self, path: P) -> &mut Self
    { self.path = Some(path.as_ref().to_owned()); self }

    /// Any integer will be accepted; the level will be truncated
    /// to the most extreme value supported.
    pub fn verbosity(&mut self, level: u64) -> &mut Self
    {
        self.verbosity = match level {
            0 => Verbosity::Default,
            1 => Verbosity::Loud,
            _ => Verbosity::Louder,
        };
        self
    }

    /// Print the module path of each message.
    pub fn show_target(&mut self, show: bool) -> &mut Self
    { self.show_target = show; self }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity { Default, Loud, Louder }

impl Default for Verbosity {
    fn default() -> Self { Verbosity::Default }
}

impl GlobalLogger {
    /// Install the logger. Only the first call in a process has any effect;
    /// later calls return an error.
    pub fn apply(&mut self) -> FailResult<()>
    {
        let start = Instant::now();
        let show_target = self.show_target;

        let (ours, others) = match self.verbosity {
            Verbosity::Default => (LevelFilter::Info, LevelFilter::Warn),
            Verbosity::Loud => (LevelFilter::Debug, LevelFilter::Info),
            Verbosity::Louder => (LevelFilter::Trace, LevelFilter::Debug),
        };

        let mut fern = fern::Dispatch::new();
        fern = fern.format(move |out, message, record| {
                let t = start.elapsed();
                match show_target {
                    true => out.finish(format_args!("[{:>4}.{:03}s][{}][{}] {}",
                        t.as_secs(),
                        t.subsec_millis(),
                        record.target(),
                        ColorizedLevel(record.level()),
                        message)),
                    false => out.finish(format_args!("[{:>4}.{:03}s][{}] {}",
                        t.as_secs(),
                        t.subsec_millis(),
                        ColorizedLevel(record.level()),
                        message)),
                }
            })
            .level(others)
            .level_for("msim", ours)
            .level_for("msim_tasks", ours)
            .level_for("msim_vasp_io", ours)
            .level_for("msim_structure_io", ours)
            .level_for("msim_fs_util", ours)
            .chain(std::io::stdout());

        if let Some(path) = self.path.as_ref() {
            fern = fern.chain(fern::log_file(path)?);
        }

        fern.apply()?;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ColorizedLevel(pub Level);
impl fmt::Display for ColorizedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.0 {
            Level::Error => Colour::Red.bold(),
            Level::Warn  => Colour::Red.normal(),
            Level::Info  => Colour::Cyan.bold(),
            Level::Debug => Colour::Yellow.dimmed(),
            Level::Trace => Colour::Cyan.normal(),
        };
        write!(f, "{}", style.paint(format!("{:<5}", self.0)))
    }
}
