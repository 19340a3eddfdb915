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

#[macro_use] extern crate log;
#[macro_use] extern crate failure;
#[macro_use] extern crate serde_derive;
#[macro_use] extern crate lazy_static;
#[macro_use] extern crate indoc;

use msim_fs_util as fsx;

pub type FailResult<T> = Result<T, failure::Error>;
#[allow(bad_style)]
pub fn FailOk<T>(x: T) -> FailResult<T> { Ok(x) }

pub mod relax;
pub mod solver;
pub mod resume;
pub mod jobs;
pub mod latex;

pub use crate::python::SpglibRefiner;
mod python;

pub use crate::lockfile::{LockfilePath, LockfileGuard};
mod lockfile;

mod env;
mod util;
mod ui;

pub mod entry_points;
