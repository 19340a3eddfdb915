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

#[macro_use] extern crate log;
#[macro_use] extern crate failure;

pub type FailResult<T> = Result<T, failure::Error>;

pub use crate::structure::{Structure, Lattice, V3, M33};
mod structure;

pub use crate::cell::{LatticeParams, ReducedCell};
pub mod cell;

pub mod poscar;
