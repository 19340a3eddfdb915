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

//! Reading the parts of VASP output that the relaxation driver cares about.
//!
//! This is not an XML parser. vasprun.xml files run into the
//! hundreds of megabytes, and all we ever want from them is a handful of
//! integers and a count of ionic steps.

#[macro_use] extern crate log;
#[macro_use] extern crate failure;
#[macro_use] extern crate lazy_static;

pub type FailResult<T> = Result<T, failure::Error>;

pub use crate::vasprun::{IonicInfo, MalformedVasprun, read_ionic_info, read_convergence};
pub mod vasprun;

pub use crate::snapshots::{SnapshotNaming, BadSnapshotName};
pub mod snapshots;
