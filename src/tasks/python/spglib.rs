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

//! Symmetry refinement through spglib's python bindings.

use crate::FailResult;
use crate::relax::SymmetryRefiner;
use msim_structure_io::{Lattice, ReducedCell, Structure, M33, V3};

use super::call_script_and_communicate;

pub(super) const PY_CHECK_SPGLIB_AVAILABILITY: &str = indoc!(r#"
    #!/usr/bin/env python3
    import spglib
    spglib.refine_cell
"#);

const PY_REFINE_CELL: &str = include_str!("refine-cell.py");

#[derive(Debug, Fail)]
#[fail(display = "an error occurred importing the spglib python module")]
pub struct SpglibAvailabilityError;

// Error message produced by spglib.
#[derive(Debug, Fail)]
#[fail(display = "{}", _0)]
pub struct SpglibError(String);

#[derive(Serialize)]
struct Input<'a> {
    lattice: &'a M33,
    positions: &'a [V3],
    types: Vec<u32>,
    symprec: f64,
    angle_tolerance: f64,
}

#[derive(Deserialize)]
struct Output {
    lattice: M33,
    positions: Vec<V3>,
    types: Vec<u32>,
}

/// Calls `spglib.refine_cell` in a python subprocess.
#[derive(Debug, Clone)]
pub struct SpglibRefiner {
    pub symprec: f64,
    /// Negative means spglib's own default.
    pub angle_tolerance: f64,
}

impl SpglibRefiner {
    pub fn new(symprec: f64, angle_tolerance: f64) -> Self
    { SpglibRefiner { symprec, angle_tolerance } }

    /// Fail early if python3 or spglib are missing.
    pub fn check_availability() -> FailResult<()>
    { super::check_availability() }
}

impl SymmetryRefiner for SpglibRefiner {
    fn refine(&mut self, cell: &ReducedCell) -> FailResult<ReducedCell> {
        let structure = cell.to_structure()?;
        let (kinds, types) = species_to_types(&structure.species);

        let input = Input {
            lattice: structure.lattice.matrix(),
            positions: &structure.fracs,
            types,
            symprec: self.symprec,
            angle_tolerance: self.angle_tolerance,
        };
        let result: Result<Output, String> = call_script_and_communicate(PY_REFINE_CELL, &input)?;
        let Output { lattice, positions, types } = result.map_err(SpglibError)?;

        let species = {
            types.iter()
                .map(|&t| match kinds.get(t as usize) {
                    Some(kind) => Ok(kind.clone()),
                    None => Err(format_err!("spglib returned unknown atom type {}", t)),
                })
                .collect::<FailResult<Vec<_>>>()?
        };
        let structure = Structure::new(Lattice::new(&lattice)?, positions, species)?;
        ReducedCell::from_structure(&structure)
    }
}

/// Integer labels in order of first appearance, and the species they stand for.
fn species_to_types(species: &[String]) -> (Vec<String>, Vec<u32>) {
    let mut kinds: Vec<String> = vec![];
    let types = species.iter().map(|s| {
        match kinds.iter().position(|k| k == s) {
            Some(i) => i as u32,
            None => {
                kinds.push(s.clone());
                (kinds.len() - 1) as u32
            },
        }
    }).collect();
    (kinds, types)
}
