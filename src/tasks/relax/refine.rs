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
use crate::relax::SymmetryRefiner;

use msim_structure_io::ReducedCell;
use msim_structure_io::poscar::Poscar;
use std::path::Path;

/// Symmetrize a POSCAR in place.
///
/// The structure is put in reduced form on the way in and again on the way
/// out, so the file always ends up with the first atom at the origin and the
/// lattice in standard orientation, whatever the refiner did to it.
pub fn refine_structure_file(path: &Path, refiner: &mut dyn SymmetryRefiner) -> FailResult<()> {
    let Poscar { comment, structure } = Poscar::load(path)?;
    let cell = ReducedCell::from_structure(&structure)?;

    let refined = refiner.refine(&cell)?.normalized()?;
    if refined.fracs.len() != cell.fracs.len() {
        info!("refinement changed the atom count from {} to {}", cell.fracs.len(), refined.fracs.len());
    }

    let structure = refined.to_structure()?;
    Poscar { comment, structure }.save(path)?;
    trace!("refined '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsx;

    struct Identity(u32);

    impl SymmetryRefiner for Identity {
        fn refine(&mut self, cell: &ReducedCell) -> FailResult<ReducedCell> {
            self.0 += 1;
            Ok(cell.clone())
        }
    }

    const ROTATED: &str = "\
rotated
1.0
  0.0 3.0 0.0
 -3.0 0.0 0.0
  0.0 0.0 4.0
Si
2
Direct
0.25 0.25 0.25
0.75 0.75 0.5
";

    #[test]
    fn output_is_reduced_and_stable() {
        let tmp = fsx::ActualTempDir::new("msim-refine").unwrap();
        let path = tmp.path().join("POSCAR");
        fsx::write(&path, ROTATED).unwrap();

        let mut refiner = Identity(0);
        refine_structure_file(&path, &mut refiner).unwrap();
        let once = Poscar::load(&path).unwrap();
        refine_structure_file(&path, &mut refiner).unwrap();
        let twice = Poscar::load(&path).unwrap();
        assert_eq!(refiner.0, 2);
        for (a, b) in once.structure.lattice.matrix().iter().zip(twice.structure.lattice.matrix()) {
            for k in 0..3 {
                assert!((a[k] - b[k]).abs() < 1e-12);
            }
        }
        assert_eq!(once.structure.fracs, twice.structure.fracs);

        let Poscar { comment, structure } = twice;
        assert_eq!(comment, "rotated");
        assert_eq!(structure.fracs[0], [0.0, 0.0, 0.0]);
        let m = structure.lattice.matrix();
        assert!((m[2][2] - 4.0).abs() < 1e-12);
        assert!(m[0][1].abs() < 1e-12);
        assert!((m[0][0] - 3.0).abs() < 1e-12);
        let f = structure.fracs[1];
        for (got, want) in f.iter().zip(&[0.5, 0.5, 0.25]) {
            assert!((got - want).abs() < 1e-12, "{:?}", f);
        }
    }
}
