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

//! The reduced form a structure is put into before and after symmetry refinement.
//!
//! In this form the lattice is described only by its six parameters (so any
//! rotation of the cell is forgotten), and the structure is translated so that
//! the first atom sits exactly at the origin. Two structures that differ only
//! by a rigid rotation or translation have the same reduced form, which is what
//! makes repeated refinement a fixed point.

use crate::FailResult;
use crate::structure::{Lattice, Structure, V3, M33, dot, norm};
use serde::{Serialize, Deserialize};

/// Lengths in the units of the lattice, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct LatticeParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl LatticeParams {
    pub fn of_lattice(lattice: &Lattice) -> Self {
        let [va, vb, vc] = lattice.vectors();
        let angle = |u: &V3, v: &V3| {
            let cos = dot(u, v) / (norm(u) * norm(v));
            cos.max(-1.0).min(1.0).acos().to_degrees()
        };
        LatticeParams {
            a: norm(va),
            b: norm(vb),
            c: norm(vc),
            alpha: angle(vb, vc),
            beta: angle(va, vc),
            gamma: angle(va, vb),
        }
    }

    /// Builds the lattice matrix in the standard orientation: `c` along z,
    /// and `a` in the xz plane.
    pub fn to_lattice(&self) -> FailResult<Lattice> {
        let LatticeParams { a, b, c, alpha, beta, gamma } = *self;
        let (alpha, beta, gamma) = (alpha.to_radians(), beta.to_radians(), gamma.to_radians());

        let val = (alpha.cos() * beta.cos() - gamma.cos()) / (alpha.sin() * beta.sin());
        let gamma_star = val.max(-1.0).min(1.0).acos();

        let matrix: M33 = [
            [a * beta.sin(), 0.0, a * beta.cos()],
            [-b * alpha.sin() * gamma_star.cos(), b * alpha.sin() * gamma_star.sin(), b * alpha.cos()],
            [0.0, 0.0, c],
        ];
        Lattice::new(&matrix)
    }
}

/// Lattice parameters, fractional coordinates anchored so that atom 0 is at
/// the origin, and one species symbol per site.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ReducedCell {
    pub params: LatticeParams,
    pub fracs: Vec<V3>,
    pub species: Vec<String>,
}

impl ReducedCell {
    /// # Errors
    /// Fails on a structure with no atoms, since there is nothing to anchor.
    pub fn from_structure(structure: &Structure) -> FailResult<Self> {
        ensure!(structure.num_atoms() > 0, "cannot reduce a structure with no atoms");
        Ok(ReducedCell {
            params: LatticeParams::of_lattice(&structure.lattice),
            fracs: anchor_fracs(&structure.fracs),
            species: structure.species.clone(),
        })
    }

    pub fn to_structure(&self) -> FailResult<Structure> {
        let lattice = self.params.to_lattice()?;
        Structure::new(lattice, anchor_fracs(&self.fracs), self.species.clone())
    }

    /// Re-derive the reduced form, e.g. after an external program handed this back.
    pub fn normalized(&self) -> FailResult<Self> {
        ReducedCell::from_structure(&self.to_structure()?)
    }
}

/// Translate so that the first coordinate is zero, then wrap everything into `[0, 1)`.
fn anchor_fracs(fracs: &[V3]) -> Vec<V3> {
    let origin = match fracs.first() {
        Some(&first) => first,
        None => return vec![],
    };
    fracs.iter().enumerate()
        .map(|(i, frac)| match i {
            0 => [0.0; 3],
            _ => [
                wrap_unit(frac[0] - origin[0]),
                wrap_unit(frac[1] - origin[1]),
                wrap_unit(frac[2] - origin[2]),
            ],
        })
        .collect()
}

fn wrap_unit(x: f64) -> f64 {
    let y = x.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if y >= 1.0 { 0.0 } else { y }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() <= tol, "{:?} != {:?}", a, b);
        }
    }

    fn params_vec(p: &LatticeParams) -> Vec<f64> {
        vec![p.a, p.b, p.c, p.alpha, p.beta, p.gamma]
    }

    fn flat(fracs: &[V3]) -> Vec<f64> {
        fracs.iter().flat_map(|v| v.iter().cloned()).collect()
    }

    #[test]
    fn params_roundtrip_through_matrix() {
        let params = LatticeParams { a: 3.1, b: 4.2, c: 5.3, alpha: 80.0, beta: 95.0, gamma: 110.0 };
        let back = LatticeParams::of_lattice(&params.to_lattice().unwrap());
        assert_all_close(&params_vec(&back), &params_vec(&params), 1e-10);
    }

    #[test]
    fn params_of_orthorhombic() {
        let lattice = Lattice::new(&[[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]]).unwrap();
        let params = LatticeParams::of_lattice(&lattice);
        assert_all_close(&params_vec(&params), &[2.0, 3.0, 4.0, 90.0, 90.0, 90.0], 1e-12);
    }

    #[test]
    fn first_atom_is_anchored_and_coords_wrap() {
        let lattice = Lattice::new(&[[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]).unwrap();
        let structure = Structure::new(
            lattice,
            vec![[0.5, 0.5, 0.5], [0.25, 0.75, 0.5], [0.0, 0.0, 0.0]],
            vec!["Al".into(), "Pt".into(), "Pt".into()],
        ).unwrap();

        let cell = ReducedCell::from_structure(&structure).unwrap();
        assert_all_close(
            &flat(&cell.fracs),
            &[0.0, 0.0, 0.0, 0.75, 0.25, 0.0, 0.5, 0.5, 0.5],
            1e-12,
        );
        assert_eq!(cell.species, vec!["Al", "Pt", "Pt"]);
    }

    #[test]
    fn reduction_is_idempotent() {
        let lattice = Lattice::new(&[
            [3.0, 0.1, 0.0],
            [1.5, 2.6, 0.2],
            [0.3, 0.2, 7.0],
        ]).unwrap();
        let structure = Structure::new(
            lattice,
            vec![[0.1, 0.2, 0.3], [0.6, 0.7, 0.05], [0.95, 0.15, 0.55]],
            vec!["Fe".into(), "Fe".into(), "O".into()],
        ).unwrap();

        let once = ReducedCell::from_structure(&structure).unwrap();
        let twice = once.normalized().unwrap();
        assert_all_close(&params_vec(&twice.params), &params_vec(&once.params), 1e-10);
        assert_all_close(&flat(&twice.fracs), &flat(&once.fracs), 1e-10);
        assert_eq!(twice.species, once.species);
    }

    #[test]
    fn empty_structure_is_rejected() {
        let lattice = Lattice::new(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]).unwrap();
        let structure = Structure::new(lattice, vec![], vec![]).unwrap();
        assert!(ReducedCell::from_structure(&structure).is_err());
    }

    #[test]
    fn tiny_negative_wraps_to_zero() {
        assert_eq!(wrap_unit(-1e-300), 0.0);
        assert_eq!(wrap_unit(1.0), 0.0);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-15);
    }
}
