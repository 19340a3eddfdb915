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

use crate::FailResult;
use serde::{Serialize, Deserialize};

pub type V3 = [f64; 3];
pub type M33 = [[f64; 3]; 3];

/// Defines a vector basis for periodic boundary conditions in three dimensions.
///
/// The rows of the matrix are the lattice vectors, so that a fractional row
/// vector multiplied on the left produces a cartesian row vector.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Lattice {
    matrix: M33,
}

impl Lattice {
    /// Create a lattice from a matrix where the rows are lattice vectors.
    ///
    /// # Errors
    /// Fails on a singular matrix.
    pub fn new(matrix: &M33) -> FailResult<Self> {
        ensure!(det(matrix).abs() > 1e-12, "singular lattice: {:?}", matrix);
        Ok(Lattice { matrix: *matrix })
    }

    /// Matrix where lattice vectors are rows.
    pub fn matrix(&self) -> &M33
    { &self.matrix }

    pub fn vectors(&self) -> &[V3; 3]
    { &self.matrix }

    pub fn norms(&self) -> [f64; 3] {
        let m = &self.matrix;
        [norm(&m[0]), norm(&m[1]), norm(&m[2])]
    }

    /// Get the (positive) volume of the lattice cell.
    pub fn volume(&self) -> f64
    { det(&self.matrix).abs() }

    pub fn frac_to_cart(&self, frac: &V3) -> V3 {
        let m = &self.matrix;
        let mut out = [0.0; 3];
        for k in 0..3 {
            out[k] = frac[0] * m[0][k] + frac[1] * m[1][k] + frac[2] * m[2][k];
        }
        out
    }

    pub fn cart_to_frac(&self, cart: &V3) -> V3 {
        let inv = inv(&self.matrix);
        let mut out = [0.0; 3];
        for k in 0..3 {
            out[k] = cart[0] * inv[0][k] + cart[1] * inv[1][k] + cart[2] * inv[2][k];
        }
        out
    }
}

/// A periodic structure in fractional coordinates, with one species symbol per site.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Structure {
    pub lattice: Lattice,
    pub fracs: Vec<V3>,
    pub species: Vec<String>,
}

impl Structure {
    /// # Errors
    /// Fails if there is not exactly one species per site.
    pub fn new(lattice: Lattice, fracs: Vec<V3>, species: Vec<String>) -> FailResult<Self> {
        ensure!(
            fracs.len() == species.len(),
            "{} sites but {} species", fracs.len(), species.len(),
        );
        Ok(Structure { lattice, fracs, species })
    }

    pub fn num_atoms(&self) -> usize
    { self.fracs.len() }

    pub fn to_carts(&self) -> Vec<V3>
    { self.fracs.iter().map(|f| self.lattice.frac_to_cart(f)).collect() }
}

pub(crate) fn dot(a: &V3, b: &V3) -> f64
{ a[0] * b[0] + a[1] * b[1] + a[2] * b[2] }

pub(crate) fn norm(a: &V3) -> f64
{ dot(a, a).sqrt() }

fn det(m: &M33) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

// adjugate over determinant; only ever called on matrices that passed `Lattice::new`
fn inv(m: &M33) -> M33 {
    let d = det(m);
    let c = |r0: usize, c0: usize, r1: usize, c1: usize| m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0];
    [
        [c(1, 1, 2, 2) / d, -c(0, 1, 2, 2) / d, c(0, 1, 1, 2) / d],
        [-c(1, 0, 2, 2) / d, c(0, 0, 2, 2) / d, -c(0, 0, 1, 2) / d],
        [c(1, 0, 2, 1) / d, -c(0, 0, 2, 1) / d, c(0, 0, 1, 1) / d],
    ]
}
