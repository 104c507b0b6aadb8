//! The d-linear shape functions of the reference cell.
//!
//! The reference cell is the unit interval/square/cube `[0, 1]^DIM`.
//! Its corners are indexed by the bits of the corner index:
//! bit `k` of corner `i` selects whether coordinate `k` of the corner
//! is 0 or 1. In 2D this gives the ordering
//! `(0,0), (1,0), (0,1), (1,1)`.
//!
//! Each corner carries one shape function
//! `N_i(r) = ∏_k (ξ_k if bit_k(i) else 1 - ξ_k)`,
//! which is 1 at its own corner, 0 at every other corner,
//! and linear in each coordinate separately.
//! These weights blend corner positions into the forward map
//! (see [`CellMapping`][crate::CellMapping]).

use nalgebra as na;

use crate::RefPoint;

/// Number of corners (and shape functions) of the `DIM`-dimensional
/// reference cell, `2^DIM`.
pub const fn corner_count<const DIM: usize>() -> usize {
    1 << DIM
}

/// Reference coordinates of corner `i` under the bit-indexing convention.
pub fn corner<const DIM: usize>(i: usize) -> RefPoint<DIM> {
    debug_assert!(i < corner_count::<DIM>());
    RefPoint::from_fn(|k, _| (i >> k & 1) as f64)
}

/// The shape function of corner `i` evaluated at `r`.
///
/// Defined (and occasionally evaluated, as Newton iterates wander)
/// on all of `R^DIM`, not just the reference cell.
pub fn value<const DIM: usize>(i: usize, r: &RefPoint<DIM>) -> f64 {
    debug_assert!(i < corner_count::<DIM>());
    (0..DIM)
        .map(|k| if i >> k & 1 == 1 { r[k] } else { 1. - r[k] })
        .product()
}

/// The reference-space gradient `∂N_i/∂ξ` of the shape function
/// of corner `i` at `r`.
pub fn gradient<const DIM: usize>(i: usize, r: &RefPoint<DIM>) -> RefPoint<DIM> {
    debug_assert!(i < corner_count::<DIM>());
    RefPoint::from_fn(|axis, _| {
        (0..DIM)
            .map(|k| {
                let bit_set = i >> k & 1 == 1;
                if k == axis {
                    if bit_set {
                        1.
                    } else {
                        -1.
                    }
                } else if bit_set {
                    r[k]
                } else {
                    1. - r[k]
                }
            })
            .product()
    })
}

/// Second derivatives `∂²N_i/∂ξ_a∂ξ_b` of the shape function of corner `i`.
///
/// The diagonal is identically zero since each `N_i` is linear
/// in every single coordinate.
pub fn hessian<const DIM: usize>(i: usize, r: &RefPoint<DIM>) -> na::SMatrix<f64, DIM, DIM> {
    debug_assert!(i < corner_count::<DIM>());
    na::SMatrix::from_fn(|a, b| {
        if a == b {
            return 0.;
        }
        (0..DIM)
            .map(|k| {
                let bit_set = i >> k & 1 == 1;
                if k == a || k == b {
                    if bit_set {
                        1.
                    } else {
                        -1.
                    }
                } else if bit_set {
                    r[k]
                } else {
                    1. - r[k]
                }
            })
            .product()
    })
}

//
// tests
//
