//! Inverse mapping: locating the reference point
//! whose forward image is a given physical point.
//!
//! For `DIM >= 2` the forward map of [`CellMapping`] has no closed-form
//! inverse on a general cell, so it is inverted with a damped Newton
//! iteration on the residual `F(r) = map(r) - p`.
//! Rectangular Jacobians (`SPACE_DIM > DIM`) are handled through
//! the least-squares normal equations `JᵀJ Δ = -Jᵀ F`,
//! which reduce to the plain Newton solve when `SPACE_DIM == DIM`.
//!
//! The returned point is the mathematical root of the residual,
//! *not* clamped into the reference cell:
//! whether the physical point actually lies inside the cell
//! is a decision left to the caller, made from the returned coordinates
//! with whatever tolerance the caller needs.

use itertools::Itertools;
use nalgebra as na;

use crate::{
    mapping::{CellMapping, MappingError},
    PhysPoint, RefPoint,
};

/// Largest distance between any two vertices of the cell.
///
/// Used to scale the convergence tolerance,
/// since cells in a mesh vary enormously in absolute size.
fn cell_diameter<const SPACE_DIM: usize>(vertices: &[PhysPoint<SPACE_DIM>]) -> f64 {
    vertices
        .iter()
        .tuple_combinations()
        .map(|(a, b)| (a - b).norm())
        .fold(0., f64::max)
}

impl<const DIM: usize, const SPACE_DIM: usize> CellMapping<DIM, SPACE_DIM> {
    /// Solve `map(vertices, r) = p` for `r`,
    /// starting from the reference cell centroid.
    ///
    /// See [`unmap_from`][Self::unmap_from] for the iteration details
    /// and failure modes.
    pub fn unmap(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        p: &PhysPoint<SPACE_DIM>,
    ) -> Result<RefPoint<DIM>, MappingError> {
        self.unmap_from(vertices, p, RefPoint::repeat(0.5))
    }

    /// Solve `map(vertices, r) = p` for `r` from a caller-supplied
    /// initial guess.
    ///
    /// The guess matters: when unmapping many nearby points
    /// (or the same point on a neighboring cell),
    /// warm-starting from the previous solution
    /// saves most of the iterations.
    ///
    /// Fails with [`MappingError::NonConvergence`]
    /// if the residual has not met the tolerance within the iteration cap,
    /// and with [`MappingError::DegenerateGeometry`]
    /// if the normal matrix `JᵀJ` becomes numerically singular
    /// at any iterate. Neither failure is retried internally.
    pub fn unmap_from(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        p: &PhysPoint<SPACE_DIM>,
        initial_guess: RefPoint<DIM>,
    ) -> Result<RefPoint<DIM>, MappingError> {
        Self::check_vertices(vertices)?;
        let params = &self.params;
        let tolerance = params.tolerance * cell_diameter(vertices);

        let mut r = initial_guess;
        let mut residual = Self::map_unchecked(vertices, &r) - p;

        for _ in 0..params.max_iterations {
            let jac = Self::jacobian_unchecked(vertices, &r);
            let normal_matrix = jac.transpose() * jac;

            // the normal matrix is symmetric positive definite
            // whenever the Jacobian has full column rank,
            // so a failed Cholesky factorization
            // (or a determinant collapsing relative to the diagonal)
            // signals degenerate or inverted geometry
            let diagonal_scale: f64 = normal_matrix.diagonal().iter().product();
            let factor = match na::Cholesky::new(normal_matrix) {
                Some(factor) => factor,
                None => return Err(MappingError::DegenerateGeometry),
            };
            if !(factor.determinant() > params.singular_tolerance * diagonal_scale) {
                return Err(MappingError::DegenerateGeometry);
            }

            if residual.norm() <= tolerance {
                return Ok(r);
            }

            let mut step = factor.solve(&(-(jac.transpose() * residual)));

            // damping: a full Newton step may overshoot on skewed cells.
            // halve it until the residual actually decreases,
            // giving up (and accepting the short step) after a few rounds
            let mut next = r + step;
            let mut next_residual = Self::map_unchecked(vertices, &next) - p;
            let mut halvings = 0;
            while next_residual.norm() >= residual.norm()
                && halvings < params.max_step_halvings
            {
                step *= 0.5;
                next = r + step;
                next_residual = Self::map_unchecked(vertices, &next) - p;
                halvings += 1;
            }

            r = next;
            residual = next_residual;
        }

        Err(MappingError::NonConvergence(params.max_iterations))
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{na, shape, NewtonParams};
    use approx::assert_abs_diff_eq;

    fn unit_square() -> [na::Vector2<f64>; 4] {
        [
            na::Vector2::new(0., 0.),
            na::Vector2::new(1., 0.),
            na::Vector2::new(0., 1.),
            na::Vector2::new(1., 1.),
        ]
    }

    fn skewed_quad() -> [na::Vector2<f64>; 4] {
        [
            na::Vector2::new(0., 0.),
            na::Vector2::new(2., 0.),
            na::Vector2::new(0., 1.),
            na::Vector2::new(3., 1.),
        ]
    }

    #[test]
    fn unit_square_center_round_trips() {
        let mapping = CellMapping::<2, 2>::new();
        let found = mapping
            .unmap(&unit_square(), &na::Vector2::new(0.5, 0.5))
            .unwrap();
        assert_abs_diff_eq!(found, na::Vector2::new(0.5, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn skewed_quad_centroid_round_trips() {
        let mapping = CellMapping::<2, 2>::new();
        let vertices = skewed_quad();
        let center = mapping.map(&vertices, &na::Vector2::new(0.5, 0.5)).unwrap();
        let found = mapping.unmap(&vertices, &center).unwrap();
        assert_abs_diff_eq!(found, na::Vector2::new(0.5, 0.5), epsilon = 1e-10);
    }

    /// Round-trip a grid of interior and boundary reference points
    /// through a non-affine 3D cell.
    #[test]
    fn trilinear_cell_round_trips() {
        let mapping = CellMapping::<3, 3>::new();
        // a hexahedron with every face non-planar
        let vertices: Vec<na::Vector3<f64>> = (0..8)
            .map(|i| {
                let c = shape::corner::<3>(i);
                na::Vector3::new(
                    2. * c.x + 0.3 * c.y * c.z,
                    c.y - 0.2 * c.x * c.z,
                    1.5 * c.z + 0.4 * c.x * c.y,
                )
            })
            .collect();

        let steps = [0., 0.25, 0.5, 1.];
        for &x in &steps {
            for &y in &steps {
                for &z in &steps {
                    let r = na::Vector3::new(x, y, z);
                    let p = mapping.map(&vertices, &r).unwrap();
                    let found = mapping.unmap(&vertices, &p).unwrap();
                    assert_abs_diff_eq!(found, r, epsilon = 1e-10);
                }
            }
        }
    }

    /// A repeated vertex collapses one corner of the cell;
    /// unmapping the image of that corner must report the degeneracy
    /// instead of returning a plausible-looking answer.
    #[test]
    fn collapsed_corner_is_degenerate() {
        let vertices = [
            na::Vector2::new(0., 0.),
            na::Vector2::new(1., 0.),
            na::Vector2::new(0., 1.),
            na::Vector2::new(0., 1.),
        ];
        let mapping = CellMapping::<2, 2>::new();
        assert_eq!(
            mapping.unmap(&vertices, &na::Vector2::new(0., 1.)),
            Err(MappingError::DegenerateGeometry)
        );
    }

    /// A cell squashed onto a line has a singular Jacobian everywhere.
    #[test]
    fn collinear_cell_is_degenerate() {
        let vertices = [
            na::Vector2::new(0., 0.),
            na::Vector2::new(1., 0.),
            na::Vector2::new(2., 0.),
            na::Vector2::new(3., 0.),
        ];
        let mapping = CellMapping::<2, 2>::new();
        assert_eq!(
            mapping.unmap(&vertices, &na::Vector2::new(0.5, 0.5)),
            Err(MappingError::DegenerateGeometry)
        );
    }

    /// A point far outside the cell either fails with non-convergence
    /// or converges to reference coordinates outside `[0, 1]^2`;
    /// it is never silently clamped to the cell.
    #[test]
    fn far_outside_point_is_not_clamped() {
        let mapping = CellMapping::<2, 2>::new();
        let far = na::Vector2::new(150., 80.);
        match mapping.unmap(&skewed_quad(), &far) {
            Ok(r) => {
                assert!(
                    r.iter().any(|&c| !(-1e-10..=1. + 1e-10).contains(&c)),
                    "converged inside the cell for a far-away point: {r:?}",
                );
                // and the result is a genuine root
                let image = mapping.map(&skewed_quad(), &r).unwrap();
                assert_abs_diff_eq!(image, far, epsilon = 1e-8);
            }
            Err(e) => assert_eq!(e, MappingError::NonConvergence(40)),
        }
    }

    /// Warm starts converge to the same solution as the centroid start.
    #[test]
    fn warm_start_agrees_with_cold_start() {
        let mapping = CellMapping::<2, 2>::new();
        let vertices = skewed_quad();
        let p = mapping.map(&vertices, &na::Vector2::new(0.8, 0.1)).unwrap();

        let cold = mapping.unmap(&vertices, &p).unwrap();
        let warm = mapping
            .unmap_from(&vertices, &p, na::Vector2::new(0.79, 0.11))
            .unwrap();
        assert_abs_diff_eq!(cold, warm, epsilon = 1e-10);
        assert_abs_diff_eq!(cold, na::Vector2::new(0.8, 0.1), epsilon = 1e-10);
    }

    /// Unmapping works in the least-squares sense for a surface cell in 3D.
    #[test]
    fn surface_cell_round_trips() {
        let vertices = [
            na::Vector3::new(0., 0., 0.),
            na::Vector3::new(1., 0., 1.),
            na::Vector3::new(0., 1., 1.),
            na::Vector3::new(1., 1., 2.),
        ];
        let mapping = CellMapping::<2, 3>::new();
        let r = na::Vector2::new(0.3, 0.6);
        let p = mapping.map(&vertices, &r).unwrap();
        let found = mapping.unmap(&vertices, &p).unwrap();
        assert_abs_diff_eq!(found, r, epsilon = 1e-10);
    }

    /// An exhausted iteration cap reports non-convergence
    /// instead of looping or returning a half-converged point.
    #[test]
    fn iteration_cap_is_reported() {
        let mapping = CellMapping::<2, 2>::with_params(NewtonParams {
            max_iterations: 0,
            ..NewtonParams::default()
        });
        assert_eq!(
            mapping.unmap(&skewed_quad(), &na::Vector2::new(1., 0.5)),
            Err(MappingError::NonConvergence(0))
        );
    }

    #[test]
    fn vertex_count_checked_before_iterating() {
        let mapping = CellMapping::<2, 2>::new();
        let too_few = [na::Vector2::new(0., 0.); 3];
        assert_eq!(
            mapping.unmap(&too_few, &na::Vector2::new(0.5, 0.5)),
            Err(MappingError::WrongVertexCount {
                expected: 4,
                got: 3
            })
        );
    }
}
