//! The d-linear mapping between the reference cell and a physical cell.
//!
//! A [`CellMapping`] blends the `2^DIM` corner positions of a cell
//! by the shape functions of [`crate::shape`],
//! giving the forward map from reference to physical coordinates
//! together with its Jacobian.
//! The inverse direction (physical point to reference point)
//! has no closed form and is solved iteratively;
//! see the methods in [`crate::inverse`].
//!
//! Cell vertices are not stored anywhere in the mapping.
//! They are passed to every operation fresh,
//! either directly as a slice or through a
//! [`VertexSource`][crate::VertexSource],
//! in the corner order described in [`crate::shape`].

use static_init::dynamic;

use crate::{shape, Jacobian, PhysPoint, RefPoint};

/// Error produced by mapping operations.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum MappingError {
    /// A cell vertex slice did not have exactly `2^DIM` entries.
    #[error("expected {expected} cell vertices, got {got}")]
    WrongVertexCount {
        /// The `2^DIM` vertices the reference cell has.
        expected: usize,
        /// The number of vertices actually passed.
        got: usize,
    },
    /// An output buffer did not have one entry per evaluation point.
    #[error("expected an output buffer of length {expected}, got {got}")]
    OutputLengthMismatch {
        /// The number of evaluation points.
        expected: usize,
        /// The length of the buffer actually passed.
        got: usize,
    },
    /// The Newton iteration of the inverse map did not converge.
    ///
    /// Either the physical point lies (far) outside the cell
    /// or the initial guess was poor;
    /// the caller may retry with a better guess
    /// or conclude the point is not in the cell.
    #[error("inverse mapping did not converge within {0} iterations")]
    NonConvergence(usize),
    /// The cell geometry is degenerate or inverted:
    /// the Jacobian became numerically singular during inversion.
    #[error("singular Jacobian: cell geometry is degenerate")]
    DegenerateGeometry,
}

/// Parameters of the damped Newton iteration used by
/// [`CellMapping::unmap`] and friends.
///
/// The defaults are conservative and appropriate for most meshes;
/// they are exposed here rather than hard-coded
/// because badly scaled or nearly degenerate geometry
/// can require loosening them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonParams {
    /// Residual tolerance *relative to the cell diameter*.
    ///
    /// The iteration stops once the physical-space residual norm
    /// drops below `tolerance * diameter`,
    /// so that convergence does not depend on the absolute scale
    /// of the cell. Default `1e-12`.
    pub tolerance: f64,
    /// Hard cap on Newton iterations before giving up
    /// with [`MappingError::NonConvergence`]. Default 40.
    pub max_iterations: usize,
    /// How many times a rejected Newton step is halved
    /// before being accepted anyway. Guards against overshoot
    /// on strongly skewed cells. Default 8.
    pub max_step_halvings: usize,
    /// Relative determinant floor for the normal matrix `JᵀJ`,
    /// measured against the product of its diagonal.
    /// Below this the geometry is reported as degenerate. Default `1e-24`.
    pub singular_tolerance: f64,
}

impl Default for NewtonParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 40,
            max_step_halvings: 8,
            singular_tolerance: 1e-24,
        }
    }
}

/// The d-linear map between the `DIM`-dimensional reference cell
/// and a straight-edged cell in `SPACE_DIM`-dimensional space
/// (`SPACE_DIM >= DIM`; a surface cell in 3D has `DIM = 2`, `SPACE_DIM = 3`).
///
/// This is a plain value type: it holds no cell state,
/// only the [`NewtonParams`] of the inverse iteration,
/// and is cheap to copy and safe to share between threads.
///
/// ```
/// use cellmap::{na, CellMapping};
///
/// let vertices = [
///     na::Vector2::new(0., 0.),
///     na::Vector2::new(2., 0.),
///     na::Vector2::new(0., 1.),
///     na::Vector2::new(3., 1.),
/// ];
/// let mapping = CellMapping::<2, 2>::new();
/// let center = mapping.map(&vertices, &na::Vector2::new(0.5, 0.5))?;
/// let back = mapping.unmap(&vertices, &center)?;
/// assert!((back - na::Vector2::new(0.5, 0.5)).norm() < 1e-10);
/// # Ok::<(), cellmap::MappingError>(())
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellMapping<const DIM: usize, const SPACE_DIM: usize> {
    /// Configuration of the iterative inverse map.
    pub params: NewtonParams,
}

impl<const DIM: usize, const SPACE_DIM: usize> CellMapping<DIM, SPACE_DIM> {
    /// A mapping with default [`NewtonParams`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping with custom [`NewtonParams`].
    pub fn with_params(params: NewtonParams) -> Self {
        Self { params }
    }

    pub(crate) fn check_vertices(
        vertices: &[PhysPoint<SPACE_DIM>],
    ) -> Result<(), MappingError> {
        let expected = shape::corner_count::<DIM>();
        if vertices.len() != expected {
            return Err(MappingError::WrongVertexCount {
                expected,
                got: vertices.len(),
            });
        }
        Ok(())
    }

    /// Map a reference point to physical space, `Σ_i N_i(r) · v_i`.
    ///
    /// Fails only on a malformed vertex slice.
    /// `r` is not required to lie inside the reference cell.
    pub fn map(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        r: &RefPoint<DIM>,
    ) -> Result<PhysPoint<SPACE_DIM>, MappingError> {
        Self::check_vertices(vertices)?;
        Ok(Self::map_unchecked(vertices, r))
    }

    pub(crate) fn map_unchecked(
        vertices: &[PhysPoint<SPACE_DIM>],
        r: &RefPoint<DIM>,
    ) -> PhysPoint<SPACE_DIM> {
        vertices
            .iter()
            .enumerate()
            .map(|(i, v)| v * shape::value(i, r))
            .sum()
    }

    /// The Jacobian `∂x/∂ξ` of the forward map at `r`,
    /// a `SPACE_DIM × DIM` matrix.
    ///
    /// For a non-degenerate cell with `SPACE_DIM == DIM`
    /// this matrix is invertible everywhere inside the reference cell.
    pub fn jacobian(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        r: &RefPoint<DIM>,
    ) -> Result<Jacobian<SPACE_DIM, DIM>, MappingError> {
        Self::check_vertices(vertices)?;
        Ok(Self::jacobian_unchecked(vertices, r))
    }

    pub(crate) fn jacobian_unchecked(
        vertices: &[PhysPoint<SPACE_DIM>],
        r: &RefPoint<DIM>,
    ) -> Jacobian<SPACE_DIM, DIM> {
        vertices
            .iter()
            .enumerate()
            .map(|(i, v)| v * shape::gradient(i, r).transpose())
            .sum()
    }

    /// Derivative of the Jacobian in each reference direction:
    /// element `a` of the result is `∂J/∂ξ_a` at `r`.
    ///
    /// Identically zero when the cell is an affine image
    /// of the reference cell.
    pub fn jacobian_derivative(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        r: &RefPoint<DIM>,
    ) -> Result<[Jacobian<SPACE_DIM, DIM>; DIM], MappingError> {
        Self::check_vertices(vertices)?;
        let hessians: Vec<_> = (0..vertices.len()).map(|i| shape::hessian(i, r)).collect();
        Ok(std::array::from_fn(|a| {
            vertices
                .iter()
                .zip(&hessians)
                .map(|(v, hess)| v * hess.row(a))
                .sum()
        }))
    }
}

/// Shared standard mapping for 1D cells (intervals on a line).
///
/// Constructed lazily, exactly once, on first access;
/// exists because many call sites need "the" standard mapping
/// without configuring one.
#[dynamic]
pub static STANDARD_MAPPING_1D: CellMapping<1, 1> = CellMapping::new();

/// Shared standard mapping for 2D cells (quadrilaterals in the plane).
///
/// See [`STANDARD_MAPPING_1D`] for initialization semantics.
#[dynamic]
pub static STANDARD_MAPPING_2D: CellMapping<2, 2> = CellMapping::new();

/// Shared standard mapping for 3D cells (hexahedra in space).
///
/// See [`STANDARD_MAPPING_1D`] for initialization semantics.
#[dynamic]
pub static STANDARD_MAPPING_3D: CellMapping<3, 3> = CellMapping::new();

//
// tests
//
