//! Mappings between the canonical reference cell (unit interval,
//! square, or cube) and straight-edged cells in physical space,
//! the geometric core of a finite element discretization.
//!
//! The forward direction blends a cell's `2^DIM` corner positions
//! with d-linear shape functions; the inverse direction
//! (finding the reference coordinates of a given physical point)
//! has no closed form in general and is solved with a damped
//! Newton iteration. See [`CellMapping`] for both,
//! [`ShapeTable`] for amortizing shape evaluation
//! over repeated points such as quadrature nodes,
//! and [`VertexSource`] for plugging in
//! where cell geometry comes from.
//!
//! Everything here is plain immutable data:
//! mappings, tables, and points can be copied, shared across threads,
//! and used on independent cells in parallel without synchronization.

#![warn(missing_docs)]

pub mod shape;

pub mod mapping;
#[doc(inline)]
pub use mapping::{
    CellMapping, MappingError, NewtonParams, STANDARD_MAPPING_1D, STANDARD_MAPPING_2D,
    STANDARD_MAPPING_3D,
};

mod inverse;

pub mod table;
#[doc(inline)]
pub use table::ShapeTable;

pub mod source;
#[doc(inline)]
pub use source::{Displaced, FromFn, VertexSource};

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// A point in reference-cell coordinates, conceptually in `[0, 1]^DIM`
/// (but meaningful, and accepted, outside it).
pub type RefPoint<const DIM: usize> = na::SVector<f64, DIM>;
/// A point in physical space.
pub type PhysPoint<const SPACE_DIM: usize> = na::SVector<f64, SPACE_DIM>;
/// The derivative of the forward map at a reference point,
/// with one column per reference coordinate.
pub type Jacobian<const SPACE_DIM: usize, const DIM: usize> =
    na::SMatrix<f64, SPACE_DIM, DIM>;
