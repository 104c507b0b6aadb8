//! Shape values and gradients precomputed at a fixed set of reference points.
//!
//! Quadrature rules evaluate the mapping at the same reference points
//! on every cell of a mesh. A [`ShapeTable`] tabulates the shape functions
//! at those points once, so that per-cell work reduces to
//! blending vertex positions with the stored weights.
//! This reuse across cells is the main performance lever of the subsystem.
//!
//! A table is immutable once built and can be shared freely across threads.
//! Switching to a different point set (say, a different quadrature rule)
//! means building a new table and swapping it in,
//! never mutating an existing one in place.

use itertools::izip;

use crate::{mapping::MappingError, shape, Jacobian, PhysPoint, RefPoint};

/// Tabulated shape values and gradients at a fixed, ordered set
/// of reference points.
#[derive(Clone, Debug)]
pub struct ShapeTable<const DIM: usize> {
    points: Vec<RefPoint<DIM>>,
    /// shape values in point-major order, stride `2^DIM`
    values: Vec<f64>,
    /// shape gradients, same layout as `values`
    gradients: Vec<RefPoint<DIM>>,
}

impl<const DIM: usize> ShapeTable<DIM> {
    /// Tabulate the shape functions at the given evaluation points.
    pub fn build(points: &[RefPoint<DIM>]) -> Self {
        let corner_count = shape::corner_count::<DIM>();
        let mut values = Vec::with_capacity(points.len() * corner_count);
        let mut gradients = Vec::with_capacity(points.len() * corner_count);
        for r in points {
            for i in 0..corner_count {
                values.push(shape::value(i, r));
                gradients.push(shape::gradient(i, r));
            }
        }
        Self {
            points: points.to_vec(),
            values,
            gradients,
        }
    }

    /// The evaluation points this table was built for, in order.
    pub fn points(&self) -> &[RefPoint<DIM>] {
        &self.points
    }

    /// Number of evaluation points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of cell corners, `2^DIM`.
    pub fn corner_count(&self) -> usize {
        shape::corner_count::<DIM>()
    }

    /// Stored value of shape function `corner` at evaluation point `point`.
    pub fn value(&self, point: usize, corner: usize) -> f64 {
        self.values[point * self.corner_count() + corner]
    }

    /// Stored gradient of shape function `corner` at evaluation point `point`.
    pub fn gradient(&self, point: usize, corner: usize) -> &RefPoint<DIM> {
        &self.gradients[point * self.corner_count() + corner]
    }

    fn check_cell<const SPACE_DIM: usize>(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        out_len: usize,
    ) -> Result<(), MappingError> {
        let expected = self.corner_count();
        if vertices.len() != expected {
            return Err(MappingError::WrongVertexCount {
                expected,
                got: vertices.len(),
            });
        }
        if out_len != self.point_count() {
            return Err(MappingError::OutputLengthMismatch {
                expected: self.point_count(),
                got: out_len,
            });
        }
        Ok(())
    }

    /// Forward-map every evaluation point on the given cell,
    /// writing one physical point per evaluation point into `out`.
    pub fn map_points<const SPACE_DIM: usize>(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        out: &mut [PhysPoint<SPACE_DIM>],
    ) -> Result<(), MappingError> {
        self.check_cell(vertices, out.len())?;
        for (out_point, point_values) in
            izip!(out.iter_mut(), self.values.chunks_exact(self.corner_count()))
        {
            *out_point = izip!(point_values, vertices).map(|(w, v)| v * *w).sum();
        }
        Ok(())
    }

    /// Compute the mapping Jacobian at every evaluation point
    /// on the given cell, writing one matrix per evaluation point into `out`.
    pub fn jacobians<const SPACE_DIM: usize>(
        &self,
        vertices: &[PhysPoint<SPACE_DIM>],
        out: &mut [Jacobian<SPACE_DIM, DIM>],
    ) -> Result<(), MappingError> {
        self.check_cell(vertices, out.len())?;
        for (out_jac, point_gradients) in izip!(
            out.iter_mut(),
            self.gradients.chunks_exact(self.corner_count())
        ) {
            *out_jac = izip!(point_gradients, vertices)
                .map(|(g, v)| v * g.transpose())
                .sum();
        }
        Ok(())
    }
}

//
// tests
//
