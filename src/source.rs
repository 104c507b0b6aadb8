//! Strategies for obtaining the corner vertices of a cell.
//!
//! The mapping itself never stores geometry.
//! Wherever an operation needs cell vertices,
//! they either come in directly as a slice
//! or are pulled from a [`VertexSource`] by cell index.
//! Swapping the source changes where geometry comes from
//! without touching the mapping:
//! a plain source reads positions from mesh storage,
//! while [`Displaced`] adds an externally computed displacement field
//! on top of any other source
//! (mapping cells of a deformed configuration, for instance).

use nalgebra as na;

use crate::{
    mapping::{CellMapping, MappingError},
    PhysPoint, RefPoint,
};

/// A supplier of cell corner vertices.
///
/// Vertices are produced fresh on every call, `2^DIM` of them,
/// in the corner order described in [`crate::shape`].
pub trait VertexSource<const SPACE_DIM: usize> {
    /// Corner positions of the cell with the given index.
    fn vertices(&self, cell: usize) -> Vec<PhysPoint<SPACE_DIM>>;
}

/// A vertex source defined by a plain function of the cell index.
#[derive(Clone)]
pub struct FromFn<const SPACE_DIM: usize, VertFn>(pub VertFn)
where
    VertFn: Fn(usize) -> Vec<PhysPoint<SPACE_DIM>>;

impl<const SPACE_DIM: usize, VertFn> VertexSource<SPACE_DIM> for FromFn<SPACE_DIM, VertFn>
where
    VertFn: Fn(usize) -> Vec<PhysPoint<SPACE_DIM>>,
{
    fn vertices(&self, cell: usize) -> Vec<PhysPoint<SPACE_DIM>> {
        self.0(cell)
    }
}

/// A vertex source that offsets another source's vertices
/// by a displacement field evaluated at each vertex.
///
/// This turns a mapping over the undeformed geometry
/// into one over the deformed configuration;
/// the mapping machinery is reused unchanged.
#[derive(Clone)]
pub struct Displaced<Src, DispFn> {
    /// The source of undisplaced geometry.
    pub base: Src,
    /// The displacement added to each vertex position.
    pub displacement: DispFn,
}

impl<const SPACE_DIM: usize, Src, DispFn> VertexSource<SPACE_DIM> for Displaced<Src, DispFn>
where
    Src: VertexSource<SPACE_DIM>,
    DispFn: Fn(&PhysPoint<SPACE_DIM>) -> na::SVector<f64, SPACE_DIM>,
{
    fn vertices(&self, cell: usize) -> Vec<PhysPoint<SPACE_DIM>> {
        let mut vertices = self.base.vertices(cell);
        for v in &mut vertices {
            let offset = (self.displacement)(v);
            *v += offset;
        }
        vertices
    }
}

impl<const DIM: usize, const SPACE_DIM: usize> CellMapping<DIM, SPACE_DIM> {
    /// [`map`][Self::map] with vertices pulled from a source.
    pub fn map_cell(
        &self,
        source: &impl VertexSource<SPACE_DIM>,
        cell: usize,
        r: &RefPoint<DIM>,
    ) -> Result<PhysPoint<SPACE_DIM>, MappingError> {
        self.map(&source.vertices(cell), r)
    }

    /// [`jacobian`][Self::jacobian] with vertices pulled from a source.
    pub fn jacobian_cell(
        &self,
        source: &impl VertexSource<SPACE_DIM>,
        cell: usize,
        r: &RefPoint<DIM>,
    ) -> Result<crate::Jacobian<SPACE_DIM, DIM>, MappingError> {
        self.jacobian(&source.vertices(cell), r)
    }

    /// [`unmap`][Self::unmap] with vertices pulled from a source.
    pub fn unmap_cell(
        &self,
        source: &impl VertexSource<SPACE_DIM>,
        cell: usize,
        p: &PhysPoint<SPACE_DIM>,
    ) -> Result<RefPoint<DIM>, MappingError> {
        self.unmap(&source.vertices(cell), p)
    }

    /// [`unmap_from`][Self::unmap_from] with vertices pulled from a source.
    pub fn unmap_cell_from(
        &self,
        source: &impl VertexSource<SPACE_DIM>,
        cell: usize,
        p: &PhysPoint<SPACE_DIM>,
        initial_guess: RefPoint<DIM>,
    ) -> Result<RefPoint<DIM>, MappingError> {
        self.unmap_from(&source.vertices(cell), p, initial_guess)
    }
}

//
// tests
//
