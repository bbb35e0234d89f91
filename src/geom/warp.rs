//! Per-vertex warp of a mesh through an arbitrary position mapping.
//!
//! The mapping sees each vertex independently, so a flat plate can be bent
//! into a non-rigid shape by sending different vertices through different
//! transforms. Topology is never touched: the output has the same vertex
//! count and the same triangles. The only repair is orientation. A mapping
//! that mirrors the mesh turns a closed solid inside out, and the winding is
//! then reversed so the solid faces outward again.
//!
//! # Example
//!
//! ```ignore
//! let lifted = Transform::translate(Vec3::Z);
//! let (warped, diag) = warp_mesh(&plate, |p| Some(lifted.apply_point(p)))?;
//! assert_eq!(warped.vertex_count(), plate.vertex_count());
//! ```

use super::mesh::{GeomMesh, MeshError};
use super::Point3;

// ============================================================================
// Error types
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WarpError {
    #[error("warp input mesh has no triangles")]
    EmptyMesh,

    #[error("warp input mesh is invalid: {0}")]
    InvalidMesh(#[from] MeshError),

    /// The mapping declined the vertex (returned `None`).
    #[error("warp mapping rejected vertex {index} at {position:?}")]
    Unmapped { index: usize, position: [f64; 3] },

    #[error("warp mapping produced a non-finite position for vertex {index}")]
    NonFinite { index: usize },
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Diagnostics specific to a warp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarpDiagnostics {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub min_displacement: f64,
    pub max_displacement: f64,
    /// Whether the winding was reversed to keep the solid outward-facing.
    pub winding_reversed: bool,
    pub warnings: Vec<String>,
}

// ============================================================================
// Warp
// ============================================================================

/// Maps every vertex of `mesh` through `map`.
///
/// # Errors
/// Fails on an empty or invalid mesh, when `map` returns `None`, or when it
/// produces a non-finite position.
pub fn warp_mesh<F>(mesh: &GeomMesh, map: F) -> Result<(GeomMesh, WarpDiagnostics), WarpError>
where
    F: Fn(Point3) -> Option<Point3>,
{
    mesh.validate()?;
    if mesh.is_empty() {
        return Err(WarpError::EmptyMesh);
    }

    let mut diagnostics = WarpDiagnostics {
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.triangle_count(),
        min_displacement: f64::INFINITY,
        ..WarpDiagnostics::default()
    };

    let mut positions = Vec::with_capacity(mesh.positions.len());
    for (index, &position) in mesh.positions.iter().enumerate() {
        let source = Point3::from_array(position);
        let target = map(source).ok_or(WarpError::Unmapped { index, position })?;
        if !target.is_finite() {
            return Err(WarpError::NonFinite { index });
        }
        let displacement = source.distance_to(target);
        diagnostics.min_displacement = diagnostics.min_displacement.min(displacement);
        diagnostics.max_displacement = diagnostics.max_displacement.max(displacement);
        positions.push(target.to_array());
    }

    let mut warped = GeomMesh::new(positions, mesh.indices.clone());
    let before = mesh.signed_volume();
    let after = warped.signed_volume();
    if before > 0.0 && after < 0.0 {
        warped.flip_winding();
        diagnostics.winding_reversed = true;
    }
    if after.abs() <= f64::EPSILON * before.abs().max(1.0) {
        diagnostics
            .warnings
            .push("warped mesh encloses no volume".to_string());
    }

    Ok((warped, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Transform, Vec3, cuboid};

    #[test]
    fn rigid_warp_keeps_topology_and_orientation() {
        let plate = cuboid([17.0, 17.0, 4.0], true);
        let t = Transform::translate(Vec3::new(1.0, 2.0, 3.0)) * Transform::rotate_x(0.4);
        let (warped, diag) = warp_mesh(&plate, |p| Some(t.apply_point(p))).expect("warp");

        assert_eq!(warped.indices, plate.indices);
        assert_eq!(warped.vertex_count(), plate.vertex_count());
        assert!(!diag.winding_reversed);
        assert!((warped.signed_volume() - plate.signed_volume()).abs() < 1e-9);
    }

    #[test]
    fn mirror_warp_restores_outward_winding() {
        let plate = cuboid([2.0, 3.0, 4.0], true);
        let (warped, diag) =
            warp_mesh(&plate, |p| Some(Point3::new(-p.x, p.y, p.z))).expect("warp");

        assert!(diag.winding_reversed);
        assert!(warped.signed_volume() > 0.0);
        for (a, b) in warped.indices.chunks_exact(3).zip(plate.indices.chunks_exact(3)) {
            let mut a = a.to_vec();
            let mut b = b.to_vec();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn rejected_vertex_is_an_error() {
        let plate = cuboid([1.0, 1.0, 1.0], true);
        let err = warp_mesh(&plate, |p| (p.x < 0.0).then_some(p)).unwrap_err();
        assert!(matches!(err, WarpError::Unmapped { .. }));
    }

    #[test]
    fn non_finite_output_is_an_error() {
        let plate = cuboid([1.0, 1.0, 1.0], true);
        let err = warp_mesh(&plate, |_| Some(Point3::new(f64::NAN, 0.0, 0.0))).unwrap_err();
        assert_eq!(err, WarpError::NonFinite { index: 0 });
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let err = warp_mesh(&GeomMesh::default(), Some).unwrap_err();
        assert_eq!(err, WarpError::EmptyMesh);
    }
}
