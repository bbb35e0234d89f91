//! The solid-modelling seam.
//!
//! Everything in `keyboard` talks to geometry through [`GeometryKernel`].
//! [`MeshKernel`] backs it with the triangle-mesh booleans in
//! [`crate::geom`]; tests swap in a kernel that only tracks poses.

use std::sync::{Mutex, PoisonError};

use log::warn;

use crate::geom::{
    GeomMesh, GeomMeshDiagnostics, Point3, Transform, Vec3, cuboid, difference_all, union_all,
    warp_mesh,
};

use super::GeometryError;

/// Vertex mapping handed to [`GeometryKernel::warp`]. `None` rejects the
/// vertex and fails the warp.
pub type VertexMap<'a> = dyn Fn(Point3) -> Option<Point3> + Sync + 'a;

/// Solid operations the keyboard builder needs.
///
/// Solids are immutable values: every operation returns a new one.
pub trait GeometryKernel: Sync {
    type Solid: Clone + Send + Sync;

    /// Axis-aligned box, centred on the origin or with its min corner there.
    ///
    /// # Errors
    /// Non-positive or non-finite extents.
    fn cuboid(&self, extents: [f64; 3], centered: bool) -> Result<Self::Solid, GeometryError>;

    /// # Errors
    /// Empty input or a kernel failure.
    fn union(&self, solids: Vec<Self::Solid>) -> Result<Self::Solid, GeometryError>;

    /// `base` minus every solid in `cutters`.
    ///
    /// # Errors
    /// A kernel failure or an empty result.
    fn difference(
        &self,
        base: &Self::Solid,
        cutters: Vec<Self::Solid>,
    ) -> Result<Self::Solid, GeometryError>;

    fn transform(&self, solid: &Self::Solid, transform: Transform) -> Self::Solid;

    /// Moves every vertex through `map`, keeping topology.
    ///
    /// # Errors
    /// Rejected or non-finite vertices.
    fn warp(&self, solid: &Self::Solid, map: &VertexMap<'_>) -> Result<Self::Solid, GeometryError>;

    fn translate(&self, solid: &Self::Solid, offset: Vec3) -> Self::Solid {
        self.transform(solid, Transform::translate(offset))
    }

    /// Euler rotation in degrees, X first.
    fn rotate_deg(&self, solid: &Self::Solid, degrees: [f64; 3]) -> Self::Solid {
        self.transform(solid, Transform::rotate_euler_deg(degrees))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mesh kernel
// ─────────────────────────────────────────────────────────────────────────────

/// [`GeometryKernel`] over [`GeomMesh`]. Repairs made by the booleans along
/// the way accumulate and can be collected with [`MeshKernel::take_repairs`].
#[derive(Debug, Default)]
pub struct MeshKernel {
    repairs: Mutex<GeomMeshDiagnostics>,
}

impl MeshKernel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, diagnostics: &GeomMeshDiagnostics) {
        self.repairs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .merge_repairs(diagnostics);
    }

    /// Repairs accumulated since the last call.
    pub fn take_repairs(&self) -> GeomMeshDiagnostics {
        std::mem::take(&mut *self.repairs.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl GeometryKernel for MeshKernel {
    type Solid = GeomMesh;

    fn cuboid(&self, extents: [f64; 3], centered: bool) -> Result<GeomMesh, GeometryError> {
        if extents.iter().any(|e| !(e.is_finite() && *e > 0.0)) {
            return Err(GeometryError::EmptySolid {
                operation: "cuboid",
            });
        }
        Ok(cuboid(extents, centered))
    }

    fn union(&self, solids: Vec<GeomMesh>) -> Result<GeomMesh, GeometryError> {
        let (mesh, diagnostics) = union_all(solids)?;
        self.record(&diagnostics);
        Ok(mesh)
    }

    fn difference(
        &self,
        base: &GeomMesh,
        cutters: Vec<GeomMesh>,
    ) -> Result<GeomMesh, GeometryError> {
        let (mesh, diagnostics) = difference_all(base, &cutters)?;
        self.record(&diagnostics);
        Ok(mesh)
    }

    fn transform(&self, solid: &GeomMesh, transform: Transform) -> GeomMesh {
        let mut mesh = solid.transformed(transform);
        if transform.determinant() < 0.0 {
            mesh.flip_winding();
        }
        mesh
    }

    fn warp(&self, solid: &GeomMesh, map: &VertexMap<'_>) -> Result<GeomMesh, GeometryError> {
        let (mesh, diagnostics) = warp_mesh(solid, map)?;
        let mut repairs = GeomMeshDiagnostics::default();
        if diagnostics.winding_reversed {
            warn!("warp turned the solid inside out; winding reversed");
            repairs.flipped_triangle_count = diagnostics.triangle_count;
            repairs.add_warning("warp reversed the winding");
        }
        for warning in diagnostics.warnings {
            repairs.add_warning(warning);
        }
        self.record(&repairs);
        Ok(mesh)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pose kernel (tests)
// ─────────────────────────────────────────────────────────────────────────────

/// A kernel whose solids are the list of poses of the primitives they were
/// built from. Lets tests compare where the assembler puts things without
/// running any booleans.
#[cfg(test)]
pub(crate) mod pose {
    use std::sync::{Mutex, PoisonError};

    use super::{GeometryKernel, VertexMap};
    use crate::geom::Transform;
    use crate::keyboard::GeometryError;

    #[derive(Debug, Default)]
    pub(crate) struct PoseKernel {
        operations: Mutex<Vec<&'static str>>,
    }

    impl PoseKernel {
        fn log(&self, operation: &'static str) {
            self.operations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(operation);
        }

        pub(crate) fn count(&self, operation: &str) -> usize {
            self.operations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|op| **op == operation)
                .count()
        }
    }

    impl GeometryKernel for PoseKernel {
        type Solid = Vec<Transform>;

        fn cuboid(&self, _: [f64; 3], _: bool) -> Result<Self::Solid, GeometryError> {
            self.log("cuboid");
            Ok(vec![Transform::identity()])
        }

        fn union(&self, solids: Vec<Self::Solid>) -> Result<Self::Solid, GeometryError> {
            self.log("union");
            if solids.is_empty() {
                return Err(GeometryError::EmptySolid { operation: "union" });
            }
            Ok(solids.into_iter().flatten().collect())
        }

        fn difference(
            &self,
            base: &Self::Solid,
            _: Vec<Self::Solid>,
        ) -> Result<Self::Solid, GeometryError> {
            self.log("difference");
            Ok(base.clone())
        }

        fn transform(&self, solid: &Self::Solid, transform: Transform) -> Self::Solid {
            solid.iter().map(|pose| transform * *pose).collect()
        }

        fn warp(
            &self,
            solid: &Self::Solid,
            _: &VertexMap<'_>,
        ) -> Result<Self::Solid, GeometryError> {
            self.log("warp");
            Ok(solid.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_kernel_rejects_bad_extents() {
        let kernel = MeshKernel::new();
        assert_eq!(
            kernel.cuboid([1.0, 0.0, 1.0], true),
            Err(GeometryError::EmptySolid {
                operation: "cuboid"
            })
        );
    }

    #[test]
    fn mirror_warp_restores_outward_winding() {
        let kernel = MeshKernel::new();
        let cube = kernel.cuboid([1.0, 2.0, 3.0], true).expect("cube");
        let mirrored = kernel
            .warp(&cube, &|p: Point3| Some(Point3::new(-p.x, p.y, p.z)))
            .expect("warp");
        assert!(mirrored.signed_volume() > 0.0);
        assert_eq!(kernel.take_repairs().flipped_triangle_count, 12);
        assert_eq!(kernel.take_repairs().flipped_triangle_count, 0);
    }

    #[test]
    fn rejected_vertex_fails_the_warp() {
        let kernel = MeshKernel::new();
        let cube = kernel.cuboid([1.0, 1.0, 1.0], true).expect("cube");
        let err = kernel.warp(&cube, &|_| None).expect_err("rejected");
        assert!(matches!(err, GeometryError::Warp(_)));
    }

    #[test]
    fn provided_rotation_is_x_first() {
        let kernel = pose::PoseKernel::default();
        let solid = kernel.cuboid([1.0; 3], true).expect("pose");
        let rotated = kernel.rotate_deg(&solid, [-8.0, 0.0, 0.0]);
        let expected = Transform::rotate_deg(crate::geom::Axis::X, -8.0);
        assert!(rotated[0].max_abs_diff(expected) < 1e-12);
        assert_eq!(kernel.count("cuboid"), 1);
    }
}
