mod bvh;
mod core;
mod csg;
mod diagnostics;
mod export;
mod mesh;
mod primitive;
mod topology;
mod warp;

pub use core::{Axis, BBox, Point3, Tolerance, Transform, Vec3};
pub use csg::{BooleanError, BooleanOp, boolean_meshes, difference_all, union_all};
pub use diagnostics::GeomMeshDiagnostics;
pub use export::write_obj;
pub use mesh::{GeomMesh, MeshError};
pub use primitive::cuboid;
pub use topology::connected_components;
pub use warp::{WarpDiagnostics, WarpError, warp_mesh};
