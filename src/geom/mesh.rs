use std::collections::HashMap;

use super::bvh::Bvh;
use super::diagnostics::GeomMeshDiagnostics;
use super::topology::{connected_components, count_edge_topology, edge_key, open_edges};
use super::{BBox, Point3, Tolerance, Transform, Vec3};

/// Structural problems detected by [`GeomMesh::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("mesh indices are not a triangle list (len {0} % 3 != 0)")]
    NotTriangleList(usize),
    #[error("mesh has invalid vertex coordinates (NaN/Inf)")]
    NonFiniteVertex,
    #[error("mesh index {index} is out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: usize },
}

/// Indexed triangle mesh. Closed solids are stored with counter-clockwise,
/// outward-facing triangles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
}

impl GeomMesh {
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Build a mesh from a triangle soup, welding coincident corners.
    #[must_use]
    pub fn from_triangles(triangles: &[[Point3; 3]], tol: Tolerance) -> Self {
        let points: Vec<Point3> = triangles.iter().flatten().copied().collect();
        let indices: Vec<u32> = (0..points.len() as u32).collect();
        let (points, indices, _) = weld_mesh_vertices(points, indices, tol);
        Self::new(points.into_iter().map(Point3::to_array).collect(), indices)
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions.iter().any(|p| !Point3::from_array(*p).is_finite())
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangleList(self.indices.len()));
        }
        if self.has_invalid_vertices() {
            return Err(MeshError::NonFiniteVertex);
        }
        let vertex_count = self.positions.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfBounds { index, vertex_count });
        }
        Ok(())
    }

    #[must_use]
    pub fn point(&self, index: u32) -> Point3 {
        Point3::from_array(self.positions[index as usize])
    }

    /// Iterates the triangles as corner points. Assumes a validated mesh.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|tri| [self.point(tri[0]), self.point(tri[1]), self.point(tri[2])])
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.positions.iter().copied().map(Point3::from_array))
    }

    /// Signed enclosed volume; positive for a closed outward-oriented mesh.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| a.to_vec3().dot(b.to_vec3().cross(c.to_vec3())))
            .sum::<f64>()
            / 6.0
    }

    /// Reverses the winding of every triangle.
    pub fn flip_winding(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }

    #[must_use]
    pub fn transformed(&self, t: Transform) -> Self {
        let positions = self
            .positions
            .iter()
            .map(|p| t.apply_point(Point3::from_array(*p)).to_array())
            .collect();
        Self::new(positions, self.indices.clone())
    }

    /// Concatenates `other` into `self` without welding.
    pub fn append(&mut self, other: &Self) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Counts topology of the mesh as stored. Callers weld first when the
    /// mesh comes from a triangle soup.
    #[must_use]
    pub fn diagnostics(&self) -> GeomMeshDiagnostics {
        let (open_edge_count, non_manifold_edge_count) = count_edge_topology(&self.indices);
        GeomMeshDiagnostics {
            vertex_count: self.vertex_count(),
            triangle_count: self.triangle_count(),
            open_edge_count,
            non_manifold_edge_count,
            component_count: connected_components(self.vertex_count(), &self.indices),
            ..GeomMeshDiagnostics::default()
        }
    }
}

/// Welds, splits T-junctions, culls degenerates and orients a triangle
/// soup produced by the kernel into a closed solid mesh.
pub(crate) fn finalize_solid(
    points: Vec<Point3>,
    indices: Vec<u32>,
    tol: Tolerance,
) -> (GeomMesh, GeomMeshDiagnostics) {
    let (points, indices, welded) = weld_mesh_vertices(points, indices, tol);
    let (indices, split) = split_t_junctions(&points, &indices, tol);
    let (indices, degenerate) = cull_degenerate_triangles(&points, &indices, Tolerance::ZERO_LENGTH);
    let (points, indices) = compact_vertices(points, &indices);

    let mut mesh = GeomMesh::new(points.into_iter().map(Point3::to_array).collect(), indices);
    let mut flipped = 0;
    if mesh.signed_volume() < 0.0 {
        mesh.flip_winding();
        flipped = mesh.triangle_count();
    }

    let mut diagnostics = mesh.diagnostics();
    diagnostics.welded_vertex_count = welded;
    diagnostics.split_edge_count = split;
    diagnostics.degenerate_triangle_count = degenerate;
    diagnostics.flipped_triangle_count = flipped;
    if flipped > 0 {
        diagnostics.add_warning("mesh orientation flipped (outward)");
    }
    if diagnostics.open_edge_count > 0 {
        diagnostics.add_warning(format!(
            "mesh has {} open edges",
            diagnostics.open_edge_count
        ));
    }
    if diagnostics.non_manifold_edge_count > 0 {
        diagnostics.add_warning(format!(
            "mesh has {} non-manifold edges",
            diagnostics.non_manifold_edge_count
        ));
    }
    (mesh, diagnostics)
}

/// Merges vertices closer than `tol`, using a spatial hash with a
/// one-cell neighbourhood search. Returns the welded count as third value.
pub(crate) fn weld_mesh_vertices(
    points: Vec<Point3>,
    indices: Vec<u32>,
    tol: Tolerance,
) -> (Vec<Point3>, Vec<u32>, usize) {
    if !tol.eps.is_finite() || tol.eps <= 0.0 {
        return (points, indices, 0);
    }

    let inv = 1.0 / tol.eps;
    #[allow(clippy::cast_possible_truncation)]
    let cell_of = |p: Point3| -> Option<(i64, i64, i64)> {
        if !p.is_finite() {
            return None;
        }
        let q = |v: f64| (v * inv).floor().clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Some((q(p.x), q(p.y), q(p.z)))
    };

    let mut buckets: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    let mut remap = Vec::with_capacity(points.len());
    let mut out_points: Vec<Point3> = Vec::with_capacity(points.len());

    for p in points.iter().copied() {
        let cell = cell_of(p);
        let found = cell.and_then(|(cx, cy, cz)| {
            (-1..=1)
                .flat_map(|dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (dx, dy, dz))))
                .filter_map(|(dx, dy, dz)| buckets.get(&(cx + dx, cy + dy, cz + dz)))
                .flatten()
                .copied()
                .find(|&cand| tol.approx_eq_point3(out_points[cand as usize], p))
        });

        let index = found.unwrap_or_else(|| {
            let index = out_points.len() as u32;
            out_points.push(p);
            if let Some(cell) = cell {
                buckets.entry(cell).or_default().push(index);
            }
            index
        });
        remap.push(index);
    }

    let out_indices = indices
        .into_iter()
        .map(|i| remap.get(i as usize).copied().unwrap_or(i))
        .collect();
    let welded = points.len().saturating_sub(out_points.len());
    (out_points, out_indices, welded)
}

/// Whether `p` lies on segment `ab`, away from both ends.
fn point_inside_segment(p: Point3, a: Point3, b: Point3, tol: Tolerance) -> bool {
    let ab = b - a;
    let len2 = ab.length_squared();
    if !len2.is_finite() || len2 <= tol.eps_squared() {
        return false;
    }
    let t = (p - a).dot(ab) / len2;
    let margin = tol.eps / len2.sqrt();
    if t <= margin || t >= 1.0 - margin {
        return false;
    }
    (p - (a + ab * t)).length_squared() <= tol.eps_squared()
}

/// Splits triangle edges at welded vertices lying inside them, so that
/// neighbouring triangles meet along whole edges. Only open edges can
/// carry such a vertex, and the vertex itself ends an open edge.
///
/// Returns the new index list and the number of splits.
pub(crate) fn split_t_junctions(
    points: &[Point3],
    indices: &[u32],
    tol: Tolerance,
) -> (Vec<u32>, usize) {
    let open = open_edges(indices);
    if open.is_empty() {
        return (indices.to_vec(), 0);
    }

    let mut candidates: Vec<u32> = open.iter().flat_map(|&(a, b)| [a, b]).collect();
    candidates.sort_unstable();
    candidates.dedup();
    let boxes: Vec<BBox> = candidates
        .iter()
        .map(|&i| {
            let p = points[i as usize];
            BBox::new(p, p).expand_by(tol.eps)
        })
        .collect();
    let Some(bvh) = Bvh::build(&boxes) else {
        return (indices.to_vec(), 0);
    };

    let vertices_on = |a: u32, b: u32, found: &mut Vec<u32>| {
        let (pa, pb) = (points[a as usize], points[b as usize]);
        let Some(query) = BBox::from_points([pa, pb]) else {
            return;
        };
        bvh.query_bbox(query.expand_by(tol.eps), |k| {
            let v = candidates[k];
            if v != a && v != b && point_inside_segment(points[v as usize], pa, pb, tol) {
                found.push(v);
            }
            true
        });
    };

    let mut out = Vec::with_capacity(indices.len());
    let mut splits = 0usize;
    let mut pending = Vec::new();

    for tri in indices.chunks_exact(3) {
        let corners = [tri[0], tri[1], tri[2]];
        pending.clear();
        for e in 0..3 {
            let (a, b) = (corners[e], corners[(e + 1) % 3]);
            if open.contains(&edge_key(a, b)) {
                vertices_on(a, b, &mut pending);
            }
        }
        if pending.is_empty() {
            out.extend_from_slice(tri);
            continue;
        }

        // A split vertex becomes a corner of both halves, so it never lies
        // inside an edge again.
        let mut stack = vec![corners];
        while let Some(t) = stack.pop() {
            let hit = pending.iter().enumerate().find_map(|(k, &v)| {
                (0..3)
                    .find(|&e| {
                        let (a, b) = (t[e], t[(e + 1) % 3]);
                        v != a
                            && v != b
                            && point_inside_segment(
                                points[v as usize],
                                points[a as usize],
                                points[b as usize],
                                tol,
                            )
                    })
                    .map(|e| (k, e))
            });
            match hit {
                Some((k, e)) => {
                    let v = pending.swap_remove(k);
                    let (a, b, c) = (t[e], t[(e + 1) % 3], t[(e + 2) % 3]);
                    stack.push([a, v, c]);
                    stack.push([v, b, c]);
                    splits += 1;
                }
                None => out.extend_from_slice(&t),
            }
        }
    }

    (out, splits)
}

/// Drops triangles with repeated corners or (near) zero area.
pub(crate) fn cull_degenerate_triangles(
    points: &[Point3],
    indices: &[u32],
    tol: Tolerance,
) -> (Vec<u32>, usize) {
    let mut out = Vec::with_capacity(indices.len());
    let mut removed = 0usize;

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
        if i0 == i1 || i1 == i2 || i0 == i2 {
            removed += 1;
            continue;
        }
        let (Some(&a), Some(&b), Some(&c)) = (
            points.get(i0 as usize),
            points.get(i1 as usize),
            points.get(i2 as usize),
        ) else {
            removed += 1;
            continue;
        };
        let area2 = (b - a).cross(c - a).length_squared();
        if !area2.is_finite() || area2 <= tol.eps_squared() {
            removed += 1;
            continue;
        }
        out.extend_from_slice(tri);
    }

    (out, removed)
}

/// Removes vertices no triangle references.
fn compact_vertices(points: Vec<Point3>, indices: &[u32]) -> (Vec<Point3>, Vec<u32>) {
    let mut remap = vec![u32::MAX; points.len()];
    let mut out_points = Vec::with_capacity(points.len());
    let mut out_indices = Vec::with_capacity(indices.len());
    for &i in indices {
        let slot = &mut remap[i as usize];
        if *slot == u32::MAX {
            *slot = out_points.len() as u32;
            out_points.push(points[i as usize]);
        }
        out_indices.push(*slot);
    }
    (out_points, out_indices)
}

/// Unit normal of a triangle, `None` when degenerate.
#[must_use]
pub(crate) fn triangle_normal(tri: [Point3; 3]) -> Option<Vec3> {
    (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalized()
}
