//! Polygon BSP booleans for closed triangle meshes.
//!
//! Each operand is turned into convex polygons carrying their supporting
//! plane. A solid's BSP tree keeps only planes; its empty back leaves are
//! the inside. Polygons of one operand are clipped against the other
//! operand's tree. Polygons whose bounding box touches no triangle of the
//! other operand are classified whole by a single point query instead of
//! being split, which keeps distant geometry from fragmenting.

use log::debug;

use super::bvh::Bvh;
use super::diagnostics::GeomMeshDiagnostics;
use super::mesh::{GeomMesh, MeshError, finalize_solid, triangle_normal};
use super::{BBox, Point3, Tolerance, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Difference,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BooleanError {
    #[error("boolean input mesh is empty")]
    EmptyMesh,
    #[error("boolean input mesh is invalid: {0}")]
    InvalidMesh(#[from] MeshError),
    #[error("boolean {op:?} produced an empty solid")]
    EmptyResult { op: BooleanOp },
}

// ─────────────────────────────────────────────────────────────────────────────
// Planes and polygons
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct Plane {
    normal: Vec3,
    w: f64,
}

impl Plane {
    fn from_triangle(tri: [Point3; 3]) -> Option<Self> {
        let normal = triangle_normal(tri)?;
        Some(Self {
            normal,
            w: normal.dot(tri[0].to_vec3()),
        })
    }

    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            w: -self.w,
        }
    }

    fn signed_distance(self, p: Point3) -> f64 {
        self.normal.dot(p.to_vec3()) - self.w
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaneSide {
    Coplanar,
    Front,
    Back,
    Spanning,
}

impl PlaneSide {
    fn of(distance: f64, tol: Tolerance) -> Self {
        if distance < -tol.eps {
            Self::Back
        } else if distance > tol.eps {
            Self::Front
        } else {
            Self::Coplanar
        }
    }

    fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Coplanar, side) | (side, Self::Coplanar) => side,
            (a, b) if a == b => a,
            _ => Self::Spanning,
        }
    }
}

/// Convex planar polygon; `plane` is the plane of the source triangle and is
/// inherited by every split fragment.
#[derive(Debug, Clone, PartialEq)]
struct Polygon {
    vertices: Vec<Point3>,
    plane: Plane,
}

impl Polygon {
    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane = self.plane.flipped();
    }

    fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.vertices.iter().copied())
    }

    fn centroid(&self) -> Point3 {
        let n = self.vertices.len().max(1) as f64;
        let sum = self
            .vertices
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + p.to_vec3());
        Point3::ORIGIN + sum * (1.0 / n)
    }
}

#[derive(Default)]
struct SplitBuckets {
    coplanar_front: Vec<Polygon>,
    coplanar_back: Vec<Polygon>,
    front: Vec<Polygon>,
    back: Vec<Polygon>,
}

fn split_polygon(plane: Plane, polygon: Polygon, tol: Tolerance, out: &mut SplitBuckets) {
    let sides: Vec<PlaneSide> = polygon
        .vertices
        .iter()
        .map(|&v| PlaneSide::of(plane.signed_distance(v), tol))
        .collect();
    let polygon_side = sides
        .iter()
        .fold(PlaneSide::Coplanar, |acc, &s| acc.combine(s));

    match polygon_side {
        PlaneSide::Coplanar => {
            if plane.normal.dot(polygon.plane.normal) > 0.0 {
                out.coplanar_front.push(polygon);
            } else {
                out.coplanar_back.push(polygon);
            }
        }
        PlaneSide::Front => out.front.push(polygon),
        PlaneSide::Back => out.back.push(polygon),
        PlaneSide::Spanning => {
            let n = polygon.vertices.len();
            let mut front = Vec::with_capacity(n + 1);
            let mut back = Vec::with_capacity(n + 1);
            for i in 0..n {
                let j = (i + 1) % n;
                let (si, sj) = (sides[i], sides[j]);
                let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                if si != PlaneSide::Back {
                    front.push(vi);
                }
                if si != PlaneSide::Front {
                    back.push(vi);
                }
                if si.combine(sj) == PlaneSide::Spanning {
                    let t = (plane.w - plane.normal.dot(vi.to_vec3()))
                        / plane.normal.dot(vj - vi);
                    let v = vi.lerp(vj, t);
                    front.push(v);
                    back.push(v);
                }
            }
            if front.len() >= 3 {
                out.front.push(Polygon {
                    vertices: front,
                    plane: polygon.plane,
                });
            }
            if back.len() >= 3 {
                out.back.push(Polygon {
                    vertices: back,
                    plane: polygon.plane,
                });
            }
        }
    }
}

fn flip_all(mut polygons: Vec<Polygon>) -> Vec<Polygon> {
    for p in &mut polygons {
        p.flip();
    }
    polygons
}

// ─────────────────────────────────────────────────────────────────────────────
// BSP tree
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct BspNode {
    plane: Plane,
    front: Option<usize>,
    back: Option<usize>,
}

/// Arena-allocated BSP tree of a closed solid. Node 0 is the root.
#[derive(Debug, Clone)]
struct BspTree {
    nodes: Vec<BspNode>,
    tol: Tolerance,
}

impl BspTree {
    fn build(polygons: Vec<Polygon>, tol: Tolerance) -> Option<Self> {
        if polygons.is_empty() {
            return None;
        }

        let mut nodes: Vec<BspNode> = Vec::new();
        // (parent, attach to front, polygons)
        let mut stack: Vec<(Option<(usize, bool)>, Vec<Polygon>)> = vec![(None, polygons)];

        while let Some((parent, polygons)) = stack.pop() {
            let plane = polygons[0].plane;
            let index = nodes.len();
            nodes.push(BspNode {
                plane,
                front: None,
                back: None,
            });
            match parent {
                Some((p, true)) => nodes[p].front = Some(index),
                Some((p, false)) => nodes[p].back = Some(index),
                None => {}
            }

            let mut buckets = SplitBuckets::default();
            for polygon in polygons {
                split_polygon(plane, polygon, tol, &mut buckets);
            }
            if !buckets.front.is_empty() {
                stack.push((Some((index, true)), buckets.front));
            }
            if !buckets.back.is_empty() {
                stack.push((Some((index, false)), buckets.back));
            }
        }

        Some(Self { nodes, tol })
    }

    /// Turns the tree into the tree of the complement solid.
    fn invert(&mut self) {
        for node in &mut self.nodes {
            node.plane = node.plane.flipped();
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Removes the parts of `polygons` inside the solid. Polygons lying on
    /// the boundary survive when they face the same way as the boundary.
    fn clip(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut out = Vec::with_capacity(polygons.len());
        let mut stack = vec![(0usize, polygons)];

        while let Some((index, polygons)) = stack.pop() {
            let node = &self.nodes[index];
            let mut buckets = SplitBuckets::default();
            for polygon in polygons {
                split_polygon(node.plane, polygon, self.tol, &mut buckets);
            }
            let mut front = buckets.coplanar_front;
            front.extend(buckets.front);
            let mut back = buckets.coplanar_back;
            back.extend(buckets.back);

            match node.front {
                Some(child) => stack.push((child, front)),
                None => out.extend(front),
            }
            if let Some(child) = node.back {
                stack.push((child, back));
            }
        }

        out
    }

    /// Point membership; meaningful for points away from the boundary.
    fn contains(&self, p: Point3) -> bool {
        let mut index = 0;
        loop {
            let node = &self.nodes[index];
            let distance = node.plane.signed_distance(p);
            let child = if distance >= 0.0 { node.front } else { node.back };
            match child {
                Some(next) => index = next,
                None => return distance < 0.0,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operand preparation
// ─────────────────────────────────────────────────────────────────────────────

struct Operand {
    polygons: Vec<Polygon>,
    bboxes: Vec<BBox>,
    bvh: Option<Bvh>,
}

impl Operand {
    fn from_mesh(mesh: &GeomMesh) -> Self {
        let polygons: Vec<Polygon> = mesh
            .triangles()
            .filter_map(|tri| {
                Plane::from_triangle(tri).map(|plane| Polygon {
                    vertices: tri.to_vec(),
                    plane,
                })
            })
            .collect();
        let bboxes: Vec<BBox> = polygons
            .iter()
            .filter_map(Polygon::bbox)
            .map(|b| b.expand_by(Tolerance::PLANE.eps))
            .collect();
        let bvh = Bvh::build(&bboxes);
        Self {
            polygons,
            bboxes,
            bvh,
        }
    }

    fn tree(&self) -> Option<BspTree> {
        BspTree::build(self.polygons.clone(), Tolerance::PLANE)
    }

    /// Whether `polygon` may touch this operand's surface.
    fn near(&self, polygon: &Polygon) -> bool {
        match (&self.bvh, polygon.bbox()) {
            (Some(bvh), Some(b)) => bvh.any_overlap(b, &self.bboxes),
            _ => false,
        }
    }

    /// Splits `polygons` into those that may touch `other` and those that
    /// lie entirely inside or outside of it.
    fn partition_against(polygons: Vec<Polygon>, other: &Self) -> (Vec<Polygon>, Vec<Polygon>) {
        polygons.into_iter().partition(|p| other.near(p))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Boolean operations
// ─────────────────────────────────────────────────────────────────────────────

fn union_polygons(a: &Operand, b: &Operand, tree_a: &BspTree, tree_b: &BspTree) -> Vec<Polygon> {
    let (near_a, far_a) = Operand::partition_against(a.polygons.clone(), b);
    let (near_b, far_b) = Operand::partition_against(b.polygons.clone(), a);

    let mut out: Vec<Polygon> = far_a
        .into_iter()
        .filter(|p| !tree_b.contains(p.centroid()))
        .collect();
    out.extend(tree_b.clip(near_a));

    // Clip b twice against a: once for its interior, once flipped to drop
    // faces shared with a in the same orientation.
    let b_outside = tree_a.clip(near_b);
    out.extend(flip_all(tree_a.clip(flip_all(b_outside))));
    out.extend(far_b.into_iter().filter(|p| !tree_a.contains(p.centroid())));
    out
}

fn difference_polygons(
    a: &Operand,
    b: &Operand,
    tree_a: &BspTree,
    tree_b: &BspTree,
) -> Vec<Polygon> {
    let (near_a, far_a) = Operand::partition_against(a.polygons.clone(), b);
    let (near_b, far_b) = Operand::partition_against(b.polygons.clone(), a);

    let mut out: Vec<Polygon> = far_a
        .into_iter()
        .filter(|p| !tree_b.contains(p.centroid()))
        .collect();
    out.extend(flip_all(tree_b.clip(flip_all(near_a))));

    let mut outside_a = tree_a.clone();
    outside_a.invert();
    let b_inside = outside_a.clip(near_b);
    out.extend(outside_a.clip(flip_all(b_inside)));
    out.extend(flip_all(
        far_b
            .into_iter()
            .filter(|p| tree_a.contains(p.centroid()))
            .collect(),
    ));
    out
}

fn polygons_to_mesh(polygons: &[Polygon]) -> (GeomMesh, GeomMeshDiagnostics) {
    let mut points = Vec::new();
    for polygon in polygons {
        let v = &polygon.vertices;
        for i in 1..v.len().saturating_sub(1) {
            points.extend_from_slice(&[v[0], v[i], v[i + 1]]);
        }
    }
    let indices = (0..points.len() as u32).collect();
    // Same tolerance the clipper classifies vertices with.
    finalize_solid(points, indices, Tolerance::PLANE)
}

fn check_operand(mesh: &GeomMesh) -> Result<(), BooleanError> {
    mesh.validate()?;
    if mesh.is_empty() {
        return Err(BooleanError::EmptyMesh);
    }
    Ok(())
}

/// Boolean of two closed, outward-oriented meshes.
pub fn boolean_meshes(
    a: &GeomMesh,
    b: &GeomMesh,
    op: BooleanOp,
) -> Result<(GeomMesh, GeomMeshDiagnostics), BooleanError> {
    check_operand(a)?;
    check_operand(b)?;

    let (Some(bbox_a), Some(bbox_b)) = (a.bbox(), b.bbox()) else {
        return Err(BooleanError::EmptyMesh);
    };
    if !bbox_a.expand_by(Tolerance::PLANE.eps).intersects(bbox_b) {
        let mut mesh = a.clone();
        if op == BooleanOp::Union {
            mesh.append(b);
        }
        let diagnostics = mesh.diagnostics();
        return Ok((mesh, diagnostics));
    }

    let operand_a = Operand::from_mesh(a);
    let operand_b = Operand::from_mesh(b);
    let (Some(tree_a), Some(tree_b)) = (operand_a.tree(), operand_b.tree()) else {
        return Err(BooleanError::EmptyMesh);
    };

    let polygons = match op {
        BooleanOp::Union => union_polygons(&operand_a, &operand_b, &tree_a, &tree_b),
        BooleanOp::Difference => difference_polygons(&operand_a, &operand_b, &tree_a, &tree_b),
    };
    debug!(
        "csg {op:?}: {} + {} polygons -> {}",
        operand_a.polygons.len(),
        operand_b.polygons.len(),
        polygons.len()
    );

    let (mesh, diagnostics) = polygons_to_mesh(&polygons);
    if mesh.is_empty() {
        return Err(BooleanError::EmptyResult { op });
    }
    Ok((mesh, diagnostics))
}

// ─────────────────────────────────────────────────────────────────────────────
// N-ary helpers
// ─────────────────────────────────────────────────────────────────────────────

type BooleanResult = Result<(GeomMesh, GeomMeshDiagnostics), BooleanError>;

fn union_chunk(chunk: &[GeomMesh]) -> BooleanResult {
    match chunk {
        [a, b] => boolean_meshes(a, b, BooleanOp::Union),
        [a] => Ok((a.clone(), GeomMeshDiagnostics::default())),
        _ => Err(BooleanError::EmptyMesh),
    }
}

#[cfg(feature = "parallel")]
fn union_level(level: &[GeomMesh]) -> Vec<BooleanResult> {
    use rayon::prelude::*;
    level.par_chunks(2).map(union_chunk).collect()
}

#[cfg(not(feature = "parallel"))]
fn union_level(level: &[GeomMesh]) -> Vec<BooleanResult> {
    level.chunks(2).map(union_chunk).collect()
}

/// Union of any number of solids by balanced pairwise reduction.
pub fn union_all(meshes: Vec<GeomMesh>) -> BooleanResult {
    if meshes.is_empty() {
        return Err(BooleanError::EmptyMesh);
    }

    let mut repairs = GeomMeshDiagnostics::default();
    let mut level = meshes;
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for result in union_level(&level) {
            let (mesh, diagnostics) = result?;
            repairs.merge_repairs(&diagnostics);
            next.push(mesh);
        }
        level = next;
    }

    let mesh = level.pop().ok_or(BooleanError::EmptyMesh)?;
    check_operand(&mesh)?;
    let mut diagnostics = mesh.diagnostics();
    diagnostics.merge_repairs(&repairs);
    Ok((mesh, diagnostics))
}

/// Subtracts every mesh of `subtrahends` from `base` in turn.
pub fn difference_all(base: &GeomMesh, subtrahends: &[GeomMesh]) -> BooleanResult {
    check_operand(base)?;
    let mut repairs = GeomMeshDiagnostics::default();
    let mut mesh = base.clone();
    for cutter in subtrahends {
        let (next, diagnostics) = boolean_meshes(&mesh, cutter, BooleanOp::Difference)?;
        repairs.merge_repairs(&diagnostics);
        mesh = next;
    }
    let mut diagnostics = mesh.diagnostics();
    diagnostics.merge_repairs(&repairs);
    Ok((mesh, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64) -> Polygon {
        let vertices = vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(1.0, 1.0, z),
            Point3::new(0.0, 1.0, z),
        ];
        let plane = Plane::from_triangle([vertices[0], vertices[1], vertices[2]]).expect("plane");
        Polygon { vertices, plane }
    }

    fn x_plane(x: f64) -> Plane {
        Plane {
            normal: Vec3::X,
            w: x,
        }
    }

    #[test]
    fn split_spanning_square_in_half() {
        let mut buckets = SplitBuckets::default();
        split_polygon(x_plane(0.5), square(0.0), Tolerance::PLANE, &mut buckets);

        assert_eq!(buckets.front.len(), 1);
        assert_eq!(buckets.back.len(), 1);
        assert!(buckets.front[0].vertices.iter().all(|v| v.x >= 0.5 - 1e-12));
        assert!(buckets.back[0].vertices.iter().all(|v| v.x <= 0.5 + 1e-12));
        assert_eq!(buckets.front[0].vertices.len(), 4);
    }

    #[test]
    fn split_touching_square_is_not_spanning() {
        let mut buckets = SplitBuckets::default();
        split_polygon(x_plane(1.0), square(0.0), Tolerance::PLANE, &mut buckets);
        assert_eq!(buckets.back.len(), 1);
        assert!(buckets.front.is_empty());
    }

    #[test]
    fn split_coplanar_sorted_by_facing() {
        let plane = square(0.0).plane;
        let mut buckets = SplitBuckets::default();
        split_polygon(plane, square(0.0), Tolerance::PLANE, &mut buckets);
        split_polygon(plane.flipped(), square(0.0), Tolerance::PLANE, &mut buckets);
        assert_eq!(buckets.coplanar_front.len(), 1);
        assert_eq!(buckets.coplanar_back.len(), 1);
    }

    #[test]
    fn tree_contains_and_invert() {
        let cube = crate::geom::cuboid([2.0, 2.0, 2.0], true);
        let mut tree = Operand::from_mesh(&cube).tree().expect("tree");
        assert!(tree.contains(Point3::ORIGIN));
        assert!(!tree.contains(Point3::new(3.0, 0.0, 0.0)));
        tree.invert();
        assert!(!tree.contains(Point3::ORIGIN));
        assert!(tree.contains(Point3::new(3.0, 0.0, 0.0)));
    }
}
