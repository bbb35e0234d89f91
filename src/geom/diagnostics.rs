//! Mesh diagnostics for the geometry kernel.
//!
//! Diagnostics travel alongside every solid the kernel produces. They are
//! used to check that a printable shell came out closed and in one piece,
//! and to report the repairs (welding, orientation, degenerate culling) the
//! kernel performed on the way.
//!
//! # Example
//!
//! ```ignore
//! let (mesh, diagnostics) = boolean_meshes(&a, &b, BooleanOp::Union)?;
//! if !diagnostics.is_single_body() {
//!     eprintln!("shell fell apart: {}", diagnostics.summary());
//! }
//! ```

use std::fmt;

/// Topology, repair and warning record for one kernel result.
///
/// - `open_edge_count`: edges with only one adjacent triangle
/// - `non_manifold_edge_count`: edges with more than two adjacent triangles
/// - `component_count`: vertex-connected pieces after welding
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomMeshDiagnostics {
    pub vertex_count: usize,
    pub triangle_count: usize,

    /// Vertices merged during tolerance-based welding.
    pub welded_vertex_count: usize,

    /// Triangle edges split at a vertex lying inside them (T-junctions).
    pub split_edge_count: usize,

    /// Triangles whose winding was reversed to face outward.
    pub flipped_triangle_count: usize,

    /// Zero-area or collapsed triangles removed.
    pub degenerate_triangle_count: usize,

    pub open_edge_count: usize,
    pub non_manifold_edge_count: usize,

    /// Number of vertex-connected components. A printable shell has one.
    pub component_count: usize,

    /// Human-readable notes about repairs and issues, e.g.
    /// "mesh orientation flipped (outward)".
    pub warnings: Vec<String>,
}

impl GeomMeshDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    #[must_use]
    pub fn is_valid_solid(&self) -> bool {
        self.is_watertight() && self.is_manifold()
    }

    /// Returns `true` if the mesh forms exactly one connected piece.
    #[must_use]
    pub fn is_single_body(&self) -> bool {
        self.component_count == 1
    }

    /// Returns `true` if no issues were detected and no repairs were needed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_valid_solid()
            && self.degenerate_triangle_count == 0
            && self.flipped_triangle_count == 0
            && self.warnings.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Accumulates repair counts and warnings of an intermediate step.
    ///
    /// Vertex, triangle, topology and component counts describe a single
    /// mesh and are left untouched; they are recomputed on the final result.
    pub fn merge_repairs(&mut self, other: &GeomMeshDiagnostics) {
        self.welded_vertex_count += other.welded_vertex_count;
        self.split_edge_count += other.split_edge_count;
        self.flipped_triangle_count += other.flipped_triangle_count;
        self.degenerate_triangle_count += other.degenerate_triangle_count;
        self.warnings.extend(other.warnings.iter().cloned());
    }

    /// Short one-line summary, `"V:{vertices} T:{triangles} [issues...]"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("V:{} T:{}", self.vertex_count, self.triangle_count)];

        if self.component_count != 1 {
            parts.push(format!("components:{}", self.component_count));
        }
        if self.welded_vertex_count > 0 {
            parts.push(format!("welded:{}", self.welded_vertex_count));
        }
        if self.split_edge_count > 0 {
            parts.push(format!("split:{}", self.split_edge_count));
        }
        if self.flipped_triangle_count > 0 {
            parts.push(format!("flipped:{}", self.flipped_triangle_count));
        }
        if self.degenerate_triangle_count > 0 {
            parts.push(format!("degenerate:{}", self.degenerate_triangle_count));
        }
        if self.open_edge_count > 0 {
            parts.push(format!("open:{}", self.open_edge_count));
        }
        if self.non_manifold_edge_count > 0 {
            parts.push(format!("non-manifold:{}", self.non_manifold_edge_count));
        }

        parts.join(" ")
    }
}

impl fmt::Display for GeomMeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mesh Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        writeln!(f, "  Components: {}", self.component_count)?;

        if self.welded_vertex_count > 0
            || self.split_edge_count > 0
            || self.flipped_triangle_count > 0
            || self.degenerate_triangle_count > 0
        {
            writeln!(f, "  Repairs:")?;
            if self.welded_vertex_count > 0 {
                writeln!(f, "    - Welded vertices: {}", self.welded_vertex_count)?;
            }
            if self.split_edge_count > 0 {
                writeln!(f, "    - Split edges: {}", self.split_edge_count)?;
            }
            if self.flipped_triangle_count > 0 {
                writeln!(f, "    - Flipped triangles: {}", self.flipped_triangle_count)?;
            }
            if self.degenerate_triangle_count > 0 {
                writeln!(f, "    - Degenerate triangles removed: {}", self.degenerate_triangle_count)?;
            }
        }

        if !self.is_valid_solid() {
            writeln!(f, "  Topology issues:")?;
            if self.open_edge_count > 0 {
                writeln!(f, "    - Open edges: {}", self.open_edge_count)?;
            }
            if self.non_manifold_edge_count > 0 {
                writeln!(f, "    - Non-manifold edges: {}", self.non_manifold_edge_count)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }

        let status = if self.is_clean() {
            "CLEAN"
        } else if self.is_valid_solid() {
            "VALID (with repairs)"
        } else {
            "ISSUES DETECTED"
        };
        writeln!(f, "  Status: {status}")
    }
}
