//! Plates that bridge the gaps between keys.
//!
//! A filler starts as a copy of the reference plate in the key frame. Each
//! of its vertices is then carried by the key that owns that side of the
//! gap, so the filler faces land exactly on the facing key plate faces:
//!
//! - intra-column fillers join two keys of one column,
//! - inter-column fillers join neighbouring columns, alternating between a
//!   straight bridge (even `row2`) and a diagonal one across four keys
//!   (odd `row2`).
//!
//! The sign convention mirrors the reference vertex into the governing
//! key's frame. Every negated axis comes with a governor that swaps sides
//! along that axis, so the warped plate keeps its orientation.

use crate::geom::{Point3, Vec3};

use super::config::KeyboardLayout;
use super::kernel::GeometryKernel;
use super::GeometryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerGap {
    /// Between `row` and `row + 1` of `column`.
    IntraColumn { row: usize, column: usize },
    /// Between `column` and `column + 1`, at half-row position `row2`.
    InterColumn { row2: usize, column: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignConvention {
    pub negate_x: bool,
    pub negate_y: bool,
}

impl SignConvention {
    #[must_use]
    pub const fn for_gap(gap: FillerGap) -> Self {
        match gap {
            FillerGap::IntraColumn { .. } => Self {
                negate_x: true,
                negate_y: false,
            },
            FillerGap::InterColumn { row2, .. } => Self {
                negate_x: row2 % 2 == 1,
                negate_y: true,
            },
        }
    }

    #[must_use]
    pub fn apply(self, p: Point3) -> Point3 {
        Point3::new(
            if self.negate_x { -p.x } else { p.x },
            if self.negate_y { -p.y } else { p.y },
            p.z,
        )
    }
}

/// The key that carries one filler vertex, and the column on the other
/// side of the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Governor {
    pub row: usize,
    pub column: usize,
    pub neighbour_column: usize,
}

/// Picks the governing key for local vertex `v` of the reference plate.
#[must_use]
pub fn select_governor(gap: FillerGap, v: Point3) -> Governor {
    match gap {
        FillerGap::IntraColumn { row, column } => Governor {
            row: row + usize::from(v.x < 0.0),
            column,
            neighbour_column: column,
        },
        FillerGap::InterColumn { row2, column } => {
            let diagonal = row2 % 2 == 1;
            Governor {
                row: row2 / 2 + usize::from(diagonal && v.x < 0.0),
                column: column + usize::from(v.y >= 0.0),
                neighbour_column: column + usize::from(v.y <= 0.0),
            }
        }
    }
}

/// Z shift for a bottom vertex whose column stands more than a plate
/// depth above its neighbour, so the bridge reaches down to the lower
/// plate.
#[must_use]
pub fn depth_compensation(layout: &KeyboardLayout, governor: &Governor, v: Point3) -> f64 {
    let (Some(own), Some(other)) = (
        layout.column_offset(governor.column),
        layout.column_offset(governor.neighbour_column),
    ) else {
        return 0.0;
    };
    if v.z < layout.plate_center_z() && own.z - other.z > layout.plate_depth() {
        -layout.plate_depth()
    } else {
        0.0
    }
}

/// Keyboard-frame position of reference plate vertex `v` for `gap`.
/// `None` if the governor falls outside the grid.
#[must_use]
pub fn filler_vertex(layout: &KeyboardLayout, gap: FillerGap, v: Point3) -> Option<Point3> {
    let governor = select_governor(gap, v);
    let lowered = v + Vec3::new(0.0, 0.0, depth_compensation(layout, &governor, v));
    let local = SignConvention::for_gap(gap).apply(lowered);
    let transform = layout.key_transform(governor.row, governor.column).ok()?;
    Some(transform.apply_point(local))
}

#[must_use]
pub fn intra_column_gaps(layout: &KeyboardLayout) -> Vec<FillerGap> {
    (0..layout.columns())
        .flat_map(|column| {
            (0..layout.rows().saturating_sub(1))
                .map(move |row| FillerGap::IntraColumn { row, column })
        })
        .collect()
}

#[must_use]
pub fn inter_column_gaps(layout: &KeyboardLayout) -> Vec<FillerGap> {
    (0..layout.columns().saturating_sub(1))
        .flat_map(|column| {
            (0..2 * layout.rows() - 1).map(move |row2| FillerGap::InterColumn { row2, column })
        })
        .collect()
}

/// The key plate shape every filler starts from, centred where the key
/// plate sits in the key frame.
///
/// # Errors
/// Propagates kernel failures.
pub fn reference_plate<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
) -> Result<K::Solid, GeometryError> {
    let width = layout.flat_width();
    let plate = kernel.cuboid([width, width, layout.plate_depth()], true)?;
    Ok(kernel.translate(&plate, Vec3::new(0.0, 0.0, layout.plate_center_z())))
}

/// Warps `plate` into the filler for `gap`.
///
/// # Errors
/// Propagates kernel failures.
pub fn build_filler<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
    plate: &K::Solid,
    gap: FillerGap,
) -> Result<K::Solid, GeometryError> {
    kernel.warp(plate, &|v: Point3| filler_vertex(layout, gap, v))
}
