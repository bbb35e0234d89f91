//! Puts the keyboard together: columns on the row arc, fillers in every
//! gap, one final union and the tilt.

use log::{debug, warn};
use serde::Serialize;

use crate::geom::{GeomMesh, GeomMeshDiagnostics, Transform, Vec3};

use super::column::build_column;
use super::config::{KeyboardConfig, KeyboardLayout};
use super::filler::{
    FillerGap, build_filler, inter_column_gaps, intra_column_gaps, reference_plate,
};
use super::kernel::{GeometryKernel, MeshKernel};
use super::key::build_key;
use super::placement::ROW_AXIS;
use super::{GeometryError, KeyboardError};

const OPERATION: &str = "build_keyboard";

/// Counts describing what went into a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub key_count: usize,
    pub column_count: usize,
    pub intra_column_fillers: usize,
    pub inter_column_fillers: usize,
}

/// The finished shell together with the placement of every key.
#[derive(Debug, Clone)]
pub struct KeyboardModel<S> {
    pub solid: S,
    /// Key frame to keyboard frame, column-major, before the final tilt.
    pub key_transforms: Vec<Transform>,
    pub stats: BuildStats,
}

// ─────────────────────────────────────────────────────────────────────────────
// Columns
// ─────────────────────────────────────────────────────────────────────────────

#[allow(clippy::cast_precision_loss)]
fn place_column<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
    key: &K::Solid,
    column: usize,
) -> Result<K::Solid, KeyboardError> {
    let offset = layout.placement(0, column)?.offset;
    let row_pivot = layout.row_curvature().pivot_distance();

    let solid = build_column(kernel, key, layout.column_curvature(column), layout.rows())?;
    let solid = kernel.translate(&solid, Vec3::new(offset.x, 0.0, -row_pivot + offset.z));
    debug!("placed column {column} at offset ({}, {})", offset.x, offset.z);
    Ok(kernel.transform(
        &solid,
        layout.row_curvature().advance(ROW_AXIS, column as f64),
    ))
}

#[cfg(feature = "parallel")]
fn build_columns<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
    key: &K::Solid,
) -> Result<Vec<K::Solid>, KeyboardError> {
    use rayon::prelude::*;
    (0..layout.columns())
        .into_par_iter()
        .map(|column| place_column(kernel, layout, key, column))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn build_columns<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
    key: &K::Solid,
) -> Result<Vec<K::Solid>, KeyboardError> {
    (0..layout.columns())
        .map(|column| place_column(kernel, layout, key, column))
        .collect()
}

/// All key bodies in place, without fillers or tilt.
///
/// # Errors
/// Propagates kernel failures and layout lookups.
pub fn assemble_keyboard<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
) -> Result<K::Solid, KeyboardError> {
    let key = build_key(kernel, layout)?;
    let columns = build_columns(kernel, layout, &key)?;
    let keyboard = kernel.union(columns)?;
    Ok(kernel.translate(&keyboard, layout.row_pivot()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Fillers
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "parallel")]
fn warp_fillers<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
    plate: &K::Solid,
    gaps: &[FillerGap],
) -> Result<Vec<K::Solid>, GeometryError> {
    use rayon::prelude::*;
    gaps.par_iter()
        .map(|&gap| build_filler(kernel, layout, plate, gap))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn warp_fillers<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
    plate: &K::Solid,
    gaps: &[FillerGap],
) -> Result<Vec<K::Solid>, GeometryError> {
    gaps.iter()
        .map(|&gap| build_filler(kernel, layout, plate, gap))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboard
// ─────────────────────────────────────────────────────────────────────────────

/// Keys, fillers, union, tilt.
///
/// # Errors
/// Propagates kernel failures and layout lookups.
pub fn build_keyboard<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
) -> Result<KeyboardModel<K::Solid>, KeyboardError> {
    let keyboard = assemble_keyboard(kernel, layout)?;

    let plate = reference_plate(kernel, layout)?;
    let intra = intra_column_gaps(layout);
    let inter = inter_column_gaps(layout);
    let gaps: Vec<FillerGap> = intra.iter().chain(&inter).copied().collect();
    let fillers = warp_fillers(kernel, layout, &plate, &gaps)?;
    debug!(
        "warped {} intra-column and {} inter-column fillers",
        intra.len(),
        inter.len()
    );

    let mut solids = Vec::with_capacity(fillers.len() + 1);
    solids.push(keyboard);
    solids.extend(fillers);
    let shell = kernel.union(solids)?;
    let solid = kernel.transform(&shell, layout.final_tilt());

    Ok(KeyboardModel {
        solid,
        key_transforms: layout.key_transforms(),
        stats: BuildStats {
            key_count: layout.rows() * layout.columns(),
            column_count: layout.columns(),
            intra_column_fillers: intra.len(),
            inter_column_fillers: inter.len(),
        },
    })
}

/// Checks that `solid` is a printable shell and returns its diagnostics.
///
/// # Errors
/// An empty or non-finite mesh, broken indices, or any open or
/// non-manifold edge.
pub fn check_shell(solid: &GeomMesh) -> Result<GeomMeshDiagnostics, GeometryError> {
    if solid.is_empty() {
        return Err(GeometryError::EmptySolid {
            operation: OPERATION,
        });
    }
    if solid.has_invalid_vertices() {
        return Err(GeometryError::NonFinite {
            operation: OPERATION,
        });
    }
    solid.validate()?;

    let diagnostics = solid.diagnostics();
    if !diagnostics.is_valid_solid() {
        warn!("keyboard shell is not closed: {}", diagnostics.summary());
        return Err(GeometryError::NotWatertight {
            operation: OPERATION,
            open_edges: diagnostics.open_edge_count,
            non_manifold_edges: diagnostics.non_manifold_edge_count,
        });
    }
    Ok(diagnostics)
}

/// Validates `config` and builds the shell as a triangle mesh.
///
/// The diagnostics describe the final mesh, with the repairs made by the
/// intermediate booleans folded in.
///
/// # Errors
/// [`KeyboardError::Config`] for an invalid configuration,
/// [`KeyboardError::Geometry`] when the kernel fails or the result is not
/// a closed, finite shell.
pub fn build_keyboard_mesh(
    config: KeyboardConfig,
) -> Result<(KeyboardModel<GeomMesh>, GeomMeshDiagnostics), KeyboardError> {
    let layout = KeyboardLayout::new(config)?;
    let kernel = MeshKernel::new();
    let model = build_keyboard(&kernel, &layout)?;

    let mut diagnostics = check_shell(&model.solid)?;
    diagnostics.merge_repairs(&kernel.take_repairs());
    debug!("keyboard mesh: {}", diagnostics.summary());
    if !diagnostics.is_single_body() && !layout.config().show_keycap {
        warn!(
            "keyboard shell has {} components, expected one",
            diagnostics.component_count
        );
    }
    Ok((model, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::cuboid;
    use crate::keyboard::ConfigError;
    use crate::keyboard::kernel::pose::PoseKernel;

    fn layout() -> KeyboardLayout {
        KeyboardLayout::new(KeyboardConfig::default()).expect("default layout")
    }

    #[test]
    fn assembled_keys_match_the_transform_builder() {
        let layout = layout();
        let kernel = PoseKernel::default();
        let poses = assemble_keyboard(&kernel, &layout).expect("keyboard");
        let plate = Transform::translate(Vec3::new(0.0, 0.0, layout.plate_center_z()));

        let expected = layout.key_transforms();
        assert_eq!(poses.len(), expected.len());
        for (pose, transform) in poses.iter().zip(expected) {
            assert!(pose.max_abs_diff(transform * plate) < 1e-9);
        }
    }

    #[test]
    fn flat_layout_matches_the_transform_builder() {
        let layout = KeyboardLayout::new(KeyboardConfig {
            row_angle_deg: 0.0,
            column_angle_deg: 0.0,
            pinky_column_angle_deg: 0.0,
            ..KeyboardConfig::default()
        })
        .expect("flat layout");
        let kernel = PoseKernel::default();
        let poses = assemble_keyboard(&kernel, &layout).expect("keyboard");
        let plate = Transform::translate(Vec3::new(0.0, 0.0, layout.plate_center_z()));
        for (pose, transform) in poses.iter().zip(layout.key_transforms()) {
            assert!(pose.max_abs_diff(transform * plate) < 1e-9);
        }
    }

    #[test]
    fn build_warps_every_filler_and_tilts() {
        let layout = layout();
        let kernel = PoseKernel::default();
        let model = build_keyboard(&kernel, &layout).expect("model");

        assert_eq!(
            model.stats,
            BuildStats {
                key_count: 18,
                column_count: 6,
                intra_column_fillers: 12,
                inter_column_fillers: 25,
            }
        );
        assert_eq!(kernel.count("warp"), 37);
        assert_eq!(model.solid.len(), 18 + 37);

        let tilt = layout.final_tilt();
        let plate = Transform::translate(Vec3::new(0.0, 0.0, layout.plate_center_z()));
        let first = tilt * model.key_transforms[0] * plate;
        assert!(model.solid[0].max_abs_diff(first) < 1e-9);
    }

    #[test]
    fn column_outside_the_layout_is_an_error() {
        let layout = layout();
        let kernel = PoseKernel::default();
        let key = build_key(&kernel, &layout).expect("key");
        let err = place_column(&kernel, &layout, &key, 6).err();
        assert_eq!(
            err,
            Some(KeyboardError::Config(ConfigError::KeyOutOfRange {
                row: 0,
                column: 6,
                rows: 3,
                columns: 6,
            }))
        );
    }

    #[test]
    fn open_shell_is_rejected() {
        let mut open = cuboid([1.0, 2.0, 3.0], true);
        open.indices.truncate(open.indices.len() - 3);
        assert_eq!(
            check_shell(&open),
            Err(GeometryError::NotWatertight {
                operation: "build_keyboard",
                open_edges: 3,
                non_manifold_edges: 0,
            })
        );

        let closed = cuboid([1.0, 2.0, 3.0], true);
        let diagnostics = check_shell(&closed).expect("closed cube");
        assert!(diagnostics.is_valid_solid());
        assert!(matches!(
            check_shell(&GeomMesh::default()),
            Err(GeometryError::EmptySolid { .. })
        ));
    }
}
