use crate::geom::{Transform, Vec3};

use super::curvature::Curvature;
use super::kernel::GeometryKernel;
use super::placement::COLUMN_AXIS;
use super::GeometryError;

/// Signed arc steps of each row, centred on the middle of the column.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn column_arc_steps(rows: usize) -> Vec<f64> {
    let middle = (rows as f64 - 1.0) / 2.0;
    (0..rows).map(|i| i as f64 - middle).collect()
}

/// Per-key motions of [`build_column`], as transforms.
#[must_use]
pub fn column_key_transforms(curvature: Curvature, rows: usize) -> Vec<Transform> {
    column_arc_steps(rows)
        .into_iter()
        .map(|steps| curvature.pivot(COLUMN_AXIS, steps))
        .collect()
}

/// `rows` copies of `key` spread along the column arc.
///
/// # Errors
/// Propagates kernel failures.
pub fn build_column<K: GeometryKernel>(
    kernel: &K,
    key: &K::Solid,
    curvature: Curvature,
    rows: usize,
) -> Result<K::Solid, GeometryError> {
    let pivot = curvature.pivot_distance();
    let lowered = kernel.translate(key, Vec3::new(0.0, 0.0, -pivot));
    let keys = column_arc_steps(rows)
        .into_iter()
        .map(|steps| kernel.transform(&lowered, curvature.advance(COLUMN_AXIS, steps)))
        .collect();
    let column = kernel.union(keys)?;
    Ok(kernel.translate(&column, Vec3::new(0.0, 0.0, pivot)))
}
