use crate::geom::{Axis, Transform, Vec3};

use super::config::ColumnOffset;
use super::curvature::Curvature;

/// Rows advance by rotating about X.
pub const ROW_AXIS: Axis = Axis::X;
/// Keys within a column advance by rotating about Y.
pub const COLUMN_AXIS: Axis = Axis::Y;

/// Where one key sits in the grid, with the arcs that govern it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPlacement {
    pub rows: usize,
    pub row_index: usize,
    pub column_index: usize,
    pub row_curvature: Curvature,
    pub column_curvature: Curvature,
    pub offset: ColumnOffset,
}

impl KeyPlacement {
    /// Signed steps from the middle of the column. Half steps for an even
    /// row count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn column_steps(&self) -> f64 {
        self.row_index as f64 - (self.rows as f64 - 1.0) / 2.0
    }

    /// Row arc steps; one per column.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn row_steps(&self) -> f64 {
        self.column_index as f64
    }
}

/// The six elementary transforms, leftmost first.
#[must_use]
pub fn placement_steps(placement: &KeyPlacement) -> [Transform; 6] {
    let row_radius = placement.row_curvature.pivot_distance();
    let column_radius = placement.column_curvature.pivot_distance();
    let offset = placement.offset;
    [
        Transform::translate(Vec3::new(0.0, 0.0, row_radius)),
        placement
            .row_curvature
            .advance(ROW_AXIS, placement.row_steps()),
        Transform::translate(Vec3::new(offset.x, 0.0, -row_radius + offset.z)),
        Transform::translate(Vec3::new(0.0, 0.0, column_radius)),
        placement
            .column_curvature
            .advance(COLUMN_AXIS, placement.column_steps()),
        Transform::translate(Vec3::new(0.0, 0.0, -column_radius)),
    ]
}

/// Key frame to keyboard frame. The rightmost step acts first.
#[must_use]
pub fn build_transform(placement: &KeyPlacement) -> Transform {
    placement_steps(placement)
        .into_iter()
        .fold(Transform::identity(), Transform::compose)
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::geom::{Point3, Tolerance};
    use crate::keyboard::{KeyboardConfig, KeyboardLayout};

    fn layout() -> KeyboardLayout {
        KeyboardLayout::new(KeyboardConfig::default()).expect("default layout")
    }

    #[test]
    fn steps_compose_left_to_right() {
        let placement = layout().placement(2, 4).expect("placement");
        let [m1, m2, m3, m4, m5, m6] = placement_steps(&placement);
        let explicit = m1 * m2 * m3 * m4 * m5 * m6;
        assert!(build_transform(&placement).max_abs_diff(explicit) < 1e-12);

        let p = Point3::new(1.0, 2.0, -3.0);
        let staged = [m6, m5, m4, m3, m2, m1]
            .into_iter()
            .fold(p, |acc, m| m.apply_point(acc));
        assert!(build_transform(&placement).apply_point(p).distance_to(staged) < 1e-9);
    }

    #[test]
    fn reordering_steps_changes_the_result() {
        let placement = layout().placement(0, 3).expect("placement");
        let [m1, m2, m3, m4, m5, m6] = placement_steps(&placement);
        let swapped = m1 * m2 * m3 * m4 * m6 * m5;
        assert!(build_transform(&placement).max_abs_diff(swapped) > 1e-3);
    }

    #[test]
    fn middle_row_has_no_column_rotation() {
        let placement = layout().placement(1, 2).expect("placement");
        assert_eq!(placement.column_steps(), 0.0);
        let t = build_transform(&placement);
        let offset = placement.offset;
        let row_radius = placement.row_curvature.pivot_distance();
        let expected = Transform::translate(Vec3::new(0.0, 0.0, row_radius))
            * Transform::rotate_deg(Axis::X, 10.0)
            * Transform::translate(Vec3::new(offset.x, 0.0, -row_radius + offset.z));
        assert!(t.max_abs_diff(expected) < 1e-9);
    }

    #[test]
    fn even_row_count_uses_half_steps() {
        let layout = KeyboardLayout::new(KeyboardConfig::default().with_rows(4)).expect("layout");
        let steps: Vec<f64> = (0..4)
            .map(|row| layout.placement(row, 0).expect("placement").column_steps())
            .collect();
        assert_eq!(steps, vec![-1.5, -0.5, 0.5, 1.5]);
    }

    #[test]
    fn first_key_lands_on_pinky_arc() {
        let t = layout().key_transform(0, 0).expect("transform");
        let radius = 19.10 / 20.0_f64.to_radians().sin();
        let expected = Point3::new(19.10, 0.0, 6.0 + radius * (1.0 - 20.0_f64.to_radians().cos()));
        let origin = t.apply_point(Point3::ORIGIN);
        assert!(origin.distance_to(expected) < 1e-9, "{origin:?}");
    }

    #[test]
    fn transforms_are_rigid_for_random_layouts() {
        let mut rng = rand::rng();
        for _ in 0..64 {
            let columns = rng.random_range(1..=8);
            let config = KeyboardConfig {
                rows: rng.random_range(1..=6),
                columns,
                pinky_columns: rng.random_range(0..=columns),
                row_angle_deg: rng.random_range(0.0..60.0),
                column_angle_deg: rng.random_range(0.0..60.0),
                pinky_column_angle_deg: rng.random_range(1.0..60.0),
                xz_offsets: (0..columns)
                    .map(|_| {
                        ColumnOffset::new(rng.random_range(-15.0..15.0), rng.random_range(-5.0..8.0))
                    })
                    .collect(),
                ..KeyboardConfig::default()
            };
            let layout = KeyboardLayout::new(config).expect("random layout");
            for t in layout.key_transforms() {
                assert!(t.is_rigid(Tolerance::new(1e-9)), "{t:?}");
                assert!(t.translation().is_finite());
            }
        }
    }

    #[test]
    fn distinct_rows_get_distinct_placements() {
        let layout = layout();
        let origins: Vec<Point3> = (0..3)
            .map(|row| {
                layout
                    .key_transform(row, 2)
                    .expect("transform")
                    .apply_point(Point3::ORIGIN)
            })
            .collect();
        for (i, a) in origins.iter().enumerate() {
            for b in &origins[i + 1..] {
                assert!(a.distance_to(*b) > 18.0);
            }
        }
    }
}
