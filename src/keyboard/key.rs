//! One switch position: a plate with the switch cutout and the two
//! locking notches, optionally carrying a keycap preview.
//!
//! Key frame: the keycap top is at z = 0, the plate sits `cap_to_plate`
//! below it.

use crate::geom::{Point3, Vec3};

use super::config::KeyboardLayout;
use super::kernel::GeometryKernel;
use super::GeometryError;

/// Square switch hole, in mm.
pub const SWITCH_CUTOUT_WIDTH: f64 = 14.1;
/// Extra height on each side of the cutout so no cutter face lies on a
/// plate face.
pub const CUTTER_OVERSHOOT: f64 = 0.05;
pub const NOTCH_EXTENTS: [f64; 3] = [0.85, 5.0, 2.0];
/// Notch centre distance from the key axis.
pub const NOTCH_OFFSET_X: f64 = 7.4;
/// The plate has to be wider than the outer notch faces.
pub const MIN_PLATE_WIDTH: f64 = 2.0 * (NOTCH_OFFSET_X + NOTCH_EXTENTS[0] / 2.0);

pub const KEYCAP_BASE_HALF_WIDTH: f64 = 9.05;
pub const KEYCAP_TOP_HALF_WIDTH: f64 = 6.2;

/// Key body in the key frame, including the keycap when the layout asks
/// for one.
///
/// # Errors
/// Propagates kernel failures.
pub fn build_key<K: GeometryKernel>(
    kernel: &K,
    layout: &KeyboardLayout,
) -> Result<K::Solid, GeometryError> {
    let width = layout.flat_width();
    let depth = layout.plate_depth();
    let plate_center = Vec3::new(0.0, 0.0, -depth);

    let plate = kernel.translate(&kernel.cuboid([width, width, depth], true)?, plate_center);
    let cutout = kernel.translate(
        &kernel.cuboid(
            [
                SWITCH_CUTOUT_WIDTH,
                SWITCH_CUTOUT_WIDTH,
                depth + 2.0 * CUTTER_OVERSHOOT,
            ],
            true,
        )?,
        plate_center,
    );
    let notch = kernel.translate(
        &kernel.cuboid(NOTCH_EXTENTS, true)?,
        Vec3::new(NOTCH_OFFSET_X, 0.0, -depth),
    );
    let opposite_notch = kernel.rotate_deg(&notch, [0.0, 0.0, 180.0]);

    let body = kernel.difference(&plate, vec![cutout, notch, opposite_notch])?;
    let body = kernel.translate(&body, Vec3::new(0.0, 0.0, -layout.cap_to_plate()));

    if layout.config().show_keycap {
        let keycap = build_keycap(kernel, layout.keycap_height())?;
        kernel.union(vec![keycap, body])
    } else {
        Ok(body)
    }
}

/// Truncated pyramid standing on z = 0, `height` tall.
///
/// # Errors
/// Propagates kernel failures.
pub fn build_keycap<K: GeometryKernel>(
    kernel: &K,
    height: f64,
) -> Result<K::Solid, GeometryError> {
    let cube = kernel.cuboid([2.0, 2.0, 2.0], true)?;
    kernel.warp(&cube, &|mut v: Point3| {
        if v.z > 0.0 {
            v.x *= KEYCAP_TOP_HALF_WIDTH;
            v.y *= KEYCAP_TOP_HALF_WIDTH;
            v.z = height;
        } else {
            v.x *= KEYCAP_BASE_HALF_WIDTH;
            v.y *= KEYCAP_BASE_HALF_WIDTH;
            v.z = 0.0;
        }
        Some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::GeomMesh;
    use crate::keyboard::kernel::MeshKernel;
    use crate::keyboard::kernel::pose::PoseKernel;
    use crate::keyboard::{KeyboardConfig, SwitchKind};

    fn layout(config: KeyboardConfig) -> KeyboardLayout {
        KeyboardLayout::new(config).expect("layout")
    }

    fn key_mesh(config: KeyboardConfig) -> GeomMesh {
        build_key(&MeshKernel::new(), &layout(config)).expect("key")
    }

    #[test]
    fn plate_has_cutout_and_notches() {
        let key = key_mesh(KeyboardConfig::default());
        let notch_volume = NOTCH_EXTENTS.iter().product::<f64>();
        // The notches overlap the cutout by 0.075 mm along x.
        let overlap = (SWITCH_CUTOUT_WIDTH / 2.0 - (NOTCH_OFFSET_X - NOTCH_EXTENTS[0] / 2.0))
            * NOTCH_EXTENTS[1]
            * NOTCH_EXTENTS[2];
        let expected = 4.0 * (17.0 * 17.0 - SWITCH_CUTOUT_WIDTH * SWITCH_CUTOUT_WIDTH)
            - 2.0 * (notch_volume - overlap);
        let volume = key.signed_volume();
        assert!((volume - expected).abs() < 1e-6, "{volume} vs {expected}");
        let diagnostics = key.diagnostics();
        assert_eq!(diagnostics.component_count, 1);
        assert!(diagnostics.is_valid_solid(), "{}", diagnostics.summary());
    }

    #[test]
    fn plate_hangs_below_the_keycap_plane() {
        let key = key_mesh(KeyboardConfig::default());
        let bbox = key.bbox().expect("bbox");
        assert!((bbox.max.z - (-3.3 - 2.0)).abs() < 1e-9);
        assert!((bbox.min.z - (-3.3 - 6.0)).abs() < 1e-9);
        assert!((bbox.max.x - 8.5).abs() < 1e-9);

        let mx = key_mesh(KeyboardConfig::default().with_switch(SwitchKind::Mx));
        assert!((mx.bbox().expect("bbox").max.z - (-6.6 - 2.0)).abs() < 1e-9);
    }

    #[test]
    fn keycap_is_a_frustum_above_the_plate() {
        let key = key_mesh(KeyboardConfig::default().with_keycaps(true));
        let bbox = key.bbox().expect("bbox");
        assert!((bbox.max.z - 3.5).abs() < 1e-9);
        assert!((bbox.max.x - KEYCAP_BASE_HALF_WIDTH).abs() < 1e-9);
        let diagnostics = key.diagnostics();
        assert_eq!(diagnostics.component_count, 2);
        assert!(diagnostics.is_valid_solid(), "{}", diagnostics.summary());

        let cap = build_keycap(&MeshKernel::new(), 3.5).expect("keycap");
        let (a, b, h) = (18.1_f64, 12.4_f64, 3.5);
        let expected = h / 3.0 * (a * a + a * b + b * b);
        assert!((cap.signed_volume() - expected).abs() < 1e-9);
    }

    #[test]
    fn key_uses_three_cutters() {
        let kernel = PoseKernel::default();
        build_key(&kernel, &layout(KeyboardConfig::default())).expect("key");
        assert_eq!(kernel.count("cuboid"), 3);
        assert_eq!(kernel.count("difference"), 1);
        assert_eq!(kernel.count("warp"), 0);
    }
}
