use super::GeomMesh;

/// Axis-aligned box with the given extents, as 8 vertices and 12
/// outward-facing triangles.
///
/// With `centered` the box spans `-extents/2 ..= extents/2`, otherwise
/// `0 ..= extents`.
#[must_use]
pub fn cuboid(extents: [f64; 3], centered: bool) -> GeomMesh {
    let [sx, sy, sz] = extents;
    let (x0, y0, z0) = if centered {
        (-sx * 0.5, -sy * 0.5, -sz * 0.5)
    } else {
        (0.0, 0.0, 0.0)
    };
    let (x1, y1, z1) = (x0 + sx, y0 + sy, z0 + sz);

    // Vertex i has x1 when bit 0 is set, y1 for bit 1, z1 for bit 2.
    let positions = (0..8)
        .map(|i| {
            [
                if i & 1 == 0 { x0 } else { x1 },
                if i & 2 == 0 { y0 } else { y1 },
                if i & 4 == 0 { z0 } else { z1 },
            ]
        })
        .collect();

    #[rustfmt::skip]
    let indices = vec![
        0, 2, 3, 0, 3, 1, // -z
        4, 5, 7, 4, 7, 6, // +z
        0, 1, 5, 0, 5, 4, // -y
        2, 6, 7, 2, 7, 3, // +y
        0, 4, 6, 0, 6, 2, // -x
        1, 3, 7, 1, 7, 5, // +x
    ];

    GeomMesh::new(positions, indices)
}
