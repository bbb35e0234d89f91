use std::io::{self, Write};

use super::GeomMesh;

/// Writes `mesh` as a Wavefront OBJ object with 1-based triangle faces.
///
/// # Errors
/// Propagates I/O errors from `w`.
pub fn write_obj<W: Write>(w: &mut W, mesh: &GeomMesh, name: &str) -> io::Result<()> {
    writeln!(w, "# keyshell")?;
    writeln!(w, "o {name}")?;
    for p in &mesh.positions {
        writeln!(w, "v {} {} {}", p[0], p[1], p[2])?;
    }
    for tri in mesh.indices.chunks_exact(3) {
        writeln!(w, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1)?;
    }
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::cuboid;

    #[test]
    fn obj_lists_vertices_then_faces() {
        let mut out = Vec::new();
        write_obj(&mut out, &cuboid([1.0, 1.0, 1.0], false), "cube").expect("write");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("o cube\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 8);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 12);
        assert!(text.contains("v 1 1 1\n"));
        assert!(text.contains("f 1 3 4\n"));
        assert!(!text.lines().any(|l| l.starts_with("f ") && l.contains(" 0")));
    }
}
