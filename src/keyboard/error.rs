use crate::geom::{BooleanError, MeshError, WarpError};

/// Invalid keyboard configuration. Every variant names the offending
/// parameter so the message can be shown to the user as is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "{parameter} = {angle_deg} degrees does not define a key arc \
         (use 0 for a flat layout or an angle in (0, 180))"
    )]
    DegenerateCurvature {
        parameter: &'static str,
        angle_deg: f64,
    },

    #[error("{parameter} must be positive and finite, got {value}")]
    NonPositiveDimension { parameter: &'static str, value: f64 },

    #[error("{parameter} must be non-negative and finite, got {value}")]
    NegativeDimension { parameter: &'static str, value: f64 },

    #[error("{parameter} must be finite, got {value}")]
    NonFinite { parameter: &'static str, value: f64 },

    #[error("{parameter} must be at least 1")]
    EmptyLayout { parameter: &'static str },

    #[error("xz_offsets has {actual} entries but columns is {expected}")]
    OffsetCountMismatch { expected: usize, actual: usize },

    #[error("xz_offsets[{column}] is not finite")]
    NonFiniteOffset { column: usize },

    #[error("pinky_columns ({pinky_columns}) exceeds columns ({columns})")]
    PinkyColumnsOutOfRange { pinky_columns: usize, columns: usize },

    #[error("flat_width ({flat_width}) must exceed the switch cutout span ({minimum})")]
    PlateTooNarrow { flat_width: f64, minimum: f64 },

    #[error("key (row {row}, column {column}) is outside the {rows}x{columns} layout")]
    KeyOutOfRange {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },
}

/// Failure reported by the geometry kernel. Never recovered locally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("{operation} produced an empty solid")]
    EmptySolid { operation: &'static str },

    #[error("{operation} produced non-finite coordinates")]
    NonFinite { operation: &'static str },

    #[error(
        "{operation} produced a shell with {open_edges} open and \
         {non_manifold_edges} non-manifold edges"
    )]
    NotWatertight {
        operation: &'static str,
        open_edges: usize,
        non_manifold_edges: usize,
    },

    #[error("boolean failed: {0}")]
    Boolean(#[from] BooleanError),

    #[error("warp failed: {0}")]
    Warp(#[from] WarpError),

    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] MeshError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KeyboardError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("geometry kernel failure: {0}")]
    Geometry(#[from] GeometryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_parameter() {
        let err = ConfigError::DegenerateCurvature {
            parameter: "row_angle_deg",
            angle_deg: 180.0,
        };
        assert!(err.to_string().starts_with("row_angle_deg = 180 degrees"));

        let err: KeyboardError = ConfigError::OffsetCountMismatch {
            expected: 6,
            actual: 5,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: xz_offsets has 5 entries but columns is 6"
        );
    }

    #[test]
    fn kernel_errors_convert() {
        let err: GeometryError = BooleanError::EmptyMesh.into();
        let err: KeyboardError = err.into();
        assert!(matches!(err, KeyboardError::Geometry(GeometryError::Boolean(_))));
    }
}
