//! Curved split columnar keyboard shell.
//!
//! A [`KeyboardConfig`] is validated into a [`KeyboardLayout`], which knows
//! where every key goes. The builders then drive a [`GeometryKernel`] to
//! produce the key bodies, place them on the column and row arcs, bridge
//! the gaps with warped filler plates and union everything into one shell.

pub mod assembly;
pub mod column;
pub mod config;
pub mod curvature;
mod error;
pub mod filler;
pub mod kernel;
pub mod key;
pub mod placement;

pub use assembly::{
    BuildStats, KeyboardModel, assemble_keyboard, build_keyboard, build_keyboard_mesh,
    check_shell,
};
pub use column::{build_column, column_key_transforms};
pub use config::{ColumnOffset, KeyboardConfig, KeyboardLayout, SwitchKind};
pub use curvature::{Curvature, arc_radius};
pub use error::{ConfigError, GeometryError, KeyboardError};
pub use filler::{FillerGap, Governor, SignConvention, filler_vertex, select_governor};
pub use kernel::{GeometryKernel, MeshKernel, VertexMap};
pub use key::{build_key, build_keycap};
pub use placement::{KeyPlacement, build_transform, placement_steps};
