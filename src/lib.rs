#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Parametric shell generator for a curved split columnar keyboard.
//!
//! [`keyboard`] turns a [`keyboard::KeyboardConfig`] into a single printable
//! solid; [`geom`] is the triangle-mesh kernel underneath.

pub mod geom;
pub mod keyboard;

pub use keyboard::{
    BuildStats, ConfigError, GeometryError, KeyboardConfig, KeyboardError, KeyboardLayout,
    KeyboardModel, SwitchKind, build_keyboard_mesh,
};
