//! Keyboard parameters and their validated, precomputed form.
//!
//! [`KeyboardConfig`] is plain data that round-trips through JSON with
//! every field optional. [`KeyboardLayout::new`] is the single validation
//! gate: once a layout exists, every transform it hands out is finite.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geom::{Transform, Vec3};

use super::curvature::Curvature;
use super::key::MIN_PLATE_WIDTH;
use super::placement::{KeyPlacement, build_transform};
use super::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Switch family
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchKind {
    /// Low-profile Kailh Choc.
    #[default]
    Choc,
    /// Cherry MX and clones.
    Mx,
}

impl SwitchKind {
    /// Height of the keycap top surface above the plate top, in mm.
    #[must_use]
    pub const fn cap_to_plate(self) -> f64 {
        match self {
            Self::Choc => 3.3,
            Self::Mx => 6.6,
        }
    }

    /// Height of the keycap preview body, in mm.
    #[must_use]
    pub const fn keycap_height(self) -> f64 {
        match self {
            Self::Choc => 3.5,
            Self::Mx => 9.6,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Choc => "choc",
            Self::Mx => "mx",
        }
    }
}

impl FromStr for SwitchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "choc" => Ok(Self::Choc),
            "mx" => Ok(Self::Mx),
            other => Err(format!("unknown switch '{other}' (expected choc or mx)")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Per-column stagger: `x` shifts the column along the row direction of
/// the key frame, `z` raises it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnOffset {
    pub x: f64,
    pub z: f64,
}

impl ColumnOffset {
    #[must_use]
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub key_separation: f64,
    pub column_angle_deg: f64,
    pub pinky_column_angle_deg: f64,
    pub pinky_columns: usize,
    pub row_angle_deg: f64,
    pub columns: usize,
    pub rows: usize,
    pub plate_depth: f64,
    pub flat_width: f64,
    pub switch: SwitchKind,
    /// Overrides [`SwitchKind::cap_to_plate`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_to_plate: Option<f64>,
    /// Overrides [`SwitchKind::keycap_height`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keycap_height: Option<f64>,
    pub show_keycap: bool,
    pub xz_offsets: Vec<ColumnOffset>,
    pub final_tilt_deg: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            key_separation: 19.10,
            column_angle_deg: 15.0,
            pinky_column_angle_deg: 20.0,
            pinky_columns: 2,
            row_angle_deg: 5.0,
            columns: 6,
            rows: 3,
            plate_depth: 4.0,
            flat_width: 17.0,
            switch: SwitchKind::Choc,
            cap_to_plate: None,
            keycap_height: None,
            show_keycap: false,
            xz_offsets: vec![
                ColumnOffset::new(0.0, 6.0),
                ColumnOffset::new(0.0, 6.0),
                ColumnOffset::new(-7.0, 0.0),
                ColumnOffset::new(-12.0, -2.8),
                ColumnOffset::new(-7.0, 0.0),
                ColumnOffset::new(-5.0, 0.0),
            ],
            final_tilt_deg: -8.0,
        }
    }
}

impl KeyboardConfig {
    #[must_use]
    pub fn with_switch(mut self, switch: SwitchKind) -> Self {
        self.switch = switch;
        self
    }

    #[must_use]
    pub fn with_keycaps(mut self, show: bool) -> Self {
        self.show_keycap = show;
        self
    }

    #[must_use]
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns the serde error for malformed JSON or mistyped fields.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    /// Propagates the serializer error, which only happens for non-finite
    /// floats.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn effective_cap_to_plate(&self) -> f64 {
        self.cap_to_plate
            .unwrap_or_else(|| self.switch.cap_to_plate())
    }

    #[must_use]
    pub fn effective_keycap_height(&self) -> f64 {
        self.keycap_height
            .unwrap_or_else(|| self.switch.keycap_height())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validated layout
// ─────────────────────────────────────────────────────────────────────────────

/// A configuration that passed validation, with the arc geometry solved.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardLayout {
    config: KeyboardConfig,
    row_curvature: Curvature,
    column_curvature: Curvature,
    pinky_curvature: Curvature,
}

fn positive(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositiveDimension { parameter, value })
    }
}

fn non_negative(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NegativeDimension { parameter, value })
    }
}

impl KeyboardLayout {
    /// Validates `config` and solves the row and column arcs.
    ///
    /// # Errors
    /// The first [`ConfigError`] found, naming the offending parameter.
    pub fn new(config: KeyboardConfig) -> Result<Self, ConfigError> {
        let separation = positive("key_separation", config.key_separation)?;
        positive("plate_depth", config.plate_depth)?;
        let flat_width = positive("flat_width", config.flat_width)?;
        if flat_width <= MIN_PLATE_WIDTH {
            return Err(ConfigError::PlateTooNarrow {
                flat_width,
                minimum: MIN_PLATE_WIDTH,
            });
        }
        non_negative("cap_to_plate", config.effective_cap_to_plate())?;
        positive("keycap_height", config.effective_keycap_height())?;
        if !config.final_tilt_deg.is_finite() {
            return Err(ConfigError::NonFinite {
                parameter: "final_tilt_deg",
                value: config.final_tilt_deg,
            });
        }

        if config.rows == 0 {
            return Err(ConfigError::EmptyLayout { parameter: "rows" });
        }
        if config.columns == 0 {
            return Err(ConfigError::EmptyLayout {
                parameter: "columns",
            });
        }
        if config.xz_offsets.len() != config.columns {
            return Err(ConfigError::OffsetCountMismatch {
                expected: config.columns,
                actual: config.xz_offsets.len(),
            });
        }
        if let Some(column) = config
            .xz_offsets
            .iter()
            .position(|o| !(o.x.is_finite() && o.z.is_finite()))
        {
            return Err(ConfigError::NonFiniteOffset { column });
        }
        if config.pinky_columns > config.columns {
            return Err(ConfigError::PinkyColumnsOutOfRange {
                pinky_columns: config.pinky_columns,
                columns: config.columns,
            });
        }

        let row_curvature = Curvature::new(separation, config.row_angle_deg, "row_angle_deg")?;
        let column_curvature =
            Curvature::new(separation, config.column_angle_deg, "column_angle_deg")?;
        let pinky_curvature = Curvature::new(
            separation,
            config.pinky_column_angle_deg,
            "pinky_column_angle_deg",
        )?;

        log::debug!(
            "layout {}x{}: row radius {:.3}, column radius {:.3}, pinky radius {:.3}",
            config.rows,
            config.columns,
            row_curvature.pivot_distance(),
            column_curvature.pivot_distance(),
            pinky_curvature.pivot_distance()
        );

        Ok(Self {
            config,
            row_curvature,
            column_curvature,
            pinky_curvature,
        })
    }

    #[must_use]
    pub fn config(&self) -> &KeyboardConfig {
        &self.config
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.config.rows
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.config.columns
    }

    #[must_use]
    pub fn plate_depth(&self) -> f64 {
        self.config.plate_depth
    }

    #[must_use]
    pub fn flat_width(&self) -> f64 {
        self.config.flat_width
    }

    #[must_use]
    pub fn cap_to_plate(&self) -> f64 {
        self.config.effective_cap_to_plate()
    }

    #[must_use]
    pub fn keycap_height(&self) -> f64 {
        self.config.effective_keycap_height()
    }

    /// Z of the plate centre in the key frame, where the keycap top is z = 0.
    #[must_use]
    pub fn plate_center_z(&self) -> f64 {
        -self.cap_to_plate() - self.plate_depth()
    }

    #[must_use]
    pub fn row_curvature(&self) -> Curvature {
        self.row_curvature
    }

    /// Column arc for `column`; the first `pinky_columns` use the pinky
    /// angle.
    #[must_use]
    pub fn column_curvature(&self, column: usize) -> Curvature {
        if column < self.config.pinky_columns {
            self.pinky_curvature
        } else {
            self.column_curvature
        }
    }

    #[must_use]
    pub fn column_offset(&self, column: usize) -> Option<ColumnOffset> {
        self.config.xz_offsets.get(column).copied()
    }

    /// Everything needed to place key (`row`, `column`).
    ///
    /// # Errors
    /// [`ConfigError::KeyOutOfRange`] outside the grid.
    pub fn placement(&self, row: usize, column: usize) -> Result<KeyPlacement, ConfigError> {
        let out_of_range = || ConfigError::KeyOutOfRange {
            row,
            column,
            rows: self.rows(),
            columns: self.columns(),
        };
        if row >= self.rows() {
            return Err(out_of_range());
        }
        let offset = self.column_offset(column).ok_or_else(out_of_range)?;
        Ok(KeyPlacement {
            rows: self.rows(),
            row_index: row,
            column_index: column,
            row_curvature: self.row_curvature,
            column_curvature: self.column_curvature(column),
            offset,
        })
    }

    /// Rigid transform taking the key frame of (`row`, `column`) into the
    /// keyboard frame, before the final tilt.
    ///
    /// # Errors
    /// [`ConfigError::KeyOutOfRange`] outside the grid.
    pub fn key_transform(&self, row: usize, column: usize) -> Result<Transform, ConfigError> {
        self.placement(row, column).map(|p| build_transform(&p))
    }

    /// Key transforms in column-major order, the order the assembler
    /// builds them in.
    #[must_use]
    pub fn key_transforms(&self) -> Vec<Transform> {
        (0..self.columns())
            .flat_map(|column| (0..self.rows()).map(move |row| (row, column)))
            .filter_map(|(row, column)| self.key_transform(row, column).ok())
            .collect()
    }

    /// The final tilt about X applied to the whole keyboard.
    #[must_use]
    pub fn final_tilt(&self) -> Transform {
        Transform::rotate_euler_deg([self.config.final_tilt_deg, 0.0, 0.0])
    }

    /// Translation from the key plane to the row arc centre, in the
    /// keyboard frame.
    #[must_use]
    pub fn row_pivot(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.row_curvature.pivot_distance())
    }
}
