//! Arc geometry shared by rows and columns.
//!
//! Keys on an arc are `angle_deg` apart angularly and should end up
//! `key_separation` apart linearly. The arc radius that achieves this is
//! `key_separation / sin(angle)`. A zero angle is the flat limit, where the
//! pivot idiom degenerates into a plain translation by `key_separation`.

use crate::geom::{Axis, Transform, Vec3};

use super::ConfigError;

/// Radius of the arc on which keys `curve_deg` apart sit `key_separation`
/// apart.
///
/// # Errors
/// [`ConfigError::DegenerateCurvature`] unless `curve_deg` is finite and in
/// the open interval `(0, 180)`, where the radius is finite and positive.
pub fn arc_radius(key_separation: f64, curve_deg: f64) -> Result<f64, ConfigError> {
    if !(curve_deg.is_finite() && curve_deg > 0.0 && curve_deg < 180.0) {
        return Err(ConfigError::DegenerateCurvature {
            parameter: "curve_deg",
            angle_deg: curve_deg,
        });
    }
    Ok(key_separation / curve_deg.to_radians().sin())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curvature {
    /// Keys laid out on a straight line, `spacing` apart.
    Flat { spacing: f64 },
    /// Keys on an arc of `radius`, `angle_deg` apart.
    Arc { angle_deg: f64, radius: f64 },
}

impl Curvature {
    /// Curvature for one configuration parameter. Zero selects
    /// [`Curvature::Flat`].
    ///
    /// # Errors
    /// [`ConfigError::DegenerateCurvature`] naming `parameter` for negative,
    /// non-finite or `>= 180` angles.
    pub fn new(
        key_separation: f64,
        angle_deg: f64,
        parameter: &'static str,
    ) -> Result<Self, ConfigError> {
        if angle_deg == 0.0 {
            return Ok(Self::Flat {
                spacing: key_separation,
            });
        }
        let radius = arc_radius(key_separation, angle_deg).map_err(|_| {
            ConfigError::DegenerateCurvature {
                parameter,
                angle_deg,
            }
        })?;
        Ok(Self::Arc { angle_deg, radius })
    }

    #[must_use]
    pub const fn angle_deg(self) -> f64 {
        match self {
            Self::Flat { .. } => 0.0,
            Self::Arc { angle_deg, .. } => angle_deg,
        }
    }

    /// Distance from the key plane to the arc centre; zero when flat.
    #[must_use]
    pub const fn pivot_distance(self) -> f64 {
        match self {
            Self::Flat { .. } => 0.0,
            Self::Arc { radius, .. } => radius,
        }
    }

    /// Motion by `steps` key pitches about the pivot, to be sandwiched
    /// between the translations to and from the pivot.
    ///
    /// For an arc this is the rotation about `axis`. For a flat layout it is
    /// the translation along the arc tangent that the rotation tends to as
    /// the angle goes to zero.
    #[must_use]
    pub fn advance(self, axis: Axis, steps: f64) -> Transform {
        match self {
            Self::Arc { angle_deg, .. } => Transform::rotate_deg(axis, angle_deg * steps),
            Self::Flat { spacing } => {
                let tangent = axis.unit().cross(-Vec3::Z);
                Transform::translate(tangent * (spacing * steps))
            }
        }
    }

    /// The complete pivot idiom: to the pivot, advance, back.
    #[must_use]
    pub fn pivot(self, axis: Axis, steps: f64) -> Transform {
        let r = self.pivot_distance();
        Transform::translate(Vec3::new(0.0, 0.0, r))
            * self.advance(axis, steps)
            * Transform::translate(Vec3::new(0.0, 0.0, -r))
    }
}
