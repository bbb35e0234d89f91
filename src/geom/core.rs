use std::ops::{Add, Mul, Neg, Sub};

// ─────────────────────────────────────────────────────────────────────────────
// Vec3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    #[must_use]
    pub const fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Unit vector in the same direction, or `None` for (near) zero length.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len > Tolerance::ZERO_LENGTH.eps && len.is_finite() {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn from_array(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[must_use]
    pub const fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        Self::new(
            self.x + (rhs.x - self.x) * t,
            self.y + (rhs.y - self.y) * t,
            self.z + (rhs.z - self.z) * t,
        )
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).length()
    }

    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(value: [f64; 3]) -> Self {
        Self::from_array(value)
    }
}

impl From<Point3> for [f64; 3] {
    fn from(value: Point3) -> Self {
        value.to_array()
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// Coordinate axis used by axis-angle helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[must_use]
    pub const fn unit(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }
}

/// Row-major 4x4 homogeneous matrix acting on column vectors.
///
/// `a.compose(b)` is the matrix product `a * b`: applying the result to a
/// point applies `b` first, then `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: [[f64; 4]; 4],
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub const fn translate(offset: Vec3) -> Self {
        let mut t = Self::identity();
        t.m[0][3] = offset.x;
        t.m[1][3] = offset.y;
        t.m[2][3] = offset.z;
        t
    }

    /// Right-handed rotation about a coordinate axis, angle in radians.
    #[must_use]
    pub fn rotate(axis: Axis, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut t = Self::identity();
        let (i, j) = match axis {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        };
        t.m[i][i] = c;
        t.m[i][j] = -s;
        t.m[j][i] = s;
        t.m[j][j] = c;
        t
    }

    #[must_use]
    pub fn rotate_x(angle: f64) -> Self {
        Self::rotate(Axis::X, angle)
    }

    #[must_use]
    pub fn rotate_y(angle: f64) -> Self {
        Self::rotate(Axis::Y, angle)
    }

    #[must_use]
    pub fn rotate_z(angle: f64) -> Self {
        Self::rotate(Axis::Z, angle)
    }

    /// Rotation about a coordinate axis with the angle in degrees.
    #[must_use]
    pub fn rotate_deg(axis: Axis, degrees: f64) -> Self {
        Self::rotate(axis, degrees.to_radians())
    }

    /// Euler rotation in degrees applied about X, then Y, then Z.
    #[must_use]
    pub fn rotate_euler_deg(degrees: [f64; 3]) -> Self {
        Self::rotate_deg(Axis::Z, degrees[2])
            .compose(Self::rotate_deg(Axis::Y, degrees[1]))
            .compose(Self::rotate_deg(Axis::X, degrees[0]))
    }

    #[must_use]
    pub fn compose(self, other: Self) -> Self {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Self { m: out }
    }

    /// Determinant of the upper 3x3 block.
    #[must_use]
    pub fn determinant(self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Returns `true` for a proper rigid motion: orthonormal rotation block,
    /// determinant +1 and an affine bottom row.
    #[must_use]
    pub fn is_rigid(self, tol: Tolerance) -> bool {
        let m = &self.m;
        if m.iter().flatten().any(|v| !v.is_finite()) {
            return false;
        }
        let affine = tol.approx_zero_f64(m[3][0])
            && tol.approx_zero_f64(m[3][1])
            && tol.approx_zero_f64(m[3][2])
            && tol.approx_eq_f64(m[3][3], 1.0);
        let orthonormal = (0..3).all(|a| {
            (0..3).all(|b| {
                let dot: f64 = (0..3).map(|k| m[k][a] * m[k][b]).sum();
                tol.approx_eq_f64(dot, if a == b { 1.0 } else { 0.0 })
            })
        });
        affine && orthonormal && tol.approx_eq_f64(self.determinant(), 1.0)
    }

    /// Inverse of a rigid motion (`R^T`, `-R^T t`). Returns `None` when the
    /// transform is not rigid within the default tolerance.
    #[must_use]
    pub fn inverse_rigid(self) -> Option<Self> {
        if !self.is_rigid(Tolerance::LOOSE) {
            return None;
        }
        let m = &self.m;
        let mut inv = Self::identity();
        for i in 0..3 {
            for j in 0..3 {
                inv.m[i][j] = m[j][i];
            }
        }
        for i in 0..3 {
            inv.m[i][3] = -(0..3).map(|k| m[k][i] * m[k][3]).sum::<f64>();
        }
        Some(inv)
    }

    #[must_use]
    pub fn translation(self) -> Vec3 {
        Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    #[must_use]
    pub fn apply_point(self, p: Point3) -> Point3 {
        let m = &self.m;
        Point3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    #[must_use]
    pub fn apply_vec(self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Largest absolute element-wise difference to another transform.
    #[must_use]
    pub fn max_abs_diff(self, other: Self) -> f64 {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    #[must_use]
    pub const fn as_matrix(&self) -> &[[f64; 4]; 4] {
        &self.m
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Transform {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BBox
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Point3,
    pub max: Point3,
}

impl BBox {
    #[must_use]
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), Self::include))
    }

    #[must_use]
    pub fn include(self, p: Point3) -> Self {
        Self::new(
            Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        )
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        self.include(other.min).include(other.max)
    }

    #[must_use]
    pub fn center(self) -> Point3 {
        self.min.lerp(self.max, 0.5)
    }

    #[must_use]
    pub fn size(self) -> Vec3 {
        self.max - self.min
    }

    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[must_use]
    pub fn expand_by(self, amount: f64) -> Self {
        let d = Vec3::new(amount, amount, amount);
        Self::new(self.min + -d, self.max + d)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Named tolerances, so epsilons are not scattered through the kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    /// General geometric comparisons (1e-9).
    pub const DEFAULT: Self = Self { eps: 1e-9 };

    /// Degenerate vector and edge detection (1e-12).
    pub const ZERO_LENGTH: Self = Self { eps: 1e-12 };

    /// Point-to-plane classification in the BSP booleans (1e-5 mm).
    pub const PLANE: Self = Self { eps: 1e-5 };

    /// Vertex welding of boolean output (1e-6 mm).
    pub const WELD: Self = Self { eps: 1e-6 };

    /// Coarse comparisons (1e-6).
    pub const LOOSE: Self = Self { eps: 1e-6 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[must_use]
    pub const fn eps_squared(self) -> f64 {
        self.eps * self.eps
    }

    #[must_use]
    pub fn approx_eq_f64(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }

    #[must_use]
    pub fn approx_zero_f64(self, a: f64) -> bool {
        a.abs() <= self.eps
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        (a - b).length_squared() <= self.eps_squared()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
