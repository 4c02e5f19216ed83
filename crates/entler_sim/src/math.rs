//! Integer grid math shared by the simulation components.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D integer vector - grid position, velocity, momentum
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct IVec3 {
    /// X component
    pub x: i32,
    /// Y component
    pub y: i32,
    /// Z component
    pub z: i32,
}

impl IVec3 {
    /// Creates a new IVec3
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Unit X vector
    pub const X: Self = Self::new(1, 0, 0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0, 1, 0);

    /// Creates a vector on the grid plane (`z = 0`)
    #[must_use]
    pub const fn planar(x: i32, y: i32) -> Self {
        Self::new(x, y, 0)
    }

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    /// Sum of the absolute components
    #[must_use]
    pub const fn manhattan_length(self) -> u32 {
        self.x.unsigned_abs() + self.y.unsigned_abs() + self.z.unsigned_abs()
    }
}

impl Add for IVec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for IVec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<i32> for IVec3 {
    type Output = Self;
    fn mul(self, rhs: i32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for IVec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for IVec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for IVec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ivec3_operations() {
        let a = IVec3::new(1, 2, 3);
        let b = IVec3::new(4, 5, 6);

        assert_eq!(a + b, IVec3::new(5, 7, 9));
        assert_eq!(b - a, IVec3::new(3, 3, 3));
        assert_eq!(a * 2, IVec3::new(2, 4, 6));
        assert_eq!(-a, IVec3::new(-1, -2, -3));
    }

    #[test]
    fn test_ivec3_assign_ops() {
        let mut v = IVec3::ZERO;
        v += IVec3::X;
        v += IVec3::Y;
        v -= IVec3::new(0, 0, 1);
        assert_eq!(v, IVec3::new(1, 1, -1));
    }

    #[test]
    fn test_manhattan_length() {
        assert_eq!(IVec3::new(-3, 4, 0).manhattan_length(), 7);
        assert_eq!(IVec3::ZERO.manhattan_length(), 0);
    }

    #[test]
    fn test_ivec3_is_pod() {
        let v = IVec3::planar(7, -1);
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(*bytemuck::from_bytes::<IVec3>(bytes), v);
    }
}
