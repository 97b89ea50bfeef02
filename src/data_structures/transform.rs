//! Decomposed transforms for placements and bind poses.
//!
//! Entity placements and bone bind poses are stored as position, rotation
//! (quaternion) and scale rather than as matrices, so they stay cheap to
//! compose and easy to inspect. Conversion to a matrix happens once per
//! scene assembly.

use std::ops::Mul;

use cgmath::{One, Rotation3};

/// A position / rotation / scale triple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    /// The identity transform (no move, rotate, or scale).
    pub fn identity() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Build a rotation from Euler angles in degrees, applied z then y then
    /// x. This matches how the level format stores placement angles.
    pub fn from_euler_deg(position: cgmath::Vector3<f32>, angles: [f32; 3], scale: cgmath::Vector3<f32>) -> Self {
        let rotation = cgmath::Quaternion::from_angle_x(cgmath::Deg(angles[0]))
            * cgmath::Quaternion::from_angle_y(cgmath::Deg(angles[1]))
            * cgmath::Quaternion::from_angle_z(cgmath::Deg(angles[2]));
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Mul<Transform> for Transform {
    type Output = Self;

    fn mul(self, rhs: Transform) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Transform {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl From<cgmath::Vector3<f32>> for Transform {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
