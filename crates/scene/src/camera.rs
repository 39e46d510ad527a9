//! Camera used to build the per-frame view and projection.
//!
//! The projection's aspect ratio is not stored: the output extent can change
//! between any two frames, so the renderer passes the current aspect in when
//! it asks for [`Camera::projection_matrix_for_aspect`].

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Projection type for the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Perspective projection with a vertical field of view in degrees.
    Perspective { fov_y_degrees: f32, near: f32, far: f32 },
    /// Orthographic projection with a vertical half-extent; the horizontal
    /// half-extent follows the aspect ratio.
    Orthographic { half_height: f32, near: f32, far: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y_degrees: 90.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// A camera for rendering the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Camera rotation
    pub rotation: Quat,
    /// Projection settings
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            rotation: Quat::IDENTITY,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Perspective camera at `position` looking down -Z.
    pub fn perspective(position: Vec3, fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            projection: Projection::Perspective {
                fov_y_degrees,
                near,
                far,
            },
        }
    }

    /// Sets the orientation from pitch, yaw and roll given in degrees.
    pub fn with_euler_degrees(mut self, pitch: f32, yaw: f32, roll: f32) -> Self {
        self.rotation = Quat::from_euler(
            EulerRot::YXZ,
            yaw.to_radians(),
            pitch.to_radians(),
            roll.to_radians(),
        );
        self
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    /// Projection for an output of the given aspect ratio, Y flipped for Vulkan.
    ///
    /// A non-finite or non-positive aspect (a minimized window) falls back to 1.
    pub fn projection_matrix_for_aspect(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };

        let mut proj = match self.projection {
            Projection::Perspective {
                fov_y_degrees,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                half_height,
                near,
                far,
            } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far)
            }
        };
        // Flip Y for Vulkan coordinate system
        proj.y_axis.y *= -1.0;
        proj
    }

    /// Get the forward direction vector.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the up direction vector.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Turns the camera to face `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let to_target = target - self.position;
        if to_target.length_squared() > f32::EPSILON {
            self.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, to_target.normalize());
        }
    }
}
