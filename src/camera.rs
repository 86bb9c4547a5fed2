//! Perspective camera, its GPU uniform and the orbit controller.
//!
//! The [`Camera`] only knows where it is and what it looks at; the [`Projection`]
//! holds the lens. [`OrbitController`] moves the camera on a sphere around its
//! target with damped rotation and panning, like the orbit controls of most web
//! viewers.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector2, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Zero-sized surfaces keep the previous aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Camera data as laid out in the shaders' camera uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    position: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
            inv_view_proj: Matrix4::identity().into(),
            position: [0.0; 4],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        let view_proj = projection.calc_matrix() * camera.calc_matrix();
        self.view_proj = view_proj.into();
        self.inv_view_proj = view_proj.invert().unwrap_or(Matrix4::identity()).into();
        self.position = camera.position.to_homogeneous().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

const EPS: f32 = 1e-6;
/// Scale applied per wheel notch.
const ZOOM_STEP: f32 = 0.95;

/// Orbits the camera around its target.
///
/// Input only accumulates deltas; [`OrbitController::update`] applies the damped
/// share of them to the camera and must be called once per frame.
#[derive(Clone, Debug)]
pub struct OrbitController {
    damping_factor: f32,
    rotate_speed: f32,
    pan_speed: f32,
    fovy: Rad<f32>,
    min_distance: f32,
    max_distance: f32,

    rotate_delta: Vector2<f32>,
    pan_delta: Vector2<f32>,
    scale: f32,

    drag: Option<DragMode>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitController {
    pub fn new(damping_factor: f32, fovy: Rad<f32>) -> Self {
        Self {
            damping_factor,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            fovy,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            rotate_delta: Vector2::new(0.0, 0.0),
            pan_delta: Vector2::new(0.0, 0.0),
            scale: 1.0,
            drag: None,
            cursor: None,
        }
    }

    pub fn damping_factor(&self) -> f32 {
        self.damping_factor
    }

    /// Pending (azimuth, polar) rotation in radians not yet applied to the camera.
    pub fn rotate_delta(&self) -> Vector2<f32> {
        self.rotate_delta
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Routes pointer input; returns whether the event was used.
    pub fn handle_window_event(&mut self, event: &WindowEvent, viewport_height: f32) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let mode = match button {
                    MouseButton::Left => DragMode::Rotate,
                    MouseButton::Right | MouseButton::Middle => DragMode::Pan,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.start_drag(mode),
                    ElementState::Released => self.end_drag(),
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.drag_to(*position, viewport_height);
                self.drag.is_some()
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / 100.0) as f32,
                };
                self.zoom(notches);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.end_drag();
                false
            }
            _ => false,
        }
    }

    pub fn start_drag(&mut self, mode: DragMode) {
        self.drag = Some(mode);
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Moves the pointer; while dragging the movement turns into rotation or panning.
    pub fn drag_to(&mut self, position: PhysicalPosition<f64>, viewport_height: f32) {
        let previous = self.cursor.replace(position);
        let (Some(mode), Some(previous)) = (self.drag, previous) else {
            return;
        };
        let height = viewport_height.max(1.0);
        let dx = (position.x - previous.x) as f32;
        let dy = (position.y - previous.y) as f32;
        match mode {
            DragMode::Rotate => {
                self.rotate_delta.x -= 2.0 * PI * dx / height * self.rotate_speed;
                self.rotate_delta.y -= 2.0 * PI * dy / height * self.rotate_speed;
            }
            DragMode::Pan => {
                self.pan_delta.x += dx / height * self.pan_speed;
                self.pan_delta.y += dy / height * self.pan_speed;
            }
        }
    }

    /// Positive notches move towards the target.
    pub fn zoom(&mut self, notches: f32) {
        self.scale *= ZOOM_STEP.powf(notches);
    }

    pub fn update(&mut self, camera: &mut Camera) {
        // Without damping every delta is applied at once.
        let factor = if self.damping_factor > 0.0 {
            self.damping_factor.min(1.0)
        } else {
            1.0
        };

        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > EPS {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI / 2.0
        };

        theta += self.rotate_delta.x * factor;
        phi = (phi + self.rotate_delta.y * factor).clamp(EPS, PI - EPS);
        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let pan = self.pan_delta * factor;
        if pan.x != 0.0 || pan.y != 0.0 {
            let forward = (camera.target - camera.position).normalize();
            let right = forward.cross(camera.up).normalize();
            let up = right.cross(forward);
            let distance = radius * (self.fovy.0 / 2.0).tan();
            let shift = right * (-2.0 * pan.x * distance) + up * (2.0 * pan.y * distance);
            camera.target += shift;
        }

        let new_offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = camera.target + new_offset;

        self.rotate_delta *= 1.0 - factor;
        self.pan_delta *= 1.0 - factor;
        self.scale = 1.0;
    }
}
