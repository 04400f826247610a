use cgmath::InnerSpace;
use winit::event::{
    ElementState, KeyboardInput, MouseButton, MouseScrollDelta, VirtualKeyCode, WindowEvent,
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);
pub const IDENTITY_MATRIX_4: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

// keep the orbit off the poles so look_at never sees eye parallel to up
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

pub struct CameraComponent {
    pub camera: Camera,
    pub camera_uniform: CameraUniform,
    pub camera_buffer: wgpu::Buffer,
    pub camera_bind_group: wgpu::BindGroup,
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
    pub camera_controller: OrbitController,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: cgmath::Point3<f32>,
    pub target: cgmath::Point3<f32>,
    pub up: cgmath::Vector3<f32>,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, screen_width: u32, screen_height: u32) -> Self {
        Self {
            // +z is out of the screen
            eye: (0.0, 0.0, config.distance).into(),
            target: (0.0, 0.0, 0.0).into(),
            up: cgmath::Vector3::unit_y(),
            aspect: screen_width as f32 / screen_height.max(1) as f32,
            fovy: config.fovy,
            znear: config.znear,
            zfar: config.zfar,
        }
    }

    // cgmath builds for OpenGL clip space (z in -1..1), wgpu wants z in 0..1,
    // so the correction matrix goes in front of the projection.
    pub fn build_view_projection_matrix(&self) -> cgmath::Matrix4<f32> {
        let view = cgmath::Matrix4::look_at_rh(self.eye, self.target, self.up);
        let proj = cgmath::perspective(cgmath::Deg(self.fovy), self.aspect, self.znear, self.zfar);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

/// Orbit controls around the origin: drag or arrow keys to spin, wheel or
/// W/S to zoom, with damped velocities so motion eases out.
pub struct OrbitController {
    yaw: f32,
    pitch: f32,
    distance: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    min_distance: f32,
    max_distance: f32,
    damping: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    is_forward_pressed: bool,
    is_backward_pressed: bool,
    is_left_pressed: bool,
    is_right_pressed: bool,
    is_dragging: bool,
    last_cursor: Option<(f32, f32)>,
}

impl OrbitController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: config.distance,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            damping: config.damping,
            rotate_speed: 0.005,
            zoom_speed: 0.05,
            is_forward_pressed: false,
            is_backward_pressed: false,
            is_left_pressed: false,
            is_right_pressed: false,
            is_dragging: false,
            last_cursor: None,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn process_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => {
                let is_pressed = *state == ElementState::Pressed;
                match keycode {
                    VirtualKeyCode::W | VirtualKeyCode::Up => {
                        self.is_forward_pressed = is_pressed;
                        true
                    }
                    VirtualKeyCode::A | VirtualKeyCode::Left => {
                        self.is_left_pressed = is_pressed;
                        true
                    }
                    VirtualKeyCode::S | VirtualKeyCode::Down => {
                        self.is_backward_pressed = is_pressed;
                        true
                    }
                    VirtualKeyCode::D | VirtualKeyCode::Right => {
                        self.is_right_pressed = is_pressed;
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.is_dragging = *state == ElementState::Pressed;
                // clicks are also picks, let them through
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = (position.x as f32, position.y as f32);
                self.drag_to(cursor);
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.zoom_velocity -= lines * self.zoom_speed;
                true
            }
            _ => false,
        }
    }

    fn drag_to(&mut self, cursor: (f32, f32)) {
        if let (true, Some(last)) = (self.is_dragging, self.last_cursor) {
            // scale by distance so the surface tracks the pointer roughly
            // the same whether zoomed in or out
            let scale = self.rotate_speed * (self.distance - 1.0).max(0.1);
            self.yaw_velocity -= (cursor.0 - last.0) * scale;
            self.pitch_velocity += (cursor.1 - last.1) * scale;
        }
        self.last_cursor = Some(cursor);
    }

    /// Turns the orbit so the camera looks straight down at `direction`.
    pub fn face(&mut self, direction: cgmath::Vector3<f32>) {
        let d = direction.normalize();
        self.pitch = d.y.asin().clamp(-MAX_PITCH, MAX_PITCH);
        self.yaw = d.x.atan2(d.z);
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;
    }

    pub fn update_camera(&mut self, camera: &mut Camera) {
        let key_step = self.rotate_speed * 2.0;
        if self.is_left_pressed {
            self.yaw_velocity -= key_step;
        }
        if self.is_right_pressed {
            self.yaw_velocity += key_step;
        }
        if self.is_forward_pressed {
            self.zoom_velocity -= self.zoom_speed * 0.2;
        }
        if self.is_backward_pressed {
            self.zoom_velocity += self.zoom_speed * 0.2;
        }

        self.yaw += self.yaw_velocity;
        self.pitch = (self.pitch + self.pitch_velocity).clamp(-MAX_PITCH, MAX_PITCH);
        self.distance =
            (self.distance + self.zoom_velocity).clamp(self.min_distance, self.max_distance);

        let keep = 1.0 - self.damping;
        self.yaw_velocity *= keep;
        self.pitch_velocity *= keep;
        self.zoom_velocity *= keep;

        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = cgmath::Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw);
        camera.eye = camera.target + offset * self.distance;
    }
}

// We need this for Rust to store our data correctly for the shaders
#[repr(C)]
// This is so we can store this in a buffer
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    // We can't use cgmath with bytemuck directly so we'll have
    // to convert the Matrix4 into a 4x4 f32 array
    pub view_proj_matrix: [[f32; 4]; 4],
    // w unused, keeps the struct 16 byte aligned for WebGL2
    pub eye_position: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj_matrix: IDENTITY_MATRIX_4,
            eye_position: [0.0; 4],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_proj_matrix = camera.build_view_projection_matrix().into();
        self.eye_position = [camera.eye.x, camera.eye.y, camera.eye.z, 1.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> (Camera, OrbitController) {
        let config = CameraConfig::default();
        (Camera::from_config(&config, 800, 600), OrbitController::new(&config))
    }

    #[test]
    fn resting_orbit_keeps_camera_on_plus_z() {
        let (mut camera, mut controller) = camera();
        controller.update_camera(&mut camera);
        assert!((camera.eye.x).abs() < 1e-6);
        assert!((camera.eye.y).abs() < 1e-6);
        assert!((camera.eye.z - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zoom_is_clamped_to_bounds() {
        let (mut camera, mut controller) = camera();
        controller.zoom_velocity = -100.0;
        controller.update_camera(&mut camera);
        assert_eq!(controller.distance(), 1.5);

        controller.zoom_velocity = 100.0;
        controller.update_camera(&mut camera);
        assert_eq!(controller.distance(), 5.0);
        assert!((cgmath::EuclideanSpace::to_vec(camera.eye).magnitude() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn velocity_decays_with_damping() {
        let (mut camera, mut controller) = camera();
        controller.yaw_velocity = 0.1;
        controller.update_camera(&mut camera);
        assert!((controller.yaw_velocity - 0.09).abs() < 1e-6);
    }

    #[test]
    fn face_points_eye_along_direction() {
        let (mut camera, mut controller) = camera();
        controller.face(cgmath::Vector3::new(1.0, 0.0, 0.0));
        controller.update_camera(&mut camera);
        assert!((camera.eye.x - 3.0).abs() < 1e-5);
        assert!(camera.eye.z.abs() < 1e-5);
    }

    #[test]
    fn pitch_never_reaches_the_pole() {
        let (mut camera, mut controller) = camera();
        controller.pitch_velocity = 10.0;
        controller.update_camera(&mut camera);
        assert!(controller.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.eye.y < 3.0);
    }
}
