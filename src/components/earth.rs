use bevy_ecs::system::Resource;
use cgmath::{Matrix3, Rad};

use crate::systems::geospatial::coordinates::CartesianPoint;

use super::{
    material::MaterialComponent, mesh::MeshComponent, render_pipelines::RenderPipelineComponent,
};

pub struct EarthComponent {
    pub mesh_component: MeshComponent,
    pub material_component: MaterialComponent,
    pub render_pipeline_component: RenderPipelineComponent,
    pub day_texture: wgpu::TextureView,
    pub night_texture: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub lighting_buffer: wgpu::Buffer,
    pub lighting_bind_group: wgpu::BindGroup,
}

/// Spin of the globe about its polar axis. Markers and border dots ride
/// along, so everything in the scene is stored in the earth's own frame.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct EarthRotation {
    pub angle: f64,
    pub speed: f64,
}

impl EarthRotation {
    pub fn new(speed: f64) -> Self {
        Self { angle: 0.0, speed }
    }

    pub fn advance(&mut self) {
        self.angle = (self.angle + self.speed).rem_euclid(std::f64::consts::TAU);
    }

    pub fn model_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_angle_y(Rad(self.angle as f32))
    }

    pub fn to_world(&self, local: CartesianPoint) -> CartesianPoint {
        rotate_y(local, self.angle)
    }

    pub fn to_local(&self, world: CartesianPoint) -> CartesianPoint {
        rotate_y(world, -self.angle)
    }
}

fn rotate_y(p: CartesianPoint, angle: f64) -> CartesianPoint {
    let m = Matrix3::from_angle_y(Rad(angle));
    let v = m * cgmath::Vector3::new(p.x, p.y, p.z);
    CartesianPoint::new(v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_world_frames_undo_each_other() {
        let mut rotation = EarthRotation::new(0.3);
        rotation.advance();
        rotation.advance();
        let p = CartesianPoint::new(0.2, 0.5, -0.8);
        let back = rotation.to_local(rotation.to_world(p));
        assert!((back.x - p.x).abs() < 1e-12);
        assert!((back.y - p.y).abs() < 1e-12);
        assert!((back.z - p.z).abs() < 1e-12);
    }

    #[test]
    fn quarter_turn_moves_plus_x_to_minus_z() {
        let rotation = EarthRotation {
            angle: std::f64::consts::FRAC_PI_2,
            speed: 0.0,
        };
        let p = rotation.to_world(CartesianPoint::new(1.0, 0.0, 0.0));
        assert!(p.x.abs() < 1e-12);
        assert!((p.z + 1.0).abs() < 1e-12);
    }

    #[test]
    fn angle_wraps_after_a_full_turn() {
        let mut rotation = EarthRotation {
            angle: std::f64::consts::TAU - 0.1,
            speed: 0.2,
        };
        rotation.advance();
        assert!((rotation.angle - 0.1).abs() < 1e-12);
    }
}
