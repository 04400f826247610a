use cgmath::{EuclideanSpace, InnerSpace, SquareMatrix};

use crate::components::camera::Camera;

use super::geospatial::coordinates::CartesianPoint;

/// Clicks that travel further than this between press and release are drags.
pub const CLICK_SLOP_PX: f32 = 4.0;

pub struct WindowSystem {}

impl WindowSystem {
    pub fn is_click(pressed_at: (f32, f32), released_at: (f32, f32)) -> bool {
        let dx = released_at.0 - pressed_at.0;
        let dy = released_at.1 - pressed_at.1;
        dx * dx + dy * dy <= CLICK_SLOP_PX * CLICK_SLOP_PX
    }

    /// Casts a ray from the cursor through the scene and returns where it
    /// first meets the globe (a sphere of `globe_radius` at the origin), in
    /// world space.
    pub fn pick_globe(
        screen_width: f32,
        screen_height: f32,
        position_x: f32,
        position_y: f32,
        globe_radius: f32,
        camera: &Camera,
    ) -> Option<CartesianPoint> {
        let inverse_view_proj = camera.build_view_projection_matrix().invert()?;

        let ndc_x = (position_x * 2.0) / screen_width - 1.0;
        let ndc_y = 1.0 - (2.0 * position_y) / screen_height;

        // wgpu clip depth 0 is the near plane; eye and near point span the ray
        let near = inverse_view_proj * cgmath::Vector4::new(ndc_x, ndc_y, 0.0, 1.0);
        let near = near.truncate() / near.w;

        let ray_origin = camera.eye.to_vec();
        let ray_direction = (near - ray_origin).normalize();

        // globe sits at the origin, so origin - centre is the origin itself
        let b = ray_origin.dot(ray_direction);
        let c = ray_origin.dot(ray_origin) - globe_radius * globe_radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let t = [-b - root, -b + root].into_iter().find(|t| *t > 0.0)?;

        Some((ray_origin + ray_direction * t).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn camera() -> Camera {
        Camera::from_config(&CameraConfig::default(), 800, 600)
    }

    #[test]
    fn centre_of_screen_hits_front_of_globe() {
        let hit = WindowSystem::pick_globe(800.0, 600.0, 400.0, 300.0, 1.0, &camera()).unwrap();
        assert!(hit.x.abs() < 1e-4);
        assert!(hit.y.abs() < 1e-4);
        assert!((hit.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn corner_of_screen_misses() {
        assert!(WindowSystem::pick_globe(800.0, 600.0, 0.0, 0.0, 1.0, &camera()).is_none());
    }

    #[test]
    fn hits_land_on_the_sphere() {
        let hit = WindowSystem::pick_globe(800.0, 600.0, 450.0, 250.0, 1.0, &camera()).unwrap();
        assert!((hit.length() - 1.0).abs() < 1e-4);
        // right of centre is +x, above centre is +y
        assert!(hit.x > 0.0);
        assert!(hit.y > 0.0);
    }

    #[test]
    fn camera_inside_globe_still_finds_the_far_side() {
        let mut camera = camera();
        camera.eye = (0.0, 0.0, 0.5).into();
        let hit = WindowSystem::pick_globe(800.0, 600.0, 400.0, 300.0, 1.0, &camera).unwrap();
        assert!((hit.z + 1.0).abs() < 1e-4);
    }

    #[test]
    fn small_moves_are_clicks() {
        assert!(WindowSystem::is_click((10.0, 10.0), (12.0, 13.0)));
        assert!(!WindowSystem::is_click((10.0, 10.0), (30.0, 10.0)));
    }
}
