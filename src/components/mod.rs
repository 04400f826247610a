pub mod camera;
pub mod earth;
pub mod marker;
pub mod material;
pub mod mesh;
pub mod render_pipelines;
