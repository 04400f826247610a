pub mod api;
pub mod camera;
pub mod dispatch;
pub mod dots;
pub mod earth;
pub mod geocoding;
pub mod geospatial;
pub mod labels;
pub mod global_uniform;
pub mod markers;
pub mod material;
pub mod mesh;
pub mod pipelines;
pub mod scene;
pub mod window;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub(crate) mod stub_server;
