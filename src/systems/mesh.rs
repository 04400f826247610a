use wgpu::util::DeviceExt;

use crate::components::mesh::Vertex;

use super::geospatial::coordinates::{CoordinatesSystem, GeoPoint};

pub struct MeshSystem {}

impl MeshSystem {
    pub fn create_vertex_buffer(device: &wgpu::Device, data: &[Vertex]) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn create_index_buffer(device: &wgpu::Device, data: &[u32]) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn create_instance_buffer<T: bytemuck::Pod>(device: &wgpu::Device, data: &[T]) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn create_model_matrix_buffer(device: &wgpu::Device, matrix: [[f32; 4]; 4]) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Matrix Buffer"),
            contents: bytemuck::cast_slice(&[matrix]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn create_model_matrix_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Model Matrix Bind Group Layout"),
        })
    }

    pub fn create_model_matrix_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Model Matrix Bind Group"),
        })
    }

    fn map(value: u32, start1: u32, stop1: u32, start2: f64, stop2: f64) -> f64 {
        start2
            + (stop2 - start2) * ((value as f64 - start1 as f64) / (stop1 as f64 - start1 as f64))
    }

    /// UV sphere laid out like an equirectangular image: u runs west to east
    /// from -180°, v runs north to south. Vertices go through the same
    /// transform as markers so texture and markers can't drift apart.
    pub fn generate_sphere_mesh(radius: f64, rings: u32) -> (Vec<Vertex>, Vec<u32>) {
        let columns = rings * 2;
        let mut vertices = Vec::with_capacity(((rings + 1) * (columns + 1)) as usize);
        let mut indices = Vec::with_capacity((rings * columns * 6) as usize);

        for i in 0..=rings {
            let lat = MeshSystem::map(i, 0, rings, 90.0, -90.0);
            for j in 0..=columns {
                let lon = MeshSystem::map(j, 0, columns, -180.0, 180.0);
                let position =
                    CoordinatesSystem::lat_lon_to_cartesian(GeoPoint::new(lat, lon), radius);
                vertices.push(Vertex {
                    position: position.to_array(),
                    uv: [j as f32 / columns as f32, i as f32 / rings as f32],
                });
            }
        }

        // two triangles per quad, the seam column is duplicated so uvs don't wrap
        for i in 0..rings {
            for j in 0..columns {
                let current = i * (columns + 1) + j;
                let below = current + columns + 1;
                indices.extend_from_slice(&[current, below, current + 1]);
                indices.extend_from_slice(&[current + 1, below, below + 1]);
            }
        }

        (vertices, indices)
    }

    /// Unit quad standing on its bottom edge: x in [-0.5, 0.5], y in [0, 1].
    /// Billboards stretch it to their size and hang it above their anchor.
    pub fn generate_quad_mesh() -> (Vec<Vertex>, Vec<u32>) {
        let vertices = vec![
            Vertex {
                position: [-0.5, 0.0, 0.0],
                uv: [0.0, 1.0],
            },
            Vertex {
                position: [0.5, 0.0, 0.0],
                uv: [1.0, 1.0],
            },
            Vertex {
                position: [0.5, 1.0, 0.0],
                uv: [1.0, 0.0],
            },
            Vertex {
                position: [-0.5, 1.0, 0.0],
                uv: [0.0, 0.0],
            },
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        (vertices, indices)
    }
}
