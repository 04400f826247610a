use wgpu::util::DeviceExt;

// only multiples of 16 bytes of buffer data are
// compliant with WebGL2, hence the padded vec4s.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    /// World space direction towards the sun, w unused.
    pub light_direction: [f32; 4],
    /// x: ambient floor, y: night emissive intensity, zw unused.
    pub intensities: [f32; 4],
}

impl Default for LightingUniform {
    fn default() -> Self {
        // same spot the sun sits in the original scene: up and to the right
        let (x, y, z) = (5.0f32, 3.0f32, 5.0f32);
        let length = (x * x + y * y + z * z).sqrt();
        Self {
            light_direction: [x / length, y / length, z / length, 0.0],
            intensities: [0.08, 0.8, 0.0, 0.0],
        }
    }
}

pub struct GlobalUniformSystem {}

impl GlobalUniformSystem {
    pub fn create_lighting(
        device: &wgpu::Device,
        uniform: LightingUniform,
    ) -> (wgpu::Buffer, wgpu::BindGroup, wgpu::BindGroupLayout) {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Lighting Uniform Bind Group Layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Lighting Uniform Bind Group"),
        });

        (buffer, bind_group, layout)
    }
}
