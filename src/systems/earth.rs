use image::RgbaImage;

use crate::{
    components::{
        camera::CameraComponent,
        earth::{EarthComponent, EarthRotation},
        material::MaterialComponent,
        mesh::MeshComponent,
        render_pipelines::RenderPipelineComponent,
    },
    matrix4_to_array,
};

use super::{
    dispatch::TextureKind,
    global_uniform::{GlobalUniformSystem, LightingUniform},
    material::{MaterialSystem, DAY_PLACEHOLDER, NIGHT_PLACEHOLDER},
    mesh::MeshSystem,
    pipelines::EarthRenderPipelineSystem,
};

pub const EARTH_RADIUS: f64 = 1.0;

pub struct EarthSystem {}

impl EarthSystem {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_format: wgpu::TextureFormat,
        camera_component: &CameraComponent,
        rings: u32,
    ) -> EarthComponent {
        let mesh_component = EarthSystem::generate_mesh(device, rings);
        let day_texture = MaterialSystem::create_2d_texture(
            device,
            queue,
            &MaterialSystem::solid_rgba(DAY_PLACEHOLDER),
            "Day Placeholder Texture",
        );
        let night_texture = MaterialSystem::create_2d_texture(
            device,
            queue,
            &MaterialSystem::solid_rgba(NIGHT_PLACEHOLDER),
            "Night Placeholder Texture",
        );
        let sampler = MaterialSystem::create_sampler(device);
        let material_component =
            EarthSystem::generate_material(device, &day_texture, &night_texture, &sampler);
        let (lighting_buffer, lighting_bind_group, lighting_bind_group_layout) =
            GlobalUniformSystem::create_lighting(device, LightingUniform::default());
        let render_pipeline_component = EarthSystem::generate_render_pipeline(
            device,
            texture_format,
            camera_component,
            &mesh_component,
            &material_component,
            &lighting_bind_group_layout,
        );

        EarthComponent {
            mesh_component,
            material_component,
            render_pipeline_component,
            day_texture,
            night_texture,
            sampler,
            lighting_buffer,
            lighting_bind_group,
        }
    }

    pub fn generate_mesh(device: &wgpu::Device, rings: u32) -> MeshComponent {
        let earth_matrix = matrix4_to_array(EarthRotation::new(0.0).model_matrix());

        let earth_matrix_bind_group_layout = MeshSystem::create_model_matrix_bind_group_layout(device);
        let earth_matrix_buffer = MeshSystem::create_model_matrix_buffer(device, earth_matrix);
        let earth_matrix_bind_group = MeshSystem::create_model_matrix_bind_group(
            device,
            &earth_matrix_bind_group_layout,
            &earth_matrix_buffer,
        );

        let (earth_vertices_vec, earth_indices_vec) =
            MeshSystem::generate_sphere_mesh(EARTH_RADIUS, rings);

        MeshComponent {
            vertex_buffer: MeshSystem::create_vertex_buffer(device, earth_vertices_vec.as_slice()),
            index_buffer: MeshSystem::create_index_buffer(device, earth_indices_vec.as_slice()),
            num_indices: earth_indices_vec.len() as u32,
            model_matrix_bind_group_layout: earth_matrix_bind_group_layout,
            model_matrix_bind_group: earth_matrix_bind_group,
            model_matrix_buffer: earth_matrix_buffer,
            model_matrix: earth_matrix,
        }
    }

    fn generate_material(
        device: &wgpu::Device,
        day: &wgpu::TextureView,
        night: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> MaterialComponent {
        let bind_group_layout = MaterialSystem::create_day_night_bind_group_layout(device);
        let bind_group = MaterialSystem::create_day_night_bind_group(
            device,
            &bind_group_layout,
            day,
            night,
            sampler,
        );
        MaterialComponent {
            bind_group,
            bind_group_layout,
            shader: device.create_shader_module(wgpu::include_wgsl!("../shaders/earth_shader.wgsl")),
        }
    }

    fn generate_render_pipeline(
        device: &wgpu::Device,
        texture_format: wgpu::TextureFormat,
        camera_component: &CameraComponent,
        mesh_component: &MeshComponent,
        material_component: &MaterialComponent,
        lighting_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> RenderPipelineComponent {
        let earth_pipeline_layouts: &[&wgpu::BindGroupLayout] = &[
            &camera_component.camera_bind_group_layout,
            &material_component.bind_group_layout,
            &mesh_component.model_matrix_bind_group_layout,
            lighting_bind_group_layout,
        ];
        let earth_render_pipeline_layout =
            EarthRenderPipelineSystem::layout_desc(device, earth_pipeline_layouts);
        let earth_render_pipeline = EarthRenderPipelineSystem::pipeline_desc(
            device,
            &earth_render_pipeline_layout,
            &material_component.shader,
            texture_format,
        );
        RenderPipelineComponent {
            render_pipeline: earth_render_pipeline,
            render_pipeline_layout: earth_render_pipeline_layout,
        }
    }

    /// Swaps a placeholder (or earlier) texture for freshly decoded imagery.
    pub fn set_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        earth: &mut EarthComponent,
        kind: TextureKind,
        image: &RgbaImage,
    ) {
        let label = match kind {
            TextureKind::Day => "Earth Day Texture",
            TextureKind::Night => "Earth Night Texture",
        };
        let view = MaterialSystem::create_2d_texture(device, queue, image, label);
        match kind {
            TextureKind::Day => earth.day_texture = view,
            TextureKind::Night => earth.night_texture = view,
        }
        earth.material_component.bind_group = MaterialSystem::create_day_night_bind_group(
            device,
            &earth.material_component.bind_group_layout,
            &earth.day_texture,
            &earth.night_texture,
            &earth.sampler,
        );
    }

    // spin earth about its polar axis; dots share this matrix
    pub fn update_rotation(queue: &wgpu::Queue, earth: &mut EarthComponent, rotation: &EarthRotation) {
        let matrix = matrix4_to_array(rotation.model_matrix());
        earth.mesh_component.model_matrix = matrix;
        queue.write_buffer(
            &earth.mesh_component.model_matrix_buffer,
            0,
            bytemuck::cast_slice(&[matrix]),
        );
    }

    pub fn draw<'a>(
        render_pass: &mut wgpu::RenderPass<'a>,
        earth: &'a EarthComponent,
        camera_component: &'a CameraComponent,
    ) {
        let mesh = &earth.mesh_component;
        render_pass.set_pipeline(&earth.render_pipeline_component.render_pipeline);
        render_pass.set_bind_group(0, &camera_component.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &earth.material_component.bind_group, &[]);
        render_pass.set_bind_group(2, &mesh.model_matrix_bind_group, &[]);
        render_pass.set_bind_group(3, &earth.lighting_bind_group, &[]);
        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
    }
}
