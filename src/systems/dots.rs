use bevy_ecs::world::World;

use crate::components::{
    camera::CameraComponent, earth::EarthComponent, mesh::DotInstance,
    render_pipelines::RenderPipelineComponent,
};

use super::{
    mesh::MeshSystem,
    pipelines::DotRenderPipelineSystem,
    scene::{MarkerStyle, SceneSystem},
};

const DOT_RINGS: u32 = 8;

struct InstanceLayer {
    buffer: Option<wgpu::Buffer>,
    count: u32,
}

impl InstanceLayer {
    fn empty() -> Self {
        Self {
            buffer: None,
            count: 0,
        }
    }

    fn upload(&mut self, device: &wgpu::Device, instances: &[DotInstance]) {
        self.count = instances.len() as u32;
        self.buffer = if instances.is_empty() {
            None
        } else {
            Some(MeshSystem::create_instance_buffer(device, instances))
        };
    }
}

/// Markers and border dots: one small unit sphere drawn once per instance.
pub struct DotSystem {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    render_pipeline_component: RenderPipelineComponent,
    markers: InstanceLayer,
    borders: InstanceLayer,
    uploaded: Option<(u64, MarkerStyle)>,
}

impl DotSystem {
    pub fn new(
        device: &wgpu::Device,
        texture_format: wgpu::TextureFormat,
        camera_component: &CameraComponent,
        earth: &EarthComponent,
    ) -> Self {
        let (dot_vertices_vec, dot_indices_vec) = MeshSystem::generate_sphere_mesh(1.0, DOT_RINGS);
        let shader = device.create_shader_module(wgpu::include_wgsl!("../shaders/dot_shader.wgsl"));

        // dots ride on the earth's model matrix so they spin with it
        let dot_pipeline_layouts: &[&wgpu::BindGroupLayout] = &[
            &camera_component.camera_bind_group_layout,
            &earth.mesh_component.model_matrix_bind_group_layout,
        ];
        let render_pipeline_layout =
            DotRenderPipelineSystem::layout_desc(device, dot_pipeline_layouts);
        let render_pipeline = DotRenderPipelineSystem::pipeline_desc(
            device,
            &render_pipeline_layout,
            &shader,
            texture_format,
        );

        Self {
            vertex_buffer: MeshSystem::create_vertex_buffer(device, dot_vertices_vec.as_slice()),
            index_buffer: MeshSystem::create_index_buffer(device, dot_indices_vec.as_slice()),
            num_indices: dot_indices_vec.len() as u32,
            render_pipeline_component: RenderPipelineComponent {
                render_pipeline,
                render_pipeline_layout,
            },
            markers: InstanceLayer::empty(),
            borders: InstanceLayer::empty(),
            uploaded: None,
        }
    }

    /// Rebuilds instance buffers if the scene or marker style changed since
    /// the last upload.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        world: &mut World,
        style: MarkerStyle,
        marker_size: f32,
        border_dot_size: f32,
    ) {
        let revision = SceneSystem::revision(world);
        if self.uploaded == Some((revision, style)) {
            return;
        }

        self.markers.upload(
            device,
            &SceneSystem::marker_instances(world, style, marker_size),
        );
        self.borders.upload(
            device,
            &SceneSystem::border_instances(world, border_dot_size),
        );
        tracing::debug!(
            revision,
            markers = self.markers.count,
            border_dots = self.borders.count,
            "dot instances uploaded"
        );
        self.uploaded = Some((revision, style));
    }

    pub fn draw<'a>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'a>,
        camera_component: &'a CameraComponent,
        earth: &'a EarthComponent,
    ) {
        render_pass.set_pipeline(&self.render_pipeline_component.render_pipeline);
        render_pass.set_bind_group(0, &camera_component.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &earth.mesh_component.model_matrix_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        // borders first so translucent heatmap blobs blend over them
        for layer in [&self.borders, &self.markers] {
            if let Some(buffer) = &layer.buffer {
                render_pass.set_vertex_buffer(1, buffer.slice(..));
                render_pass.draw_indexed(0..self.num_indices, 0, 0..layer.count);
            }
        }
    }
}
