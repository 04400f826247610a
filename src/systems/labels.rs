//! Place name labels: one camera facing quad per marker, textured with the
//! marker's name drawn in an 8x8 bitmap font.

use std::collections::{HashMap, HashSet};

use bevy_ecs::{entity::Entity, world::World};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgba, RgbaImage};

use crate::components::{
    camera::CameraComponent, earth::EarthComponent, mesh::LabelInstance,
    render_pipelines::RenderPipelineComponent,
};

use super::{
    material::MaterialSystem,
    mesh::MeshSystem,
    pipelines::LabelRenderPipelineSystem,
    scene::{MarkerLabel, SceneSystem},
};

const GLYPH_SIZE: u32 = 8;
const PADDING: u32 = 1;
pub const LABEL_MAX_CHARS: usize = 28;

const TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHADOW: Rgba<u8> = Rgba([0, 0, 0, 200]);

/// Geocoder names run long ("Paris, Île-de-France, France métropolitaine, France").
pub fn label_text(name: &str) -> String {
    let name = name.trim();
    if name.chars().count() <= LABEL_MAX_CHARS {
        return name.to_string();
    }
    let mut short: String = name.chars().take(LABEL_MAX_CHARS - 3).collect();
    short.truncate(short.trim_end().len());
    short.push_str("...");
    short
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or_default()
}

/// Image coordinates of the set pixels of the `index`th glyph.
fn lit_pixels(index: usize, bits: [u8; 8]) -> impl Iterator<Item = (u32, u32)> {
    (0..GLYPH_SIZE).flat_map(move |row| {
        (0..GLYPH_SIZE).filter_map(move |col| {
            (bits[row as usize] >> col & 1 == 1).then_some((
                PADDING + index as u32 * GLYPH_SIZE + col,
                PADDING + row,
            ))
        })
    })
}

/// White text with a one pixel drop shadow on a transparent background.
pub fn rasterize(text: &str) -> RgbaImage {
    let glyphs: Vec<[u8; 8]> = text.chars().map(glyph).collect();
    let width = glyphs.len() as u32 * GLYPH_SIZE + 2 * PADDING;
    let height = GLYPH_SIZE + 2 * PADDING;
    let mut image = RgbaImage::new(width, height);

    for (index, bits) in glyphs.iter().enumerate() {
        for (x, y) in lit_pixels(index, *bits) {
            if x + 1 < width && y + 1 < height {
                image.put_pixel(x + 1, y + 1, SHADOW);
            }
        }
    }
    for (index, bits) in glyphs.iter().enumerate() {
        for (x, y) in lit_pixels(index, *bits) {
            image.put_pixel(x, y, TEXT);
        }
    }
    image
}

/// Quad size in world units for a label image drawn `height` tall.
pub fn label_instance(anchor: [f32; 3], image: &RgbaImage, height: f32) -> LabelInstance {
    let aspect = image.width() as f32 / image.height() as f32;
    LabelInstance {
        anchor,
        size: [height * aspect, height],
    }
}

struct LabelGpu {
    bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
}

pub struct LabelSystem {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    render_pipeline_component: RenderPipelineComponent,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    label_height: f32,
    labels: HashMap<Entity, LabelGpu>,
    uploaded_revision: Option<u64>,
}

impl LabelSystem {
    pub fn new(
        device: &wgpu::Device,
        texture_format: wgpu::TextureFormat,
        camera_component: &CameraComponent,
        earth: &EarthComponent,
        label_height: f32,
    ) -> Self {
        let (quad_vertices, quad_indices) = MeshSystem::generate_quad_mesh();
        let shader =
            device.create_shader_module(wgpu::include_wgsl!("../shaders/label_shader.wgsl"));
        let texture_bind_group_layout = MaterialSystem::create_texture_bind_group_layout(device);

        let label_pipeline_layouts: &[&wgpu::BindGroupLayout] = &[
            &camera_component.camera_bind_group_layout,
            &earth.mesh_component.model_matrix_bind_group_layout,
            &texture_bind_group_layout,
        ];
        let render_pipeline_layout =
            LabelRenderPipelineSystem::layout_desc(device, label_pipeline_layouts);
        let render_pipeline = LabelRenderPipelineSystem::pipeline_desc(
            device,
            &render_pipeline_layout,
            &shader,
            texture_format,
        );

        Self {
            vertex_buffer: MeshSystem::create_vertex_buffer(device, quad_vertices.as_slice()),
            index_buffer: MeshSystem::create_index_buffer(device, quad_indices.as_slice()),
            num_indices: quad_indices.len() as u32,
            render_pipeline_component: RenderPipelineComponent {
                render_pipeline,
                render_pipeline_layout,
            },
            texture_bind_group_layout,
            sampler: MaterialSystem::create_label_sampler(device),
            label_height,
            labels: HashMap::new(),
            uploaded_revision: None,
        }
    }

    /// Drops labels of despawned markers and renders any new ones.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, world: &mut World) {
        let revision = SceneSystem::revision(world);
        if self.uploaded_revision == Some(revision) {
            return;
        }

        let current = SceneSystem::marker_labels(world);
        let alive: HashSet<Entity> = current.iter().map(|label| label.entity).collect();
        self.labels.retain(|entity, _| alive.contains(entity));

        for label in current {
            if !self.labels.contains_key(&label.entity) {
                let gpu = self.create_label(device, queue, &label);
                self.labels.insert(label.entity, gpu);
            }
        }
        tracing::debug!(revision, labels = self.labels.len(), "marker labels synced");
        self.uploaded_revision = Some(revision);
    }

    fn create_label(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &MarkerLabel,
    ) -> LabelGpu {
        let image = rasterize(&label_text(&label.text));
        let view = MaterialSystem::create_2d_texture(device, queue, &image, "Marker Label Texture");
        let bind_group = MaterialSystem::create_texture_bind_group(
            device,
            &self.texture_bind_group_layout,
            &view,
            &self.sampler,
        );
        let instance = label_instance(label.anchor, &image, self.label_height);
        LabelGpu {
            bind_group,
            instance_buffer: MeshSystem::create_instance_buffer(device, &[instance]),
        }
    }

    pub fn draw<'a>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'a>,
        camera_component: &'a CameraComponent,
        earth: &'a EarthComponent,
    ) {
        if self.labels.is_empty() {
            return;
        }
        render_pass.set_pipeline(&self.render_pipeline_component.render_pipeline);
        render_pass.set_bind_group(0, &camera_component.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &earth.mesh_component.model_matrix_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        for label in self.labels.values() {
            render_pass.set_bind_group(2, &label.bind_group, &[]);
            render_pass.set_vertex_buffer(1, label.instance_buffer.slice(..));
            render_pass.draw_indexed(0..self.num_indices, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_pixels(image: &RgbaImage) -> usize {
        image.pixels().filter(|pixel| **pixel == TEXT).count()
    }

    #[test]
    fn short_names_are_kept_whole() {
        assert_eq!(label_text("  Quito, Ecuador "), "Quito, Ecuador");
    }

    #[test]
    fn long_names_are_cut_with_an_ellipsis() {
        let text = label_text("Paris, Île-de-France, France métropolitaine, France");
        assert_eq!(text.chars().count(), LABEL_MAX_CHARS);
        assert!(text.starts_with("Paris, Île-de-France"));
        assert!(text.ends_with("..."));
    }

    #[test]
    fn image_is_one_glyph_cell_per_character_plus_padding() {
        let image = rasterize("Oslo");
        assert_eq!(image.width(), 4 * GLYPH_SIZE + 2 * PADDING);
        assert_eq!(image.height(), GLYPH_SIZE + 2 * PADDING);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert!(white_pixels(&image) > 0);
    }

    #[test]
    fn spaces_draw_nothing() {
        let image = rasterize("   ");
        assert_eq!(white_pixels(&image), 0);
        assert!(image.pixels().all(|pixel| pixel[3] == 0));
    }

    #[test]
    fn accented_letters_use_the_latin_glyphs() {
        assert_ne!(glyph('é'), glyph('?'));
        assert_ne!(glyph('é'), [0; 8]);
    }

    #[test]
    fn unknown_characters_fall_back_to_a_question_mark() {
        assert_eq!(rasterize("東"), rasterize("?"));
    }

    #[test]
    fn instance_keeps_the_image_aspect() {
        let image = rasterize("Lima");
        let instance = label_instance([0.0, 1.05, 0.0], &image, 0.04);
        assert_eq!(instance.anchor, [0.0, 1.05, 0.0]);
        assert!((instance.size[1] - 0.04).abs() < 1e-6);
        let aspect = image.width() as f32 / image.height() as f32;
        assert!((instance.size[0] / instance.size[1] - aspect).abs() < 1e-5);
    }
}
