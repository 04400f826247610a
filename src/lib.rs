pub mod components;
pub mod config;
pub mod error;
pub mod systems;

use anyhow::Context;
use bevy_ecs::world::World;
use components::{
    camera::CameraComponent,
    earth::{EarthComponent, EarthRotation},
};
use config::{GlobeConfig, GlobeStyleConfig};
use error::GlobeResult;
use systems::{
    camera::CameraSystem,
    dispatch::{Dispatcher, TaskResult, TextureKind},
    dots::DotSystem,
    earth::{EarthSystem, EARTH_RADIUS},
    geospatial::coordinates::CartesianPoint,
    labels::LabelSystem,
    markers::MarkerSystem,
    material::MaterialSystem,
    pipelines::create_depth_view,
    scene::{MarkerStyle, SceneSystem},
    window::WindowSystem,
};
use wgpu::Surface;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// this belongs somewhere else like serialization util or something
fn matrix4_to_array(mat: cgmath::Matrix4<f32>) -> [[f32; 4]; 4] {
    let m: [[f32; 4]; 4] = mat.into();
    [
        [m[0][0], m[0][1], m[0][2], m[0][3]],
        [m[1][0], m[1][1], m[1][2], m[1][3]],
        [m[2][0], m[2][1], m[2][2], m[2][3]],
        [m[3][0], m[3][1], m[3][2], m[3][3]],
    ]
}

struct State {
    // renderer
    size: winit::dpi::PhysicalSize<u32>,
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,

    // scene
    world: World,
    camera_component: CameraComponent,
    earth: EarthComponent,
    dots: DotSystem,
    labels: LabelSystem,
    style: GlobeStyleConfig,
    marker_style: MarkerStyle,

    // network
    dispatcher: Dispatcher,
    marker_system: MarkerSystem,

    // pointer
    cursor: (f32, f32),
    left_pressed_at: Option<(f32, f32)>,
    right_pressed_at: Option<(f32, f32)>,
}

impl State {
    async fn new(window: &Window, globe_config: GlobeConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // Backends::all => Vulkan + Metal + DX12 + Browser WebGPU
        let instance = State::create_instance();

        // # Safety
        // The surface needs to live as long as the window that created it.
        // `run_with_config` keeps the window alive for as long as the state.
        let surface = unsafe { instance.create_surface(window) }
            .context("failed to create a drawing surface for the window")?;
        let adapter = State::create_adapter(&instance, &surface)
            .await
            .context("no GPU adapter can present to this window")?;
        let (device, queue) = State::create_device_and_queue(&adapter)
            .await
            .context("failed to open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an sRGB surface texture. Using a different
        // one will result all the colors coming out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let camera_component =
            CameraSystem::create_camera(&device, &globe_config.camera, config.width, config.height);
        let earth = EarthSystem::new(
            &device,
            &queue,
            config.format,
            &camera_component,
            globe_config.globe.segments,
        );
        let dots = DotSystem::new(&device, config.format, &camera_component, &earth);
        let labels = LabelSystem::new(
            &device,
            config.format,
            &camera_component,
            &earth,
            globe_config.globe.label_height,
        );

        let world = SceneSystem::new_world(globe_config.globe.rotation_speed);
        let marker_system = MarkerSystem::new(&globe_config.globe);
        let dispatcher = Dispatcher::new(&globe_config.endpoints)
            .context("failed to set up the HTTP client")?;
        for command in MarkerSystem::startup_commands() {
            dispatcher.dispatch(command);
        }

        tracing::info!(
            api = %globe_config.endpoints.api_base_url,
            width = config.width,
            height = config.height,
            "globe ready"
        );

        Ok(Self {
            size,
            surface,
            device,
            queue,
            config,
            depth_view,
            world,
            camera_component,
            earth,
            dots,
            labels,
            style: globe_config.globe,
            marker_style: MarkerStyle::Dot,
            dispatcher,
            marker_system,
            cursor: (0.0, 0.0),
            left_pressed_at: None,
            right_pressed_at: None,
        })
    }

    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
        })
    }

    pub async fn create_adapter(
        instance: &wgpu::Instance,
        surface: &Surface,
    ) -> Option<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
    }

    pub async fn create_device_and_queue(
        adapter: &wgpu::Adapter,
    ) -> Result<(wgpu::Device, wgpu::Queue), wgpu::RequestDeviceError> {
        adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    // WebGL doesn't support all of wgpu's features, so
                    // stay inside what WebGL2 allows everywhere.
                    limits: wgpu::Limits::downlevel_webgl2_defaults(),
                    label: None,
                },
                None, // Trace path
            )
            .await
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
            CameraSystem::resize(&mut self.camera_component, new_size.width, new_size.height);
        }
    }

    fn pick(&self, at: (f32, f32)) -> Option<CartesianPoint> {
        WindowSystem::pick_globe(
            self.size.width as f32,
            self.size.height as f32,
            at.0,
            at.1,
            EARTH_RADIUS as f32,
            &self.camera_component.camera,
        )
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                self.mouse_button(*button, *state);
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => match keycode {
                VirtualKeyCode::Tab => {
                    if let Some(direction) = self.marker_system.focus_next(&mut self.world) {
                        self.camera_component
                            .camera_controller
                            .face(cgmath::Vector3::from(direction.to_array()));
                    }
                    return true;
                }
                VirtualKeyCode::H => {
                    self.marker_style = self.marker_style.toggled();
                    tracing::info!(style = ?self.marker_style, "marker style switched");
                    return true;
                }
                _ => {}
            },
            _ => {}
        }

        self.camera_component
            .camera_controller
            .process_events(event)
    }

    // a press and release close together is a click, anything else a drag
    fn mouse_button(&mut self, button: MouseButton, state: ElementState) {
        let slot = match button {
            MouseButton::Left => &mut self.left_pressed_at,
            MouseButton::Right => &mut self.right_pressed_at,
            _ => return,
        };
        if state == ElementState::Pressed {
            *slot = Some(self.cursor);
            return;
        }
        let Some(pressed_at) = slot.take() else {
            return;
        };
        if !WindowSystem::is_click(pressed_at, self.cursor) {
            return;
        }
        let Some(hit) = self.pick(self.cursor) else {
            tracing::debug!("click missed the globe");
            return;
        };

        let command = match button {
            MouseButton::Left => Some(self.marker_system.on_globe_click(&self.world, hit)),
            _ => self.marker_system.on_delete_click(&mut self.world, hit),
        };
        if let Some(command) = command {
            self.dispatcher.dispatch(command);
        }
    }

    fn apply_texture(&mut self, kind: TextureKind, bytes: GlobeResult<Vec<u8>>) {
        match bytes.and_then(|bytes| MaterialSystem::decode_rgba(&bytes)) {
            Ok(image) => {
                tracing::info!(?kind, width = image.width(), height = image.height(), "texture loaded");
                EarthSystem::set_texture(&self.device, &self.queue, &mut self.earth, kind, &image);
            }
            Err(error) => {
                tracing::warn!(?kind, %error, "texture unavailable, keeping placeholder");
            }
        }
    }

    fn update(&mut self) {
        self.world.resource_mut::<EarthRotation>().advance();
        let rotation = *self.world.resource::<EarthRotation>();
        EarthSystem::update_rotation(&self.queue, &mut self.earth, &rotation);

        for result in self.dispatcher.drain() {
            match result {
                TaskResult::TextureLoaded { kind, bytes } => self.apply_texture(kind, bytes),
                result => {
                    for command in self.marker_system.apply(&mut self.world, result) {
                        self.dispatcher.dispatch(command);
                    }
                }
            }
        }

        self.dots.sync(
            &self.device,
            &mut self.world,
            self.marker_style,
            self.style.marker_size,
            self.style.border_dot_size,
        );
        self.labels.sync(&self.device, &self.queue, &mut self.world);
        CameraSystem::update(&self.queue, &mut self.camera_component);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // get the surface to provide a new SurfaceTexture that we will render to.
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // The encoder builds a command buffer that we can then send to the gpu.
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.0,
                        g: 0.0,
                        b: 0.0,
                        a: 1.0,
                    }),
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });

        // opaque earth first, dots blend on top of it
        EarthSystem::draw(&mut render_pass, &self.earth, &self.camera_component);
        self.dots
            .draw(&mut render_pass, &self.camera_component, &self.earth);
        self.labels
            .draw(&mut render_pass, &self.camera_component, &self.earth);

        drop(render_pass);

        // submit will accept anything that implements IntoIter
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

pub fn init_tracing() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            tracing_wasm::set_as_global_default();
        } else {
            tracing_subscriber::fmt()
                .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
                .with_max_level(tracing::Level::INFO)
                .init();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn run() {
    init_tracing();
    if let Err(error) = run_with_config(GlobeConfig::default()).await {
        tracing::error!("{error:#}");
    }
}

/// Opens the window and drives the globe until it is closed.
pub async fn run_with_config(globe_config: GlobeConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("markerglobe")
        .build(&event_loop)
        .context("failed to open a window")?;

    #[cfg(target_arch = "wasm32")]
    {
        // Winit prevents sizing with CSS, so we have to
        // set the size manually when on web.
        use winit::dpi::PhysicalSize;
        window.set_inner_size(PhysicalSize::new(1080, 1080));

        use winit::platform::web::WindowExtWebSys;
        web_sys::window()
            .and_then(|win| win.document())
            .and_then(|doc| {
                let dst = doc.get_element_by_id("globe")?;
                let canvas = web_sys::Element::from(window.canvas());

                dst.append_child(&canvas).ok()?;
                Some(())
            })
            .context("couldn't append canvas to the #globe element")?;
    }

    let mut state = State::new(&window, globe_config).await?;

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == window.id() => {
            if !state.input(event) {
                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(VirtualKeyCode::Escape),
                                ..
                            },
                        ..
                    } => *control_flow = ControlFlow::Exit,
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        // new_inner_size is &&mut so we have to dereference it twice
                        state.resize(**new_inner_size);
                    }
                    _ => {}
                }
            }
        }
        Event::RedrawRequested(window_id) if window_id == window.id() => {
            state.update();
            match state.render() {
                Ok(_) => {}
                // Reconfigure the surface if lost
                Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    tracing::error!("GPU out of memory, closing");
                    *control_flow = ControlFlow::Exit
                }
                // All other errors (Outdated, Timeout) should be resolved by the next frame
                Err(e) => tracing::warn!("{:?}", e),
            }
        }
        Event::MainEventsCleared => {
            // RedrawRequested will only trigger once, unless we manually
            // request it.
            window.request_redraw();
        }

        _ => {}
    });
}
