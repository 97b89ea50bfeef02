//! The interactive viewer shell: window, GPU context, and render loop.
//!
//! Each frame the loop updates the fly camera, assembles the visible subset
//! of the open asset via [`crate::scene::assemble`], and submits the
//! resulting draw items to the GPU. Assembly is a pure function of the
//! immutable asset plus the camera, so the loop carries no derived render
//! state between frames; the only mutable state here is the camera and the
//! currently open file.
//!
//! # Controls
//!
//! - WASD / arrows + mouse: fly camera
//! - Page Down / Page Up: next / previous asset file
//! - R: reload the current file
//! - Escape: quit

use std::{cell::RefCell, collections::HashMap, path::PathBuf, sync::Arc};

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad};
use instant::Instant;
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    camera::{Camera, CameraController, CameraResources, CameraUniform, Frustum, Projection},
    data_structures::{bounds::Aabb, model::Vertex, texture::Texture},
    pipelines::basic::{diffuse_layout, mk_basic_pipeline},
    resources::{self, AssetKind, FsModelResolver, texture::ResourceSet},
    scene::{self, Asset, DrawItem},
};

/// Vertex data as it lives in the GPU vertex buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexRaw {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl VertexRaw {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<VertexRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// One draw item's world matrix, passed as a single-instance buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    model: [[f32; 4]; 4],
}

impl TransformRaw {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TransformRaw>() as wgpu::BufferAddress,
            // One matrix per draw item, stepped per instance.
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// GPU and window context owning device, queue, surface and camera GPU state.
pub struct GpuContext {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    depth_texture: Texture,
}

impl GpuContext {
    pub async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .unwrap();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = Camera::new((0.0, 50.0, 100.0), Deg(-90.0), Deg(-20.0));
        // Levels are large; keep the far plane generous.
        let projection =
            Projection::new(config.width, config.height, Deg(60.0), 1.0, 80000.0);
        let controller = CameraController::new(400.0, 0.4);

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Self {
            window,
            surface,
            device,
            queue,
            config,
            camera: CameraResources {
                camera,
                controller,
                uniform,
                buffer,
                bind_group,
                bind_group_layout,
            },
            projection,
            depth_texture,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(width, height);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
    }
}

struct ViewerState {
    ctx: GpuContext,
    pipeline: wgpu::RenderPipeline,
    asset: Option<Asset>,
    resources: ResourceSet,
    /// Uploaded textures keyed by the CPU image's address; draw items share
    /// images via `Arc`, so the address is a stable identity.
    bind_groups: RefCell<HashMap<usize, Arc<wgpu::BindGroup>>>,
}

/// The viewer application: navigates asset files under an install root and
/// renders the currently open one.
pub struct Viewer {
    root: PathBuf,
    files: Vec<PathBuf>,
    current: usize,
    state: Option<ViewerState>,
    last_time: Instant,
}

/// Scan `root` for asset files and run the viewer until the window closes.
pub fn run(root: PathBuf) -> anyhow::Result<()> {
    let files = resources::scan_assets(&root)?;
    if files.is_empty() {
        anyhow::bail!("no .mdl/.wmb/.wdl files found under {}", root.display());
    }
    log::info!("found {} asset file(s) under {}", files.len(), root.display());

    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer {
        root,
        files,
        current: 0,
        state: None,
        last_time: Instant::now(),
    };
    event_loop.run_app(&mut viewer)?;
    Ok(())
}

impl Viewer {
    fn load_current_file(&mut self) {
        let Some(state) = &mut self.state else {
            return;
        };
        let path = &self.files[self.current];
        log::info!(
            "loading {} ({}/{})",
            path.display(),
            self.current + 1,
            self.files.len()
        );

        state.resources = ResourceSet::new();
        state.bind_groups.borrow_mut().clear();

        // A decode failure never takes the viewer down; the asset is simply
        // absent and navigation keeps working.
        state.asset = match AssetKind::of(path) {
            Some(AssetKind::Model) => match resources::load_model(path) {
                Ok(model) => {
                    state.resources.load_materials(&self.root, &model.materials);
                    Some(Asset::Model(Arc::new(model)))
                }
                Err(err) => {
                    log::error!("failed to load {}: {}", path.display(), err);
                    None
                }
            },
            Some(AssetKind::Level) => {
                let resolver = FsModelResolver::new(&self.root);
                match resources::load_level(path, &resolver) {
                    Ok((level, _warnings)) => {
                        state.resources.load_materials(&self.root, &level.materials);
                        for placement in &level.placements {
                            if let Some(model) = &placement.model {
                                state.resources.load_materials(&self.root, &model.materials);
                            }
                        }
                        Some(Asset::Level(Arc::new(level)))
                    }
                    Err(err) => {
                        log::error!("failed to load {}: {}", path.display(), err);
                        None
                    }
                }
            }
            None => None,
        };

        if let Some(asset) = &state.asset {
            let title = format!("ackview - {}", asset.name());
            state.ctx.window.set_title(&title);
            frame_bounds(&mut state.ctx.camera.camera, &asset.bounds());
        }
    }
}

/// Put the camera somewhere sensible for the asset's size: behind and above
/// the bounds, looking at their center.
fn frame_bounds(camera: &mut Camera, bounds: &Aabb) {
    if bounds.is_empty() {
        return;
    }
    let center = bounds.center();
    let extent = (bounds.max - bounds.min).magnitude().max(1.0);
    camera.position = Point3::new(center.x, center.y + extent * 0.3, center.z + extent);
    let dir = (center - camera.position.to_vec()).normalize();
    camera.yaw = Rad(dir.z.atan2(dir.x));
    camera.pitch = Rad(dir.y.asin());
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window_attributes = Window::default_attributes().with_title("ackview");
        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let ctx = futures::executor::block_on(GpuContext::new(window));
        let pipeline = mk_basic_pipeline(&ctx.device, &ctx.config, &ctx.camera.bind_group_layout);

        self.state = Some(ViewerState {
            ctx,
            pipeline,
            asset: None,
            resources: ResourceSet::new(),
            bind_groups: RefCell::new(HashMap::new()),
        });
        self.load_current_file();
        self.last_time = Instant::now();
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => match (key, key_state) {
                (KeyCode::Escape, ElementState::Pressed) => event_loop.exit(),
                (KeyCode::PageDown, ElementState::Pressed) => {
                    self.current = (self.current + 1) % self.files.len();
                    self.load_current_file();
                }
                (KeyCode::PageUp, ElementState::Pressed) => {
                    self.current = (self.current + self.files.len() - 1) % self.files.len();
                    self.load_current_file();
                }
                (KeyCode::KeyR, ElementState::Pressed) => self.load_current_file(),
                _ => {
                    if let Some(state) = &mut self.state {
                        state
                            .ctx
                            .camera
                            .controller
                            .process_keyboard(key, key_state);
                    }
                }
            },
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now - self.last_time;
                self.last_time = now;

                let Some(state) = &mut self.state else {
                    return;
                };
                let ctx = &mut state.ctx;
                ctx.camera
                    .controller
                    .update_camera(&mut ctx.camera.camera, dt);
                ctx.camera
                    .uniform
                    .update_view_proj(&ctx.camera.camera, &ctx.projection);
                ctx.queue.write_buffer(
                    &ctx.camera.buffer,
                    0,
                    bytemuck::cast_slice(&[ctx.camera.uniform]),
                );

                match render_frame(state) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.ctx.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("unable to render: {}", e),
                }

                state.ctx.window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if let Some(state) = &mut self.state {
                state
                    .ctx
                    .camera
                    .controller
                    .process_mouse(delta.0, delta.1);
            }
        }
    }
}

fn render_frame(state: &mut ViewerState) -> Result<(), wgpu::SurfaceError> {
    let frame = state.ctx.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let scene = state.asset.as_ref().map(|asset| {
        let view_proj = state.ctx.projection.calc_matrix() * state.ctx.camera.camera.calc_matrix();
        let frustum = Frustum::from_matrix(&view_proj);
        scene::assemble(
            asset,
            &state.resources,
            &frustum,
            Matrix4::from_scale(1.0),
            None,
        )
    });

    // Upload buffers for this frame's items before the render pass borrows
    // them.
    let mut draws = Vec::new();
    if let Some(scene) = &scene {
        for item in &scene.items {
            draws.push(upload_item(state, item));
        }
    }

    let mut encoder = state
        .ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.05,
                        g: 0.06,
                        b: 0.08,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &state.ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        pass.set_pipeline(&state.pipeline);
        pass.set_bind_group(1, &state.ctx.camera.bind_group, &[]);
        for draw in &draws {
            pass.set_bind_group(0, draw.bind_group.as_ref(), &[]);
            pass.set_vertex_buffer(0, draw.vertices.slice(..));
            pass.set_vertex_buffer(1, draw.transform.slice(..));
            pass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }

    state.ctx.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

struct PreparedDraw {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    transform: wgpu::Buffer,
    index_count: u32,
    bind_group: Arc<wgpu::BindGroup>,
}

fn upload_item(state: &ViewerState, item: &DrawItem) -> PreparedDraw {
    let device = &state.ctx.device;

    let raw_vertices: Vec<VertexRaw> = match &item.positions {
        Some(positions) => item
            .mesh
            .vertices
            .iter()
            .zip(positions)
            .map(|(v, p)| vertex_raw(v, *p))
            .collect(),
        None => item
            .mesh
            .vertices
            .iter()
            .map(|v| vertex_raw(v, v.position))
            .collect(),
    };

    let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Vertex Buffer", item.mesh.name)),
        contents: bytemuck::cast_slice(&raw_vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Index Buffer", item.mesh.name)),
        contents: bytemuck::cast_slice(&item.mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let transform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Transform Buffer"),
        contents: bytemuck::cast_slice(&[TransformRaw {
            model: item.transform.into(),
        }]),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let bind_group = texture_bind_group(state, &item.texture);

    PreparedDraw {
        vertices,
        indices,
        transform,
        index_count: item.mesh.indices.len() as u32,
        bind_group,
    }
}

fn vertex_raw(v: &Vertex, position: [f32; 3]) -> VertexRaw {
    VertexRaw {
        position,
        normal: v.normal,
        tex_coords: v.tex_coords,
    }
}

fn texture_bind_group(
    state: &ViewerState,
    image: &Arc<image::RgbaImage>,
) -> Arc<wgpu::BindGroup> {
    let key = Arc::as_ptr(image) as usize;
    if let Some(group) = state.bind_groups.borrow().get(&key) {
        return group.clone();
    }
    let texture = Texture::from_image(&state.ctx.device, &state.ctx.queue, image, "asset texture");
    let layout = diffuse_layout(&state.ctx.device);
    let group = Arc::new(
        state
            .ctx
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ],
                label: Some("diffuse_bind_group"),
            }),
    );
    state.bind_groups.borrow_mut().insert(key, group.clone());
    group
}
