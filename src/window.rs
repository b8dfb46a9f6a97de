use std::sync::Arc;

use organism::config::OrganismConfig;
use organism::draw::DrawList;
use organism::error::{OrganismError, ViewerError};
use organism::memory::MemoryGraph;
use organism::organism::{Activation, Organism};
use organism::time::Time;
use organism::visuals::Rgb;
use tracing::{error, info, warn};
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, ModifiersState, NamedKey},
    window::{Window, WindowId},
};

use crate::shader::{build_instances, Instance, Uniforms, SHADER_SOURCE};

const INITIAL_INSTANCES: usize = 4096;

/// Samples rendered per frame while audio is enabled. There is no output
/// device; the buffer keeps voices and the sample clock advancing.
const AUDIO_BLOCK: usize = 735;

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    render_pipeline: wgpu::RenderPipeline,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instances: Vec<Instance>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl GpuState {
    pub async fn new(window: Arc<Window>) -> Result<Self, ViewerError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Organism Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let instance_buffer = create_instance_buffer(&device, INITIAL_INSTANCES);

        let uniforms = Uniforms {
            viewport: [config.width as f32, config.height as f32],
            time: 0.0,
            _padding: 0.0,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
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
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Primitive Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x2,
                        1 => Float32x2,
                        2 => Float32x4,
                        3 => Float32,
                        4 => Float32,
                        5 => Uint32,
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        info!(format = ?surface_format, "gpu ready");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            render_pipeline,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCES,
            instances: Vec::with_capacity(INITIAL_INSTANCES),
            uniform_buffer,
            uniform_bind_group,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn render(&mut self, canvas: &DrawList, time: f32) -> Result<(), wgpu::SurfaceError> {
        let clear = build_instances(canvas.commands(), &mut self.instances)
            .unwrap_or(Rgb::from_u8(0, 0, 0));

        if self.instances.len() > self.instance_capacity {
            self.instance_capacity = self.instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(&self.device, self.instance_capacity);
        }
        if !self.instances.is_empty() {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&self.instances),
            );
        }

        let uniforms = Uniforms {
            viewport: [self.config.width as f32, self.config.height as f32],
            time,
            _padding: 0.0,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r as f64,
                            g: clear.g as f64,
                            b: clear.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
            render_pass.draw(0..6, 0..self.instances.len() as u32);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<Instance>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    organism: Organism,
    canvas: DrawList,
    time: Time,
    modifiers: ModifiersState,
    audio_block: Vec<f32>,
    error: Option<ViewerError>,
}

impl App {
    pub fn new(graph: MemoryGraph, config: OrganismConfig) -> Result<Self, OrganismError> {
        let mut organism = Organism::new(graph, config, 1280.0, 720.0)?;
        organism.on_intro_complete(|| info!("intro complete"));
        organism.on_discovery_change(|count| {
            info!(discovered = count.discovered, total = count.total, "discovery")
        });
        organism.on_constellation_complete(|| info!("constellation complete, press T for the tour"));
        organism.on_revisit(|node| info!(node = %node.label, "revisit"));

        Ok(Self {
            window: None,
            gpu_state: None,
            organism,
            canvas: DrawList::new(1280.0, 720.0),
            time: Time::new(),
            modifiers: ModifiersState::empty(),
            audio_block: vec![0.0; AUDIO_BLOCK],
            error: None,
        })
    }

    /// Error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<ViewerError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ViewerError) {
        error!(%err, "viewer failed");
        self.error = Some(err);
        self.organism.destroy();
        event_loop.exit();
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ViewerError> {
        let window_attrs = Window::default_attributes()
            .with_title("organism")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = window.inner_size();
        self.window = Some(window.clone());
        self.gpu_state = Some(pollster::block_on(GpuState::new(window))?);

        self.organism.resize(size.width as f32, size.height as f32);
        self.canvas.resize(size.width as f32, size.height as f32);
        self.organism.start();
        Ok(())
    }

    fn handle_key(&mut self, key: &Key) {
        match key {
            Key::Named(NamedKey::Tab) => {
                if self.modifiers.shift_key() {
                    self.organism.focus_previous();
                } else {
                    self.organism.focus_next();
                }
            }
            Key::Named(NamedKey::Enter) => match self.organism.activate() {
                Activation::OpenLink(url) => info!(%url, "open link"),
                Activation::Discovered | Activation::None => {}
            },
            Key::Named(NamedKey::Space) => {
                if self.organism.is_running() {
                    self.organism.stop();
                } else {
                    self.organism.start();
                }
            }
            Key::Character(c) if c.as_str().eq_ignore_ascii_case("a") => {
                let on = self.organism.toggle_audio();
                info!(enabled = on, "audio");
            }
            Key::Character(c) if c.as_str().eq_ignore_ascii_case("t") => {
                if self.organism.is_touring() {
                    self.organism.stop_tour();
                } else if !self.organism.start_tour() {
                    warn!("tour unlocks once every memory is discovered");
                }
            }
            _ => {}
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        self.time.update();
        // Raw duration: the organism caps it after sampling frame cost.
        self.organism.update(self.time.frame_ms() / 1000.0);
        if self.organism.audio().is_audible() {
            self.organism.render_audio(&mut self.audio_block);
        }
        self.organism.draw(&mut self.canvas);

        if let Some(gpu_state) = &mut self.gpu_state {
            match gpu_state.render(&self.canvas, self.time.elapsed()) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost) => gpu_state.resize(winit::dpi::PhysicalSize {
                    width: gpu_state.config.width,
                    height: gpu_state.config.height,
                }),
                Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                Err(e) => warn!(error = ?e, "render error"),
            }
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.open_window(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.organism.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.organism.destroy();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
                let (w, h) = (physical_size.width as f32, physical_size.height as f32);
                self.organism.resize(w, h);
                self.canvas.resize(w, h);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    self.handle_key(&event.logical_key);
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }
}
