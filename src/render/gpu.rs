use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::assets::SceneAssets;
use crate::binding::MaterialKind;
use crate::material::{self, SceneMaterials};
use crate::mesh::{MeshData, VERTEX_STRIDE};
use crate::render::shaders;
use crate::scene::SceneNode;

/// egui output already tessellated by the caller, painted after the scene
/// pass in the same encoder.
pub struct EguiDraw {
    pub textures_delta: egui::TexturesDelta,
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub screen: egui_wgpu::ScreenDescriptor,
}

/// GPU renderer backed by wgpu that draws the bound portal scene.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,

    baked_pipeline: wgpu::RenderPipeline,
    flat_pipeline: wgpu::RenderPipeline,
    portal_pipeline: wgpu::RenderPipeline,
    fireflies_pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    baked_bind_group: wgpu::BindGroup,
    flat_bind_group: wgpu::BindGroup,
    portal_buffer: wgpu::Buffer,
    portal_bind_group: wgpu::BindGroup,
    fireflies_buffer: wgpu::Buffer,
    fireflies_bind_group: wgpu::BindGroup,

    draws: Vec<NodeDraw>,
    firefly_quad: wgpu::Buffer,
    firefly_instances: wgpu::Buffer,
    firefly_count: u32,

    clear_color: Vec3,
    egui_renderer: egui_wgpu::Renderer,
}

struct NodeDraw {
    material: MaterialKind,
    mesh: MeshBuffers,
    bind_group: wgpu::BindGroup,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window and scene.
    pub async fn new(window: Arc<Window>, assets: &SceneAssets) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("portal-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        // Layouts: globals, per-node transform, per-material data.
        let globals_layout = uniform_layout(&device, "globals-layout", wgpu::ShaderStages::VERTEX_FRAGMENT);
        let node_layout = uniform_layout(&device, "node-layout", wgpu::ShaderStages::VERTEX);
        let material_layout = uniform_layout(&device, "material-layout", wgpu::ShaderStages::FRAGMENT);
        let fireflies_layout = uniform_layout(&device, "fireflies-layout", wgpu::ShaderStages::VERTEX);

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("baked-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let scene_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("scene-pipeline-layout"),
                bind_group_layouts: &[&globals_layout, &node_layout, &material_layout],
                push_constant_ranges: &[],
            });
        let baked_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("baked-pipeline-layout"),
                bind_group_layouts: &[&globals_layout, &node_layout, &texture_layout],
                push_constant_ranges: &[],
            });
        let fireflies_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("fireflies-pipeline-layout"),
                bind_group_layouts: &[&globals_layout, &fireflies_layout],
                push_constant_ranges: &[],
            });

        let baked_pipeline = scene_pipeline(
            &device,
            "baked-pipeline",
            &baked_pipeline_layout,
            &shaders::scene_shader(shaders::BAKED_FS),
            surface_format,
        );
        let flat_pipeline = scene_pipeline(
            &device,
            "flat-pipeline",
            &scene_pipeline_layout,
            &shaders::scene_shader(shaders::FLAT_FS),
            surface_format,
        );
        let portal_pipeline = scene_pipeline(
            &device,
            "portal-pipeline",
            &scene_pipeline_layout,
            &shaders::scene_shader(shaders::PORTAL_FS),
            surface_format,
        );
        let fireflies_pipeline = fireflies_pipeline_for(
            &device,
            &fireflies_pipeline_layout,
            &shaders::fireflies_shader(),
            surface_format,
        );

        // Uniform buffers and their bind groups.
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals-uniform"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = uniform_bind_group(
            &device,
            "globals-bind-group",
            &globals_layout,
            &globals_buffer,
        );

        let flat_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flat-uniform"),
            contents: bytemuck::bytes_of(&FlatUniform {
                color: [1.0, 1.0, 1.0, 1.0],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let flat_bind_group =
            uniform_bind_group(&device, "flat-bind-group", &material_layout, &flat_buffer);

        let portal_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("portal-uniform"),
            size: std::mem::size_of::<PortalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let portal_bind_group = uniform_bind_group(
            &device,
            "portal-bind-group",
            &material_layout,
            &portal_buffer,
        );

        let fireflies_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fireflies-uniform"),
            size: std::mem::size_of::<FirefliesUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let fireflies_bind_group = uniform_bind_group(
            &device,
            "fireflies-bind-group",
            &fireflies_layout,
            &fireflies_buffer,
        );

        // Baked-lighting map, uploaded as sRGB so sampling is gamma-aware.
        let baked_bind_group = upload_baked_texture(
            &device,
            &queue,
            &texture_layout,
            &assets.baked_image,
        );

        let root = Mat4::from_rotation_y(assets.bound.root_rotation_y);
        let mut draws = Vec::with_capacity(assets.bound.nodes.len());
        for (bound, mesh) in assets.bound.nodes.iter().zip(assets.meshes.iter()) {
            let model = root * node_model_matrix(&bound.node);
            let node_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}-transform", bound.node.name)),
                contents: bytemuck::bytes_of(&NodeUniform {
                    model: model.to_cols_array_2d(),
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = uniform_bind_group(
                &device,
                &format!("{}-bind-group", bound.node.name),
                &node_layout,
                &node_buffer,
            );
            draws.push(NodeDraw {
                material: bound.material,
                mesh: MeshBuffers::from_mesh(&device, mesh, &bound.node.name),
                bind_group,
            });
        }

        let firefly_quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("firefly-quad"),
            contents: bytemuck::cast_slice(QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let mut instance_data = Vec::with_capacity(assets.fireflies.len() * 4);
        for (position, scale) in assets
            .fireflies
            .positions
            .chunks_exact(3)
            .zip(assets.fireflies.scales.iter())
        {
            instance_data.extend_from_slice(position);
            instance_data.push(*scale);
        }
        let firefly_instances = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("firefly-instances"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            baked_pipeline,
            flat_pipeline,
            portal_pipeline,
            fireflies_pipeline,
            globals_buffer,
            globals_bind_group,
            baked_bind_group,
            flat_bind_group,
            portal_buffer,
            portal_bind_group,
            fireflies_buffer,
            fireflies_bind_group,
            draws,
            firefly_quad,
            firefly_instances,
            firefly_count: assets.fireflies.len() as u32,
            clear_color: material::default_clear_color(),
            egui_renderer,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Sets the background clear color (an sRGB triple from the debug panel).
    pub fn set_clear_color(&mut self, srgb: Vec3) {
        self.clear_color = srgb;
    }

    /// Uploads this frame's uniforms and records one render pass drawing the
    /// whole scene, then the optional debug panel, then presents.
    pub fn render(
        &mut self,
        materials: &SceneMaterials,
        view_proj: Mat4,
        camera_pos: Vec3,
        egui_draw: Option<EguiDraw>,
    ) -> Result<(), wgpu::SurfaceError> {
        let fog_color = material::fog_color();
        let globals = Globals {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.extend(1.0).into(),
            fog_color: fog_color.extend(1.0).into(),
            fog_params: [material::FOG_NEAR, material::FOG_FAR, 0.0, 0.0],
            viewport: [
                self.config.width as f32,
                self.config.height as f32,
                0.0,
                0.0,
            ],
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let portal = PortalUniform {
            color_start: materials.portal.color_start.extend(1.0).into(),
            color_end: materials.portal.color_end.extend(1.0).into(),
            time: [materials.portal.time, 0.0, 0.0, 0.0],
        };
        self.queue
            .write_buffer(&self.portal_buffer, 0, bytemuck::bytes_of(&portal));

        let fireflies = FirefliesUniform {
            params: [
                materials.fireflies.time,
                materials.fireflies.pixel_ratio,
                materials.fireflies.point_size,
                0.0,
            ],
        };
        self.queue
            .write_buffer(&self.fireflies_buffer, 0, bytemuck::bytes_of(&fireflies));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("portal-encoder"),
            });

        {
            let clear = srgb_to_linear(self.clear_color);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.x as f64,
                            g: clear.y as f64,
                            b: clear.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.globals_bind_group, &[]);

            for (pipeline, material) in [
                (&self.baked_pipeline, MaterialKind::Baked),
                (&self.flat_pipeline, MaterialKind::PoleLight),
                (&self.portal_pipeline, MaterialKind::Portal),
            ] {
                pass.set_pipeline(pipeline);
                match material {
                    MaterialKind::Baked => pass.set_bind_group(2, &self.baked_bind_group, &[]),
                    MaterialKind::PoleLight => pass.set_bind_group(2, &self.flat_bind_group, &[]),
                    MaterialKind::Portal => pass.set_bind_group(2, &self.portal_bind_group, &[]),
                }
                for draw in self.draws.iter().filter(|d| d.material == material) {
                    pass.set_bind_group(1, &draw.bind_group, &[]);
                    pass.set_vertex_buffer(0, draw.mesh.vertex.slice(..));
                    pass.set_index_buffer(draw.mesh.index.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
                }
            }

            if self.firefly_count > 0 {
                pass.set_pipeline(&self.fireflies_pipeline);
                pass.set_bind_group(1, &self.fireflies_bind_group, &[]);
                pass.set_vertex_buffer(0, self.firefly_quad.slice(..));
                pass.set_vertex_buffer(1, self.firefly_instances.slice(..));
                pass.draw(0..6, 0..self.firefly_count);
            }
        }

        if let Some(egui_draw) = egui_draw {
            for (id, image_delta) in &egui_draw.textures_delta.set {
                self.egui_renderer
                    .update_texture(&self.device, &self.queue, *id, image_delta);
            }
            self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &egui_draw.paint_jobs,
                &egui_draw.screen,
            );
            {
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("panel-pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                self.egui_renderer
                    .render(&mut pass, &egui_draw.paint_jobs, &egui_draw.screen);
            }
            for id in &egui_draw.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn node_model_matrix(node: &SceneNode) -> Mat4 {
    let translation = Mat4::from_translation(node.position);
    let rotation = Mat4::from_rotation_z(node.rotation.z)
        * Mat4::from_rotation_y(node.rotation.y)
        * Mat4::from_rotation_x(node.rotation.x);
    let scale = Mat4::from_scale(node.scale);
    translation * rotation * scale
}

fn srgb_to_linear(srgb: Vec3) -> Vec3 {
    fn channel(c: f32) -> f32 {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    Vec3::new(channel(srgb.x), channel(srgb.y), channel(srgb.z))
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

fn scene_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader_source: &str,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![
                    0 => Float32x3,
                    1 => Float32x2,
                ],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn fireflies_pipeline_for(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_source: &str,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fireflies-shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("fireflies-pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: (2 * std::mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                },
                wgpu::VertexBufferLayout {
                    array_stride: (4 * std::mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        1 => Float32x3,
                        2 => Float32,
                    ],
                },
            ],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                // Additive glow; depth is tested but never written so the
                // particles never occlude each other.
                blend: Some(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn upload_baked_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    image: &image::RgbaImage,
) -> wgpu::BindGroup {
    let (width, height) = image.dimensions();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("baked-map"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("baked-sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("baked-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

const QUAD_CORNERS: &[f32] = &[
    -0.5, -0.5, 0.5, -0.5, 0.5, 0.5, // lower-right triangle
    -0.5, -0.5, 0.5, 0.5, -0.5, 0.5, // upper-left triangle
];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    fog_color: [f32; 4],
    fog_params: [f32; 4],
    viewport: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct NodeUniform {
    model: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FlatUniform {
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PortalUniform {
    color_start: [f32; 4],
    color_end: [f32; 4],
    time: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FirefliesUniform {
    params: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_conversion_endpoints() {
        assert_eq!(srgb_to_linear(Vec3::ZERO), Vec3::ZERO);
        let white = srgb_to_linear(Vec3::ONE);
        assert!((white - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn node_matrix_applies_translation() {
        let node = SceneNode {
            name: "n".into(),
            mesh: "m".into(),
            position: Vec3::new(1.0, 2.0, 3.0),
            ..SceneNode::default()
        };
        let model = node_model_matrix(&node);
        let origin = model.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn quad_covers_unit_billboard() {
        assert_eq!(QUAD_CORNERS.len(), 12);
        for corner in QUAD_CORNERS.chunks_exact(2) {
            assert!(corner[0].abs() <= 0.5 && corner[1].abs() <= 0.5);
        }
    }
}
