use scene::LightRig;

/// Everything the renderer needs for one frame, camera and model already
/// folded into matrices. Light positions/directions are view-space.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub draw_model: bool,
    pub lights: LightRig,
    pub metallic: f32,
    pub roughness: f32,
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use ::wgpu::util::DeviceExt;
    use std::borrow::Cow;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use super::FrameParams;
    use formats::MeshData;

    #[derive(Debug)]
    pub struct GpuContext {
        pub _instance: &'static ::wgpu::Instance,
        pub surface: ::wgpu::Surface<'static>,
        pub device: ::wgpu::Device,
        pub queue: ::wgpu::Queue,
        pub config: ::wgpu::SurfaceConfiguration,
        pub canvas: web_sys::HtmlCanvasElement,
        pub pipeline: ::wgpu::RenderPipeline,
        pub uniform_buffer: ::wgpu::Buffer,
        pub uniform_bind_group: ::wgpu::BindGroup,
        pub depth_view: ::wgpu::TextureView,
        pub vertex_buffer: ::wgpu::Buffer,
        pub index_buffer: ::wgpu::Buffer,
        pub index_count: u32,
    }

    const SHOWCASE_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    model: mat4x4<f32>,
    ambient: vec4<f32>,
    key_light: vec4<f32>,
    fill_light: vec4<f32>,
    point_light: vec4<f32>,
    material: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) normal_view: vec3<f32>,
    @location(1) pos_view: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
) -> VsOut {
    let world = globals.model * vec4<f32>(position, 1.0);
    let mv = globals.view * globals.model;
    return VsOut(
        globals.view_proj * world,
        normalize((mv * vec4<f32>(normal, 0.0)).xyz),
        (globals.view * world).xyz,
        color,
    );
}

@fragment
fn fs_main(fs_in: VsOut) -> @location(0) vec4<f32> {
    let n = normalize(fs_in.normal_view);
    let v = normalize(-fs_in.pos_view);
    let metallic = globals.material.x;
    let roughness = globals.material.y;
    let shininess = mix(128.0, 8.0, roughness);

    // Lights live in view space, so the rig follows the camera for free.
    let kd = normalize(globals.key_light.xyz);
    let fd = normalize(globals.fill_light.xyz);
    let pd_vec = globals.point_light.xyz - fs_in.pos_view;
    let pd = normalize(pd_vec);

    var diffuse = max(dot(n, kd), 0.0) * globals.key_light.w;
    diffuse = diffuse + max(dot(n, fd), 0.0) * globals.fill_light.w;
    diffuse = diffuse + max(dot(n, pd), 0.0) * globals.point_light.w;

    var specular = pow(max(dot(n, normalize(kd + v)), 0.0), shininess) * globals.key_light.w;
    specular = specular + pow(max(dot(n, normalize(fd + v)), 0.0), shininess) * globals.fill_light.w;
    specular = specular + pow(max(dot(n, normalize(pd + v)), 0.0), shininess) * globals.point_light.w;
    specular = specular * mix(0.04, 0.9, metallic);

    let ambient = globals.ambient.rgb * globals.ambient.a;
    let rgb = fs_in.color.rgb * (ambient + diffuse * (1.0 - 0.5 * metallic)) + vec3<f32>(specular);
    return vec4<f32>(rgb, fs_in.color.a);
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        position: [f32; 3],
        normal: [f32; 3],
        color: [f32; 4],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Globals {
        view_proj: [[f32; 4]; 4],
        view: [[f32; 4]; 4],
        model: [[f32; 4]; 4],
        ambient: [f32; 4],
        key_light: [f32; 4],
        fill_light: [f32; 4],
        point_light: [f32; 4],
        material: [f32; 4],
    }

    fn globals_for(frame: &FrameParams) -> Globals {
        let rig = frame.lights;
        let key = rig.key.direction();
        let fill = rig.fill.direction();
        Globals {
            view_proj: frame.view_proj,
            view: frame.view,
            model: frame.model,
            ambient: [
                rig.ambient.color[0],
                rig.ambient.color[1],
                rig.ambient.color[2],
                rig.ambient.intensity,
            ],
            key_light: [key[0], key[1], key[2], rig.key.intensity],
            fill_light: [fill[0], fill[1], fill[2], rig.fill.intensity],
            point_light: [
                rig.point.position[0],
                rig.point.position[1],
                rig.point.position[2],
                rig.point.intensity,
            ],
            material: [frame.metallic, frame.roughness, 0.0, 0.0],
        }
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("showcase-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    /// Build a GPU context against a canvas created inside `container`.
    ///
    /// There is intentionally no teardown path: initializing a second context
    /// without dropping the page first leaks the previous surface.
    pub async fn init_gpu(container: &web_sys::Element) -> Result<GpuContext, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document missing"))?;

        let canvas = document
            .create_element("canvas")?
            .dyn_into::<web_sys::HtmlCanvasElement>()?;
        let width = container.client_width().max(1) as u32;
        let height = container.client_height().max(1) as u32;
        canvas.set_width(width);
        canvas.set_height(height);
        container.append_child(&canvas)?;

        // IMPORTANT: `wgpu::Surface` must not outlive its `wgpu::Instance`.
        // To avoid UB, we leak the instance for the lifetime of the page.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&format!("surface error: {e}")))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("adapter error: {e}")))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("showcase-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("device error: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .cloned()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("showcase-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHOWCASE_SHADER)),
        });

        let uniform_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("showcase-globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                label: Some("showcase-globals-bgl"),
                entries: &[::wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: ::wgpu::BindingType::Buffer {
                        ty: ::wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("showcase-globals-bg"),
            layout: &uniform_bind_group_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("showcase-pipeline-layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("showcase-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: ::wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
                    step_mode: ::wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 12,
                            shader_location: 1,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x4,
                            offset: 24,
                            shader_location: 2,
                        },
                    ],
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(::wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                // No culling: assets with opposite winding would disappear
                // entirely, and phone shells are cheap to overdraw.
                cull_mode: None,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: ::wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: true,
                depth_compare: ::wgpu::CompareFunction::Less,
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        // Dummy geometry so the first frame has valid bindings before any
        // model arrives.
        let vertex_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("showcase-vertices"),
            contents: bytemuck::bytes_of(&Vertex {
                position: [0.0; 3],
                normal: [0.0, 0.0, 1.0],
                color: [0.0; 4],
            }),
            usage: ::wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("showcase-indices"),
            contents: bytemuck::cast_slice(&[0u32, 0, 0]),
            usage: ::wgpu::BufferUsages::INDEX,
        });

        let globals = Globals {
            view_proj: [[0.0; 4]; 4],
            view: [[0.0; 4]; 4],
            model: [[0.0; 4]; 4],
            ambient: [1.0, 1.0, 1.0, 0.8],
            key_light: [0.0, 0.7, 0.7, 1.2],
            fill_light: [-0.7, 0.35, -0.7, 0.8],
            point_light: [0.0, 0.0, 10.0, 0.7],
            material: [0.5, 0.2, 0.0, 0.0],
        };
        queue.write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&globals));

        Ok(GpuContext {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            canvas,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            vertex_buffer,
            index_buffer,
            index_count: 0,
        })
    }

    /// Install a mesh as the single resident model, dropping the previous
    /// buffers.
    pub fn set_model_mesh(ctx: &mut GpuContext, mesh: &MeshData) {
        if mesh.is_empty() {
            ctx.index_count = 0;
            return;
        }

        let vertices: Vec<Vertex> = mesh
            .vertices
            .iter()
            .map(|v| Vertex {
                position: v.position,
                normal: v.normal,
                color: v.color,
            })
            .collect();

        ctx.vertex_buffer = ctx
            .device
            .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("showcase-vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: ::wgpu::BufferUsages::VERTEX,
            });
        ctx.index_buffer = ctx
            .device
            .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("showcase-indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: ::wgpu::BufferUsages::INDEX,
            });
        ctx.index_count = mesh.indices.len() as u32;
    }

    pub fn clear_model(ctx: &mut GpuContext) {
        ctx.index_count = 0;
    }

    pub fn resize_gpu(ctx: &mut GpuContext, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        ctx.canvas.set_width(width);
        ctx.canvas.set_height(height);
        ctx.config.width = width;
        ctx.config.height = height;
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.depth_view = create_depth_view(&ctx.device, &ctx.config);
    }

    pub fn gpu_aspect(ctx: &GpuContext) -> f64 {
        ctx.config.width.max(1) as f64 / ctx.config.height.max(1) as f64
    }

    pub fn gpu_canvas(ctx: &GpuContext) -> Option<web_sys::HtmlCanvasElement> {
        Some(ctx.canvas.clone())
    }

    pub fn render_frame(ctx: &GpuContext, frame: &FrameParams) -> Result<(), JsValue> {
        let surface_tex = ctx
            .surface
            .get_current_texture()
            .map_err(|e| JsValue::from_str(&format!("surface acquire failed: {e}")))?;
        let view = surface_tex
            .texture
            .create_view(&::wgpu::TextureViewDescriptor::default());

        ctx.queue.write_buffer(
            &ctx.uniform_buffer,
            0,
            bytemuck::bytes_of(&globals_for(frame)),
        );

        let mut encoder = ctx
            .device
            .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                label: Some("showcase-encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("showcase-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        // Gallery backdrop (#f8f9fa).
                        load: ::wgpu::LoadOp::Clear(::wgpu::Color {
                            r: 0.94,
                            g: 0.945,
                            b: 0.955,
                            a: 1.0,
                        }),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_view,
                    depth_ops: Some(::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(1.0),
                        store: ::wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            if frame.draw_model && ctx.index_count > 0 {
                rpass.set_pipeline(&ctx.pipeline);
                rpass.set_bind_group(0, &ctx.uniform_bind_group, &[]);
                rpass.set_vertex_buffer(0, ctx.vertex_buffer.slice(..));
                rpass.set_index_buffer(ctx.index_buffer.slice(..), ::wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..ctx.index_count, 0, 0..1);
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        surface_tex.present();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use wasm_bindgen::prelude::JsValue;

    use super::FrameParams;
    use formats::MeshData;

    #[derive(Debug, Default)]
    pub struct GpuContext;

    pub async fn init_gpu(_container: &web_sys::Element) -> Result<GpuContext, JsValue> {
        Err(JsValue::from_str(
            "gpu initialization is only available on wasm32 targets",
        ))
    }

    pub fn set_model_mesh(_ctx: &mut GpuContext, _mesh: &MeshData) {}

    pub fn clear_model(_ctx: &mut GpuContext) {}

    pub fn resize_gpu(_ctx: &mut GpuContext, _width: u32, _height: u32) {}

    pub fn gpu_aspect(_ctx: &GpuContext) -> f64 {
        1.0
    }

    pub fn gpu_canvas(_ctx: &GpuContext) -> Option<web_sys::HtmlCanvasElement> {
        None
    }

    pub fn render_frame(_ctx: &GpuContext, _frame: &FrameParams) -> Result<(), JsValue> {
        Err(JsValue::from_str(
            "gpu rendering is only available on wasm32 targets",
        ))
    }
}

pub use imp::{
    GpuContext, clear_model, gpu_aspect, gpu_canvas, init_gpu, render_frame, resize_gpu,
    set_model_mesh,
};
