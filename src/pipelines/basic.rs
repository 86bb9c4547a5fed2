use std::borrow::Cow;

use crate::data_structures::{
    material::Material,
    model::{ModelVertex, Vertex},
    texture::Texture,
    transform::TransformRaw,
};

/// Material parameters as laid out in the shaders' `Material` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// metallic, roughness, env intensity, has env
    pub params: [f32; 4],
    /// receives shadow, opacity, unlit, unused
    pub flags: [f32; 4],
}

impl MaterialUniform {
    pub fn new(material: &Material, receive_shadow: bool) -> Self {
        let receive_shadow = if receive_shadow { 1.0 } else { 0.0 };
        match material {
            Material::Standard(m) => Self {
                base_color: m.base_color,
                params: [
                    m.metallic,
                    m.roughness,
                    m.env_map_intensity,
                    if m.env_map.is_some() { 1.0 } else { 0.0 },
                ],
                flags: [receive_shadow, 1.0, 0.0, 0.0],
            },
            Material::Shadow(m) => Self {
                base_color: [0.0, 0.0, 0.0, 1.0],
                params: [0.0; 4],
                flags: [receive_shadow, m.opacity, 0.0, 0.0],
            },
            Material::Other(m) => Self {
                base_color: m.color,
                params: [0.0; 4],
                flags: [0.0, 1.0, 1.0, 0.0],
            },
        }
    }
}

/// Shader source assembled from the shared WGSL snippets and one entry file.
pub(crate) fn shader_source(label: &'static str, parts: &[&str]) -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(parts.join("\n"))),
    }
}

pub(crate) const COMMON_WGSL: &str = include_str!("common.wgsl");
pub(crate) const LIGHTING_WGSL: &str = include_str!("lighting.wgsl");

pub fn mk_camera_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
    })
}

pub fn mk_material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// Lit (or unlit) meshes. Double-sided materials get a pipeline without culling.
pub fn mk_standard_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
    lighting_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    double_sided: bool,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Standard Pipeline Layout"),
        bind_group_layouts: &[camera_layout, lighting_layout, material_layout],
        immediate_size: 0,
    });
    let shader = shader_source(
        "Standard Shader",
        &[COMMON_WGSL, LIGHTING_WGSL, include_str!("standard.wgsl")],
    );
    mk_render_pipeline(
        device,
        "Standard Pipeline",
        &layout,
        Some(color_format),
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(depth_state(true, wgpu::CompareFunction::Less)),
        if double_sided {
            None
        } else {
            Some(wgpu::Face::Back)
        },
        &[ModelVertex::desc(), TransformRaw::desc()],
        shader,
    )
}

pub fn depth_state(write: bool, compare: wgpu::CompareFunction) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: Texture::DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Builds a pipeline with the `vs_main`/`fs_main` entry points of `shader`.
///
/// Without a `color_format` the pipeline is depth-only and has no fragment stage.
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: Option<wgpu::TextureFormat>,
    blend: Option<wgpu::BlendState>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    cull_mode: Option<wgpu::Face>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);
    let targets = [color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: color_format.map(|_| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
