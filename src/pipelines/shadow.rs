use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::Texture,
        transform::TransformRaw,
    },
    pipelines::basic::{COMMON_WGSL, mk_render_pipeline, shader_source},
};

/// Depth-only pass rendering shadow casters from the light's point of view.
pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    shadow_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[shadow_layout],
        immediate_size: 0,
    });
    let shader = shader_source("Shadow Shader", &[COMMON_WGSL, include_str!("shadow.wgsl")]);
    mk_render_pipeline(
        device,
        "Shadow Pipeline",
        &layout,
        None,
        None,
        Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            // Slope-scaled bias against acne on surfaces facing away from the light.
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        Some(wgpu::Face::Back),
        &[ModelVertex::desc(), TransformRaw::desc()],
        shader,
    )
}
