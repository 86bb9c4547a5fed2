use crate::pipelines::basic::{
    COMMON_WGSL, LIGHTING_WGSL, depth_state, mk_render_pipeline, shader_source,
};

/// Full-screen triangle at the far plane sampling the environment cube.
///
/// Drawn with three vertices and no vertex buffers.
pub fn mk_skybox_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
    lighting_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Skybox Pipeline Layout"),
        bind_group_layouts: &[camera_layout, lighting_layout],
        immediate_size: 0,
    });
    let shader = shader_source(
        "Skybox Shader",
        &[COMMON_WGSL, LIGHTING_WGSL, include_str!("skybox.wgsl")],
    );
    mk_render_pipeline(
        device,
        "Skybox Pipeline",
        &layout,
        Some(color_format),
        Some(wgpu::BlendState::REPLACE),
        Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
        None,
        &[],
        shader,
    )
}
