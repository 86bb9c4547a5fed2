use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        transform::TransformRaw,
    },
    pipelines::basic::{
        COMMON_WGSL, LIGHTING_WGSL, depth_state, mk_render_pipeline, shader_source,
    },
};

/**
 * Pipeline for shadow catchers: surfaces that are invisible except for the
 * shadows falling on them.
 *
 * Blended over whatever is already in the frame and depth-tested without
 * writing depth, so it has to run after the opaque meshes.
 */
pub fn mk_shadow_catcher_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
    lighting_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Catcher Pipeline Layout"),
        bind_group_layouts: &[camera_layout, lighting_layout, material_layout],
        immediate_size: 0,
    });
    let shader = shader_source(
        "Shadow Catcher Shader",
        &[COMMON_WGSL, LIGHTING_WGSL, include_str!("shadow_catcher.wgsl")],
    );
    mk_render_pipeline(
        device,
        "Shadow Catcher Pipeline",
        &layout,
        Some(color_format),
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
        None,
        &[ModelVertex::desc(), TransformRaw::desc()],
        shader,
    )
}
