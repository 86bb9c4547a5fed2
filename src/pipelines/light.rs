use cgmath::SquareMatrix;

use crate::render::DrawList;

/// Light data as laid out in the shaders' `Light` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub view_proj: [[f32; 4]; 4],
    pub direction: [f32; 4],
    /// Colour premultiplied by intensity.
    pub color: [f32; 4],
    pub ambient: [f32; 4],
    /// map size, bias, enabled, unused
    pub shadow: [f32; 4],
}

impl LightUniform {
    pub fn from_draw_list(list: &DrawList) -> Self {
        let ambient = [list.ambient[0], list.ambient[1], list.ambient[2], 1.0];
        match &list.directional {
            Some(draw) => {
                let light = &draw.light;
                let direction = draw.direction();
                Self {
                    view_proj: draw.shadow_view_proj().into(),
                    direction: [direction.x, direction.y, direction.z, 0.0],
                    color: [
                        light.color[0] * light.intensity,
                        light.color[1] * light.intensity,
                        light.color[2] * light.intensity,
                        1.0,
                    ],
                    ambient,
                    shadow: [
                        light.shadow.map_size as f32,
                        light.shadow.bias,
                        if light.cast_shadow { 1.0 } else { 0.0 },
                        0.0,
                    ],
                }
            }
            None => Self {
                view_proj: cgmath::Matrix4::<f32>::identity().into(),
                direction: [0.0, -1.0, 0.0, 0.0],
                color: [0.0; 4],
                ambient,
                shadow: [1.0, 0.0, 0.0, 0.0],
            },
        }
    }
}

/// Light uniform, shadow map with its comparison sampler, environment cube with
/// its sampler. Group 1 of every lit pipeline.
pub fn mk_lighting_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
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
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("lighting_bind_group_layout"),
    })
}

/// The light uniform alone, group 0 of the shadow pass.
pub fn mk_shadow_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("shadow_bind_group_layout"),
    })
}
