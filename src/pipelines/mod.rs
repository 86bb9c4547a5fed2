//! Render pipelines and the WGSL they are built from.
//!
//! - `basic` holds the shared pipeline builder, the camera/material layouts and the
//!   standard mesh pipeline
//! - `light` holds the light uniform and the lighting/shadow layouts
//! - `shadow` is the depth-only shadow map pass
//! - `skybox` draws the environment cube behind everything
//! - `transparent` draws shadow catchers on top of the opaque meshes

pub mod basic;
pub mod light;
pub mod shadow;
pub mod skybox;
pub mod transparent;

/// Every pipeline the renderer uses, built once per surface format.
#[derive(Debug)]
pub struct Pipelines {
    pub standard: wgpu::RenderPipeline,
    pub standard_double_sided: wgpu::RenderPipeline,
    pub shadow_catcher: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
}

#[derive(Debug)]
pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub lighting: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub shadow: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            camera: basic::mk_camera_bind_group_layout(device),
            lighting: light::mk_lighting_bind_group_layout(device),
            material: basic::mk_material_bind_group_layout(device),
            shadow: light::mk_shadow_bind_group_layout(device),
        }
    }
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, layouts: &Layouts) -> Self {
        Self {
            standard: basic::mk_standard_pipeline(
                device,
                color_format,
                &layouts.camera,
                &layouts.lighting,
                &layouts.material,
                false,
            ),
            standard_double_sided: basic::mk_standard_pipeline(
                device,
                color_format,
                &layouts.camera,
                &layouts.lighting,
                &layouts.material,
                true,
            ),
            shadow_catcher: transparent::mk_shadow_catcher_pipeline(
                device,
                color_format,
                &layouts.camera,
                &layouts.lighting,
                &layouts.material,
            ),
            skybox: skybox::mk_skybox_pipeline(
                device,
                color_format,
                &layouts.camera,
                &layouts.lighting,
            ),
            shadow: shadow::mk_shadow_pipeline(device, &layouts.shadow),
        }
    }
}
