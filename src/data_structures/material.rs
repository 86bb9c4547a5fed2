//! Surface materials.
//!
//! Every mesh carries exactly one [`Material`]. The variant is the capability tag the
//! renderer and the material post-processor dispatch on: only [`Material::Standard`]
//! surfaces take part in environment reflections.

use std::sync::Arc;

use crate::data_structures::cube_map::CubeMap;

#[derive(Clone, Debug)]
pub enum Material {
    /// Lit, physically influenced surface.
    Standard(StandardMaterial),
    /// Invisible surface that only darkens where shadows fall on it.
    Shadow(ShadowMaterial),
    /// Unlit surface, drawn with its base colour only.
    Other(BasicMaterial),
}

impl Material {
    pub fn name(&self) -> &str {
        match self {
            Material::Standard(m) => &m.name,
            Material::Shadow(_) => "shadow",
            Material::Other(m) => &m.name,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StandardMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<Arc<image::RgbaImage>>,
    pub metallic: f32,
    pub roughness: f32,
    pub double_sided: bool,
    pub env_map: Option<Arc<CubeMap>>,
    pub env_map_intensity: f32,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            name: "standard".to_string(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic: 1.0,
            roughness: 1.0,
            double_sided: false,
            env_map: None,
            env_map_intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShadowMaterial {
    pub opacity: f32,
}

impl Default for ShadowMaterial {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct BasicMaterial {
    pub name: String,
    pub color: [f32; 4],
    pub color_texture: Option<Arc<image::RgbaImage>>,
}
