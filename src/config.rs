//! Tunable constants of the viewer.
//!
//! Everything the scene assembly, the loaders and the render loop need to know about
//! the demo lives in [`SceneConfig`]. The defaults reproduce the hamburger scene; a
//! caller can override single fields with struct update syntax before passing it to
//! [`crate::flow::run`].

use std::f32::consts::PI;

/// Cubemap face paths in the fixed order +x, -x, +y, -y, +z, -z.
pub const ENVIRONMENT_FACES: [&str; 6] = [
    "textures/environmentMaps/0/px.jpg",
    "textures/environmentMaps/0/nx.jpg",
    "textures/environmentMaps/0/py.jpg",
    "textures/environmentMaps/0/ny.jpg",
    "textures/environmentMaps/0/pz.jpg",
    "textures/environmentMaps/0/nz.jpg",
];

pub const MODEL_PATH: &str = "models/hamburger.glb";

#[derive(Clone, Debug, PartialEq)]
pub struct ShadowConfig {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Depth offset applied when comparing against the shadow map.
    pub bias: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    /// Directory (native) the asset paths are resolved against. On the web the
    /// assets are served from `<origin>/assets`.
    pub asset_root: String,
    pub environment_faces: [String; 6],
    pub model_path: String,
    /// Id of the canvas element the viewer draws into on the web.
    pub canvas_id: String,

    pub ground_size: f32,
    pub ground_height: f32,
    pub ground_shadow_opacity: f32,

    pub light_color: [f32; 3],
    pub light_intensity: f32,
    pub light_position: [f32; 3],
    pub shadow: ShadowConfig,

    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,

    pub camera_fov_degrees: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub damping_factor: f32,

    pub model_scale: f32,
    pub model_position: [f32; 3],
    pub env_map_intensity: f32,

    pub max_pixel_ratio: f64,
    pub clear_colour: wgpu::Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            environment_faces: ENVIRONMENT_FACES.map(str::to_string),
            model_path: MODEL_PATH.to_string(),
            canvas_id: "canvas".to_string(),

            ground_size: 10.0,
            ground_height: -1.0,
            ground_shadow_opacity: 0.5,

            light_color: [1.0, 1.0, 1.0],
            light_intensity: 3.0,
            light_position: [0.25, 3.0, -2.25],
            shadow: ShadowConfig {
                map_size: 1024,
                near: 0.5,
                far: 10.0,
                left: -5.0,
                right: 5.0,
                top: 5.0,
                bottom: -5.0,
                bias: 0.0005,
            },

            // 0x404040
            ambient_color: [64.0 / 255.0, 64.0 / 255.0, 64.0 / 255.0],
            ambient_intensity: 1.0,

            camera_fov_degrees: 75.0,
            camera_near: 0.1,
            camera_far: 100.0,
            camera_position: [4.0, 1.0, -4.0],
            camera_target: [0.0, 0.0, 0.0],
            damping_factor: 0.05,

            model_scale: 0.3,
            model_position: [0.0, -1.0, 0.0],
            env_map_intensity: 2.5,

            max_pixel_ratio: 2.0,
            clear_colour: wgpu::Color::BLACK,
        }
    }
}

/// Slider bounds of the light position components.
pub const LIGHT_POSITION_RANGE: (f32, f32) = (-5.0, 5.0);
pub const LIGHT_INTENSITY_RANGE: (f32, f32) = (0.0, 10.0);
pub const MODEL_ROTATION_RANGE: (f32, f32) = (-PI, PI);
pub const SLIDER_STEP: f32 = 0.001;
