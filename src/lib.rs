//! envmap-viewer
//!
//! A single-scene glTF viewer for native and WASM targets. One model is lit by a
//! directional light over a ground plane that only shows its shadow, with a cube
//! map as background and reflection source. Orbit controls move the camera and a
//! keyboard-driven debug panel tunes the light and the model's rotation.
//!
//! High-level modules
//! - `config`: scene constants and asset locations
//! - `assembly`: builds the static scene, camera, controls and sliders
//! - `flow`: render loop, asset polling and the winit application
//! - `resources`: asynchronous asset loading (binaries, cube maps, glTF)
//! - `animation`: clip playback driven by frame time
//! - `materials`: environment-map post-processing of loaded materials
//! - `camera`: camera, projection and damped orbit controls
//! - `debug_panel`: labelled sliders bound to scene properties
//! - `render`: the renderer seam and per-frame draw lists
//! - `renderer`, `context`, `pipelines`: the wgpu implementation of that seam
//! - `data_structures`: scene graph, geometry, materials, textures
//!

pub mod animation;
pub mod assembly;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod debug_panel;
pub mod flow;
pub mod materials;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod viewport;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::run(config::SceneConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
