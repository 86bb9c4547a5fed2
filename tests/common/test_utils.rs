use std::sync::Arc;

use envmap_viewer::{
    camera::{Camera, Projection},
    data_structures::{cube_map::CubeMap, scene_graph::Scene},
    render::{DrawList, FrameRenderer},
    viewport::Viewport,
};

/// What a [`RecordingRenderer`] saw in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub nodes: usize,
    pub opaque: usize,
    pub shadow_catchers: usize,
    pub has_background: bool,
    pub camera_position: [f32; 3],
}

/// Stands in for the GPU renderer and records every call.
#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: Vec<Frame>,
    pub resizes: Vec<Viewport>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn last_frame(&self) -> &Frame {
        self.frames.last().expect("no frame rendered yet")
    }
}

impl FrameRenderer for RecordingRenderer {
    fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        _projection: &Projection,
    ) -> anyhow::Result<()> {
        let list = DrawList::collect(scene);
        self.frames.push(Frame {
            nodes: scene.len(),
            opaque: list.opaque.len(),
            shadow_catchers: list.shadow_catchers.len(),
            has_background: list.background.is_some(),
            camera_position: camera.position.into(),
        });
        Ok(())
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.resizes.push(*viewport);
    }
}

/// Fails every frame after the first `ok_frames`.
pub struct FailingRenderer {
    pub ok_frames: usize,
    pub calls: usize,
}

impl FailingRenderer {
    pub fn after(ok_frames: usize) -> Self {
        Self { ok_frames, calls: 0 }
    }
}

impl FrameRenderer for FailingRenderer {
    fn render(&mut self, _: &Scene, _: &Camera, _: &Projection) -> anyhow::Result<()> {
        self.calls += 1;
        if self.calls > self.ok_frames {
            anyhow::bail!("device lost");
        }
        Ok(())
    }

    fn resize(&mut self, _: &Viewport) {}
}

pub fn solid_face(size: u32, rgb: [u8; 3]) -> image::DynamicImage {
    image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(size, size, image::Rgb(rgb)))
}

pub fn test_cube_map() -> Arc<CubeMap> {
    let faces = (0..6).map(|i| solid_face(2, [i * 40, 0, 0])).collect();
    Arc::new(CubeMap::from_faces(faces).expect("valid faces"))
}

fn push_f32s(bin: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        bin.extend_from_slice(&v.to_le_bytes());
    }
}

/// A GLB holding one triangle node named "Bun" at (0, 1, 0) and a two-key
/// translation clip "bounce" that moves it from (0, 0, 0) to (0, 2, 0) over 2 s.
pub fn triangle_glb() -> Vec<u8> {
    let (json, bin) = triangle_gltf(None);
    glb(json, bin)
}

/// JSON and buffer of the triangle scene. With `buffer_uri` the JSON points at an
/// external buffer instead of the GLB binary chunk.
pub fn triangle_gltf(buffer_uri: Option<&str>) -> (Vec<u8>, Vec<u8>) {
    let mut bin = Vec::new();
    // positions, 36 bytes
    push_f32s(&mut bin, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    // indices, 6 bytes padded to 8
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    // key times at 44
    push_f32s(&mut bin, &[0.0, 2.0]);
    // translations at 52
    push_f32s(&mut bin, &[0.0, 0.0, 0.0, 0.0, 2.0, 0.0]);

    let json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"name": "Bun", "mesh": 0, "translation": [0.0, 1.0, 0.0]}}],
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
  "materials": [{{
    "name": "bread",
    "pbrMetallicRoughness": {{"baseColorFactor": [1.0, 0.5, 0.25, 1.0], "metallicFactor": 0.1, "roughnessFactor": 0.8}}
  }}],
  "buffers": [{{"byteLength": {len}{uri}}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}},
    {{"buffer": 0, "byteOffset": 44, "byteLength": 8}},
    {{"buffer": 0, "byteOffset": 52, "byteLength": 24}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}},
    {{"bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [2.0]}},
    {{"bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3"}}
  ],
  "animations": [{{
    "name": "bounce",
    "channels": [{{"sampler": 0, "target": {{"node": 0, "path": "translation"}}}}],
    "samplers": [{{"input": 2, "output": 3, "interpolation": "LINEAR"}}]
  }}]
}}"#,
        len = bin.len(),
        uri = buffer_uri
            .map(|uri| format!(r#", "uri": "{uri}""#))
            .unwrap_or_default()
    );

    (json.into_bytes(), bin)
}

/// A fresh directory under the system temp dir.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("envmap-viewer-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Wraps a JSON and a BIN chunk into a binary glTF container.
pub fn glb(mut json: Vec<u8>, mut bin: Vec<u8>) -> Vec<u8> {
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

#[track_caller]
pub fn assert_close(left: f32, right: f32) {
    assert!((left - right).abs() <= 1e-4, "{} is not close to {}", left, right);
}
