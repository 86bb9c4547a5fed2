//! glTF / GLB decoding into a scene sub-tree.
//!
//! Only what the viewer draws is read: triangle meshes, the base colour part of the
//! metallic-roughness model (or `KHR_materials_unlit`), node transforms and
//! translation/rotation/scale animations.

use std::sync::Arc;

use crate::{
    data_structures::{
        material::{BasicMaterial, Material, StandardMaterial},
        model::{Geometry, ModelVertex},
        scene_graph::Node,
        transform::Transform,
    },
    resources::{
        AssetLoadError, AssetSource, Progress,
        animation::{AnimationClip, Interpolation, Keyframes, Track},
    },
};

/// A decoded model, not yet part of any scene.
#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub root: Node,
    pub animations: Vec<AnimationClip>,
}

pub async fn load_model_gltf(
    source: &AssetSource,
    file_name: &str,
    on_progress: impl FnMut(Progress) + Send,
) -> Result<LoadedModel, AssetLoadError> {
    let bytes = source
        .load_binary_with_progress(file_name, on_progress)
        .await?;
    model_from_bytes(source, &bytes, file_name).await
}

/// Decodes a `.glb` or `.gltf` file. External buffers and images are fetched
/// relative to `file_name` through `source`.
pub async fn model_from_bytes(
    source: &AssetSource,
    bytes: &[u8],
    file_name: &str,
) -> Result<LoadedModel, AssetLoadError> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    let mut buffers: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf.blob.clone().ok_or_else(|| {
                AssetLoadError::Malformed(format!("{file_name} has no binary chunk"))
            })?,
            gltf::buffer::Source::Uri(uri) => {
                source.load_binary(&resolve_uri(file_name, uri)?).await?
            }
        };
        if data.len() < buffer.length() {
            return Err(AssetLoadError::Malformed(format!(
                "buffer {} is {} bytes, expected {}",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffers.push(data);
    }

    let mut images = Vec::new();
    for image in gltf.images() {
        let (encoded, label) = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..end))
                    .ok_or_else(|| {
                        AssetLoadError::Malformed(format!(
                            "image {} points outside its buffer",
                            image.index()
                        ))
                    })?;
                (bytes.to_vec(), format!("{file_name}#image{}", image.index()))
            }
            gltf::image::Source::Uri { uri, .. } => {
                let path = resolve_uri(file_name, uri)?;
                (source.load_binary(&path).await?, path)
            }
        };
        let decoded = image::load_from_memory(&encoded).map_err(|e| AssetLoadError::Decode {
            path: label,
            reason: e.to_string(),
        })?;
        images.push(Arc::new(decoded.to_rgba8()));
    }

    let materials: Vec<Material> = gltf
        .materials()
        .map(|m| convert_material(&m, &images))
        .collect();

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| AssetLoadError::Malformed(format!("{file_name} contains no scene")))?;

    let mut root = Node::group(file_name);
    let mut path = Vec::new();
    for node in scene.nodes() {
        root.add_child(convert_node(&node, &buffers, &materials, &mut path)?);
    }

    let animations = convert_animations(&gltf, &buffers);
    log::info!(
        "decoded {} with {} materials and {} animations",
        file_name,
        materials.len(),
        animations.len()
    );

    Ok(LoadedModel { root, animations })
}

fn resolve_uri(file_name: &str, uri: &str) -> Result<String, AssetLoadError> {
    if uri.starts_with("data:") {
        return Err(AssetLoadError::Malformed(format!(
            "{file_name} embeds a data URI, which is not supported"
        )));
    }
    Ok(match file_name.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{uri}"),
        None => uri.to_string(),
    })
}

fn convert_material(material: &gltf::Material, images: &[Arc<image::RgbaImage>]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let texture = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()).cloned());
    let name = material.name().unwrap_or("material").to_string();

    if material.unlit() {
        Material::Other(BasicMaterial {
            name,
            color: pbr.base_color_factor(),
            color_texture: texture,
        })
    } else {
        Material::Standard(StandardMaterial {
            name,
            base_color: pbr.base_color_factor(),
            base_color_texture: texture,
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            double_sided: material.double_sided(),
            ..Default::default()
        })
    }
}

/// `path` holds the indices of the ancestors being converted. A node shared by two
/// parents is converted twice; a node that is its own ancestor is rejected.
fn convert_node(
    node: &gltf::Node,
    buffers: &[Vec<u8>],
    materials: &[Material],
    path: &mut Vec<usize>,
) -> Result<Node, AssetLoadError> {
    if path.contains(&node.index()) {
        return Err(AssetLoadError::Malformed(format!(
            "node {} is its own ancestor",
            node.index()
        )));
    }
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));

    let mut primitives = Vec::new();
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(converted) = convert_primitive(&name, &primitive, buffers, materials)? {
                primitives.push(converted);
            }
        }
    }

    let mut converted = if primitives.len() == 1 {
        let mut single = primitives.remove(0);
        single.name = name;
        single
    } else {
        let mut group = Node::group(name);
        group.children = primitives;
        group
    };

    let (translation, rotation, scale) = node.transform().decomposed();
    converted.transform = Transform {
        position: translation.into(),
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    converted.source_index = Some(node.index());

    path.push(node.index());
    for child in node.children() {
        converted.add_child(convert_node(&child, buffers, materials, path)?);
    }
    path.pop();
    Ok(converted)
}

fn convert_primitive(
    node_name: &str,
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    materials: &[Material],
) -> Result<Option<Node>, AssetLoadError> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "skipping {:?} primitive {} of {}",
            primitive.mode(),
            primitive.index(),
            node_name
        );
        return Ok(None);
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| {
            AssetLoadError::Malformed(format!("a primitive of {node_name} has no positions"))
        })?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let tex_coords: Option<Vec<[f32; 2]>> =
        reader.read_tex_coords(0).map(|t| t.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(AssetLoadError::Malformed(format!(
            "{node_name} indexes vertex {bad} of {}",
            positions.len()
        )));
    }

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, position)| ModelVertex {
            position: *position,
            tex_coords: tex_coords
                .as_ref()
                .and_then(|t| t.get(i).copied())
                .unwrap_or([0.0, 0.0]),
            normal: normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0, 0.0, 0.0]),
        })
        .collect();

    let mut geometry = Geometry {
        name: format!("{node_name}/{}", primitive.index()),
        vertices,
        indices,
    };
    if normals.is_none() {
        geometry.compute_normals();
    }

    let material = primitive
        .material()
        .index()
        .and_then(|i| materials.get(i).cloned())
        .unwrap_or_else(|| Material::Standard(StandardMaterial::default()));

    let mut node = Node::mesh(geometry.name.clone(), Arc::new(geometry), material);
    if let Some(mesh) = node.as_mesh_mut() {
        mesh.cast_shadow = true;
        mesh.receive_shadow = true;
    }
    Ok(Some(node))
}

fn convert_animations(gltf: &gltf::Gltf, buffers: &[Vec<u8>]) -> Vec<AnimationClip> {
    gltf.animations()
        .map(|animation| {
            let tracks = animation
                .channels()
                .filter_map(|channel| {
                    let target = channel.target().node().index();
                    let reader =
                        channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
                    let timestamps: Vec<f32> = reader.read_inputs()?.collect();
                    let (interpolation, cubic) = match channel.sampler().interpolation() {
                        gltf::animation::Interpolation::Step => (Interpolation::Step, false),
                        gltf::animation::Interpolation::Linear => (Interpolation::Linear, false),
                        gltf::animation::Interpolation::CubicSpline => {
                            (Interpolation::Linear, true)
                        }
                    };
                    let keyframes = match reader.read_outputs()? {
                        gltf::animation::util::ReadOutputs::Translations(values) => {
                            Keyframes::Translation(spline_values(values.map(Into::into), cubic))
                        }
                        gltf::animation::util::ReadOutputs::Rotations(values) => {
                            Keyframes::Rotation(spline_values(
                                values
                                    .into_f32()
                                    .map(|q| cgmath::Quaternion::new(q[3], q[0], q[1], q[2])),
                                cubic,
                            ))
                        }
                        gltf::animation::util::ReadOutputs::Scales(values) => {
                            Keyframes::Scale(spline_values(values.map(Into::into), cubic))
                        }
                        gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => {
                            log::warn!("morph target animation on node {target} is not supported");
                            return None;
                        }
                    };
                    if keyframes.len() != timestamps.len() {
                        log::warn!(
                            "animation channel on node {} has {} keys for {} timestamps",
                            target,
                            keyframes.len(),
                            timestamps.len()
                        );
                        return None;
                    }
                    Some(Track {
                        target,
                        timestamps,
                        keyframes,
                        interpolation,
                    })
                })
                .collect();
            AnimationClip::new(animation.name().unwrap_or("animation"), tracks)
        })
        .collect()
}

/// Cubic-spline samplers store (in-tangent, value, out-tangent) per key.
fn spline_values<T: Clone>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    let values: Vec<T> = values.collect();
    if cubic {
        values.chunks_exact(3).map(|key| key[1].clone()).collect()
    } else {
        values
    }
}
