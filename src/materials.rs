use std::sync::Arc;

use crate::data_structures::{cube_map::CubeMap, material::Material, scene_graph::Scene};

/// Gives every standard material in `scene` the environment map and reflection
/// intensity. Shadow-only and unlit materials are left alone.
///
/// Returns how many materials were touched. Running it again changes nothing.
pub fn update_all_materials(scene: &mut Scene, env_map: &Arc<CubeMap>, intensity: f32) -> usize {
    let mut updated = 0;
    scene.traverse_mut(&mut |node| {
        let Some(mesh) = node.as_mesh_mut() else {
            return;
        };
        match &mut mesh.material {
            Material::Standard(material) => {
                material.env_map = Some(Arc::clone(env_map));
                material.env_map_intensity = intensity;
                updated += 1;
            }
            Material::Shadow(_) | Material::Other(_) => {}
        }
    });
    log::debug!("environment bound to {} materials", updated);
    updated
}
