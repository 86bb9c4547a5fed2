use std::sync::Arc;

use envmap_viewer::{
    data_structures::{
        material::{BasicMaterial, Material, ShadowMaterial, StandardMaterial},
        model::Geometry,
        scene_graph::{Node, Scene},
    },
    materials::update_all_materials,
};

use crate::common::test_utils::test_cube_map;

mod common;

fn scene_with_every_material() -> Scene {
    let geometry = Arc::new(Geometry::plane(1.0, 1.0));
    let mut root = Node::group("model");
    root.add_child(Node::mesh(
        "lit",
        geometry.clone(),
        Material::Standard(StandardMaterial::default()),
    ));
    root.add_child(Node::mesh(
        "catcher",
        geometry.clone(),
        Material::Shadow(ShadowMaterial::default()),
    ));
    let mut nested = Node::group("nested");
    nested.add_child(Node::mesh(
        "unlit",
        geometry.clone(),
        Material::Other(BasicMaterial {
            name: "sticker".to_string(),
            color: [1.0; 4],
            color_texture: None,
        }),
    ));
    nested.add_child(Node::mesh(
        "lit too",
        geometry,
        Material::Standard(StandardMaterial::default()),
    ));
    root.add_child(nested);

    let mut scene = Scene::new();
    scene.add(root);
    scene
}

fn materials(scene: &Scene) -> Vec<Material> {
    let mut found = Vec::new();
    scene.traverse(&mut |node| {
        if let Some(mesh) = node.as_mesh() {
            found.push(mesh.material.clone());
        }
    });
    found
}

#[test]
fn only_standard_materials_get_the_environment() {
    let mut scene = scene_with_every_material();
    let env = test_cube_map();

    assert_eq!(update_all_materials(&mut scene, &env, 2.5), 2);

    for material in materials(&scene) {
        match material {
            Material::Standard(m) => {
                assert!(Arc::ptr_eq(m.env_map.as_ref().unwrap(), &env));
                assert_eq!(m.env_map_intensity, 2.5);
            }
            Material::Shadow(m) => assert_eq!(m, ShadowMaterial::default()),
            Material::Other(m) => assert_eq!(m.name, "sticker"),
        }
    }
}

#[test]
fn updating_twice_changes_nothing() {
    let mut scene = scene_with_every_material();
    let env = test_cube_map();

    update_all_materials(&mut scene, &env, 2.5);
    let first: Vec<_> = materials(&scene)
        .into_iter()
        .map(|m| format!("{:?}", m))
        .collect();
    assert_eq!(update_all_materials(&mut scene, &env, 2.5), 2);
    let second: Vec<_> = materials(&scene)
        .into_iter()
        .map(|m| format!("{:?}", m))
        .collect();
    assert_eq!(first, second);
}
