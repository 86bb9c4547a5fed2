use std::{f32::consts::PI, sync::Arc};

use cgmath::Rotation3;
use envmap_viewer::{
    assembly::{attach_model, build_scene},
    config::SceneConfig,
    data_structures::{
        material::{Material, ShadowMaterial, StandardMaterial},
        model::Geometry,
        scene_graph::{DirectionalLight, Node, NodeKind, Scene},
        transform::Transform,
    },
    render::DrawList,
};

use crate::common::test_utils::{assert_close, test_cube_map};

mod common;

fn mesh(name: &str, material: Material) -> Node {
    Node::mesh(name, Arc::new(Geometry::plane(1.0, 1.0)), material)
}

fn standard(name: &str) -> Node {
    mesh(name, Material::Standard(StandardMaterial::default()))
}

#[test]
fn ids_are_assigned_to_whole_subtrees() {
    let mut scene = Scene::new();
    let mut parent = Node::group("parent");
    parent.add_child(standard("a"));
    parent.add_child(standard("b"));

    let id = scene.add(parent);
    let other = scene.add(Node::group("other"));

    assert_eq!(scene.len(), 4);
    assert_ne!(id, other);
    let parent = scene.find(id).unwrap();
    let child_ids: Vec<_> = parent.children.iter().map(Node::id).collect();
    assert_ne!(child_ids[0], child_ids[1]);
    for child in child_ids {
        assert!(scene.contains(child));
        assert_ne!(child, id);
    }
}

#[test]
fn world_transforms_compose_parent_first() {
    let mut scene = Scene::new();
    let mut parent = Node::group("parent")
        .with_transform(Transform::from_position(0.0, -1.0, 0.0).with_uniform_scale(0.5));
    parent.add_child(standard("child").with_transform(Transform::from_position(2.0, 2.0, 0.0)));
    let parent = scene.add(parent);
    let child = scene.find(parent).unwrap().children[0].id();

    let world = scene.world_transform(child).unwrap();
    assert_close(world.position.x, 1.0);
    assert_close(world.position.y, 0.0);
    assert_close(world.scale.x, 0.5);
}

#[test]
fn rotation_y_round_trips_through_the_quaternion() {
    let mut transform = Transform::new();
    transform.set_rotation_y(1.25);
    assert_close(transform.rotation_y(), 1.25);
    transform.set_rotation_y(-PI / 2.0);
    assert_close(transform.rotation_y(), -PI / 2.0);
}

#[test]
fn invisible_nodes_hide_their_subtree() {
    let mut scene = Scene::new();
    let mut parent = Node::group("parent");
    parent.add_child(standard("child"));
    parent.visible = false;
    scene.add(parent);
    scene.add(standard("sibling"));

    let list = DrawList::collect(&scene);
    assert_eq!(list.opaque.len(), 1);
}

#[test]
fn assembled_scene_matches_the_configuration() {
    let config = SceneConfig::default();
    let (scene, handles) = build_scene(&config);
    assert_eq!(scene.len(), 3);
    assert!(handles.model.is_none());

    let ground = scene.find(handles.ground).unwrap();
    assert_close(ground.transform.position.y, -1.0);
    let expected = cgmath::Quaternion::from_angle_x(cgmath::Rad(-PI / 2.0));
    assert_close(ground.transform.rotation.s, expected.s);
    assert_close(ground.transform.rotation.v.x, expected.v.x);
    let ground_mesh = ground.as_mesh().unwrap();
    assert!(ground_mesh.receive_shadow);
    assert!(!ground_mesh.cast_shadow);
    assert!(matches!(
        ground_mesh.material,
        Material::Shadow(ShadowMaterial { opacity }) if opacity == 0.5
    ));

    let light = scene.find(handles.directional_light).unwrap();
    let position: [f32; 3] = light.transform.position.into();
    assert_eq!(position, [0.25, 3.0, -2.25]);
    match &light.kind {
        NodeKind::DirectionalLight(DirectionalLight {
            intensity,
            cast_shadow,
            target,
            shadow,
            ..
        }) => {
            assert_eq!(*intensity, 3.0);
            assert!(*cast_shadow);
            assert_eq!(*target, [0.0, 0.0, 0.0]);
            assert_eq!(shadow.map_size, 1024);
        }
        other => panic!("expected a directional light, got {:?}", other),
    }
}

#[test]
fn attached_models_are_wrapped_with_scale_and_offset() {
    let config = SceneConfig::default();
    let (mut scene, _) = build_scene(&config);
    let mut model = Node::group("model.glb");
    model.add_child(standard("patty").with_transform(Transform::from_position(0.0, 1.0, 0.0)));

    let id = attach_model(&mut scene, model, &config);
    let wrapper = scene.find(id).unwrap();
    assert_eq!(wrapper.name, "model");
    assert_close(wrapper.transform.scale.x, 0.3);

    let patty = wrapper.children[0].children[0].id();
    let world = scene.world_transform(patty).unwrap();
    assert_close(world.position.y, -1.0 + 0.3);
}

#[test]
fn draw_list_batches_by_material_and_lights() {
    let config = SceneConfig::default();
    let (mut scene, _) = build_scene(&config);
    let mut caster = standard("caster");
    caster.as_mesh_mut().unwrap().cast_shadow = true;
    scene.add(caster);
    scene.add(standard("non-caster"));
    scene.add(mesh("catcher", Material::Shadow(ShadowMaterial::default())));
    scene.background = Some(test_cube_map());

    let list = DrawList::collect(&scene);
    assert_eq!(list.opaque.len(), 2);
    assert_eq!(list.shadow_catchers.len(), 2);
    assert!(list.background.is_some());
    assert!(list.directional.is_some());
    let gray = 64.0 / 255.0;
    for channel in list.ambient {
        assert_close(channel, gray);
    }

    let casters: Vec<_> = list.shadow_casters().collect();
    assert_eq!(casters.len(), 1);
    assert_eq!(casters[0].mesh.geometry.name, "plane");
}

#[test]
fn only_the_first_directional_light_is_drawn() {
    let config = SceneConfig::default();
    let (mut scene, handles) = build_scene(&config);
    let second = scene.find(handles.directional_light).unwrap().clone();
    scene.add(second.with_transform(Transform::from_position(9.0, 9.0, 9.0)));

    let list = DrawList::collect(&scene);
    let light = list.directional.unwrap();
    assert_close(light.position.x, 0.25);
}

#[test]
fn light_direction_points_at_the_target() {
    let config = SceneConfig::default();
    let (scene, _) = build_scene(&config);
    let list = DrawList::collect(&scene);
    let light = list.directional.unwrap();

    let direction = light.direction();
    let len = (direction.x * direction.x + direction.y * direction.y + direction.z * direction.z).sqrt();
    assert_close(len, 1.0);
    assert!(direction.y < 0.0);
}
