//! One-time construction of the static part of the scene.
//!
//! Ground, lights and camera are built synchronously from [`SceneConfig`] before any
//! asset has arrived. The ids of the nodes the debug panel and the render loop need
//! later are returned as [`SceneHandles`].

use std::{f32::consts::PI, sync::Arc};

use cgmath::Deg;

use crate::{
    camera::{Camera, OrbitController, Projection},
    config::{
        LIGHT_INTENSITY_RANGE, LIGHT_POSITION_RANGE, MODEL_ROTATION_RANGE, SLIDER_STEP,
        SceneConfig,
    },
    data_structures::{
        material::{Material, ShadowMaterial},
        model::Geometry,
        scene_graph::{
            AmbientLight, DirectionalLight, DirectionalShadow, Node, NodeId, NodeKind, Scene,
        },
        transform::Transform,
    },
    debug_panel::{DebugPanel, Tunable},
    viewport::Viewport,
};

/// Ids of the nodes created by [`build_scene`] and, once loaded, the model wrapper.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneHandles {
    pub ground: NodeId,
    pub directional_light: NodeId,
    pub ambient_light: NodeId,
    pub model: Option<NodeId>,
}

pub fn build_scene(config: &SceneConfig) -> (Scene, SceneHandles) {
    let mut scene = Scene::new();

    let mut ground = Node::mesh(
        "ground",
        Arc::new(Geometry::plane(config.ground_size, config.ground_size)),
        Material::Shadow(ShadowMaterial {
            opacity: config.ground_shadow_opacity,
        }),
    )
    .with_transform(
        Transform::from_position(0.0, config.ground_height, 0.0).with_rotation_x(-PI / 2.0),
    );
    if let Some(mesh) = ground.as_mesh_mut() {
        mesh.receive_shadow = true;
        mesh.cast_shadow = false;
    }
    let ground = scene.add(ground);

    let [x, y, z] = config.light_position;
    let shadow = &config.shadow;
    let directional_light = scene.add(
        Node::new(
            "directional light",
            NodeKind::DirectionalLight(DirectionalLight {
                color: config.light_color,
                intensity: config.light_intensity,
                target: [0.0, 0.0, 0.0],
                cast_shadow: true,
                shadow: DirectionalShadow {
                    map_size: shadow.map_size,
                    near: shadow.near,
                    far: shadow.far,
                    left: shadow.left,
                    right: shadow.right,
                    top: shadow.top,
                    bottom: shadow.bottom,
                    bias: shadow.bias,
                },
            }),
        )
        .with_transform(Transform::from_position(x, y, z)),
    );

    let ambient_light = scene.add(Node::new(
        "ambient light",
        NodeKind::AmbientLight(AmbientLight {
            color: config.ambient_color,
            intensity: config.ambient_intensity,
        }),
    ));

    log::info!("scene assembled with {} nodes", scene.len());
    (
        scene,
        SceneHandles {
            ground,
            directional_light,
            ambient_light,
            model: None,
        },
    )
}

pub fn build_camera(config: &SceneConfig, viewport: &Viewport) -> (Camera, Projection) {
    let camera = Camera::new(config.camera_position, config.camera_target);
    let projection = Projection::new(
        viewport.width,
        viewport.height,
        Deg(config.camera_fov_degrees),
        config.camera_near,
        config.camera_far,
    );
    (camera, projection)
}

pub fn build_controls(config: &SceneConfig) -> OrbitController {
    OrbitController::new(config.damping_factor, Deg(config.camera_fov_degrees).into())
}

pub fn bind_light_sliders(panel: &mut DebugPanel) {
    let (min, max) = LIGHT_INTENSITY_RANGE;
    panel.bind(Tunable::LightIntensity, min, max, SLIDER_STEP, "lightIntensity");
    let (min, max) = LIGHT_POSITION_RANGE;
    panel.bind(Tunable::LightPositionX, min, max, SLIDER_STEP, "lightX");
    panel.bind(Tunable::LightPositionY, min, max, SLIDER_STEP, "lightY");
    panel.bind(Tunable::LightPositionZ, min, max, SLIDER_STEP, "lightZ");
}

pub fn bind_model_slider(panel: &mut DebugPanel) {
    let (min, max) = MODEL_ROTATION_RANGE;
    panel.bind(Tunable::ModelRotationY, min, max, SLIDER_STEP, "rotation");
}

/// Places a loaded model in the scene, wrapped in a group that carries the
/// configured scale and offset. Returns the wrapper's id.
pub fn attach_model(scene: &mut Scene, model: Node, config: &SceneConfig) -> NodeId {
    let [x, y, z] = config.model_position;
    let mut wrapper = Node::group("model")
        .with_transform(Transform::from_position(x, y, z).with_uniform_scale(config.model_scale));
    wrapper.add_child(model);
    scene.add(wrapper)
}
