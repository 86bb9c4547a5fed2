use std::sync::Arc;

use envmap_viewer::{
    config::SceneConfig,
    data_structures::{
        material::{Material, StandardMaterial},
        model::Geometry,
        scene_graph::Node,
    },
    debug_panel::PanelError,
    flow::{LoadStats, SceneContext},
    resources::{AssetLoadError, AssetSlot, LoadedModel, SlotStatus},
    viewport::Viewport,
};
use instant::{Duration, Instant};
use winit::keyboard::KeyCode;

use crate::common::test_utils::{
    FailingRenderer, RecordingRenderer, assert_close, test_cube_map, triangle_glb,
};

mod common;

fn context() -> SceneContext {
    let config = SceneConfig::default();
    let viewport = Viewport::new(800, 600, 1.0, config.max_pixel_ratio);
    SceneContext::new(config, viewport)
}

fn static_model() -> LoadedModel {
    let mut root = Node::group("static.glb");
    root.add_child(Node::mesh(
        "box",
        Arc::new(Geometry::plane(1.0, 1.0)),
        Material::Standard(StandardMaterial::default()),
    ));
    LoadedModel {
        root,
        animations: Vec::new(),
    }
}

fn animated_model() -> LoadedModel {
    let source = envmap_viewer::resources::AssetSource::new("unused");
    futures::executor::block_on(envmap_viewer::resources::model_from_bytes(
        &source,
        &triangle_glb(),
        "models/triangle.glb",
    ))
    .expect("decodes")
}

fn standard_materials(ctx: &SceneContext) -> Vec<StandardMaterial> {
    let mut found = Vec::new();
    ctx.scene.traverse(&mut |node| {
        if let Some(Material::Standard(m)) = node.as_mesh().map(|mesh| &mesh.material) {
            found.push(m.clone());
        }
    });
    found
}

#[test]
fn renders_the_static_scene_while_assets_are_pending() {
    let mut ctx = context();
    let (_env, env_slot) = AssetSlot::channel("environment map");
    let (_model, model_slot) = AssetSlot::channel("model");
    ctx.attach_environment(env_slot);
    ctx.attach_model(model_slot);

    let mut renderer = RecordingRenderer::new();
    let start = Instant::now();
    for i in 0..3 {
        ctx.tick(&mut renderer, start + Duration::from_millis(16 * i))
            .expect("frame renders");
    }

    assert_eq!(renderer.frame_count(), 3);
    let frame = renderer.last_frame();
    assert_eq!(frame.nodes, 3);
    assert_eq!(frame.opaque, 0);
    assert_eq!(frame.shadow_catchers, 1);
    assert!(!frame.has_background);
    assert_eq!(ctx.stats, LoadStats::default());
}

#[test]
fn environment_then_model_binds_the_environment_on_model_arrival() {
    let mut ctx = context();
    let (env, env_slot) = AssetSlot::channel("environment map");
    let (model, model_slot) = AssetSlot::channel("model");
    ctx.attach_environment(env_slot);
    ctx.attach_model(model_slot);
    let mut renderer = RecordingRenderer::new();
    let now = Instant::now();

    let cube = test_cube_map();
    env.succeed(Arc::clone(&cube));
    ctx.tick(&mut renderer, now).unwrap();
    assert!(renderer.last_frame().has_background);
    assert!(ctx.model().is_none());

    model.succeed(static_model());
    ctx.tick(&mut renderer, now).unwrap();
    assert_eq!(renderer.last_frame().opaque, 1);

    let materials = standard_materials(&ctx);
    assert_eq!(materials.len(), 1);
    assert!(Arc::ptr_eq(materials[0].env_map.as_ref().unwrap(), &cube));
    assert_eq!(materials[0].env_map_intensity, 2.5);
    assert_eq!(
        ctx.stats,
        LoadStats {
            succeeded: 2,
            failed: 0
        }
    );
}

#[test]
fn model_then_environment_binds_the_environment_on_environment_arrival() {
    let mut ctx = context();
    let mut renderer = RecordingRenderer::new();

    ctx.on_model_loaded(static_model());
    assert!(standard_materials(&ctx)[0].env_map.is_none());

    let (env, env_slot) = AssetSlot::channel("environment map");
    ctx.attach_environment(env_slot);
    env.succeed(test_cube_map());
    ctx.tick(&mut renderer, Instant::now()).unwrap();

    let materials = standard_materials(&ctx);
    assert!(materials[0].env_map.is_some());
    assert_eq!(materials[0].env_map_intensity, 2.5);
}

#[test]
fn render_errors_stop_the_tick() {
    let mut ctx = context();
    let mut renderer = FailingRenderer::after(1);
    let now = Instant::now();

    assert!(ctx.tick(&mut renderer, now).is_ok());
    let err = ctx
        .tick(&mut renderer, now + Duration::from_millis(16))
        .unwrap_err();
    assert!(err.to_string().contains("device lost"));
}

#[test]
fn a_failed_load_is_counted_once_and_the_loop_keeps_running() {
    let mut ctx = context();
    let (env, env_slot) = AssetSlot::channel("environment map");
    let (model, model_slot) = AssetSlot::channel("model");
    ctx.attach_environment(env_slot);
    ctx.attach_model(model_slot);
    let mut renderer = RecordingRenderer::new();
    let now = Instant::now();

    env.fail(AssetLoadError::Malformed("truncated jpeg".to_string()));
    model.succeed(static_model());
    for _ in 0..3 {
        ctx.tick(&mut renderer, now).unwrap();
    }

    assert_eq!(
        ctx.stats,
        LoadStats {
            succeeded: 1,
            failed: 1
        }
    );
    assert_eq!(renderer.frame_count(), 3);
    assert!(!renderer.last_frame().has_background);
    assert_eq!(renderer.last_frame().opaque, 1);
    assert!(standard_materials(&ctx)[0].env_map.is_none());
}

#[test]
fn an_abandoned_load_counts_as_failed() {
    let mut ctx = context();
    let (model, model_slot) = AssetSlot::<LoadedModel>::channel("model");
    ctx.attach_model(model_slot);
    drop(model);

    ctx.poll_assets();
    ctx.poll_assets();
    assert_eq!(ctx.stats.failed, 1);
    assert!(ctx.model().is_none());
}

#[test]
fn animations_advance_with_frame_time() {
    let mut ctx = context();
    let (model, model_slot) = AssetSlot::channel("model");
    ctx.attach_model(model_slot);
    model.succeed(animated_model());
    let mut renderer = RecordingRenderer::new();
    let start = Instant::now();

    // first tick binds the mixer and samples the clock
    ctx.tick(&mut renderer, start).unwrap();
    assert!(ctx.animation.is_bound());
    assert_eq!(ctx.animation.mixer().unwrap().time(), 0.0);

    ctx.tick(&mut renderer, start + Duration::from_millis(500)).unwrap();
    ctx.tick(&mut renderer, start + Duration::from_millis(1000)).unwrap();
    assert_close(ctx.animation.mixer().unwrap().time(), 1.0);

    let mut bun_y = None;
    ctx.scene.traverse(&mut |node| {
        if node.name == "Bun" {
            bun_y = Some(node.transform.position.y);
        }
    });
    assert_close(bun_y.unwrap(), 1.0);
}

#[test]
fn models_without_clips_leave_the_driver_unbound() {
    let mut ctx = context();
    ctx.on_model_loaded(static_model());
    assert!(!ctx.animation.is_bound());
    ctx.tick(&mut RecordingRenderer::new(), Instant::now()).unwrap();
}

#[test]
fn the_model_is_added_exactly_once() {
    let mut ctx = context();
    ctx.on_model_loaded(static_model());
    let first = ctx.model();
    let nodes = ctx.scene.len();

    ctx.on_model_loaded(static_model());
    assert_eq!(ctx.model(), first);
    assert_eq!(ctx.scene.len(), nodes);
}

#[test]
fn controls_move_the_camera_before_the_frame_is_drawn() {
    let mut ctx = context();
    let mut renderer = RecordingRenderer::new();
    let before = ctx.camera.position;

    ctx.controls.zoom(1.0);
    ctx.tick(&mut renderer, Instant::now()).unwrap();

    let [x, y, z] = renderer.last_frame().camera_position;
    let ratio = (x * x + y * y + z * z).sqrt()
        / (before.x * before.x + before.y * before.y + before.z * before.z).sqrt();
    assert_close(ratio, 0.95);
}

#[test]
fn resize_updates_projection_and_surface() {
    let mut ctx = context();
    let mut renderer = RecordingRenderer::new();

    assert!(ctx.resize(1024, 768, 3.0, &mut renderer));
    assert_eq!(ctx.viewport.pixel_ratio, 2.0);
    assert_eq!(ctx.viewport.surface_size(), (2048, 1536));
    assert_close(ctx.projection.aspect(), 1024.0 / 768.0);
    assert_eq!(renderer.resizes, vec![ctx.viewport]);
}

#[test]
fn zero_sized_resizes_are_ignored() {
    let mut ctx = context();
    let mut renderer = RecordingRenderer::new();
    let before = ctx.viewport;

    assert!(!ctx.resize(0, 600, 1.0, &mut renderer));
    assert!(!ctx.resize(800, 0, 1.0, &mut renderer));
    assert_eq!(ctx.viewport, before);
    assert_close(ctx.projection.aspect(), 800.0 / 600.0);
    assert!(renderer.resizes.is_empty());
}

#[test]
fn light_sliders_write_through_to_the_scene() {
    let mut ctx = context();

    assert_eq!(ctx.set_slider("lightIntensity", 10.0), Ok(10.0));
    assert_eq!(ctx.slider_value("lightIntensity"), Ok(10.0));
    assert_eq!(ctx.set_slider("lightIntensity", 25.0), Ok(10.0));

    ctx.set_slider("lightX", 2.5).unwrap();
    let light = ctx.scene.find(ctx.handles.directional_light).unwrap();
    assert_close(light.transform.position.x, 2.5);
}

#[test]
fn the_rotation_slider_appears_with_the_model() {
    let mut ctx = context();
    assert_eq!(
        ctx.set_slider("rotation", 1.0),
        Err(PanelError::UnknownSlider("rotation".to_string()))
    );

    ctx.on_model_loaded(static_model());
    let written = ctx.set_slider("rotation", 1.0).unwrap();
    let model = ctx.scene.find(ctx.model().unwrap()).unwrap();
    assert_close(model.transform.rotation_y(), written);
    // snapped to the 0.001 grid that starts at -pi
    assert!((written - 1.0).abs() < 0.001);
}

#[test]
fn keyboard_nudges_the_selected_slider() {
    let mut ctx = context();
    let x = ctx.slider_value("lightX").unwrap();

    // lightIntensity is selected first
    assert!(ctx.handle_key(KeyCode::Tab));
    assert!(ctx.handle_key(KeyCode::ArrowUp));
    assert_close(ctx.slider_value("lightX").unwrap(), x + 0.1);

    assert!(!ctx.handle_key(KeyCode::KeyQ));
}

#[test]
fn slots_report_their_status() {
    let (completer, mut slot) = AssetSlot::<u32>::channel("answer");
    assert_eq!(slot.label(), "answer");
    assert_eq!(slot.status(), SlotStatus::Pending);
    assert!(slot.poll().is_none());

    completer.succeed(42);
    assert_eq!(slot.poll().unwrap().unwrap(), 42);
    assert_eq!(slot.status(), SlotStatus::Succeeded);
    assert!(slot.poll().is_none());
}

#[test]
fn ticks_at_the_same_instant_do_not_advance_animations() {
    let mut ctx = context();
    ctx.on_model_loaded(animated_model());
    let mut renderer = RecordingRenderer::new();
    let start = Instant::now();

    ctx.tick(&mut renderer, start).unwrap();
    ctx.tick(&mut renderer, start + Duration::from_millis(250)).unwrap();
    ctx.tick(&mut renderer, start + Duration::from_millis(250)).unwrap();
    assert_close(ctx.animation.mixer().unwrap().time(), 0.25);
}

#[test]
fn a_failed_model_load_leaves_the_model_absent() {
    let mut ctx = context();
    let (model, model_slot) = AssetSlot::<LoadedModel>::channel("model");
    ctx.attach_model(model_slot);
    model.fail(AssetLoadError::Fetch {
        path: "models/hamburger.glb".to_string(),
        message: "connection reset".to_string(),
    });

    let mut renderer = RecordingRenderer::new();
    for _ in 0..5 {
        ctx.tick(&mut renderer, Instant::now()).unwrap();
    }
    assert!(ctx.model().is_none());
    assert!(!ctx.animation.is_bound());
    assert_eq!(ctx.stats.failed, 1);
    assert!(ctx.slider_value("rotation").is_err());
    assert_eq!(renderer.frame_count(), 5);
}
