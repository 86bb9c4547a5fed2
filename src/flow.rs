//! Render loop and application event loop.
//!
//! [`SceneContext`] owns everything that changes while the viewer runs: the scene
//! graph, camera and controls, the debug panel, the animation driver and the two
//! pending asset loads. It never touches the GPU itself; each [`SceneContext::tick`]
//! hands the scene to a [`FrameRenderer`].
//!
//! # Lifecycle
//!
//! 1. The static scene is assembled and both asset loads start
//! 2. The window and the GPU renderer are created
//! 3. Every `RedrawRequested`:
//!    1. finished loads are applied to the scene
//!    2. the orbit controls move the camera
//!    3. the clock is sampled and the animation driver stepped
//!    4. the frame is rendered and the next one requested
//!
//! A render error stops the loop and is returned from [`run`].

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    animation::{AnimationDriver, AnimationMixer, Clock},
    assembly::{self, SceneHandles},
    camera::{Camera, OrbitController, Projection},
    config::SceneConfig,
    context::Context,
    data_structures::{
        cube_map::CubeMap,
        scene_graph::{Node, NodeId, NodeKind, Scene},
    },
    debug_panel::{Bindable, DebugPanel, PanelError, Tunable},
    materials::update_all_materials,
    render::FrameRenderer,
    renderer::GpuRenderer,
    resources::{AssetSlot, AssetSource, LoadedModel, Progress, Spawner, load_model_gltf},
    viewport::Viewport,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Outcome counters of the asset loads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct SceneContext {
    pub config: SceneConfig,
    pub scene: Scene,
    pub handles: SceneHandles,
    pub camera: Camera,
    pub projection: Projection,
    pub controls: OrbitController,
    pub viewport: Viewport,
    pub panel: DebugPanel,
    pub animation: AnimationDriver,
    pub stats: LoadStats,
    clock: Clock,
    env_map: Option<Arc<CubeMap>>,
    env_slot: Option<AssetSlot<Arc<CubeMap>>>,
    model_slot: Option<AssetSlot<LoadedModel>>,
    shift: bool,
}

impl SceneContext {
    /// Assembles the static scene. Nothing is loaded yet.
    pub fn new(config: SceneConfig, viewport: Viewport) -> Self {
        let (scene, handles) = assembly::build_scene(&config);
        let (camera, projection) = assembly::build_camera(&config, &viewport);
        let controls = assembly::build_controls(&config);
        let mut panel = DebugPanel::new();
        assembly::bind_light_sliders(&mut panel);

        Self {
            config,
            scene,
            handles,
            camera,
            projection,
            controls,
            viewport,
            panel,
            animation: AnimationDriver::new(),
            stats: LoadStats::default(),
            clock: Clock::new(),
            env_map: None,
            env_slot: None,
            model_slot: None,
            shift: false,
        }
    }

    /// Starts the environment and model loads in the background.
    pub fn start_loading(&mut self, spawner: &Spawner) {
        let source = AssetSource::new(self.config.asset_root.clone());

        let faces = self.config.environment_faces.to_vec();
        let env_source = source.clone();
        self.attach_environment(spawner.load("environment map", async move {
            env_source.load_cube_map(&faces).await
        }));

        let path = self.config.model_path.clone();
        self.attach_model(spawner.load("model", async move {
            let mut reported = None;
            load_model_gltf(&source, &path, move |progress: Progress| {
                let percent = (progress.fraction() * 100.0).round() as u32;
                if reported != Some(percent) {
                    reported = Some(percent);
                    log::info!("{}% loaded", percent);
                }
            })
            .await
        }));
    }

    pub fn attach_environment(&mut self, slot: AssetSlot<Arc<CubeMap>>) {
        self.env_slot = Some(slot);
    }

    pub fn attach_model(&mut self, slot: AssetSlot<LoadedModel>) {
        self.model_slot = Some(slot);
    }

    pub fn env_map(&self) -> Option<&Arc<CubeMap>> {
        self.env_map.as_ref()
    }

    pub fn model(&self) -> Option<NodeId> {
        self.handles.model
    }

    /// Applies loads that finished since the last call. Each outcome is seen once.
    pub fn poll_assets(&mut self) {
        if let Some(outcome) = self.env_slot.as_mut().and_then(AssetSlot::poll) {
            match outcome {
                Ok(env) => {
                    self.stats.succeeded += 1;
                    self.on_environment_loaded(env);
                }
                Err(e) => self.on_load_failed("environment map", &e),
            }
        }
        if let Some(outcome) = self.model_slot.as_mut().and_then(AssetSlot::poll) {
            match outcome {
                Ok(model) => {
                    self.stats.succeeded += 1;
                    self.on_model_loaded(model);
                }
                Err(e) => self.on_load_failed("model", &e),
            }
        }
    }

    fn on_load_failed(&mut self, what: &str, error: &crate::resources::AssetLoadError) {
        self.stats.failed += 1;
        log::error!("failed to load the {}: {}", what, error);
    }

    pub fn on_environment_loaded(&mut self, env: Arc<CubeMap>) {
        log::info!("environment map loaded ({0}x{0} faces)", env.size());
        self.scene.background = Some(Arc::clone(&env));
        if self.handles.model.is_some() {
            update_all_materials(&mut self.scene, &env, self.config.env_map_intensity);
        }
        self.env_map = Some(env);
    }

    pub fn on_model_loaded(&mut self, model: LoadedModel) {
        if self.handles.model.is_some() {
            log::warn!("a model is already in the scene, ignoring {}", model.root.name);
            return;
        }
        let LoadedModel { root, animations } = model;
        let id = assembly::attach_model(&mut self.scene, root, &self.config);
        self.handles.model = Some(id);

        if let Some(env) = &self.env_map {
            update_all_materials(&mut self.scene, env, self.config.env_map_intensity);
        }
        if !animations.is_empty() {
            if let Some(mixer) = AnimationMixer::new(animations, &self.scene, id) {
                self.animation.bind(mixer);
            }
        }
        assembly::bind_model_slider(&mut self.panel);
        log::info!("model added to the scene");
    }

    /// Applies a new viewport size. Zero-sized viewports are ignored.
    ///
    /// Returns whether anything changed.
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        device_pixel_ratio: f64,
        renderer: &mut dyn FrameRenderer,
    ) -> bool {
        let viewport = Viewport::new(width, height, device_pixel_ratio, self.config.max_pixel_ratio);
        if viewport.is_empty() {
            return false;
        }
        self.projection.resize(width, height);
        self.viewport = viewport;
        renderer.resize(&self.viewport);
        true
    }

    /// One frame: poll loads, move the camera, advance animations, render.
    pub fn tick(&mut self, renderer: &mut dyn FrameRenderer, now: Instant) -> anyhow::Result<()> {
        self.poll_assets();
        self.controls.update(&mut self.camera);
        let dt = self.clock.delta(now);
        self.animation.step(dt, &mut self.scene);
        renderer.render(&self.scene, &self.camera, &self.projection)
    }

    /// Routes input to the debug panel (keyboard) and the orbit controls (pointer).
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift = modifiers.state().shift_key();
                false
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(*code),
            _ => {
                let (_, height) = self.viewport.surface_size();
                self.controls.handle_window_event(event, height as f32)
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        let mut panel = std::mem::take(&mut self.panel);
        let consumed = panel.handle_key(key, self.shift, self);
        self.panel = panel;
        consumed
    }

    /// Sets the slider labelled `label` as if it had been dragged to `value`.
    pub fn set_slider(&mut self, label: &str, value: f32) -> Result<f32, PanelError> {
        let mut panel = std::mem::take(&mut self.panel);
        let result = panel.set(label, value, self);
        self.panel = panel;
        result
    }

    pub fn slider_value(&self, label: &str) -> Result<f32, PanelError> {
        self.panel.get(label, self)
    }
}

fn light_mut(scene: &mut Scene, id: NodeId) -> Option<&mut Node> {
    scene
        .find_mut(id)
        .filter(|node| matches!(node.kind, NodeKind::DirectionalLight(_)))
}

impl Bindable for SceneContext {
    fn read(&self, target: Tunable) -> Option<f32> {
        match target {
            Tunable::ModelRotationY => self
                .handles
                .model
                .and_then(|id| self.scene.find(id))
                .map(|node| node.transform.rotation_y()),
            _ => {
                let node = self.scene.find(self.handles.directional_light)?;
                match (target, &node.kind) {
                    (Tunable::LightIntensity, NodeKind::DirectionalLight(light)) => {
                        Some(light.intensity)
                    }
                    (Tunable::LightPositionX, _) => Some(node.transform.position.x),
                    (Tunable::LightPositionY, _) => Some(node.transform.position.y),
                    (Tunable::LightPositionZ, _) => Some(node.transform.position.z),
                    _ => None,
                }
            }
        }
    }

    fn write(&mut self, target: Tunable, value: f32) -> bool {
        let node = match (target, self.handles.model) {
            (Tunable::ModelRotationY, Some(model)) => self.scene.find_mut(model),
            (Tunable::ModelRotationY, None) => None,
            _ => light_mut(&mut self.scene, self.handles.directional_light),
        };
        let Some(node) = node else {
            return false;
        };
        match target {
            Tunable::ModelRotationY => node.transform.set_rotation_y(value),
            Tunable::LightIntensity => {
                if let NodeKind::DirectionalLight(light) = &mut node.kind {
                    light.intensity = value;
                }
            }
            Tunable::LightPositionX => node.transform.position.x = value,
            Tunable::LightPositionY => node.transform.position.y = value,
            Tunable::LightPositionZ => node.transform.position.z = value,
        }
        true
    }
}

pub(crate) enum ViewerEvent {
    #[allow(dead_code)]
    Initialized(anyhow::Result<GpuRenderer>),
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<ViewerEvent>,
    scene: SceneContext,
    renderer: Option<GpuRenderer>,
    window_requested: bool,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        let viewport = Viewport::new(1, 1, 1.0, config.max_pixel_ratio);
        let mut scene = SceneContext::new(config, viewport);

        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        #[cfg(not(target_arch = "wasm32"))]
        let spawner = Spawner::new(async_runtime.handle().clone());
        #[cfg(target_arch = "wasm32")]
        let spawner = Spawner::new();
        scene.start_loading(&spawner);

        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            scene,
            renderer: None,
            window_requested: false,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("stopping: {:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn install_renderer(&mut self, event_loop: &ActiveEventLoop, renderer: anyhow::Result<GpuRenderer>) {
        let mut renderer = match renderer {
            Ok(renderer) => renderer,
            Err(e) => return self.fail(event_loop, e),
        };
        let window = renderer.context().window.clone();
        let scale_factor = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale_factor);
        self.scene.resize(
            logical.width.round() as u32,
            logical.height.round() as u32,
            scale_factor,
            &mut renderer,
        );
        renderer.request_redraw();
        self.renderer = Some(renderer);
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_requested {
            return;
        }
        self.window_requested = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("envmap-viewer");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&self.scene.config.canvas_id));
            match canvas {
                Some(canvas) => {
                    window_attributes =
                        window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => {
                    let id = self.scene.config.canvas_id.clone();
                    return self.fail(event_loop, anyhow::anyhow!("no canvas with id {id:?}"));
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        let clear_colour = self.scene.config.clear_colour;
        let shadow_map_size = self.scene.config.shadow.map_size;
        let init = async move {
            let ctx = Context::new(window, clear_colour).await?;
            GpuRenderer::new(ctx, shadow_map_size)
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let renderer = self.async_runtime.block_on(init);
            self.install_renderer(event_loop, renderer);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let renderer = init.await;
                if proxy.send_event(ViewerEvent::Initialized(renderer)).is_err() {
                    log::error!("event loop closed before the renderer was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(renderer) => self.install_renderer(event_loop, renderer),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let scale_factor = renderer.context().window.scale_factor();
                let logical = size.to_logical::<f64>(scale_factor);
                self.scene.resize(
                    logical.width.round() as u32,
                    logical.height.round() as u32,
                    scale_factor,
                    renderer,
                );
            }
            WindowEvent::RedrawRequested => match self.scene.tick(renderer, Instant::now()) {
                Ok(()) => renderer.request_redraw(),
                Err(e) => self.fail(event_loop, e),
            },
            event => {
                self.scene.handle_window_event(&event);
            }
        }
    }
}

/// Opens the viewer and blocks until its window is closed or rendering fails.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
