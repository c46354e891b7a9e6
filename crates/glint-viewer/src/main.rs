//! Interactive scene viewer.
//!
//! The window and key bindings here are a thin control surface: input
//! handlers edit a staging [`SceneParameters`], and each redraw hands the
//! renderer one snapshot of it. The renderer itself never sees a value
//! change mid-frame.

mod config;

use clap::Parser;
use config::ViewerConfig;
use glint_render::{
    create_plane_mesh, Camera, EnvironmentSource, Material, RenderContext, SceneParameters,
    SceneRenderer, ShadingModel, MAX_SHADOW_LIGHTS,
};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "glint", about = "Real-time scene viewer")]
struct Args {
    /// Model file to load (.gltf / .glb)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Equirectangular HDR panorama for the environment
    #[arg(long)]
    hdr: Option<PathBuf>,

    /// Folder with right/left/top/bottom/front/back cubemap faces
    #[arg(long)]
    faces: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = "glint.toml")]
    config: PathBuf,
}

struct ViewerApp {
    args: Args,
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    context: Option<RenderContext>,
    renderer: Option<SceneRenderer>,
    camera: Camera,
    /// Staging copy the input handlers edit; snapshotted once per frame
    params: SceneParameters,
    mouse_down: bool,
    last_cursor: Option<(f64, f64)>,
}

impl ViewerApp {
    fn new(args: Args, config: ViewerConfig) -> Self {
        Self {
            args,
            config,
            window: None,
            context: None,
            renderer: None,
            camera: Camera::new(),
            params: SceneParameters::default(),
            mouse_down: false,
            last_cursor: None,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let context = match pollster::block_on(RenderContext::new(window.clone())) {
            Ok(c) => c,
            Err(e) => {
                error!("failed to create render context: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.camera.aspect = context.aspect_ratio();

        let mut renderer = SceneRenderer::new(&context);

        if let Some(resolution) = self.config.scene.shadow_resolution {
            renderer.set_shadow_resolution(&context.device, resolution);
        }

        // Ground plane so shadows land somewhere even with no model loaded
        renderer.add_mesh_asset(
            &context.device,
            "ground",
            &create_plane_mesh(25.0, -0.5, 5.0),
            Material {
                albedo_color: [0.5, 0.5, 0.5, 1.0],
                roughness_value: 0.9,
                ..Material::plain()
            },
        );

        let model = self.args.model.clone().or(self.config.scene.model.clone());
        if let Some(path) = model {
            if !renderer.load_asset(&context.device, &context.queue, &path) {
                warn!("continuing without model '{}'", path.display());
            }
        }

        let environment = match (&self.args.hdr, &self.args.faces) {
            (Some(hdr), _) => Some(EnvironmentSource::Equirectangular(hdr.clone())),
            (None, Some(faces)) => Some(EnvironmentSource::FaceFolder(faces.clone())),
            (None, None) => self
                .config
                .scene
                .environment
                .clone()
                .map(EnvironmentSource::Equirectangular)
                .or_else(|| {
                    self.config
                        .scene
                        .cubemap_folder
                        .clone()
                        .map(EnvironmentSource::FaceFolder)
                }),
        };
        if let Some(source) = environment {
            renderer.set_environment(&context.device, &context.queue, source);
        }

        self.window = Some(window);
        self.context = Some(context);
        self.renderer = Some(renderer);
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Digit1 | KeyCode::Digit2 => {
                let index = if code == KeyCode::Digit1 { 0 } else { 1 };
                if index < MAX_SHADOW_LIGHTS {
                    let light = &mut self.params.lights[index];
                    light.enabled = !light.enabled;
                    info!(
                        "light {} {}",
                        index,
                        if light.enabled { "enabled" } else { "disabled" }
                    );
                }
            }
            KeyCode::KeyM => {
                self.params.shading_model = match self.params.shading_model {
                    ShadingModel::BlinnPhong => ShadingModel::MetallicRoughness,
                    ShadingModel::MetallicRoughness => ShadingModel::BlinnPhong,
                };
                info!("shading model: {:?}", self.params.shading_model);
            }
            KeyCode::KeyH => {
                self.params.shadow.enabled = !self.params.shadow.enabled;
                info!(
                    "shadows {}",
                    if self.params.shadow.enabled { "on" } else { "off" }
                );
            }
            KeyCode::KeyB => {
                // Cycle overlay: off -> light 0 depth -> light 1 depth -> off
                self.params.debug_shadow_layer = match self.params.debug_shadow_layer {
                    None => Some(0),
                    Some(i) if i + 1 < MAX_SHADOW_LIGHTS => Some(i + 1),
                    Some(_) => None,
                };
                info!("shadow overlay: {:?}", self.params.debug_shadow_layer);
            }
            KeyCode::KeyG => {
                if let (Some(context), Some(renderer)) = (&self.context, &mut self.renderer) {
                    renderer.set_environment(
                        &context.device,
                        &context.queue,
                        EnvironmentSource::Gradient,
                    );
                }
            }
            KeyCode::KeyO => {
                self.camera.orthographic = !self.camera.orthographic;
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(context), Some(renderer)) = (&mut self.context, &mut self.renderer) else {
            return;
        };

        let frame = match context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                context.resize(context.size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory");
                event_loop.exit();
                return;
            }
            Err(e) => {
                warn!("frame skipped: {}", e);
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // One immutable snapshot per frame; input edits apply next frame
        let snapshot = self.params.clone();
        renderer.render(context, &self.camera, &snapshot, &view);
        frame.present();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            self.initialize(event_loop);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(context) = &mut self.context {
                    context.resize(new_size);
                    self.camera.aspect = context.aspect_ratio();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        if code == KeyCode::Escape {
                            event_loop.exit();
                        } else {
                            self.handle_key(code);
                        }
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_down = state == ElementState::Pressed;
                    if !self.mouse_down {
                        self.last_cursor = None;
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_down {
                    if let Some((lx, ly)) = self.last_cursor {
                        let dx = (position.x - lx) as f32;
                        let dy = (position.y - ly) as f32;
                        self.camera.orbit_horizontal(-dx * 0.01);
                        self.camera.orbit_vertical(dy * 0.01);
                    }
                    self.last_cursor = Some((position.x, position.y));
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.05,
                };
                self.camera.zoom(amount);
            }

            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let config = match ViewerConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}", e);
            ViewerConfig::default()
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            error!("failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(args, config);
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("event loop error: {}", e);
    }
}
