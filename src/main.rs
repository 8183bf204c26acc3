use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::info;
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use portal_scene::{
    DebugPanel, FrameLoop, OrbitCamera, Renderer, SceneAssets, SceneBundle, SceneMaterials,
    Viewport,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let bundle = SceneBundle::open(&options.path)
        .with_context(|| format!("failed to open bundle {}", options.path))?;
    let assets = SceneAssets::load(&bundle).context("failed to load scene assets")?;

    println!(
        "Loaded scene with {} nodes ({} fireflies)",
        assets.bound.nodes.len(),
        assets.fireflies.len()
    );
    for node in &assets.bound.nodes {
        println!(" - {} ({})", node.node.name, node.material.label());
    }

    if options.summary_only {
        print_summary(&assets);
        return Ok(());
    }

    match run_interactive(&assets) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                print_summary(&assets);
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn print_summary(assets: &SceneAssets) {
    println!("Scene summary:");
    println!(" baked map: {}", assets.bound.baked_texture);
    for (node, mesh) in assets.bound.nodes.iter().zip(assets.meshes.iter()) {
        println!(
            " - {} material={} vertices={} triangles={}",
            node.node.name,
            node.material.label(),
            mesh.vertex_count(),
            mesh.indices.len() / 3
        );
    }
}

fn run_interactive(assets: &SceneAssets) -> Result<()> {
    // Event loop construction panics on headless hosts; turn that into a
    // recoverable error so the caller can fall back to the summary path.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(assets);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.last_error.take() {
        return Err(err);
    }
    info!("exited after {} frames", app.frame_loop.frames());
    Ok(())
}

struct App<'a> {
    assets: &'a SceneAssets,
    renderer: Option<Renderer>,
    panel: Option<DebugPanel>,
    viewport: Viewport,
    camera: OrbitCamera,
    materials: SceneMaterials,
    frame_loop: FrameLoop,
    last_update: Instant,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    last_error: Option<anyhow::Error>,
}

impl<'a> App<'a> {
    fn new(assets: &'a SceneAssets) -> Self {
        Self {
            assets,
            renderer: None,
            panel: None,
            viewport: Viewport::default(),
            camera: OrbitCamera::default(),
            materials: SceneMaterials::default(),
            frame_loop: FrameLoop::new(),
            last_update: Instant::now(),
            dragging: false,
            cursor: None,
            last_error: None,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("Portal Scene")
                        .with_inner_size(LogicalSize::new(1280.0, 720.0)),
                )
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        let size = window.inner_size();
        let scale_factor = window.scale_factor();
        self.viewport.resize(size.width, size.height);
        self.viewport.set_scale_factor(scale_factor);

        let renderer = block_on(Renderer::new(Arc::clone(&window), self.assets))?;
        self.panel = Some(DebugPanel::new(&window, scale_factor as f32));
        self.renderer = Some(renderer);
        self.last_update = Instant::now();
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        self.camera.update(dt);

        let view_proj = self.camera.view_projection(self.viewport.aspect());
        let camera_pos = self.camera.position();
        self.materials.set_pixel_ratio(self.viewport.pixel_ratio());

        let panel_frame = self
            .panel
            .as_mut()
            .map(|panel| panel.frame(renderer.window(), self.viewport.size()));
        let mut egui_draw = None;
        if let Some(frame) = panel_frame {
            if let Some(color) = frame.clear_color {
                renderer.set_clear_color(color);
            }
            egui_draw = Some(frame.draw);
        }

        self.frame_loop
            .run_frame(&mut self.materials, |materials| {
                match renderer.render(materials, view_proj, camera_pos, egui_draw) {
                    Ok(()) => Ok(()),
                    Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                        let size = renderer.window().inner_size();
                        renderer.resize(size);
                        Ok(())
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => Err(anyhow!("GPU is out of memory")),
                    Err(wgpu::SurfaceError::Timeout) => {
                        info!("surface timeout; retrying next frame");
                        Ok(())
                    }
                    Err(wgpu::SurfaceError::Other) => Err(anyhow!("surface error")),
                }
            })
    }

    fn handle_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> Result<()> {
        // Let the panel claim pointer events that land on it.
        let consumed = match (self.panel.as_mut(), self.renderer.as_ref()) {
            (Some(panel), Some(renderer)) => panel.handle_event(renderer.window(), &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
                self.viewport.resize(size.width, size.height);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.viewport.set_scale_factor(scale_factor);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    match event.logical_key {
                        Key::Named(NamedKey::Escape) => event_loop.exit(),
                        Key::Character(ref ch) if ch.as_str() == "h" => {
                            if let Some(panel) = self.panel.as_mut() {
                                panel.toggle();
                            }
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left && !consumed {
                    self.dragging = state == ElementState::Pressed;
                }
                if state == ElementState::Released && button == MouseButton::Left {
                    self.dragging = false;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.dragging && !consumed {
                    if let Some(last) = self.cursor {
                        let dx = (position.x - last.x) as f32;
                        let dy = (position.y - last.y) as f32;
                        self.camera.rotate(dx, dy);
                    }
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !consumed {
                    let amount = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 60.0,
                    };
                    self.camera.zoom(amount);
                }
            }
            WindowEvent::RedrawRequested => self.redraw()?,
            _ => {}
        }
        Ok(())
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(err) = self.init_window(event_loop) {
            self.last_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let ours = self
            .renderer
            .as_ref()
            .map(|renderer| renderer.window_id() == window_id)
            .unwrap_or(false);
        if !ours {
            return;
        }
        if let Err(err) = self.handle_window_event(event_loop, event) {
            self.last_error = Some(err);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window().request_redraw();
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct CliOptions {
    path: String,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!("Usage: portal-scene <scene.pscn> [--summary-only]"));
        };
        let mut summary_only = false;
        for arg in args {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}. Expected --summary-only"));
                }
            }
        }
        Ok(Self { path, summary_only })
    }
}
