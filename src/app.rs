// app.rs
use std::sync::Arc;

use hecs::Entity;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::{Error, RenderError};
use crate::input::Input;
use crate::renderer::{GpuBackend, Renderer};
use crate::scene::Scene;
use crate::settings::RenderSettings;
use crate::time::FrameClock;

/// Everything an application can touch while building its scene.
pub struct StartupContext<'a> {
    pub renderer: &'a mut Renderer<GpuBackend>,
    pub scene: &'a mut Scene,
    pub settings: &'a RenderSettings,
    camera: &'a mut Option<Entity>,
}

impl StartupContext<'_> {
    /// Selects the camera the frame is rendered from.
    pub fn set_camera(&mut self, camera: Entity) {
        *self.camera = Some(camera);
    }
}

pub struct UpdateContext<'a> {
    pub renderer: &'a mut Renderer<GpuBackend>,
    pub scene: &'a mut Scene,
    pub input: &'a Input,
    pub clock: &'a FrameClock,
    camera: &'a mut Option<Entity>,
}

impl UpdateContext<'_> {
    pub fn set_camera(&mut self, camera: Entity) {
        *self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<Entity> {
        *self.camera
    }

    /// Seconds since the previous frame.
    pub fn delta_time(&self) -> f32 {
        self.clock.delta()
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }
}

/// Core trait for render applications. Implement this to define your application's behavior.
pub trait RenderApplication: 'static {
    fn name(&self) -> &str {
        "Render Application"
    }

    /// Called once, after the window and GPU backend exist.
    fn setup(&mut self, ctx: &mut StartupContext) -> Result<(), Error>;

    /// Called every frame before rendering.
    fn update(&mut self, ctx: &mut UpdateContext) -> Result<(), Error> {
        let _ = ctx;
        Ok(())
    }
}

struct App<T: RenderApplication> {
    application: T,
    settings: RenderSettings,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer<GpuBackend>>,
    scene: Scene,
    input: Input,
    clock: FrameClock,
    camera: Option<Entity>,
}

impl<T: RenderApplication> App<T> {
    fn new(application: T, settings: RenderSettings) -> Self {
        Self {
            application,
            settings,
            window: None,
            renderer: None,
            scene: Scene::new(),
            input: Input::new(),
            clock: FrameClock::new(),
            camera: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Error> {
        let attributes = Window::default_attributes()
            .with_title(self.application.name())
            .with_inner_size(PhysicalSize::new(
                self.settings.resolution.width,
                self.settings.resolution.height,
            ));
        let window = event_loop
            .create_window(attributes)
            .map(Arc::new)
            .map_err(|e| RenderError::Backend(format!("failed to create window: {e}")))?;

        let backend = pollster::block_on(GpuBackend::new(window.clone(), &self.settings))?;
        let mut renderer = Renderer::new(backend).with_clear_color(self.settings.clear_color.into());

        let mut ctx = StartupContext {
            renderer: &mut renderer,
            scene: &mut self.scene,
            settings: &self.settings,
            camera: &mut self.camera,
        };
        self.application.setup(&mut ctx)?;
        log::info!("Scene ready: {} entities", self.scene.world.len());

        self.clock = FrameClock::new();
        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
        self.resize_camera();
        Ok(())
    }

    fn frame(&mut self) -> Result<(), Error> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        self.clock.tick();
        let mut ctx = UpdateContext {
            renderer: &mut *renderer,
            scene: &mut self.scene,
            input: &self.input,
            clock: &self.clock,
            camera: &mut self.camera,
        };
        self.application.update(&mut ctx)?;
        self.input.end_frame();

        let Some(camera) = self.camera else {
            log::warn!("No camera selected, nothing to render");
            return Ok(());
        };
        renderer.render(&mut self.scene, camera)?;
        Ok(())
    }

    fn resize_camera(&mut self) {
        let (Some(renderer), Some(camera)) = (&self.renderer, self.camera) else {
            return;
        };
        let aspect = renderer.aspect_ratio();
        if let Some(mut camera) = self.scene.camera_mut(camera) {
            camera.set_aspect_ratio(aspect);
        }
    }
}

impl<T: RenderApplication> ApplicationHandler for App<T> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            log::error!("Startup failed: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.backend_mut().resize(size);
                }
                self.resize_camera();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    self.input.request_quit();
                }
                self.input.handle_key_event(&event);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    log::error!("Frame failed: {e}");
                }
                if self.input.quit_requested() {
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Opens a window and drives `application` until it quits.
pub fn run_application<T: RenderApplication>(application: T) -> Result<(), winit::error::EventLoopError> {
    crate::init_logging();
    let settings = RenderSettings::load();

    log::info!("Starting {}", application.name());

    let event_loop = EventLoop::new()?;
    let mut app = App::new(application, settings);
    let result = event_loop.run_app(&mut app);

    if let Err(ref err) = result {
        log::error!("Application error: {}", err);
    }
    log::info!("Application shutdown complete");

    result
}
