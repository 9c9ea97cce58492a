//! Window plugin on top of winit.
//!
//! The app owns the main loop, so instead of handing control to
//! `EventLoop::run_app` the window pumps winit from inside systems with
//! [`EventLoopExtPumpEvents::pump_app_events`]:
//!
//! - startup: [`create_window`] creates the event loop, pumps it until winit
//!   reports `resumed`, opens the window and the [`GpuContext`].
//! - update: the user's event handler calls [`WindowContext::poll_events`]
//!   and reacts to the returned [`WindowSignal`]s.
//! - shutdown: [`destroy_window`] drops the GPU context and the window.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

pub use winit::keyboard::KeyCode;

use crate::app::{App, Plugin};
use crate::ecs::{SystemResult, World, shutdown, startup, update};
use crate::error::{Error, Result};
use crate::render::GpuContext;

/// Pumps allowed before giving up on winit delivering `resumed`.
const STARTUP_PUMP_LIMIT: usize = 64;

/// Requested window title and physical size in pixels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowCreationInfo {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl WindowCreationInfo {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
        }
    }
}

impl Default for WindowCreationInfo {
    fn default() -> Self {
        Self::new("Basic 2D Renderer (wgpu)", 1280, 720)
    }
}

/// Window events the rest of the app cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowSignal {
    CloseRequested,
    KeyPressed(KeyCode),
    Resized { width: u32, height: u32 },
}

/// winit handler that collects signals between pumps.
struct Pump {
    attributes: Option<WindowAttributes>,
    window: Option<Arc<Window>>,
    error: Option<String>,
    signals: Vec<WindowSignal>,
}

impl Pump {
    fn new(attributes: WindowAttributes) -> Self {
        Self {
            attributes: Some(attributes),
            window: None,
            error: None,
            signals: Vec::new(),
        }
    }
}

impl ApplicationHandler for Pump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attributes) = self.attributes.take() else {
            return;
        };
        match event_loop.create_window(attributes) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.signals.push(WindowSignal::CloseRequested),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.signals.push(WindowSignal::KeyPressed(code));
                }
            }
            WindowEvent::Resized(size) => self.signals.push(WindowSignal::Resized {
                width: size.width,
                height: size.height,
            }),
            _ => {}
        }
    }
}

/// The open window and its event loop. Registered by [`create_window`].
pub struct WindowContext {
    window: Arc<Window>,
    event_loop: EventLoop<()>,
    pump: Pump,
}

impl WindowContext {
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Process pending events, waiting at most `timeout` for the first one.
    /// An exiting event loop is reported as [`WindowSignal::CloseRequested`].
    pub fn poll_events(&mut self, timeout: Duration) -> Vec<WindowSignal> {
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(timeout), &mut self.pump)
        {
            log::debug!("event loop exited with code {code}");
            self.pump.signals.push(WindowSignal::CloseRequested);
        }
        std::mem::take(&mut self.pump.signals)
    }
}

/// Startup system: open the window described by [`WindowCreationInfo`] and
/// register [`WindowContext`] and [`GpuContext`].
pub fn create_window(world: &mut World) -> SystemResult {
    let info = world
        .get_resource::<WindowCreationInfo>()
        .cloned()
        .ok_or_else(|| Error::Window("no WindowCreationInfo registered".to_string()))?;

    let mut event_loop =
        EventLoop::new().map_err(|e| Error::Window(format!("cannot create event loop: {e}")))?;
    let attributes = Window::default_attributes()
        .with_title(info.title.clone())
        .with_inner_size(PhysicalSize::new(info.width, info.height))
        .with_resizable(false);
    let mut pump = Pump::new(attributes);

    for _ in 0..STARTUP_PUMP_LIMIT {
        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), &mut pump)
        {
            return Err(Error::Window(format!(
                "event loop exited with code {code} before the window opened"
            )));
        }
        if let Some(e) = pump.error.take() {
            return Err(Error::Window(format!("cannot create window: {e}")));
        }
        if pump.window.is_some() {
            break;
        }
    }
    let window = pump
        .window
        .clone()
        .ok_or_else(|| Error::Window("winit never resumed, no window was created".to_string()))?;

    let gpu = GpuContext::new(window.clone())?;
    world.register_resource(gpu)?;
    world.register_resource(WindowContext {
        window,
        event_loop,
        pump,
    })?;

    log::info!("opened window '{}' ({}x{})", info.title, info.width, info.height);
    Ok(())
}

/// Shutdown system: close the window. Does nothing if it never opened.
pub fn destroy_window(world: &mut World) -> SystemResult {
    let had_gpu = world.remove_resource::<GpuContext>();
    if world.remove_resource::<WindowContext>() || had_gpu {
        log::info!("window closed");
    }
    Ok(())
}

/// Opens a window at startup and runs `event_handler` every frame.
///
/// The handler is an ordinary update system, typically polling
/// [`WindowContext::poll_events`] and clearing
/// [`AppState::running`](crate::app::AppState::running) on close.
pub struct WindowPlugin<H> {
    info: WindowCreationInfo,
    event_handler: H,
}

impl<H> WindowPlugin<H>
where
    H: FnMut(&mut World, f32) -> SystemResult + 'static,
{
    pub fn new(info: WindowCreationInfo, event_handler: H) -> Self {
        Self {
            info,
            event_handler,
        }
    }

    pub fn info(&self) -> &WindowCreationInfo {
        &self.info
    }

    /// Everything [`build`](Plugin::build) does except registering
    /// [`destroy_window`]. Plugins layered on the window use this so their
    /// own shutdown systems can run while the window still exists.
    pub(crate) fn install(self, app: &mut App) -> Result<()> {
        if self.info.width == 0 || self.info.height == 0 {
            return Err(Error::Window(format!(
                "window size must be non-zero, got {}x{}",
                self.info.width, self.info.height
            )));
        }
        app.world_mut().register_resource(self.info)?;
        app.add_system(startup(create_window));
        app.add_system(update(self.event_handler).named("window_event_handler"));
        Ok(())
    }
}

impl<H> Plugin for WindowPlugin<H>
where
    H: FnMut(&mut World, f32) -> SystemResult + 'static,
{
    fn build(self, app: &mut App) -> Result<()> {
        self.install(app)?;
        app.add_system(shutdown(destroy_window));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Phase;

    fn ignore_events(_: &mut World, _: f32) -> SystemResult {
        Ok(())
    }

    #[test]
    fn default_info_matches_demo_window() {
        let info = WindowCreationInfo::default();
        assert_eq!((info.width, info.height), (1280, 720));
        assert!(info.title.contains("2D Renderer"));
    }

    #[test]
    fn plugin_registers_info_and_three_systems() {
        let mut app = App::new();
        app.add_plugin(WindowPlugin::new(
            WindowCreationInfo::new("test", 64, 32),
            ignore_events,
        ));

        assert!(app.state().can_run);
        assert_eq!(app.world().resource::<WindowCreationInfo>().width, 64);
        assert_eq!(app.system_names(Phase::Startup), ["create_window"]);
        assert_eq!(app.system_names(Phase::Update), ["window_event_handler"]);
        assert_eq!(app.system_names(Phase::Shutdown), ["destroy_window"]);
    }

    #[test]
    fn zero_sized_window_fails_the_plugin() {
        let mut app = App::new();
        app.add_plugin(WindowPlugin::new(
            WindowCreationInfo::new("bad", 0, 10),
            ignore_events,
        ));
        assert!(!app.state().can_run);
        assert_eq!(app.system_count(Phase::Startup), 0);
    }

    #[test]
    fn second_window_plugin_is_rejected() {
        let mut app = App::new();
        app.add_plugin(WindowPlugin::new(WindowCreationInfo::default(), ignore_events));
        app.add_plugin(WindowPlugin::new(WindowCreationInfo::default(), ignore_events));
        assert!(!app.state().can_run);
    }

    #[test]
    fn destroy_without_window_is_a_no_op() {
        let mut world = World::new();
        destroy_window(&mut world).unwrap();
        destroy_window(&mut world).unwrap();
    }

    #[test]
    fn create_without_info_fails() {
        let mut world = World::new();
        let err = create_window(&mut world).unwrap_err();
        assert!(matches!(err, Error::Window(_)));
    }
}
