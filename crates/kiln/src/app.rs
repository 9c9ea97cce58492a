//! App builder, plugins and the main loop.
//!
//! ```ignore
//! use kiln::prelude::*;
//!
//! fn main() {
//!     let mut app = App::new();
//!     app.add_plugin(Renderer2dPlugin::new(WindowPlugin::new(info, handle_events)))
//!         .add_system(startup(setup))
//!         .add_system(fixed_update(bounce));
//!     app.run();
//! }
//! ```
//!
//! ## Loop
//!
//! ```text
//! startup systems (once)
//! while running:
//!     elapsed = clock delta
//!     accumulator += elapsed
//!     while accumulator >= step: fixed systems(step); accumulator -= step
//!     update systems(elapsed)
//! shutdown systems (once)
//! ```
//!
//! A failing system stops the loop; the shutdown phase still runs so
//! resources acquired during startup are released. A failing plugin clears
//! [`AppState::can_run`] and `run` then does nothing at all.

use crate::ecs::{Phase, Schedule, SystemDescriptor, World, short_type_name};
use crate::error::Result;
use crate::time::{FixedTimestep, SystemClock, Time, TimeSource};

/// Default fixed-update rate.
pub const DEFAULT_FIXED_TIME_STEP: f32 = 1.0 / 60.0;

/// Loop control flags, stored as a resource so systems can stop the app.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppState {
    /// Set by `run` before the loop. Clear it from a system to quit after the
    /// current frame.
    pub running: bool,
    /// False once a plugin failed to build. `run` then returns immediately.
    pub can_run: bool,
    /// Seconds per fixed-update tick.
    pub fixed_time_step: f32,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            running: false,
            can_run: true,
            fixed_time_step: DEFAULT_FIXED_TIME_STEP,
        }
    }
}

/// Installs resources and systems into an [`App`].
///
/// `build` consumes the plugin so it can move owned callbacks into systems.
pub trait Plugin {
    fn build(self, app: &mut App) -> Result<()>;
}

/// The world, one schedule per phase and the clock that drives the loop.
pub struct App {
    world: World,
    startup: Schedule,
    fixed_update: Schedule,
    update: Schedule,
    shutdown: Schedule,
    clock: Box<dyn TimeSource>,
}

impl App {
    /// Empty app with [`AppState`] and [`Time`] registered and the system
    /// clock.
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(AppState::default());
        world.insert_resource(Time::new());
        Self {
            world,
            startup: Schedule::new(),
            fixed_update: Schedule::new(),
            update: Schedule::new(),
            shutdown: Schedule::new(),
            clock: Box::new(SystemClock::new()),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Copy of the current [`AppState`]. Reads as not runnable if a system
    /// removed the resource.
    pub fn state(&self) -> AppState {
        self.world
            .get_resource::<AppState>()
            .copied()
            .unwrap_or(AppState {
                can_run: false,
                ..AppState::default()
            })
    }

    /// Seconds per fixed-update tick.
    pub fn set_fixed_time_step(&mut self, seconds: f32) -> &mut Self {
        self.world.resource_mut::<AppState>().fixed_time_step = seconds;
        self
    }

    /// Replace the clock driving the loop.
    pub fn set_clock(&mut self, clock: impl TimeSource + 'static) -> &mut Self {
        self.clock = Box::new(clock);
        self
    }

    /// Append a system to the schedule of its phase.
    pub fn add_system(&mut self, system: SystemDescriptor) -> &mut Self {
        log::debug!("adding {} system `{}`", system.phase(), system.name());
        self.schedule_mut(system.phase()).push(system);
        self
    }

    /// Build `plugin` into this app. A failure is logged and disables
    /// [`run`](Self::run); construction itself carries on.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        let name = plugin_name::<P>();
        match plugin.build(self) {
            Ok(()) => log::debug!("added plugin `{name}`"),
            Err(err) => {
                log::error!("failed to add plugin `{name}`: {err}");
                if let Some(state) = self.world.get_resource_mut::<AppState>() {
                    state.can_run = false;
                }
            }
        }
        self
    }

    /// Number of systems registered for `phase`.
    pub fn system_count(&self, phase: Phase) -> usize {
        self.schedule(phase).len()
    }

    pub fn system_names(&self, phase: Phase) -> Vec<&str> {
        self.schedule(phase).names().collect()
    }

    fn schedule(&self, phase: Phase) -> &Schedule {
        match phase {
            Phase::Startup => &self.startup,
            Phase::FixedUpdate => &self.fixed_update,
            Phase::Update => &self.update,
            Phase::Shutdown => &self.shutdown,
        }
    }

    fn schedule_mut(&mut self, phase: Phase) -> &mut Schedule {
        match phase {
            Phase::Startup => &mut self.startup,
            Phase::FixedUpdate => &mut self.fixed_update,
            Phase::Update => &mut self.update,
            Phase::Shutdown => &mut self.shutdown,
        }
    }

    /// Run startup, the main loop and shutdown. Returns when a system clears
    /// [`AppState::running`] or fails.
    pub fn run(&mut self) {
        if !self.state().can_run {
            log::error!("app cannot run, a plugin failed to build");
            return;
        }

        log::info!(
            "starting app: {} startup, {} fixed, {} update, {} shutdown systems",
            self.startup.len(),
            self.fixed_update.len(),
            self.update.len(),
            self.shutdown.len()
        );

        match self.startup.run(&mut self.world, 0.0) {
            Ok(()) => self.run_loop(),
            Err(failure) => log::error!("startup aborted: {failure}"),
        }

        self.set_running(false);
        for failure in self.shutdown.run_all(&mut self.world, 0.0) {
            log::error!("shutdown: {failure}");
        }
        log::info!("app stopped");
    }

    fn run_loop(&mut self) {
        let step = self.state().fixed_time_step;
        if !(step.is_finite() && step > 0.0) {
            log::error!("invalid fixed time step {step}, not entering the main loop");
            return;
        }
        let mut fixed = FixedTimestep::new(step);

        self.set_running(true);
        let mut last = self.clock.now();

        while self.is_running() {
            let now = self.clock.now();
            let delta = now.saturating_sub(last);
            last = now;
            let elapsed = delta.as_secs_f32();

            let ticks = fixed.accumulate(elapsed);
            if let Some(time) = self.world.get_resource_mut::<Time>() {
                time.advance(delta);
                time.record_fixed_ticks(ticks);
            }

            for _ in 0..ticks {
                if let Err(failure) = self.fixed_update.run(&mut self.world, step) {
                    log::error!("fixed update: {failure}");
                    return;
                }
            }
            if !self.is_running() {
                break;
            }

            if let Err(failure) = self.update.run(&mut self.world, elapsed) {
                log::error!("update: {failure}");
                return;
            }
            log::trace!("frame done: {elapsed:.5}s, {ticks} fixed ticks");
        }
    }

    fn is_running(&self) -> bool {
        self.world
            .get_resource::<AppState>()
            .is_some_and(|state| state.running)
    }

    fn set_running(&mut self, running: bool) {
        if let Some(state) = self.world.get_resource_mut::<AppState>() {
            state.running = running;
        }
    }
}

/// `Renderer2dPlugin` rather than its full path with closure types.
fn plugin_name<P>() -> String {
    short_type_name(std::any::type_name::<P>())
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
