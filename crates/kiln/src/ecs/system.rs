//! # Systems and the per-phase schedule
//!
//! A system is a plain function over the [`World`]. There are two shapes:
//!
//! - [`OnceSystem`] `FnMut(&mut World) -> SystemResult`, for startup and
//!   shutdown.
//! - [`TimedSystem`] `FnMut(&mut World, f32) -> SystemResult`, for fixed and
//!   variable updates; the `f32` is the step in seconds.
//!
//! A [`SystemDescriptor`] pairs a callable with its [`Phase`]. Build one with
//! [`startup`], [`fixed_update`], [`update`] or [`shutdown`] and hand it to
//! [`App::add_system`](crate::app::App::add_system).
//!
//! ## Design: one schedule per phase
//!
//! The app keeps four [`Schedule`]s and runs them like this:
//!
//! ```text
//! startup        once, before the loop
//! fixed_update   0..n times per frame, dt = fixed step
//! update         once per frame, dt = frame time
//! shutdown       once, after the loop
//! ```
//!
//! Inside a schedule, systems run strictly in registration order. There is
//! no dependency graph and no parallelism: every system gets `&mut World`.
//! A failing system is reported as a [`SystemFailure`] carrying its name,
//! which defaults to the function's short type name.
//!
//! ## Comparison
//!
//! bevy_ecs derives system parameters from function signatures and runs
//! systems in parallel. Here a system is just a closure over the whole world,
//! which trades parallelism for a scheduler that fits on one screen.

use std::fmt;

use super::world::World;
use crate::error::Error;

/// What every system returns. `?` works on anything convertible into
/// [`Error`].
pub type SystemResult = Result<(), Error>;

/// When a system runs. See the module docs for the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Startup,
    FixedUpdate,
    Update,
    Shutdown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Startup => "startup",
            Phase::FixedUpdate => "fixed update",
            Phase::Update => "update",
            Phase::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// A system that runs once and gets no time step.
pub trait OnceSystem: 'static {
    fn run(&mut self, world: &mut World) -> SystemResult;
}

impl<F: FnMut(&mut World) -> SystemResult + 'static> OnceSystem for F {
    fn run(&mut self, world: &mut World) -> SystemResult {
        self(world)
    }
}

/// A system that runs per tick or frame with a step in seconds.
pub trait TimedSystem: 'static {
    fn run(&mut self, world: &mut World, dt: f32) -> SystemResult;
}

impl<F: FnMut(&mut World, f32) -> SystemResult + 'static> TimedSystem for F {
    fn run(&mut self, world: &mut World, dt: f32) -> SystemResult {
        self(world, dt)
    }
}

pub(crate) enum Callable {
    Once(Box<dyn OnceSystem>),
    Timed(Box<dyn TimedSystem>),
}

/// A system tagged with the phase it runs in.
pub struct SystemDescriptor {
    phase: Phase,
    name: String,
    callable: Callable,
}

impl SystemDescriptor {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Name used in logs and failures.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn once<S: OnceSystem>(phase: Phase, system: S) -> Self {
        Self {
            phase,
            name: short_type_name(std::any::type_name::<S>()),
            callable: Callable::Once(Box::new(system)),
        }
    }

    fn timed<S: TimedSystem>(phase: Phase, system: S) -> Self {
        Self {
            phase,
            name: short_type_name(std::any::type_name::<S>()),
            callable: Callable::Timed(Box::new(system)),
        }
    }

    /// Override the name shown in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn run(&mut self, world: &mut World, dt: f32) -> SystemResult {
        match &mut self.callable {
            Callable::Once(system) => system.run(world),
            Callable::Timed(system) => system.run(world, dt),
        }
    }
}

impl fmt::Debug for SystemDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDescriptor")
            .field("phase", &self.phase)
            .field("name", &self.name)
            .finish()
    }
}

/// Runs once before the main loop.
pub fn startup<F>(system: F) -> SystemDescriptor
where
    F: FnMut(&mut World) -> SystemResult + 'static,
{
    SystemDescriptor::once(Phase::Startup, system)
}

/// Runs once after the main loop.
pub fn shutdown<F>(system: F) -> SystemDescriptor
where
    F: FnMut(&mut World) -> SystemResult + 'static,
{
    SystemDescriptor::once(Phase::Shutdown, system)
}

/// Runs zero or more times per frame with the fixed step as `dt`.
pub fn fixed_update<F>(system: F) -> SystemDescriptor
where
    F: FnMut(&mut World, f32) -> SystemResult + 'static,
{
    SystemDescriptor::timed(Phase::FixedUpdate, system)
}

/// Runs once per frame with the measured frame time as `dt`.
pub fn update<F>(system: F) -> SystemDescriptor
where
    F: FnMut(&mut World, f32) -> SystemResult + 'static,
{
    SystemDescriptor::timed(Phase::Update, system)
}

/// A failed system together with the name it was registered under.
#[derive(Debug)]
pub struct SystemFailure {
    /// Name of the failing system.
    pub system: String,
    pub error: Error,
}

impl fmt::Display for SystemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system `{}` failed: {}", self.system, self.error)
    }
}

/// Systems of one phase, in registration order.
#[derive(Default)]
pub struct Schedule {
    systems: Vec<SystemDescriptor>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `system`. It runs after everything already in the schedule.
    pub fn push(&mut self, system: SystemDescriptor) {
        self.systems.push(system);
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// System names in run order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|s| s.name.as_str())
    }

    /// Run every system in order and stop at the first failure. Systems
    /// after the failing one do not run.
    pub fn run(&mut self, world: &mut World, dt: f32) -> Result<(), SystemFailure> {
        for system in &mut self.systems {
            log::trace!("running {} system `{}`", system.phase, system.name);
            system.run(world, dt).map_err(|error| SystemFailure {
                system: system.name.clone(),
                error,
            })?;
        }
        Ok(())
    }

    /// Run every system even if some fail, returning all failures in order.
    /// Used for shutdown, where every teardown should get its chance.
    pub fn run_all(&mut self, world: &mut World, dt: f32) -> Vec<SystemFailure> {
        let mut failures = Vec::new();
        for system in &mut self.systems {
            if let Err(error) = system.run(world, dt) {
                failures.push(SystemFailure {
                    system: system.name.clone(),
                    error,
                });
            }
        }
        failures
    }
}

/// Last path segment of a type name, `<closure>` for closures, generic
/// arguments dropped: `kiln::render2d::begin_frame<B>` becomes `begin_frame`.
pub(crate) fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    let name = base.rsplit("::").next().unwrap_or(base);
    if base.contains("{{closure}}") || name.is_empty() {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}
