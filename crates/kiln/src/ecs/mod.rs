//! Entity-component store and systems.
//!
//! Components live in archetype tables inside the [`World`]; resources are
//! per-type singletons beside them. Systems are functions over the world
//! grouped by [`Phase`].

mod archetype;
mod component;
mod entity;
mod query;
mod system;
mod world;

pub use component::{Component, ComponentColumn};
pub use entity::Entity;
pub use query::QueryParam;
pub use system::{
    OnceSystem, Phase, Schedule, SystemDescriptor, SystemFailure, SystemResult, TimedSystem,
    fixed_update, shutdown, startup, update,
};
pub use world::{SpawnBundle, World};

pub(crate) use system::short_type_name;
