//! Convenience re-exports. `use kiln::prelude::*` for the common items.

pub use crate::app::{App, AppState, Plugin};
pub use crate::config::AppConfig;
pub use crate::ecs::{
    Entity, Phase, SystemResult, World, fixed_update, shutdown, startup, update,
};
pub use crate::error::{Error, Result};
pub use crate::logging::{LoggingConfig, init_logging};
pub use crate::math::{Mat4, Vec2, Vec4};
pub use crate::render2d::{MAX_QUADS, Quad, Renderer2dPlugin};
pub use crate::time::Time;
pub use crate::window::{KeyCode, WindowContext, WindowCreationInfo, WindowPlugin, WindowSignal};
