//! glam re-exports, so users don't need to depend on it directly.

pub use glam::{Mat4, Vec2, Vec4};
