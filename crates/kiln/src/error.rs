//! Error types shared by the whole framework.
//!
//! Every fallible operation returns [`Result`]. Systems return
//! [`SystemResult`](crate::ecs::SystemResult), which is the same thing with a
//! unit payload, so a system body can use `?` on anything that converts into
//! [`Error`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building or running an [`App`](crate::app::App).
#[derive(Debug, Error)]
pub enum Error {
    #[error("resource `{0}` is already registered")]
    DuplicateResource(&'static str),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("window error: {0}")]
    Window(String),

    #[error("gpu error: {0}")]
    Gpu(String),

    #[error("config error: {0}")]
    Config(String),

    /// Free-form failure reported by user systems and plugins.
    #[error("{0}")]
    System(String),
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::System(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::System(message.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shader pipeline stage, used to say which half of a `.qsh` file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures of the segmented shader loader. Every message names the file.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("can't read a non-existent shader file '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("({}): cannot read shader file: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("({}): expected shader version at the first line of the file", .0.display())]
    MissingVersion(PathBuf),

    #[error("({}): unsupported shader version '{version}', expected 'wgsl'", .path.display())]
    UnsupportedVersion { path: PathBuf, version: String },

    #[error("({}): no {stage} segment is provided", .path.display())]
    MissingSegment { path: PathBuf, stage: ShaderStage },

    #[error("({}): {stage} shader compile error!\n{message}", .path.display())]
    Compile {
        path: PathBuf,
        stage: ShaderStage,
        message: String,
    },

    #[error("({}): shader program link error!\n{message}", .path.display())]
    Link { path: PathBuf, message: String },
}
