//! Segmented shader files (`.qsh`).
//!
//! One file holds both pipeline stages:
//!
//! ```text
//! #version wgsl
//! #segment vertex
//! ...vertex stage...
//! #segment fragment
//! ...fragment stage...
//! ```
//!
//! The first line must be the `#version` directive. The two segments may come
//! in either order; each runs from the end of its directive to the start of
//! the other directive or the end of the file. Every stage is compiled as its
//! own WGSL module, so each segment must declare what it uses. The version
//! line is kept at the top of each stage as a comment, which keeps compiler
//! line numbers one-to-one with the segment plus one.

use std::path::{Path, PathBuf};

use crate::error::{ShaderError, ShaderStage};

const VERSION_DIRECTIVE: &str = "#version";
const VERTEX_DIRECTIVE: &str = "#segment vertex";
const FRAGMENT_DIRECTIVE: &str = "#segment fragment";
const SUPPORTED_VERSION: &str = "wgsl";

/// Entry points every stage must define.
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// A parsed `.qsh` file: one source per stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentedShader {
    path: PathBuf,
    version: String,
    vertex: String,
    fragment: String,
}

impl SegmentedShader {
    /// Read and parse `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ShaderError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Split `text` into stages. `path` is only used for error messages.
    pub fn parse(path: impl AsRef<Path>, text: &str) -> Result<Self, ShaderError> {
        let path = path.as_ref().to_path_buf();
        if !text.starts_with(VERSION_DIRECTIVE) {
            return Err(ShaderError::MissingVersion(path));
        }

        let (version_line, body) = text.split_once('\n').unwrap_or((text, ""));
        let version_line = version_line.trim_end_matches('\r');
        let tag = version_line[VERSION_DIRECTIVE.len()..].trim();
        if tag != SUPPORTED_VERSION {
            return Err(ShaderError::UnsupportedVersion {
                path,
                version: tag.to_string(),
            });
        }

        let Some(vertex_at) = body.find(VERTEX_DIRECTIVE) else {
            return Err(ShaderError::MissingSegment {
                path,
                stage: ShaderStage::Vertex,
            });
        };
        let Some(fragment_at) = body.find(FRAGMENT_DIRECTIVE) else {
            return Err(ShaderError::MissingSegment {
                path,
                stage: ShaderStage::Fragment,
            });
        };

        let vertex_start = vertex_at + VERTEX_DIRECTIVE.len();
        let fragment_start = fragment_at + FRAGMENT_DIRECTIVE.len();
        let (vertex, fragment) = if vertex_at < fragment_at {
            (&body[vertex_start..fragment_at], &body[fragment_start..])
        } else {
            (&body[vertex_start..], &body[fragment_start..vertex_at])
        };

        let header = format!("// {version_line}");
        Ok(Self {
            path,
            version: version_line.to_string(),
            vertex: format!("{header}{vertex}"),
            fragment: format!("{header}{fragment}"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `#version` line as written in the file.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn stage_source(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    /// Compile both stages, vertex first. Validation errors are captured
    /// with an error scope per stage instead of reaching the device's
    /// uncaptured-error handler.
    pub fn compile(&self, device: &wgpu::Device) -> Result<CompiledShader, ShaderError> {
        Ok(CompiledShader {
            vertex: self.compile_stage(device, ShaderStage::Vertex)?,
            fragment: self.compile_stage(device, ShaderStage::Fragment)?,
        })
    }

    fn compile_stage(
        &self,
        device: &wgpu::Device,
        stage: ShaderStage,
    ) -> Result<wgpu::ShaderModule, ShaderError> {
        let label = format!("{} ({stage})", self.path.display());
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(self.stage_source(stage).into()),
        });
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(ShaderError::Compile {
                path: self.path.clone(),
                stage,
                message: err.to_string(),
            }),
            None => Ok(module),
        }
    }

    /// Run `create` (pipeline creation) inside an error scope and report a
    /// validation failure as a link error.
    pub fn link<T>(&self, device: &wgpu::Device, create: impl FnOnce() -> T) -> Result<T, ShaderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let linked = create();
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(ShaderError::Link {
                path: self.path.clone(),
                message: err.to_string(),
            }),
            None => Ok(linked),
        }
    }
}

/// GPU modules for both stages of a [`SegmentedShader`].
pub struct CompiledShader {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "#version wgsl\n#segment vertex\nvertex body\n#segment fragment\nfragment body\n";

    #[test]
    fn splits_segments_in_file_order() {
        let shader = SegmentedShader::parse("basic.qsh", BASIC).unwrap();
        assert_eq!(shader.version(), "#version wgsl");
        assert_eq!(
            shader.stage_source(ShaderStage::Vertex),
            "// #version wgsl\nvertex body\n"
        );
        assert_eq!(
            shader.stage_source(ShaderStage::Fragment),
            "// #version wgsl\nfragment body\n"
        );
    }

    #[test]
    fn splits_segments_in_reverse_order() {
        let text = "#version wgsl\r\n#segment fragment\nF\n#segment vertex\nV";
        let shader = SegmentedShader::parse("rev.qsh", text).unwrap();
        assert_eq!(shader.stage_source(ShaderStage::Vertex), "// #version wgsl\nV");
        assert_eq!(shader.stage_source(ShaderStage::Fragment), "// #version wgsl\nF\n");
    }

    #[test]
    fn missing_fragment_segment_names_fragment() {
        let text = "#version wgsl\n#segment vertex\nV\n";
        let err = SegmentedShader::parse("only_vertex.qsh", text).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::MissingSegment {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        let message = err.to_string();
        assert!(message.contains("fragment"));
        assert!(message.contains("only_vertex.qsh"));
    }

    #[test]
    fn missing_vertex_segment_names_vertex() {
        let text = "#version wgsl\n#segment fragment\nF\n";
        let err = SegmentedShader::parse("f.qsh", text).unwrap_err();
        assert_eq!(err.to_string(), "(f.qsh): no vertex segment is provided");
    }

    #[test]
    fn version_is_checked_before_segments() {
        let text = "#segment vertex\nV\n#segment fragment\nF\n";
        let err = SegmentedShader::parse("nover.qsh", text).unwrap_err();
        assert!(matches!(err, ShaderError::MissingVersion(_)));

        let err = SegmentedShader::parse("empty.qsh", "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "(empty.qsh): expected shader version at the first line of the file"
        );
    }

    #[test]
    fn only_wgsl_is_accepted() {
        let text = "#version 460 core\n#segment vertex\nV\n#segment fragment\nF\n";
        let err = SegmentedShader::parse("glsl.qsh", text).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::UnsupportedVersion { ref version, .. } if version == "460 core"
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SegmentedShader::load("/no/such/shader.qsh").unwrap_err();
        assert_eq!(
            err.to_string(),
            "can't read a non-existent shader file '/no/such/shader.qsh'"
        );
    }

    #[test]
    fn bundled_shader_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/shaders/basic.qsh");
        let shader = SegmentedShader::load(path).unwrap();
        assert!(shader.stage_source(ShaderStage::Vertex).contains(VERTEX_ENTRY));
        assert!(shader.stage_source(ShaderStage::Fragment).contains(FRAGMENT_ENTRY));
    }
}
