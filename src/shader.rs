//! # Shader Module
//!
//! The shader program is treated as an opaque unit described by a [`ShaderDescriptor`]: a
//! label, the WGSL source and the names of its two entry points. Compiling a descriptor yields
//! a [`ShaderProgram`], which is the only thing the pipeline builder accepts.
//!
//! The crate ships one program, [`CORNELL_SHADER`], whose source lives in `shader.wgsl`. Its
//! interface is fixed:
//!
//! - vertex inputs at locations 0, 1 and 2 (`position`, `normal`, `color`, all `vec3<f32>`),
//!   matching [`crate::Vertex::vertex_attributes`];
//! - one uniform block at group 0, binding 0, matching [`crate::FrameUniforms`].

use std::borrow::Cow;

/// Description of a WGSL program with one vertex and one fragment entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderDescriptor {
    pub label: &'static str,
    pub source: &'static str,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
}

/// The Cornell box shading program.
pub const CORNELL_SHADER: ShaderDescriptor = ShaderDescriptor {
    label: "Cornell Box Shader",
    source: include_str!("shader.wgsl"),
    vertex_entry: "vertex_main",
    fragment_entry: "fragment_main",
};

/// A compiled shader module together with its entry point names.
#[derive(Debug)]
pub struct ShaderProgram {
    pub module: wgpu::ShaderModule,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
}

impl ShaderProgram {
    /// Compiles `descriptor` on `device`.
    ///
    /// `wgpu` reports WGSL errors through the device's error scopes rather than a return
    /// value; callers that need to observe them wrap this call in a validation scope.
    pub fn compile(device: &wgpu::Device, descriptor: &ShaderDescriptor) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(descriptor.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(descriptor.source)),
        });
        Self {
            module,
            vertex_entry: descriptor.vertex_entry,
            fragment_entry: descriptor.fragment_entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_declares_entry_points() {
        let source = CORNELL_SHADER.source;
        assert!(source.contains(&format!("fn {}(", CORNELL_SHADER.vertex_entry)));
        assert!(source.contains(&format!("fn {}(", CORNELL_SHADER.fragment_entry)));
    }

    #[test]
    fn source_declares_uniform_binding_and_vertex_locations() {
        let source = CORNELL_SHADER.source;
        assert!(source.contains("@group(0) @binding(0)"));
        for location in 0..3 {
            assert!(source.contains(&format!("@location({location})")));
        }
        assert!(source.contains("view_proj: mat4x4<f32>"));
        assert!(source.contains("camera_position: vec3<f32>"));
    }
}
