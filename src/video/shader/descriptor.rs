//! The serialized form of shaders.

use crate::errors::*;

use super::super::assets::prelude::RasterizerState;

/// A render pass of a shader: the pipeline state plus the stage sources, which
/// may still contain `#include` directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassDescriptor {
    #[serde(default)]
    pub state: RasterizerState,
    pub vertex: String,
    pub fragment: String,
}

impl PassDescriptor {
    pub fn new<T1: Into<String>, T2: Into<String>>(vertex: T1, fragment: T2) -> Self {
        PassDescriptor {
            state: RasterizerState::default(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderDescriptor {
    pub name: String,
    #[serde(default)]
    pub passes: Vec<PassDescriptor>,
    #[serde(default)]
    pub shadow_pass: Option<PassDescriptor>,
}

impl ShaderDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: ShaderDescriptor = serde_json::from_str(json)?;
        if descriptor.passes.is_empty() && descriptor.shadow_pass.is_none() {
            bail!("Shader '{}' declares no passes.", descriptor.name);
        }

        Ok(descriptor)
    }
}
