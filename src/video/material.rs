//! Materials: a shader, the keywords selecting its variant and the uniform
//! values fed to it.

use std::rc::Rc;

use super::errors::*;
use super::graphics::Graphics;
use super::property_block::MaterialPropertyBlock;
use super::shader::keywords::KeywordSet;
use super::shader::variant::{CompiledPass, ShaderVariant};
use super::shader::Shader;

#[derive(Debug)]
struct ResolvedVariant {
    local: u64,
    global: u64,
    variant: Rc<ShaderVariant>,
}

#[derive(Debug)]
pub struct Material {
    name: String,
    shader: Rc<Shader>,
    keywords: KeywordSet,
    properties: MaterialPropertyBlock,
    resolved: Option<ResolvedVariant>,
}

impl Material {
    pub fn new<T: Into<String>>(name: T, shader: Rc<Shader>) -> Self {
        Material {
            name: name.into(),
            shader,
            keywords: KeywordSet::new(),
            properties: MaterialPropertyBlock::new(),
            resolved: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }

    /// Switches to another shader, the resolved variant is dropped.
    pub fn set_shader(&mut self, shader: Rc<Shader>) {
        self.shader = shader;
        self.resolved = None;
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.shader.passes().len()
    }

    #[inline]
    pub fn has_shadow_pass(&self) -> bool {
        self.shader.shadow_pass().is_some()
    }

    pub fn enable_keyword(&mut self, keyword: &str) {
        self.keywords.enable(keyword);
    }

    pub fn disable_keyword(&mut self, keyword: &str) {
        self.keywords.disable(keyword);
    }

    #[inline]
    pub fn is_keyword_enabled(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    #[inline]
    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    #[inline]
    pub fn properties(&self) -> &MaterialPropertyBlock {
        &self.properties
    }

    #[inline]
    pub fn properties_mut(&mut self) -> &mut MaterialPropertyBlock {
        &mut self.properties
    }

    /// Returns the variant matching the current local and global keywords. The
    /// last resolution is reused as long as neither keyword set changed.
    pub fn variant(&mut self, gfx: &mut Graphics) -> Result<Rc<ShaderVariant>> {
        let local = self.keywords.hash_value();
        let global = gfx.globals().version();

        if let Some(ref v) = self.resolved {
            if v.local == local && v.global == global {
                return Ok(v.variant.clone());
            }
        }

        let variant = gfx.variant(&self.shader, &self.keywords)?;
        self.resolved = Some(ResolvedVariant {
            local,
            global,
            variant: variant.clone(),
        });

        Ok(variant)
    }

    /// Applies pass `index`: its rasterizer state and program. The property
    /// values are written too if `apply` is set.
    pub fn set_pass(&mut self, gfx: &mut Graphics, index: usize, apply: bool) -> Result<()> {
        let variant = self.variant(gfx)?;
        let pass = variant.pass(index).ok_or_else(|| {
            Error::OutOfBounds(format!(
                "pass {} of shader '{}' with {} passes",
                index,
                self.shader.name(),
                variant.passes().len()
            ))
        })?;

        self.bind(gfx, pass, apply)
    }

    /// Applies the shadow pass. Returns false, applying nothing, if the shader
    /// has no shadow pass.
    pub fn set_shadow_pass(&mut self, gfx: &mut Graphics, apply: bool) -> Result<bool> {
        let variant = self.variant(gfx)?;
        match variant.shadow_pass() {
            Some(pass) => {
                self.bind(gfx, pass, apply)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn bind(&mut self, gfx: &mut Graphics, pass: &CompiledPass, apply: bool) -> Result<()> {
        let device = gfx.device_mut();
        device.set_state(&pass.state, false)?;
        device.bind_program(Some(pass.program()))?;

        if apply {
            self.properties.apply(device, &self.name)?;
        }

        Ok(())
    }
}
