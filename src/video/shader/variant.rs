//! Compiled shader variants and the cache sharing them.

use std::rc::Rc;

use uuid::Uuid;

use crate::utils::hash::{FastHashMap, FastHashSet};

use super::super::assets::prelude::*;
use super::super::device::GraphicsDevice;
use super::super::errors::*;
use super::super::resource::GraphicsObject;
use super::include::inject_defines;
use super::keywords::{GlobalKeywords, KeywordSet};
use super::{Shader, ShaderPass};

/// A pass of a compiled variant.
#[derive(Debug)]
pub struct CompiledPass {
    pub state: RasterizerState,
    program: GraphicsObject<ProgramHandle>,
}

impl CompiledPass {
    #[inline]
    pub fn program(&self) -> ProgramHandle {
        self.program.handle()
    }
}

/// A shader compiled with one combination of keywords.
#[derive(Debug)]
pub struct ShaderVariant {
    key: String,
    shader: Uuid,
    keywords: Vec<String>,
    passes: Vec<CompiledPass>,
    shadow_pass: Option<CompiledPass>,
}

impl ShaderVariant {
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn shader(&self) -> Uuid {
        self.shader
    }

    /// The keywords defined in this variant, globals first.
    #[inline]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[inline]
    pub fn passes(&self) -> &[CompiledPass] {
        &self.passes
    }

    #[inline]
    pub fn pass(&self, index: usize) -> Option<&CompiledPass> {
        self.passes.get(index)
    }

    #[inline]
    pub fn shadow_pass(&self) -> Option<&CompiledPass> {
        self.shadow_pass.as_ref()
    }
}

/// Returns the key identifying the variant of `shader` with `local` and the
/// `globals` keywords enabled.
pub fn cache_key(shader: &Shader, local: &KeywordSet, globals: &GlobalKeywords) -> String {
    format!(
        "{}-{}-{}",
        shader.uuid(),
        local.join(),
        globals.keywords().join()
    )
}

/// The variants of every shader, keyed by `cache_key`. A combination of
/// keywords is compiled once no matter how many materials ask for it.
#[derive(Debug, Default)]
pub struct VariantCache {
    variants: FastHashMap<String, Rc<ShaderVariant>>,
    compiles: usize,
}

impl VariantCache {
    pub fn new() -> Self {
        VariantCache::default()
    }

    /// Returns the cached variant, compiling it if it is not cached yet.
    pub fn get_or_compile(
        &mut self,
        device: &mut GraphicsDevice,
        shader: &Shader,
        local: &KeywordSet,
        globals: &GlobalKeywords,
    ) -> Result<Rc<ShaderVariant>> {
        let key = cache_key(shader, local, globals);
        if let Some(v) = self.variants.get(&key) {
            return Ok(v.clone());
        }

        let mut seen = FastHashSet::default();
        let keywords: Vec<String> = globals
            .keywords()
            .iter()
            .chain(local.iter())
            .filter(|v| seen.insert(*v))
            .map(|v| v.to_owned())
            .collect();

        let passes = shader
            .passes()
            .iter()
            .map(|pass| compile_pass(device, pass, &keywords))
            .collect::<Result<Vec<_>>>()?;

        let shadow_pass = match shader.shadow_pass() {
            Some(pass) => Some(compile_pass(device, pass, &keywords)?),
            None => None,
        };

        debug!("Compiled variant {} of shader '{}'.", key, shader.name());

        let variant = Rc::new(ShaderVariant {
            key: key.clone(),
            shader: shader.uuid(),
            keywords,
            passes,
            shadow_pass,
        });

        self.compiles += 1;
        self.variants.insert(key, variant.clone());
        Ok(variant)
    }

    /// Drops every cached variant of a shader, returns how many were dropped.
    pub fn remove_shader(&mut self, uuid: Uuid) -> usize {
        let len = self.variants.len();
        self.variants.retain(|_, v| v.shader != uuid);
        len - self.variants.len()
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.variants.contains_key(key)
    }

    /// The number of variants compiled by this cache so far.
    #[inline]
    pub fn compiles(&self) -> usize {
        self.compiles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn clear(&mut self) {
        self.variants.clear();
    }
}

fn compile_pass(
    device: &mut GraphicsDevice,
    pass: &ShaderPass,
    keywords: &[String],
) -> Result<CompiledPass> {
    let mut maps = Vec::with_capacity(pass.stages.len());
    let mut sources = Vec::with_capacity(pass.stages.len());

    for stage in &pass.stages {
        let mut map = stage.map.clone();
        let source = inject_defines(&stage.source, keywords.iter().map(|v| v.as_str()), &mut map);
        sources.push(ShaderSourceDescriptor::new(stage.stage, source));
        maps.push((stage.stage, map));
    }

    match device.compile_program(&sources) {
        Ok(handle) => Ok(CompiledPass {
            state: pass.state,
            program: device.own(handle),
        }),
        Err(Error::CompileFailure { stage, log }) => {
            let log = match maps.iter().find(|v| v.0 == stage) {
                Some((_, map)) => map.remap_log(&log),
                None => log,
            };

            Err(Error::CompileFailure { stage, log })
        }
        Err(err) => Err(err),
    }
}
