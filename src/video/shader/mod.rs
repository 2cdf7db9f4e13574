//! Shader assets, their keyword-driven variants and the include preprocessor.
//!
//! A `Shader` is the include-expanded form of a `ShaderDescriptor`. It is never
//! compiled as is: materials ask the `VariantCache` for the variant matching
//! their keywords plus the global keywords, which injects the keywords as
//! `#define`s and compiles every pass.

pub mod descriptor;
pub mod include;
pub mod keywords;
pub mod variant;

use std::path::Path;

use uuid::Uuid;

use super::assets::prelude::*;
use super::errors::*;

use self::descriptor::{PassDescriptor, ShaderDescriptor};
use self::include::{IncludeResolver, MemorySource, SourceMap};

pub mod prelude {
    pub use super::descriptor::{PassDescriptor, ShaderDescriptor};
    pub use super::include::{FileSystemSource, IncludeResolver, IncludeSource, MemorySource};
    pub use super::keywords::{GlobalKeywords, KeywordSet};
    pub use super::variant::{ShaderVariant, VariantCache};
    pub use super::Shader;
}

/// A stage source with its includes expanded.
#[derive(Debug, Clone)]
pub struct StageSource {
    pub stage: ShaderStage,
    pub source: String,
    pub map: SourceMap,
}

#[derive(Debug, Clone)]
pub struct ShaderPass {
    pub state: RasterizerState,
    pub stages: Vec<StageSource>,
}

#[derive(Debug, Clone)]
pub struct Shader {
    uuid: Uuid,
    name: String,
    passes: Vec<ShaderPass>,
    shadow_pass: Option<ShaderPass>,
}

impl Shader {
    /// Expands the includes of a descriptor. `path` locates the shader among
    /// the files of `resolver`, relative includes start from its directory.
    pub fn new<P: AsRef<Path>>(
        descriptor: &ShaderDescriptor,
        path: P,
        resolver: &IncludeResolver,
    ) -> Result<Self> {
        let path = path.as_ref();
        let resolve = |pass: &PassDescriptor| -> Result<ShaderPass> {
            let mut stages = Vec::with_capacity(2);
            for &(stage, source) in &[
                (ShaderStage::Vertex, &pass.vertex),
                (ShaderStage::Fragment, &pass.fragment),
            ] {
                let (source, map) = resolver.resolve(path, source)?;
                stages.push(StageSource { stage, source, map });
            }

            Ok(ShaderPass {
                state: pass.state,
                stages,
            })
        };

        let passes = descriptor
            .passes
            .iter()
            .map(&resolve)
            .collect::<Result<Vec<_>>>()?;

        let shadow_pass = match descriptor.shadow_pass {
            Some(ref pass) => Some(resolve(pass)?),
            None => None,
        };

        Ok(Shader {
            uuid: Uuid::new_v4(),
            name: descriptor.name.clone(),
            passes,
            shadow_pass,
        })
    }

    /// A single pass shader without includes.
    pub fn from_sources<T: Into<String>>(
        name: T,
        state: RasterizerState,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self> {
        let name = name.into();
        let descriptor = ShaderDescriptor {
            name: name.clone(),
            passes: vec![PassDescriptor {
                state,
                vertex: vertex.to_owned(),
                fragment: fragment.to_owned(),
            }],
            shadow_pass: None,
        };

        let resolver = IncludeResolver::new(MemorySource::new(), "");
        Shader::new(&descriptor, &name, &resolver)
    }

    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn passes(&self) -> &[ShaderPass] {
        &self.passes
    }

    #[inline]
    pub fn shadow_pass(&self) -> Option<&ShaderPass> {
        self.shadow_pass.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::super::backends::headless::HeadlessVisitor;
    use super::super::device::GraphicsDevice;
    use super::super::settings::GraphicsParams;
    use super::keywords::{GlobalKeywords, KeywordSet};
    use super::variant::VariantCache;
    use super::*;

    const VS: &str = "#version 330\nin vec3 Position;\nvoid main() {}";
    const FS: &str = "#version 330\n#include \"fog.glsl\"\nvoid main() {}";

    fn device() -> GraphicsDevice {
        let visitor = HeadlessVisitor::new();
        let mut params = GraphicsParams::default();
        params.strict_leak_check = false;

        let mut device = GraphicsDevice::new(Box::new(visitor), params).unwrap();
        device.initialize().unwrap();
        device
    }

    #[test]
    fn compile_error_is_remapped() {
        let source = MemorySource::new().with("shared/fog.glsl", "uniform float _Fog;\n#error fog");
        let resolver = IncludeResolver::new(source, "shared");

        let mut descriptor = ShaderDescriptor {
            name: "Fog".to_owned(),
            passes: vec![PassDescriptor::new(VS, FS)],
            shadow_pass: None,
        };

        let shader = Shader::new(&descriptor, "lit.shader", &resolver).unwrap();
        let mut device = device();
        let mut cache = VariantCache::new();

        let mut local = KeywordSet::new();
        local.enable("FOG");

        match cache.get_or_compile(&mut device, &shader, &local, &GlobalKeywords::new()) {
            Err(Error::CompileFailure { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("shared/fog.glsl:2"), "{}", log);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(cache.compiles(), 0);
        assert!(cache.is_empty());

        descriptor.passes[0].fragment = "#include \"missing.glsl\"".to_owned();
        match Shader::new(&descriptor, "lit.shader", &resolver) {
            Err(Error::IncludeNotFound(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
