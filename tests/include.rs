extern crate crayon_graphics;

use crayon_graphics::prelude::*;

#[test]
fn circular_includes() {
    let source = MemorySource::new().with("a.glsl", "#include \"a.glsl\"");
    let resolver = IncludeResolver::new(source, "shared");

    match resolver.resolve_file("a.glsl") {
        Err(GraphicsError::CircularInclude(chain)) => assert_eq!(chain, "a.glsl -> a.glsl"),
        other => panic!("unexpected {:?}", other),
    }

    let source = MemorySource::new()
        .with("fx/a.glsl", "float a;\n#include \"b.glsl\"")
        .with("fx/b.glsl", "#include <a.glsl>\nfloat b;");
    let resolver = IncludeResolver::new(source, "shared");

    match resolver.resolve_file("fx/a.glsl") {
        Err(GraphicsError::CircularInclude(chain)) => {
            assert_eq!(chain, "fx/a.glsl -> fx/b.glsl -> fx/a.glsl")
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn repeated_includes_are_expanded() {
    let source = MemorySource::new()
        .with("main.glsl", "#include \"b.glsl\"\n#include \"c.glsl\"\nvoid main() {}")
        .with("b.glsl", "#include \"d.glsl\"\nfloat b;")
        .with("c.glsl", "#include \"d.glsl\"\nfloat c;")
        .with("d.glsl", "float d;");

    let resolver = IncludeResolver::new(source, "shared");
    let (out, map) = resolver.resolve_file("main.glsl").unwrap();

    assert_eq!(out, "float d;\nfloat b;\nfloat d;\nfloat c;\nvoid main() {}\n");
    assert_eq!(map.len(), 5);
    assert_eq!(map.lookup(3), Some(("d.glsl", 1)));
    assert_eq!(map.lookup(5), Some(("main.glsl", 3)));
}

#[test]
fn missing_includes() {
    let source = MemorySource::new().with("lit.glsl", "#include \"../secret.glsl\"");
    let resolver = IncludeResolver::new(source, "shared");

    match resolver.resolve_file("lit.glsl") {
        Err(GraphicsError::IncludeNotFound(msg)) => assert!(msg.contains("secret.glsl")),
        other => panic!("unexpected {:?}", other),
    }

    assert!(resolver.resolve_file("none.glsl").is_err());
}

#[test]
fn compile_logs_point_at_includes() {
    let source = MemorySource::new()
        .with("shared/lighting.glsl", "uniform vec4 _Light;\n\n#error lighting is broken");

    let resolver = IncludeResolver::new(source, "shared");
    let vs = "#version 330\nin vec3 Position;\nvoid main() {}";
    let fs = "#version 330\nout vec4 o_Color;\n#include \"lighting.glsl\"\nvoid main() {}";

    let descriptor = ShaderDescriptor {
        name: "Lit".to_owned(),
        passes: vec![PassDescriptor::new(vs, fs)],
        shadow_pass: None,
    };

    let shader = Shader::new(&descriptor, "shaders/lit.shader", &resolver).unwrap();
    let visitor = HeadlessVisitor::new();
    let mut params = GraphicsParams::default();
    params.strict_leak_check = false;

    let mut device = GraphicsDevice::new(Box::new(visitor), params).unwrap();
    device.initialize().unwrap();

    let mut globals = GlobalKeywords::new();
    globals.enable("HDR");

    let mut local = KeywordSet::new();
    local.enable("FOG");
    local.enable("HDR");

    let mut cache = VariantCache::new();
    match cache.get_or_compile(&mut device, &shader, &local, &globals) {
        Err(GraphicsError::CompileFailure { stage, log }) => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(log.contains("shared/lighting.glsl:3"), "{}", log);
        }
        other => panic!("unexpected {:?}", other),
    }

    assert!(cache.is_empty());
}
