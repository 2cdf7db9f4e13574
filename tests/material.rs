extern crate crayon_graphics;

use std::rc::Rc;

use crayon_graphics::prelude::*;

const VS: &str = "#version 330
in vec3 Position;
uniform mat4 _MatMVP;
void main() {
    gl_Position = _MatMVP * vec4(Position, 1.0);
}";

const FS: &str = "#version 330
uniform sampler2D _MainTex;
uniform sampler2D _DetailTex;
uniform vec4 _Color;
out vec4 o_Color;
void main() {
    o_Color = _Color * texture(_MainTex, vec2(0.5));
}";

fn graphics() -> (Graphics, CallLog) {
    let visitor = HeadlessVisitor::new();
    let log = visitor.log();
    let gfx = Graphics::new(Box::new(visitor), GraphicsParams::default()).unwrap();
    (gfx, log)
}

fn shader() -> Rc<Shader> {
    Rc::new(Shader::from_sources("Unlit", RasterizerState::default(), VS, FS).unwrap())
}

#[test]
fn variants_are_shared() {
    let (mut gfx, _) = graphics();
    let shader = shader();

    let mut m1 = Material::new("m1", shader.clone());
    let mut m2 = Material::new("m2", shader.clone());

    let v1 = m1.variant(&mut gfx).unwrap();
    let v2 = m1.variant(&mut gfx).unwrap();
    let v3 = m2.variant(&mut gfx).unwrap();

    assert!(Rc::ptr_eq(&v1, &v2));
    assert!(Rc::ptr_eq(&v1, &v3));
    assert_eq!(gfx.variants().compiles(), 1);
    assert_eq!(v1.shader(), shader.uuid());
    assert!(v1.key().starts_with(&shader.uuid().to_string()));
}

#[test]
fn keyword_splits_never_share_variants() {
    let (mut gfx, _) = graphics();
    let shader = shader();

    let mut a = Material::new("a", shader.clone());
    a.enable_keyword("A-B");
    assert!(!a.is_keyword_enabled("A-B"));
    assert!(a.keywords().is_empty());

    a.enable_keyword("A_B");
    gfx.globals_mut().enable("C");
    let va = a.variant(&mut gfx).unwrap();

    let mut b = Material::new("b", shader.clone());
    b.enable_keyword("A");
    gfx.globals_mut().disable("C");
    gfx.globals_mut().enable("B_C");
    let vb = b.variant(&mut gfx).unwrap();

    assert_ne!(va.key(), vb.key());
    assert!(!Rc::ptr_eq(&va, &vb));
    assert_eq!(va.keywords(), &["C".to_owned(), "A_B".to_owned()]);
    assert_eq!(vb.keywords(), &["B_C".to_owned(), "A".to_owned()]);
    assert_eq!(gfx.variants().compiles(), 2);
}

#[test]
fn keywords_select_variants() {
    let (mut gfx, _) = graphics();
    let mut material = Material::new("lit", shader());

    let plain = material.variant(&mut gfx).unwrap();
    assert!(plain.keywords().is_empty());

    material.enable_keyword("fog");
    assert!(material.is_keyword_enabled("FOG"));
    let fog = material.variant(&mut gfx).unwrap();
    assert!(!Rc::ptr_eq(&plain, &fog));
    assert_eq!(fog.keywords(), &["FOG".to_owned()]);
    assert_eq!(gfx.variants().compiles(), 2);

    material.disable_keyword("FOG");
    let again = material.variant(&mut gfx).unwrap();
    assert!(Rc::ptr_eq(&plain, &again));
    assert_eq!(gfx.variants().compiles(), 2);

    // Global keywords invalidate the resolved variant too.
    gfx.globals_mut().enable("SHADOWS");
    material.enable_keyword("SHADOWS");
    let shadows = material.variant(&mut gfx).unwrap();
    assert_eq!(shadows.keywords(), &["SHADOWS".to_owned()]);
    assert_eq!(gfx.variants().compiles(), 3);

    gfx.globals_mut().disable("SHADOWS");
    let local = material.variant(&mut gfx).unwrap();
    assert!(!Rc::ptr_eq(&shadows, &local));
    assert_eq!(gfx.variants().compiles(), 4);
    assert_eq!(gfx.variants().len(), 4);
}

#[test]
fn passes() {
    let (mut gfx, log) = graphics();
    let mut material = Material::new("unlit", shader());
    assert_eq!(material.pass_count(), 1);
    assert!(!material.has_shadow_pass());

    material.properties_mut().set_color("_Color", Color::red());
    material.set_pass(&mut gfx, 0, true).unwrap();

    let variant = material.variant(&mut gfx).unwrap();
    let program = variant.pass(0).unwrap().program();
    assert_eq!(gfx.device().program(), Some(program));
    assert!(log.contains(&NativeCall::SetUniform(
        3,
        UniformVariable::Vector4f([1.0, 0.0, 0.0, 1.0])
    )));

    match material.set_pass(&mut gfx, 1, true) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(material.set_shadow_pass(&mut gfx, true).unwrap(), false);
}

#[test]
fn shadow_pass() {
    let (mut gfx, _) = graphics();

    let descriptor = ShaderDescriptor::from_json(&format!(
        r#"{{
            "name": "Shadowed",
            "passes": [{{ "vertex": {vs:?}, "fragment": {fs:?} }}],
            "shadow_pass": {{
                "state": {{ "cull_face": "Front" }},
                "vertex": {vs:?},
                "fragment": {fs:?}
            }}
        }}"#,
        vs = VS,
        fs = FS
    ))
    .unwrap();

    let resolver = IncludeResolver::new(MemorySource::new(), "shared");
    let shader = Shader::new(&descriptor, "shadowed.shader", &resolver).unwrap();
    let mut material = Material::new("shadowed", Rc::new(shader));
    assert!(material.has_shadow_pass());

    assert!(material.set_shadow_pass(&mut gfx, false).unwrap());
    assert_eq!(gfx.device().get_state().cull_face, CullFace::Front);

    material.set_pass(&mut gfx, 0, false).unwrap();
    assert_eq!(gfx.device().get_state().cull_face, CullFace::Back);
}

#[test]
fn dropped_textures_are_cleared() {
    let (mut gfx, log) = graphics();
    let mut material = Material::new("textured", shader());

    let main = gfx
        .create_texture_2d(2, 2, TextureFormat::RGBA8, Some(&[0u8; 16][..]))
        .unwrap();
    let detail = gfx
        .create_texture_2d(2, 2, TextureFormat::RGBA8, None)
        .unwrap();

    material.properties_mut().set_texture("_MainTex", &main);
    material.properties_mut().set_texture("_DetailTex", &detail);
    assert_eq!(material.properties().texture_count(), 2);

    material.set_pass(&mut gfx, 0, true).unwrap();
    let handle = main.handle();
    assert!(log.contains(&NativeCall::BindTexture(1, Some(handle))));
    assert!(log.contains(&NativeCall::BindTexture(2, Some(detail.handle()))));

    drop(main);
    assert!(material.properties().texture("_MainTex").is_none());

    log.clear();
    material.set_pass(&mut gfx, 0, true).unwrap();
    assert!(log.contains(&NativeCall::BindTexture(1, None)));
    assert!(!log.contains(&NativeCall::BindTexture(1, Some(handle))));
    assert!(!material.properties().has_texture("_MainTex"));
    assert_eq!(material.properties().texture_count(), 1);

    // A disposed texture is as good as a dropped one.
    detail.dispose();
    material.set_pass(&mut gfx, 0, true).unwrap();
    assert_eq!(material.properties().texture_count(), 0);
}
