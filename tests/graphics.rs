extern crate crayon_graphics;
extern crate env_logger;
#[macro_use]
extern crate failure;

use std::rc::Rc;
use std::thread;

use crayon_graphics::prelude::*;
use crayon_graphics::video::graphics::encode_object_id;

const VS: &str = "#version 330
in vec3 Position;
uniform mat4 _MatModel;
uniform mat4 _MatView;
uniform mat4 _MatProjection;
uniform mat4 _MatMVP;
uniform float _Time;
void main() {
    gl_Position = _MatMVP * vec4(Position, 1.0);
}";

const FS: &str = "#version 330
out vec4 o_Color;
void main() {
    o_Color = vec4(1.0);
}";

fn graphics(params: GraphicsParams) -> (Graphics, CallLog) {
    let _ = env_logger::try_init();

    let visitor = HeadlessVisitor::new();
    let log = visitor.log();
    let gfx = Graphics::new(Box::new(visitor), params).unwrap();
    (gfx, log)
}

#[test]
fn frames() {
    let (mut gfx, log) = graphics(GraphicsParams::default());
    gfx.resize(320, 240).unwrap();

    gfx.begin_frame().unwrap();
    assert_eq!(gfx.frame(), 1);
    assert!(log.contains(&NativeCall::SetViewport(Rect::from_size(0, 0, 320, 240))));
    assert_eq!(gfx.device().get_state(), RasterizerState::default());
    assert!(!gfx.device().is_scissor_test_enabled());

    gfx.device_mut().set_enable_scissor_test(true, false).unwrap();
    gfx.device_mut().set_state(&RasterizerState::overlay(), false).unwrap();
    let info = gfx.end_frame().unwrap();

    #[cfg(feature = "stats")]
    assert!(info.state_changes > 0);
    assert_eq!(info.alive_buffers, 2);

    // Every frame starts from the default state.
    gfx.begin_frame().unwrap();
    assert_eq!(gfx.frame(), 2);
    assert_eq!(gfx.device().get_state(), RasterizerState::default());
    assert!(!gfx.device().is_scissor_test_enabled());

    let info = gfx.end_frame().unwrap();
    assert_eq!(info.draw_calls, 0);
}

#[test]
fn draw_mesh_now() {
    let (mut gfx, log) = graphics(GraphicsParams::default());
    let shader = Rc::new(Shader::from_sources("Mesh", RasterizerState::default(), VS, FS).unwrap());
    let mut material = Material::new("mesh", shader);

    let mesh = Mesh::fullscreen_quad(gfx.device_mut()).unwrap();
    let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0));
    let projection = Matrix4::from_scale(0.5);
    let model = Matrix4::from_scale(2.0);

    gfx.begin_frame().unwrap();
    gfx.set_camera(view, projection);
    gfx.set_time(2.5);
    gfx.draw_mesh_now(&mesh, model, &mut material, 0).unwrap();

    let mvp: [[f32; 4]; 4] = (projection * view * model).into();
    assert!(log.contains(&NativeCall::SetUniform(3, UniformVariable::Matrix4f(mvp))));
    assert!(log.contains(&NativeCall::SetUniform(4, UniformVariable::F32(2.5))));
    assert!(log.contains(&NativeCall::DrawElements(Topology::Triangles, 0, 6)));

    let info = gfx.end_frame().unwrap();
    #[cfg(feature = "stats")]
    {
        assert_eq!(info.draw_calls, 1);
        assert_eq!(info.triangles, 2);
        assert_eq!(info.uniform_writes, 5);
        assert_eq!(info.programs_compiled, 1);
    }
    assert_eq!(info.alive_programs, 1);

    match gfx.draw_mesh_now(&mesh, model, &mut material, 3) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn blits() {
    let (mut gfx, log) = graphics(GraphicsParams::default());
    gfx.resize(8, 8).unwrap();
    gfx.begin_frame().unwrap();

    let source = gfx.get_temporary_rt(8, 8, &[TextureFormat::RGBA8]).unwrap();
    let dest = gfx.get_temporary_rt(8, 8, &[TextureFormat::RGBA8]).unwrap();
    let texture = source.color(0).unwrap().handle();

    log.clear();
    gfx.blit(texture, Some(&dest)).unwrap();
    assert!(log.contains(&NativeCall::BindFrameBuffer(
        FrameBufferTarget::Framebuffer,
        Some(dest.framebuffer())
    )));
    assert!(log.contains(&NativeCall::BindTexture(1, Some(texture))));
    assert!(log.contains(&NativeCall::DrawElements(Topology::Triangles, 0, 6)));
    assert_eq!(gfx.device().get_state(), RasterizerState::overlay());

    gfx.blit(texture, None).unwrap();
    assert!(log.contains(&NativeCall::SetViewport(Rect::from_size(0, 0, 8, 8))));
    assert_eq!(gfx.variants().compiles(), 1);

    log.clear();
    gfx.blit_depth(&source, Some(&dest)).unwrap();
    assert_eq!(
        log.count(|v| *v == NativeCall::BlitFrameBuffer(ClearFlags::DEPTH)),
        1
    );

    let flat = RenderTexture::new(gfx.device_mut(), 8, 8, &[TextureFormat::RGBA8], None).unwrap();
    match gfx.blit_depth(&flat, None) {
        Err(GraphicsError::InvalidOperation(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    gfx.release_temporary_rt(source);
    gfx.release_temporary_rt(dest);
}

#[test]
fn picking() {
    let (mut gfx, _) = graphics(GraphicsParams::default());
    gfx.begin_frame().unwrap();

    let ids = gfx.get_temporary_rt(4, 4, &[TextureFormat::RGBA8]).unwrap();
    let texture = ids.color(0).unwrap().handle();

    gfx.device_mut()
        .tex_sub_image(texture, None, 0, (1, 2, 0), (1, 1, 1), &encode_object_id(77_001))
        .unwrap();

    assert_eq!(gfx.pick(&ids, 0, 1, 2).unwrap(), 77_001);
    assert_eq!(gfx.pick(&ids, 0, 0, 0).unwrap(), 0);
    assert!(gfx.pick(&ids, 0, 4, 4).is_err());
    assert!(gfx.pick(&ids, 1, 0, 0).is_err());

    gfx.release_temporary_rt(ids);
}

#[test]
fn dispatched_work() {
    let mut params = GraphicsParams::default();
    params.max_dispatch_per_frame = 2;
    let (mut gfx, _) = graphics(params);

    let queue = gfx.dispatcher();
    let handle = thread::spawn(move || {
        queue.dispatch(|gfx| {
            gfx.globals_mut().enable("FIRST");
            Ok(())
        });

        queue.dispatch(|_| Err(format_err!("second fails")));

        queue.dispatch(|gfx| {
            gfx.globals_mut().enable("THIRD");
            Ok(())
        });
    });

    handle.join().unwrap();
    assert_eq!(gfx.dispatcher().len(), 3);

    gfx.begin_frame().unwrap();
    assert!(gfx.globals().contains("FIRST"));
    assert!(!gfx.globals().contains("THIRD"));
    assert_eq!(gfx.dispatcher().len(), 1);

    gfx.begin_frame().unwrap();
    assert!(gfx.globals().contains("THIRD"));
    assert!(gfx.dispatcher().is_empty());
}

#[test]
fn shutdown_releases_everything() {
    let mut params = GraphicsParams::default();
    params.strict_leak_check = true;
    let (mut gfx, log) = graphics(params);

    let shader = Rc::new(Shader::from_sources("Mesh", RasterizerState::default(), VS, FS).unwrap());
    let mut material = Material::new("mesh", shader);
    let mesh = Mesh::fullscreen_quad(gfx.device_mut()).unwrap();
    let texture = gfx.create_texture_2d(4, 4, TextureFormat::RGBA8, None).unwrap();

    gfx.begin_frame().unwrap();
    gfx.draw_mesh_now(&mesh, Matrix4::from_scale(1.0), &mut material, 0).unwrap();
    let rt = gfx.get_temporary_rt(4, 4, &[TextureFormat::RGBA8]).unwrap();
    gfx.release_temporary_rt(rt);
    gfx.end_frame().unwrap();

    drop(texture);
    drop(mesh);
    drop(material);

    gfx.shutdown().unwrap();
    assert!(!gfx.device().is_initialized());
    assert!(log.contains(&NativeCall::Shutdown));
}
