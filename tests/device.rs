extern crate crayon_graphics;

use crayon_graphics::prelude::*;
use crayon_graphics::video::MAX_TEXTURE_SLOTS;

const VS: &str = "#version 330\nin vec3 Position;\nuniform mat4 _MatMVP;\nvoid main() {}";
const FS: &str = "#version 330\nuniform sampler2D _MainTex;\nout vec4 o_Color;\nvoid main() {}";

fn device(strict: bool) -> (GraphicsDevice, CallLog) {
    let visitor = HeadlessVisitor::new();
    let log = visitor.log();

    let mut params = GraphicsParams::default();
    params.strict_leak_check = strict;

    let mut device = GraphicsDevice::new(Box::new(visitor), params).unwrap();
    device.initialize().unwrap();
    device.reset_frame_info();
    log.clear();
    (device, log)
}

fn program(device: &mut GraphicsDevice) -> ProgramHandle {
    device
        .compile_program(&[
            ShaderSourceDescriptor::new(ShaderStage::Vertex, VS),
            ShaderSourceDescriptor::new(ShaderStage::Fragment, FS),
        ])
        .unwrap()
}

fn triangles(device: &mut GraphicsDevice, vertices: usize) -> (BufferHandle, VertexArrayHandle) {
    let layout = VertexLayout::build()
        .with(Attribute::Position, VertexFormat::Float, 3, false)
        .finish();

    let data = vec![0.0f32; vertices * 3];
    let vbo = device
        .create_buffer(BufferKind::Vertex, data.as_slice(), false)
        .unwrap();

    let vao = device.create_vertex_array(layout, vbo, None).unwrap();
    (vbo, vao)
}

#[test]
fn redundant_state_is_skipped() {
    let (mut device, log) = device(true);

    device.set_enable_depth_test(false, false).unwrap();
    device.set_enable_depth_test(false, false).unwrap();
    assert_eq!(log.state_changes(), 1);
    assert_eq!(log.calls(), vec![NativeCall::SetDepthTest(false)]);

    // Only the depth test differs from the default state.
    device.set_state(&RasterizerState::default(), false).unwrap();
    assert_eq!(log.state_changes(), 2);
    assert_eq!(device.get_state(), RasterizerState::default());

    device.set_state(&RasterizerState::default(), false).unwrap();
    assert_eq!(log.state_changes(), 2);

    #[cfg(feature = "stats")]
    assert_eq!(device.frame_info().state_changes, 2);

    device.shutdown().unwrap();
}

#[test]
fn forced_state_is_reapplied() {
    let (mut device, log) = device(true);

    device.set_state(&RasterizerState::default(), true).unwrap();
    assert_eq!(log.state_changes(), 9);
    assert!(log.contains(&NativeCall::SetBlendFunc(
        BlendFactor::Value(BlendValue::SourceAlpha),
        BlendFactor::OneMinusValue(BlendValue::SourceAlpha),
    )));
    assert!(log.contains(&NativeCall::SetFrontFace(
        FrontFaceOrder::CounterClockwise
    )));

    log.clear();
    let overlay = RasterizerState::overlay();
    device.set_state(&overlay, false).unwrap();
    assert_eq!(
        log.calls(),
        vec![
            NativeCall::SetDepthTest(false),
            NativeCall::SetDepthWrite(false),
            NativeCall::SetDepthFunc(Comparison::Always),
            NativeCall::SetBlend(false),
            NativeCall::SetCull(false),
        ]
    );

    device.set_enable_scissor_test(true, false).unwrap();
    device.set_enable_scissor_test(true, false).unwrap();
    assert!(device.is_scissor_test_enabled());
    assert_eq!(log.count(|v| *v == NativeCall::SetScissorTest(true)), 1);

    device.shutdown().unwrap();
}

#[test]
fn buffer_updates_are_bounded() {
    let (mut device, _) = device(true);

    let vbo = device
        .allocate_buffer(BufferKind::Vertex, 256, true)
        .unwrap();

    let bytes = [0u8; 64];
    match device.update_buffer(vbo, 200, &bytes[..]) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    match device.update_buffer(vbo, usize::max_value() - 10, &bytes[..]) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    device.update_buffer(vbo, 192, &bytes[..]).unwrap();
    assert_eq!(device.buffer(vbo).unwrap().size, 256);

    device.set_buffer(vbo, &bytes[..]).unwrap();
    assert_eq!(device.buffer(vbo).unwrap().size, 64);
    assert!(device.update_buffer(vbo, 32, &bytes[..]).is_err());

    device.delete_buffer(vbo).unwrap();
    assert!(device.buffer(vbo).is_none());
    match device.update_buffer(vbo, 0, &bytes[..]) {
        Err(GraphicsError::BufferHandleInvalid(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    device.shutdown().unwrap();
}

#[test]
fn draws_require_bindings() {
    let (mut device, _) = device(false);
    let (_, vao) = triangles(&mut device, 3);

    match device.draw_arrays(Topology::Triangles, 0, 3) {
        Err(GraphicsError::NoProgramBound) => {}
        other => panic!("unexpected {:?}", other),
    }

    let p = program(&mut device);
    device.bind_program(Some(p)).unwrap();
    match device.draw_arrays(Topology::Triangles, 0, 3) {
        Err(GraphicsError::NoVertexArrayBound) => {}
        other => panic!("unexpected {:?}", other),
    }

    device.bind_vertex_array(Some(vao)).unwrap();
    device.draw_arrays(Topology::Triangles, 0, 3).unwrap();

    match device.draw_elements(Topology::Triangles, 0, 3, IndexFormat::U16, None) {
        Err(GraphicsError::InvalidOperation(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[cfg(feature = "stats")]
#[test]
fn triangle_accounting() {
    let (mut device, _) = device(false);
    let (vbo, vao) = triangles(&mut device, 9);
    let p = program(&mut device);

    device.bind_program(Some(p)).unwrap();
    device.bind_vertex_array(Some(vao)).unwrap();
    device.reset_frame_info();

    let expected = [
        (Topology::Triangles, 3),
        (Topology::TriangleStrip, 7),
        (Topology::TriangleFan, 7),
        (Topology::Lines, 0),
        (Topology::LineStrip, 0),
        (Topology::Points, 0),
    ];

    let mut total = 0;
    for &(topology, triangles) in &expected {
        device.draw_arrays(topology, 0, 9).unwrap();
        total += triangles;
        assert_eq!(device.frame_info().triangles, total, "{:?}", topology);
    }

    assert_eq!(device.frame_info().draw_calls, expected.len() as u32);

    // Indexed draws are accounted the same way.
    let indices: [u16; 6] = [0, 1, 2, 2, 1, 3];
    let ibo = device
        .create_buffer(BufferKind::Index, &indices[..], false)
        .unwrap();

    let layout = device.vertex_array(vao).unwrap().layout;
    let indexed = device.create_vertex_array(layout, vbo, Some(ibo)).unwrap();

    device.reset_frame_info();
    device.bind_vertex_array(Some(indexed)).unwrap();
    device
        .draw_elements(Topology::Triangles, 0, 6, IndexFormat::U16, None)
        .unwrap();

    assert_eq!(device.frame_info().triangles, 2);

    match device.draw_elements(Topology::Triangles, 3, 6, IndexFormat::U16, None) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(device.frame_info().draw_calls, 1);
}

#[test]
fn uniforms() {
    let (mut device, log) = device(false);

    match device.set_uniform("_MatMVP", Matrix4::<f32>::from_scale(1.0)) {
        Err(GraphicsError::NoProgramBound) => {}
        other => panic!("unexpected {:?}", other),
    }

    let p = program(&mut device);
    device.bind_program(Some(p)).unwrap();
    device.bind_program(Some(p)).unwrap();
    assert_eq!(log.count(|v| *v == NativeCall::BindProgram(Some(p))), 1);

    device.set_uniform("_MatMVP", Matrix4::<f32>::from_scale(1.0)).unwrap();
    device.set_uniform("_MatMVP", Matrix4::<f32>::from_scale(2.0)).unwrap();
    device.set_uniform("_Unused", 1.0f32).unwrap();

    // Locations are resolved once per program and name.
    assert_eq!(
        log.count(|v| match *v {
            NativeCall::UniformLocation(..) => true,
            _ => false,
        }),
        2
    );

    assert_eq!(
        log.count(|v| match *v {
            NativeCall::SetUniform(..) => true,
            _ => false,
        }),
        2
    );

    let texture = device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();

    match device.set_uniform_texture("_MainTex", 0, texture) {
        Err(GraphicsError::InvalidOperation(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    match device.set_uniform_texture("_MainTex", MAX_TEXTURE_SLOTS, texture) {
        Err(GraphicsError::TextureSlotOutOfRange { slot, max }) => {
            assert_eq!(slot, MAX_TEXTURE_SLOTS);
            assert_eq!(max, MAX_TEXTURE_SLOTS);
        }
        other => panic!("unexpected {:?}", other),
    }

    device.set_uniform_texture("_MainTex", 1, texture).unwrap();
    device.set_uniform_texture("_MainTex", 1, texture).unwrap();
    assert_eq!(log.count(|v| *v == NativeCall::BindTexture(1, Some(texture))), 1);

    // Deleting the program unbinds it.
    device.delete_program(p).unwrap();
    assert!(!device.is_program_alive(p));
    assert_eq!(device.program(), None);
}

#[test]
fn textures() {
    let (mut device, _) = device(true);

    let texture = device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();

    match device.generate_mipmap(texture) {
        Err(GraphicsError::InvalidOperation(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    let mut data = Vec::new();
    for y in 0..8u8 {
        for x in 0..8u8 {
            data.extend_from_slice(&[x, y, 0, 255]);
        }
    }

    device
        .tex_image(texture, None, 0, (8, 8, 1), Some(data.as_slice()))
        .unwrap();

    let params = device.texture(texture).unwrap();
    assert_eq!(params.levels, 4);
    assert_eq!(params.level_dimensions(2), (2, 2, 1));

    assert!(device
        .tex_image(texture, None, 1, (2, 2, 1), None)
        .is_err());
    assert!(device
        .tex_image(texture, Some(CubemapFace::PositiveX), 0, (8, 8, 1), None)
        .is_err());
    assert!(device.get_tex_image(texture, None, 4).is_err());

    device.generate_mipmap(texture).unwrap();
    let level = device.get_tex_image(texture, None, 1).unwrap();
    assert_eq!(level.len(), 4 * 4 * 4);
    assert_eq!(&level[(4 + 1) * 4..(4 + 1) * 4 + 4], &[2, 2, 0, 255]);

    device
        .tex_sub_image(texture, None, 0, (1, 1, 0), (1, 1, 1), &[9, 9, 9, 9])
        .unwrap();
    let base = device.get_tex_image(texture, None, 0).unwrap();
    assert_eq!(&base[(8 + 1) * 4..(8 + 1) * 4 + 4], &[9, 9, 9, 9]);

    assert!(device
        .tex_sub_image(texture, None, 0, (7, 7, 0), (2, 2, 1), &[0; 16])
        .is_err());

    // Offsets near the end of the integer range must not wrap past the check.
    match device.tex_sub_image(texture, None, 0, (u32::max_value(), 0, 0), (2, 1, 1), &[0; 8]) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    match device.tex_sub_image(texture, None, 0, (0, u32::max_value() - 1, 0), (1, 4, 1), &[0; 16]) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert!(device
        .set_texture_filter(texture, TextureFilter::Linear, TextureFilter::LinearMipmapLinear)
        .is_err());

    // Cubemaps take square faces and an explicit face.
    let cubemap = device
        .create_texture(TextureKind::Cubemap, TextureFormat::RGBA8)
        .unwrap();
    assert!(device.tex_image(cubemap, None, 0, (4, 4, 1), None).is_err());
    assert!(device
        .tex_image(cubemap, Some(CubemapFace::NegativeZ), 0, (4, 2, 1), None)
        .is_err());
    device
        .tex_image(cubemap, Some(CubemapFace::NegativeZ), 0, (4, 4, 1), None)
        .unwrap();

    device.delete_texture(texture).unwrap();
    device.delete_texture(cubemap).unwrap();
    assert!(!device.is_texture_alive(texture));

    device.shutdown().unwrap();
}

#[test]
fn framebuffers() {
    let (mut device, _) = device(true);

    let color = device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();
    let depth = device
        .create_texture(TextureKind::Texture2D, TextureFormat::Depth24)
        .unwrap();

    // Attachments need storage.
    match device.create_framebuffer(&[Attachment::Color(color)]) {
        Err(GraphicsError::IncompleteFrameBuffer(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    device.tex_image(color, None, 0, (4, 4, 1), None).unwrap();
    device.tex_image(depth, None, 0, (2, 2, 1), None).unwrap();

    assert!(device.create_framebuffer(&[]).is_err());
    assert!(device.create_framebuffer(&[Attachment::Depth(color)]).is_err());
    assert!(device
        .create_framebuffer(&[Attachment::Color(color), Attachment::Depth(depth)])
        .is_err());

    device.tex_image(depth, None, 0, (4, 4, 1), None).unwrap();
    let fb = device
        .create_framebuffer(&[Attachment::Color(color), Attachment::Depth(depth)])
        .unwrap();

    assert_eq!(device.framebuffer(fb).unwrap().dimensions, (4, 4));
    assert_eq!(device.framebuffer(fb).unwrap().color(0), Some(color));

    let rect = Rect::from_size(0, 0, 4, 4);
    match device.blit_framebuffer(rect, rect, ClearFlags::COLOR, BlitFilter::Linear) {
        Err(GraphicsError::InvalidOperation(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    device.bind_framebuffer(Some(fb), FrameBufferTarget::Read).unwrap();
    device.bind_framebuffer(None, FrameBufferTarget::Draw).unwrap();
    assert!(device
        .blit_framebuffer(rect, rect, ClearFlags::DEPTH, BlitFilter::Linear)
        .is_err());
    device
        .blit_framebuffer(rect, rect, ClearFlags::COLOR, BlitFilter::Linear)
        .unwrap();
    device
        .blit_framebuffer(rect, rect, ClearFlags::NONE, BlitFilter::Linear)
        .unwrap();

    device.delete_framebuffer(fb).unwrap();
    assert!(device.framebuffer(fb).is_none());
    assert!(device.bind_framebuffer(Some(fb), FrameBufferTarget::Read).is_err());

    device.delete_texture(color).unwrap();
    device.delete_texture(depth).unwrap();
    device.shutdown().unwrap();
}

#[test]
fn read_pixels() {
    let (mut device, _) = device(false);

    let mut data = Vec::new();
    for y in 0..4u8 {
        for x in 0..4u8 {
            data.extend_from_slice(&[x, y, 7, 255]);
        }
    }

    let texture = device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();
    device
        .tex_image(texture, None, 0, (4, 4, 1), Some(data.as_slice()))
        .unwrap();

    let fb = device
        .create_framebuffer(&[Attachment::Color(texture)])
        .unwrap();

    // Creating a framebuffer leaves the bindings unknown.
    assert!(device
        .read_pixel::<[u8; 4]>(0, 0, 0, TextureFormat::RGBA8)
        .is_err());

    device.bind_framebuffer(Some(fb), FrameBufferTarget::Read).unwrap();
    let texel: [u8; 4] = device.read_pixel(0, 2, 3, TextureFormat::RGBA8).unwrap();
    assert_eq!(texel, [2, 3, 7, 255]);

    let block = device
        .read_pixels(0, Rect::from_size(1, 1, 2, 2), TextureFormat::RGBA8)
        .unwrap();
    assert_eq!(block.len(), 16);
    assert_eq!(&block[12..], &[2, 2, 7, 255]);

    match device.read_pixels(0, Rect::from_size(3, 3, 2, 2), TextureFormat::RGBA8) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert!(device
        .read_pixels(1, Rect::from_size(0, 0, 1, 1), TextureFormat::RGBA8)
        .is_err());
    assert!(device
        .read_pixels(0, Rect::from_size(0, 0, 1, 1), TextureFormat::RGBA32F)
        .is_err());
    assert!(device
        .read_pixel::<u8>(0, 0, 0, TextureFormat::RGBA8)
        .is_err());
    match device.read_pixel::<[u8; 4]>(0, i32::max_value(), 0, TextureFormat::RGBA8) {
        Err(GraphicsError::OutOfBounds(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    // Clears go to the bound draw framebuffer.
    device.bind_framebuffer(Some(fb), FrameBufferTarget::Draw).unwrap();
    device.clear(Color::red(), ClearFlags::COLOR).unwrap();
    let texel: [u8; 4] = device.read_pixel(0, 3, 3, TextureFormat::RGBA8).unwrap();
    assert_eq!(texel, [255, 0, 0, 255]);
}

#[test]
fn leaks_are_reported() {
    let (mut device, log) = device(true);
    device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();
    device.allocate_buffer(BufferKind::Vertex, 16, false).unwrap();

    match device.shutdown() {
        Err(GraphicsError::ResourceLeak(2)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert!(!device.is_initialized());
    assert_eq!(log.count(|v| match *v {
        NativeCall::DeleteTexture(_) | NativeCall::DeleteBuffer(_) => true,
        _ => false,
    }), 2);

    let (mut device, _) = self::device(false);
    device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();
    device.shutdown().unwrap();
}

#[test]
fn owned_objects_are_collected() {
    let (mut device, log) = device(true);

    let handle = device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();
    let texture = device.own(handle);
    assert!(device.is_texture_alive(texture.handle()));

    drop(texture);
    assert!(device.is_texture_alive(handle));
    assert_eq!(device.collect().unwrap(), 1);
    assert!(!device.is_texture_alive(handle));
    assert!(log.contains(&NativeCall::DeleteTexture(handle)));

    let handle = device
        .create_texture(TextureKind::Texture2D, TextureFormat::RGBA8)
        .unwrap();
    let texture = device.own(handle);
    texture.dispose();
    assert!(texture.is_disposed());
    assert_eq!(device.collect().unwrap(), 1);
    drop(texture);
    assert_eq!(device.collect().unwrap(), 0);

    device.shutdown().unwrap();
}
