use vpt_engine::backend::{RecordingBackend, TextureHandle};
use vpt_engine::context::{ContextConfig, RenderingContext};
use vpt_engine::params::ParamValue;
use vpt_engine::renderer::{RendererKind, RendererState};
use vpt_engine::time::Ticker;
use vpt_engine::tonemap::ToneMapperKind;
use vpt_engine::volume::{open_volume, VolReader, VolumeReader};

fn vol_file(dims: [u32; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for d in dims {
        bytes.extend_from_slice(&d.to_be_bytes());
    }
    bytes.extend_from_slice(&[0; 4]);
    for s in [1.0f32, 1.0, 1.0] {
        bytes.extend_from_slice(&s.to_be_bytes());
    }
    let voxels = (dims[0] * dims[1] * dims[2]) as usize;
    bytes.extend((0..voxels).map(|i| (i % 251) as u8));
    bytes
}

#[test]
fn every_renderer_runs_a_loaded_volume_end_to_end() {
    let mut ctx = RenderingContext::new(
        RecordingBackend::new(),
        ContextConfig {
            resolution: 16,
            ..ContextConfig::default()
        },
    )
    .unwrap();
    let mut reader = VolReader::new(std::io::Cursor::new(vol_file([8, 8, 4])));
    ctx.set_volume(&mut reader).unwrap();

    let mut ticker = Ticker::new();
    ctx.start_rendering(&mut ticker);

    for kind in RendererKind::ALL {
        ctx.choose_renderer(kind.tag()).unwrap();
        ctx.backend_mut().clear_draws();
        for _ in 0..4 {
            ticker.tick(&mut ctx);
        }
        assert_eq!(ctx.renderer().frame_count(), 4, "{kind}");
        assert_eq!(ctx.renderer().state(), RendererState::Rendering);

        let screen = ctx.backend().draws().iter().filter(|d| d.to_screen).count();
        assert_eq!(screen, 4, "{kind}");
    }
}

#[test]
fn files_open_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("head.vol");
    std::fs::write(&path, vol_file([4, 4, 2])).unwrap();

    let mut reader = open_volume(&path).unwrap();
    assert_eq!(reader.metadata().unwrap().dimensions.to_array(), [4, 4, 2]);

    let bogus = dir.path().join("head.nrrd");
    std::fs::write(&bogus, b"").unwrap();
    assert!(open_volume(&bogus).is_err());
}

#[test]
fn failed_switches_leave_the_context_intact() {
    let mut ctx = RenderingContext::new(RecordingBackend::new(), ContextConfig {
        resolution: 8,
        renderer: RendererKind::Fov,
        tone_mapper: ToneMapperKind::Aces,
        ..ContextConfig::default()
    })
    .unwrap();
    ctx.render().unwrap();
    let frames = ctx.renderer().frame_count();
    let live = ctx.backend().live_textures();

    assert!(ctx.choose_renderer("FOV").is_err());
    assert!(ctx.choose_tone_mapper("").is_err());
    assert!(ctx.set_renderer_parameter("nope", ParamValue::Float(1.0)).is_err());

    assert_eq!(ctx.renderer().kind(), RendererKind::Fov);
    assert_eq!(ctx.tone_mapper().kind(), ToneMapperKind::Aces);
    assert_eq!(ctx.renderer().frame_count(), frames);
    assert_eq!(ctx.backend().live_textures(), live);
}

#[test]
fn parameter_changes_reset_only_when_listed() {
    let mut ctx = RenderingContext::new(RecordingBackend::new(), ContextConfig {
        resolution: 8,
        renderer: RendererKind::Mcm,
        ..ContextConfig::default()
    })
    .unwrap();
    ctx.render().unwrap();
    ctx.render().unwrap();
    let resets = ctx.renderer().resets();

    assert!(!ctx.set_renderer_parameter("steps", ParamValue::Uint(16)).unwrap());
    assert_eq!(ctx.renderer().frame_count(), 2);

    assert!(ctx.set_renderer_parameter("extinction", ParamValue::Float(20.0)).unwrap());
    assert_eq!(ctx.renderer().resets(), resets + 1);
    assert_eq!(ctx.renderer().frame_count(), 0);

    ctx.set_tone_mapper_parameter("exposure", ParamValue::Float(2.0)).unwrap();
    assert_eq!(ctx.renderer().resets(), resets + 1);
}

#[test]
fn resolution_change_resizes_every_attachment() {
    let mut ctx = RenderingContext::new(RecordingBackend::new(), ContextConfig {
        resolution: 8,
        renderer: RendererKind::Dos,
        ..ContextConfig::default()
    })
    .unwrap();
    ctx.set_resolution(24).unwrap();

    let r = ctx.renderer();
    let attachments = r
        .frame_buffer()
        .attachments()
        .unwrap()
        .iter()
        .chain(r.accumulation_buffer().attachments().unwrap())
        .chain(r.accumulation_buffer().target().unwrap())
        .chain(r.render_buffer().attachments().unwrap());
    for t in attachments {
        assert_eq!((t.spec().width, t.spec().height), (24, 24));
    }
    let out = ctx.tone_mapper().texture().unwrap().spec();
    assert_eq!((out.width, out.height), (24, 24));
}
