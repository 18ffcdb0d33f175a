use vpt_engine::backend::RecordingBackend;
use vpt_engine::context::{ContextConfig, ContextEvent, RenderingContext};
use vpt_engine::export::AnimationOptions;
use vpt_engine::renderer::RendererKind;
use vpt_engine::time::Ticker;
use vpt_engine::Error;

fn context(renderer: RendererKind) -> RenderingContext<RecordingBackend> {
    RenderingContext::new(
        RecordingBackend::new(),
        ContextConfig {
            resolution: 8,
            renderer,
            ..ContextConfig::default()
        },
    )
    .unwrap()
}

fn options(output: &str) -> AnimationOptions {
    AnimationOptions {
        output: output.to_string(),
        start_time: 0.0,
        end_time: 1.0,
        frame_time: 0.0,
        fps: 10.0,
    }
}

#[test]
fn image_sequence_writes_one_png_per_timestep() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let mut ctx = context(RendererKind::Eam);
    let mut ticker = Ticker::new();

    ctx.record_animation(&mut ticker, &options("images"), &out).unwrap();

    let mut names: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    let expected: Vec<String> = (0..10).map(|i| format!("frame{i:04}.png")).collect();
    assert_eq!(names, expected);

    let image = image::open(out.join("frame0009.png")).unwrap();
    assert_eq!((image.width(), image.height()), (8, 8));

    let progress: Vec<f32> = ctx
        .drain_events()
        .filter_map(|e| match e {
            ContextEvent::AnimationProgress(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 10);
    assert_eq!(progress.last(), Some(&1.0));
}

#[test]
fn every_frame_restarts_accumulation_at_its_camera() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(RendererKind::Mcs);
    let mut ticker = Ticker::new();
    let resets = ctx.renderer().resets();

    let opts = AnimationOptions {
        end_time: 0.25,
        ..options("images")
    };
    ctx.record_animation(&mut ticker, &opts, dir.path()).unwrap();

    assert_eq!(ctx.renderer().resets(), resets + 3);
    assert_eq!(*ctx.camera().transform(), ctx.animator().transform_at(0.2));
}

#[test]
fn video_export_writes_a_single_gif() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.gif");
    let mut ctx = context(RendererKind::Mip);
    let mut ticker = Ticker::new();

    ctx.record_animation(&mut ticker, &options("video"), &out).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
}

#[test]
fn bogus_type_fails_before_creating_anything() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never");
    let mut ctx = context(RendererKind::Mip);
    let mut ticker = Ticker::new();
    ctx.start_rendering(&mut ticker);
    let draws = ctx.backend().draws().len();

    let err = ctx
        .record_animation(&mut ticker, &options("bogus"), &out)
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedExportType(ref t) if t == "bogus"));
    assert!(!out.exists());
    assert_eq!(ctx.backend().draws().len(), draws);
    assert!(ctx.is_rendering());
}

#[test]
fn rendering_resumes_after_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(RendererKind::Mip);
    let mut ticker = Ticker::new();
    ctx.start_rendering(&mut ticker);

    let opts = AnimationOptions {
        end_time: 0.1,
        ..options("images")
    };
    ctx.record_animation(&mut ticker, &opts, dir.path()).unwrap();
    assert!(ctx.is_rendering());

    let before = ctx.renderer().frame_count();
    ticker.tick(&mut ctx);
    assert_eq!(ctx.renderer().frame_count(), before + 1);
}
