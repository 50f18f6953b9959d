//! 启动钩子 + 控件点击 + 宿主管线 端到端测试.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;

use ogv::config::AppConfig;
use ogv::pipeline::{LoadOutcome, MediaPipeline, PipelineState};
use ogv::trigger::{ControlPanel, PlaybackTrigger, dispatch};
use ogv_core::{MediaType, OgvError, Rational};
use ogv_format::handlers::ogv::OggPage;
use ogv_format::handlers::ogv::page::FLAG_BOS;
use ogv_format::{HandlerRegistry, MediaExtensions, SourceEvent, SourceState, StreamParams};

const OGV_HANDLER: &str = "OgvSource.OgvByteStreamHandler";

/// 构造 Theora identification header
fn theora_header(width: u32, height: u32, fps_num: u32, fps_den: u32) -> Vec<u8> {
    let mut header = vec![0x80];
    header.extend_from_slice(b"theora");
    header.extend_from_slice(&[3, 2, 1]);
    header.extend_from_slice(&(width.div_ceil(16) as u16).to_be_bytes());
    header.extend_from_slice(&(height.div_ceil(16) as u16).to_be_bytes());
    header.extend_from_slice(&width.to_be_bytes()[1..]);
    header.extend_from_slice(&height.to_be_bytes()[1..]);
    header.extend_from_slice(&[0, 0]);
    header.extend_from_slice(&fps_num.to_be_bytes());
    header.extend_from_slice(&fps_den.to_be_bytes());
    header.extend_from_slice(&[0, 0, 1, 0, 0, 1]);
    header.extend_from_slice(&[0; 6]);
    header
}

/// 构造 Vorbis identification header
fn vorbis_header(channels: u8, sample_rate: u32) -> Vec<u8> {
    let mut header = vec![1u8];
    header.extend_from_slice(b"vorbis");
    header.extend_from_slice(&0u32.to_le_bytes());
    header.push(channels);
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&[0; 12]);
    header.extend_from_slice(&[0x88, 1]);
    header
}

/// 写入 sharks.ogv: Theora + Vorbis 两个 BOS 页面, 之后一个数据页面
fn write_sharks(root: &Path) {
    let mut data = Vec::new();
    let pages = [
        OggPage::with_packet(FLAG_BOS, 0, 0x1000, 0, &theora_header(640, 360, 24, 1)),
        OggPage::with_packet(FLAG_BOS, 0, 0x2000, 0, &vorbis_header(2, 48000)),
        OggPage::with_packet(0, 0, 0x1000, 1, b"\x81theora comment"),
    ];
    for page in pages {
        data.extend_from_slice(&page.unwrap().to_bytes());
    }
    std::fs::create_dir_all(root.join("media")).unwrap();
    std::fs::write(root.join("media").join("sharks.ogv"), data).unwrap();
}

fn activated_registry() -> Arc<HandlerRegistry> {
    let registry = ogv::default_handler_registry();
    let extensions = MediaExtensions::new(Arc::clone(&registry));
    // 冷启动与恢复两条路径
    assert!(extensions.ensure_initialized().unwrap());
    assert!(!extensions.ensure_initialized().unwrap());
    registry
}

#[test]
fn test_click_both_controls() {
    let dir = tempfile::tempdir().unwrap();
    write_sharks(dir.path());

    let registry = activated_registry();
    assert_eq!(registry.len(), 1);

    let config = AppConfig::default();
    let mut pipeline = MediaPipeline::new(Arc::clone(&registry), dir.path());
    let (tx, rx) = mpsc::channel();
    let mut panel = ControlPanel::new();
    panel.subscribe(PlaybackTrigger::from_bindings(&config.media.bindings, tx));

    panel.click("play-ogv");
    let request = rx.try_recv().unwrap();
    assert_eq!(request.uri, "/media/sharks.ogv");
    let outcome = dispatch(&mut pipeline, &request).unwrap();

    let LoadOutcome::Handler {
        handler_id,
        streams,
        ..
    } = outcome
    else {
        panic!("sharks.ogv 应由字节流处理器加载");
    };
    assert_eq!(handler_id, OGV_HANDLER);
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].media_type, MediaType::Video);
    assert_eq!(
        streams[0].params,
        StreamParams::Video {
            width: 640,
            height: 360,
            frame_rate: Rational::new(24, 1),
            pixel_aspect: Rational::new(1, 1),
        }
    );
    assert_eq!(
        streams[1].params,
        StreamParams::Audio {
            sample_rate: 48000,
            channels: 2,
        }
    );

    panel.click("play-mp4");
    let request = rx.try_recv().unwrap();
    let outcome = dispatch(&mut pipeline, &request).unwrap();
    assert!(matches!(outcome, LoadOutcome::Native { ref extension, .. } if extension == ".mp4"));
    assert!(pipeline.media_source().is_none());
    assert_eq!(pipeline.state(), PipelineState::Loaded);
}

#[test]
fn test_media_source_controls_after_load() {
    let dir = tempfile::tempdir().unwrap();
    write_sharks(dir.path());

    let mut pipeline = MediaPipeline::new(activated_registry(), dir.path());
    pipeline.set_source("/media/sharks.ogv");
    pipeline.load().unwrap();

    let source = pipeline.media_source_mut().unwrap();
    assert_eq!(source.next_event(), Some(SourceEvent::Opened));
    assert!(matches!(source.pause(), Err(OgvError::InvalidState(_))));

    source.start(Some(0.0)).unwrap();
    assert_eq!(source.state(), SourceState::Started);
    source.set_rate(false, 2.0).unwrap();
    assert!(matches!(source.set_rate(true, 2.0), Err(OgvError::Unsupported(_))));
    source.pause().unwrap();
    assert_eq!(source.state(), SourceState::Paused);

    assert_eq!(source.next_event(), Some(SourceEvent::Started { position: Some(0.0) }));
    assert_eq!(source.next_event(), Some(SourceEvent::RateChanged(2.0)));
    assert_eq!(source.next_event(), Some(SourceEvent::Paused));
    assert_eq!(source.next_event(), None);
}

#[test]
fn test_ogv_not_playable_before_activation() {
    let dir = tempfile::tempdir().unwrap();
    write_sharks(dir.path());

    let registry = ogv::default_handler_registry();
    let mut pipeline = MediaPipeline::new(Arc::clone(&registry), dir.path());
    pipeline.set_source("/media/sharks.ogv");
    assert!(matches!(pipeline.load(), Err(OgvError::NotFound(_))));

    MediaExtensions::new(registry).ensure_initialized().unwrap();
    pipeline.set_source("/media/sharks.ogv");
    assert!(pipeline.load().is_ok());
}

#[test]
fn test_config_registrations_extend_registry() {
    let dir = tempfile::tempdir().unwrap();
    write_sharks(dir.path());
    std::fs::copy(
        dir.path().join("media/sharks.ogv"),
        dir.path().join("media/sharks.ogx"),
    )
    .unwrap();

    let config = AppConfig::from_json(
        r#"{ "media": { "extra_handlers": [
            { "extension": ".ogx", "mime_type": "application/ogg",
              "handler_id": "OgvSource.OgvByteStreamHandler" } ] } }"#,
    )
    .unwrap();

    let registry = activated_registry();
    config.apply_registrations(&registry).unwrap();
    assert_eq!(registry.len(), 2);

    let mut pipeline = MediaPipeline::new(registry, dir.path());
    pipeline.set_source("/media/sharks.ogx");
    let outcome = pipeline.load().unwrap();
    assert_eq!(outcome.handler_id(), Some(OGV_HANDLER));
}

#[test]
fn test_corrupt_ogv_fails_and_pipeline_recovers() {
    let dir = tempfile::tempdir().unwrap();
    write_sharks(dir.path());
    std::fs::write(dir.path().join("media/broken.ogv"), b"OggS\x00garbage").unwrap();

    let mut pipeline = MediaPipeline::new(activated_registry(), dir.path());
    pipeline.set_source("/media/broken.ogv");
    assert!(pipeline.load().is_err());
    assert_eq!(pipeline.state(), PipelineState::Failed);

    pipeline.set_source("/media/sharks.ogv");
    assert!(pipeline.load().is_ok());
}
