//! ogv-play - Ogg/Theora 播放触发演示工具
//!
//! 模拟应用生命周期: 启动与恢复时各执行一次启动钩子, 之后按 `--click`
//! 依次点击控件, 每次点击产生的播放请求交给宿主管线加载并输出结果.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use ogv::config::AppConfig;
use ogv::pipeline::{LoadOutcome, MediaPipeline};
use ogv::trigger::{ControlPanel, PlaybackTrigger, dispatch};
use ogv_format::{HandlerEntry, HandlerRegistry, MediaExtensions, StreamDescriptor, StreamParams};

/// Ogg/Theora 播放触发演示工具
#[derive(Parser, Debug)]
#[command(name = "ogv-play", version, about = "Ogg/Theora 播放触发演示工具")]
struct Cli {
    /// 配置文件路径 (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 媒体根目录, 覆盖配置文件
    #[arg(long)]
    media_root: Option<PathBuf>,

    /// 依次点击的控件 (可重复)
    #[arg(long = "click", value_name = "CONTROL")]
    clicks: Vec<String>,

    /// 列出注册表中的处理器
    #[arg(long)]
    list: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志详细程度 (-v debug, -vv ogv trace, -vvv 全局 trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// 输出结构体
// ============================================================

/// 完整输出
#[derive(Serialize)]
struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    handlers: Option<Vec<HandlerInfo>>,
    playbacks: Vec<PlaybackInfo>,
}

/// 注册表条目
#[derive(Serialize)]
struct HandlerInfo {
    extension: String,
    mime_type: String,
    handler_id: String,
}

impl From<HandlerEntry> for HandlerInfo {
    fn from(entry: HandlerEntry) -> Self {
        Self {
            extension: entry.extension,
            mime_type: entry.mime_type,
            handler_id: entry.handler_id,
        }
    }
}

/// 一次点击的结果
#[derive(Serialize)]
struct PlaybackInfo {
    control: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    handler_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    streams: Option<Vec<StreamInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// 流信息
#[derive(Serialize)]
struct StreamInfo {
    index: usize,
    id: u32,
    codec_type: String,
    codec_name: String,
    selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u32>,
}

fn build_stream_info(stream: &StreamDescriptor) -> StreamInfo {
    let mut info = StreamInfo {
        index: stream.index,
        id: stream.id,
        codec_type: stream.media_type.name().to_string(),
        codec_name: stream.codec.to_string(),
        selected: stream.selected,
        width: None,
        height: None,
        frame_rate: None,
        sample_rate: None,
        channels: None,
    };
    match &stream.params {
        StreamParams::Video {
            width,
            height,
            frame_rate,
            ..
        } => {
            info.width = Some(*width);
            info.height = Some(*height);
            info.frame_rate = frame_rate.is_valid().then(|| frame_rate.to_string());
        }
        StreamParams::Audio {
            sample_rate,
            channels,
        } => {
            info.sample_rate = Some(*sample_rate);
            info.channels = Some(*channels);
        }
        StreamParams::Other => {}
    }
    info
}

fn playback_info(control: &str, uri: &str, result: ogv_core::OgvResult<LoadOutcome>) -> PlaybackInfo {
    let mut info = PlaybackInfo {
        control: control.to_string(),
        uri: Some(uri.to_string()),
        status: "error",
        handler_id: None,
        streams: None,
        error: None,
    };
    match result {
        Ok(LoadOutcome::Native { .. }) => info.status = "native",
        Ok(LoadOutcome::Handler {
            handler_id,
            streams,
            ..
        }) => {
            info.status = "handler";
            info.handler_id = Some(handler_id);
            info.streams = Some(streams.iter().map(build_stream_info).collect());
        }
        Err(err) => info.error = Some(err.to_string()),
    }
    info
}

// ============================================================
// 生命周期
// ============================================================

/// 应用生命周期回调
struct App {
    extensions: MediaExtensions,
}

impl App {
    fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            extensions: MediaExtensions::new(registry),
        }
    }

    fn on_launched(&self) -> Result<()> {
        let performed = self
            .extensions
            .ensure_initialized()
            .context("启动时初始化媒体扩展失败")?;
        debug!("启动: 媒体扩展注册 {}", if performed { "完成" } else { "已存在" });
        Ok(())
    }

    fn on_resuming(&self) -> Result<()> {
        let performed = self
            .extensions
            .ensure_initialized()
            .context("恢复时初始化媒体扩展失败")?;
        debug!("恢复: 媒体扩展注册 {}", if performed { "完成" } else { "已存在" });
        Ok(())
    }

    /// 挂起时没有需要保存的状态
    fn on_suspending(&self) {
        debug!("挂起");
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("错误: {err:#}");
            process::exit(1);
        }
    }
}

/// 返回是否所有播放请求都加载成功
fn run(cli: &Cli) -> Result<bool> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(root) = &cli.media_root {
        config.media.media_root = root.clone();
    }
    ogv::logging::init(&config.logging, cli.verbose)?;
    info!("ogv-play 版本 {}", ogv::version());

    let registry = ogv::default_handler_registry();
    let app = App::new(Arc::clone(&registry));
    app.on_launched()?;
    app.on_resuming()?;
    config.apply_registrations(&registry)?;

    let mut pipeline = MediaPipeline::new(Arc::clone(&registry), &config.media.media_root)
        .with_native_extensions(&config.media.native_extensions);

    let (tx, rx) = mpsc::channel();
    let mut panel = ControlPanel::new();
    panel.subscribe(PlaybackTrigger::from_bindings(&config.media.bindings, tx));

    let mut playbacks = Vec::new();
    for control in &cli.clicks {
        panel.click(control);
        let mut handled = false;
        for request in rx.try_iter() {
            handled = true;
            let result = dispatch(&mut pipeline, &request);
            playbacks.push(playback_info(control, &request.uri, result));
        }
        if !handled {
            playbacks.push(PlaybackInfo {
                control: control.clone(),
                uri: None,
                status: "unbound",
                handler_id: None,
                streams: None,
                error: None,
            });
        }
    }
    app.on_suspending();

    let handlers: Option<Vec<HandlerInfo>> = cli
        .list
        .then(|| registry.entries().into_iter().map(HandlerInfo::from).collect());
    let report = Report {
        handlers,
        playbacks,
    };
    let success = report.playbacks.iter().all(|p| p.status != "error");

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("序列化输出失败")?;
        println!("{json}");
    } else {
        print_text(&report, &config);
    }
    Ok(success)
}

fn print_text(report: &Report, config: &AppConfig) {
    if let Some(handlers) = &report.handlers {
        println!("已注册的处理器:");
        for h in handlers {
            println!("  {:<8} {:<20} -> {}", h.extension, h.mime_type, h.handler_id);
        }
    }

    if report.playbacks.is_empty() {
        println!("可点击的控件:");
        for binding in &config.media.bindings {
            println!("  {:<10} -> {}", binding.control, binding.uri);
        }
        return;
    }

    for p in &report.playbacks {
        let uri = p.uri.as_deref().unwrap_or("-");
        match p.status {
            "handler" => {
                println!(
                    "[{}] {} -> {}",
                    p.control,
                    uri,
                    p.handler_id.as_deref().unwrap_or("-")
                );
                for s in p.streams.iter().flatten() {
                    let detail = match (s.width, s.height, s.sample_rate, s.channels) {
                        (Some(w), Some(h), _, _) => format!(
                            "{w}x{h}, {} fps",
                            s.frame_rate.as_deref().unwrap_or("?")
                        ),
                        (_, _, Some(rate), Some(ch)) => format!("{rate} Hz, {ch} 声道"),
                        _ => String::new(),
                    };
                    println!(
                        "    #{} {}: {} (serial=0x{:08X}) {}",
                        s.index, s.codec_type, s.codec_name, s.id, detail
                    );
                }
            }
            "native" => println!("[{}] {} -> 原生播放", p.control, uri),
            "unbound" => println!("[{}] 没有绑定播放 URI", p.control),
            _ => println!(
                "[{}] {} 加载失败: {}",
                p.control,
                uri,
                p.error.as_deref().unwrap_or("-")
            ),
        }
    }
}
