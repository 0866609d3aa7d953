//! Anim Host - headless 演示
//!
//! 加载配置，搭建场景，用手动时钟运行固定帧数并输出精灵状态。

use std::io;
use std::path::PathBuf;

use anim_host::{AppConfig, Player, SceneKind};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "anim-host")]
#[command(about = "动画引擎 headless 演示")]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "configs/slide.json")]
    config: PathBuf,

    /// 要运行的场景
    #[arg(short, long, value_enum)]
    scene: Option<SceneKind>,

    /// 运行的帧数
    #[arg(short, long)]
    frames: Option<u32>,

    /// 每帧时长（毫秒）
    #[arg(long)]
    frame_ms: Option<f64>,

    /// 每隔多少帧输出一次状态
    #[arg(long)]
    report_every: Option<u32>,

    /// 日志级别（error/warn/info/debug/trace）
    #[arg(short, long)]
    log_level: Option<String>,

    /// 把最终生效的配置保存到指定文件
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Cli {
    /// 命令行参数覆盖配置文件
    fn apply(&self, config: &mut AppConfig) {
        if let Some(scene) = self.scene {
            config.scene = scene;
        }
        if let Some(frames) = self.frames {
            config.playback.frames = frames;
        }
        if let Some(frame_ms) = self.frame_ms {
            config.playback.frame_ms = frame_ms;
        }
        if let Some(every) = self.report_every {
            config.playback.report_every = every;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 日志尚未初始化，加载失败的原因稍后补记
    let (mut config, load_error) = if cli.config.exists() {
        match AppConfig::try_load(&cli.config) {
            Ok(config) => (config, None),
            Err(e) => (AppConfig::default(), Some(e)),
        }
    } else {
        (AppConfig::default(), None)
    };
    cli.apply(&mut config);

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_writer(io::stderr)
        .init();

    match load_error {
        Some(e) => warn!(path = %cli.config.display(), error = %e, "使用默认配置"),
        None if !cli.config.exists() => {
            warn!(path = %cli.config.display(), "配置文件不存在，使用默认配置")
        }
        None => info!(path = %cli.config.display(), "配置文件加载成功"),
    }

    config.validate()?;

    if let Some(path) = &cli.save_config {
        config.save(path)?;
        info!(path = %path.display(), "配置已保存");
    }

    let mut player = Player::new(config)?;
    let stdout = io::stdout();
    let summary = player.run(&mut stdout.lock())?;

    println!();
    println!(
        "{} 帧 / {:.1} ms，舞台上剩余 {} 个目标，{}",
        summary.frames,
        summary.elapsed_ms,
        summary.visible_targets,
        if summary.finished {
            "动画已全部结束"
        } else {
            "仍有动画在运行"
        }
    );
    Ok(())
}
