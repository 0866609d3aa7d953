//! # xtask
//!
//! 动画 workspace 的开发命令：`check-all`、`cov-runtime`、`cov-workspace`、`config-check`。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anim_host::AppConfig;
use anim_runtime::{FrameRate, SliceSequence};
use walkdir::WalkDir;

/// 执行 `cargo <args>`，失败时带上命令行返回错误
fn cargo(args: &[&str]) -> anyhow::Result<()> {
    let line = format!("cargo {}", args.join(" "));
    eprintln!("\n==> {line}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{line} failed with {status}");
    }
    Ok(())
}

/// 生成 HTML 覆盖率报告，`package` 为空时覆盖除 xtask 外的整个 workspace
fn coverage(package: Option<&str>) -> anyhow::Result<()> {
    let installed = Command::new("cargo")
        .args(["llvm-cov", "--version"])
        .status()
        .is_ok_and(|s| s.success());
    if !installed {
        anyhow::bail!("缺少 cargo-llvm-cov（cargo install cargo-llvm-cov）");
    }

    let mut args = vec!["llvm-cov"];
    match package {
        Some(package) => args.extend(["-p", package]),
        None => args.extend(["--workspace", "--exclude", "xtask"]),
    }
    args.extend(["--all-features", "--html"]);
    cargo(&args)?;
    eprintln!("\n报告: target/llvm-cov/html/index.html");
    Ok(())
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            cargo(&["fmt", "--all", "--", "--check"])?;
            cargo(&["clippy", "--workspace", "--all-targets"])?;
            cargo(&["test", "--workspace"])?;
        }
        "cov-runtime" => coverage(Some("anim-runtime"))?,
        "cov-workspace" => coverage(None)?,
        "config-check" => config_check(args.next().as_deref())?,
        "help" | "-h" | "--help" => print_help(),
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"USAGE: cargo xtask <command>

  check-all              fmt + clippy + test
  cov-runtime            anim-runtime 覆盖率
  cov-workspace          workspace 覆盖率（不含 xtask）
  config-check [path]    校验宿主配置与 *.seq.json 序列表，默认 configs/
"#
    );
}

/// `config-check` 默认目录（相对于 workspace root）
const DEFAULT_CONFIG_DIR: &str = "configs";

struct FileIssue {
    path: PathBuf,
    message: String,
}

fn config_check(path: Option<&str>) -> anyhow::Result<()> {
    let root = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_DIR));
    if !root.exists() {
        anyhow::bail!(
            "路径不存在: {}（请在 workspace 根目录运行）",
            root.display()
        );
    }

    let files = collect_json_files(&root);
    if files.is_empty() {
        eprintln!("未找到配置文件（.json）");
        return Ok(());
    }

    let issues: Vec<FileIssue> = files
        .iter()
        .filter_map(|file| {
            check_file(file).err().map(|e| FileIssue {
                path: file.clone(),
                message: format!("{e:#}"),
            })
        })
        .collect();

    for issue in &issues {
        eprintln!("[ERROR] {}: {}", issue.path.display(), issue.message);
    }
    eprintln!("{} 个文件，{} 个错误", files.len(), issues.len());
    if !issues.is_empty() {
        anyhow::bail!("配置检查未通过");
    }
    Ok(())
}

/// 收集所有 .json 文件（按路径排序）
fn collect_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn is_sequence_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".seq.json"))
}

/// 检查单个文件
fn check_file(path: &Path) -> anyhow::Result<()> {
    if is_sequence_file(path) {
        let content = std::fs::read_to_string(path)?;
        let sequences: HashMap<String, SliceSequence> = serde_json::from_str(&content)?;
        for (name, sequence) in &sequences {
            check_sequence(name, sequence)?;
        }
        return Ok(());
    }

    let config = AppConfig::try_load(path)?;
    config.validate()?;
    Ok(())
}

/// 检查切片序列
fn check_sequence(name: &str, sequence: &SliceSequence) -> anyhow::Result<()> {
    if sequence.slices.is_empty() {
        anyhow::bail!("序列 '{name}' 没有切片");
    }
    if let Some(i) = sequence
        .slices
        .iter()
        .position(|s| s.width <= 0.0 || s.height <= 0.0)
    {
        anyhow::bail!("序列 '{name}' 第 {i} 个切片尺寸无效");
    }
    match sequence.rate {
        FrameRate::Frames(0) => anyhow::bail!("序列 '{name}' 帧数必须大于 0"),
        FrameRate::Time(ms) if !(ms.is_finite() && ms > 0.0) => {
            anyhow::bail!("序列 '{name}' 时长必须大于 0")
        }
        _ => Ok(()),
    }
}
