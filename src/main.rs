use anyhow::{Context, Result};
use clap::Parser;
use glam_patcher::io::DefaultPluginWriter;
use glam_patcher::scanner::ScanOptions;
use glam_patcher::{scan, write_patch, PatcherConfig, Session, SessionState};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "glam_patcher")]
#[command(about = "扫描护甲插件并生成 RequiemGlamPatcher 补丁")]
#[command(version)]
struct Cli {
    /// 游戏 Data 目录（默认为当前目录）
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glam_patcher=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("无法获取当前目录")?,
    };

    let config = PatcherConfig::load_or_default(&data_dir)
        .with_context(|| format!("无法读取配置: {:?}", data_dir))?;
    let templates = config
        .load_templates(&data_dir)
        .context("无法加载护甲模板")?;
    let classifier = config.classifier.build();

    println!("正在扫描: {:?}", data_dir);
    let report = scan(&data_dir, &ScanOptions::from(&config))
        .with_context(|| format!("无法扫描目录: {:?}", data_dir))?;

    for diagnostic in &report.diagnostics {
        println!("  加载失败 {}", diagnostic);
    }
    for (name, reason) in &report.skipped {
        println!("  跳过 {}: {}", name, reason);
    }

    let mut session = Session::new(&report.plugins, &templates, classifier.as_ref(), &config);
    run_session(&mut session)?;

    if session.state() != SessionState::Emitted {
        return Ok(());
    }

    let Some(result) = session.take_result() else {
        return Ok(());
    };
    let output = config.output_path(&data_dir);
    let backup = write_patch(&result.patch, &output, &DefaultPluginWriter, config.backup_existing)
        .with_context(|| format!("写出补丁失败: {:?}", output))?;

    if let Some(backup) = backup {
        println!("旧补丁已备份到: {:?}", backup);
    }
    println!("补丁已写出: {:?}", output);

    Ok(())
}

/// 逐行读取标准输入驱动会话，直到进入终止状态
///
/// 输入结束 (EOF) 视为退出。
fn run_session(session: &mut Session<'_>) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while !session.state().is_terminal() {
        print!("{}", session.prompt());
        io::stdout().flush()?;

        let input = match lines.next() {
            Some(line) => line?,
            None => "q".to_string(),
        };

        if let Err(e) = session.handle(&input) {
            println!("{}", e);
        }
    }

    print!("{}", session.prompt());
    Ok(())
}
