//! Dualclass CLI - Command line interface
//!
//! Project-based execution - all configuration from dualclass.json

use clap::Parser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;

mod config;
mod logging;
mod platform;

use crate::config::{parse_level, parse_subsystem, LogConfig};
use crate::logging::LogFormat;
use crate::platform::{print_error, print_output};
use dualclass_api::{DualclassError, EvaluateRequest, RunConfig};
use dualclass_config::ConfigError;
use tracing::info;

/// dualclass.json 中 CLI 关心的部分
///
/// `runtime` / `device` 两节由 `RunConfig::from_json_str` 解析。
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ProjectFile {
    /// 镜像到设备的快捷开关（同时启用设备）
    mirror_to_device: Option<bool>,
    /// 求值参数: source_id, dt, global_time, step
    #[serde(flatten)]
    evaluate: EvaluateRequest,
    /// 日志级别: "silent", "error", "warn", "info", "debug", "trace"
    log_level: Option<String>,
    /// 日志格式: "pretty", "compact", "json"
    log_format: Option<String>,
    /// 按子系统的日志级别，例如 { "mirror": "trace" }
    log: HashMap<String, String>,
    /// 日志文件
    log_file: Option<PathBuf>,
    /// 是否显示执行步骤
    show_steps: bool,
}

#[derive(Parser)]
#[command(
    name = "dualclass",
    about = "Dualclass class runtime - mirrored Mechanism evaluation",
    version = "0.1.0"
)]
struct Cli {
    /// Configuration file path (default: ./dualclass.json)
    #[arg(value_name = "CONFIG", default_value = "dualclass.json")]
    config: PathBuf,

    /// Override the log format from the configuration file
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Print errors as JSON reports
    #[arg(long)]
    json_errors: bool,
}

fn main() {
    let cli = Cli::parse();

    let content = match read_project_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let project: ProjectFile = match serde_json::from_str(&content) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: 解析 '{}' 失败: {}", cli.config.display(), e);
            process::exit(1);
        }
    };

    let log_config = build_log_config(&project);
    let format = cli
        .log_format
        .or_else(|| project.log_format.as_deref().and_then(LogFormat::parse))
        .unwrap_or(LogFormat::Compact);
    if let Err(e) = logging::init_with_file(&log_config, format, project.log_file.as_ref()) {
        eprintln!("Error: cannot open log file: {}", e);
        process::exit(1);
    }

    let run_config = match build_run_config(&project, &content) {
        Ok(config) => config,
        Err(e) => {
            print_error(&DualclassError::from(e), cli.json_errors);
            process::exit(1);
        }
    };
    info!(target: "dualclass::cli", config = %cli.config.display(), "starting");

    if project.show_steps {
        println!("[Dualclass Runtime]");
        println!("======================");
        println!("Config: {}", cli.config.display());
        println!(
            "Device: {}, mirror: {}",
            if run_config.device.enabled { "emulated" } else { "none" },
            run_config.mirrors()
        );
    }

    let session = match dualclass_api::init(run_config) {
        Ok(session) => session,
        Err(e) => {
            print_error(&e, cli.json_errors);
            process::exit(1);
        }
    };

    match session.evaluate(&project.evaluate) {
        Ok(output) => print_output(&output, project.show_steps),
        Err(e) => {
            print_error(&e, cli.json_errors);
            process::exit(1);
        }
    }
}

/// Read dualclass.json
fn read_project_file(path: &Path) -> Result<String, String> {
    if !path.exists() {
        return Err(format!(
            "未找到 '{}'\n\n提示: 创建 '{}' 文件，例如 {{ \"mirror_to_device\": true, \"source_id\": 1 }}",
            path.display(),
            path.display()
        ));
    }

    std::fs::read_to_string(path).map_err(|e| format!("无法读取 '{}': {}", path.display(), e))
}

/// Build run configuration from dualclass.json
fn build_run_config(project: &ProjectFile, content: &str) -> Result<RunConfig, ConfigError> {
    let mut config = RunConfig::from_json_str(content)?;
    if let Some(mirror) = project.mirror_to_device {
        config.runtime.mirror_to_device = mirror;
        config.device.enabled |= mirror;
    }
    Ok(config)
}

/// Build log configuration from dualclass.json
fn build_log_config(project: &ProjectFile) -> LogConfig {
    let mut log_config = LogConfig::default();
    if let Some(level) = project.log_level.as_deref().and_then(parse_level) {
        log_config.global = level;
    }
    for (name, level) in &project.log {
        match (parse_subsystem(name), parse_level(level)) {
            (Some(subsystem), Some(level)) => log_config.set(subsystem, level),
            // 日志系统尚未初始化
            _ => eprintln!("Warning: ignored log setting '{}' = '{}'", name, level),
        }
    }
    log_config
}
