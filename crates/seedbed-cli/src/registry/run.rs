use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use seedbed_core::{REPORT_VERSION, Report, Role};

use crate::config::SeedbedConfig;
use crate::redaction::RedactedConnection;

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub command: String,
    pub engine: String,
    pub subject: String,
    pub role: Role,
    pub seed: Option<u64>,
    pub run_dir: PathBuf,
    pub connection: Option<RedactedConnection>,
    pub config: SeedbedConfig,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig<'a> {
    pub run_id: Uuid,
    pub started_at: String,
    pub report_version: &'static str,
    pub command: &'a str,
    pub engine: &'a str,
    pub subject: &'a str,
    pub role: Role,
    pub seed: Option<u64>,
    pub connection: Option<&'a RedactedConnection>,
    pub config: &'a SeedbedConfig,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));
    create_dir_all(&root)?;

    let logs_path = root.join("logs.ndjson");
    let report_path = root.join("report.json");

    let config = RunConfig {
        run_id: ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        report_version: REPORT_VERSION,
        command: &ctx.command,
        engine: &ctx.engine,
        subject: &ctx.subject,
        role: ctx.role,
        seed: ctx.seed,
        connection: ctx.connection.as_ref(),
        config: &ctx.config,
        git: collect_git_info(),
    };
    write_json(&root.join("config.json"), &config)?;

    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        root,
        logs_path,
        report_path,
    })
}

pub fn write_report(paths: &RunPaths, report: &Report) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
