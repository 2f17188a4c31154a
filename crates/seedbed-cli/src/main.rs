mod config;
mod redaction;
mod registry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use seedbed_core::{
    CoreError, Identity, Operation, Outcome, Registry, Report, Role, dependency_report,
};
use seedbed_generate::{
    BatchRunner, FixtureError, FixtureService, PresetCatalog, PresetRunner, Request, authorize,
};
use seedbed_store::{MemoryStore, PostgresOptions, PostgresStore, Store, StoreError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use config::SeedbedConfig;
use redaction::{RedactedConnection, redact_connection};
use registry::{RunContext, init_run_logging, start_run, write_report};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
    #[error("{failed} of {total} steps failed; see {report}")]
    RunFailed {
        failed: usize,
        total: usize,
        report: String,
    },
}

#[derive(Parser, Debug)]
#[command(name = "seedbed", version, about = "Seedbed fixture lifecycle manager")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Path to seedbed.toml.
    #[arg(long, global = true, default_value = "seedbed.toml")]
    config: PathBuf,
    /// Postgres connection string.
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,
    /// Run against an in-process store instead of the database.
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,
    /// Role of the invoking identity.
    #[arg(long, global = true, env = "SEEDBED_ROLE", default_value = "viewer")]
    role: Role,
    /// Subject of the invoking identity.
    #[arg(long, global = true, env = "SEEDBED_SUBJECT")]
    subject: Option<String>,
    /// Output directory for runs.
    #[arg(long, global = true, default_value = "runs")]
    run_dir: PathBuf,
    /// Generation seed; overrides the config file.
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate records of one entity type.
    Generate {
        entity_type: String,
        #[arg(long, short = 'n')]
        count: Option<u64>,
    },
    /// Delete records of one entity type, keeping protected ones.
    Clear { entity_type: String },
    /// Print records of one entity type as JSON lines.
    Read {
        entity_type: String,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Realize a named preset in dependency order.
    Preset { name: String },
    /// Clear every fixture-owned entity type, children first.
    ClearAll,
    /// List configured presets.
    Presets,
    /// Print the dependency graph summary.
    Graph,
}

/// Work that needs a store, a run directory and the role gate.
enum Job {
    Single(Request),
    Preset(String),
    ClearAll,
}

impl Job {
    fn label(&self) -> String {
        match self {
            Job::Single(request) => request.operation.to_string(),
            Job::Preset(_) => "preset".to_string(),
            Job::ClearAll => "clear-all".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = SeedbedConfig::load(&cli.global.config)?;
    let registry = config.registry()?;
    let catalog = config.catalog(&registry)?;

    let job = match cli.command {
        Command::Presets => return print_presets(&catalog),
        Command::Graph => {
            let report = dependency_report(&registry)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        Command::Generate { entity_type, count } => Job::Single(Request {
            entity_type,
            operation: Operation::Generate,
            count,
        }),
        Command::Clear { entity_type } => Job::Single(Request::clear(entity_type)),
        Command::Read { entity_type, limit } => Job::Single(Request::read(entity_type, limit)),
        Command::Preset { name } => Job::Preset(name),
        Command::ClearAll => Job::ClearAll,
    };

    run_job(cli.global, job, config, registry, catalog).await
}

async fn run_job(
    global: GlobalArgs,
    job: Job,
    config: SeedbedConfig,
    registry: Registry,
    catalog: PresetCatalog,
) -> Result<(), CliError> {
    let GlobalArgs {
        database_url,
        dry_run,
        role,
        subject,
        run_dir,
        seed,
        ..
    } = global;
    let subject = subject
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string());
    let identity = Identity::new(subject, role);
    authorize(&identity)?;

    let (store, connection) = open_store(database_url.as_deref(), dry_run, &config).await?;
    let batch = BatchRunner::new(
        Arc::new(registry),
        store.clone(),
        config.runner_options(seed),
    );

    let run_ctx = RunContext {
        run_id: Uuid::new_v4(),
        started_at: chrono::Utc::now(),
        command: job.label(),
        engine: store.engine().to_string(),
        subject: identity.subject.clone(),
        role: identity.role,
        seed: Some(batch.seed()),
        run_dir,
        connection,
        config,
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_ctx.run_id,
        command = %run_ctx.command,
        engine = %run_ctx.engine,
        seed = batch.seed()
    );
    let timer = Instant::now();

    let service = FixtureService::new(identity, PresetRunner::new(batch, catalog))?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(event = "cancel_requested");
            watcher.cancel();
        }
    });
    let mut progress = |outcome: &Outcome| println!("{}", render_outcome(outcome));

    let mut report = match job {
        Job::Single(request) => {
            let print_records = request.operation == Operation::Read;
            let step = service.dispatch(request).await;
            progress(&step.outcome);
            if print_records {
                for record in &step.records {
                    println!("{}", serde_json::to_string(record)?);
                }
            }
            let mut report = Report::new(None);
            report.push(step.outcome);
            report
        }
        Job::Preset(name) => service.run_preset(&name, &mut progress, &cancel).await?,
        Job::ClearAll => service.clear_all(&mut progress, &cancel).await?,
    };
    report.run_id = run_ctx.run_id;
    write_report(&run_paths, &report)?;

    tracing::info!(
        event = "run_finished",
        status = if report.is_success() { "success" } else { "partial" },
        succeeded = report.succeeded(),
        failed = report.failed(),
        affected = report.affected_total(),
        duration_ms = timer.elapsed().as_millis() as u64
    );

    println!(
        "{} succeeded, {} failed, {} records affected ({})",
        report.succeeded(),
        report.failed(),
        report.affected_total(),
        run_paths.root.display()
    );

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::RunFailed {
            failed: report.failed(),
            total: report.outcomes().len(),
            report: run_paths.report_path.display().to_string(),
        })
    }
}

async fn open_store(
    database_url: Option<&str>,
    dry_run: bool,
    config: &SeedbedConfig,
) -> Result<(Arc<dyn Store>, Option<RedactedConnection>), CliError> {
    if dry_run {
        return Ok((Arc::new(MemoryStore::new()), None));
    }

    let url = database_url.ok_or_else(|| {
        CliError::InvalidConfig("--database-url or DATABASE_URL is required".to_string())
    })?;
    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        return Err(CliError::UnsupportedEngine(redact_connection(url).redacted));
    }

    let options = PostgresOptions {
        schema: config.schema.clone().unwrap_or_else(|| "public".to_string()),
        ..PostgresOptions::default()
    };
    let store = PostgresStore::connect(url, &options).await?;
    Ok((Arc::new(store), Some(redact_connection(url))))
}

fn print_presets(catalog: &PresetCatalog) -> Result<(), CliError> {
    for (name, counts) in catalog.iter() {
        let targets = counts
            .iter()
            .map(|(entity, count)| format!("{entity}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{name}: {targets}");
    }
    Ok(())
}

fn render_outcome(outcome: &Outcome) -> String {
    let status = match outcome.failure() {
        None => "ok".to_string(),
        Some(kind) => serde_json::to_value(kind)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| "failed".to_string()),
    };
    format!(
        "[{status}] {} {}: {} ({})",
        outcome.operation(),
        outcome.entity_type(),
        outcome.affected_count(),
        outcome.message()
    )
}
