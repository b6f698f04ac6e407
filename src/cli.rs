use crate::{
    batch_plan::BatchPlan,
    config::{Config, Sensitivity},
    detector::{http::HttpDetector, Detector},
    discover::discover_images,
    orchestrator::{Orchestrator, ScanRequest},
    progress::{LogSink, ProgressMailbox, ScanEvent},
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "bunny-finder")]
#[command(about = "Scan a folder for images and collect the ones the detection service flags")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./bunny-finder.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the detection service is up.
    Doctor {},
    /// List the images and batches a scan would submit, without contacting the service.
    Plan {
        #[arg(long)]
        input: PathBuf,
    },
    Scan {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum)]
        sensitivity: Option<Sensitivity>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Plan { input } => plan(&cfg, input),
        Command::Scan {
            input,
            output,
            sensitivity,
        } => scan(
            &cfg,
            ScanRequest {
                input: input.clone(),
                output: output.clone(),
                sensitivity: sensitivity.unwrap_or(cfg.scan.default_sensitivity),
            },
        ),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("bunny-finder.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for the event stream.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let detector = HttpDetector::new(cfg)?;
    let health = detector.health()?;
    println!("{}", serde_json::to_string_pretty(&health)?);
    if !health.model_loaded {
        return Err(anyhow!("detection service reports no model loaded"));
    }
    Ok(())
}

fn plan(cfg: &Config, input: &Path) -> Result<()> {
    let files = discover_images(cfg, input)?;
    let plan = BatchPlan::new(files.len(), cfg.batch_size());
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "files": files,
            "plan": plan,
        }))?
    );
    Ok(())
}

fn scan(cfg: &Config, req: ScanRequest) -> Result<()> {
    let detector = HttpDetector::new(cfg)?;
    let orchestrator = Orchestrator::new(cfg, detector);

    let outcome = if cfg.output.emit_events {
        let mailbox = ProgressMailbox::new();
        std::thread::scope(|s| {
            let printer = s.spawn(|| {
                while let Some(ev) = mailbox.recv() {
                    print_event(&ev);
                }
            });
            let outcome = orchestrator.run(&req, &mailbox);
            mailbox.close();
            let _ = printer.join();
            outcome
        })?
    } else {
        orchestrator.run(&req, &LogSink)?
    };

    if !cfg.output.report_path.is_empty() {
        let path = PathBuf::from(&cfg.output.report_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(&outcome.report)?)
            .with_context(|| format!("writing report: {}", path.display()))?;
        info!("wrote scan report to {}", path.display());
    }

    let response = outcome.summary.to_response();
    if cfg.output.print_summary {
        println!("{}", serde_json::to_string(&response)?);
    }

    if response.success {
        Ok(())
    } else {
        Err(anyhow!(
            "scan failed: {}",
            response.error.unwrap_or_else(|| "unknown error".into())
        ))
    }
}

fn print_event(ev: &ScanEvent) {
    if let Ok(line) = serde_json::to_string(ev) {
        println!("{line}");
    }
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from("bunny-finder.log"))
}
