use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use crate::db::DbConnection;
use crate::engine::{Annotator, EngineError, RequestContext};
use crate::repo::{AnnotationRepo, ImageRepo, SqliteStore};
use crate::workflow::{ProjectConfig, StageRegistry, TaskGraph, SAMPLE_CONFIG};
use crate::cli::error::{validate_image_hash, validate_non_empty, UsageError};
use crate::cli::output::{
    format_advance, format_dashboard, format_phase_progress, format_stats, format_step,
    format_task_list, get_terminal_width, ALL_DONE,
};
use crate::utils::sha256_file;
use anyhow::{Context, Result};

/// File extensions picked up when ingesting a directory
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

#[derive(Parser)]
#[command(name = "tagflow")]
#[command(about = "Staged image annotation with dependent tasks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project configuration file
    #[arg(long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,
    /// Database file (default: annotations.db next to the config)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
    /// Eligible images collected before picking one at random
    #[arg(long, global = true, default_value_t = crate::engine::DEFAULT_OFFSET_ADVANCE)]
    pub offset_advance: usize,
    /// Abort the request after this many milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a sample config (if absent) and create the database
    Init,
    /// Register image files or directories of images
    Ingest {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List tasks in stage order
    Tasks,
    /// Show the next image to annotate
    Next {
        /// Restrict to one task
        #[arg(long)]
        task: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Record an answer and show what comes next
    Submit {
        /// Image SHA-256
        image: String,
        /// Task id
        task: String,
        /// Class value
        value: String,
        /// Annotator name
        #[arg(long)]
        user: String,
    },
    /// Progress of one task over the whole dataset
    Progress {
        task: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Counts and progress for every task
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Image and annotation totals
    Stats,
}

/// Initialise logging: `warn` by default, `debug` with `--verbose`,
/// and `RUST_LOG` always wins
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format_timestamp(None)
    .try_init();
}

/// Parse the command line and run it
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    handle_command(cli)
}

pub fn handle_command(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Init => handle_init(&global),
        Commands::Ingest { paths } => handle_ingest(&global, &paths),
        Commands::Tasks => handle_tasks(&global),
        Commands::Next { task, json } => handle_next(&global, task.as_deref(), json),
        Commands::Submit { image, task, value, user } => {
            handle_submit(&global, &image, &task, &value, &user)
        }
        Commands::Progress { task, json } => handle_progress(&global, &task, json),
        Commands::Status { json } => handle_status(&global, json),
        Commands::Stats => handle_stats(&global),
    }
}

/// Loaded config plus an open, migrated, stage-checked database
struct Project {
    config: ProjectConfig,
    graph: Arc<TaskGraph>,
    conn: Connection,
}

impl Project {
    fn open(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        let db_path = DbConnection::resolve_path(&global.config, global.database.as_deref());
        let conn = DbConnection::open(&db_path)?;

        let report = StageRegistry::sync(&conn, &config.graph)?;
        if !report.registered.is_empty() {
            log::debug!("registered stages for {}", report.registered.join(", "));
        }

        let graph = Arc::new(config.graph.clone());
        Ok(Self { config, graph, conn })
    }

    fn annotator(&self, global: &GlobalArgs) -> Annotator<SqliteStore<'_>> {
        Annotator::new(Arc::clone(&self.graph), SqliteStore::new(&self.conn))
            .with_offset_advance(global.offset_advance)
    }
}

fn load_config(global: &GlobalArgs) -> Result<ProjectConfig> {
    let path = crate::db::expand_home(&global.config);
    if !path.exists() {
        return Err(UsageError::new(format!(
            "Config file not found: {}. Run 'tagflow init' to create one.",
            path.display()
        ))
        .into());
    }
    Ok(ProjectConfig::load(&path)?)
}

fn request_context(global: &GlobalArgs) -> RequestContext {
    let ctx = RequestContext::new();
    match global.timeout_ms {
        Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
        None => ctx,
    }
}

fn handle_init(global: &GlobalArgs) -> Result<()> {
    let config_path = crate::db::expand_home(&global.config);
    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
    } else {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        println!("Wrote sample config to {}", config_path.display());
    }

    let project = Project::open(global)?;
    let db_path = DbConnection::resolve_path(&global.config, global.database.as_deref());
    println!(
        "Database ready at {} ({} task(s))",
        db_path.display(),
        project.graph.len()
    );
    Ok(())
}

fn collect_image_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Failed to read directory: {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_image_extension(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(UsageError::new(format!("No such file or directory: {}", path.display())).into());
        }
    }
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn handle_ingest(global: &GlobalArgs, paths: &[PathBuf]) -> Result<()> {
    let project = Project::open(global)?;
    let files = collect_image_files(paths)?;

    let tx = project.conn.unchecked_transaction()?;
    let (mut added, mut known) = (0usize, 0usize);
    for file in &files {
        let sha256 = sha256_file(file)
            .with_context(|| format!("Failed to read image: {}", file.display()))?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        if ImageRepo::get_by_sha256(&tx, &sha256)?.is_some() {
            log::debug!("{} already ingested as {}", filename, sha256);
            known += 1;
            continue;
        }
        ImageRepo::create(&tx, &sha256, &filename)?;
        log::info!("Ingested {} ({})", filename, sha256);
        added += 1;
    }
    tx.commit()?;

    println!("Ingested {} new image(s), {} already known", added, known);
    Ok(())
}

fn handle_tasks(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    println!("{}", format_task_list(&config.graph));
    Ok(())
}

fn handle_next(global: &GlobalArgs, task_id: Option<&str>, json: bool) -> Result<()> {
    let project = Project::open(global)?;
    let annotator = project.annotator(global);
    let ctx = request_context(global);

    let step = annotator
        .next_step(&ctx, task_id)
        .context("Failed to pick the next image")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&step)?);
        return Ok(());
    }
    match step {
        Some(step) => {
            let task = annotator.get_task(&step.task_id);
            println!("{}", format_step(&step, task));
        }
        None => match task_id {
            Some(id) => println!("Task {} is done.", id),
            None => println!("{}", ALL_DONE),
        },
    }
    Ok(())
}

fn handle_submit(global: &GlobalArgs, image: &str, task_id: &str, value: &str, user: &str) -> Result<()> {
    validate_image_hash(image)?;
    validate_non_empty(user, "User")?;
    validate_non_empty(value, "Value")?;

    let project = Project::open(global)?;
    let task = project
        .graph
        .get_task(task_id)
        .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
    if !task.has_class(value) {
        let classes: Vec<&str> = task.classes.keys().map(|c| c.as_str()).collect();
        return Err(UsageError::new(format!(
            "'{}' is not a class of task {}. Expected one of: {}",
            value,
            task_id,
            classes.join(", ")
        ))
        .into());
    }
    if !project.config.is_known_user(user) {
        return Err(UsageError::new(format!("Unknown user: {}", user)).into());
    }
    if ImageRepo::get_by_sha256(&project.conn, image)?.is_none() {
        return Err(UsageError::new(format!("Unknown image: {}", image)).into());
    }

    let annotator = project.annotator(global);
    let ctx = request_context(global);
    let advance = annotator
        .submit_and_advance(&ctx, image, task_id, user, value)
        .context("Failed to submit annotation")?;

    println!("Recorded {}={} for {}", task_id, value, image);
    println!("{}", format_advance(&advance));
    Ok(())
}

fn handle_progress(global: &GlobalArgs, task_id: &str, json: bool) -> Result<()> {
    let project = Project::open(global)?;
    let annotator = project.annotator(global);
    let ctx = request_context(global);

    let progress = annotator.phase_progress(&ctx, task_id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
        return Ok(());
    }

    let task = annotator
        .get_task(task_id)
        .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
    let bar_width = get_terminal_width().saturating_sub(2).clamp(10, 60);
    println!("{}", format_phase_progress(task, &progress, bar_width));
    Ok(())
}

fn handle_status(global: &GlobalArgs, json: bool) -> Result<()> {
    let project = Project::open(global)?;
    let annotator = project.annotator(global);
    let ctx = request_context(global);

    let rows = annotator.dashboard(&ctx)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", format_dashboard(&rows));
    }
    Ok(())
}

fn handle_stats(global: &GlobalArgs) -> Result<()> {
    let project = Project::open(global)?;
    let images = ImageRepo::count(&project.conn)?;
    let stats = AnnotationRepo::stats(&project.conn)?;
    println!("{}", format_stats(images, &stats));
    Ok(())
}
