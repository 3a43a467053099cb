use clap::{Args, Parser, Subcommand};
use jobfill_engine::{DomMutation, FillReport, FormDocument, Skip};
use jobfill_vault::{shared, JsonFileStore, Profile, ProfileStore, Provenance, StoredProfile};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::config::{default_endpoint, AgentConfig};
use crate::extension::{Extension, LaunchOptions};
use crate::popup::ClickOutcome;
use crate::service::{ProfileDirectory, ProfileService};
use crate::source::ProfileSource;
use crate::{AgentError, Result};

#[derive(Parser)]
#[command(name = "jobfill", version, about = "Fill job application forms from your profile")]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Profile endpoint [default: localhost:5000, or localhost:5001 with --user-id]
    #[arg(long, global = true, env = "JOBFILL_ENDPOINT")]
    endpoint: Option<String>,

    /// Sent as `user_id` to the endpoint
    #[arg(long, global = true, env = "JOBFILL_USER_ID")]
    user_id: Option<String>,

    /// Profile cache file [default: <data dir>/jobfill/profile.json]
    #[arg(long, global = true, env = "JOBFILL_CACHE")]
    cache: Option<PathBuf>,

    /// Seconds between background refreshes
    #[arg(long, global = true, env = "JOBFILL_REFRESH_SECS", default_value_t = 3600)]
    refresh_secs: u64,

    /// Give up on the endpoint after this many seconds [default: wait forever]
    #[arg(long, global = true, env = "JOBFILL_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the profile and print it
    Fetch,
    /// Fetch the profile into the cache
    Refresh,
    /// Fill the forms of an HTML page
    Fill(FillArgs),
    /// Keep the cache fresh until interrupted
    Watch,
    /// Run a local profile service
    Serve(ServeArgs),
    /// Inspect or drop the cached profile
    Cache(CacheArgs),
}

#[derive(Args)]
struct FillArgs {
    #[arg(value_name = "PAGE")]
    page: PathBuf,
    /// Write the filled page here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Fill from the cached profile instead of fetching
    #[arg(long, default_value_t = false)]
    from_cache: bool,
    /// Write the fill reports and mutation journal here as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct ServeArgs {
    /// JSON file mapping user ids (and "default") to profiles
    #[arg(long, value_name = "FILE")]
    profiles: PathBuf,
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: String,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    Show,
    Clear,
    /// Replace the cached profile with one read from a JSON file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl GlobalArgs {
    fn config(&self) -> Result<AgentConfig> {
        let mut config = match &self.cache {
            Some(path) => AgentConfig::new(path),
            None => AgentConfig::with_default_cache()?,
        };
        config.user_id = self.user_id.clone();
        config.endpoint = self
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(self.user_id.as_deref()).to_string());
        if self.refresh_secs == 0 {
            return Err(AgentError::Config(
                "refresh interval must be at least one second".to_string(),
            ));
        }
        config.refresh_interval = Duration::from_secs(self.refresh_secs);
        config.request_timeout = self.timeout_secs.map(Duration::from_secs);
        Ok(config)
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let Cli { global, command } = cli;
    match command {
        Commands::Serve(args) => serve(args).await,
        Commands::Fetch => fetch(&global.config()?).await,
        Commands::Refresh => refresh(&global.config()?).await,
        Commands::Fill(args) => fill(&global.config()?, args).await,
        Commands::Watch => watch(&global.config()?).await,
        Commands::Cache(args) => cache(&global.config()?, args.command),
    }
}

async fn fetch(config: &AgentConfig) -> Result<ExitCode> {
    let source = ProfileSource::new(config)?;
    match source.fetch_profile().await {
        Some(profile) => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

async fn refresh(config: &AgentConfig) -> Result<ExitCode> {
    let source = ProfileSource::new(config)?;
    let store = shared(JsonFileStore::new(&config.cache_path));
    match source.refresh(&store).await {
        Some(_) => Ok(ExitCode::SUCCESS),
        None => Ok(ExitCode::FAILURE),
    }
}

async fn fill(config: &AgentConfig, args: FillArgs) -> Result<ExitCode> {
    let html = std::fs::read_to_string(&args.page)?;
    let document = FormDocument::parse_html(html)?;
    tracing::info!(page = %args.page.display(), controls = document.controls().len(), "loaded page");

    let store = shared(JsonFileStore::new(&config.cache_path));
    let extension = Extension::launch(config, store, document, LaunchOptions::default()).await?;

    let mut code = ExitCode::SUCCESS;
    if args.from_cache {
        extension.bus().fill_form().await?;
    } else if let ClickOutcome::Alert(message) = extension.popup().click().await? {
        eprintln!("{}", message);
        code = ExitCode::FAILURE;
    }

    let outcome = extension.shutdown().await?;
    for report in &outcome.reports {
        log_report(report);
    }
    if !outcome.document.is_modified() {
        tracing::warn!(page = %args.page.display(), "nothing on the page was filled");
    }
    if let Some(path) = &args.report {
        let record = FillRecord::new(&args.page, &outcome.reports, &outcome.document);
        write_report(path, &record)?;
    }

    let rendered = outcome.document.render_html();
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            tracing::info!(output = %path.display(), "wrote filled page");
        }
        None => print!("{}", rendered),
    }
    Ok(code)
}

/// What `fill --report` writes
#[derive(Serialize)]
struct FillRecord<'a> {
    page: &'a Path,
    reports: &'a [FillReport],
    journal: &'a [DomMutation],
}

impl<'a> FillRecord<'a> {
    fn new(page: &'a Path, reports: &'a [FillReport], document: &'a FormDocument) -> Self {
        Self {
            page,
            reports,
            journal: document.journal(),
        }
    }
}

fn write_report(path: &Path, record: &FillRecord<'_>) -> Result<()> {
    std::fs::write(path, serde_json::to_vec_pretty(record)?)?;
    tracing::info!(report = %path.display(), passes = record.reports.len(), "wrote fill report");
    Ok(())
}

fn log_report(report: &FillReport) {
    for (field, control) in report.filled() {
        tracing::info!(%field, %control, "filled");
    }
    for field in report.skipped(Skip::NoMatch) {
        tracing::debug!(%field, "no matching control");
    }
}

async fn watch(config: &AgentConfig) -> Result<ExitCode> {
    let store = shared(JsonFileStore::new(&config.cache_path));
    let options = LaunchOptions {
        install: true,
        refresh_every: Some(config.refresh_interval),
    };
    let extension = Extension::launch(config, store, FormDocument::new(), options).await?;
    tracing::info!(every = ?config.refresh_interval, "watching; Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    extension.shutdown().await?;
    Ok(ExitCode::SUCCESS)
}

async fn serve(args: ServeArgs) -> Result<ExitCode> {
    let directory = ProfileDirectory::load(&args.profiles)?;
    let service = ProfileService::bind(&args.addr, directory)?;
    tokio::task::spawn_blocking(move || service.run()).await?;
    Ok(ExitCode::SUCCESS)
}

fn cache(config: &AgentConfig, command: CacheCommand) -> Result<ExitCode> {
    let mut store = JsonFileStore::new(&config.cache_path);
    match command {
        CacheCommand::Show => match store.load()? {
            Some(entry) => {
                println!("{}", serde_json::to_string_pretty(&entry)?);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("No cached profile at {}", store.path().display());
                Ok(ExitCode::FAILURE)
            }
        },
        CacheCommand::Clear => {
            store.clear()?;
            tracing::info!(path = %store.path().display(), "cache cleared");
            Ok(ExitCode::SUCCESS)
        }
        CacheCommand::Import { file } => {
            let profile = Profile::from_json(&std::fs::read_to_string(&file)?)?;
            let fields = profile.len();
            store.save(StoredProfile {
                profile,
                provenance: Provenance::imported(Some(file.display().to_string())),
            })?;
            tracing::info!(from = %file.display(), fields, "profile imported into cache");
            Ok(ExitCode::SUCCESS)
        }
    }
}
