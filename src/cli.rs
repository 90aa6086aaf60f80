//! Command-line shell: `edrs analyze|estimate|login|logout|whoami`.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config;
use crate::pipeline::analysis::{BatchOutcome, HttpAnalysisBackend, UploadOrchestrator};
use crate::pipeline::upload::{EventSink, SizeCategory, UploadEvent};
use crate::report::{export_report, ArtifactNames, ExportedArtifact, ReportDocument};
use crate::session::{Credentials, SessionContext, SessionStore};
use crate::timeout_estimation::estimate_for_file;
use crate::upload_config::{ReportFormat, UploadConfig, DEFAULT_ANALYSIS_TYPE};

/// EDRS document analysis client
#[derive(Parser, Debug)]
#[command(name = "edrs", version, about = "Upload engineering documents for EDRS analysis")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Session file (defaults to the application data directory)
    #[arg(long, global = true, env = "EDRS_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload documents and write analysis reports
    Analyze(AnalyzeArgs),
    /// Show the upload timeout each file would get
    Estimate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Start a session
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "EDRS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Bearer token to send with uploads
        #[arg(long)]
        token: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show the logged-in user
    Whoami,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Report format: json or pdf
    #[arg(short, long, default_value = "json")]
    pub format: ReportFormat,

    #[arg(long, default_value = DEFAULT_ANALYSIS_TYPE)]
    pub analysis_type: String,

    /// Directory for report artifacts
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Overrides the logged-in session's token
    #[arg(long, env = config::API_TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = config::API_BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Show a locally generated demo analysis when the backend is unreachable
    #[arg(long)]
    pub demo_fallback: bool,

    #[arg(long)]
    pub max_retries: Option<u32>,
}

impl AnalyzeArgs {
    /// Layer flags over defaults. An explicit token wins over the session's.
    pub fn upload_config(&self, session_token: Option<String>) -> UploadConfig {
        let mut config = match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => UploadConfig::for_backend(url),
            _ => UploadConfig::default(),
        };
        config.report_format = self.format;
        config.analysis_type = self.analysis_type.clone();
        config.demo_fallback = self.demo_fallback;
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        config.bearer_token = self
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or(session_token);
        config
    }
}

/// Prints notifications to stderr, one line each.
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: &UploadEvent) {
        let marker = match event {
            UploadEvent::Succeeded { .. } => "ok",
            UploadEvent::DemoFallback { .. } => "demo",
            UploadEvent::Retrying { .. } => "retry",
            e if e.is_failure() => "error",
            _ => "..",
        };
        eprintln!("[{marker}] {}", event.message());
    }
}

// ═══════════════════════════════════════════════════════════
// Entry
// ═══════════════════════════════════════════════════════════

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "edrs_lib=debug,edrs=debug,warn"
    } else {
        config::default_log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("{} client v{}", config::APP_NAME, config::APP_VERSION);

    let store = cli
        .session_file
        .clone()
        .map(SessionStore::new)
        .unwrap_or_else(SessionStore::default_location);
    let session = SessionContext::with_store(store).context("Failed to open session")?;

    execute(cli.command, &session).await
}

pub async fn execute(command: Command, session: &SessionContext) -> Result<()> {
    match command {
        Command::Analyze(args) => {
            let summary = analyze(&args, session, Arc::new(ConsoleSink)).await?;
            print_summary(&summary);
            let failed = summary.batch.failed() + summary.batch.rejected.len();
            if failed > 0 {
                bail!("{failed} file(s) were not analyzed");
            }
            Ok(())
        }
        Command::Estimate { files } => {
            for line in estimate_lines(&files, &UploadConfig::default()) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Login {
            email,
            password,
            token,
        } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let mut credentials = Credentials::new(email, password);
            if let Some(token) = token {
                credentials = credentials.with_token(token);
            }
            let user = session.login(credentials)?;
            println!("Logged in as {} <{}>", user.display_name, user.email);
            Ok(())
        }
        Command::Logout => {
            if session.logout()? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
            Ok(())
        }
        Command::Whoami => {
            match session.current()? {
                Some(user) => println!(
                    "{} <{}> ({}), since {}",
                    user.display_name,
                    user.email,
                    user.user_id,
                    user.logged_in_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => println!("Not logged in"),
            }
            Ok(())
        }
    }
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

// ═══════════════════════════════════════════════════════════
// analyze
// ═══════════════════════════════════════════════════════════

pub struct AnalyzeSummary {
    pub batch: BatchOutcome,
    pub artifacts: Vec<ExportedArtifact>,
}

/// Upload every file, then export one report per successful analysis.
/// Export failures are logged and do not abort the remaining reports.
pub async fn analyze(
    args: &AnalyzeArgs,
    session: &SessionContext,
    events: Arc<dyn EventSink>,
) -> Result<AnalyzeSummary> {
    let config = args.upload_config(session.bearer_token()?);
    let backend = HttpAnalysisBackend::from_config(&config)?;
    tracing::info!(endpoint = %backend.endpoint(), files = args.files.len(), "Starting analysis batch");

    let orchestrator = UploadOrchestrator::new(backend, config).with_events(events);
    let batch = orchestrator.run_batch(&args.files).await?;

    let mut names = ArtifactNames::new(&args.out_dir);
    let mut artifacts = Vec::new();
    for outcome in &batch.outcomes {
        let Some(doc) = ReportDocument::from_outcome(outcome) else {
            continue;
        };
        let backend_report = outcome.analysis.as_ref().and_then(|a| a.report.as_ref());
        match export_report(&doc, backend_report, args.format, &mut names) {
            Ok(artifact) => artifacts.push(artifact),
            Err(e) => {
                tracing::error!(file = %doc.file_name, error = %e, "Failed to write report");
            }
        }
    }

    Ok(AnalyzeSummary { batch, artifacts })
}

fn print_summary(summary: &AnalyzeSummary) {
    let batch = &summary.batch;
    for outcome in &batch.outcomes {
        let name = outcome.task.file_name();
        match &outcome.analysis {
            Some(a) if a.demo => println!("DEMO  {name}"),
            Some(a) => println!(
                "OK    {name}  confidence {}  risk {}",
                crate::report::format_confidence(&a.result.confidence_score),
                a.result.risk_level
            ),
            None => println!(
                "FAIL  {name}  {}",
                outcome.error().unwrap_or("unknown error")
            ),
        }
    }
    for r in &batch.rejected {
        println!("SKIP  {}  {}", r.file_name, r.reason);
    }
    for artifact in &summary.artifacts {
        let note = if artifact.fell_back {
            " (PDF unavailable, wrote JSON)"
        } else {
            ""
        };
        println!("Report: {}{note}", artifact.path.display());
    }
    println!(
        "{} succeeded, {} failed, {} rejected{}",
        batch.succeeded(),
        batch.failed(),
        batch.rejected.len(),
        if batch.demo_count() > 0 {
            format!(", {} demo", batch.demo_count())
        } else {
            String::new()
        }
    );
}

// ═══════════════════════════════════════════════════════════
// estimate
// ═══════════════════════════════════════════════════════════

pub fn estimate_lines(files: &[PathBuf], config: &UploadConfig) -> Vec<String> {
    files
        .iter()
        .map(|path| {
            let name = display_name(path);
            match std::fs::metadata(path) {
                Ok(meta) if meta.is_file() => {
                    let est = estimate_for_file(&config.timeouts, &name, meta.len());
                    format!(
                        "{name}: {:.2} MB ({}), {}, timeout {}s",
                        meta.len() as f64 / (1024.0 * 1024.0),
                        SizeCategory::from_size(meta.len()).as_str(),
                        if est.is_pid { "P&ID" } else { "generic" },
                        est.timeout.as_secs()
                    )
                }
                Ok(_) => format!("{name}: not a regular file"),
                Err(e) => format!("{name}: {e}"),
            }
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
