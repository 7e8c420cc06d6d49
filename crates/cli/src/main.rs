// mediarecon CLI - reconcile free-form file references against Wikimedia Commons

mod exit_codes;

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use serde::Serialize;

use mediarecon_config::{ConfigError, ServiceConfig, CONFIG_ENV_VAR};
use mediarecon_http::{HttpFetcher, HttpSettings, DEFAULT_USER_AGENT};
use mediarecon_recon::model::is_language_code;
use mediarecon_recon::{parse_extend, parse_queries, Gateway, ReconcileError, Reconciler};

use exit_codes::{reconcile_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "mediarecon")]
#[command(about = "Reconcile file references to Wikimedia Commons media ids")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Response language (overrides service.default_lang)
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the reconciliation service manifest
    #[command(after_help = "\
Examples:
  mediarecon manifest
  mediarecon manifest --service-url https://recon.example.org --lang de")]
    Manifest {
        /// Public base URL of the service (overrides endpoints.service_url)
        #[arg(long)]
        service_url: Option<String>,
    },

    /// Match a batch of file references to media ids
    #[command(after_help = "\
Examples:
  mediarecon query '{\"q0\":{\"query\":\"File:Commons-logo.svg\"}}'
  mediarecon query '{\"q0\":{\"query\":\"https://commons.wikimedia.org/wiki/File:Foo.jpg\"}}'
  cat queries.json | mediarecon query -")]
    Query {
        /// Query batch as JSON, or - to read stdin
        input: String,
    },

    /// Fetch metadata columns for matched media ids
    #[command(after_help = "\
Examples:
  mediarecon extend '{\"ids\":[\"M317966\"],\"properties\":[{\"id\":\"P180\"},{\"id\":\"wikitext\"}]}'
  mediarecon extend --lang de '{\"ids\":[\"M317966\"],\"properties\":[{\"id\":\"Cde\"}]}'
  cat extend.json | mediarecon extend -")]
    Extend {
        /// Extend request as JSON, or - to read stdin
        input: String,
    },

    /// Suggest properties for a name prefix
    #[command(after_help = "\
Examples:
  mediarecon suggest-properties dep
  mediarecon suggest-properties Cfr
  mediarecon suggest-properties wiki")]
    SuggestProperties {
        prefix: String,
    },

    /// Suggest media files for a title prefix
    #[command(after_help = "\
Examples:
  mediarecon suggest-entities 'Commons-logo'")]
    SuggestEntities {
        prefix: String,
    },

    /// Render an HTML preview for a media id
    #[command(after_help = "\
Examples:
  mediarecon preview M317966 > preview.html
  mediarecon preview https://commons.wikimedia.org/entity/M317966")]
    Preview {
        /// Media id (M<digits>) or entity URL
        id: String,
    },

    /// List the properties proposed for media files
    #[command(after_help = "\
Examples:
  mediarecon propose-properties
  mediarecon propose-properties --lang fr --pretty")]
    ProposeProperties,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("MEDIARECON_COMMIT"), ")",
        "\ntarget:      ", env!("MEDIARECON_TARGET"),
        "\nprotocol:    reconciliation API 0.2",
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, _) => LevelFilter::Debug,
    };
    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let (config, used) = ServiceConfig::load(cli.config.as_deref()).map_err(CliError::config)?;
    match &used {
        Some(path) => debug!("config loaded from {}", path.display()),
        None => debug!("no config file, using defaults"),
    }

    if let Some(lang) = cli.lang.as_deref() {
        if !is_language_code(lang) {
            return Err(CliError::new(EXIT_USAGE, format!("--lang is not a language code: {:?}", lang))
                .with_hint("use a code such as en, de, or pt-br"));
        }
    }

    let reconciler = build_reconciler(&config)?;
    let lang = cli.lang.as_deref();
    let pretty = cli.pretty;

    match cli.command {
        Commands::Manifest { service_url } => {
            let url = service_url.unwrap_or_else(|| config.endpoints.service_url.clone());
            print_json(&reconciler.manifest(&url, lang), pretty)
        }
        Commands::Query { input } => cmd_query(&reconciler, &input, pretty),
        Commands::Extend { input } => cmd_extend(&reconciler, &input, lang, pretty),
        Commands::SuggestProperties { prefix } => {
            let response = reconciler.suggest_properties(&prefix, lang).map_err(CliError::reconcile)?;
            print_json(&response, pretty)
        }
        Commands::SuggestEntities { prefix } => {
            let response = reconciler.suggest_entities(&prefix).map_err(CliError::reconcile)?;
            print_json(&response, pretty)
        }
        Commands::Preview { id } => cmd_preview(&reconciler, &id),
        Commands::ProposeProperties => {
            let response = reconciler.propose_properties(lang).map_err(CliError::reconcile)?;
            print_json(&response, pretty)
        }
    }
}

fn build_reconciler(config: &ServiceConfig) -> Result<Reconciler<HttpFetcher>, CliError> {
    let settings = HttpSettings {
        user_agent: config.http.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        timeout: Duration::from_secs(config.http.timeout_secs),
        max_retries: config.http.max_retries,
        ..HttpSettings::default()
    };
    let fetcher = HttpFetcher::new(&settings)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot build HTTP client: {}", e)))?;
    let gateway = Gateway::new(fetcher, config.endpoints()).with_batch_size(config.service.batch_size);
    Ok(Reconciler::new(gateway, config.reconciler_options()))
}

// ============================================================================
// query / extend
// ============================================================================

fn cmd_query(reconciler: &Reconciler<HttpFetcher>, input: &str, pretty: bool) -> Result<(), CliError> {
    let payload = read_payload(input)?;
    let batch = parse_queries(&payload).map_err(CliError::reconcile)?;
    let response = reconciler.query(&batch).map_err(CliError::reconcile)?;

    let diag = &response.diagnostics;
    if !diag.is_clean() {
        info!(
            "query: {} unmatched, {} orphan pages",
            diag.unmatched_queries, diag.orphan_pages
        );
    }
    print_json(&response, pretty)
}

fn cmd_extend(
    reconciler: &Reconciler<HttpFetcher>,
    input: &str,
    lang: Option<&str>,
    pretty: bool,
) -> Result<(), CliError> {
    let payload = read_payload(input)?;
    let request = parse_extend(&payload).map_err(CliError::reconcile)?;

    match reconciler.extend(request.as_ref(), lang).map_err(CliError::reconcile)? {
        Some(result) => {
            let diag = &result.diagnostics;
            if !diag.is_clean() {
                info!(
                    "extend: {} failed batches, {} unresolved labels, {} dropped claims",
                    diag.failed_batches, diag.unresolved_labels, diag.dropped_claims
                );
            }
            print_json(&result, pretty)
        }
        None => print_json(&serde_json::json!({}), pretty),
    }
}

// ============================================================================
// preview
// ============================================================================

fn cmd_preview(reconciler: &Reconciler<HttpFetcher>, id: &str) -> Result<(), CliError> {
    match reconciler.preview(id).map_err(CliError::reconcile)? {
        Some(html) => write_stdout(&html),
        None => Err(CliError::reconcile(ReconcileError::NotFound(format!("no file behind {}", id)))
            .with_hint("check the id with `mediarecon suggest-entities <title>`")),
    }
}

// ============================================================================
// I/O helpers
// ============================================================================

/// Inline JSON, or stdin when `input` is `-`.
fn read_payload(input: &str) -> Result<String, CliError> {
    if input != "-" {
        return Ok(input.to_string());
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| CliError::new(EXIT_USAGE, format!("cannot read stdin: {}", e)))?;
    Ok(buf)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let text = match pretty {
        true => serde_json::to_string_pretty(value),
        false => serde_json::to_string(value),
    }
    .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot serialize response: {}", e)))?;
    write_stdout(&text)
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", text).map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Engine error: the message is the `{error, message}` body.
    pub fn reconcile(err: ReconcileError) -> Self {
        let code = reconcile_exit_code(&err);
        let hint = match &err {
            ReconcileError::InvalidInput(_) => {
                Some("see `mediarecon <command> --help` for the expected payload".to_string())
            }
            ReconcileError::Remote { .. } => {
                Some("retry later, or raise http.max_retries in the config".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_body().to_string(), hint }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Io(_) => Some(format!("pass --config <path> or set {}", CONFIG_ENV_VAR)),
            _ => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
