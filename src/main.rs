use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use apiharness::config::{load_config, EnvironmentBuilder};
use apiharness::executor::{print_exchange, Attachment, Query, RequestBody, RequestExecutor};
use apiharness::report::{write_report, ReportEntry};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "apiharness",
    version,
    about = "Fire API requests and capture normalized request/response records",
    disable_help_subcommand = true
)]
struct Cli {
    /// Directory or file containing apiharness.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Select a profile from apiharness.json
    #[arg(short = 'P', long, global = true)]
    profile: Option<String>,

    /// Override env file relative to config directory
    #[arg(short, long, global = true)]
    env: Option<PathBuf>,

    /// Base URL to use instead of the profile's
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override base directory used for resolving paths
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Directory to store response bodies
    #[arg(long = "output", short = 'O', global = true)]
    output: Option<PathBuf>,

    /// Preview the first N bytes of the response data
    #[arg(short, long, global = true)]
    preview: Option<usize>,

    /// Print the exchange record as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    /// Write a JSON report of the exchange to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a GET request
    Get(Target),
    /// Send a POST request
    Post(Payload),
    /// Send a PUT request
    Put(Payload),
    /// Send a DELETE request
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
struct Target {
    /// Endpoint relative to the base URL
    #[arg(value_name = "ENDPOINT")]
    endpoint: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_pair)]
    query: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct Payload {
    #[command(flatten)]
    target: Target,

    /// Request body; sent as JSON when it parses as JSON, verbatim otherwise
    #[arg(short, long, conflicts_with = "file")]
    body: Option<String>,

    /// File to upload as multipart field "file"
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    #[command(flatten)]
    target: Target,

    /// Request body; sent as JSON when it parses as JSON, verbatim otherwise
    #[arg(short, long)]
    body: Option<String>,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

fn parse_body(raw: Option<String>) -> Option<RequestBody> {
    raw.map(|text| match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => RequestBody::Json(value),
        Err(_) => RequestBody::Text(text),
    })
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let base_dir = match &cli.cwd {
        Some(cwd) => resolve_path(cwd)?,
        None => std::env::current_dir()?,
    };

    let config_target = cli
        .config
        .as_ref()
        .map(|p| resolve_relative(&base_dir, p))
        .unwrap_or_else(|| base_dir.clone());
    let cfg = load_config(&config_target).context("loading configuration")?;
    let config_dir = cfg
        .as_ref()
        .map(|c| c.dir.clone())
        .unwrap_or_else(|| base_dir.clone());

    let environment = EnvironmentBuilder::new(base_dir.clone(), cfg)
        .profile(cli.profile.clone())
        .env_file(cli.env.as_ref().map(|p| resolve_relative(&config_dir, p)))
        .output_dir(cli.output.clone())
        .build()?;

    let mut api = environment.api;
    if let Some(base_url) = &cli.base_url {
        api.base_url = base_url.clone();
    }
    if api.base_url.is_empty() {
        bail!("No base URL: pass --base-url or define a profile in apiharness.json");
    }

    let executor = RequestExecutor::new(api);
    let record = match cli.command {
        Commands::Get(target) => {
            let query = to_query(target.query);
            executor.get(&target.endpoint, query.as_ref()).await?
        }
        Commands::Post(payload) => {
            let query = to_query(payload.target.query);
            let file = attachment(&base_dir, payload.file.as_deref());
            executor
                .post(
                    &payload.target.endpoint,
                    query.as_ref(),
                    parse_body(payload.body),
                    file.as_ref(),
                )
                .await?
        }
        Commands::Put(payload) => {
            let query = to_query(payload.target.query);
            let file = attachment(&base_dir, payload.file.as_deref());
            executor
                .put(
                    &payload.target.endpoint,
                    query.as_ref(),
                    parse_body(payload.body),
                    file.as_ref(),
                )
                .await?
        }
        Commands::Delete(args) => {
            let query = to_query(args.target.query);
            executor
                .delete(&args.target.endpoint, query.as_ref(), parse_body(args.body))
                .await?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_exchange(&record, cli.preview);
    }

    if let Some(report) = &cli.report {
        let path = resolve_relative(&base_dir, report);
        write_report(&path, &ReportEntry::from_record(&record)?)?;
    }

    Ok(())
}

fn attachment(base_dir: &Path, file: Option<&Path>) -> Option<Attachment> {
    file.map(|path| Attachment::from(resolve_relative(base_dir, path).as_path()))
}

fn to_query(pairs: Vec<(String, String)>) -> Option<Query> {
    (!pairs.is_empty()).then(|| pairs.into_iter().collect())
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
