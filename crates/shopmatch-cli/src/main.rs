use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shopmatch_core::{AttributeDescriptor, RawResult};
use shopmatch_local::query::build_queries;
use shopmatch_local::search::{
    country_from_env, language_from_env, parse_serpapi_body, serpapi_api_key_from_env,
    SerpApiProvider, DEFAULT_TIMEOUT_MS,
};
use shopmatch_local::{find_product, FanoutOptions, Ranker, Tuning};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "shopmatch")]
#[command(about = "Find the product page that best matches an attribute description", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the ordered search-query variants for a descriptor (json).
    Queries(DescriptorArgs),
    /// Rank recorded search results offline (json).
    Rank(RankCmd),
    /// Search live via SerpApi and pick the best product page (json).
    Find(FindCmd),
    /// Diagnose configuration (json; booleans only, no secrets).
    Doctor,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct DescriptorArgs {
    /// Product category, e.g. "jedilni stol".
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    color: String,
    #[arg(long, default_value = "")]
    material: String,
    #[arg(long, default_value = "")]
    shape: String,
    #[arg(long, default_value = "")]
    legs: String,
    #[arg(long, default_value = "")]
    size: String,
    #[arg(long, default_value = "")]
    style: String,
    /// Restrict every variant to one storefront (appends `site:<domain>`).
    #[arg(long, default_value = "")]
    site: String,
}

impl DescriptorArgs {
    fn descriptor(&self) -> AttributeDescriptor {
        AttributeDescriptor {
            category: self.category.clone(),
            color: self.color.clone(),
            material: self.material.clone(),
            shape: self.shape.clone(),
            legs: self.legs.clone(),
            size: self.size.clone(),
            style: self.style.clone(),
            site: self.site.clone(),
        }
    }
}

#[derive(clap::Args, Debug)]
struct RankCmd {
    /// Query the candidates are scored against.
    #[arg(long)]
    query: String,
    /// JSON array of raw results, or a raw SerpApi response body.
    #[arg(long)]
    input: PathBuf,
    /// Number of candidates to report (pick + runners-up).
    #[arg(long, default_value_t = 1)]
    top: usize,
    /// JSON file overriding any subset of the ranking constants.
    #[arg(long)]
    tuning: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct FindCmd {
    #[command(flatten)]
    descriptor: DescriptorArgs,
    #[arg(long, default_value_t = 1)]
    top: usize,
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Per-request timeout (ms); capped at 10000.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
    /// Gap between consecutive variant launches (ms).
    #[arg(long, default_value_t = 400)]
    delay_ms: u64,
    /// Max results requested per variant.
    #[arg(long, default_value_t = 10)]
    max_results: usize,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Opt-in `KEY=VALUE` file. Never overrides variables already set in the process.
fn load_env_file() {
    let Ok(p) = std::env::var("SHOPMATCH_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let directive = ["SHOPMATCH_LOG", "RUST_LOG"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    // Stdout carries the JSON result.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
    let Some(p) = path else {
        return Ok(Tuning::default());
    };
    let txt = std::fs::read_to_string(p)
        .with_context(|| format!("read tuning file {}", p.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("parse tuning file {}", p.display()))
}

fn load_raw_results(path: &Path) -> Result<Vec<RawResult>> {
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("read input {}", path.display()))?;
    let v: serde_json::Value = serde_json::from_str(&txt)
        .with_context(|| format!("parse input {}", path.display()))?;
    if v.is_array() {
        Ok(serde_json::from_value(v)?)
    } else {
        Ok(parse_serpapi_body(&txt)?)
    }
}

fn print_json<T: serde::Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Queries(args) => {
            let variants = build_queries(&args.descriptor());
            print_json(&serde_json::json!({ "variants": variants }))?;
        }
        Commands::Rank(args) => {
            let tuning = load_tuning(args.tuning.as_deref())?;
            let raw = load_raw_results(&args.input)?;
            let report = Ranker::new(tuning).rank_report(&args.query, raw, args.top);
            print_json(&report)?;
        }
        Commands::Find(args) => {
            let tuning = load_tuning(args.tuning.as_deref())?;
            let client = reqwest::Client::builder()
                .user_agent(concat!("shopmatch/", env!("CARGO_PKG_VERSION")))
                .build()?;
            let provider = SerpApiProvider::from_env(client)?;
            let opts = FanoutOptions {
                max_results: args.max_results,
                timeout_ms: args.timeout_ms.min(DEFAULT_TIMEOUT_MS),
                politeness_delay_ms: args.delay_ms,
                top_n: args.top,
                ..FanoutOptions::from_env()
            };
            let report = find_product(
                &provider,
                &args.descriptor.descriptor(),
                &opts,
                &Ranker::new(tuning),
            )
            .await?;
            print_json(&report)?;
        }
        Commands::Doctor => {
            fn has_env(k: &str) -> bool {
                std::env::var(k).ok().is_some_and(|v| !v.trim().is_empty())
            }
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "doctor",
                "ok": true,
                "name": "shopmatch",
                "version": env!("CARGO_PKG_VERSION"),
                "configured": {
                    "serpapi": serpapi_api_key_from_env().is_some(),
                    "serpapi_endpoint_override": has_env("SHOPMATCH_SERPAPI_ENDPOINT"),
                    "env_file": has_env("SHOPMATCH_ENV_FILE"),
                },
                "country": country_from_env(),
                "language": language_from_env(),
                "tuning": Tuning::default(),
            });
            print_json(&v)?;
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "shopmatch",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("shopmatch {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}
