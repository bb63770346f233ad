use clap::{Parser, Subcommand};

use bigbook_loader::config::{DEFAULT_BASE_URL, DEFAULT_CLIENT_ERRORS_PATH, DEFAULT_REGISTRY_PATH};
use bigbook_loader::error::RegistryError;
use bigbook_loader::registry::RegistrySource;
use bigbook_loader::registry::http::HttpRegistryClient;
use bigbook_loader::resolver::{ExportSelection, map_load_reference, resolve_component};
use bigbook_loader::{LoadError, LoaderConfig, RegistryDocument};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] bigbook_loader::config::ConfigError),
    #[error("registry fetch failed: {0}")]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("registry check found {0} problem(s)")]
    CheckFailed(usize),
}

#[derive(Parser, Debug)]
#[command(name = "bigbook", about = "Inspect the BigBook custom-components registry")]
struct Cli {
    #[arg(long, env = "BIGBOOK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "BIGBOOK_REGISTRY_PATH", default_value = DEFAULT_REGISTRY_PATH)]
    registry_path: String,

    #[arg(long, env = "BIGBOOK_SESSION_TOKEN")]
    session_token: Option<String>,

    #[arg(long, env = "BIGBOOK_REQUEST_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered components and menu items.
    List,
    /// Verify key/id agreement and path mapping for every entry.
    Check,
    /// Show how one identifier resolves.
    Resolve { identifier: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = LoaderConfig {
        base_url: cli.base_url.trim_end_matches('/').to_string(),
        registry_path: cli.registry_path,
        client_errors_path: DEFAULT_CLIENT_ERRORS_PATH.to_string(),
        session_token: cli.session_token.filter(|t| !t.is_empty()),
        request_timeout_secs: cli.timeout_secs,
        abort_superseded: false,
    };
    let client = HttpRegistryClient::from_config(&config)?;
    tracing::debug!(url = client.url(), "fetching registry");
    let document = client.fetch_registry().await?;

    match cli.command {
        Command::List => run_list(&document),
        Command::Check => run_check(&document),
        Command::Resolve { identifier } => run_resolve(&document, &identifier),
    }
}

fn run_list(document: &RegistryDocument) -> Result<(), CliError> {
    println!(
        "registry v{} ({} components, updated {})",
        document.version,
        document.components.len(),
        document.last_updated.as_deref().unwrap_or("never")
    );
    for (key, entry) in &document.components {
        let route = entry.route.as_deref().unwrap_or("-");
        println!("{key}\t{}\t{}\t{route}", entry.display_name, entry.path);
    }
    if !document.menu.is_empty() {
        println!("menu:");
        for item in &document.menu {
            println!("  {}\t{}", item.display_name, item.route);
        }
    }
    Ok(())
}

fn run_check(document: &RegistryDocument) -> Result<(), CliError> {
    let mut problems = 0;
    for mismatch in document.key_mismatches() {
        eprintln!("key '{}' has id '{}'", mismatch.key, mismatch.id);
        problems += 1;
    }
    for (key, entry) in &document.components {
        if let Err(e) = map_load_reference(&entry.path) {
            eprintln!("{key}: {e}");
            problems += 1;
        }
    }
    if problems > 0 {
        return Err(CliError::CheckFailed(problems));
    }
    println!("ok ({} components)", document.components.len());
    Ok(())
}

fn run_resolve(document: &RegistryDocument, identifier: &str) -> Result<(), CliError> {
    let resolution = resolve_component(document, identifier)?;
    let export = match &resolution.export {
        ExportSelection::Default => "default".to_string(),
        ExportSelection::Named(name) => name.clone(),
    };
    println!("id:        {}", resolution.entry.id);
    println!("name:      {}", resolution.entry.display_name);
    println!("path:      {}", resolution.entry.path);
    println!("reference: {}", resolution.reference);
    println!("export:    {export}");
    Ok(())
}
