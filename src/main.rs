//! k8sh - apply, inspect and watch Kubernetes objects through k8s-handler
//!
//! Every subcommand maps onto one handler operation, so the binary doubles as
//! a smoke test for the library against a live cluster.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{ConfigSubcommand, ResourceCommand, Session};
use k8s_handler::config::ConfigLoader;
use std::path::PathBuf;

/// k8sh - per-kind Kubernetes handlers on the command line
#[derive(Parser, Debug)]
#[command(name = "k8sh", version)]
#[command(about = "Create, apply, patch and watch Kubernetes objects", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Namespace to work in (overrides the configured one)
    #[arg(long, short = 'n', global = true)]
    namespace: Option<String>,

    /// Send every mutating request as a server-side dry run
    #[arg(long, global = true)]
    dry_run: bool,

    /// Kubeconfig file to use
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    #[command(flatten)]
    Resource(ResourceCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle config subcommand
    let command = match args.command {
        Command::Config { subcommand } => return cli::handle_config_command(subcommand),
        Command::Resource(command) => command,
    };

    let log_file = cli::init_logging(args.debug);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    // Kinds is static; no cluster needed
    if matches!(command, ResourceCommand::Kinds) {
        cli::display_kinds();
        return Ok(());
    }

    let mut config = ConfigLoader::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration: {:#}, using defaults", e);
        ConfigLoader::load_defaults()
    });
    if let Some(namespace) = args.namespace.filter(|ns| !ns.is_empty()) {
        config.namespace = namespace;
    }
    if args.kubeconfig.is_some() {
        config.kubeconfig = args.kubeconfig;
    }
    if args.context.is_some() {
        config.context = args.context;
    }
    config.dry_run |= args.dry_run;

    tracing::debug!("Initializing Kubernetes client");
    let client = k8s_handler::kube::create_client(&config).await?;
    if let Some(context) = k8s_handler::kube::current_context(&config) {
        tracing::info!("Using context: {}", context);
    }
    tracing::debug!(
        namespace = %config.namespace,
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    let session = Session {
        client,
        namespace: config.namespace,
        dry_run: config.dry_run,
        field_manager: config.field_manager,
    };
    cli::handle_command(&session, command).await
}
