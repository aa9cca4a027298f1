// crates/slugmap-cli/src/main.rs
// ============================================================================
// Module: Slugmap CLI Entry Point
// Description: Command dispatcher for the mapping server and store admin.
// Purpose: Run the HTTP server and inspect mappings from the command line.
// Dependencies: clap, slugmap-api, slugmap-config, slugmap-core,
//               slugmap-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The `slugmap` binary starts the HTTP server, validates configuration, and
//! runs mapping operations directly against the configured store. Results are
//! written to stdout as JSON lines; failures go to stderr with exit code 1.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use slugmap_api::SlugmapServer;
use slugmap_api::build_mapping_service;
use slugmap_config::SlugmapConfig;
use slugmap_config::StoreType;
use slugmap_core::MappingError;
use slugmap_core::MappingId;
use slugmap_core::MappingService;
use slugmap_core::MappingStore;
use slugmap_store_sqlite::SqliteMappingStore;
use slugmap_store_sqlite::StoredMapping;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default page size for `mapping list`.
const DEFAULT_LIST_LIMIT: usize = 100;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "slugmap", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Mapping store utilities.
    Mapping {
        /// Selected mapping subcommand.
        #[command(subcommand)]
        command: MappingCommand,
    },
}

/// Config file location shared by every command.
#[derive(Args, Debug, Clone)]
struct ConfigLocation {
    /// Config file path (defaults to `SLUGMAP_CONFIG`, then `slugmap.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file location.
    #[command(flatten)]
    location: ConfigLocation,
    /// Override the configured bind address.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
    /// Override the configured front-end directory.
    #[arg(long = "static-dir", value_name = "DIR")]
    static_dir: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigLocation),
}

/// Mapping subcommands.
#[derive(Subcommand, Debug)]
enum MappingCommand {
    /// Return the identifier for a slug and type, creating it if needed.
    GetId(MappingGetIdCommand),
    /// Resolve an identifier to its slug and type.
    Resolve(MappingResolveCommand),
    /// Page through stored mappings (`SQLite` store only).
    List(MappingListCommand),
    /// Check that the configured store is reachable.
    Health(ConfigLocation),
}

/// Arguments for `mapping get-id`.
#[derive(Args, Debug)]
struct MappingGetIdCommand {
    /// Config file location.
    #[command(flatten)]
    location: ConfigLocation,
    /// Content slug.
    #[arg(long, value_name = "SLUG")]
    slug: String,
    /// Content type, such as `series` or `chapter`.
    #[arg(long = "type", value_name = "TYPE")]
    kind: String,
}

/// Arguments for `mapping resolve`.
#[derive(Args, Debug)]
struct MappingResolveCommand {
    /// Config file location.
    #[command(flatten)]
    location: ConfigLocation,
    /// Identifier to resolve.
    #[arg(value_name = "UUID")]
    uuid: String,
}

/// Arguments for `mapping list`.
#[derive(Args, Debug)]
struct MappingListCommand {
    /// Config file location.
    #[command(flatten)]
    location: ConfigLocation,
    /// Maximum number of records to return.
    #[arg(long, value_name = "LIMIT", default_value_t = DEFAULT_LIST_LIMIT)]
    limit: usize,
    /// Identifier of the last record on the previous page.
    #[arg(long, value_name = "UUID")]
    after: Option<String>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Output format for listing commands.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// One JSON document.
    Json,
    /// Tab-separated lines.
    Text,
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Output for `mapping get-id`.
#[derive(Serialize)]
struct GetIdOutput {
    /// Issued or existing identifier.
    uuid: MappingId,
}

/// Output for `mapping list`.
#[derive(Serialize)]
struct ListOutput {
    /// Records on this page.
    mappings: Vec<StoredMapping>,
    /// Cursor for the next page, when the page was full.
    next_after: Option<MappingId>,
}

/// Output for `mapping health`.
#[derive(Serialize)]
struct HealthOutput {
    /// Overall status label.
    status: &'static str,
    /// Store connectivity label.
    database: &'static str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message shown to the user.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("slugmap {version}"))
            .map_err(|err| CliError::new(output_error(&err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Mapping {
            command,
        } => command_mapping(command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error(&err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error(&err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = load_config(command.location.config.as_deref())?;
    apply_serve_overrides(&mut config, command.bind, command.static_dir)?;

    let server = tokio::task::spawn_blocking(move || SlugmapServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;

    Ok(ExitCode::SUCCESS)
}

/// Applies command-line overrides and revalidates the server section.
fn apply_serve_overrides(
    config: &mut SlugmapConfig,
    bind: Option<String>,
    static_dir: Option<PathBuf>,
) -> CliResult<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(dir) = static_dir {
        config.server.static_dir = Some(dir);
    }
    config.validate().map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(location) => {
            let _config = load_config(location.config.as_deref())?;
            write_stdout_line("config ok").map_err(|err| CliError::new(output_error(&err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Mapping Commands
// ============================================================================

/// Dispatches mapping subcommands.
fn command_mapping(command: MappingCommand) -> CliResult<ExitCode> {
    match command {
        MappingCommand::GetId(command) => command_mapping_get_id(&command),
        MappingCommand::Resolve(command) => command_mapping_resolve(&command),
        MappingCommand::List(command) => command_mapping_list(&command),
        MappingCommand::Health(location) => command_mapping_health(&location),
    }
}

/// Executes `mapping get-id`.
fn command_mapping_get_id(command: &MappingGetIdCommand) -> CliResult<ExitCode> {
    let service = open_service(&command.location)?;
    let result = service.create_or_get(&command.slug, &command.kind);
    close_service(&service)?;
    let uuid = result.map_err(|err| CliError::new(mapping_error("get-id", &err)))?;
    write_json_line(&GetIdOutput {
        uuid,
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `mapping resolve`.
fn command_mapping_resolve(command: &MappingResolveCommand) -> CliResult<ExitCode> {
    let service = open_service(&command.location)?;
    let result = service.resolve(&command.uuid);
    close_service(&service)?;
    let record = result.map_err(|err| match err {
        MappingError::NotFound => CliError::new(format!("mapping not found: {}", command.uuid)),
        other => CliError::new(mapping_error("resolve", &other)),
    })?;
    write_json_line(&record)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `mapping list`.
fn command_mapping_list(command: &MappingListCommand) -> CliResult<ExitCode> {
    let after = command
        .after
        .as_deref()
        .map(|text| {
            MappingId::parse_canonical(text)
                .ok_or_else(|| CliError::new(format!("invalid --after identifier: {text}")))
        })
        .transpose()?;
    let store = open_sqlite_store(&command.location)?;
    let listed = store.list(command.limit, after.as_ref());
    store.close().map_err(|err| CliError::new(format!("store close failed: {err}")))?;
    let mappings = listed.map_err(|err| CliError::new(format!("mapping list failed: {err}")))?;
    let next_after = if mappings.len() == command.limit {
        mappings.last().map(|mapping| mapping.record.identifier)
    } else {
        None
    };
    let output = ListOutput {
        mappings,
        next_after,
    };
    match command.format {
        OutputFormat::Json => write_json_line(&output)?,
        OutputFormat::Text => write_stdout_line(&render_list_text(&output))
            .map_err(|err| CliError::new(output_error(&err)))?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `mapping health`.
fn command_mapping_health(location: &ConfigLocation) -> CliResult<ExitCode> {
    let service = open_service(location)?;
    let result = service.health_check();
    close_service(&service)?;
    result.map_err(|err| CliError::new(mapping_error("health", &err)))?;
    write_json_line(&HealthOutput {
        status: "OK",
        database: "Connected",
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Renders list output as tab-separated `uuid type slug` lines.
fn render_list_text(output: &ListOutput) -> String {
    let mut lines: Vec<String> = output
        .mappings
        .iter()
        .map(|mapping| {
            format!(
                "{}\t{}\t{}",
                mapping.record.identifier, mapping.record.kind, mapping.record.slug
            )
        })
        .collect();
    if let Some(next) = output.next_after {
        lines.push(format!("next: --after {next}"));
    }
    lines.join("\n")
}

// ============================================================================
// SECTION: Store Helpers
// ============================================================================

/// Loads configuration from the given path or the default locations.
fn load_config(path: Option<&Path>) -> CliResult<SlugmapConfig> {
    SlugmapConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Opens the mapping service over the configured store.
fn open_service(location: &ConfigLocation) -> CliResult<MappingService> {
    let config = load_config(location.config.as_deref())?;
    build_mapping_service(&config).map_err(|err| CliError::new(format!("store open failed: {err}")))
}

/// Closes the service's store after a one-shot command.
fn close_service(service: &MappingService) -> CliResult<()> {
    service.close().map_err(|err| CliError::new(format!("store close failed: {err}")))
}

/// Opens the configured `SQLite` store for administration.
fn open_sqlite_store(location: &ConfigLocation) -> CliResult<SqliteMappingStore> {
    let config = load_config(location.config.as_deref())?;
    if config.store.store_type != StoreType::Sqlite {
        return Err(CliError::new("mapping list requires a sqlite store".to_string()));
    }
    let sqlite_config = config
        .store
        .sqlite_config()
        .ok_or_else(|| CliError::new("sqlite store requires path".to_string()))?;
    SqliteMappingStore::new(sqlite_config)
        .map_err(|err| CliError::new(format!("store open failed: {err}")))
}

/// Formats a service error for a mapping command.
fn mapping_error(operation: &str, error: &MappingError) -> String {
    format!("mapping {operation} failed: {error}")
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Serializes a value as one JSON line on stdout.
fn write_json_line<T: Serialize>(value: &T) -> CliResult<()> {
    let payload = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("output serialization failed: {err}")))?;
    write_stdout_line(&payload).map_err(|err| CliError::new(output_error(&err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure message.
fn output_error(error: &std::io::Error) -> String {
    format!("failed to write to stdout: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
