//! schema-intel CLI - Inspect a database schema and build query context
//!
//! Usage:
//!   schema-intel [--db <file.db> | --snapshot <catalog.json>] <command>
//!
//! Examples:
//!   schema-intel --db chinook.db tables
//!   schema-intel --db chinook.db path InvoiceLine Customer
//!   schema-intel --db chinook.db context "show me customers and their invoices"
//!   schema-intel --snapshot catalog.json hash

use clap::{Parser, Subcommand, ValueEnum};
use schema_intel::config::Settings;
use schema_intel::metadata::{CatalogReader, SqliteCatalog, StaticCatalog};
use schema_intel::ranking::ContextOptions;
use schema_intel::service::SchemaIntelligence;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "schema-intel")]
#[command(about = "schema-intel - Schema introspection, join paths and relevance context for SQL generation")]
#[command(version)]
struct Cli {
    /// SQLite database file to introspect
    #[arg(long, global = true, conflicts_with = "snapshot")]
    db: Option<PathBuf>,

    /// JSON catalog snapshot to introspect instead of a live database
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Config file (defaults to the standard search locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database name reported in the schema
    #[arg(long, global = true)]
    name: Option<String>,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, global = true)]
    verbosity: Option<String>,

    /// Log format
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full normalized schema
    Schema,

    /// List table names
    Tables,

    /// Show one table
    Table {
        /// Table name (case-insensitive)
        name: String,
    },

    /// List tables linked to a table by foreign keys
    Related {
        /// Table name (case-insensitive)
        name: String,
    },

    /// Find the shortest join path between two tables
    Path {
        start: String,
        end: String,
    },

    /// Summarize how tables are connected
    Analyze,

    /// Show column and relationship counts for a table
    Stats {
        /// Table name (case-insensitive)
        table: String,
    },

    /// Build the schema context for a natural-language query
    Context {
        /// The question to rank tables against
        query: String,

        /// Tables picked by relevance
        #[arg(long)]
        top_k: Option<usize>,

        /// Ceiling once related tables are added
        #[arg(long)]
        max_tables: Option<usize>,

        /// Skip adding FK-related tables
        #[arg(long)]
        no_relationships: bool,

        /// Print tables and scores as JSON instead of the context text
        #[arg(long)]
        json: bool,
    },

    /// Print the structural schema hash
    Hash,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let verbosity = cli
        .verbosity
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    let format = cli.log_format.unwrap_or(if settings.logging.format == "json" {
        LogFormat::Json
    } else {
        LogFormat::Text
    });
    setup_logging(&verbosity, format);

    let service = match build_service(&cli, &settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&service, cli.command, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, schema_intel::config::SettingsError> {
    match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn setup_logging(verbosity: &str, format: LogFormat) {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries command output.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == LogFormat::Json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn build_service(cli: &Cli, settings: &Settings) -> Result<SchemaIntelligence, Box<dyn std::error::Error>> {
    let catalog: Box<dyn CatalogReader> = if let Some(snapshot) = &cli.snapshot {
        let json = fs::read_to_string(snapshot)
            .map_err(|e| format!("reading snapshot '{}': {}", snapshot.display(), e))?;
        Box::new(StaticCatalog::from_json(&json)?)
    } else {
        let path = match &cli.db {
            Some(path) => path.clone(),
            None => settings
                .database
                .resolved_path()?
                .ok_or("no database given: pass --db, --snapshot, or set [database].path")?,
        };
        Box::new(SqliteCatalog::open(&path)?)
    };

    let mut settings = settings.clone();
    if let Some(name) = &cli.name {
        settings.database.name = Some(name.clone());
    }
    Ok(SchemaIntelligence::with_settings(catalog, &settings))
}

fn run(service: &SchemaIntelligence, command: Commands, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Schema => print_json(&service.schema()?),
        Commands::Tables => {
            let schema = service.schema()?;
            for name in schema.table_names() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Table { name } => print_json(&service.table(&name)?),
        Commands::Related { name } => print_json(&service.related_tables(&name)?),
        Commands::Path { start, end } => match service.join_path(&start, &end)? {
            Some(path) => print_json(&path),
            None => {
                eprintln!("No join path between '{}' and '{}'", start, end);
                Ok(())
            }
        },
        Commands::Analyze => print_json(&service.analysis()?),
        Commands::Stats { table } => print_json(&service.table_statistics(&table)?),
        Commands::Context {
            query,
            top_k,
            max_tables,
            no_relationships,
            json,
        } => {
            let defaults = settings.ranking.context_options();
            let options = ContextOptions {
                top_k: top_k.unwrap_or(defaults.top_k),
                max_tables: max_tables.unwrap_or(defaults.max_tables),
                include_relationships: defaults.include_relationships && !no_relationships,
            };
            let context = service.schema_context(&query, Some(options))?;
            if json {
                print_json(&context)
            } else {
                println!("{}", context.text);
                Ok(())
            }
        }
        Commands::Hash => {
            println!("{}", service.schema_hash()?);
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
