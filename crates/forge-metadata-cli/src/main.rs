//! forgemeta - look up ForgeScript functions, events and enums.
//!
//! Thin command layer over the forge-metadata library. All retrieval and
//! matching happens in the library; this binary parses arguments, installs
//! logging and formats results.

mod commands;

use clap::{Args, Parser, Subcommand};
use forge_metadata::{CacheScope, MetadataError, ObjectKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "forgemeta", version)]
#[command(about = "Look up ForgeScript extension metadata")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Home directory holding the user-scope cache (defaults to $HOME)
    #[arg(long, global = true, env = "FORGEMETA_HOME")]
    pub home: Option<PathBuf>,

    /// Workspace directory holding the workspace-scope cache (defaults to the current directory)
    #[arg(long, global = true)]
    pub workspace_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a function by name or alias
    Function(LookupArgs),
    /// Look up an event by name
    Event(LookupArgs),
    /// Look up an enum by name or by one of its values
    Enum(LookupArgs),
    /// Inspect or manage cached metadata
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Name to look up (case-insensitive)
    pub name: String,

    /// Extension whose metadata to search
    #[arg(short, long, default_value = "forgescript")]
    pub extension: String,

    /// Use the dev branch instead of main
    #[arg(long)]
    pub dev: bool,

    /// Ignore the cache and fetch fresh metadata
    #[arg(long)]
    pub refresh: bool,

    /// Use the workspace cache instead of the user cache
    #[arg(short, long)]
    pub workspace: bool,

    /// Print the matched record as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CacheTarget {
    /// Extension whose cache entries to act on
    #[arg(short, long, default_value = "forgescript")]
    pub extension: String,

    /// Restrict to one object kind (defaults to all three)
    #[arg(short, long)]
    pub kind: Option<ObjectKind>,

    /// Use the workspace cache instead of the user cache
    #[arg(short, long)]
    pub workspace: bool,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show presence and freshness of cache entries
    Status {
        #[command(flatten)]
        target: CacheTarget,

        #[arg(long)]
        json: bool,
    },
    /// List every cached key in a scope
    List {
        #[arg(short, long)]
        workspace: bool,

        #[arg(long)]
        json: bool,
    },
    /// Clear cache entries
    Clear {
        #[command(flatten)]
        target: CacheTarget,

        /// Remove the files instead of leaving an empty placeholder
        #[arg(long)]
        delete: bool,

        /// Remove the whole cache directory of the scope
        #[arg(long)]
        all: bool,
    },
    /// Copy cache entries from one scope to the other
    Migrate {
        #[arg(long)]
        from: CacheScope,

        #[arg(long)]
        to: CacheScope,

        #[arg(short, long, default_value = "forgescript")]
        extension: String,

        #[arg(short, long)]
        kind: Option<ObjectKind>,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for results
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match commands::run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<MetadataError>()
                .map(MetadataError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
