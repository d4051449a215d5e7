//! Command implementations.
//!
//! Each command returns the process exit code on success; library errors are
//! propagated to `main`, which maps them to their own exit codes.

use crate::{CacheCommand, CacheTarget, Cli, Command, LookupArgs};
use anyhow::{bail, Result};
use forge_metadata::config::PathsConfig;
use forge_metadata::{
    find, resolve, CacheKey, CacheScope, CacheStatus, MatchedRecord, MetadataContext, MetadataFetcher, ObjectKind,
    ScopeRoots,
};
use std::process::ExitCode;
use tracing::debug;

pub async fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Function(args) => lookup(cli, ObjectKind::Function, args).await,
        Command::Event(args) => lookup(cli, ObjectKind::Event, args).await,
        Command::Enum(args) => lookup(cli, ObjectKind::Enum, args).await,
        Command::Cache(command) => cache(cli, command),
    }
}

fn scope_for(workspace: bool) -> CacheScope {
    if workspace {
        CacheScope::Workspace
    } else {
        CacheScope::User
    }
}

fn scope_roots(cli: &Cli) -> Result<ScopeRoots> {
    let roots = match (&cli.home, &cli.workspace_root) {
        (Some(home), Some(workspace)) => ScopeRoots::for_directories(home, workspace),
        (home, workspace) => {
            let mut roots = ScopeRoots::from_environment()?;
            if let Some(home) = home {
                roots.user = home.join(PathsConfig::CONFIG_DIR_NAME);
            }
            if let Some(workspace) = workspace {
                roots.workspace = workspace.join(PathsConfig::CONFIG_DIR_NAME);
            }
            roots
        }
    };
    debug!(user = %roots.user.display(), workspace = %roots.workspace.display(), "Scope roots");
    Ok(roots)
}

fn fetcher(cli: &Cli, scope: CacheScope) -> Result<MetadataFetcher> {
    let context = MetadataContext::builder()
        .with_roots(scope_roots(cli)?)
        .with_scope(scope)
        .build()?;
    Ok(MetadataFetcher::new(context))
}

async fn lookup(cli: &Cli, kind: ObjectKind, args: &LookupArgs) -> Result<ExitCode> {
    let fetcher = fetcher(cli, scope_for(args.workspace))?;
    let collection = fetcher
        .fetch(kind, &args.extension, args.dev, args.refresh)
        .await?;

    match find(kind, &collection, &args.name)? {
        Some(matched) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&matched)?);
            } else {
                print_match(&matched);
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No {} named '{}' in {}", kind, args.name.trim(), args.extension);
            Ok(ExitCode::from(1))
        }
    }
}

fn print_match(matched: &MatchedRecord) {
    match matched {
        MatchedRecord::Function(record) => {
            println!("{}", record.name);
            if let Some(description) = record.description.as_deref().filter(|d| !d.is_empty()) {
                println!("  {}", description);
            }
            if let Some(aliases) = record.aliases.as_deref().filter(|a| !a.is_empty()) {
                println!("  aliases: {}", aliases.join(", "));
            }
        }
        MatchedRecord::Event(record) => {
            println!("{}", record.name);
            if let Some(description) = record.description.as_deref().filter(|d| !d.is_empty()) {
                println!("  {}", description);
            }
        }
        MatchedRecord::Enum { name, values } => {
            println!("{}", name);
            println!("  {}", values.join(", "));
        }
    }
}

/// Cache keys for `extension`, one per kind or just `kind`.
fn target_keys(extension: &str, kind: Option<ObjectKind>) -> Result<Vec<CacheKey>> {
    let source = resolve(extension, false)?;
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ObjectKind::ALL.to_vec(),
    };

    kinds
        .into_iter()
        .map(|kind| CacheKey::for_object(&source.extension_key, kind).map_err(Into::into))
        .collect()
}

fn cache(cli: &Cli, command: &CacheCommand) -> Result<ExitCode> {
    match command {
        CacheCommand::Status { target, json } => cache_status(cli, target, *json),
        CacheCommand::List { workspace, json } => {
            let scope = scope_for(*workspace);
            let keys = fetcher(cli, scope)?.cache().list(scope)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&keys)?);
            } else if keys.is_empty() {
                println!("No cached metadata in {} scope", scope);
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        CacheCommand::Clear { target, delete, all } => {
            let scope = scope_for(target.workspace);
            let fetcher = fetcher(cli, scope)?;

            if *all {
                fetcher.cache().clear_all(scope)?;
                println!("Cleared all cached metadata in {} scope", scope);
                return Ok(ExitCode::SUCCESS);
            }

            for key in target_keys(&target.extension, target.kind)? {
                fetcher.cache().clear(scope, &key, *delete)?;
                println!("Cleared {} ({})", key, scope);
            }
            Ok(ExitCode::SUCCESS)
        }
        CacheCommand::Migrate {
            from,
            to,
            extension,
            kind,
        } => {
            if from == to {
                bail!("Source and destination scope are both {}", from);
            }

            let fetcher = fetcher(cli, *to)?;
            let mut migrated = 0;
            for key in target_keys(extension, *kind)? {
                if fetcher.cache().migrate(*from, *to, &key) {
                    println!("Migrated {} from {} to {}", key, from, to);
                    migrated += 1;
                } else {
                    println!("Nothing to migrate for {} in {} scope", key, from);
                }
            }

            if migrated == 0 {
                return Ok(ExitCode::from(1));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cache_status(cli: &Cli, target: &CacheTarget, json: bool) -> Result<ExitCode> {
    let scope = scope_for(target.workspace);
    let fetcher = fetcher(cli, scope)?;
    let window = fetcher.context().config().freshness_window;

    let statuses: Vec<CacheStatus> = target_keys(&target.extension, target.kind)?
        .iter()
        .map(|key| fetcher.cache().status(scope, key, window))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(ExitCode::SUCCESS);
    }

    for status in &statuses {
        if !status.has_cache {
            println!("{:<24} missing", status.key.as_str());
            continue;
        }
        let freshness = if status.is_fresh { "fresh" } else { "stale" };
        println!(
            "{:<24} {:<6} age {}s, {} entries",
            status.key.as_str(),
            freshness,
            status.age_seconds.unwrap_or_default(),
            status.entry_count.unwrap_or_default()
        );
    }
    Ok(ExitCode::SUCCESS)
}
