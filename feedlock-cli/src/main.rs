//! Feedlock - decentralized deployment of versioned, signed software feeds.
//!
//! The resolver and downloader run as separate stages; commands that need a
//! freshly resolved selection set take it via `--candidate`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use feedlock_core::apps::{App, AppManager};
use feedlock_core::config::Config;
use feedlock_core::selections::{
    advise_upgrade, diff, DirectoryStore, ImplementationCatalog, JsonCatalog, SelectionSet,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod trust_cli;

/// Log levels
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "feedlock", version, about = "Manage apps backed by versioned, signed software feeds")]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Override the config directory
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check an app (or interface URI) for updates and record the outcome
    Update {
        /// App name or interface URI
        target: String,

        /// Freshly resolved selections from the resolver stage
        #[arg(long)]
        candidate: Option<PathBuf>,

        /// Feed catalog snapshot, for upgrade advisories
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Create an app bound to an interface URI
    Add {
        /// App name
        name: String,

        /// Root interface URI
        uri: String,

        /// Resolved selections from the resolver stage
        #[arg(long)]
        candidate: Option<PathBuf>,
    },

    /// Run an app's selected root implementation
    Run {
        /// App name
        name: String,

        /// Arguments passed through to the app
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Remove an app and its launcher (if still owned)
    Destroy {
        /// App name
        name: String,
    },

    /// Write a shell launcher for an app into a writable bin directory
    Integrate {
        /// App name
        name: String,

        /// Launcher name, defaulting to the app name
        #[arg(long)]
        alias: Option<String>,
    },

    /// List apps created by this installation
    List,

    /// Show or change preferences
    Config {
        /// Preference key (help_with_testing, freshness_seconds)
        key: Option<String>,

        /// New value
        value: Option<String>,
    },

    /// Manage the trusted-keys database
    #[command(subcommand)]
    Trust(trust_cli::TrustCommand),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_filter_directive())),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("feedlock: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = Arc::new(Config::discover_with_override(cli.config_dir)?);
    let manager = AppManager::new(config.clone());

    match cli.command {
        Commands::Update {
            target,
            candidate,
            catalog,
        } => cmd_update(&config, &manager, &target, candidate, catalog),
        Commands::Add {
            name,
            uri,
            candidate,
        } => cmd_add(&manager, &name, &uri, candidate),
        Commands::Run { name, args } => cmd_run(&config, &manager, &name, &args),
        Commands::Destroy { name } => {
            let app = require_app(&manager, &name)?;
            app.destroy()?;
            println!("Removed {name}");
            Ok(0)
        }
        Commands::Integrate { name, alias } => {
            let app = require_app(&manager, &name)?;
            let alias = alias.unwrap_or_else(|| name.clone());
            let launcher = app.integrate_shell(&alias)?;
            println!("Created {}", launcher.display());
            Ok(0)
        }
        Commands::List => {
            for name in manager.list_apps()? {
                println!("{name}");
            }
            Ok(0)
        }
        Commands::Config { key, value } => cmd_config(&config, key, value),
        Commands::Trust(command) => {
            trust_cli::run(command, &config)?;
            Ok(0)
        }
    }
}

fn require_app(manager: &AppManager, name: &str) -> Result<App> {
    Ok(manager
        .lookup_app(name, false)?
        .context("lookup with missing_ok=false always yields an app")?)
}

fn local_store(config: &Config) -> DirectoryStore {
    DirectoryStore::new(config.cache_dir.join("implementations"))
}

fn cmd_update(
    config: &Arc<Config>,
    manager: &AppManager,
    target: &str,
    candidate: Option<PathBuf>,
    catalog: Option<PathBuf>,
) -> Result<i32> {
    let app = manager.lookup_app(target, true)?;
    let store = local_store(config);

    let old = match &app {
        Some(app) => app.get_selections(&store, config.freshness())?.selections,
        None => SelectionSet::empty(target),
    };

    // The resolver stage runs separately; no candidate means the user
    // aborted the download/selection step.
    let Some(candidate) = candidate else {
        eprintln!("Update aborted: no resolved selections were provided");
        return Ok(1);
    };
    let new = SelectionSet::load(&candidate)?;

    let catalog = match catalog {
        Some(path) => Some(JsonCatalog::load(&path)?),
        None => None,
    };

    if let Some(catalog) = &catalog {
        if let Some(replacement) = catalog.replaced_by(&new.root_interface) {
            println!(
                "Warning: interface {} has been replaced by {replacement}",
                new.root_interface
            );
        }
    }

    let changes = diff(&old, &new);
    for change in &changes {
        println!("{change}");
    }

    if let Some(catalog) = &catalog {
        if let Some(advisory) =
            advise_upgrade(&new, catalog, config.preferences.help_with_testing)
        {
            println!("{advisory}");
        }
    }

    if changes.is_empty() {
        match new.root_entry() {
            Some(root) => println!("No updates found. Continuing with version {}.", root.version),
            None => println!("No updates found."),
        }
    } else if let Some(app) = &app {
        app.set_selections(&new)?;
    }

    Ok(0)
}

fn cmd_add(
    manager: &AppManager,
    name: &str,
    uri: &str,
    candidate: Option<PathBuf>,
) -> Result<i32> {
    let Some(candidate) = candidate else {
        eprintln!("Add aborted: no resolved selections were provided");
        return Ok(1);
    };

    let selections = SelectionSet::load(&candidate)?;
    anyhow::ensure!(
        selections.root_interface == uri,
        "candidate selections are for {}, not {uri}",
        selections.root_interface
    );

    let app = manager.create_app(name)?;
    app.set_selections(&selections)?;
    println!("Added {name} ({uri})");
    Ok(0)
}

fn cmd_run(
    config: &Arc<Config>,
    manager: &AppManager,
    name: &str,
    args: &[String],
) -> Result<i32> {
    let app = require_app(manager, name)?;
    let store = local_store(config);
    let loaded = app.get_selections(&store, config.freshness())?;

    if loaded.needs_update {
        warn!(app = %name, "selections are stale; run `feedlock update {name}`");
    }
    for missing in &loaded.missing {
        warn!(app = %name, implementation = %missing, "implementation not cached locally");
    }

    let root = loaded
        .selections
        .root_entry()
        .with_context(|| format!("app '{name}' has no selection for its root interface"))?;
    let command = root
        .command
        .as_deref()
        .with_context(|| format!("app '{name}' has no runnable command recorded"))?;

    let mut tokens = shell_words::split(command)
        .with_context(|| format!("invalid command line recorded for '{name}'"))?;
    anyhow::ensure!(!tokens.is_empty(), "empty command recorded for '{name}'");
    let program = tokens.remove(0);

    let mut process = std::process::Command::new(program);
    process.args(tokens).args(args);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        Err(process.exec()).with_context(|| format!("failed to run '{name}'"))
    }

    #[cfg(not(unix))]
    {
        let status = process
            .status()
            .with_context(|| format!("failed to run '{name}'"))?;
        Ok(status.code().unwrap_or(1))
    }
}

fn cmd_config(config: &Arc<Config>, key: Option<String>, value: Option<String>) -> Result<i32> {
    let mut preferences = config.preferences.clone();

    match (key.as_deref(), value) {
        (None, _) => {
            println!("help_with_testing = {}", preferences.help_with_testing);
            println!("freshness_seconds = {}", preferences.freshness_seconds);
        }
        (Some("help_with_testing"), None) => println!("{}", preferences.help_with_testing),
        (Some("freshness_seconds"), None) => println!("{}", preferences.freshness_seconds),
        (Some("help_with_testing"), Some(value)) => {
            preferences.help_with_testing = value
                .parse()
                .with_context(|| format!("expected true or false, got '{value}'"))?;
            preferences.save(&config.preferences_path())?;
        }
        (Some("freshness_seconds"), Some(value)) => {
            preferences.freshness_seconds = value
                .parse()
                .with_context(|| format!("expected a number of seconds, got '{value}'"))?;
            preferences.save(&config.preferences_path())?;
        }
        (Some(other), _) => anyhow::bail!("unknown preference '{other}'"),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_accepts_candidate_and_catalog() {
        let cli = Cli::try_parse_from([
            "feedlock",
            "update",
            "my-app",
            "--candidate",
            "/tmp/selections.json",
            "--catalog",
            "/tmp/catalog.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Update { .. }));
    }

    #[test]
    fn test_run_passes_trailing_arguments_through() {
        let cli =
            Cli::try_parse_from(["feedlock", "run", "my-app", "--flag", "value"]).unwrap();
        match cli.command {
            Commands::Run { name, args } => {
                assert_eq!(name, "my-app");
                assert_eq!(args, vec!["--flag", "value"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_trust_subcommands_parse() {
        let cli = Cli::try_parse_from(["feedlock", "trust", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Trust(trust_cli::TrustCommand::List)
        ));
    }
}
