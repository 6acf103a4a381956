//! verlock CLI - manage database-maintained version counters

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::commands::CommandOutput;
use crate::config::Manifest;
use crate::logging::{LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "verlock")]
#[command(about = "Install and inspect version-column triggers for optimistic concurrency")]
#[command(version)]
struct Cli {
    /// Path to the TOML manifest [default: ./verlock.toml, then the user config dir]
    #[arg(short, long, env = "VERLOCK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log verbosity: trace, debug, info, warn, error
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Targets {
    /// Connection alias to work on (repeatable) [default: every configured connection]
    #[arg(short, long = "database", value_name = "ALIAS")]
    databases: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed triggers per connection
    List {
        #[command(flatten)]
        targets: Targets,
    },

    /// Install triggers for every configured version column
    Create {
        #[command(flatten)]
        targets: Targets,
    },

    /// Remove triggers for every configured version column
    Drop {
        #[command(flatten)]
        targets: Targets,
    },

    /// Print the DDL create (or drop) would run, without connecting
    Sql {
        #[command(flatten)]
        targets: Targets,

        /// Print drop statements instead
        #[arg(long)]
        drop: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(LoggingConfig::new(&cli.log_level, cli.log_format)) {
        eprintln!("error: failed to initialize logging: {:#}", e);
        return ExitCode::from(2);
    }

    match run(cli).await {
        Ok(output) => {
            println!("{}", output.table);
            for (alias, failure) in &output.failures {
                eprintln!("error: {}: {}", alias, failure);
            }
            if output.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<CommandOutput> {
    let path = config::resolve_path(cli.config);
    tracing::debug!(path = %path.display(), "loading manifest");
    let manifest = Manifest::load(&path)?;

    match cli.command {
        Commands::List { targets } => commands::list_triggers(&manifest, &targets.databases).await,
        Commands::Create { targets } => {
            commands::create_triggers(&manifest, &targets.databases).await
        }
        Commands::Drop { targets } => commands::drop_triggers(&manifest, &targets.databases).await,
        Commands::Sql { targets, drop } => commands::render_sql(&manifest, &targets.databases, drop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_repeated_databases() {
        let cli = Cli::try_parse_from([
            "verlock", "create", "--database", "default", "-d", "orders",
        ])
        .unwrap();
        match cli.command {
            Commands::Create { targets } => assert_eq!(targets.databases, vec!["default", "orders"]),
            _ => panic!("expected create"),
        }
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_sql_drop_with_global_options() {
        let cli = Cli::try_parse_from([
            "verlock", "sql", "--drop", "--config", "/tmp/v.toml", "--log-format", "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Sql { drop: true, .. }));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/v.toml")));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["verlock", "--log-format", "xml", "list"]).is_err());
    }
}
