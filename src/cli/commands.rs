use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::constants::output;
use crate::infrastructure::config::ServerType;

/// tfstaticregistry CLI
#[derive(Parser)]
#[command(name = "tfstaticregistry")]
#[command(about = "Generate a static Terraform module and provider registry", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Top level commands
#[derive(Subcommand)]
pub enum Commands {
    /// Collect all sources and write the registry site
    Generate {
        /// Configuration file
        #[arg(short, long, default_value = output::DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Target web server, overrides the configuration
        #[arg(short, long, value_enum)]
        server: Option<ServerType>,
        /// Output directory, overrides the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Module archive directory, overrides the configuration
        #[arg(short, long)]
        modules: Option<PathBuf>,
    },
    /// Check a configuration file without generating anything
    Validate {
        /// Configuration file
        #[arg(short, long, default_value = output::DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
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
    fn test_generate_arguments() {
        let cli = Cli::parse_from([
            "tfstaticregistry",
            "generate",
            "--server",
            "caddy",
            "-o",
            "site",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate {
                config,
                server,
                output,
                modules,
            } => {
                assert_eq!(config, PathBuf::from("registry.toml"));
                assert_eq!(server, Some(ServerType::Caddy));
                assert_eq!(output, Some(PathBuf::from("site")));
                assert_eq!(modules, None);
            }
            Commands::Validate { .. } => panic!("expected generate"),
        }
    }
}
