use clap::{Args, Subcommand};
use anyhow::{bail, Result};
use crate::config::parser::{save_config, to_toml_string};
use crate::Config;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Parse a config file and print validation warnings
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Write the default configuration
    Init {
        #[arg(short, long, default_value = "reqtrail.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub async fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Check { config } => {
            println!("Checking configuration: {}", config.display());

            let cfg = Config::from_file(&config)?;
            let warnings = cfg.validate()?;

            if warnings.is_empty() {
                println!(" Configuration is valid!");
            } else {
                println!("Configuration loaded with warnings:\n");
                for warning in &warnings {
                    println!("{}", warning);
                }
                if warnings.iter().any(|w| w.starts_with("[X]")) {
                    bail!("Configuration has invalid settings");
                }
            }

            Ok(())
        }

        ConfigCommand::Init { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output.display());
            }

            save_config(&Config::default(), &output)?;
            println!(" Default configuration written to {}", output.display());
            Ok(())
        }

        ConfigCommand::Show { config } => {
            let cfg = Config::load(config.as_ref())?;
            print!("{}", to_toml_string(&cfg)?);
            Ok(())
        }
    }
}
