//! Configuration view and validation commands: `leadflow config`.

use std::path::Path;

use anyhow::Result;
use console::style;
use leadflow::config::{LeadflowConfig, LeadflowToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &LeadflowConfig, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("Leadflow Configuration").bold().cyan());
            println!("======================");
            println!();
            if config.path.exists() {
                println!("Config file: {}", config.path.display());
            } else {
                println!("No leadflow.toml found at {}", config.path.display());
                println!("Using defaults.");
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            println!();
            print!("{}", config.toml.to_toml_string()?);
            if config.demo {
                println!();
                println!("{}", style("Demo mode: the HTTP backend is not used").dim());
            }
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("{}", style("Configuration is valid").green());
            } else {
                println!("{}", style("Configuration warnings:").yellow().bold());
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init { force }) => cmd_config_init(&config.path, force)?,
    }
    Ok(())
}

/// Write a default configuration file to `path`.
pub fn cmd_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    LeadflowToml::default().save(path)?;
    println!("Created {}", path.display());
    Ok(())
}
