//! List discovered hook scripts

use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::hook::{HookRegistry, HookScript};

#[derive(Serialize)]
struct HookListing<'a> {
    dir: String,
    hooks: &'a [HookScript],
}

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    let registry = HookRegistry::discover(&config.hooks.dir)?;

    match format {
        OutputFormat::Json => {
            let listing = HookListing {
                dir: registry.dir().display().to_string(),
                hooks: registry.hooks(),
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Hooks in".bold(), registry.dir().display().to_string().cyan());
            println!();
            for (i, hook) in registry.hooks().iter().enumerate() {
                println!("  {} {}", format!("{:>2}.", i + 1).dimmed(), hook.name.green());
            }
        }
    }

    Ok(())
}
