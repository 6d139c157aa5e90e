mod apply;
mod command;
mod config;
mod error;
mod picker;
#[cfg(test)]
mod test_support;

use std::process;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::ConfigPaths;
use crate::picker::SelectionResult;

fn main() -> Result<()> {
    init_logging();

    let paths = ConfigPaths::new().context("Failed to resolve configuration directory")?;
    let (themes, rules) = config::load(&paths).context("Failed to load configuration")?;

    let names: Vec<String> = themes.keys().cloned().collect();
    let selection = match picker::present(&names) {
        Ok(selection) => selection,
        Err(err) => {
            eprintln!("An error occurred: {err:#}");
            process::exit(1);
        }
    };

    match selection {
        SelectionResult::Chosen(theme) => {
            apply::apply_theme(&theme, &themes, &rules)
                .with_context(|| format!("Failed to apply theme '{theme}'"))?;
        }
        SelectionResult::Cancelled => println!("No theme selected. Exiting."),
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
