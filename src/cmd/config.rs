use clap::{Args, Subcommand};

use crate::config::{AppConfig, CONFIG_ENV, StoreConfig};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets masked).
    Show,
}

pub fn run(config: &AppConfig, command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Show => run_show(config),
    }
}

fn run_show(config: &AppConfig) -> AppResult<()> {
    println!("{}", config_file_line(config));
    match &config.store {
        StoreConfig::File { path } => {
            println!("Store backend: file");
            println!("Store path: {}", path.display());
        }
        StoreConfig::Rest { base_url, api_key } => {
            println!("Store backend: rest");
            println!("Store URL: {base_url}");
            println!("API key: {}", mask_secret(api_key));
        }
        StoreConfig::Memory => println!("Store backend: memory"),
    }
    println!("Category rules: {}", config.rules.len());
    println!(
        "Danger keywords: {}",
        display_list(config.classifier.danger_keywords())
    );
    println!(
        "Sensitive categories: {}",
        display_list(config.classifier.sensitive_categories())
    );
    Ok(())
}

fn config_file_line(config: &AppConfig) -> String {
    let state = if config.config_path.is_file() {
        "loaded"
    } else {
        "not found, using defaults"
    };
    format!(
        "Configuration file: {} ({state}; override with {CONFIG_ENV})",
        config.config_path.display()
    )
}

fn display_list(values: &[String]) -> String {
    if values.is_empty() {
        "<none>".to_string()
    } else {
        values.join(", ")
    }
}

fn mask_secret(token: &str) -> String {
    let chars = token.chars().collect::<Vec<_>>();
    match chars.len() {
        0 => "<not set>".to_string(),
        len if len > 6 => {
            let prefix = chars[..3].iter().collect::<String>();
            let suffix = chars[len - 3..].iter().collect::<String>();
            format!("{prefix}***{suffix}")
        }
        _ => "***".to_string(),
    }
}
