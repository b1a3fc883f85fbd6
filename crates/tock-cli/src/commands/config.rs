use std::path::Path;

use tock_core::config::ClientConfig;

use crate::cli::ConfigCommands;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { json } => {
            let config = ClientConfig::load(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                for line in format_config_lines(&config) {
                    println!("{line}");
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            // Env overrides are not persisted
            let mut config = ClientConfig::load_from(config_path)?;
            config.set(&key, &value)?;
            config.save_to(config_path)?;
            println!("Saved {}", config_path.display());
        }
        ConfigCommands::Path => println!("{}", config_path.display()),
    }
    Ok(())
}

pub fn format_config_lines(config: &ClientConfig) -> Vec<String> {
    vec![
        format!(
            "api_base_url          {}",
            config.api_endpoint().unwrap_or("(not set)")
        ),
        format!("request_timeout_secs  {}", config.request_timeout_secs),
        format!("auto_sync             {}", config.auto_sync),
        format!("offline               {}", config.offline),
    ]
}
