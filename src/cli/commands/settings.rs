//! Inspect or create the config file.

use std::path::PathBuf;

use crate::config::{self, Config};

/// Print the effective configuration, optionally writing the defaults first
pub fn cmd_config(config: &Config, path: Option<&PathBuf>, init: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => Some(p.clone()),
        None => config::config_path(),
    };

    if init {
        match &path {
            Some(p) if p.exists() => println!("Config already exists at {}", p.display()),
            Some(p) => {
                config::save_to(&Config::default(), p)?;
                println!("Wrote default config to {}", p.display());
            }
            None => return Err(config::ConfigError::NoConfigDir.into()),
        }
    }

    if let Some(p) = &path {
        println!("# {}", p.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
