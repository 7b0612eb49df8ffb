//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, FileConfig};
use crate::error::CliError;

/// Serialize config to TOML and write to the canonical config path.
fn save_config(cfg: &FileConfig, path: &std::path::Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: format!("failed to serialize config: {e}"),
    })?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(config::config_path);

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = config::load_file_config(global.config.as_deref())?;
            if cfg.password.is_some() {
                cfg.password = Some("<redacted>".into());
            }
            if cfg.api_key.is_some() {
                cfg.api_key = Some("<redacted>".into());
            }
            let rendered = toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            })?;
            print!("{rendered}");
            Ok(())
        }

        ConfigCommand::Init => {
            if path.exists() {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!("{} already exists", path.display()),
                });
            }
            save_config(&FileConfig::default(), &path)?;
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
                eprintln!("Fill in identifier, password, and api_key.");
            }
            Ok(())
        }
    }
}
