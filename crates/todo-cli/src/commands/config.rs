//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use todo_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "db_file": config.db_file,
                    "root_bucket": config.root_bucket,
                    "items_bucket": config.items_bucket,
                    "log_file": config.log_file,
                    "database_path": config.database_path()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.database_path().display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:     {}", config.data_dir.display());
            println!("  db_file:      {}", config.db_file);
            println!("  root_bucket:  {}", config.root_bucket);
            println!("  items_bucket: {}", config.items_bucket);
            println!(
                "  log_file:     {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "db_file" => {
            config.db_file = non_empty(key, value)?;
        }
        "root_bucket" => {
            config.root_bucket = non_empty(key, value)?;
        }
        "items_bucket" => {
            config.items_bucket = non_empty(key, value)?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, db_file, root_bucket, items_bucket, log_file",
                key
            );
        }
    }
    Ok(())
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        bail!("Value for {} cannot be empty", key);
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "db_file", "items.db").unwrap();
        apply(&mut config, "items_bucket", "TODOS").unwrap();
        apply(&mut config, "log_file", "/tmp/todo.log").unwrap();

        assert_eq!(config.db_file, "items.db");
        assert_eq!(config.items_bucket, "TODOS");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/todo.log")));

        apply(&mut config, "log_file", "none").unwrap();
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_apply_rejects_unknown_key() {
        let mut config = Config::default();

        let err = apply(&mut config, "sync_url", "x").unwrap_err();

        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_apply_rejects_empty_bucket_name() {
        let mut config = Config::default();

        assert!(apply(&mut config, "root_bucket", "  ").is_err());
        assert_eq!(config.root_bucket, "DB");
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set("db_file".into(), "other.db".into(), Some(&path), &output).unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.db_file, "other.db");
    }
}
