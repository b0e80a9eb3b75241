//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    save_path: String,
    episode_count: u32,
    episode_length: u32,
    num_ego: u32,
    num_traffic: u32,
    ood_classes: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    save_path: config.run.save_path.display().to_string(),
                    episode_count: config.run.episode_count,
                    episode_length: config.run.episode_length,
                    num_ego: config.run.num_ego,
                    num_traffic: config.run.num_traffic,
                    ood_classes: config.ood.as_ref().map(|ood| ood.classes.len()).unwrap_or(0),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &contracts::HarvestConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.run.num_traffic == 0 {
        warnings.push("num_traffic is 0 - scenes will have no background traffic".to_string());
    }

    if config.run.episode_length < 5 {
        warnings.push(format!(
            "episode_length {} is very short - weather will barely rotate",
            config.run.episode_length
        ));
    }

    if config.run.start_frame.is_some() {
        warnings.push(
            "start_frame is set explicitly - an existing dataset at save_path may be overwritten"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Save path: {}", summary.save_path);
            println!("  Episodes: {}", summary.episode_count);
            println!("  Episode length: {} capture ticks", summary.episode_length);
            println!("  Ego vehicles: {}", summary.num_ego);
            println!("  Traffic vehicles: {}", summary.num_traffic);
            println!("  OOD classes: {}", summary.ood_classes);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/config.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn valid_file_produces_summary_and_warnings() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[run]\nsave_path = \"./dataset\"\nepisode_length = 2\n"
        )
        .unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.num_ego, 1);
        // Short episode and zero traffic both warn
        assert_eq!(result.warnings.unwrap().len(), 2);
    }
}
