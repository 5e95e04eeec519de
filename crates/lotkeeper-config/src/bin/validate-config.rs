//! Config validation CLI tool
//!
//! Validates a lotkeeperd configuration file and reports any errors.

use lotkeeper_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a lotkeeperd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match lotkeeper_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", lotkeeper_config::CURRENT_CONFIG_VERSION);
            println!("  Tariff: {} per minute", policy.tariff.rate());
            println!("  Data dir: {}", policy.service.data_dir.display());
            println!("  Log dir: {}", policy.service.log_dir.display());

            if policy.layout.is_empty() {
                println!("  Layout: none (provision slots at runtime)");
            } else {
                println!(
                    "  Layout: {} rows x {} slots = {} slots",
                    policy.layout.rows.len(),
                    policy.layout.slots_per_row,
                    policy.layout.slot_count()
                );
                println!("  Rows: {}", policy.layout.rows.join(", "));
                let codes = policy.layout.codes();
                if let (Some(first), Some(last)) = (codes.first(), codes.last()) {
                    println!("  Slots: {} .. {}", first, last);
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                lotkeeper_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                lotkeeper_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                lotkeeper_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                lotkeeper_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        lotkeeper_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
